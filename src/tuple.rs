/* Binary space partitioning tree for radius queries over point sets.
Copyright (C) 2023  Alexander Pyattaev

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

//! The coordinate abstraction stored records must provide, plus a plain
//! `Point` type for callers that have no record type of their own.

/// Anything with per-dimension coordinate access can be indexed by the tree.
///
/// The tree never copies records, it stores references to them, so whatever
/// backs the coordinates (an atom, a mesh vertex, a row in a table) stays
/// owned by the caller. Records may compare equal on any subset of
/// dimensions; duplicates are fine.
pub trait Tuple {
    /// coordinate of this record along dimension `dim`.
    fn value_at(&self, dim: usize) -> f32;
}

/// A bare N-dimensional point.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Point<const N: usize> {
    pub pos: [f32; N],
}

impl<const N: usize> Point<N> {
    #[inline]
    pub fn new(pos: [f32; N]) -> Self {
        Self { pos }
    }
}

impl<const N: usize> Tuple for Point<N> {
    #[inline]
    fn value_at(&self, dim: usize) -> f32 {
        self.pos[dim]
    }
}

/// Raw coordinate arrays work as records too.
impl<const N: usize> Tuple for [f32; N] {
    #[inline]
    fn value_at(&self, dim: usize) -> f32 {
        self[dim]
    }
}

pub type Point3 = Point<3>;
pub type Point2 = Point<2>;

impl Point3 {
    pub fn build(x: f32, y: f32, z: f32) -> Self {
        Self { pos: [x, y, z] }
    }
}

impl Point2 {
    pub fn build(x: f32, y: f32) -> Self {
        Self { pos: [x, y] }
    }
}

/// Generate a random point with every coordinate drawn uniformly from `range`.
#[cfg(feature = "rand")]
pub fn rand_point<const N: usize, R: rand::Rng>(
    rng: &mut R,
    range: core::ops::Range<f32>,
) -> Point<N> {
    Point {
        pos: core::array::from_fn(|_| rng.random_range(range.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_access() {
        let p = Point3::build(1.0, 2.0, 3.0);
        assert_eq!(p.value_at(0), 1.0);
        assert_eq!(p.value_at(2), 3.0);

        let raw = [4.0f32, 5.0];
        assert_eq!(raw.value_at(1), 5.0);
    }

    #[cfg(feature = "rand")]
    #[test]
    fn rand_points_in_range() {
        use rand::rngs::SmallRng;
        use rand::SeedableRng;

        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..100 {
            let p: Point3 = rand_point(&mut rng, -1.0..1.0);
            assert!(p.pos.iter().all(|c| (-1.0..1.0).contains(c)));
        }
    }
}
