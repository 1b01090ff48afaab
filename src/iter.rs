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

//! Iterators over tree data: the resumable sphere/hemisphere range query and
//! a whole-tree traversal.

use crate::tree::*;
use crate::tuple::Tuple;

/// Pruned range query over a [`Bspt`]: lazily yields every stored tuple
/// within Euclidean distance `radius` of a center point.
///
/// This is deliberately an explicit state machine (node stack + current leaf
/// + index) rather than recursion: the query is resumable one element at a
/// time, and its memory is bounded by the tree's depth watermark instead of
/// call-stack depth. Allocate it once per tree via
/// [`Bspt::allocate_sphere_iterator`], then [`initialize`](Self::initialize)
/// it for each query; reinitialization touches no heap.
///
/// In hemisphere mode only tuples with `tuple[0] >= center[0]` qualify.
/// Callers walking all pairwise neighborhoods use it to halve the work while
/// still seeing both ends of any pair tied on dimension 0.
pub struct SphereIter<'t, 'a, const N: usize, T: Tuple> {
    tree: &'t Bspt<'a, N, T>,

    center: [f32; N],
    radius: f32,
    radius2: f32,
    hemisphere: bool,

    /// nodes whose right subtree may still hold matches, deepest last.
    /// Capacity is the depth watermark at allocation time.
    stack: Vec<ElemPtr>,
    /// leaf currently being scanned
    leaf: Option<ElemPtr>,
    /// next slot to test within that leaf
    index: usize,
    /// a qualifying tuple sits at `index`, confirmed but not yet consumed
    matched: bool,

    found_distance2: f32,
}

impl<'t, 'a, const N: usize, T: Tuple> SphereIter<'t, 'a, N, T> {
    pub(crate) fn new(tree: &'t Bspt<'a, N, T>) -> Self {
        Self {
            tree,
            center: [0.0; N],
            radius: 0.0,
            radius2: 0.0,
            hemisphere: false,
            stack: Vec::with_capacity(tree.tree_depth),
            leaf: None,
            index: 0,
            matched: false,
            found_distance2: 0.0,
        }
    }

    /// Set up a full-sphere query around `center`. Any coordinate source
    /// works as the center; it does not have to be a stored record.
    pub fn initialize<C: Tuple>(&mut self, center: &C, radius: f32) {
        self.init_inner(center, radius, false);
    }

    /// Set up a query restricted to the half-space `tuple[0] >= center[0]`.
    pub fn initialize_hemisphere<C: Tuple>(&mut self, center: &C, radius: f32) {
        self.init_inner(center, radius, true);
    }

    fn init_inner<C: Tuple>(&mut self, center: &C, radius: f32, hemisphere: bool) {
        for dim in 0..N {
            self.center[dim] = center.value_at(dim);
        }
        self.radius = radius;
        self.radius2 = radius * radius;
        self.hemisphere = hemisphere;
        self.stack.clear();
        self.matched = false;
        self.found_distance2 = 0.0;
        self.descend(ROOT_ELEMENT);
    }

    /// Walk down from `idx` to a leaf. At each node: if the left half-space
    /// can intersect the query sphere, remember the node and go left, else
    /// the left subtree is provably out of range and we go right without
    /// remembering anything.
    fn descend(&mut self, mut idx: ElemPtr) {
        let tree = self.tree;
        loop {
            match &tree.elements[idx as usize] {
                Element::Node(node) => {
                    if self.center[node.dim as usize] - self.radius <= node.split_value {
                        // we never want this push to allocate
                        debug_assert_ne!(self.stack.capacity(), self.stack.len());
                        self.stack.push(idx);
                        idx = node.left;
                    } else {
                        idx = node.right;
                    }
                }
                Element::Leaf(_) => break,
            }
        }
        self.leaf = Some(idx);
        self.index = 0;
    }

    /// Advance to the next qualifying tuple, if any, without consuming it.
    /// Returns true as soon as one is confirmed; repeated calls are cheap.
    pub fn has_next(&mut self) -> bool {
        if self.matched {
            return true;
        }
        let tree = self.tree;
        loop {
            // scan forward through the current leaf
            if let Some(leaf_idx) = self.leaf {
                let bucket = match &tree.elements[leaf_idx as usize] {
                    Element::Leaf(bucket) => bucket,
                    Element::Node(_) => unreachable!(),
                };
                while self.index < bucket.tuples.len() {
                    let tuple = bucket.tuples[self.index];
                    if self.is_within(tuple) {
                        self.matched = true;
                        return true;
                    }
                    self.index += 1;
                }
                self.leaf = None;
            }

            // leaf exhausted: resume at the deepest node whose right subtree
            // is still pending
            let node_idx = match self.stack.pop() {
                Some(idx) => idx,
                None => return false,
            };
            let (dim, split_value, right) = match &tree.elements[node_idx as usize] {
                Element::Node(node) => (node.dim as usize, node.split_value, node.right),
                Element::Leaf(_) => unreachable!(),
            };
            // right half-space entirely beyond the sphere? skip it wholesale
            if self.center[dim] + self.radius < split_value {
                continue;
            }
            self.descend(right);
        }
    }

    /// The tuple confirmed by the last `true` [`has_next`](Self::has_next).
    /// Returns `None` once the query is exhausted.
    pub fn next_tuple(&mut self) -> Option<&'a T> {
        if !self.has_next() {
            return None;
        }
        self.matched = false;
        let leaf_idx = self.leaf?;
        let bucket = match &self.tree.elements[leaf_idx as usize] {
            Element::Leaf(bucket) => bucket,
            Element::Node(_) => unreachable!(),
        };
        let tuple = bucket.tuples[self.index];
        self.index += 1;
        Some(tuple)
    }

    /// Squared Euclidean distance of the most recently confirmed match.
    /// Saves the caller recomputing (or square-rooting) it.
    #[inline]
    pub fn found_distance2(&self) -> f32 {
        self.found_distance2
    }

    /// Drop all traversal state so no stale element indices linger between
    /// queries.
    pub fn release(&mut self) {
        self.stack.clear();
        self.leaf = None;
        self.index = 0;
        self.matched = false;
    }

    /// Early-exit distance test, dimension 0 first so the hemisphere
    /// restriction and the most common rejection happen before any other
    /// coordinate is even read.
    fn is_within(&mut self, tuple: &T) -> bool {
        let d0 = tuple.value_at(0) - self.center[0];
        if self.hemisphere && d0 < 0.0 {
            return false;
        }
        let mut dist2 = d0 * d0;
        if dist2 > self.radius2 {
            return false;
        }
        for dim in (1..N).rev() {
            let d = tuple.value_at(dim) - self.center[dim];
            dist2 += d * d;
            if dist2 > self.radius2 {
                return false;
            }
        }
        self.found_distance2 = dist2;
        true
    }
}

impl<'t, 'a, const N: usize, T: Tuple> Iterator for SphereIter<'t, 'a, N, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.next_tuple()
    }
}

/// Depth-first traversal over every tuple reference stored in the tree,
/// leaves visited left to right.
pub struct TupleIter<'t, 'a, const N: usize, T: Tuple> {
    tree: &'t Bspt<'a, N, T>,

    /// internal stack for tree traverse
    to_visit: Vec<ElemPtr>,

    /// tuples of the leaf being drained
    to_return: arrayvec::ArrayVec<&'a T, LEAF_COUNT_MAX>,
}

impl<'t, 'a, const N: usize, T: Tuple> TupleIter<'t, 'a, N, T> {
    pub(crate) fn new(tree: &'t Bspt<'a, N, T>) -> Self {
        // popping a node pushes two children, so the pending set grows by at
        // most one entry per level
        let mut to_visit = Vec::with_capacity(tree.tree_depth + 1);
        to_visit.push(ROOT_ELEMENT);
        Self {
            tree,
            to_visit,
            to_return: arrayvec::ArrayVec::new(),
        }
    }
}

impl<'t, 'a, const N: usize, T: Tuple> Iterator for TupleIter<'t, 'a, N, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        while self.to_return.is_empty() {
            let idx = self.to_visit.pop()?;
            match &self.tree.elements[idx as usize] {
                Element::Node(node) => {
                    self.to_visit.push(node.right);
                    self.to_visit.push(node.left);
                }
                Element::Leaf(bucket) => {
                    self.to_return.extend(bucket.tuples.iter().rev().copied());
                }
            }
        }
        self.to_return.pop()
    }
}

impl<'a, const N: usize, T: Tuple> Bspt<'a, N, T> {
    /// Make a sphere iterator for this tree. Its traversal stack is sized to
    /// the *current* depth watermark, so allocate it after the bulk of
    /// insertion is done and reinitialize it per query.
    #[inline]
    pub fn allocate_sphere_iterator(&self) -> SphereIter<'_, 'a, N, T> {
        SphereIter::new(self)
    }

    /// Iterate over every stored tuple reference, in leaf order.
    #[inline]
    pub fn iter_tuples(&self) -> TupleIter<'_, 'a, N, T> {
        TupleIter::new(self)
    }
}
