/* Binary space partitioning tree for radius queries over point sets.
 * Copyright (C) 2023  Alexander Pyattaev
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use bspt::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const N_LOOKUPS: usize = 40;
const WORLD_SIZE: f32 = 100.0;

fn generate_points(num_points: usize) -> Vec<Point3> {
    let mut rng = SmallRng::seed_from_u64(42);
    (0..num_points)
        .map(|_| rand_point(&mut rng, 0.0..WORLD_SIZE))
        .collect()
}

fn generate_queries() -> Vec<(Point3, f32)> {
    let mut rng = SmallRng::seed_from_u64(42);
    (0..N_LOOKUPS)
        .map(|_| {
            let center: Point3 = rand_point(&mut rng, 0.0..WORLD_SIZE);
            let radius = rng.random_range(1.0..10.0);
            (center, radius)
        })
        .collect()
}

fn fill_tree(points: &[Point3]) -> Bspt<3, Point3> {
    let mut tree = Bspt::with_capacity(points.len());
    for p in points {
        tree.add_tuple(p);
    }
    tree
}

fn run_lookups(tree: &Bspt<3, Point3>, queries: &[(Point3, f32)], hemisphere: bool) {
    let mut iter = tree.allocate_sphere_iterator();
    for (center, radius) in queries {
        if hemisphere {
            iter.initialize_hemisphere(center, *radius);
        } else {
            iter.initialize(center, *radius);
        }
        while let Some(p) = iter.next_tuple() {
            black_box(p);
            black_box(iter.found_distance2());
        }
    }
}

pub fn tree_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree creation");

    for (&num_points, samples_num) in [10_000usize, 100_000, 500_000].iter().zip([100, 40, 10]) {
        group.significance_level(0.1).sample_size(samples_num);
        group.bench_with_input(
            BenchmarkId::from_parameter(num_points),
            &num_points,
            |b, &num_points| {
                let points = generate_points(num_points);
                b.iter(|| {
                    let tree = fill_tree(&points);
                    black_box(tree.len());
                });
            },
        );
    }
    group.finish();
}

pub fn sphere_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("sphere queries");

    for (&num_points, samples_num) in [10_000usize, 100_000, 500_000].iter().zip([100, 40, 10]) {
        group.significance_level(0.1).sample_size(samples_num);
        group.bench_with_input(
            BenchmarkId::from_parameter(num_points),
            &num_points,
            |b, &num_points| {
                let points = generate_points(num_points);
                let tree = fill_tree(&points);
                let queries = generate_queries();
                b.iter(|| {
                    run_lookups(&tree, &queries, false);
                });
            },
        );
    }
    group.finish();

    let mut group = c.benchmark_group("hemisphere queries");

    for (&num_points, samples_num) in [10_000usize, 100_000, 500_000].iter().zip([100, 40, 10]) {
        group.significance_level(0.1).sample_size(samples_num);
        group.bench_with_input(
            BenchmarkId::from_parameter(num_points),
            &num_points,
            |b, &num_points| {
                let points = generate_points(num_points);
                let tree = fill_tree(&points);
                let queries = generate_queries();
                b.iter(|| {
                    run_lookups(&tree, &queries, true);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, tree_creation, sphere_queries);
criterion_main!(benches);
