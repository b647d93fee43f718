//! Benchmarks pour la classification et la vectorisation

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fldimpact::{classify, polygonize, GeoTransform, Grid};

const TAGS: &[&str] = &[
    "restaurant",
    "school",
    "bus_station",
    "bank",
    "hospital",
    "cinema",
    "shelter",
    "police",
    "toilets",
    "recycling",
    "unknown_tag",
];

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(TAGS.len() as u64));
    group.bench_function("all_tags", |b| {
        b.iter(|| {
            for tag in TAGS {
                black_box(classify(black_box(tag)));
            }
        })
    });
    group.finish();
}

/// Damier de blocs 4x4 : beaucoup de composantes et de trous
fn checker_grid(size: usize) -> Grid {
    let data = (0..size * size)
        .map(|i| {
            let (row, col) = (i / size, i % size);
            (((row / 4) + (col / 4)) % 2) as f64
        })
        .collect();
    Grid::new(
        size,
        size,
        data,
        GeoTransform {
            origin_x: 0.0,
            origin_y: size as f64 * 30.0,
            pixel_width: 30.0,
            pixel_height: 30.0,
        },
    )
    .unwrap()
}

fn bench_polygonize(c: &mut Criterion) {
    let mut group = c.benchmark_group("polygonize");
    for size in [64usize, 256] {
        let grid = checker_grid(size);
        group.throughput(Throughput::Elements((size * size) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &grid, |b, grid| {
            b.iter(|| black_box(polygonize(black_box(grid))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_classify, bench_polygonize);
criterion_main!(benches);
