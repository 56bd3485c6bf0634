//! Lookup and range scan benchmarks for paged indexes.
//!
//! Measures point search latency across page capacities and the cost of
//! short and long range scans over an in-memory index.
//!
//! Run with:
//! ```bash
//! cargo bench --bench lookup
//! ```

#![allow(clippy::expect_used)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pagetree::{BuildConfig, PagedIndex, build_index_with_config};
use std::hint::black_box;
use std::io::Cursor;

const ENTRIES: u64 = 200_000;

/// Build an index over `ENTRIES` spaced keys held in memory.
fn build(capacity: usize) -> PagedIndex<Vec<u8>> {
    let mut output = Cursor::new(Vec::new());
    build_index_with_config(
        &mut output,
        (0..ENTRIES).map(|k| (k * 7, (k, k ^ 0xFF))),
        b"",
        &BuildConfig::new(capacity),
    )
    .expect("Failed to build benchmark index");
    PagedIndex::open(output.into_inner()).expect("Failed to open benchmark index")
}

/// Benchmark point lookups across page capacities.
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    for capacity in [4usize, 16, 64, 256] {
        let index = build(capacity);
        group.bench_with_input(BenchmarkId::new("hit", capacity), &index, |b, index| {
            let mut key = 0u64;
            b.iter(|| {
                key = (key + 7_919) % ENTRIES;
                black_box(index.search(black_box(key * 7)).expect("Search failed"))
            });
        });
        group.bench_with_input(BenchmarkId::new("miss", capacity), &index, |b, index| {
            let mut key = 0u64;
            b.iter(|| {
                key = (key + 7_919) % ENTRIES;
                black_box(index.search(black_box(key * 7 + 3)).expect("Search failed"))
            });
        });
    }
    group.finish();
}

/// Benchmark range scans of increasing width.
fn bench_range(c: &mut Criterion) {
    let index = build(16);
    let mut group = c.benchmark_group("range");
    for width in [10u64, 1_000, 100_000] {
        group.throughput(Throughput::Elements(width));
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                let hits = index
                    .range(black_box(70_000), black_box(70_000 + width * 7 - 1))
                    .expect("Range failed");
                black_box(hits.len())
            });
        });
    }
    group.finish();
}

/// Benchmark building an index from unsorted input.
fn bench_build(c: &mut Criterion) {
    c.bench_function("build_50k", |b| {
        b.iter(|| {
            let mut output = Cursor::new(Vec::new());
            build_index_with_config(
                &mut output,
                (0..50_000u64).rev().map(|k| (k, (k, k))),
                b"",
                &BuildConfig::default(),
            )
            .expect("Failed to build index");
            black_box(output.into_inner().len())
        });
    });
}

criterion_group!(benches, bench_search, bench_range, bench_build);
criterion_main!(benches);
