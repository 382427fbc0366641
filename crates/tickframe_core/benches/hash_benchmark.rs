//! # Content Hash Benchmark
//!
//! Every cached draw hashes its vertex buffer once per tick.
//! This measures that cost across typical buffer sizes.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tickframe_core::{hash_floats, hash_name};

fn bench_hash_floats(c: &mut Criterion) {
    let mut group = c.benchmark_group("content_hash");

    for float_count in [96_usize, 1_024, 16_384] {
        #[allow(clippy::cast_precision_loss)]
        let buffer: Vec<f32> = (0..float_count).map(|i| i as f32 * 0.5).collect();
        group.throughput(Throughput::Bytes((float_count * 4) as u64));
        group.bench_with_input(BenchmarkId::new("xxh64", float_count), &buffer, |b, buf| {
            b.iter(|| hash_floats(black_box(buf)));
        });
    }

    group.finish();
}

fn bench_hash_name(c: &mut Criterion) {
    c.bench_function("name_hash", |b| {
        b.iter(|| hash_name(black_box("actors/mario/mario_metal_cap.rgba16")));
    });
}

criterion_group!(benches, bench_hash_floats, bench_hash_name);
criterion_main!(benches);
