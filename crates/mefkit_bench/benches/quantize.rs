//! Quantization and gap detection benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mefkit_bench::{gapped_signal, random_signal};
use mefkit_core::intervals::{find_intervals, validity_mask};
use mefkit_core::quantize::{infer_precision, quantize};

const SIZES: [usize; 4] = [1_000, 10_000, 100_000, 1_000_000];

/// Benchmark precision inference.
fn bench_infer_precision(c: &mut Criterion) {
    let mut group = c.benchmark_group("infer_precision");

    for size in SIZES.iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let signal = random_signal(size, 500.0);
            b.iter(|| {
                let inferred = infer_precision(black_box(&signal));
                black_box(inferred);
            });
        });
    }

    group.finish();
}

/// Benchmark conversion to integers.
fn bench_quantize(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantize");

    for size in SIZES.iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let signal = random_signal(size, 500.0);
            b.iter(|| {
                let quantized = quantize(black_box(&signal), 2);
                black_box(quantized);
            });
        });
    }

    group.finish();
}

/// Benchmark interval detection on signals with regular gaps.
fn bench_find_intervals(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_intervals");

    for size in SIZES.iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let signal = gapped_signal(size, 500, 50);
            b.iter(|| {
                let mask = validity_mask(black_box(&signal));
                let intervals = find_intervals(&mask, 1000.0, 0, 10);
                black_box(intervals);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_infer_precision,
    bench_quantize,
    bench_find_intervals,
);

criterion_main!(benches);
