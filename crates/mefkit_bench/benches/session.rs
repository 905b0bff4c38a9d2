//! Session write and read benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mefkit_bench::{gapped_signal, random_signal};
use mefkit_core::{GapTolerance, SessionReader, SessionWriter, WriteRequest, WriterConfig};
use mefkit_storage::{Credentials, FileEngine, InMemoryEngine, OpenMode, TimeRange};
use tempfile::TempDir;

const FS: f64 = 1000.0;

fn memory_writer(config: WriterConfig) -> SessionWriter {
    SessionWriter::open(InMemoryEngine::new(), config, Credentials::none()).unwrap()
}

/// Benchmark appending to one in-memory channel.
fn bench_memory_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_append");

    for size in [1_000, 10_000, 100_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut writer = memory_writer(WriterConfig::default());
            let signal = random_signal(size, 500.0);
            let step = (size as f64 / FS * 1e6) as i64;
            let mut start = 0;

            b.iter(|| {
                let request = WriteRequest::new("eeg", black_box(&signal), start, FS);
                let outcome = writer.write(&request).unwrap();
                black_box(outcome);
                start += step;
            });
        });
    }

    group.finish();
}

/// Benchmark writes whose buffers split into many runs.
fn bench_memory_gapped_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_gapped_write");

    for period in [100, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(period), period, |b, &period| {
            let signal = gapped_signal(100_000, period, period / 4);
            let config = WriterConfig::new().gap_tolerance(GapTolerance::Samples(10));
            b.iter_batched(
                || memory_writer(config.clone()),
                |mut writer| {
                    let outcome = writer
                        .write(&WriteRequest::new("eeg", black_box(&signal), 0, FS))
                        .unwrap();
                    black_box(outcome);
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Benchmark a write followed by flushing the file session.
fn bench_file_write_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_write_flush");
    group.sample_size(20); // Flush rewrites the snapshot

    for size in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let engine = FileEngine::open(
                &temp_dir.path().join("session"),
                OpenMode::Create,
                &Credentials::none(),
            )
            .unwrap();
            let mut writer =
                SessionWriter::open(engine, WriterConfig::default(), Credentials::none()).unwrap();
            let signal = random_signal(size, 500.0);
            let step = (size as f64 / FS * 1e6) as i64;
            let mut start = 0;

            b.iter(|| {
                writer
                    .write(&WriteRequest::new("eeg", black_box(&signal), start, FS))
                    .unwrap();
                writer.flush().unwrap();
                start += step;
            });
        });
    }

    group.finish();
}

/// Benchmark reading a window from a populated channel.
fn bench_read_window(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_window");

    let engine = InMemoryEngine::new();
    let mut writer =
        SessionWriter::open(engine.clone(), WriterConfig::default(), Credentials::none()).unwrap();
    let signal = random_signal(600_000, 500.0);
    writer
        .write(&WriteRequest::new("eeg", &signal, 0, FS))
        .unwrap();
    writer.close().unwrap();
    let reader = SessionReader::open(engine).unwrap();

    for seconds in [1i64, 10, 100].iter() {
        group.throughput(Throughput::Elements((*seconds as u64) * FS as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(seconds),
            seconds,
            |b, &seconds| {
                let range = TimeRange::new(100_000_000, 100_000_000 + seconds * 1_000_000);
                b.iter(|| {
                    let data = reader.read("eeg", Some(black_box(range))).unwrap();
                    black_box(data);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_memory_append,
    bench_memory_gapped_write,
    bench_file_write_flush,
    bench_read_window,
);

criterion_main!(benches);
