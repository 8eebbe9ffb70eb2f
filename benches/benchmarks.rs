//! Benchmarks for record batch encoding/decoding.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ionic_rs::{Column, DataType, FrameReader, FrameWriter, RecordBatch};

fn generate_test_batch(size: usize) -> RecordBatch {
    let ids: Vec<i32> = (0..size as i32).collect();
    let prices: Vec<Option<f64>> = (0..size)
        .map(|i| (i % 10 != 0).then(|| (i as f64 * 0.001).sin() * 100.0))
        .collect();
    let names: Vec<Option<String>> = (0..size)
        .map(|i| (i % 7 != 0).then(|| format!("item-{}", i)))
        .collect();
    let flags: Vec<bool> = (0..size).map(|i| i % 2 == 0).collect();

    RecordBatch::try_new(vec![
        Column::new("id", DataType::Int32, ids).unwrap(),
        Column::new_nullable("price", DataType::Float64, prices).unwrap(),
        Column::new_nullable("name", DataType::Utf8, names).unwrap(),
        Column::new("flag", DataType::Bool, flags).unwrap(),
    ])
    .unwrap()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for size in [1000, 10000, 100000] {
        let batch = generate_test_batch(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| black_box(batch).encode())
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for size in [1000, 10000, 100000] {
        let encoded = generate_test_batch(size).encode().unwrap();

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| RecordBatch::decode(black_box(encoded)))
        });
    }

    group.finish();
}

fn bench_column_buffers(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_buffers");

    for size in [1000, 10000, 100000] {
        let batch = generate_test_batch(size);
        let names = batch.column_by_name("name").unwrap().clone();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &names, |b, column| {
            b.iter(|| black_box(column).encode_buffers())
        });
    }

    group.finish();
}

fn bench_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip");

    for size in [1000, 10000, 100000] {
        let batch = generate_test_batch(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| {
                let encoded = black_box(batch).encode().unwrap();
                RecordBatch::decode(&encoded)
            })
        });
    }

    group.finish();
}

fn bench_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("frames");

    let batch = generate_test_batch(10000);
    let encoded_len = batch.encode().unwrap().len();

    for frames in [1, 10, 100] {
        group.throughput(Throughput::Bytes((encoded_len * frames) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(frames), &frames, |b, &frames| {
            b.iter(|| {
                let mut writer = FrameWriter::new(Vec::with_capacity(encoded_len * frames));
                for _ in 0..frames {
                    writer.write(black_box(&batch)).unwrap();
                }
                let bytes = writer.finish().unwrap();
                FrameReader::new(bytes.as_slice()).count()
            })
        });
    }

    group.finish();
}

fn bench_encoded_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoded_size");

    for size in [1000, 10000] {
        let batch = generate_test_batch(size);
        let encoded = batch.encode().unwrap();

        let buffer_bytes: usize = batch
            .columns()
            .iter()
            .map(|col| col.encode_buffers().unwrap().byte_len())
            .sum();

        println!(
            "{} rows: {} buffer bytes -> {} encoded bytes (overhead: {} bytes)",
            size,
            buffer_bytes,
            encoded.len(),
            encoded.len() - buffer_bytes
        );

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("rows_{}", size)),
            &encoded,
            |b, encoded| b.iter(|| RecordBatch::peek_metadata(black_box(encoded))),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_column_buffers,
    bench_roundtrip,
    bench_frames,
    bench_encoded_size
);
criterion_main!(benches);
