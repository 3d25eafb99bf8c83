// Compression benchmarks for DocStore

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use docstore::compress::{compress, decompress, CompressionMode};
use rand::Rng;
use std::hint::black_box;

fn text_corpus(len: usize) -> Vec<u8> {
    let words = ["stored", "field", "chunk", "segment", "document", "index", "lorem", "ipsum"];
    let mut rng = rand::rng();
    let mut data = Vec::with_capacity(len + 16);
    while data.len() < len {
        data.extend_from_slice(words[rng.random_range(0..words.len())].as_bytes());
        data.push(b' ');
    }
    data.truncate(len);
    data
}

fn benchmark_compress(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress");

    for size in [4 * 1024, 16 * 1024, 60 * 1024].iter() {
        let data = text_corpus(*size);
        group.throughput(Throughput::Bytes(*size as u64));
        for mode in [CompressionMode::Fast, CompressionMode::High] {
            group.bench_with_input(BenchmarkId::new(format!("{:?}", mode), size), &data, |b, data| {
                b.iter(|| black_box(compress(data, mode)));
            });
        }
    }

    group.finish();
}

fn benchmark_decompress(c: &mut Criterion) {
    let mut group = c.benchmark_group("decompress");

    let size = 60 * 1024;
    let data = text_corpus(size);
    let compressed = compress(&data, CompressionMode::High);
    group.throughput(Throughput::Bytes(size as u64));

    group.bench_function("full", |b| {
        b.iter(|| black_box(decompress(&compressed, size, 0, size).unwrap()));
    });

    // the decoder stops once the window is available
    group.bench_function("prefix_1k", |b| {
        b.iter(|| black_box(decompress(&compressed, size, 0, 1024).unwrap()));
    });

    group.finish();
}

fn benchmark_random_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("incompressible");

    let mut rng = rand::rng();
    let data: Vec<u8> = (0..16 * 1024).map(|_| rng.random()).collect();
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("fast", |b| {
        b.iter(|| black_box(compress(&data, CompressionMode::Fast)));
    });

    group.finish();
}

criterion_group!(benches, benchmark_compress, benchmark_decompress, benchmark_random_data);
criterion_main!(benches);
