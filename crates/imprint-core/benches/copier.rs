//! Benchmarks for the block copier.
//!
//! Run with: cargo bench -p imprint-core

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use imprint_core::StreamCopier;
use std::hint::black_box;
use std::io::{Cursor, Read};

fn generate_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Reader that serves at most `chunk` bytes per call, like a slow drive
struct ChunkedReader<'a> {
    data: &'a [u8],
    pos: usize,
    chunk: usize,
}

impl Read for ChunkedReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Copy with dual digests into a sink, for several image sizes
fn bench_copy(c: &mut Criterion) {
    let mut group = c.benchmark_group("copy");
    group.sample_size(20);

    let sizes = [
        (1024 * 1024, "1MB"),
        (16 * 1024 * 1024, "16MB"),
        (64 * 1024 * 1024, "64MB"),
    ];

    for (size, size_name) in sizes {
        let data = generate_test_data(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("cursor", size_name), &data, |b, data| {
            b.iter(|| {
                StreamCopier::new()
                    .copy(Cursor::new(black_box(data)), std::io::sink(), data.len() as u64)
                    .unwrap()
            });
        });
    }

    group.finish();
}

/// Short reads force the copier to assemble each block from many calls
fn bench_short_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("short_reads");
    let data = generate_test_data(16 * 1024 * 1024);
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk in [2048usize, 64 * 1024] {
        group.bench_with_input(BenchmarkId::new("chunk", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let reader = ChunkedReader {
                    data: &data,
                    pos: 0,
                    chunk,
                };
                StreamCopier::new()
                    .copy(reader, std::io::sink(), data.len() as u64)
                    .unwrap()
            });
        });
    }

    group.finish();
}

/// Overhead of the progress callback
fn bench_progress_callback(c: &mut Criterion) {
    let data = generate_test_data(16 * 1024 * 1024);
    c.bench_function("copy_with_progress", |b| {
        b.iter(|| {
            StreamCopier::new()
                .on_progress(|p| {
                    black_box(p.bytes_done);
                })
                .copy(Cursor::new(&data), std::io::sink(), data.len() as u64)
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_copy, bench_short_reads, bench_progress_callback);
criterion_main!(benches);
