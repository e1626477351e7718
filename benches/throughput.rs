//! Throughput Benchmark for FlashRESP
//!
//! This benchmark measures encoding and decoding speed for typical
//! command-sized frames and for large bulk payloads.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flashresp::marshal::marshal_any;
use flashresp::protocol::{decode_one, BulkString, Marshal, Pool};
use flashresp::stream::{encode_one, Body, Encoder};
use std::collections::HashMap;
use std::io;

/// Benchmark generic marshaling with and without a reused pool
fn bench_marshal(c: &mut Criterion) {
    let command = ["SET", "user:1000", "some_value"];

    let mut group = c.benchmark_group("marshal");
    group.throughput(Throughput::Elements(1));

    group.bench_function("command_fresh_pool", |b| {
        b.iter(|| {
            black_box(marshal_any(black_box(&command), None).unwrap());
        });
    });

    group.bench_function("command_reused_pool", |b| {
        let mut pool = Pool::new();
        b.iter(|| {
            black_box(marshal_any(black_box(&command), Some(&mut pool)).unwrap());
        });
    });

    group.bench_function("nested_arrays", |b| {
        let nested: Vec<Vec<i64>> = (0..32).map(|i| (0..32).map(|j| i * j).collect()).collect();
        let mut pool = Pool::new();
        b.iter(|| {
            black_box(marshal_any(&nested, Some(&mut pool)).unwrap());
        });
    });

    group.bench_function("map_100_entries", |b| {
        let map: HashMap<String, i64> = (0..100).map(|i| (format!("field:{}", i), i)).collect();
        let mut pool = Pool::new();
        b.iter(|| {
            black_box(marshal_any(&map, Some(&mut pool)).unwrap());
        });
    });

    group.bench_function("bulk_string_scalar", |b| {
        let value = BulkString::new("x".repeat(1024));
        let mut pool = Pool::new();
        b.iter(|| {
            black_box(value.marshal(Some(&mut pool)).unwrap());
        });
    });

    group.finish();
}

/// Benchmark decoding complete frames
fn bench_decode(c: &mut Criterion) {
    let command = marshal_any(&["SET", "user:1000", "some_value"], None).unwrap();
    let large = marshal_any(&Bytes::from("x".repeat(64 * 1024)), None).unwrap();
    let pipeline: Vec<u8> = (0..100).flat_map(|_| command.iter().copied()).collect();

    let mut group = c.benchmark_group("decode");

    group.throughput(Throughput::Bytes(command.len() as u64));
    group.bench_function("command", |b| {
        let mut pool = Pool::new();
        b.iter(|| {
            let mut source = &command[..];
            black_box(decode_one(&mut source, Some(&mut pool)).unwrap());
        });
    });

    group.throughput(Throughput::Bytes(large.len() as u64));
    group.bench_function("bulk_64kb", |b| {
        let mut pool = Pool::new();
        b.iter(|| {
            let mut source = &large[..];
            black_box(decode_one(&mut source, Some(&mut pool)).unwrap());
        });
    });

    group.throughput(Throughput::Elements(100));
    group.bench_function("pipeline_100", |b| {
        let mut pool = Pool::new();
        b.iter(|| {
            let mut source = &pipeline[..];
            for _ in 0..100 {
                black_box(decode_one(&mut source, Some(&mut pool)).unwrap());
            }
        });
    });

    group.finish();
}

/// Benchmark the streaming encoder against one-shot encoding
fn bench_stream(c: &mut Criterion) {
    let payload = vec![b'x'; 1024 * 1024];

    let mut group = c.benchmark_group("stream");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    group.bench_function("encode_reader_1mb", |b| {
        b.iter(|| {
            let mut encoder = Encoder::new(io::sink());
            encoder
                .encode_reader(Body::new(&payload[..], payload.len()))
                .unwrap();
            encoder.flush().unwrap();
        });
    });

    group.bench_function("encode_bytes_1mb", |b| {
        let body = Bytes::from(payload.clone());
        b.iter(|| {
            let mut encoder = Encoder::new(io::sink());
            encoder.encode(&body).unwrap();
            encoder.flush().unwrap();
        });
    });

    group.bench_function("encode_one_1mb", |b| {
        let body = Bytes::from(payload.clone());
        let mut pool = Pool::new();
        b.iter(|| {
            encode_one(&mut io::sink(), &body, Some(&mut pool)).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_marshal, bench_decode, bench_stream);

criterion_main!(benches);
