use std::{hint::black_box, io::Cursor, time::Duration};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rdb_stream::{decode_intset, decode_ziplist, engine::rdb::lzf, NullListener, RdbParser};

fn enc_len(len: usize) -> Vec<u8> {
    if len < 1 << 6 {
        vec![len as u8]
    } else if len < 1 << 14 {
        vec![0x40 | (len >> 8) as u8, len as u8]
    } else {
        let mut out = vec![0x80];
        out.extend_from_slice(&(len as u32).to_be_bytes());
        out
    }
}

fn enc_str(s: &[u8]) -> Vec<u8> {
    let mut out = enc_len(s.len());
    out.extend_from_slice(s);
    out
}

/// Ziplist из `n` коротких строк.
fn ziplist(n: usize) -> Vec<u8> {
    let mut body = Vec::new();
    let mut tail = 10;
    let mut prev = 0u8;
    for i in 0..n {
        tail = 10 + body.len();
        let item = format!("item:{i:06}");
        body.push(prev);
        body.push(item.len() as u8);
        body.extend_from_slice(item.as_bytes());
        prev = (item.len() + 2) as u8;
    }
    let mut out = Vec::new();
    out.extend_from_slice(&((body.len() + 11) as u32).to_le_bytes());
    out.extend_from_slice(&(tail as u32).to_le_bytes());
    out.extend_from_slice(&(n.min(u16::MAX as usize) as u16).to_le_bytes());
    out.extend(body);
    out.push(0xFF);
    out
}

fn intset(n: usize) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&8u32.to_le_bytes());
    out.extend_from_slice(&(n as u32).to_le_bytes());
    for i in 0..n as i64 {
        out.extend_from_slice(&(i32::MAX as i64 + i).to_le_bytes());
    }
    out
}

/// Снапшот с `keys` строковыми ключами и одним хешем на каждые десять ключей.
fn snapshot(keys: usize) -> Vec<u8> {
    let mut out = b"REDIS0009".to_vec();
    out.extend_from_slice(&[0xFE, 0x00]);
    for i in 0..keys {
        out.push(0x00);
        out.extend(enc_str(format!("key:{i}").as_bytes()));
        out.extend(enc_str(format!("value:{i}:{}", "x".repeat(32)).as_bytes()));
        if i % 10 == 0 {
            out.push(0x04);
            out.extend(enc_str(format!("hash:{i}").as_bytes()));
            out.extend(enc_len(8));
            for f in 0..8 {
                out.extend(enc_str(format!("field{f}").as_bytes()));
                out.extend(enc_str((f * i).to_string().as_bytes()));
            }
        }
    }
    out.push(0xFF);
    out.extend_from_slice(&[0; 8]);
    out
}

fn bench_lzf(c: &mut Criterion) {
    let mut group = c.benchmark_group("lzf_decompress");

    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let raw: Vec<u8> = (0..size).map(|i| b"abcdefgh"[(i / 7) % 8]).collect();
        let compressed = lzf::compress(&raw);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &compressed, |b, input| {
            b.iter(|| lzf::decompress(black_box(input), size).unwrap());
        });
    }
    group.finish();
}

fn bench_containers(c: &mut Criterion) {
    let mut group = c.benchmark_group("containers");

    for n in [16usize, 512, 8192] {
        group.throughput(Throughput::Elements(n as u64));

        let zl = ziplist(n);
        group.bench_with_input(BenchmarkId::new("ziplist", n), &zl, |b, blob| {
            b.iter(|| decode_ziplist(black_box(blob)).unwrap());
        });

        let is = intset(n);
        group.bench_with_input(BenchmarkId::new("intset", n), &is, |b, blob| {
            b.iter(|| decode_intset(black_box(blob)).unwrap());
        });
    }
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_snapshot");
    group.measurement_time(Duration::from_secs(10));

    for keys in [1_000usize, 50_000] {
        let data = snapshot(keys);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(keys), &data, |b, data| {
            b.iter(|| {
                RdbParser::new(Cursor::new(black_box(data)))
                    .parse(&mut NullListener)
                    .unwrap()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_lzf, bench_containers, bench_parse);
criterion_main!(benches);
