//! Frame codec and receive buffer benchmarks.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use termlink_frame::{decode_header_frame, encode_frame, scan_delimiter, DataMode, ReceiveBuffer};

fn delimited_stream(line_len: usize, lines: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity((line_len + 1) * lines);
    for _ in 0..lines {
        data.extend(std::iter::repeat(b'x').take(line_len));
        data.push(b'\n');
    }
    data
}

fn bench_encode_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_frame");

    for size in [16, 256, 4000] {
        let payload = vec![b'x'; size];
        group.throughput(Throughput::Bytes(size as u64));
        for mode in DataMode::ALL {
            group.bench_with_input(
                BenchmarkId::new(mode.name(), size),
                &payload,
                |b, payload| {
                    b.iter(|| black_box(encode_frame(mode, payload).unwrap()));
                },
            );
        }
    }

    group.finish();
}

fn bench_decode_header_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_header_frame");

    for size in [16, 256, 4000] {
        let encoded = encode_frame(DataMode::PayloadHeader, &vec![b'x'; size]).unwrap();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &encoded, |b, encoded| {
            b.iter(|| {
                let mut buf = BytesMut::from(&encoded[..]);
                black_box(decode_header_frame(&mut buf).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_scan_delimiter(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_delimiter");

    for size in [64, 1024, 4096] {
        let mut data = vec![b'x'; size - 1];
        data.push(b'\n');
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| black_box(scan_delimiter(data)));
        });
    }

    group.finish();
}

fn bench_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("receive_buffer_reassembly");

    // 64 KiB of short lines, fed in read-sized chunks.
    let stream = delimited_stream(40, 1600);
    for chunk in [7, 64, 512] {
        group.throughput(Throughput::Bytes(stream.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut buffer = ReceiveBuffer::new();
                let mut frames = 0usize;
                let mut offset = 0;
                while offset < stream.len() {
                    let spare = buffer.spare_mut();
                    let n = chunk.min(spare.len()).min(stream.len() - offset);
                    spare[..n].copy_from_slice(&stream[offset..offset + n]);
                    buffer.commit(n);
                    offset += n;
                    frames += buffer.drain_frames(|frame| {
                        black_box(frame);
                    });
                }
                black_box(frames)
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_encode_frame,
    bench_decode_header_frame,
    bench_scan_delimiter,
    bench_reassembly,
);
criterion_main!(benches);
