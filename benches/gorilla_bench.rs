use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gorilla_stream::bitbuffer::BitReader;
use gorilla_stream::timestamp::{encode_timestamps, TimestampDecoder};
use gorilla_stream::value::{encode_values, ValueDecoder};
use gorilla_stream::{decode, EncodeOptions, Encoder, Sample};

/// Generate a realistic time-series dataset: constant 60s interval, slowly varying values.
fn generate_data(n: usize) -> Vec<Sample> {
    (0..n)
        .map(|i| {
            let t = 1_609_459_200 + (i as i64) * 60;
            let v = 20.0 + 5.0 * ((i as f64) * 0.01).sin() + (i as f64) * 0.001;
            Sample::new(t, v)
        })
        .collect()
}

/// Generate a monotonic counter with two-decimal increments.
fn generate_counter_data(n: usize) -> Vec<Sample> {
    let mut total = 0.0;
    (0..n)
        .map(|i| {
            total += ((i % 13) as f64) * 0.25;
            Sample::new(1_609_459_200 + (i as i64) * 15, total)
        })
        .collect()
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for size in [100, 1_000, 10_000, 100_000] {
        let data = generate_data(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("plain", size), &data, |b, data| {
            let enc = Encoder::default();
            b.iter(|| black_box(enc.encode_at(black_box(data), 0).unwrap()));
        });
    }

    for size in [100, 1_000, 10_000, 100_000] {
        let data = generate_counter_data(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("counter_scaled", size), &data, |b, data| {
            let enc = Encoder::new(EncodeOptions::victoria_metrics().with_counter(true));
            b.iter(|| black_box(enc.encode_at(black_box(data), 0).unwrap()));
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for size in [100, 1_000, 10_000, 100_000] {
        let bytes = Encoder::default().encode_at(&generate_data(size), 0).unwrap();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("plain", size), &bytes, |b, bytes| {
            b.iter(|| black_box(decode(black_box(bytes)).unwrap()));
        });
    }

    for size in [100, 1_000, 10_000, 100_000] {
        let opts = EncodeOptions::victoria_metrics().with_counter(true);
        let bytes = Encoder::new(opts)
            .encode_at(&generate_counter_data(size), 0)
            .unwrap();
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("counter_scaled", size), &bytes, |b, bytes| {
            b.iter(|| black_box(decode(black_box(bytes)).unwrap()));
        });
    }

    group.finish();
}

fn bench_substreams(c: &mut Criterion) {
    let mut group = c.benchmark_group("substreams");

    for size in [1_000, 10_000, 100_000] {
        let data = generate_data(size);
        let timestamps: Vec<i64> = data.iter().map(|s| s.timestamp).collect();
        let values: Vec<f64> = data.iter().map(|s| s.value).collect();
        let ts_bits = encode_timestamps(&timestamps).unwrap().bits;
        let val_bits = encode_values(&values).bits;

        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("timestamps", size), &ts_bits, |b, bits| {
            b.iter(|| {
                let reader = BitReader::new(&bits.bytes, bits.bit_len);
                black_box(TimestampDecoder::new(reader, size).count())
            });
        });

        group.bench_with_input(BenchmarkId::new("values", size), &val_bits, |b, bits| {
            b.iter(|| {
                let reader = BitReader::new(&bits.bytes, bits.bit_len);
                black_box(ValueDecoder::new(reader, size).count())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_substreams);
criterion_main!(benches);
