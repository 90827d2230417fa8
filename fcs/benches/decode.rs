use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fcs::{codec, ByteOrder, DataKind, FileLog, ParameterDescriptor, ParameterScaling};
use rand::{Rng, SeedableRng};

fn params(count: usize, bits: u32, range: u64) -> Vec<ParameterDescriptor> {
    (1..=count)
        .map(|n| ParameterDescriptor {
            index: n,
            short_name: format!("P{n}"),
            bits,
            range,
            scaling: ParameterScaling::Linear { gain: 1.0 },
        })
        .collect()
}

fn float_wire(events: usize, count: usize) -> Vec<u8> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let mut out = Vec::with_capacity(events * count * 4);
    for _ in 0..events * count {
        out.extend_from_slice(&rng.gen_range(0.0f32..1024.0).to_le_bytes());
    }
    out
}

fn integer_wire(events: usize, count: usize) -> Vec<u8> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let mut out = Vec::with_capacity(events * count * 2);
    for _ in 0..events * count {
        out.extend_from_slice(&rng.gen_range(0u16..1024).to_le_bytes());
    }
    out
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for &events in &[10_000usize, 100_000] {
        let count = 12;

        let wire = float_wire(events, count);
        let p = params(count, 32, 1024);
        group.throughput(Throughput::Bytes(wire.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("float32", events),
            &wire,
            |b, wire| {
                b.iter(|| {
                    let mut log = FileLog::new();
                    codec::decode(
                        wire,
                        DataKind::Float,
                        &p,
                        ByteOrder::LittleEndian,
                        Some(events as u64),
                        None,
                        24,
                        &mut log,
                    )
                    .unwrap()
                })
            },
        );

        let wire = integer_wire(events, count);
        let p = params(count, 16, 1024);
        group.throughput(Throughput::Bytes(wire.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("integer16_masked", events),
            &wire,
            |b, wire| {
                b.iter(|| {
                    let mut log = FileLog::new();
                    codec::decode(
                        wire,
                        DataKind::Integer,
                        &p,
                        ByteOrder::LittleEndian,
                        Some(events as u64),
                        None,
                        24,
                        &mut log,
                    )
                    .unwrap()
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
