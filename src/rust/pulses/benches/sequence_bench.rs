// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pulses::{Pulse, PulseSequence, Shape};
use std::hint::black_box;

/// Drive pulses on four channels, each overlapping its neighbours.
fn create_sequence(n: usize) -> PulseSequence {
    (0..n as i64)
        .map(|i| {
            let channel = format!("qd{}", i % 4);
            Pulse::drive(
                i * 30,
                40,
                0.5,
                100_000_000,
                0.0,
                Shape::Gaussian { rel_sigma: 5.0 },
                Some(&channel),
                i % 4,
            )
        })
        .collect()
}

fn bench_overlap_intervals(c: &mut Criterion) {
    let sizes = [16, 64, 256];

    let mut group = c.benchmark_group("overlap_intervals");

    for &size in &sizes {
        let sequence = create_sequence(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(sequence.overlap_intervals()));
        });
    }

    group.finish();
}

fn bench_partition(c: &mut Criterion) {
    let sizes = [16, 64, 256];

    let mut group = c.benchmark_group("partition_non_overlapping");

    for &size in &sizes {
        let sequence = create_sequence(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| black_box(sequence.partition_non_overlapping()));
        });
    }

    group.finish();
}

fn bench_synthesize(c: &mut Criterion) {
    let sequence = create_sequence(64);
    c.bench_function("synthesize_64", |b| {
        b.iter(|| black_box(sequence.synthesize(pulses::DEFAULT_SAMPLING_RATE)))
    });
}

criterion_group!(
    benches,
    bench_overlap_intervals,
    bench_partition,
    bench_synthesize
);
criterion_main!(benches);
