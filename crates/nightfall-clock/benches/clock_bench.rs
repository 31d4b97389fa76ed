//! Benchmarks for the Nightfall phase clock
//!
//! Measures performance of:
//! - Single countdown evaluation
//! - Boundary detection
//! - Sweeping a full game's worth of polls

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nightfall_clock::PhaseSchedule;

/// Benchmark one countdown evaluation at increasing game ages
fn bench_countdown(c: &mut Criterion) {
    let mut group = c.benchmark_group("countdown");
    let schedule = PhaseSchedule::default();

    for &(elapsed, switches) in &[(30i64, 0u64), (500, 4), (10_000, 80), (1_000_000, 8000)] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}s_{}sw", elapsed, switches)),
            &(elapsed, switches),
            |b, &(e, s)| b.iter(|| schedule.countdown(black_box(e), black_box(s))),
        );
    }
    group.finish();
}

/// Benchmark boundary detection
fn bench_boundary(c: &mut Criterion) {
    let mut group = c.benchmark_group("boundary_crossed");
    let schedule = PhaseSchedule::default();

    for &switches in &[0u64, 10, 1000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::from_parameter(switches),
            &switches,
            |b, &s| b.iter(|| schedule.boundary_crossed(black_box(100_000), black_box(s))),
        );
    }
    group.finish();
}

/// Benchmark a sweep of one poll per wall second over a whole game
fn bench_poll_sweep(c: &mut Criterion) {
    let mut group = c.benchmark_group("poll_sweep");
    let schedule = PhaseSchedule::default();

    for &seconds in &[600i64, 3600, 36_000] {
        group.throughput(Throughput::Elements(seconds as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(seconds),
            &seconds,
            |b, &n| {
                b.iter(|| {
                    let mut switches = 0u64;
                    for elapsed in 0..n {
                        if schedule.boundary_crossed(elapsed, switches) {
                            switches += 1;
                        }
                        black_box(schedule.countdown(elapsed, switches));
                    }
                    switches
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_countdown, bench_boundary, bench_poll_sweep);
criterion_main!(benches);
