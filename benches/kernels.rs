//! Plain vs instrumented kernel benchmarks
//!
//! Compares each kernel's plain variant against its instrumented variant under
//! the no-op, counting and tracing adapters.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use instrument_overhead_bench::adapter::{CountingInstrument, NoopInstrument, TracingInstrument};
use instrument_overhead_bench::kernels::fibonacci;
use instrument_overhead_bench::kernels::matmul::{Fill, Matrices};
use instrument_overhead_bench::KernelFlavor;

fn bench_matmul(c: &mut Criterion) {
    let mut group = c.benchmark_group("matmul");

    let flavors = [KernelFlavor::C, KernelFlavor::Native];
    for flavor in flavors.into_iter().filter(KernelFlavor::is_available) {
        for size in [8usize, 32, 64] {
            let mut m = Matrices::new(size);
            m.reset(Fill::Standard);

            group.bench_with_input(
                BenchmarkId::new(format!("{}/plain", flavor.as_str()), size),
                &flavor,
                |b, &flavor| b.iter(|| black_box(m.mm(flavor))),
            );

            let mut noop = NoopInstrument;
            group.bench_with_input(
                BenchmarkId::new(format!("{}/noop", flavor.as_str()), size),
                &flavor,
                |b, &flavor| b.iter(|| black_box(m.mm_inst(flavor, &mut noop))),
            );

            let mut counting = CountingInstrument::new();
            group.bench_with_input(
                BenchmarkId::new(format!("{}/counting", flavor.as_str()), size),
                &flavor,
                |b, &flavor| b.iter(|| black_box(m.mm_inst(flavor, &mut counting))),
            );

            let mut tracing = TracingInstrument::new();
            group.bench_with_input(
                BenchmarkId::new(format!("{}/tracing", flavor.as_str()), size),
                &flavor,
                |b, &flavor| b.iter(|| black_box(m.mm_inst(flavor, &mut tracing))),
            );
        }
    }

    group.finish();
}

fn bench_fibonacci(c: &mut Criterion) {
    let mut group = c.benchmark_group("fibonacci");
    let n = 24;

    for cutoff in [12u64, 18, 24] {
        group.bench_with_input(BenchmarkId::new("plain", cutoff), &cutoff, |b, _| {
            b.iter(|| fibonacci::fib(black_box(n)))
        });

        group.bench_with_input(BenchmarkId::new("noop", cutoff), &cutoff, |b, &cutoff| {
            b.iter(|| fibonacci::fib_inst(black_box(n), cutoff, &mut NoopInstrument))
        });

        let mut tracing = TracingInstrument::new();
        group.bench_with_input(BenchmarkId::new("tracing", cutoff), &cutoff, |b, &cutoff| {
            b.iter(|| fibonacci::fib_inst(black_box(n), cutoff, &mut tracing))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_matmul, bench_fibonacci);
criterion_main!(benches);
