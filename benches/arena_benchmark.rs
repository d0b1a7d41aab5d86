use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use arenalloc::{Arena, Strategy};

fn bench_alloc_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("alloc_throughput");

    for strategy in [Strategy::Scratch, Strategy::Linear, Strategy::Stack, Strategy::Pool] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{strategy:?}")),
            &strategy,
            |b, &strategy| {
                let mut arena = Arena::create(strategy, 16, 1 << 20);
                b.iter(|| {
                    let ptr = arena.alloc(black_box(64));
                    if ptr.is_null() {
                        arena.reset();
                    }
                });
                arena.destroy();
            },
        );
    }

    group.finish();
}

fn bench_reset(c: &mut Criterion) {
    c.bench_function("linear_reset_after_growth", |b| {
        b.iter(|| {
            let mut arena = Arena::create(Strategy::Linear, 16, 4096);
            for _ in 0..64 {
                let _ = arena.alloc(black_box(128));
            }
            arena.reset();
            arena.destroy();
        });
    });
}

fn bench_stack_record_unwind(c: &mut Criterion) {
    c.bench_function("stack_record_unwind_round_trip", |b| {
        let mut arena = Arena::create(Strategy::Stack, 16, 1 << 16);
        b.iter(|| {
            arena.record();
            let _ = arena.alloc(black_box(256));
            arena.unwind();
        });
        arena.destroy();
    });
}

criterion_group!(benches, bench_alloc_throughput, bench_reset, bench_stack_record_unwind);
criterion_main!(benches);
