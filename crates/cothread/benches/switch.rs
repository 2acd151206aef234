use cothread::{this_coroutine, Builder, Coroutine, CoroutineConfig};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

fn coroutine_create(c: &mut Criterion) {
    let config = CoroutineConfig::compiled();

    c.bench_function("coroutine_create", |b| {
        b.iter(|| {
            let mut co = Builder::from_config(config.clone())
                .spawn(|| {})
                .unwrap_or_else(|e| panic!("spawn failed: {}", e));
            // Must run to completion before the handle may drop
            co.join();
            black_box(co.id())
        })
    });
}

fn coroutine_yield(c: &mut Criterion) {
    let stop = Arc::new(AtomicBool::new(false));
    let count = Arc::new(AtomicUsize::new(0));

    let body_stop = Arc::clone(&stop);
    let body_count = Arc::clone(&count);
    let mut co = Coroutine::new(move || {
        while !body_stop.load(Ordering::Relaxed) {
            body_count.fetch_add(1, Ordering::Relaxed);
            this_coroutine::yield_now();
        }
    });

    c.bench_function("coroutine_yield_round_trip", |b| b.iter(|| co.join()));

    stop.store(true, Ordering::Relaxed);
    co.join();
    black_box(count.load(Ordering::Relaxed));
}

fn coroutine_sleep_zero(c: &mut Criterion) {
    c.bench_function("coroutine_sleep_zero", |b| {
        b.iter(|| {
            let mut co = Coroutine::new(|| this_coroutine::sleep_ms(0));
            co.join();
        })
    });
}

criterion_group!(
    name = switch;
    config = Criterion::default();
    targets = coroutine_create, coroutine_yield, coroutine_sleep_zero
);
criterion_main!(switch);
