use std::sync::Arc;
use std::time::Duration;

use bulwark_common::time::SystemClock;
use bulwark_core::command::metrics::{RollingNumber, RollingPercentile};
use bulwark_core::{Command, CommandConfig, CommandRegistry, EventType};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[derive(Debug, thiserror::Error)]
#[error("unavailable")]
struct Unavailable;

fn execute_benchmark(c: &mut Criterion) {
    let registry = Arc::new(CommandRegistry::new());
    registry.declare("bench", "bench", CommandConfig::default()).expect("valid config");

    let mut group = c.benchmark_group("command_execute");
    group.sample_size(50).measurement_time(Duration::from_secs(5));

    group.bench_function("success", |b| {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let registry = Arc::clone(&registry);

        b.iter(|| {
            let registry = Arc::clone(&registry);
            runtime.block_on(async move {
                let value = registry
                    .execute("bench", Command::new(|| async { Ok::<u64, Unavailable>(42) }))
                    .await;
                black_box(value.is_ok());
            });
        });
    });

    group.bench_function("fallback", |b| {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let registry = Arc::new(CommandRegistry::new());
        let config = CommandConfig::builder().force_closed(true).build().expect("valid config");
        registry.declare("failing", "bench", config).expect("valid config");

        b.iter(|| {
            let registry = Arc::clone(&registry);
            runtime.block_on(async move {
                let command = Command::new(|| async { Err::<u64, _>(Unavailable) })
                    .fallback(|_| async { Ok(0) });
                black_box(registry.execute("failing", command).await.is_ok());
            });
        });
    });

    group.finish();
}

fn metrics_benchmark(c: &mut Criterion) {
    let clock = Arc::new(SystemClock);
    let mut group = c.benchmark_group("command_metrics");

    let counter = RollingNumber::new(Duration::from_secs(10), 10, Arc::clone(&clock));
    group.bench_function("rolling_number_increment", |b| {
        b.iter(|| counter.increment(black_box(EventType::Success)));
    });

    let latencies = RollingPercentile::new(Duration::from_secs(60), 6, 100, Arc::clone(&clock));
    for value in 0..100 {
        latencies.add_value(value);
    }
    group.bench_function("rolling_percentile_snapshot", |b| {
        b.iter(|| black_box(latencies.snapshot().percentile(99.0)));
    });

    let registry = CommandRegistry::new();
    let handle = registry.handle_or_default("admit");
    group.bench_function("breaker_admit", |b| {
        b.iter(|| black_box(handle.breaker().admit()));
    });

    group.finish();
}

criterion_group!(command_benchmarks, execute_benchmark, metrics_benchmark);
criterion_main!(command_benchmarks);
