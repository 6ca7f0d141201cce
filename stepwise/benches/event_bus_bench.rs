//! Benchmarks for event bus dispatch and result aggregation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use stepwise::core::{aggregate, TestResult};
use stepwise::events::{NoOpListener, StepEventBus};

fn run_test(bus: &mut StepEventBus, steps: usize) {
    bus.test_started("bench", Vec::new()).unwrap();
    for i in 0..steps {
        bus.step_started(format!("step {i}")).unwrap();
        bus.step_started("nested").unwrap();
        bus.step_finished().unwrap();
        bus.step_finished().unwrap();
    }
    black_box(bus.test_finished().unwrap());
}

fn event_bus_benchmark(c: &mut Criterion) {
    c.bench_function("bus_100_nested_steps", |b| {
        let mut bus = StepEventBus::new("bench");
        bus.register_listener(Arc::new(NoOpListener));
        b.iter(|| {
            bus.test_suite_started("bench").unwrap();
            run_test(&mut bus, 100);
            bus.test_suite_finished().unwrap();
        });
    });

    c.bench_function("bus_unbalanced_seal", |b| {
        let mut bus = StepEventBus::new("bench");
        b.iter(|| {
            bus.test_started("bench", Vec::new()).unwrap();
            for i in 0..20 {
                bus.step_started(format!("open {i}")).unwrap();
            }
            black_box(bus.test_finished().unwrap());
            bus.take_completed_outcomes();
        });
    });
}

fn aggregate_benchmark(c: &mut Criterion) {
    let results: Vec<TestResult> = (0..1000)
        .map(|i| TestResult::ALL[i % TestResult::ALL.len()])
        .collect();
    c.bench_function("aggregate_1000", |b| {
        b.iter(|| black_box(aggregate(results.iter().copied())));
    });
}

criterion_group!(benches, event_bus_benchmark, aggregate_benchmark);
criterion_main!(benches);
