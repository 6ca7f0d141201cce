//! Concurrent contexts do not interfere with each other.

use pretty_assertions::assert_eq;
use std::sync::{Arc, Barrier};
use std::thread;
use stepwise::context::{ContextKey, ContextRegistry};
use stepwise::core::{FailureCause, TestOutcome, TestResult, TestStep};
use stepwise::events::StepEventBus;

type Shape = Vec<(usize, String, TestResult)>;

fn shape_of(steps: &[TestStep], depth: usize, out: &mut Shape) {
    for step in steps {
        out.push((depth, step.description().to_string(), step.result()));
        shape_of(step.children(), depth + 1, out);
    }
}

fn shape(outcome: &TestOutcome) -> (String, TestResult, Shape) {
    let mut steps = Vec::new();
    shape_of(outcome.steps(), 0, &mut steps);
    (outcome.name().to_string(), outcome.result(), steps)
}

/// Drives one test on `bus`, pausing at `barrier` between events when given.
fn drive(
    bus_for: impl Fn(&mut dyn FnMut(&mut StepEventBus)),
    name: &str,
    fail: bool,
    barrier: Option<&Barrier>,
) -> Arc<TestOutcome> {
    let wait = || {
        if let Some(barrier) = barrier {
            barrier.wait();
        }
    };

    bus_for(&mut |bus| bus.test_started(name, Vec::new()).unwrap());
    wait();
    bus_for(&mut |bus| bus.step_started(format!("{name} outer")).unwrap());
    wait();
    bus_for(&mut |bus| bus.step_started(format!("{name} inner")).unwrap());
    wait();
    bus_for(&mut |bus| {
        if fail {
            bus.step_failed(FailureCause::assertion("mismatch")).unwrap();
        } else {
            bus.step_finished().unwrap();
        }
    });
    wait();
    bus_for(&mut |bus| bus.step_finished().unwrap());
    wait();

    let mut outcome = None;
    bus_for(&mut |bus| outcome = Some(bus.test_finished().unwrap()));
    outcome.unwrap()
}

fn run_serially(name: &str, fail: bool) -> Arc<TestOutcome> {
    let registry = ContextRegistry::new();
    let context = registry.resolve(&ContextKey::named(name));
    drive(|f| context.with_bus(|bus| f(bus)), name, fail, None)
}

#[test]
fn concurrent_contexts_match_serial_runs() {
    let registry = Arc::new(ContextRegistry::new());
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [("alpha", false), ("beta", true)]
        .into_iter()
        .map(|(name, fail)| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let key = ContextKey::named(name);
                let outcome = drive(
                    |f| registry.resolve(&key).with_bus(|bus| f(bus)),
                    name,
                    fail,
                    Some(&barrier),
                );
                assert!(registry.release(&key));
                outcome
            })
        })
        .collect();

    let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(shape(&outcomes[0]), shape(&run_serially("alpha", false)));
    assert_eq!(shape(&outcomes[1]), shape(&run_serially("beta", true)));
    assert_eq!(outcomes[0].result(), TestResult::Success);
    assert_eq!(outcomes[1].result(), TestResult::Failure);
    assert!(registry.is_empty());
}

#[test]
fn current_thread_keys_are_distinct() {
    let registry = Arc::new(ContextRegistry::new());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.resolve_current_thread().key().clone())
        })
        .collect();
    let mut keys: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    keys.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    keys.dedup();

    assert_eq!(keys.len(), 4);
    assert_eq!(registry.len(), 4);
}

#[test]
fn release_is_idempotent() {
    let registry = ContextRegistry::new();
    let key = ContextKey::named("worker");
    registry.resolve(&key);

    assert!(registry.release(&key));
    assert!(!registry.release(&key));
    assert!(!registry.release(&ContextKey::named("never-seen")));
    assert!(!registry.contains(&key));
}

#[test]
fn resolve_returns_the_same_context() {
    let registry = ContextRegistry::new();
    let key = ContextKey::named("worker");
    let first = registry.resolve(&key);
    let second = registry.resolve(&key);
    assert!(Arc::ptr_eq(&first, &second));
}
