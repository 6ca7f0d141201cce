//! End-to-end runs through the public API.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use stepwise::core::{FailureCause, StepKind, Tag, TestResult, TestStep};
use stepwise::events::{BusState, CollectingListener, StepEventBus};
use stepwise::statistics::{
    HistoricalRun, InMemoryHistoryStore, OutcomeSummary, StatisticsEngine, StatisticsListener,
};
use stepwise::testing::{
    assert_has_tag, assert_outcome_result, assert_step_results, assert_warning_contains,
    EventScript,
};
use stepwise::utils::now_utc;

#[test]
fn login_with_failed_submit() {
    let collecting = CollectingListener::shared();
    let mut bus = StepEventBus::new("e2e");
    bus.register_listener(collecting.clone());

    bus.test_started("login", Vec::new()).unwrap();
    bus.step_started("enter credentials").unwrap();
    bus.step_finished().unwrap();
    bus.step_started("submit").unwrap();
    bus.step_failed(FailureCause::assertion("expected dashboard"))
        .unwrap();
    let outcome = bus.test_finished().unwrap();

    assert_outcome_result(&outcome, TestResult::Failure);
    assert_step_results(&outcome, &[TestResult::Success, TestResult::Failure]);
    assert!(outcome.steps().iter().all(|s| !s.is_group()));
    assert_eq!(
        outcome.steps()[1].failure().map(|c| c.message.as_str()),
        Some("expected dashboard")
    );
    assert_eq!(collecting.outcomes().len(), 1);
}

#[test]
fn pending_outranks_successful_siblings() {
    let start = now_utc();
    let checkout = TestStep::group(
        "checkout",
        start,
        vec![
            TestStep::leaf("add to cart", TestResult::Success, start, 10),
            TestStep::leaf("apply coupon", TestResult::Pending, start, 0),
            TestStep::leaf("pay", TestResult::Success, start, 25),
        ],
    );
    assert_eq!(checkout.result(), TestResult::Pending);
    assert_eq!(checkout.duration_ms(), 35);
    assert!(matches!(checkout.kind(), StepKind::Group { children } if children.len() == 3));

    let mut bus = StepEventBus::new("e2e");
    let outcome = EventScript::new()
        .test("checkout")
        .step("checkout")
        .passing_step("add to cart")
        .step("apply coupon")
        .pending_step("coupon service not built yet")
        .passing_step("pay")
        .finish_step()
        .finish_test()
        .run_single(&mut bus)
        .unwrap()
        .unwrap();
    assert_step_results(&outcome, &[TestResult::Pending]);
    assert_outcome_result(&outcome, TestResult::Pending);
}

#[test]
fn unbalanced_steps_are_sealed_as_error() {
    let mut bus = StepEventBus::new("e2e");
    bus.test_started("nested", Vec::new()).unwrap();
    bus.step_started("A").unwrap();
    bus.step_started("B").unwrap();
    let outcome = bus.test_finished().unwrap();

    assert_outcome_result(&outcome, TestResult::Error);
    let a = &outcome.steps()[0];
    assert_eq!(a.description(), "A");
    assert_eq!(a.result(), TestResult::Error);
    assert_eq!(a.children()[0].description(), "B");
    assert_eq!(a.children()[0].result(), TestResult::Error);
    assert_warning_contains(&outcome, "B, A");
    assert_eq!(bus.current_step_depth(), 0);
    assert_eq!(bus.state(), BusState::SuiteRunning);
}

#[test]
fn pass_rate_over_recorded_history() {
    let start = now_utc();
    let results = [
        TestResult::Success,
        TestResult::Success,
        TestResult::Failure,
        TestResult::Success,
        TestResult::Success,
    ];
    let store = InMemoryHistoryStore::with_runs(results.iter().enumerate().map(|(i, r)| {
        HistoricalRun::new("login", *r, start + chrono::Duration::seconds(i as i64))
    }));
    let engine = StatisticsEngine::new(Arc::new(store));

    assert!((engine.pass_rate("login", 5) - 0.8).abs() < 1e-9);
    assert_eq!(engine.pass_rate("logout", 5), 0.0);
}

#[test]
fn suite_feeds_statistics_and_summary() {
    let engine = Arc::new(StatisticsEngine::new(Arc::new(InMemoryHistoryStore::new())));
    let collecting = CollectingListener::shared();
    let mut bus = StepEventBus::new("e2e");
    bus.register_listener(Arc::new(StatisticsListener::new(engine.clone())));
    bus.register_listener(collecting.clone());

    let outcomes = EventScript::new()
        .suite("build-42")
        .tagged_test("login", vec![Tag::parse("feature:auth")])
        .passing_step("open page")
        .screenshot("login-1.png")
        .finish_test()
        .test("search")
        .step("type query")
        .error_step("TimeoutError", "search took too long")
        .finish_test()
        .finish_suite()
        .run(&mut bus)
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    assert_has_tag(&outcomes[0], "auth");
    assert_eq!(outcomes[0].steps()[0].screenshots(), ["login-1.png".to_string()]);

    let summary = OutcomeSummary::from_outcomes(outcomes.iter().map(|o| &**o));
    assert_eq!(summary.total_tests(), 2);
    assert_eq!(summary.passing(), 1);
    assert_eq!(summary.overall_result, TestResult::Error);

    let snapshot = &engine.history(1)[0];
    assert_eq!(snapshot.build_id(), "build-42");
    assert_eq!(snapshot.total_steps(), 2);
    assert_eq!(snapshot.failing_steps(), 1);
    assert_eq!(engine.pass_rate("Login", 10), 1.0);
    assert_eq!(engine.pass_rate("Search", 10), 0.0);
    assert_eq!(collecting.outcomes().len(), 2);
}

#[test]
fn outcome_serializes_to_json() {
    let mut bus = StepEventBus::new("e2e");
    let outcome = EventScript::new()
        .test("loginWithValidUser")
        .passing_step("open")
        .finish_test()
        .run_single(&mut bus)
        .unwrap()
        .unwrap();

    let json = serde_json::to_value(outcome.as_ref()).unwrap();
    assert_eq!(json["title"], "Login with valid user");
    assert_eq!(json["result"], "success");
    assert_eq!(json["steps"][0]["kind"], "leaf");
}
