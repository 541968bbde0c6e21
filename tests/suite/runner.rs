//! Trigger semantics through the public runner API.

use std::sync::Arc;

use keycheck_core::CeremonyError;
use keycheck_engine::{NullView, RunnerError, ScenarioError, ScenarioRunner};
use keycheck_types::{ActionOutput, Outcome, RunState};
use tokio::sync::Notify;

#[tokio::test]
async fn invalid_state_against_both_expectations() {
    let mut runner = ScenarioRunner::new(Arc::new(NullView), 8);
    for (selector, expected) in [
        ("expects-invalid-state", Outcome::InvalidStateError),
        ("expects-success", Outcome::Success),
    ] {
        runner
            .attach(selector, expected, || async {
                Err(ScenarioError::from(CeremonyError::invalid_state(
                    "credential already registered",
                )))
            })
            .unwrap();
    }

    let matched = runner.activate("expects-invalid-state").await.unwrap();
    let missed = runner.activate("expects-success").await.unwrap();

    assert!(matched.matched);
    assert!(!missed.matched);
    assert_eq!(missed.outcome, Outcome::InvalidStateError);
    for snapshot in runner.snapshot() {
        assert!(matches!(snapshot.state, RunState::Settled(_)));
    }
}

#[tokio::test]
async fn reactivation_while_running_is_refused() {
    let gate = Arc::new(Notify::new());
    let mut runner = ScenarioRunner::new(Arc::new(NullView), 8);
    let action_gate = gate.clone();
    runner
        .attach("slow", Outcome::Success, move || {
            let gate = action_gate.clone();
            async move {
                gate.notified().await;
                Ok(ActionOutput::Nothing)
            }
        })
        .unwrap();
    let runner = Arc::new(runner);

    let background = tokio::spawn({
        let runner = runner.clone();
        async move { runner.activate("slow").await }
    });
    while !runner.trigger("slow").unwrap().state().is_running() {
        tokio::task::yield_now().await;
    }

    let refused = runner.activate("slow").await;
    assert!(matches!(refused, Err(RunnerError::Activation(_))));

    gate.notify_one();
    let settled = background.await.unwrap().unwrap();
    assert!(settled.matched);
    assert_eq!(settled.output, "-");
}
