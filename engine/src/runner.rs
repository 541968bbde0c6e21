//! Scenario runner: triggers bound to an expectation and an async action.
//!
//! Each [`Trigger`] owns its own [`RunState`]. Activation moves it
//! `Idle/Settled -> Running -> Settled`; a trigger that is Running refuses
//! further activations until it settles. An action that panics, or whose
//! activation future is dropped, settles as `Unknown`. Separate triggers are
//! independent and may run interleaved on the same task.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use futures_util::future::join_all;
use keycheck_types::{ActionOutput, EMPTY_OUTPUT, Outcome, RunState, Settlement};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ScenarioError;
use crate::outcome::settle;

/// Scenario action future type alias.
pub type ScenarioFut<'a> =
    Pin<Box<dyn Future<Output = Result<ActionOutput, ScenarioError>> + Send + 'a>>;

pub trait ScenarioAction: Send + Sync {
    fn run(&self) -> ScenarioFut<'_>;
}

impl<F, Fut> ScenarioAction for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<ActionOutput, ScenarioError>> + Send + 'static,
{
    fn run(&self) -> ScenarioFut<'_> {
        Box::pin(self())
    }
}

/// Presentation of a trigger row. Called on attach and on every transition.
pub trait TriggerView: Send + Sync {
    fn on_state(&self, selector: &str, expected: Outcome, state: &RunState);
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullView;

impl TriggerView for NullView {
    fn on_state(&self, _selector: &str, _expected: Outcome, _state: &RunState) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    #[error("{selector} is already running")]
    AlreadyRunning { selector: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    #[error("a trigger is already attached to {selector}")]
    DuplicateSelector { selector: String },
    #[error("no trigger matches {selector}")]
    UnknownSelector { selector: String },
    #[error(transparent)]
    Activation(#[from] ActivationError),
}

pub struct Trigger {
    selector: String,
    expected: Outcome,
    action: Box<dyn ScenarioAction>,
    state: Mutex<RunState>,
    view: Arc<dyn TriggerView>,
    id_prefix_len: usize,
}

impl Trigger {
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    #[must_use]
    pub fn expected(&self) -> Outcome {
        self.expected
    }

    #[must_use]
    pub fn state(&self) -> RunState {
        self.lock_state().clone()
    }

    /// Run the action once and settle.
    ///
    /// Refused while a previous activation is still running; that run is left
    /// untouched. The action is never retried or cancelled.
    pub async fn activate(&self) -> Result<Settlement, ActivationError> {
        {
            let mut state = self.lock_state();
            if state.is_running() {
                debug!(selector = %self.selector, "Activation refused while running");
                return Err(ActivationError::AlreadyRunning {
                    selector: self.selector.clone(),
                });
            }
            *state = RunState::Running;
        }
        let mut guard = AbandonGuard {
            trigger: self,
            armed: true,
        };
        debug!(selector = %self.selector, expected = %self.expected, "Scenario running");
        self.view
            .on_state(&self.selector, self.expected, &RunState::Running);

        let result = self.action.run().await;
        guard.armed = false;
        let settlement = settle(&self.selector, self.expected, &result, self.id_prefix_len);
        debug!(
            selector = %self.selector,
            outcome = %settlement.outcome,
            matched = settlement.matched,
            "Scenario settled"
        );

        let settled = RunState::Settled(settlement.clone());
        *self.lock_state() = settled.clone();
        self.view.on_state(&self.selector, self.expected, &settled);
        Ok(settlement)
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Settles a Running trigger as `Unknown` if its activation never completes.
struct AbandonGuard<'a> {
    trigger: &'a Trigger,
    armed: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let trigger = self.trigger;
        warn!(
            selector = %trigger.selector,
            panicking = thread::panicking(),
            "Scenario abandoned before settling"
        );
        let settled = RunState::Settled(Settlement::new(
            trigger.expected,
            Outcome::Unknown,
            EMPTY_OUTPUT.to_string(),
        ));
        *trigger.lock_state() = settled.clone();
        trigger
            .view
            .on_state(&trigger.selector, trigger.expected, &settled);
    }
}

/// Point-in-time view of one trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSnapshot {
    pub selector: String,
    pub expected: Outcome,
    pub state: RunState,
}

/// Triggers keyed by selector, in attach order.
pub struct ScenarioRunner {
    triggers: Vec<Arc<Trigger>>,
    view: Arc<dyn TriggerView>,
    id_prefix_len: usize,
}

impl ScenarioRunner {
    pub fn new(view: Arc<dyn TriggerView>, id_prefix_len: usize) -> Self {
        Self {
            triggers: Vec::new(),
            view,
            id_prefix_len,
        }
    }

    /// Bind exactly one action to `selector`.
    pub fn attach(
        &mut self,
        selector: impl Into<String>,
        expected: Outcome,
        action: impl ScenarioAction + 'static,
    ) -> Result<(), RunnerError> {
        let selector = selector.into();
        if self.trigger(&selector).is_some() {
            return Err(RunnerError::DuplicateSelector { selector });
        }

        let trigger = Trigger {
            selector,
            expected,
            action: Box::new(action),
            state: Mutex::new(RunState::Idle),
            view: self.view.clone(),
            id_prefix_len: self.id_prefix_len,
        };
        self.view
            .on_state(&trigger.selector, trigger.expected, &RunState::Idle);
        self.triggers.push(Arc::new(trigger));
        Ok(())
    }

    #[must_use]
    pub fn trigger(&self, selector: &str) -> Option<Arc<Trigger>> {
        self.triggers
            .iter()
            .find(|trigger| trigger.selector == selector)
            .cloned()
    }

    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.triggers.iter().map(|trigger| trigger.selector.as_str())
    }

    pub async fn activate(&self, selector: &str) -> Result<Settlement, RunnerError> {
        let trigger = self
            .trigger(selector)
            .ok_or_else(|| RunnerError::UnknownSelector {
                selector: selector.to_string(),
            })?;
        Ok(trigger.activate().await?)
    }

    /// Activate several triggers interleaved on the current task.
    ///
    /// Results come back in the order of `selectors`.
    pub async fn activate_concurrently(
        &self,
        selectors: &[&str],
    ) -> Vec<Result<Settlement, RunnerError>> {
        join_all(selectors.iter().map(|selector| self.activate(selector))).await
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<TriggerSnapshot> {
        self.triggers
            .iter()
            .map(|trigger| TriggerSnapshot {
                selector: trigger.selector.clone(),
                expected: trigger.expected,
                state: trigger.state(),
            })
            .collect()
    }
}
