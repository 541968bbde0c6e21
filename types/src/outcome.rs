//! Outcome taxonomy and per-trigger run state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::CredentialId;
use crate::text::truncate_id;

/// Shown while a trigger is running.
pub const PENDING_MARK: &str = "…";
/// Shown when an action produced no output.
pub const EMPTY_OUTPUT: &str = "-";

/// Classified result of one activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    Success,
    /// The platform refused because a listed credential already exists.
    InvalidStateError,
    /// The platform refused or found no usable credential.
    NotAllowedError,
    /// Local precondition failure from the query builder.
    NoAvailableRegistrations,
    Unknown,
}

impl Outcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "Success",
            Outcome::InvalidStateError => "InvalidStateError",
            Outcome::NotAllowedError => "NotAllowedError",
            Outcome::NoAvailableRegistrations => "NoAvailableRegistrations",
            Outcome::Unknown => "Unknown",
        }
    }

    /// Map an error kind name onto a tag. Uninformative kinds become `Unknown`.
    #[must_use]
    pub fn from_error_kind(kind: &str) -> Self {
        match kind {
            "InvalidStateError" => Outcome::InvalidStateError,
            "NotAllowedError" => Outcome::NotAllowedError,
            "NoAvailableRegistrations" => Outcome::NoAvailableRegistrations,
            _ => Outcome::Unknown,
        }
    }

    #[must_use]
    pub fn matches(self, expected: Outcome) -> bool {
        self == expected
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a scenario action hands back on success.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionOutput {
    #[default]
    Nothing,
    Text(String),
    Credential(CredentialId),
}

impl ActionOutput {
    /// Text is shown verbatim, credential ids are shortened.
    #[must_use]
    pub fn render(&self, id_prefix_len: usize) -> String {
        match self {
            ActionOutput::Nothing => EMPTY_OUTPUT.to_string(),
            ActionOutput::Text(text) => text.clone(),
            ActionOutput::Credential(id) => truncate_id(id.as_str(), id_prefix_len),
        }
    }
}

impl From<String> for ActionOutput {
    fn from(value: String) -> Self {
        ActionOutput::Text(value)
    }
}

impl From<CredentialId> for ActionOutput {
    fn from(value: CredentialId) -> Self {
        ActionOutput::Credential(value)
    }
}

/// Terminal state of one activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub expected: Outcome,
    pub outcome: Outcome,
    pub output: String,
    pub matched: bool,
}

impl Settlement {
    #[must_use]
    pub fn new(expected: Outcome, outcome: Outcome, output: String) -> Self {
        Self {
            expected,
            outcome,
            output,
            matched: outcome.matches(expected),
        }
    }

    #[must_use]
    pub fn match_mark(&self) -> &'static str {
        if self.matched { "✅" } else { "❌" }
    }
}

/// Per-trigger state. `Idle -> Running -> Settled -> Running -> ...`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Settled(Settlement),
}

impl RunState {
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }

    #[must_use]
    pub fn settlement(&self) -> Option<&Settlement> {
        match self {
            RunState::Settled(settlement) => Some(settlement),
            RunState::Idle | RunState::Running => None,
        }
    }

    /// Whether the control accepts a new activation.
    #[must_use]
    pub fn accepts_activation(&self) -> bool {
        !self.is_running()
    }
}
