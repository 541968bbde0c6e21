use keycheck_core::{CeremonyError, QueryError};
use thiserror::Error;

/// Why a scenario action rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Ceremony(#[from] CeremonyError),
    /// An earlier scenario this one depends on has not run.
    #[error("missing prerequisite: run {0} first")]
    MissingPrerequisite(&'static str),
    /// The action ran but its own post-condition failed.
    #[error("{0}")]
    Check(String),
}

impl ScenarioError {
    /// Kind name used for outcome classification.
    #[must_use]
    pub fn kind_name(&self) -> &str {
        match self {
            ScenarioError::Query(err) => err.kind_name(),
            ScenarioError::Ceremony(err) => err.kind_name(),
            ScenarioError::MissingPrerequisite(_) => "MissingPrerequisite",
            ScenarioError::Check(_) => "Error",
        }
    }
}
