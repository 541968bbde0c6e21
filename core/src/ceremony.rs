//! Seam to the platform credential API.
//!
//! The harness never implements the protocol; it hands a request descriptor to
//! a [`CredentialCeremony`] and observes either a result or a named error.

use std::future::Future;
use std::pin::Pin;

use keycheck_types::{
    Assertion, CreatedCredential, CredentialAssertionRequest, CredentialCreationRequest,
};
use thiserror::Error;

/// Ceremony future type alias.
pub type CeremonyFut<'a, T> = Pin<Box<dyn Future<Output = Result<T, CeremonyError>> + Send + 'a>>;

/// A user-mediated create/get interaction with the platform.
pub trait CredentialCeremony: Send + Sync {
    fn create<'a>(&'a self, request: &'a CredentialCreationRequest) -> CeremonyFut<'a, CreatedCredential>;
    fn get<'a>(&'a self, request: &'a CredentialAssertionRequest) -> CeremonyFut<'a, Assertion>;
}

/// Error kinds the platform reports, named like DOM exceptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CeremonyErrorKind {
    /// A credential in the exclude list already lives on the authenticator.
    InvalidState,
    /// The user or platform refused, or no allowed credential was found.
    NotAllowed,
    Other(String),
}

impl CeremonyErrorKind {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            CeremonyErrorKind::InvalidState => "InvalidStateError",
            CeremonyErrorKind::NotAllowed => "NotAllowedError",
            CeremonyErrorKind::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", .kind.name())]
pub struct CeremonyError {
    pub kind: CeremonyErrorKind,
    pub message: String,
}

impl CeremonyError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self {
            kind: CeremonyErrorKind::InvalidState,
            message: message.into(),
        }
    }

    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self {
            kind: CeremonyErrorKind::NotAllowed,
            message: message.into(),
        }
    }

    pub fn other(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: CeremonyErrorKind::Other(name.into()),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind_name(&self) -> &str {
        self.kind.name()
    }
}
