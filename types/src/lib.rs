//! Core domain types for keycheck.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod ids;
mod outcome;
mod registration;
mod request;
mod text;

pub use ids::{CredentialId, CredentialIdError, base64url};
pub use outcome::{ActionOutput, EMPTY_OUTPUT, Outcome, PENDING_MARK, RunState, Settlement};
pub use registration::{
    AttestationPayload, CredentialDescriptor, CredentialType, RegistrationLevel,
    RegistrationRecord, UnknownRegistrationLevel,
};
pub use request::{
    ALG_ES256, Assertion, AuthenticatorAttachment, AuthenticatorSelection, CreatedCredential,
    CredentialAssertionRequest, CredentialCreationRequest, PubKeyCredParam, RelyingParty,
    UserEntity, UserVerification,
};
pub use text::{ID_ELISION, strip_control, truncate_id};
