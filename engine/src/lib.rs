//! Scenario engine for keycheck.
//!
//! Triggers bind a selector and an expected outcome to an async action, the
//! flows turn registry queries into ceremony requests, and the catalogue wires
//! the two together. [`VirtualPlatform`] stands in for real authenticators.

mod error;
pub mod flows;
pub mod outcome;
pub mod runner;
pub mod scenarios;
pub mod virtual_authenticator;

pub use error::ScenarioError;
pub use flows::{
    HarnessContext, TrustedDeviceOptions, authenticate, register_passkey, register_security_key,
    register_trusted_device,
};
pub use outcome::{classify, settle};
pub use runner::{
    ActivationError, NullView, RunnerError, ScenarioAction, ScenarioFut, ScenarioRunner, Trigger,
    TriggerSnapshot, TriggerView,
};
pub use scenarios::{CATALOGUE, SESSION_SLOT, ScenarioSpec, Session, Step, attach_catalogue};
pub use virtual_authenticator::{AuthenticatorKind, VIRTUAL_AUTHENTICATOR_SLOT, VirtualPlatform};
