//! The manual test catalogue.
//!
//! Run top to bottom on a clean store, every scenario settles on its expected
//! outcome. Later scenarios read what earlier ones remembered through a
//! persisted [`Session`]; running one before its prerequisite has ever run
//! fails with [`ScenarioError::MissingPrerequisite`].

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use keycheck_core::{BlobStore, QueryOptions, random_hex};
use keycheck_types::{ActionOutput, CredentialId, Outcome, RegistrationLevel, truncate_id};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ScenarioError;
use crate::flows::{
    HarnessContext, TrustedDeviceOptions, authenticate, register_passkey, register_security_key,
    register_trusted_device,
};
use crate::runner::{RunnerError, ScenarioRunner};

/// Hex digits in a per-registration user suffix.
const USER_SUFFIX_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    ClearRegistrations,
    AuthMissingPasskey,
    RegisterSecurityKey,
    RegisterTrustedDevice,
    AuthAnyRegistration,
    AuthTrustedDevice,
    IdentifyExistingRegistration,
    RegisterWithIdentifiedException,
    RemoveIdentifiedRegistration,
    RegisterDiscoverablePasskey,
    RegisterDiscoverableUvpa,
    AuthEmptyAllowCredentials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioSpec {
    pub selector: &'static str,
    pub expected: Outcome,
    pub summary: &'static str,
    pub step: Step,
}

const fn spec(selector: &'static str, expected: Outcome, summary: &'static str, step: Step) -> ScenarioSpec {
    ScenarioSpec {
        selector,
        expected,
        summary,
        step,
    }
}

pub const CATALOGUE: [ScenarioSpec; 13] = [
    spec(
        "clear-registrations",
        Outcome::Success,
        "Forget every saved registration",
        Step::ClearRegistrations,
    ),
    spec(
        "auth-missing-passkey",
        Outcome::NoAvailableRegistrations,
        "Authenticate with a passkey before any exists",
        Step::AuthMissingPasskey,
    ),
    spec(
        "register-security-key",
        Outcome::Success,
        "Register a security key",
        Step::RegisterSecurityKey,
    ),
    spec(
        "register-trusted-device",
        Outcome::Success,
        "Register this device with user verification",
        Step::RegisterTrustedDevice,
    ),
    spec(
        "register-duplicate-trusted-device",
        Outcome::InvalidStateError,
        "Register this device again",
        Step::RegisterTrustedDevice,
    ),
    spec(
        "auth-any-registration",
        Outcome::Success,
        "Authenticate with any registration",
        Step::AuthAnyRegistration,
    ),
    spec(
        "auth-trusted-device",
        Outcome::Success,
        "Authenticate with a trusted device",
        Step::AuthTrustedDevice,
    ),
    spec(
        "identify-existing-registration",
        Outcome::Success,
        "Authenticate and remember which registration answered",
        Step::IdentifyExistingRegistration,
    ),
    spec(
        "register-trusted-device-with-identified-exception",
        Outcome::InvalidStateError,
        "Re-offer the identified registration in the exclude list",
        Step::RegisterWithIdentifiedException,
    ),
    spec(
        "remove-identified-registration",
        Outcome::Success,
        "Forget the identified registration",
        Step::RemoveIdentifiedRegistration,
    ),
    spec(
        "register-discoverable-passkey",
        Outcome::Success,
        "Register a roaming passkey for a fresh user",
        Step::RegisterDiscoverablePasskey,
    ),
    spec(
        "register-discoverable-uvpa",
        Outcome::Success,
        "Register a discoverable credential on this device",
        Step::RegisterDiscoverableUvpa,
    ),
    spec(
        "auth-empty-allow-credentials",
        Outcome::Success,
        "Authenticate with no allow list",
        Step::AuthEmptyAllowCredentials,
    ),
];

pub const SESSION_SLOT: &str = "keycheckSession";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Remembered {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identified: Option<CredentialId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected_discoverable: Option<CredentialId>,
}

/// Ids remembered between scenarios.
///
/// Kept in its own blob-store slot, so a later `keycheck run` picks up what
/// an earlier one identified.
pub struct Session {
    store: Arc<dyn BlobStore>,
    slot: String,
    /// Serializes load-modify-save cycles within this process.
    lock: Mutex<()>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self::with_slot(store, SESSION_SLOT)
    }

    pub fn with_slot(store: Arc<dyn BlobStore>, slot: impl Into<String>) -> Self {
        Self {
            store,
            slot: slot.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn identified(&self) -> Option<CredentialId> {
        self.load().identified
    }

    #[must_use]
    pub fn expected_discoverable(&self) -> Option<CredentialId> {
        self.load().expected_discoverable
    }

    fn remember(&self, update: impl FnOnce(&mut Remembered)) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut remembered = self.load();
        update(&mut remembered);
        let written = serde_json::to_string_pretty(&remembered)
            .map_err(|e| e.to_string())
            .and_then(|blob| {
                self.store
                    .write(&self.slot, &blob)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = written {
            warn!(slot = %self.slot, "Failed to persist scenario session: {e}");
        }
    }

    fn load(&self) -> Remembered {
        match self.store.read(&self.slot) {
            Ok(Some(blob)) => serde_json::from_str(&blob).unwrap_or_else(|e| {
                warn!(slot = %self.slot, "Malformed scenario session, resetting: {e}");
                Remembered::default()
            }),
            Ok(None) => Remembered::default(),
            Err(e) => {
                warn!(slot = %self.slot, "Failed to read scenario session: {e}");
                Remembered::default()
            }
        }
    }
}

fn missing(prerequisite: &'static str) -> ScenarioError {
    ScenarioError::MissingPrerequisite(prerequisite)
}

/// Attach every catalogue scenario, in order, sharing one session.
pub fn attach_catalogue(
    runner: &mut ScenarioRunner,
    ctx: Arc<HarnessContext>,
    session: Arc<Session>,
) -> Result<(), RunnerError> {
    for spec in &CATALOGUE {
        let (ctx, session, step) = (ctx.clone(), session.clone(), spec.step);
        runner.attach(spec.selector, spec.expected, move || {
            run_step(step, ctx.clone(), session.clone())
        })?;
    }
    Ok(())
}

pub async fn run_step(
    step: Step,
    ctx: Arc<HarnessContext>,
    session: Arc<Session>,
) -> Result<ActionOutput, ScenarioError> {
    let ctx = ctx.as_ref();
    match step {
        Step::ClearRegistrations => {
            ctx.registry.clear();
            Ok(ActionOutput::Nothing)
        }
        Step::AuthMissingPasskey => {
            let query =
                QueryOptions::level(RegistrationLevel::DiscoverablePasskey).expecting_non_empty();
            Ok(authenticate(ctx, query).await?.id.into())
        }
        Step::RegisterSecurityKey => Ok(register_security_key(ctx, QueryOptions::all()).await?.into()),
        Step::RegisterTrustedDevice => {
            Ok(register_trusted_device(ctx, TrustedDeviceOptions::default()).await?.into())
        }
        Step::AuthAnyRegistration => Ok(authenticate(ctx, QueryOptions::all()).await?.id.into()),
        Step::AuthTrustedDevice => {
            let query = QueryOptions::level(RegistrationLevel::TrustedDevice);
            Ok(authenticate(ctx, query).await?.id.into())
        }
        Step::IdentifyExistingRegistration => {
            let assertion = authenticate(ctx, QueryOptions::all()).await?;
            let id = assertion.id.clone();
            session.remember(|remembered| remembered.identified = Some(id));
            Ok(assertion.id.into())
        }
        Step::RegisterWithIdentifiedException => {
            let identified = session
                .identified()
                .ok_or_else(|| missing("identify-existing-registration"))?;
            let options = TrustedDeviceOptions {
                query: QueryOptions::level(RegistrationLevel::SecurityKey).keeping(identified),
                ..TrustedDeviceOptions::default()
            };
            Ok(register_trusted_device(ctx, options).await?.into())
        }
        Step::RemoveIdentifiedRegistration => {
            let identified = session
                .identified()
                .ok_or_else(|| missing("identify-existing-registration"))?;
            ctx.registry.remove(&identified);
            Ok(ActionOutput::Text(format!(
                "Removed ID: {}",
                truncate_id(identified.as_str(), ctx.id_prefix_len)
            )))
        }
        Step::RegisterDiscoverablePasskey => {
            let suffix = random_hex(ctx.random.as_ref(), USER_SUFFIX_LEN);
            let query = QueryOptions::level(RegistrationLevel::DiscoverablePasskey);
            let id = register_passkey(ctx, query, Some(&suffix)).await?;
            Ok(describe_registration(ctx, &id, &suffix))
        }
        Step::RegisterDiscoverableUvpa => {
            let suffix = random_hex(ctx.random.as_ref(), USER_SUFFIX_LEN);
            let options = TrustedDeviceOptions {
                query: QueryOptions::all(),
                require_resident_key: true,
                user_suffix: Some(suffix.clone()),
            };
            let id = register_trusted_device(ctx, options).await?;
            let expected = id.clone();
            session.remember(|remembered| remembered.expected_discoverable = Some(expected));
            Ok(describe_registration(ctx, &id, &suffix))
        }
        Step::AuthEmptyAllowCredentials => {
            let expected = session
                .expected_discoverable()
                .ok_or_else(|| missing("register-discoverable-uvpa"))?;
            let assertion = authenticate(ctx, QueryOptions::empty_allow_credentials()).await?;
            if assertion.id != expected {
                return Err(ScenarioError::Check("not the same registration!".into()));
            }
            Ok(assertion.id.into())
        }
    }
}

fn describe_registration(ctx: &HarnessContext, id: &CredentialId, suffix: &str) -> ActionOutput {
    ActionOutput::Text(format!(
        "ID: {}\nUser UUID: {suffix}",
        truncate_id(id.as_str(), ctx.id_prefix_len)
    ))
}
