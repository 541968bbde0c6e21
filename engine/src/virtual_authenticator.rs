//! In-process authenticator pair standing in for the platform credential API.
//!
//! A platform authenticator answers requests hinting `platform` attachment,
//! a roaming one answers everything else. Credentials are opaque random ids;
//! nothing is signed. State lives in its own blob-store slot so separate
//! harness runs see the same authenticators.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use keycheck_core::{
    BlobStore, CHALLENGE_LEN, CeremonyError, CeremonyFut, CredentialCeremony, RandomSource,
    random_base64url,
};
use keycheck_types::{
    Assertion, AttestationPayload, AuthenticatorAttachment, CreatedCredential,
    CredentialAssertionRequest, CredentialCreationRequest, CredentialDescriptor, CredentialId,
    base64url,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

pub const VIRTUAL_AUTHENTICATOR_SLOT: &str = "keycheckVirtualAuthenticator";

/// Length of minted credential ids, in bytes.
const CREDENTIAL_ID_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorKind {
    Platform,
    Roaming,
}

impl AuthenticatorKind {
    fn for_attachment(attachment: Option<AuthenticatorAttachment>) -> Self {
        match attachment {
            Some(AuthenticatorAttachment::Platform) => AuthenticatorKind::Platform,
            Some(AuthenticatorAttachment::CrossPlatform) | None => AuthenticatorKind::Roaming,
        }
    }

    fn attachment(self) -> AuthenticatorAttachment {
        match self {
            AuthenticatorKind::Platform => AuthenticatorAttachment::Platform,
            AuthenticatorKind::Roaming => AuthenticatorAttachment::CrossPlatform,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeldCredential {
    id: CredentialId,
    user_handle: String,
    user_name: String,
    discoverable: bool,
    /// Creation order across both authenticators.
    sequence: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlatformState {
    #[serde(default)]
    platform: Vec<HeldCredential>,
    #[serde(default)]
    roaming: Vec<HeldCredential>,
    #[serde(default)]
    next_sequence: u64,
}

impl PlatformState {
    fn held(&self, kind: AuthenticatorKind) -> &[HeldCredential] {
        match kind {
            AuthenticatorKind::Platform => &self.platform,
            AuthenticatorKind::Roaming => &self.roaming,
        }
    }

    fn held_mut(&mut self, kind: AuthenticatorKind) -> &mut Vec<HeldCredential> {
        match kind {
            AuthenticatorKind::Platform => &mut self.platform,
            AuthenticatorKind::Roaming => &mut self.roaming,
        }
    }

    /// First allowed credential, platform authenticator first.
    fn find_allowed(
        &self,
        allow: &[CredentialDescriptor],
    ) -> Option<(AuthenticatorKind, &HeldCredential)> {
        [AuthenticatorKind::Platform, AuthenticatorKind::Roaming]
            .into_iter()
            .find_map(|kind| {
                allow.iter().find_map(|descriptor| {
                    self.held(kind)
                        .iter()
                        .find(|held| held.id == descriptor.id)
                        .map(|held| (kind, held))
                })
            })
    }

    fn latest_discoverable(&self) -> Option<(AuthenticatorKind, &HeldCredential)> {
        let platform = self
            .platform
            .iter()
            .map(|held| (AuthenticatorKind::Platform, held));
        let roaming = self
            .roaming
            .iter()
            .map(|held| (AuthenticatorKind::Roaming, held));
        platform
            .chain(roaming)
            .filter(|(_, held)| held.discoverable)
            .max_by_key(|(_, held)| held.sequence)
    }
}

pub struct VirtualPlatform {
    store: Arc<dyn BlobStore>,
    slot: String,
    random: Arc<dyn RandomSource>,
    /// Serializes load-modify-save cycles within this process.
    lock: Mutex<()>,
}

impl fmt::Debug for VirtualPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualPlatform")
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

impl VirtualPlatform {
    pub fn new(store: Arc<dyn BlobStore>, random: Arc<dyn RandomSource>) -> Self {
        Self::with_slot(store, VIRTUAL_AUTHENTICATOR_SLOT, random)
    }

    pub fn with_slot(
        store: Arc<dyn BlobStore>,
        slot: impl Into<String>,
        random: Arc<dyn RandomSource>,
    ) -> Self {
        Self {
            store,
            slot: slot.into(),
            random,
            lock: Mutex::new(()),
        }
    }

    /// Which authenticator holds `id`, if any.
    #[must_use]
    pub fn holder(&self, id: &CredentialId) -> Option<AuthenticatorKind> {
        let state = self.load();
        [AuthenticatorKind::Platform, AuthenticatorKind::Roaming]
            .into_iter()
            .find(|kind| state.held(*kind).iter().any(|held| &held.id == id))
    }

    fn create_now(
        &self,
        request: &CredentialCreationRequest,
    ) -> Result<CreatedCredential, CeremonyError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut state = self.load();
        let selection = request.authenticator_selection;
        let kind = AuthenticatorKind::for_attachment(selection.authenticator_attachment);

        if let Some(existing) = state.held(kind).iter().find(|held| {
            request
                .exclude_credentials
                .iter()
                .any(|descriptor| descriptor.id == held.id)
        }) {
            debug!(id = %existing.id, ?kind, "Excluded credential already present");
            return Err(CeremonyError::invalid_state(
                "The user attempted to register an authenticator that contains one of the credentials already registered with the relying party.",
            ));
        }

        let mut raw_id = vec![0u8; CREDENTIAL_ID_LEN];
        self.random.fill_bytes(&mut raw_id);
        let id = CredentialId::from_bytes(&raw_id);
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.held_mut(kind).push(HeldCredential {
            id: id.clone(),
            user_handle: request.user.id.clone(),
            user_name: request.user.name.clone(),
            discoverable: selection.require_resident_key,
            sequence,
        });
        self.save(&state)?;
        debug!(id = %id, ?kind, discoverable = selection.require_resident_key, "Virtual credential created");

        let client_data = json!({
            "type": "webauthn.create",
            "challenge": request.challenge,
            "rpName": request.rp.name,
        });
        let attestation_object = json!({ "fmt": "none", "attStmt": {} });
        let attestation = AttestationPayload::new(json!({
            "id": id.as_str(),
            "rawId": id.as_str(),
            "type": "public-key",
            "authenticatorAttachment": kind.attachment(),
            "response": {
                "clientDataJSON": encode_json(&client_data),
                "attestationObject": encode_json(&attestation_object),
            },
        }));
        Ok(CreatedCredential { id, attestation })
    }

    fn get_now(&self, request: &CredentialAssertionRequest) -> Result<Assertion, CeremonyError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self.load();
        let found = if request.allow_credentials.is_empty() {
            state.latest_discoverable()
        } else {
            state.find_allowed(&request.allow_credentials)
        };
        let Some((kind, held)) = found else {
            debug!(
                allowed = request.allow_credentials.len(),
                "No virtual credential answers the request"
            );
            return Err(CeremonyError::not_allowed(
                "The operation either timed out or was not allowed.",
            ));
        };
        debug!(id = %held.id, ?kind, "Virtual assertion");

        let client_data = json!({
            "type": "webauthn.get",
            "challenge": request.challenge,
        });
        let payload = json!({
            "id": held.id.as_str(),
            "rawId": held.id.as_str(),
            "type": "public-key",
            "authenticatorAttachment": kind.attachment(),
            "response": {
                "clientDataJSON": encode_json(&client_data),
                "authenticatorData": random_base64url(self.random.as_ref(), 37),
                "signature": random_base64url(self.random.as_ref(), CHALLENGE_LEN),
                "userHandle": held.user_handle,
            },
        });
        Ok(Assertion {
            id: held.id.clone(),
            user_handle: Some(held.user_handle.clone()),
            payload,
        })
    }

    fn load(&self) -> PlatformState {
        match self.store.read(&self.slot) {
            Ok(Some(blob)) => serde_json::from_str(&blob).unwrap_or_else(|e| {
                warn!(slot = %self.slot, "Malformed virtual authenticator state, resetting: {e}");
                PlatformState::default()
            }),
            Ok(None) => PlatformState::default(),
            Err(e) => {
                warn!(slot = %self.slot, "Failed to read virtual authenticator state: {e}");
                PlatformState::default()
            }
        }
    }

    fn save(&self, state: &PlatformState) -> Result<(), CeremonyError> {
        let blob = serde_json::to_string_pretty(state)
            .map_err(|e| CeremonyError::other("UnknownError", e.to_string()))?;
        self.store.write(&self.slot, &blob).map_err(|e| {
            warn!(slot = %self.slot, "Failed to persist virtual authenticator state: {e}");
            CeremonyError::other("UnknownError", e.to_string())
        })
    }
}

impl CredentialCeremony for VirtualPlatform {
    fn create<'a>(
        &'a self,
        request: &'a CredentialCreationRequest,
    ) -> CeremonyFut<'a, CreatedCredential> {
        Box::pin(async move { self.create_now(request) })
    }

    fn get<'a>(&'a self, request: &'a CredentialAssertionRequest) -> CeremonyFut<'a, Assertion> {
        Box::pin(async move { self.get_now(request) })
    }
}

fn encode_json(value: &Value) -> String {
    base64url(value.to_string().as_bytes())
}
