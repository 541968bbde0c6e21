//! Registration records and the descriptors derived from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::CredentialId;

/// How a credential was registered. Fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistrationLevel {
    SecurityKey,
    TrustedDevice,
    DiscoverableTrustedDevice,
    DiscoverablePasskey,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown registration level: {0}")]
pub struct UnknownRegistrationLevel(pub String);

impl RegistrationLevel {
    pub const ALL: [RegistrationLevel; 4] = [
        RegistrationLevel::SecurityKey,
        RegistrationLevel::TrustedDevice,
        RegistrationLevel::DiscoverableTrustedDevice,
        RegistrationLevel::DiscoverablePasskey,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            RegistrationLevel::SecurityKey => "security-key",
            RegistrationLevel::TrustedDevice => "trusted-device",
            RegistrationLevel::DiscoverableTrustedDevice => "discoverable-trusted-device",
            RegistrationLevel::DiscoverablePasskey => "discoverable-passkey",
        }
    }

    /// Whether credentials of this level are resident on the authenticator.
    #[must_use]
    pub const fn is_discoverable(self) -> bool {
        matches!(
            self,
            RegistrationLevel::DiscoverableTrustedDevice | RegistrationLevel::DiscoverablePasskey
        )
    }
}

impl fmt::Display for RegistrationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationLevel {
    type Err = UnknownRegistrationLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownRegistrationLevel(s.to_string()))
    }
}

/// Opaque blob returned by the creation ceremony. Stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttestationPayload(Value);

impl AttestationPayload {
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// A previously created credential, keyed by `id` in the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRecord {
    pub id: CredentialId,
    pub registration_level: RegistrationLevel,
    pub user_name: String,
    pub attestation: AttestationPayload,
}

impl RegistrationRecord {
    /// The descriptor placed in exclude/allow lists.
    #[must_use]
    pub fn descriptor(&self) -> CredentialDescriptor {
        CredentialDescriptor::public_key(self.id.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CredentialType {
    #[default]
    #[serde(rename = "public-key")]
    PublicKey,
}

/// Reference to a credential inside a ceremony request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDescriptor {
    #[serde(rename = "type")]
    pub kind: CredentialType,
    pub id: CredentialId,
}

impl CredentialDescriptor {
    #[must_use]
    pub fn public_key(id: CredentialId) -> Self {
        Self {
            kind: CredentialType::PublicKey,
            id,
        }
    }
}
