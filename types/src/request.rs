//! Ceremony request descriptors and results.
//!
//! Shapes follow the JSON forms a browser credential API accepts, so a request
//! can be logged or handed to a bridge without translation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AttestationPayload, CredentialDescriptor, CredentialId, CredentialType};

/// COSE algorithm identifier for ES256.
pub const ALG_ES256: i64 = -7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    /// Random user handle, base64url.
    pub id: String,
    pub name: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKeyCredParam {
    #[serde(rename = "type")]
    pub kind: CredentialType,
    pub alg: i64,
}

impl PubKeyCredParam {
    #[must_use]
    pub const fn es256() -> Self {
        Self {
            kind: CredentialType::PublicKey,
            alg: ALG_ES256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorAttachment {
    Platform,
    CrossPlatform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerification {
    Required,
    #[default]
    Preferred,
    Discouraged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub require_resident_key: bool,
    pub user_verification: UserVerification,
}

/// Input to a credential creation ceremony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialCreationRequest {
    pub challenge: String,
    pub rp: RelyingParty,
    pub user: UserEntity,
    pub pub_key_cred_params: Vec<PubKeyCredParam>,
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: AuthenticatorSelection,
}

/// Input to an assertion ceremony.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialAssertionRequest {
    pub challenge: String,
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub user_verification: UserVerification,
}

/// Result of a successful creation ceremony.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedCredential {
    pub id: CredentialId,
    pub attestation: AttestationPayload,
}

/// Result of a successful assertion ceremony.
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub id: CredentialId,
    pub user_handle: Option<String>,
    pub payload: Value,
}
