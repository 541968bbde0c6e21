use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque credential identifier in unpadded base64url form.
///
/// Primary key of the registration registry. Invariant: non-empty and made
/// only of base64url alphabet characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CredentialId(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialIdError {
    #[error("credential id must not be empty")]
    Empty,
    #[error("credential id contains non-base64url character {found:?} at offset {offset}")]
    InvalidCharacter { found: char, offset: usize },
}

impl CredentialId {
    /// Encode raw identifier bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn parse(value: impl Into<String>) -> Result<Self, CredentialIdError> {
        let value = value.into();
        if value.is_empty() {
            return Err(CredentialIdError::Empty);
        }
        if let Some((offset, found)) = value
            .char_indices()
            .find(|(_, c)| !is_base64url_char(*c))
        {
            return Err(CredentialIdError::InvalidCharacter { found, offset });
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_base64url_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

impl TryFrom<String> for CredentialId {
    type Error = CredentialIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for CredentialId {
    type Error = CredentialIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CredentialId> for String {
    fn from(value: CredentialId) -> Self {
        value.0
    }
}

impl AsRef<str> for CredentialId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encode arbitrary bytes the way challenges and user handles travel.
#[must_use]
pub fn base64url(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
