//! Configuration loading for keycheck.
//!
//! ```toml
//! [relying_party]
//! name = "Localhost, Inc."
//!
//! [storage]
//! dir = "${HOME}/.keycheck/state"
//! slot = "webauthnExampleRegistrations"
//!
//! [display]
//! id_prefix_len = 8
//! ```
//!
//! Every section and key is optional. Raw TOML structs stay private; the
//! loader resolves them into [`KeycheckConfig`] at the parse boundary, so a
//! constructed config is always valid.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_RELYING_PARTY: &str = "Localhost, Inc.";
pub const DEFAULT_REGISTRY_SLOT: &str = "webauthnExampleRegistrations";
pub const DEFAULT_ID_PREFIX_LEN: usize = 8;
const MAX_ID_PREFIX_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValueError {
    #[error("relying_party.name must not be empty")]
    EmptyRelyingPartyName,
    #[error("storage.slot must not be empty")]
    EmptySlot,
    #[error("display.id_prefix_len must be between 1 and {MAX_ID_PREFIX_LEN}, got {0}")]
    IdPrefixOutOfRange(usize),
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    relying_party: Option<RawRelyingParty>,
    storage: Option<RawStorage>,
    display: Option<RawDisplay>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRelyingParty {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStorage {
    dir: Option<String>,
    slot: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDisplay {
    id_prefix_len: Option<usize>,
}

/// Validated harness configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawConfig")]
pub struct KeycheckConfig {
    relying_party_name: String,
    storage_dir: Option<PathBuf>,
    registry_slot: String,
    id_prefix_len: usize,
}

impl Default for KeycheckConfig {
    fn default() -> Self {
        Self {
            relying_party_name: DEFAULT_RELYING_PARTY.to_string(),
            storage_dir: None,
            registry_slot: DEFAULT_REGISTRY_SLOT.to_string(),
            id_prefix_len: DEFAULT_ID_PREFIX_LEN,
        }
    }
}

impl TryFrom<RawConfig> for KeycheckConfig {
    type Error = ConfigValueError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let relying_party_name = match raw.relying_party.and_then(|rp| rp.name) {
            Some(name) if name.trim().is_empty() => {
                return Err(ConfigValueError::EmptyRelyingPartyName);
            }
            Some(name) => name,
            None => DEFAULT_RELYING_PARTY.to_string(),
        };

        let storage = raw.storage.unwrap_or_default();
        let registry_slot = match storage.slot {
            Some(slot) if slot.trim().is_empty() => return Err(ConfigValueError::EmptySlot),
            Some(slot) => slot,
            None => DEFAULT_REGISTRY_SLOT.to_string(),
        };
        let storage_dir = storage
            .dir
            .map(|dir| resolve_dir(&expand_env_vars(&dir)));

        let id_prefix_len = raw
            .display
            .and_then(|display| display.id_prefix_len)
            .unwrap_or(DEFAULT_ID_PREFIX_LEN);
        if id_prefix_len == 0 || id_prefix_len > MAX_ID_PREFIX_LEN {
            return Err(ConfigValueError::IdPrefixOutOfRange(id_prefix_len));
        }

        Ok(Self {
            relying_party_name,
            storage_dir,
            registry_slot,
            id_prefix_len,
        })
    }
}

impl KeycheckConfig {
    /// Load from `~/.keycheck/config.toml`. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match Self::parse(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    #[must_use]
    pub fn relying_party_name(&self) -> &str {
        &self.relying_party_name
    }

    #[must_use]
    pub fn registry_slot(&self) -> &str {
        &self.registry_slot
    }

    #[must_use]
    pub fn id_prefix_len(&self) -> usize {
        self.id_prefix_len
    }

    /// Directory for persisted blobs: the configured one, else `~/.keycheck/state`.
    #[must_use]
    pub fn storage_dir(&self) -> Option<PathBuf> {
        self.storage_dir
            .clone()
            .or_else(|| config_dir().map(|dir| dir.join("state")))
    }
}

/// `~/.keycheck`
#[must_use]
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".keycheck"))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Replace `${VAR}` references with environment values. Unset vars become empty.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + len];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + len + 1..];
    }

    out.push_str(rest);
    out
}

fn resolve_dir(raw: &str) -> PathBuf {
    if let Some(stripped) = raw.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config_gives_defaults() {
        let config = KeycheckConfig::parse("").unwrap();
        assert_eq!(config, KeycheckConfig::default());
        assert_eq!(config.relying_party_name(), DEFAULT_RELYING_PARTY);
        assert_eq!(config.registry_slot(), DEFAULT_REGISTRY_SLOT);
        assert_eq!(config.id_prefix_len(), 8);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
[relying_party]
name = "Example Corp"

[storage]
dir = "/var/lib/keycheck"
slot = "registrations"

[display]
id_prefix_len = 12
"#;
        let config = KeycheckConfig::parse(toml_str).unwrap();
        assert_eq!(config.relying_party_name(), "Example Corp");
        assert_eq!(config.registry_slot(), "registrations");
        assert_eq!(config.id_prefix_len(), 12);
        assert_eq!(config.storage_dir(), Some(PathBuf::from("/var/lib/keycheck")));
    }

    #[test]
    fn parse_rejects_blank_relying_party() {
        let err = KeycheckConfig::parse("[relying_party]\nname = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("relying_party.name"));
    }

    #[test]
    fn parse_rejects_empty_slot() {
        assert!(KeycheckConfig::parse("[storage]\nslot = \"\"\n").is_err());
    }

    #[test]
    fn parse_rejects_prefix_out_of_range() {
        assert!(KeycheckConfig::parse("[display]\nid_prefix_len = 0\n").is_err());
        assert!(KeycheckConfig::parse("[display]\nid_prefix_len = 65\n").is_err());
        assert!(KeycheckConfig::parse("[display]\nid_prefix_len = 64\n").is_ok());
    }

    #[test]
    fn storage_dir_expands_env_vars() {
        unsafe {
            env::set_var("KEYCHECK_TEST_STATE_ROOT", "/tmp/kc-root");
        }
        let config =
            KeycheckConfig::parse("[storage]\ndir = \"${KEYCHECK_TEST_STATE_ROOT}/state\"\n")
                .unwrap();
        assert_eq!(config.storage_dir(), Some(PathBuf::from("/tmp/kc-root/state")));
        unsafe {
            env::remove_var("KEYCHECK_TEST_STATE_ROOT");
        }
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        unsafe {
            env::remove_var("KEYCHECK_MISSING_VAR");
        }
        assert_eq!(expand_env_vars("a${KEYCHECK_MISSING_VAR}b"), "ab");
    }

    #[test]
    fn expand_env_vars_unclosed_brace_preserved() {
        assert_eq!(expand_env_vars("test ${UNCLOSED"), "test ${UNCLOSED");
    }

    #[test]
    fn expand_env_vars_empty_name_dropped() {
        assert_eq!(expand_env_vars("x${}y"), "xy");
    }

    #[test]
    fn load_from_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[display]\nid_prefix_len = \"wide\"\n").expect("write");

        let err = KeycheckConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), path.as_path());
    }

    #[test]
    fn load_from_missing_file_is_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            KeycheckConfig::load_from(&path),
            Err(ConfigError::Read { .. })
        ));
    }
}
