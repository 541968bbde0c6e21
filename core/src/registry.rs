//! Registration registry: the persisted set of previously created credentials.
//!
//! The registry is an explicit object over an injected [`BlobStore`] slot.
//! Every access re-materializes the mapping from the slot, and every mutation
//! serializes and writes the full mapping in one synchronous step, so readers
//! never see a partial update.
//!
//! Persisted format:
//!
//! ```json
//! {
//!   "dbRegistrations": {
//!     "<id>": { "registrationLevel": "trusted-device", "userName": "test_user", "json": { "id": "<id>", ... } }
//!   }
//! }
//! ```
//!
//! A missing, unreadable or malformed blob reads as an empty registry. Entries
//! that fail to parse are dropped individually. The `json` payload is kept
//! verbatim and never inspected; a record's id is always its key.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use keycheck_types::{
    AttestationPayload, CreatedCredential, CredentialId, RegistrationLevel, RegistrationRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::store::BlobStore;

const REGISTRATIONS_KEY: &str = "dbRegistrations";

type Records = BTreeMap<CredentialId, RegistrationRecord>;

/// Notified after every mutation with the full post-mutation record set.
pub trait RegistryObserver: Send + Sync {
    fn registry_changed(&self, records: &[RegistrationRecord]);
}

impl<F> RegistryObserver for F
where
    F: Fn(&[RegistrationRecord]) + Send + Sync,
{
    fn registry_changed(&self, records: &[RegistrationRecord]) {
        self(records);
    }
}

/// Restricts [`Registry::list`]. The default matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryFilter {
    pub registration_level: Option<RegistrationLevel>,
}

impl RegistryFilter {
    #[must_use]
    pub fn level(level: RegistrationLevel) -> Self {
        Self {
            registration_level: Some(level),
        }
    }

    #[must_use]
    pub fn matches(&self, record: &RegistrationRecord) -> bool {
        self.registration_level
            .is_none_or(|level| record.registration_level == level)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedRegistration {
    registration_level: RegistrationLevel,
    #[serde(default)]
    user_name: String,
    json: AttestationPayload,
}

pub struct Registry {
    store: Arc<dyn BlobStore>,
    slot: String,
    observers: Vec<Box<dyn RegistryObserver>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("slot", &self.slot)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    pub fn new(store: Arc<dyn BlobStore>, slot: impl Into<String>) -> Self {
        Self {
            store,
            slot: slot.into(),
            observers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl RegistryObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    #[must_use]
    pub fn slot(&self) -> &str {
        &self.slot
    }

    /// Records matching `filter`. Order is unspecified.
    #[must_use]
    pub fn list(&self, filter: RegistryFilter) -> Vec<RegistrationRecord> {
        self.load()
            .into_values()
            .filter(|record| filter.matches(record))
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: &CredentialId) -> Option<RegistrationRecord> {
        self.load().remove(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.load().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add or overwrite the record keyed by `credential.id`.
    pub fn insert(
        &self,
        level: RegistrationLevel,
        user_name: impl Into<String>,
        credential: &CreatedCredential,
    ) {
        let mut records = self.load();
        let record = RegistrationRecord {
            id: credential.id.clone(),
            registration_level: level,
            user_name: user_name.into(),
            attestation: credential.attestation.clone(),
        };
        let replaced = records.insert(record.id.clone(), record).is_some();
        info!(id = %credential.id, level = %level, replaced, "Registration saved");
        self.commit(&records);
    }

    /// Delete the record keyed by `id`. Absent ids are a no-op.
    pub fn remove(&self, id: &CredentialId) {
        let mut records = self.load();
        if records.remove(id).is_none() {
            debug!(id = %id, "Registration already absent");
            return;
        }
        info!(id = %id, "Registration removed");
        self.commit(&records);
    }

    pub fn clear(&self) {
        info!("Registrations cleared");
        self.commit(&Records::new());
    }

    fn load(&self) -> Records {
        let blob = match self.store.read(&self.slot) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Records::new(),
            Err(e) => {
                warn!(slot = %self.slot, "Failed to read registrations, treating as empty: {e}");
                return Records::new();
            }
        };
        decode(&blob).unwrap_or_else(|| {
            warn!(slot = %self.slot, "Malformed registrations blob, treating as empty");
            Records::new()
        })
    }

    fn commit(&self, records: &Records) {
        match encode(records) {
            Ok(blob) => {
                if let Err(e) = self.store.write(&self.slot, &blob) {
                    warn!(slot = %self.slot, "Failed to persist registrations: {e}");
                }
            }
            Err(e) => warn!(slot = %self.slot, "Failed to serialize registrations: {e}"),
        }

        let snapshot: Vec<RegistrationRecord> = records.values().cloned().collect();
        for observer in &self.observers {
            observer.registry_changed(&snapshot);
        }
    }
}

fn decode(blob: &str) -> Option<Records> {
    let root: Value = serde_json::from_str(blob).ok()?;
    let root = root.as_object()?;
    let Some(entries) = root.get(REGISTRATIONS_KEY) else {
        return Some(Records::new());
    };
    let entries = entries.as_object()?;

    let mut records = Records::new();
    for (key, entry) in entries {
        let Ok(id) = CredentialId::parse(key.as_str()) else {
            warn!(key = %key, "Dropping registration with invalid id");
            continue;
        };
        let persisted = match PersistedRegistration::deserialize(entry) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!(id = %id, "Dropping malformed registration: {e}");
                continue;
            }
        };
        records.insert(
            id.clone(),
            RegistrationRecord {
                id,
                registration_level: persisted.registration_level,
                user_name: persisted.user_name,
                attestation: persisted.json,
            },
        );
    }
    Some(records)
}

fn encode(records: &Records) -> serde_json::Result<String> {
    let entries: BTreeMap<&str, PersistedRegistration> = records
        .values()
        .map(|record| {
            (
                record.id.as_str(),
                PersistedRegistration {
                    registration_level: record.registration_level,
                    user_name: record.user_name.clone(),
                    json: record.attestation.clone(),
                },
            )
        })
        .collect();
    let mut root = serde_json::Map::new();
    root.insert(REGISTRATIONS_KEY.to_string(), serde_json::to_value(entries)?);
    serde_json::to_string_pretty(&Value::Object(root))
}
