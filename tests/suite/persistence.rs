//! File-backed state shared across harness instances.

use std::sync::Arc;

use keycheck_core::{BlobStore, FileBlobStore, Registry, RegistryFilter};
use keycheck_engine::{SESSION_SLOT, VIRTUAL_AUTHENTICATOR_SLOT};
use keycheck_types::{Outcome, RegistrationLevel};

use crate::common::{SLOT, credential, file_harness};

#[test]
fn registrations_survive_a_new_registry() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn BlobStore> = Arc::new(FileBlobStore::new(dir.path()));
    Registry::new(store.clone(), SLOT).insert(
        RegistrationLevel::SecurityKey,
        "test_user",
        &credential("SK01"),
    );

    let reopened = Registry::new(Arc::new(FileBlobStore::new(dir.path())), SLOT);
    let records = reopened.list(RegistryFilter::default());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].registration_level, RegistrationLevel::SecurityKey);
}

#[test]
fn corrupt_file_reads_as_empty_and_is_replaced_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileBlobStore::new(dir.path());
    store.write(SLOT, "{\"dbRegistrations\": [").unwrap();

    let registry = Registry::new(Arc::new(store.clone()), SLOT);
    assert!(registry.is_empty());

    registry.insert(RegistrationLevel::TrustedDevice, "u", &credential("TD01"));
    let blob = store.read(SLOT).unwrap().unwrap();
    assert!(serde_json::from_str::<serde_json::Value>(&blob).is_ok());
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn authenticator_state_is_shared_between_harnesses() {
    let dir = tempfile::tempdir().unwrap();

    let first = file_harness(dir.path());
    first
        .runner
        .activate("register-trusted-device")
        .await
        .unwrap();

    let second = file_harness(dir.path());
    let settlement = second
        .runner
        .activate("register-duplicate-trusted-device")
        .await
        .unwrap();
    assert!(settlement.matched);

    let store = FileBlobStore::new(dir.path());
    assert!(store.read(VIRTUAL_AUTHENTICATOR_SLOT).unwrap().is_some());
}

#[tokio::test]
async fn identified_registration_is_remembered_across_harnesses() {
    let dir = tempfile::tempdir().unwrap();

    let first = file_harness(dir.path());
    for selector in ["register-trusted-device", "identify-existing-registration"] {
        assert!(first.runner.activate(selector).await.unwrap().matched);
    }
    let identified = first.session.identified().unwrap();

    let second = file_harness(dir.path());
    assert_eq!(second.session.identified(), Some(identified.clone()));
    let settlement = second
        .runner
        .activate("register-trusted-device-with-identified-exception")
        .await
        .unwrap();
    assert_eq!(settlement.outcome, Outcome::InvalidStateError);

    let removed = second
        .runner
        .activate("remove-identified-registration")
        .await
        .unwrap();
    assert!(removed.matched);
    assert!(second.ctx.registry.get(&identified).is_none());
    assert!(FileBlobStore::new(dir.path()).read(SESSION_SLOT).unwrap().is_some());
}
