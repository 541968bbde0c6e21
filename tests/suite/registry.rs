//! Registry and query builder behavior over a shared store.

use std::sync::Arc;

use keycheck_core::{
    MemoryBlobStore, QueryError, QueryOptions, Registry, RegistryFilter, build_list,
};
use keycheck_types::{CredentialId, RegistrationLevel};

use crate::common::{SLOT, credential};

fn registry() -> (Arc<MemoryBlobStore>, Registry) {
    let store = Arc::new(MemoryBlobStore::new());
    (store.clone(), Registry::new(store, SLOT))
}

#[test]
fn trusted_device_registration_is_the_only_trusted_match() {
    let (_, registry) = registry();
    registry.insert(RegistrationLevel::SecurityKey, "test_user", &credential("SK01"));
    registry.insert(RegistrationLevel::TrustedDevice, "test_user", &credential("TD01"));

    let trusted = registry.list(RegistryFilter::level(RegistrationLevel::TrustedDevice));
    assert_eq!(trusted.len(), 1);

    let list = build_list(&registry, &QueryOptions::level(RegistrationLevel::TrustedDevice)).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].id.as_str(), "TD01");
}

#[test]
fn empty_allow_credentials_on_populated_registry() {
    let (_, registry) = registry();
    registry.insert(RegistrationLevel::DiscoverablePasskey, "u", &credential("PK01"));
    assert!(build_list(&registry, &QueryOptions::empty_allow_credentials())
        .unwrap()
        .is_empty());
}

#[test]
fn empty_allow_credentials_with_expectation_still_fails() {
    let (_, registry) = registry();
    registry.insert(RegistrationLevel::DiscoverablePasskey, "u", &credential("PK01"));
    let options = QueryOptions::empty_allow_credentials().expecting_non_empty();
    assert_eq!(
        build_list(&registry, &options),
        Err(QueryError::NoAvailableRegistrations)
    );
}

#[test]
fn clear_then_list_is_empty() {
    let (store, registry) = registry();
    registry.insert(RegistrationLevel::TrustedDevice, "u", &credential("TD01"));
    registry.insert(RegistrationLevel::SecurityKey, "u", &credential("SK01"));

    registry.clear();

    assert!(registry.list(RegistryFilter::default()).is_empty());
    let blob: serde_json::Value = serde_json::from_str(&store.snapshot(SLOT).unwrap()).unwrap();
    assert_eq!(blob, serde_json::json!({ "dbRegistrations": {} }));
}

#[test]
fn second_remove_leaves_registry_unchanged() {
    let (store, registry) = registry();
    registry.insert(RegistrationLevel::TrustedDevice, "u", &credential("TD01"));
    registry.insert(RegistrationLevel::SecurityKey, "u", &credential("SK01"));
    let id = CredentialId::parse("TD01").unwrap();

    registry.remove(&id);
    let before = store.snapshot(SLOT);
    registry.remove(&id);

    assert_eq!(store.snapshot(SLOT), before);
    assert_eq!(registry.len(), 1);
}

#[test]
fn two_registries_over_one_slot_see_each_other() {
    let store = Arc::new(MemoryBlobStore::new());
    let writer = Registry::new(store.clone(), SLOT);
    let reader = Registry::new(store, SLOT);

    writer.insert(RegistrationLevel::TrustedDevice, "u", &credential("TD01"));
    assert_eq!(reader.len(), 1);
    reader.clear();
    assert!(writer.is_empty());
}
