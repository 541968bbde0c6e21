//! Full catalogue runs against the virtual authenticator.

use keycheck_core::RegistryFilter;
use keycheck_engine::CATALOGUE;
use keycheck_types::{Outcome, RegistrationLevel};

use crate::common::{file_harness, memory_harness};

#[tokio::test]
async fn clean_run_matches_every_expectation() {
    let harness = memory_harness();

    for spec in &CATALOGUE {
        let settlement = harness.runner.activate(spec.selector).await.unwrap();
        assert_eq!(
            settlement.outcome, spec.expected,
            "{}: output {}",
            spec.selector, settlement.output
        );
        assert!(settlement.matched);
    }

    let levels: Vec<RegistrationLevel> = {
        let mut levels: Vec<_> = harness
            .ctx
            .registry
            .list(RegistryFilter::default())
            .into_iter()
            .map(|record| record.registration_level)
            .collect();
        levels.sort();
        levels
    };
    // The identified trusted device was removed; the rest stay.
    assert_eq!(
        levels,
        vec![
            RegistrationLevel::SecurityKey,
            RegistrationLevel::DiscoverableTrustedDevice,
            RegistrationLevel::DiscoverablePasskey,
        ]
    );
}

#[tokio::test]
async fn second_run_over_the_same_store_still_matches() {
    let dir = tempfile::tempdir().unwrap();

    for _ in 0..2 {
        let harness = file_harness(dir.path());
        for spec in &CATALOGUE {
            let settlement = harness.runner.activate(spec.selector).await.unwrap();
            assert!(
                settlement.matched,
                "{} expected {} got {}",
                spec.selector, spec.expected, settlement.outcome
            );
        }
    }
}

#[tokio::test]
async fn duplicate_registration_is_refused_with_invalid_state() {
    let harness = memory_harness();
    harness
        .runner
        .activate("register-trusted-device")
        .await
        .unwrap();

    let settlement = harness
        .runner
        .activate("register-duplicate-trusted-device")
        .await
        .unwrap();
    assert_eq!(settlement.outcome, Outcome::InvalidStateError);
    assert_eq!(settlement.output, "-");
    assert_eq!(
        harness
            .ctx
            .registry
            .list(RegistryFilter::level(RegistrationLevel::TrustedDevice))
            .len(),
        1
    );
}

#[tokio::test]
async fn registering_a_trusted_device_makes_it_the_only_match() {
    let harness = memory_harness();
    let settlement = harness
        .runner
        .activate("register-trusted-device")
        .await
        .unwrap();
    assert!(settlement.output.ends_with("???"));

    let trusted = harness
        .ctx
        .registry
        .list(RegistryFilter::level(RegistrationLevel::TrustedDevice));
    assert_eq!(trusted.len(), 1);
    assert!(settlement.output.starts_with(&trusted[0].id.as_str()[..8]));
}

#[tokio::test]
async fn authentication_without_registrations_fails() {
    let harness = memory_harness();
    let settlement = harness
        .runner
        .activate("auth-any-registration")
        .await
        .unwrap();
    // Empty allow list goes to the platform, which has nothing discoverable.
    assert_eq!(settlement.outcome, Outcome::NotAllowedError);
    assert!(!settlement.matched);

    let settlement = harness
        .runner
        .activate("auth-missing-passkey")
        .await
        .unwrap();
    assert_eq!(settlement.outcome, Outcome::NoAvailableRegistrations);
    assert!(settlement.matched);
}

#[tokio::test]
async fn empty_allow_list_detects_a_different_discoverable_credential() {
    let harness = memory_harness();
    harness
        .runner
        .activate("register-discoverable-uvpa")
        .await
        .unwrap();
    // A newer discoverable credential now answers empty allow lists.
    harness
        .runner
        .activate("register-discoverable-passkey")
        .await
        .unwrap();

    let settlement = harness
        .runner
        .activate("auth-empty-allow-credentials")
        .await
        .unwrap();
    assert_eq!(settlement.outcome, Outcome::Unknown);
    assert!(!settlement.matched);
}
