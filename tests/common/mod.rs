//! Shared test utilities and fixtures
//!
//! Builds harnesses over in-memory or temp-dir storage with the virtual
//! authenticator standing in for real hardware.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use keycheck_core::{
    BlobStore, FileBlobStore, MemoryBlobStore, RandomSource, Registry, ThreadRandom,
};
use keycheck_engine::{HarnessContext, NullView, ScenarioRunner, Session, VirtualPlatform, attach_catalogue};
use keycheck_types::{AttestationPayload, CreatedCredential, CredentialId, RelyingParty};

pub const SLOT: &str = "webauthnExampleRegistrations";

pub struct Harness {
    pub ctx: Arc<HarnessContext>,
    pub runner: ScenarioRunner,
    pub session: Arc<Session>,
}

pub fn context(store: Arc<dyn BlobStore>) -> HarnessContext {
    let random: Arc<dyn RandomSource> = Arc::new(ThreadRandom);
    HarnessContext {
        registry: Registry::new(store.clone(), SLOT),
        ceremony: Arc::new(VirtualPlatform::new(store, random.clone())),
        random,
        relying_party: RelyingParty {
            name: "Localhost, Inc.".into(),
        },
        id_prefix_len: 8,
    }
}

pub fn harness(store: Arc<dyn BlobStore>) -> Harness {
    let ctx = Arc::new(context(store.clone()));
    let mut runner = ScenarioRunner::new(Arc::new(NullView), ctx.id_prefix_len);
    let session = Arc::new(Session::new(store));
    attach_catalogue(&mut runner, ctx.clone(), session.clone()).expect("catalogue attaches");
    Harness {
        ctx,
        runner,
        session,
    }
}

pub fn memory_harness() -> Harness {
    harness(Arc::new(MemoryBlobStore::new()))
}

pub fn file_harness(dir: &Path) -> Harness {
    harness(Arc::new(FileBlobStore::new(dir)))
}

/// A created credential as the platform would return it.
pub fn credential(id: &str) -> CreatedCredential {
    CreatedCredential {
        id: CredentialId::parse(id).expect("valid id"),
        attestation: AttestationPayload::new(serde_json::json!({
            "id": id,
            "rawId": id,
            "type": "public-key",
        })),
    }
}
