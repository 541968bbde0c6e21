//! Core domain logic for keycheck.
//!
//! This crate holds the registration registry and the seams to everything the
//! harness treats as external: blob storage, the platform credential API and
//! the random source. It has no async runtime of its own; ceremony futures are
//! driven by the engine.

pub mod ceremony;
pub mod query;
pub mod random;
pub mod registry;
pub mod store;
pub mod view;

pub use ceremony::{CeremonyError, CeremonyErrorKind, CeremonyFut, CredentialCeremony};
pub use query::{QueryError, QueryOptions, build_descriptors, build_list};
pub use random::{
    CHALLENGE_LEN, RandomSource, SequenceRandom, ThreadRandom, random_base64url, random_hex,
};
pub use registry::{Registry, RegistryFilter, RegistryObserver};
pub use store::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use view::{REGISTRATION_HEADERS, RegistrationRow, registration_rows, render_table};
