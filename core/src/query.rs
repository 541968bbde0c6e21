//! Credential query builder.
//!
//! One filter serves both exclude lists (registration) and allow lists
//! (authentication); callers pick levels and overrides for their scenario.

use keycheck_types::{CredentialDescriptor, CredentialId, RegistrationLevel, RegistrationRecord};
use thiserror::Error;

use crate::registry::{Registry, RegistryFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The caller assumed a prior registration exists and none matched.
    #[error("No available registrations.")]
    NoAvailableRegistrations,
}

impl QueryError {
    #[must_use]
    pub const fn kind_name(self) -> &'static str {
        match self {
            QueryError::NoAvailableRegistrations => "NoAvailableRegistrations",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Keep only records of this level.
    pub registration_level: Option<RegistrationLevel>,
    /// Records with these ids are kept even when the level filter drops them.
    pub do_not_exclude: Vec<CredentialId>,
    /// Produce an empty list whatever the registry holds.
    pub empty_allow_credentials: bool,
    /// Fail with [`QueryError::NoAvailableRegistrations`] on an empty result.
    pub expect_non_empty: bool,
}

impl QueryOptions {
    /// Every registered credential.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn level(level: RegistrationLevel) -> Self {
        Self {
            registration_level: Some(level),
            ..Self::default()
        }
    }

    /// No hint at all: the platform picks a discoverable credential.
    #[must_use]
    pub fn empty_allow_credentials() -> Self {
        Self {
            empty_allow_credentials: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn keeping(mut self, id: CredentialId) -> Self {
        self.do_not_exclude.push(id);
        self
    }

    #[must_use]
    pub fn expecting_non_empty(mut self) -> Self {
        self.expect_non_empty = true;
        self
    }
}

/// Build the exclude/allow list for a new request. Order is unspecified.
pub fn build_list(
    registry: &Registry,
    options: &QueryOptions,
) -> Result<Vec<RegistrationRecord>, QueryError> {
    if options.empty_allow_credentials {
        return select(Vec::new(), options);
    }
    select(registry.list(RegistryFilter::default()), options)
}

/// [`build_list`] as descriptors, ready for a request.
pub fn build_descriptors(
    registry: &Registry,
    options: &QueryOptions,
) -> Result<Vec<CredentialDescriptor>, QueryError> {
    Ok(build_list(registry, options)?
        .iter()
        .map(RegistrationRecord::descriptor)
        .collect())
}

/// Pure selection over an already materialized record set.
pub fn select(
    records: Vec<RegistrationRecord>,
    options: &QueryOptions,
) -> Result<Vec<RegistrationRecord>, QueryError> {
    let selected: Vec<RegistrationRecord> = if options.empty_allow_credentials {
        Vec::new()
    } else {
        let filter = RegistryFilter {
            registration_level: options.registration_level,
        };
        records
            .into_iter()
            .filter(|record| filter.matches(record) || options.do_not_exclude.contains(&record.id))
            .collect()
    };

    if options.expect_non_empty && selected.is_empty() {
        return Err(QueryError::NoAvailableRegistrations);
    }
    Ok(selected)
}
