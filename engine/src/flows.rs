//! Registration and authentication flows.
//!
//! Each flow builds a request from the registry through the query builder,
//! hands it to the injected [`CredentialCeremony`], and for registrations
//! saves the created credential under its level.

use std::sync::Arc;

use keycheck_core::{
    CHALLENGE_LEN, CredentialCeremony, QueryOptions, RandomSource, Registry, build_descriptors,
    random_base64url,
};
use keycheck_types::{
    Assertion, AuthenticatorAttachment, AuthenticatorSelection, CredentialAssertionRequest,
    CredentialCreationRequest, CredentialId, PubKeyCredParam, RegistrationLevel, RelyingParty,
    UserEntity, UserVerification,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ScenarioError;

const USER_NAME: &str = "test_user";
const USER_DISPLAY_NAME: &str = "Test User";

/// Everything a flow needs, shared by every scenario action.
pub struct HarnessContext {
    pub registry: Registry,
    pub ceremony: Arc<dyn CredentialCeremony>,
    pub random: Arc<dyn RandomSource>,
    pub relying_party: RelyingParty,
    pub id_prefix_len: usize,
}

impl HarnessContext {
    fn challenge(&self) -> String {
        random_base64url(self.random.as_ref(), CHALLENGE_LEN)
    }

    fn user(&self, suffix: Option<&str>) -> UserEntity {
        let (name, display_name) = match suffix {
            Some(suffix) => (
                format!("{USER_NAME} {suffix}"),
                format!("{USER_DISPLAY_NAME} {suffix}"),
            ),
            None => (USER_NAME.to_string(), USER_DISPLAY_NAME.to_string()),
        };
        UserEntity {
            id: random_base64url(self.random.as_ref(), CHALLENGE_LEN),
            name,
            display_name,
        }
    }

    fn creation_request(
        &self,
        query: &QueryOptions,
        suffix: Option<&str>,
        authenticator_selection: AuthenticatorSelection,
    ) -> Result<CredentialCreationRequest, ScenarioError> {
        Ok(CredentialCreationRequest {
            challenge: self.challenge(),
            rp: self.relying_party.clone(),
            user: self.user(suffix),
            pub_key_cred_params: vec![PubKeyCredParam::es256()],
            exclude_credentials: build_descriptors(&self.registry, query)?,
            authenticator_selection,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrustedDeviceOptions {
    /// Exclude list selection.
    pub query: QueryOptions,
    pub require_resident_key: bool,
    pub user_suffix: Option<String>,
}

/// Register a platform authenticator with user verification.
///
/// Saved as `discoverable-trusted-device` when a resident key was required,
/// `trusted-device` otherwise.
pub async fn register_trusted_device(
    ctx: &HarnessContext,
    options: TrustedDeviceOptions,
) -> Result<CredentialId, ScenarioError> {
    let request = ctx.creation_request(
        &options.query,
        options.user_suffix.as_deref(),
        AuthenticatorSelection {
            authenticator_attachment: Some(AuthenticatorAttachment::Platform),
            require_resident_key: options.require_resident_key,
            user_verification: UserVerification::Required,
        },
    )?;
    let level = if options.require_resident_key {
        RegistrationLevel::DiscoverableTrustedDevice
    } else {
        RegistrationLevel::TrustedDevice
    };
    create_and_save(ctx, &request, level).await
}

/// Register any authenticator without user verification.
pub async fn register_security_key(
    ctx: &HarnessContext,
    query: QueryOptions,
) -> Result<CredentialId, ScenarioError> {
    let request = ctx.creation_request(
        &query,
        None,
        AuthenticatorSelection {
            authenticator_attachment: None,
            require_resident_key: false,
            user_verification: UserVerification::Discouraged,
        },
    )?;
    create_and_save(ctx, &request, RegistrationLevel::SecurityKey).await
}

/// Register a roaming discoverable credential with user verification.
pub async fn register_passkey(
    ctx: &HarnessContext,
    query: QueryOptions,
    user_suffix: Option<&str>,
) -> Result<CredentialId, ScenarioError> {
    let request = ctx.creation_request(
        &query,
        user_suffix,
        AuthenticatorSelection {
            authenticator_attachment: Some(AuthenticatorAttachment::CrossPlatform),
            require_resident_key: true,
            user_verification: UserVerification::Required,
        },
    )?;
    create_and_save(ctx, &request, RegistrationLevel::DiscoverablePasskey).await
}

/// Run an assertion over the allow list `query` selects.
pub async fn authenticate(
    ctx: &HarnessContext,
    query: QueryOptions,
) -> Result<Assertion, ScenarioError> {
    let request = CredentialAssertionRequest {
        challenge: ctx.challenge(),
        allow_credentials: build_descriptors(&ctx.registry, &query)?,
        user_verification: UserVerification::Discouraged,
    };
    log_request("get", &request);
    let assertion = ctx.ceremony.get(&request).await?;
    debug!(id = %assertion.id, "Assertion received");
    Ok(assertion)
}

async fn create_and_save(
    ctx: &HarnessContext,
    request: &CredentialCreationRequest,
    level: RegistrationLevel,
) -> Result<CredentialId, ScenarioError> {
    log_request("create", request);
    let credential = ctx.ceremony.create(request).await?;
    ctx.registry
        .insert(level, request.user.name.clone(), &credential);
    info!(id = %credential.id, level = %level, "Credential registered");
    Ok(credential.id)
}

fn log_request(ceremony: &str, request: &impl Serialize) {
    match serde_json::to_string(request) {
        Ok(json) => debug!(ceremony, request = %json, "Ceremony request"),
        Err(e) => debug!(ceremony, "Ceremony request (unserializable: {e})"),
    }
}
