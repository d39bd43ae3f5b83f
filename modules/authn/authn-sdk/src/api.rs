//! Transport-agnostic operation surface of the authentication engine.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use trustd_errors::{ClassifiedError, StatusClassification};
use trustd_store::RoleId;

use crate::{AuthenticatorInput, AuthenticatorType, EncodedToken};

/// One configured authenticator instance, with the login URL a browser
/// client should be redirected to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfiguredAuthenticator {
    pub name: String,
    pub redirect_url: String,
}

/// The installed/configured/enabled listing, each set sorted for
/// deterministic output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatorCatalog {
    /// Authenticator protocols compiled into this process.
    pub installed: Vec<String>,
    /// Authenticator webservices created in policy for the account.
    pub configured: Vec<String>,
    /// Authenticators enabled by the operator allow-list or a policy flag.
    pub enabled: Vec<String>,
}

/// Failure of the side-effect-free status probe. Uses the narrower
/// operator-facing classification rather than the coarse one.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StatusFailure {
    pub classification: StatusClassification,
    pub message: String,
}

/// The authentication engine's public operations.
///
/// Registered by the embedding process and consumed by whatever transport
/// fronts it. Every failing operation has already emitted its audit event by
/// the time the error is returned, and every error carries only the coarse
/// classification — internal failure kinds never leave the engine.
#[async_trait]
pub trait AuthnApi: Send + Sync {
    /// Configured OIDC authenticators for `account`, each with a generated
    /// login URL; `service_id` narrows the listing to one instance.
    ///
    /// # Errors
    /// Classified error; `Forbidden` when `role` may not read the listing.
    async fn list_authenticators(
        &self,
        role: &RoleId,
        account: &str,
        service_id: Option<&str>,
    ) -> Result<Vec<ConfiguredAuthenticator>, ClassifiedError>;

    /// The installed/configured/enabled catalog for `account`.
    ///
    /// # Errors
    /// Classified error on store failure.
    async fn catalog(&self, account: &str) -> Result<AuthenticatorCatalog, ClassifiedError>;

    /// Side-effect-free configuration/enablement probe. Never reads
    /// credentials, never issues a token, and is safe to call repeatedly.
    ///
    /// # Errors
    /// [`StatusFailure`] with the operator-facing classification.
    async fn status(&self, input: &AuthenticatorInput) -> Result<(), StatusFailure>;

    /// Enable or disable a configured authenticator instance. The change is
    /// itself a policy mutation, committed and audited through the policy
    /// engine.
    ///
    /// # Errors
    /// `Forbidden` when `actor` lacks `update` on the webservice; classified
    /// error otherwise.
    async fn update_config(
        &self,
        account: &str,
        authenticator: AuthenticatorType,
        service_id: Option<&str>,
        enabled: bool,
        actor: &RoleId,
        client_ip: &str,
    ) -> Result<(), ClassifiedError>;

    /// Basic-auth login: verifies the password and returns the role's raw
    /// authentication key rather than a signed token.
    ///
    /// # Errors
    /// `Unauthorized` for every security failure (deliberately coarse).
    async fn login(
        &self,
        account: &str,
        username: &str,
        password: &str,
        client_ip: &str,
    ) -> Result<SecretString, ClassifiedError>;

    /// The full authentication pipeline: resolve, security-check, validate
    /// credentials, issue a signed token. `accepts_base64` reflects the
    /// caller's negotiated transfer encoding.
    ///
    /// # Errors
    /// Classified error; the audit trail already holds the fine-grained
    /// failure kind.
    async fn authenticate(
        &self,
        input: AuthenticatorInput,
        accepts_base64: bool,
    ) -> Result<EncodedToken, ClassifiedError>;
}
