//! The per-protocol strategy capability.

use async_trait::async_trait;

use trustd_errors::FailureKind;

use crate::{AuthenticatorInput, AuthenticatorType, Identity};

/// One installed authentication protocol.
///
/// Strategies are pure with respect to the dispatcher: they may perform
/// external calls (token introspection, discovery, certificate-chain
/// validation) but must never touch the role graph or emit audit events —
/// that responsibility stays centralized in the dispatcher.
#[async_trait]
pub trait AuthenticatorStrategy: Send + Sync {
    /// The protocol this strategy implements.
    fn authenticator_type(&self) -> AuthenticatorType;

    /// Validate the materialized credential and derive the principal.
    ///
    /// Called only after the dispatcher has confirmed the authenticator is
    /// installed, configured, and enabled, and the security checks passed.
    ///
    /// # Errors
    ///
    /// A [`FailureKind`] describing why validation failed; the dispatcher
    /// classifies it for the caller and records it in the audit trail.
    async fn validate_credentials(
        &self,
        input: &AuthenticatorInput,
    ) -> Result<Identity, FailureKind>;

    /// Optional cheap health probe used by `status`.
    ///
    /// The default performs no protocol round-trip; protocols whose status
    /// check needs one (e.g. OIDC discovery) override this.
    ///
    /// # Errors
    ///
    /// A [`FailureKind`] when the probe fails.
    async fn status_check(&self, _input: &AuthenticatorInput) -> Result<(), FailureKind> {
        Ok(())
    }

    /// Login URL for browser-initiated flows; only OIDC implements this.
    fn login_url(&self, _service_id: &str) -> Option<String> {
        None
    }
}
