//! OIDC authorization-code authentication.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use authn_sdk::{AuthenticatorInput, AuthenticatorStrategy, AuthenticatorType, Identity};
use trustd_errors::FailureKind;
use trustd_store::RoleId;

/// Back-end performing the provider round-trips.
#[async_trait]
pub trait OidcProvider: Send + Sync {
    /// Exchange an authorization code for the mapped login name.
    ///
    /// # Errors
    ///
    /// [`FailureKind::InvalidCredentials`] when the provider rejects the
    /// code; [`FailureKind::TokenInvalid`] when the returned identity token
    /// fails verification.
    async fn exchange_code(&self, service_id: &str, code: &str) -> Result<String, FailureKind>;

    /// The authorization URL browsers are redirected to.
    fn authorize_url(&self, service_id: &str) -> String;

    /// Discovery-document reachability probe.
    ///
    /// # Errors
    ///
    /// A [`FailureKind`] when the provider is unreachable or misconfigured.
    async fn discovery_check(&self, _service_id: &str) -> Result<(), FailureKind> {
        Ok(())
    }
}

pub struct OidcStrategy {
    provider: Arc<dyn OidcProvider>,
}

impl OidcStrategy {
    #[must_use]
    pub fn new(provider: Arc<dyn OidcProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl AuthenticatorStrategy for OidcStrategy {
    fn authenticator_type(&self) -> AuthenticatorType {
        AuthenticatorType::Oidc
    }

    async fn validate_credentials(
        &self,
        input: &AuthenticatorInput,
    ) -> Result<Identity, FailureKind> {
        let service_id =
            input
                .service_id
                .as_deref()
                .ok_or_else(|| FailureKind::MissingRequestParam {
                    param: "service_id".to_owned(),
                })?;
        let code = input.credentials.materialize()?;
        let username = self
            .provider
            .exchange_code(service_id, code.expose_secret())
            .await?;
        Ok(Identity::new(RoleId::from_username(
            &input.account,
            &username,
        )))
    }

    // OIDC status needs a provider round-trip: the discovery document must
    // be reachable.
    async fn status_check(&self, input: &AuthenticatorInput) -> Result<(), FailureKind> {
        let service_id =
            input
                .service_id
                .as_deref()
                .ok_or_else(|| FailureKind::MissingRequestParam {
                    param: "service_id".to_owned(),
                })?;
        self.provider.discovery_check(service_id).await
    }

    fn login_url(&self, service_id: &str) -> Option<String> {
        Some(self.provider.authorize_url(service_id))
    }
}

#[cfg(test)]
mod tests {
    use authn_sdk::LazyCredentials;

    use super::*;

    struct FakeProvider;

    #[async_trait]
    impl OidcProvider for FakeProvider {
        async fn exchange_code(
            &self,
            _service_id: &str,
            code: &str,
        ) -> Result<String, FailureKind> {
            if code == "good-code" {
                Ok("alice".to_owned())
            } else {
                Err(FailureKind::InvalidCredentials)
            }
        }

        fn authorize_url(&self, service_id: &str) -> String {
            format!("https://idp.example.com/authorize?client={service_id}")
        }
    }

    fn input_with(code: &str) -> AuthenticatorInput {
        AuthenticatorInput {
            authenticator: AuthenticatorType::Oidc,
            service_id: Some("prod".to_owned()),
            account: "acme".to_owned(),
            username: None,
            credentials: LazyCredentials::from_text(code),
            client_ip: "10.0.0.1".to_owned(),
        }
    }

    #[tokio::test]
    async fn code_exchange_maps_to_the_provider_identity() {
        let strategy = OidcStrategy::new(Arc::new(FakeProvider));
        let identity = strategy
            .validate_credentials(&input_with("good-code"))
            .await
            .unwrap();
        assert_eq!(identity.role, RoleId::user("acme", "alice"));
    }

    #[tokio::test]
    async fn rejected_code_is_invalid_credentials() {
        let strategy = OidcStrategy::new(Arc::new(FakeProvider));
        assert_eq!(
            strategy
                .validate_credentials(&input_with("stolen-code"))
                .await
                .unwrap_err(),
            FailureKind::InvalidCredentials
        );
    }

    #[test]
    fn login_url_comes_from_the_provider() {
        let strategy = OidcStrategy::new(Arc::new(FakeProvider));
        assert_eq!(
            strategy.login_url("prod").unwrap(),
            "https://idp.example.com/authorize?client=prod"
        );
    }
}
