//! GCP instance-identity authentication.
//!
//! The credential is a Google-signed identity token. When the request does
//! not name a principal, the host identity is derived from the token's
//! subject, so workloads authenticate without knowing their role id.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use authn_sdk::{AuthenticatorInput, AuthenticatorStrategy, AuthenticatorType, Identity};
use trustd_errors::FailureKind;
use trustd_store::RoleId;

use super::jwt::JwtVerifier;

pub struct GcpStrategy {
    verifier: Arc<dyn JwtVerifier>,
}

impl GcpStrategy {
    #[must_use]
    pub fn new(verifier: Arc<dyn JwtVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl AuthenticatorStrategy for GcpStrategy {
    fn authenticator_type(&self) -> AuthenticatorType {
        AuthenticatorType::Gcp
    }

    async fn validate_credentials(
        &self,
        input: &AuthenticatorInput,
    ) -> Result<Identity, FailureKind> {
        let token = input.credentials.materialize()?;
        let claims = self.verifier.verify(token.expose_secret())?;

        let role = match &input.username {
            Some(named) => RoleId::from_username(&input.account, named),
            // Anonymous requests bind to the workload host named by the
            // token subject.
            None => RoleId::host(&input.account, &claims.sub),
        };
        Ok(Identity::new(role))
    }
}

#[cfg(test)]
mod tests {
    use authn_sdk::LazyCredentials;

    use super::super::jwt::VerifiedClaims;
    use super::*;

    struct FixedSubject(&'static str);

    impl JwtVerifier for FixedSubject {
        fn verify(&self, _token: &str) -> Result<VerifiedClaims, FailureKind> {
            Ok(VerifiedClaims {
                sub: self.0.to_owned(),
            })
        }
    }

    fn input_with(username: Option<&str>) -> AuthenticatorInput {
        AuthenticatorInput {
            authenticator: AuthenticatorType::Gcp,
            service_id: None,
            account: "acme".to_owned(),
            username: username.map(str::to_owned),
            credentials: LazyCredentials::from_text("an-identity-token"),
            client_ip: "10.0.0.1".to_owned(),
        }
    }

    #[tokio::test]
    async fn anonymous_requests_bind_to_the_token_subject_host() {
        let strategy = GcpStrategy::new(Arc::new(FixedSubject("projects/p1/vm-7")));
        let identity = strategy
            .validate_credentials(&input_with(None))
            .await
            .unwrap();
        assert_eq!(identity.role, RoleId::host("acme", "projects/p1/vm-7"));
    }

    #[tokio::test]
    async fn a_named_principal_wins_over_the_subject() {
        let strategy = GcpStrategy::new(Arc::new(FixedSubject("projects/p1/vm-7")));
        let identity = strategy
            .validate_credentials(&input_with(Some("host/batch")))
            .await
            .unwrap();
        assert_eq!(identity.role, RoleId::host("acme", "batch"));
    }
}
