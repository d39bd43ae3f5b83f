//! Kubernetes certificate-injection authentication.
//!
//! The credential is a PEM-ish certificate signing request whose common name
//! carries the workload's host identifier. Only the subject fields matter
//! here; chain validation and signing belong to the certificate authority
//! sitting in front of this strategy.

use async_trait::async_trait;
use secrecy::ExposeSecret;

use authn_sdk::{AuthenticatorInput, AuthenticatorStrategy, AuthenticatorType, Identity};
use trustd_errors::FailureKind;
use trustd_store::RoleId;

pub struct K8sStrategy;

impl K8sStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for K8sStrategy {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull the common name out of a CSR subject
/// (`CN=prod/backend,O=acme` or `/O=acme/CN=prod/backend` style).
fn common_name(csr: &str) -> Option<&str> {
    csr.lines()
        .flat_map(|line| line.split(','))
        .find_map(|field| field.trim().strip_prefix("CN="))
        .map(str::trim)
        .filter(|cn| !cn.is_empty())
}

#[async_trait]
impl AuthenticatorStrategy for K8sStrategy {
    fn authenticator_type(&self) -> AuthenticatorType {
        AuthenticatorType::K8s
    }

    async fn validate_credentials(
        &self,
        input: &AuthenticatorInput,
    ) -> Result<Identity, FailureKind> {
        let csr = input.credentials.materialize()?;
        let cn = common_name(csr.expose_secret()).ok_or_else(|| {
            FailureKind::CsrMissingRequiredField {
                field: "CN".to_owned(),
            }
        })?;

        let role = RoleId::host(&input.account, cn);

        // When the request names a principal it must agree with the CSR.
        if let Some(named) = &input.username {
            if *named != role.username() {
                return Err(FailureKind::CertMissingRequiredField {
                    field: "CN".to_owned(),
                });
            }
        }
        Ok(Identity::new(role))
    }
}

#[cfg(test)]
mod tests {
    use authn_sdk::LazyCredentials;

    use super::*;

    fn input_with(csr: &str, username: Option<&str>) -> AuthenticatorInput {
        AuthenticatorInput {
            authenticator: AuthenticatorType::K8s,
            service_id: Some("cluster1".to_owned()),
            account: "acme".to_owned(),
            username: username.map(str::to_owned),
            credentials: LazyCredentials::from_text(csr),
            client_ip: "10.0.0.1".to_owned(),
        }
    }

    #[tokio::test]
    async fn common_name_becomes_the_host_identity() {
        let strategy = K8sStrategy::new();
        let input = input_with("CN=prod/backend,O=acme", None);
        let identity = strategy.validate_credentials(&input).await.unwrap();
        assert_eq!(identity.role, RoleId::host("acme", "prod/backend"));
    }

    #[tokio::test]
    async fn missing_common_name_is_a_csr_error() {
        let strategy = K8sStrategy::new();
        let input = input_with("O=acme,OU=platform", None);
        assert_eq!(
            strategy.validate_credentials(&input).await.unwrap_err(),
            FailureKind::CsrMissingRequiredField {
                field: "CN".to_owned()
            }
        );
    }

    #[tokio::test]
    async fn named_principal_must_match_the_csr() {
        let strategy = K8sStrategy::new();
        let input = input_with("CN=prod/backend", Some("host/other"));
        assert!(strategy.validate_credentials(&input).await.is_err());

        let input = input_with("CN=prod/backend", Some("host/prod/backend"));
        assert!(strategy.validate_credentials(&input).await.is_ok());
    }
}
