//! Bearer-JWT authentication.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::Deserialize;

use authn_sdk::{AuthenticatorInput, AuthenticatorStrategy, AuthenticatorType, Identity};
use trustd_errors::FailureKind;
use trustd_store::RoleId;

/// Claims the strategy needs out of a verified token.
#[derive(Debug, Deserialize)]
pub struct VerifiedClaims {
    /// The principal's login name (`alice`, `host/backend`).
    pub sub: String,
}

/// Verifies a raw token and extracts its claims.
///
/// Abstracted so instances can verify against static keys, JWKS endpoints,
/// or test doubles without the strategy caring.
pub trait JwtVerifier: Send + Sync {
    /// # Errors
    ///
    /// [`FailureKind::TokenExpired`] for expired tokens,
    /// [`FailureKind::TokenInvalid`] for every other verification failure.
    fn verify(&self, token: &str) -> Result<VerifiedClaims, FailureKind>;
}

/// Verifier backed by a single static HMAC key.
pub struct StaticKeyVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl StaticKeyVerifier {
    #[must_use]
    pub fn hs256(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

impl JwtVerifier for StaticKeyVerifier {
    fn verify(&self, token: &str) -> Result<VerifiedClaims, FailureKind> {
        match jsonwebtoken::decode::<VerifiedClaims>(token, &self.key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => {
                Err(FailureKind::TokenExpired)
            }
            Err(e) => Err(FailureKind::TokenInvalid {
                reason: e.to_string(),
            }),
        }
    }
}

pub struct JwtStrategy {
    verifier: Arc<dyn JwtVerifier>,
}

impl JwtStrategy {
    #[must_use]
    pub fn new(verifier: Arc<dyn JwtVerifier>) -> Self {
        Self { verifier }
    }
}

#[async_trait]
impl AuthenticatorStrategy for JwtStrategy {
    fn authenticator_type(&self) -> AuthenticatorType {
        AuthenticatorType::Jwt
    }

    async fn validate_credentials(
        &self,
        input: &AuthenticatorInput,
    ) -> Result<Identity, FailureKind> {
        let token = input.credentials.materialize()?;
        let claims = self.verifier.verify(token.expose_secret())?;

        // The principal comes from the token, not the URL; a username in the
        // request must agree with it.
        if let Some(named) = &input.username {
            if *named != claims.sub {
                return Err(FailureKind::TokenInvalid {
                    reason: "token subject does not match the requested identity".to_owned(),
                });
            }
        }
        Ok(Identity::new(RoleId::from_username(
            &input.account,
            &claims.sub,
        )))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header};
    use serde::Serialize;

    use authn_sdk::LazyCredentials;

    use super::*;

    const SECRET: &[u8] = b"jwt-test-secret";

    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: i64,
    }

    fn mint(sub: &str, exp_offset_secs: i64) -> String {
        let claims = Claims {
            sub: sub.to_owned(),
            exp: Utc::now().timestamp() + exp_offset_secs,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap()
    }

    fn input_with(token: &str, username: Option<&str>) -> AuthenticatorInput {
        AuthenticatorInput {
            authenticator: AuthenticatorType::Jwt,
            service_id: Some("ci".to_owned()),
            account: "acme".to_owned(),
            username: username.map(str::to_owned),
            credentials: LazyCredentials::from_text(token),
            client_ip: "10.0.0.1".to_owned(),
        }
    }

    fn strategy() -> JwtStrategy {
        JwtStrategy::new(Arc::new(StaticKeyVerifier::hs256(SECRET)))
    }

    #[tokio::test]
    async fn valid_token_derives_the_principal_from_its_subject() {
        let input = input_with(&mint("host/backend", 300), None);
        let identity = strategy().validate_credentials(&input).await.unwrap();
        assert_eq!(identity.role, RoleId::host("acme", "backend"));
    }

    #[tokio::test]
    async fn expired_token_is_reported_as_expired_not_invalid() {
        let input = input_with(&mint("alice", -300), None);
        assert_eq!(
            strategy().validate_credentials(&input).await.unwrap_err(),
            FailureKind::TokenExpired
        );
    }

    #[tokio::test]
    async fn tampered_token_is_invalid() {
        let mut token = mint("alice", 300);
        token.push('x');
        let input = input_with(&token, None);
        assert!(matches!(
            strategy().validate_credentials(&input).await.unwrap_err(),
            FailureKind::TokenInvalid { .. }
        ));
    }

    #[tokio::test]
    async fn named_identity_must_match_the_token_subject() {
        let input = input_with(&mint("alice", 300), Some("bob"));
        assert!(matches!(
            strategy().validate_credentials(&input).await.unwrap_err(),
            FailureKind::TokenInvalid { .. }
        ));
    }
}
