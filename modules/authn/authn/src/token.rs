//! Signed access-token issuance.

use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use authn_sdk::{AuthenticationResult, Identity, SignedToken};
use trustd_errors::FailureKind;

/// Claims bound into every issued token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    /// The principal's login name within the account.
    pub sub: String,
    pub account: String,
    pub iat: i64,
    pub exp: i64,
}

/// Mints signed tokens for authenticated principals.
///
/// Issuance never fails for reasons other than signing-key unavailability,
/// which is fatal and surfaces as `ServiceUnavailable`.
pub struct TokenIssuer {
    key: Option<EncodingKey>,
    ttl: Duration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(signing_key: Option<&SecretString>, token_ttl_secs: u64) -> Self {
        Self {
            key: signing_key.map(|k| EncodingKey::from_secret(k.expose_secret().as_bytes())),
            ttl: Duration::seconds(i64::try_from(token_ttl_secs).unwrap_or(i64::MAX)),
        }
    }

    /// Mint a token binding `{account, role, expiry}`.
    ///
    /// # Errors
    ///
    /// [`FailureKind::SigningKeyUnavailable`] when no key is configured or
    /// signing fails.
    pub fn issue(&self, principal: &Identity) -> Result<AuthenticationResult, FailureKind> {
        let key = self.key.as_ref().ok_or(FailureKind::SigningKeyUnavailable)?;

        let issued_at = Utc::now();
        let claims = TokenClaims {
            sub: principal.username(),
            account: principal.role.account.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, key)
            .map_err(|_| FailureKind::SigningKeyUnavailable)?;

        Ok(AuthenticationResult {
            token: SignedToken(token),
            issued_at,
            principal: principal.clone(),
        })
    }
}
