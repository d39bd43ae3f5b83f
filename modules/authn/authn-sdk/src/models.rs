//! Identity and token models.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use trustd_store::RoleId;

/// The authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub role: RoleId,
}

impl Identity {
    #[must_use]
    pub fn new(role: RoleId) -> Self {
        Self { role }
    }

    #[must_use]
    pub fn username(&self) -> String {
        self.role.username()
    }
}

/// Opaque signed access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedToken(pub String);

impl SignedToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Outcome of a successful authentication. Owned transiently by the
/// dispatcher and handed to the transport boundary for encoding; never
/// persisted.
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    pub token: SignedToken,
    pub issued_at: DateTime<Utc>,
    pub principal: Identity,
}

/// Token payload ready for the wire.
///
/// When the caller negotiated the alternate transfer encoding the payload is
/// base64-encoded and `base64_encoded` is set; the transport must signal the
/// encoding out-of-band (a marker header) so callers can detect it without
/// parsing the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedToken {
    pub payload: String,
    pub base64_encoded: bool,
}

impl EncodedToken {
    #[must_use]
    pub fn new(token: &SignedToken, accepts_base64: bool) -> Self {
        if accepts_base64 {
            Self {
                payload: BASE64.encode(token.as_str()),
                base64_encoded: true,
            }
        } else {
            Self {
                payload: token.as_str().to_owned(),
                base64_encoded: false,
            }
        }
    }
}
