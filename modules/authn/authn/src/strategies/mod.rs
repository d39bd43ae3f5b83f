//! Installed authenticator strategies.
//!
//! Each strategy implements one protocol behind
//! [`authn_sdk::AuthenticatorStrategy`] and knows nothing about the
//! dispatcher, the registry, or auditing. Protocol back-ends that need
//! external round-trips (OIDC code exchange, token verification against
//! rotated keys) sit behind small traits so tests can fake them.

mod api_key;
mod gcp;
mod jwt;
mod k8s;
mod oidc;

pub use api_key::ApiKeyStrategy;
pub use gcp::GcpStrategy;
pub use jwt::{JwtStrategy, JwtVerifier, StaticKeyVerifier, VerifiedClaims};
pub use k8s::K8sStrategy;
pub use oidc::{OidcProvider, OidcStrategy};
