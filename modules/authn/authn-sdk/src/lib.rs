//! Public authentication contract.
//!
//! This crate defines everything a transport or an embedding process needs
//! to drive the authentication dispatcher without depending on its
//! implementation: the protocol-agnostic request value object, the identity
//! and token models, the per-protocol strategy capability, and the
//! transport-agnostic API trait.

mod api;
mod input;
mod models;
mod strategy;
mod types;

pub use api::{AuthenticatorCatalog, AuthnApi, ConfiguredAuthenticator, StatusFailure};
pub use input::{AuthenticatorInput, LazyCredentials};
pub use models::{AuthenticationResult, EncodedToken, Identity, SignedToken};
pub use strategy::AuthenticatorStrategy;
pub use types::{AuthenticatorType, UnknownAuthenticatorType};
