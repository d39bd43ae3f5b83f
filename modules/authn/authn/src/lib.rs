//! Authentication dispatch engine.
//!
//! Orchestrates registry lookups, security checks, strategy invocation, and
//! token issuance. The dispatcher is a state machine: a request moves
//! through `Received → ResolvedAuthenticator → SecurityChecked →
//! CredentialsValidated → Authenticated → TokenIssued`, or drops to
//! `Failed(kind)` from any state. Every attempt, successful or not, emits
//! exactly one audit event.
//!
//! Protocol-specific handshake logic (OIDC code exchange, JWT signature
//! verification, CSR parsing, cloud attestation) lives behind the
//! [`authn_sdk::AuthenticatorStrategy`] capability; the dispatcher never
//! learns protocol details.

pub mod config;
pub mod config_store;
pub mod dispatcher;
pub mod registry;
pub mod strategies;
pub mod token;

pub use config::AuthnConfig;
pub use config_store::{ConfigStore, ENABLED_ANNOTATION};
pub use dispatcher::AuthnService;
pub use registry::{global_registry, install_global_registry, AuthenticatorRegistry, Resolved};
pub use token::TokenIssuer;
