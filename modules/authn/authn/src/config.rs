//! Process-level configuration for the authentication engine.
//!
//! Read once at process start and treated as immutable for the process
//! lifetime.

use std::collections::BTreeSet;

use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use secrecy::SecretString;
use serde::Deserialize;

/// Engine configuration.
///
/// Assembled from `trustd.yaml` (when present) overlaid with
/// `TRUSTD_`-prefixed environment variables.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthnConfig {
    /// Operator-level allow-list, comma separated: whole types
    /// (`authn-jwt`) or single instances (`authn-oidc/prod`). The built-in
    /// `authn` method is always enabled.
    pub enabled_authenticators: String,

    /// Account used when a request does not name one.
    pub default_account: String,

    /// HMAC key for issued access tokens. Token issuance fails with
    /// `ServiceUnavailable` while this is unset.
    pub signing_key: Option<SecretString>,

    /// Lifetime of issued tokens.
    pub token_ttl_secs: u64,

    /// Upper bound on one strategy invocation, covering any external
    /// protocol calls it makes.
    pub request_timeout_secs: u64,
}

impl Default for AuthnConfig {
    fn default() -> Self {
        Self {
            enabled_authenticators: "authn".to_owned(),
            default_account: "default".to_owned(),
            signing_key: None,
            token_ttl_secs: 8 * 60,
            request_timeout_secs: 10,
        }
    }
}

impl AuthnConfig {
    /// Load configuration from `trustd.yaml` and the environment.
    ///
    /// # Errors
    ///
    /// A [`figment::Error`] when a provided value fails to deserialize.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(Figment::new().merge(Yaml::file("trustd.yaml")))
    }

    /// Load from an explicit figment base; the environment always overlays.
    ///
    /// # Errors
    ///
    /// A [`figment::Error`] when a provided value fails to deserialize.
    pub fn load_from(base: Figment) -> Result<Self, figment::Error> {
        base.merge(Env::prefixed("TRUSTD_")).extract()
    }

    /// The parsed allow-list. `authn` is always present.
    #[must_use]
    pub fn allow_list(&self) -> BTreeSet<String> {
        let mut entries: BTreeSet<String> = self
            .enabled_authenticators
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        entries.insert("authn".to_owned());
        entries
    }
}
