//! Graph entities beyond the bare identifiers.

use std::collections::BTreeMap;

use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};

use crate::{ResourceId, RoleId};

/// A protected resource and its annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: ResourceId,
    pub owner: RoleId,
    pub annotations: BTreeMap<String, String>,
}

impl Resource {
    #[must_use]
    pub fn new(id: ResourceId, owner: RoleId) -> Self {
        Self {
            id,
            owner,
            annotations: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn annotation(&self, name: &str) -> Option<&str> {
        self.annotations.get(name).map(String::as_str)
    }
}

/// API-key credential of an actor role.
///
/// Created exactly once per actor role the first time the role is
/// provisioned; never regenerated implicitly. The key is wrapped in
/// [`SecretString`] so `Debug` output redacts it.
#[derive(Debug, Clone)]
pub struct Credential {
    pub role: RoleId,
    pub api_key: SecretString,
}

impl Credential {
    #[must_use]
    pub fn new(role: RoleId) -> Self {
        Self {
            role,
            api_key: generate_api_key().into(),
        }
    }

    /// Constant-shape comparison used by the api-key authenticator.
    #[must_use]
    pub fn key_matches(&self, presented: &str) -> bool {
        // Keys are fixed-length random hex, so a simple comparison does not
        // leak length information.
        self.api_key.expose_secret() == presented
    }
}

/// Generate a fresh API key: 32 random bytes, hex encoded.
#[must_use]
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_keys_are_64_hex_chars_and_unique() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn credential_debug_redacts_the_key() {
        let cred = Credential::new(RoleId::user("acme", "alice"));
        let debug = format!("{cred:?}");
        assert!(!debug.contains(cred.api_key.expose_secret()));
    }
}
