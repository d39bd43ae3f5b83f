//! The built-in `authn` method: username plus provisioned API key.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::ExposeSecret;

use authn_sdk::{AuthenticatorInput, AuthenticatorStrategy, AuthenticatorType, Identity};
use trustd_errors::FailureKind;
use trustd_store::{PolicyStore, RoleId};

use crate::registry::store_failure;

pub struct ApiKeyStrategy {
    store: Arc<dyn PolicyStore>,
}

impl ApiKeyStrategy {
    #[must_use]
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl AuthenticatorStrategy for ApiKeyStrategy {
    fn authenticator_type(&self) -> AuthenticatorType {
        AuthenticatorType::ApiKey
    }

    async fn validate_credentials(
        &self,
        input: &AuthenticatorInput,
    ) -> Result<Identity, FailureKind> {
        let username =
            input
                .username
                .as_deref()
                .ok_or_else(|| FailureKind::MissingRequestParam {
                    param: "username".to_owned(),
                })?;
        let role = RoleId::from_username(&input.account, username);

        let presented = input.credentials.materialize()?;
        let credential = self
            .store
            .credential(&role)
            .await
            .map_err(store_failure)?
            .ok_or(FailureKind::InvalidCredentials)?;

        if credential.key_matches(presented.expose_secret()) {
            Ok(Identity::new(role))
        } else {
            Err(FailureKind::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use trustd_store::MemoryStore;

    use authn_sdk::LazyCredentials;

    use super::*;

    fn input_for(username: Option<&str>, credentials: LazyCredentials) -> AuthenticatorInput {
        AuthenticatorInput {
            authenticator: AuthenticatorType::ApiKey,
            service_id: None,
            account: "acme".to_owned(),
            username: username.map(str::to_owned),
            credentials,
            client_ip: "10.0.0.1".to_owned(),
        }
    }

    fn seeded_store() -> (Arc<MemoryStore>, SecretString) {
        let store = Arc::new(MemoryStore::new());
        store.add_account("acme");
        let alice = RoleId::user("acme", "alice");
        store.add_role(alice.clone(), alice.clone());
        let credential = store.provision_credential(&alice);
        (store, credential.api_key)
    }

    #[tokio::test]
    async fn matching_key_yields_the_role() {
        let (store, key) = seeded_store();
        let strategy = ApiKeyStrategy::new(store);
        let input = input_for(
            Some("alice"),
            LazyCredentials::from_text(key.expose_secret()),
        );
        let identity = strategy.validate_credentials(&input).await.unwrap();
        assert_eq!(identity.role, RoleId::user("acme", "alice"));
    }

    #[tokio::test]
    async fn wrong_key_and_unknown_role_both_read_as_invalid_credentials() {
        let (store, _) = seeded_store();
        let strategy = ApiKeyStrategy::new(store);

        let input = input_for(Some("alice"), LazyCredentials::from_text("not-the-key"));
        assert_eq!(
            strategy.validate_credentials(&input).await.unwrap_err(),
            FailureKind::InvalidCredentials
        );

        let input = input_for(Some("mallory"), LazyCredentials::from_text("whatever"));
        assert_eq!(
            strategy.validate_credentials(&input).await.unwrap_err(),
            FailureKind::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn missing_username_is_a_protocol_error() {
        let (store, key) = seeded_store();
        let strategy = ApiKeyStrategy::new(store);
        let input = input_for(None, LazyCredentials::from_text(key.expose_secret()));
        assert!(matches!(
            strategy.validate_credentials(&input).await.unwrap_err(),
            FailureKind::MissingRequestParam { .. }
        ));
    }
}
