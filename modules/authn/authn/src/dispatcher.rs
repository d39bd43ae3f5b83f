//! The authentication dispatcher.
//!
//! Owns the request pipeline ordering: registry resolution and every
//! security check run before the credential body is materialized, strategy
//! invocation runs under a timeout, and the derived identity is re-verified
//! against the graph before a token is minted.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use authn_sdk::{
    AuthenticationResult, AuthenticatorCatalog, AuthenticatorInput, AuthenticatorType, AuthnApi,
    ConfiguredAuthenticator, EncodedToken, Identity, StatusFailure,
};
use trustd_audit::{AuditEvent, AuditSink, Operation};
use trustd_errors::{classify_status, ClassifiedError, FailureKind};
use trustd_store::{PolicyStore, ResourceId, RoleId};

use policy_engine::PolicyMutationEngine;

use crate::config::AuthnConfig;
use crate::config_store::ConfigStore;
use crate::registry::{store_failure, AuthenticatorRegistry};
use crate::token::TokenIssuer;

/// The privilege a principal must hold on an authenticator webservice to
/// authenticate through it.
const AUTHENTICATE_PRIVILEGE: &str = "authenticate";

/// Dispatches authentication requests to installed strategies.
pub struct AuthnService {
    registry: Arc<AuthenticatorRegistry>,
    store: Arc<dyn PolicyStore>,
    config_store: ConfigStore,
    issuer: TokenIssuer,
    audit: Arc<dyn AuditSink>,
    request_timeout: Duration,
}

impl AuthnService {
    #[must_use]
    pub fn new(
        config: &AuthnConfig,
        registry: Arc<AuthenticatorRegistry>,
        store: Arc<dyn PolicyStore>,
        engine: Arc<PolicyMutationEngine>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config_store: ConfigStore::new(store.clone(), engine, audit.clone()),
            issuer: TokenIssuer::new(config.signing_key.as_ref(), config.token_ttl_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            registry,
            store,
            audit,
        }
    }

    /// The full pipeline. Each step may drop the request with a
    /// [`FailureKind`]; the caller audits and classifies.
    async fn try_authenticate(
        &self,
        input: &AuthenticatorInput,
    ) -> Result<AuthenticationResult, FailureKind> {
        let resolved = self.registry.resolve(input).await?;

        // Everything knowable without the credential body is checked first;
        // a doomed request never drains the transport.
        self.security_check(input, resolved.webservice.as_ref())
            .await?;

        let identity = tokio::time::timeout(
            self.request_timeout,
            resolved.strategy.validate_credentials(input),
        )
        .await
        .map_err(|_| FailureKind::ValidationTimeout)??;

        // Token-bearing protocols derive the principal from the credential,
        // so the graph checks run again for the derived identity.
        self.verify_identity(&identity, resolved.webservice.as_ref())
            .await?;

        self.issuer.issue(&identity)
    }

    async fn security_check(
        &self,
        input: &AuthenticatorInput,
        webservice: Option<&ResourceId>,
    ) -> Result<(), FailureKind> {
        if !self
            .store
            .account_exists(&input.account)
            .await
            .map_err(store_failure)?
        {
            return Err(FailureKind::AccountNotDefined {
                account: input.account.clone(),
            });
        }
        if let Some(username) = &input.username {
            let identity = Identity::new(RoleId::from_username(&input.account, username));
            self.verify_identity(&identity, webservice).await?;
        }
        Ok(())
    }

    async fn verify_identity(
        &self,
        identity: &Identity,
        webservice: Option<&ResourceId>,
    ) -> Result<(), FailureKind> {
        if !self
            .store
            .role_exists(&identity.role)
            .await
            .map_err(store_failure)?
        {
            return Err(FailureKind::RoleNotFound {
                role: identity.role.to_string(),
            });
        }
        if let Some(ws) = webservice {
            let permitted = self
                .store
                .is_permitted(&identity.role, AUTHENTICATE_PRIVILEGE, ws)
                .await
                .map_err(store_failure)?;
            if !permitted {
                return Err(FailureKind::RoleNotAuthorizedOnResource {
                    role: identity.role.to_string(),
                    privilege: AUTHENTICATE_PRIVILEGE.to_owned(),
                    resource: ws.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn try_status(&self, input: &AuthenticatorInput) -> Result<(), FailureKind> {
        // The built-in method has no webservice; nothing to probe.
        if !input.authenticator.requires_webservice() {
            return Err(FailureKind::StatusNotSupported {
                authenticator: input.authenticator.as_str().to_owned(),
            });
        }
        if !self
            .store
            .account_exists(&input.account)
            .await
            .map_err(store_failure)?
        {
            return Err(FailureKind::AccountNotDefined {
                account: input.account.clone(),
            });
        }
        let resolved = self.registry.resolve(input).await?;
        resolved.strategy.status_check(input).await
    }

    async fn try_login(
        &self,
        account: &str,
        role: &RoleId,
        password: &str,
    ) -> Result<SecretString, FailureKind> {
        if !self
            .store
            .account_exists(account)
            .await
            .map_err(store_failure)?
        {
            return Err(FailureKind::AccountNotDefined {
                account: account.to_owned(),
            });
        }
        if !self
            .store
            .verify_password(role, password)
            .await
            .map_err(store_failure)?
        {
            return Err(FailureKind::InvalidCredentials);
        }
        let credential = self
            .store
            .credential(role)
            .await
            .map_err(store_failure)?
            .ok_or(FailureKind::InvalidCredentials)?;
        Ok(credential.api_key)
    }
}

#[async_trait]
impl AuthnApi for AuthnService {
    async fn list_authenticators(
        &self,
        role: &RoleId,
        account: &str,
        service_id: Option<&str>,
    ) -> Result<Vec<ConfiguredAuthenticator>, ClassifiedError> {
        let oidc = self.registry.strategy(AuthenticatorType::Oidc);
        let prefix = format!("{}/", AuthenticatorType::Oidc.as_str());

        let mut listed = Vec::new();
        for webservice in self.registry.configured(account).await?.iter() {
            let Some(instance) = webservice.id.identifier.strip_prefix(&prefix) else {
                continue;
            };
            if service_id.is_some_and(|wanted| wanted != instance) {
                continue;
            }
            // Visibility follows `read` on the webservice resource.
            let visible = self
                .store
                .is_permitted(role, "read", &webservice.id)
                .await
                .map_err(store_failure)?;
            if !visible {
                continue;
            }
            if let Some(redirect_url) = oidc.as_ref().and_then(|s| s.login_url(instance)) {
                listed.push(ConfiguredAuthenticator {
                    name: instance.to_owned(),
                    redirect_url,
                });
            }
        }
        Ok(listed)
    }

    async fn catalog(&self, account: &str) -> Result<AuthenticatorCatalog, ClassifiedError> {
        Ok(AuthenticatorCatalog {
            installed: self.registry.installed(),
            configured: self.registry.configured_names(account).await?,
            enabled: self.registry.enabled(account).await?.into_iter().collect(),
        })
    }

    async fn status(&self, input: &AuthenticatorInput) -> Result<(), StatusFailure> {
        let subject = input.webservice_identifier();
        let actor = input.username.clone().unwrap_or_default();

        match self.try_status(input).await {
            Ok(()) => {
                self.audit.emit(AuditEvent::success(
                    Operation::ValidateStatus,
                    &subject,
                    &actor,
                    &input.client_ip,
                ));
                Ok(())
            }
            Err(kind) => {
                self.audit.emit(AuditEvent::failure(
                    Operation::ValidateStatus,
                    &subject,
                    &actor,
                    &input.client_ip,
                    &kind.to_string(),
                ));
                tracing::info!(webservice = %subject, error = %kind, "status probe failed");
                Err(StatusFailure {
                    classification: classify_status(&kind),
                    message: kind.to_string(),
                })
            }
        }
    }

    async fn update_config(
        &self,
        account: &str,
        authenticator: AuthenticatorType,
        service_id: Option<&str>,
        enabled: bool,
        actor: &RoleId,
        client_ip: &str,
    ) -> Result<(), ClassifiedError> {
        let identifier = authenticator.webservice_identifier(service_id);
        let webservice = ResourceId::webservice(account, &identifier);
        self.config_store
            .update(&webservice, enabled, actor, client_ip)
            .await?;
        Ok(())
    }

    async fn login(
        &self,
        account: &str,
        username: &str,
        password: &str,
        client_ip: &str,
    ) -> Result<SecretString, ClassifiedError> {
        let role = RoleId::from_username(account, username);
        let subject = role.to_string();

        match self.try_login(account, &role, password).await {
            Ok(api_key) => {
                self.audit.emit(AuditEvent::success(
                    Operation::Login,
                    &subject,
                    &subject,
                    client_ip,
                ));
                tracing::info!(role = %subject, "login succeeded");
                Ok(api_key)
            }
            Err(kind) => {
                self.audit.emit(AuditEvent::failure(
                    Operation::Login,
                    &subject,
                    &subject,
                    client_ip,
                    &kind.to_string(),
                ));
                tracing::info!(role = %subject, error = %kind, "login rejected");
                Err(kind.into())
            }
        }
    }

    async fn authenticate(
        &self,
        input: AuthenticatorInput,
        accepts_base64: bool,
    ) -> Result<EncodedToken, ClassifiedError> {
        let subject = input.webservice_identifier();

        match self.try_authenticate(&input).await {
            Ok(result) => {
                let actor = result.principal.username();
                self.audit.emit(AuditEvent::success(
                    Operation::Authenticate,
                    &subject,
                    &actor,
                    &input.client_ip,
                ));
                tracing::info!(webservice = %subject, principal = %actor, "authenticated");
                Ok(EncodedToken::new(&result.token, accepts_base64))
            }
            Err(kind) => {
                let actor = input.username.clone().unwrap_or_default();
                self.audit.emit(AuditEvent::failure(
                    Operation::Authenticate,
                    &subject,
                    &actor,
                    &input.client_ip,
                    &kind.to_string(),
                ));
                // The summary line stays coarse; the kind goes to debug and
                // the audit trail.
                tracing::info!(webservice = %subject, "authentication failed");
                tracing::debug!(webservice = %subject, error = %kind, "authentication failed");
                Err(kind.into())
            }
        }
    }
}
