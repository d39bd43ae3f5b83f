//! Process-wide catalog of installed, configured, and enabled
//! authenticators.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;

use authn_sdk::{AuthenticatorInput, AuthenticatorStrategy, AuthenticatorType};
use trustd_errors::FailureKind;
use trustd_store::{PolicyStore, Resource, ResourceId, ResourceKind, StoreError};

use crate::config_store::ENABLED_ANNOTATION;

pub(crate) fn store_failure(e: StoreError) -> FailureKind {
    FailureKind::StoreUnavailable {
        reason: e.to_string(),
    }
}

/// Outcome of a successful registry lookup.
pub struct Resolved {
    pub strategy: Arc<dyn AuthenticatorStrategy>,
    /// The webservice resource backing this instance; `None` for the
    /// built-in `authn` method.
    pub webservice: Option<ResourceId>,
}

impl fmt::Debug for Resolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("authenticator", &self.strategy.authenticator_type())
            .field("webservice", &self.webservice)
            .finish()
    }
}

/// Catalog of authenticators.
///
/// The installed set and the operator allow-list are fixed at construction;
/// the configured set is read from policy-governed webservice resources and
/// cached per account, invalidated when a policy commit touches webservices.
pub struct AuthenticatorRegistry {
    strategies: BTreeMap<AuthenticatorType, Arc<dyn AuthenticatorStrategy>>,
    allow_list: BTreeSet<String>,
    store: Arc<dyn PolicyStore>,
    configured_cache: DashMap<String, Arc<Vec<Resource>>>,
}

impl AuthenticatorRegistry {
    #[must_use]
    pub fn new(
        strategies: Vec<Arc<dyn AuthenticatorStrategy>>,
        allow_list: BTreeSet<String>,
        store: Arc<dyn PolicyStore>,
    ) -> Self {
        Self {
            strategies: strategies
                .into_iter()
                .map(|s| (s.authenticator_type(), s))
                .collect(),
            allow_list,
            store,
            configured_cache: DashMap::new(),
        }
    }

    /// Installed authenticator names, sorted for deterministic output.
    #[must_use]
    pub fn installed(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .strategies
            .keys()
            .map(|t| t.as_str().to_owned())
            .collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn strategy(
        &self,
        authenticator: AuthenticatorType,
    ) -> Option<Arc<dyn AuthenticatorStrategy>> {
        self.strategies.get(&authenticator).cloned()
    }

    /// Webservice resources representing configured authenticator instances
    /// for `account`, sorted by identifier. Cached until a policy commit
    /// touching webservices invalidates the account's entry.
    ///
    /// # Errors
    ///
    /// [`FailureKind::StoreUnavailable`] when the store cannot be reached.
    pub async fn configured(&self, account: &str) -> Result<Arc<Vec<Resource>>, FailureKind> {
        if let Some(cached) = self.configured_cache.get(account) {
            return Ok(cached.clone());
        }
        let webservices = self
            .store
            .resources_of_kind(account, ResourceKind::Webservice)
            .await
            .map_err(store_failure)?;
        let configured: Arc<Vec<Resource>> = Arc::new(
            webservices
                .into_iter()
                .filter(|r| authenticator_of(&r.id).is_some())
                .collect(),
        );
        self.configured_cache
            .insert(account.to_owned(), configured.clone());
        Ok(configured)
    }

    /// Sorted identifiers of the configured instances (`authn-oidc/prod`).
    ///
    /// # Errors
    ///
    /// [`FailureKind::StoreUnavailable`] when the store cannot be reached.
    pub async fn configured_names(&self, account: &str) -> Result<Vec<String>, FailureKind> {
        Ok(self
            .configured(account)
            .await?
            .iter()
            .map(|r| r.id.identifier.clone())
            .collect())
    }

    /// Enabled authenticators: the operator allow-list plus every
    /// configured instance whose policy flag enables it.
    ///
    /// # Errors
    ///
    /// [`FailureKind::StoreUnavailable`] when the store cannot be reached.
    pub async fn enabled(&self, account: &str) -> Result<BTreeSet<String>, FailureKind> {
        let mut enabled = self.allow_list.clone();
        for resource in self.configured(account).await?.iter() {
            if resource.annotation(ENABLED_ANNOTATION) == Some("true") {
                enabled.insert(resource.id.identifier.clone());
            }
        }
        Ok(enabled)
    }

    /// Drop the cached configured set for `account`.
    pub fn invalidate_configured(&self, account: &str) {
        self.configured_cache.remove(account);
    }

    /// Resolve a request to its strategy, enforcing
    /// installed ∧ configured ∧ enabled.
    ///
    /// # Errors
    ///
    /// [`FailureKind::AuthenticatorNotSupported`] when the protocol is not
    /// installed, [`FailureKind::WebserviceNotFound`] when policy declares
    /// no matching webservice, [`FailureKind::AuthenticatorNotWhitelisted`]
    /// when neither the allow-list nor a policy flag enables the instance.
    pub async fn resolve(&self, input: &AuthenticatorInput) -> Result<Resolved, FailureKind> {
        let strategy = self.strategy(input.authenticator).ok_or_else(|| {
            FailureKind::AuthenticatorNotSupported {
                authenticator: input.authenticator.as_str().to_owned(),
            }
        })?;

        // The built-in `authn` method needs no webservice and cannot be
        // disabled.
        if !input.authenticator.requires_webservice() {
            return Ok(Resolved {
                strategy,
                webservice: None,
            });
        }

        let identifier = input.webservice_identifier();
        let configured = self.configured(&input.account).await?;
        let webservice = configured
            .iter()
            .find(|r| r.id.identifier == identifier)
            .ok_or_else(|| FailureKind::WebserviceNotFound {
                webservice: identifier.clone(),
            })?;

        let enabled = self.enabled(&input.account).await?;
        if !enabled.contains(&identifier) && !enabled.contains(input.authenticator.as_str()) {
            return Err(FailureKind::AuthenticatorNotWhitelisted {
                authenticator: identifier,
            });
        }

        Ok(Resolved {
            strategy,
            webservice: Some(webservice.id.clone()),
        })
    }
}

impl policy_engine::CommitObserver for AuthenticatorRegistry {
    fn policy_committed(&self, account: &str, touched_webservices: bool) {
        if touched_webservices {
            tracing::debug!(account, "invalidating configured-authenticator cache");
            self.invalidate_configured(account);
        }
    }
}

/// Parse the authenticator type out of a webservice identifier like
/// `authn-oidc/prod`; `None` for unrelated webservices.
fn authenticator_of(id: &ResourceId) -> Option<AuthenticatorType> {
    let head = id.identifier.split('/').next()?;
    head.parse().ok()
}

static GLOBAL: OnceLock<Arc<AuthenticatorRegistry>> = OnceLock::new();

/// Install the process-wide registry handle. Exactly-once: the first caller
/// wins and every later call returns the already-installed handle.
pub fn install_global_registry(registry: Arc<AuthenticatorRegistry>) -> Arc<AuthenticatorRegistry> {
    GLOBAL.get_or_init(|| registry).clone()
}

/// The process-wide registry, if one has been installed. Never blocks and
/// never re-runs initialization.
#[must_use]
pub fn global_registry() -> Option<Arc<AuthenticatorRegistry>> {
    GLOBAL.get().cloned()
}
