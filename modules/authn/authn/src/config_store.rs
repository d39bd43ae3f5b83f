//! Runtime enable/disable of configured authenticator instances.
//!
//! The flag lives on the webservice resource as a policy annotation, so a
//! config change is itself a policy mutation: it goes through the policy
//! engine's commit protocol and shows up in the audit trail twice, once as
//! the policy patch and once as the config-update operation.

use std::sync::Arc;

use trustd_audit::{AuditEvent, AuditSink, Operation};
use trustd_errors::FailureKind;
use trustd_store::{Mutation, PolicyStore, ResourceId, RoleId};

use policy_engine::{LoadMode, PolicyMutationEngine, PolicySubmission};

use crate::registry::store_failure;

/// Annotation carrying the per-instance enablement flag.
pub const ENABLED_ANNOTATION: &str = "authn/enabled";

/// Applies enablement changes to configured authenticator webservices.
pub struct ConfigStore {
    store: Arc<dyn PolicyStore>,
    engine: Arc<PolicyMutationEngine>,
    audit: Arc<dyn AuditSink>,
}

impl ConfigStore {
    #[must_use]
    pub fn new(
        store: Arc<dyn PolicyStore>,
        engine: Arc<PolicyMutationEngine>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            engine,
            audit,
        }
    }

    /// Set the enablement flag of `webservice` to `enabled`.
    ///
    /// The actor must hold `update` on the webservice itself; that check
    /// happens before any mutation is attempted, so an unauthorized call
    /// leaves the graph untouched.
    ///
    /// # Errors
    ///
    /// [`FailureKind::WebserviceNotFound`] for unconfigured instances,
    /// [`FailureKind::RoleNotAuthorizedOnResource`] when the actor lacks
    /// `update`, [`FailureKind::PolicyConflict`] when a concurrent commit
    /// won the race.
    pub async fn update(
        &self,
        webservice: &ResourceId,
        enabled: bool,
        actor: &RoleId,
        client_ip: &str,
    ) -> Result<(), FailureKind> {
        match self.try_update(webservice, enabled, actor, client_ip).await {
            Ok(()) => {
                self.audit.emit(AuditEvent::success(
                    Operation::UpdateAuthenticatorConfig,
                    &webservice.to_string(),
                    &actor.to_string(),
                    client_ip,
                ));
                tracing::info!(webservice = %webservice, enabled, "authenticator config updated");
                Ok(())
            }
            Err(kind) => {
                self.audit.emit(AuditEvent::failure(
                    Operation::UpdateAuthenticatorConfig,
                    &webservice.to_string(),
                    &actor.to_string(),
                    client_ip,
                    &kind.to_string(),
                ));
                tracing::info!(webservice = %webservice, error = %kind, "authenticator config update rejected");
                Err(kind)
            }
        }
    }

    async fn try_update(
        &self,
        webservice: &ResourceId,
        enabled: bool,
        actor: &RoleId,
        client_ip: &str,
    ) -> Result<(), FailureKind> {
        if self
            .store
            .resource(webservice)
            .await
            .map_err(store_failure)?
            .is_none()
        {
            return Err(FailureKind::WebserviceNotFound {
                webservice: webservice.identifier.clone(),
            });
        }

        let permitted = self
            .store
            .is_permitted(actor, "update", webservice)
            .await
            .map_err(store_failure)?;
        if !permitted {
            return Err(FailureKind::RoleNotAuthorizedOnResource {
                role: actor.to_string(),
                privilege: "update".to_owned(),
                resource: webservice.to_string(),
            });
        }

        // The flag change is scoped to a branch named after the webservice,
        // created on first use and owned by the first updater. The call is
        // already authorized against the webservice above, so the submission
        // skips the branch-policy privilege check: holding `update` on the
        // instance is sufficient regardless of who first created the branch.
        let branch = webservice.identifier.clone();
        let base_version = self
            .store
            .current_version(&webservice.account, &branch)
            .await
            .map_err(store_failure)?;

        let submission = PolicySubmission {
            account: webservice.account.clone(),
            branch,
            submitting_role: actor.clone(),
            raw_text: String::new(),
            mode: LoadMode::Patch,
            client_ip: client_ip.to_owned(),
            expected_base_version: base_version,
        };
        let mutation = Mutation::SetAnnotation {
            resource: webservice.clone(),
            name: ENABLED_ANNOTATION.to_owned(),
            value: enabled.to_string(),
        };

        self.engine
            .submit_authorized(&submission, vec![mutation])
            .await?;
        Ok(())
    }
}
