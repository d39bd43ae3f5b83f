//! The commit protocol.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::Rng;
use secrecy::ExposeSecret;
use serde::Serialize;

use trustd_audit::{AuditEvent, AuditSink};
use trustd_errors::FailureKind;
use trustd_store::{
    Mutation, PolicyStore, Resource, ResourceId, ResourceKind, RoleId, StoreError,
};

use crate::{LoadMode, PolicySubmission};

/// Bounds of the randomized retry-after hint handed to losers of a commit
/// race. Part of the public contract: callers may rely on the drawn value
/// falling in this range.
pub const RETRY_AFTER_RANGE: RangeInclusive<u64> = 1..=8;

/// Notified after every successful commit.
///
/// The authentication registry registers itself here so commits that touch
/// webservice resources invalidate its configured-authenticator cache.
pub trait CommitObserver: Send + Sync {
    fn policy_committed(&self, account: &str, touched_webservices: bool);
}

/// A newly provisioned actor role and its API key.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedRole {
    pub id: String,
    pub api_key: String,
}

/// Successful load outcome. `created_roles` is a map because callers index
/// by role id.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyLoadResult {
    pub created_roles: HashMap<String, CreatedRole>,
    pub version: u64,
}

/// Commits policy submissions against the transactional store.
pub struct PolicyMutationEngine {
    store: Arc<dyn PolicyStore>,
    audit: Arc<dyn AuditSink>,
    observers: RwLock<Vec<Arc<dyn CommitObserver>>>,
}

impl PolicyMutationEngine {
    #[must_use]
    pub fn new(store: Arc<dyn PolicyStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            store,
            audit,
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn register_observer(&self, observer: Arc<dyn CommitObserver>) {
        self.observers.write().push(observer);
    }

    /// Apply one submission and its pre-expanded mutation sequence.
    ///
    /// All-or-nothing: either every mutation commits (and every newly
    /// materialized actor role is provisioned with a credential in the same
    /// transaction), or nothing is applied. Exactly one audit event is
    /// emitted per mutated entity on success, or a single failure event
    /// otherwise.
    ///
    /// # Errors
    ///
    /// A [`FailureKind`] for the first violated constraint; conflicts carry
    /// a retry-after drawn from [`RETRY_AFTER_RANGE`]. The engine never
    /// retries internally.
    #[tracing::instrument(
        skip_all,
        fields(account = %submission.account, branch = %submission.branch, mode = ?submission.mode)
    )]
    pub async fn submit(
        &self,
        submission: &PolicySubmission,
        mutations: Vec<Mutation>,
    ) -> Result<PolicyLoadResult, FailureKind> {
        self.run(submission, mutations, true).await
    }

    /// Apply a submission the caller has already authorized against the
    /// mutated entities themselves (e.g. a config-flag flip checked against
    /// the webservice resource). The branch-policy privilege check is
    /// skipped; validation, the commit, auditing, and observer notification
    /// are identical to [`Self::submit`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::submit`], minus `RoleNotAuthorizedOnResource` for the
    /// branch policy.
    #[tracing::instrument(
        skip_all,
        fields(account = %submission.account, branch = %submission.branch, mode = ?submission.mode)
    )]
    pub async fn submit_authorized(
        &self,
        submission: &PolicySubmission,
        mutations: Vec<Mutation>,
    ) -> Result<PolicyLoadResult, FailureKind> {
        self.run(submission, mutations, false).await
    }

    async fn run(
        &self,
        submission: &PolicySubmission,
        mutations: Vec<Mutation>,
        enforce_branch_privilege: bool,
    ) -> Result<PolicyLoadResult, FailureKind> {
        let operation = submission.mode.operation();
        let actor = submission.submitting_role.to_string();

        match self
            .try_submit(submission, mutations, enforce_branch_privilege)
            .await
        {
            Ok((result, subjects)) => {
                for subject in &subjects {
                    self.audit.emit(AuditEvent::success(
                        operation,
                        subject,
                        &actor,
                        &submission.client_ip,
                    ));
                }
                tracing::info!(
                    version = result.version,
                    mutated = subjects.len(),
                    created_roles = result.created_roles.len(),
                    "policy committed"
                );
                Ok(result)
            }
            Err(kind) => {
                // Subject is empty: no role or resource was impacted.
                self.audit.emit(AuditEvent::failure(
                    operation,
                    "",
                    &actor,
                    &submission.client_ip,
                    &kind.to_string(),
                ));
                tracing::info!(error = %kind, "policy load rejected");
                tracing::debug!(error = ?kind, "policy load rejected");
                Err(kind)
            }
        }
    }

    async fn try_submit(
        &self,
        submission: &PolicySubmission,
        mut mutations: Vec<Mutation>,
        enforce_branch_privilege: bool,
    ) -> Result<(PolicyLoadResult, Vec<String>), FailureKind> {
        let account = submission.account.as_str();
        if !self.store.account_exists(account).await.map_err(store_failure)? {
            return Err(FailureKind::AccountNotDefined {
                account: account.to_owned(),
            });
        }

        // Find or create the branch policy resource; when it exists and the
        // caller did not pre-authorize, the submitting role must hold the
        // mode's privilege on it.
        let branch_resource = ResourceId::new(account, ResourceKind::Policy, &submission.branch);
        match self
            .store
            .resource(&branch_resource)
            .await
            .map_err(store_failure)?
        {
            Some(_) => {
                if enforce_branch_privilege {
                    let privilege = submission.mode.required_privilege();
                    let permitted = self
                        .store
                        .is_permitted(&submission.submitting_role, privilege, &branch_resource)
                        .await
                        .map_err(store_failure)?;
                    if !permitted {
                        return Err(FailureKind::RoleNotAuthorizedOnResource {
                            role: submission.submitting_role.to_string(),
                            privilege: privilege.to_owned(),
                            resource: branch_resource.to_string(),
                        });
                    }
                }
            }
            None => {
                mutations.insert(
                    0,
                    Mutation::CreateResource {
                        resource: Resource::new(
                            branch_resource,
                            submission.submitting_role.clone(),
                        ),
                    },
                );
            }
        }

        self.validate(submission.mode, &mutations).await?;

        let subjects: Vec<String> = mutations.iter().map(Mutation::subject).collect();
        let touched_webservices = mutations.iter().any(Mutation::touches_webservice);

        let committed = self
            .store
            .commit(
                account,
                &submission.branch,
                submission.expected_base_version,
                &mutations,
            )
            .await
            .map_err(|e| match e {
                StoreError::VersionConflict { .. } => FailureKind::PolicyConflict {
                    retry_after_secs: draw_retry_after(),
                },
                other => store_failure(other),
            })?;

        let created_roles = committed
            .provisioned
            .iter()
            .map(|cred| {
                let id = cred.role.to_string();
                (
                    id.clone(),
                    CreatedRole {
                        id,
                        api_key: cred.api_key.expose_secret().to_owned(),
                    },
                )
            })
            .collect();

        for observer in self.observers.read().iter() {
            observer.policy_committed(account, touched_webservices);
        }

        Ok((
            PolicyLoadResult {
                created_roles,
                version: committed.version,
            },
            subjects,
        ))
    }

    /// Validate the mutation sequence against the submission mode.
    async fn validate(&self, mode: LoadMode, mutations: &[Mutation]) -> Result<(), FailureKind> {
        // Entities created earlier in this same sequence are not
        // "pre-existing" for create-mode purposes.
        let mut created_roles: Vec<&RoleId> = Vec::new();
        let mut created_resources: Vec<&ResourceId> = Vec::new();

        for mutation in mutations {
            if mutation.is_removal() {
                if !mode.delete_permitted() {
                    return Err(FailureKind::DeletionNotPermitted {
                        subject: mutation.subject(),
                    });
                }
                if mode == LoadMode::Patch && !mutation.is_explicit_removal() {
                    return Err(FailureKind::ImplicitDeletionForbidden {
                        subject: mutation.subject(),
                    });
                }
            }

            if mode == LoadMode::Create {
                self.reject_preexisting(mutation, &created_roles, &created_resources)
                    .await?;
            }

            match mutation {
                Mutation::CreateRole { role, .. } => created_roles.push(role),
                Mutation::CreateResource { resource } => created_resources.push(&resource.id),
                _ => {}
            }
        }
        Ok(())
    }

    /// Create-mode rule: fail entirely if any mutation would modify an
    /// entity that existed before this submission.
    async fn reject_preexisting(
        &self,
        mutation: &Mutation,
        created_roles: &[&RoleId],
        created_resources: &[&ResourceId],
    ) -> Result<(), FailureKind> {
        let conflict = |subject: String| FailureKind::EntityAlreadyExists { subject };

        match mutation {
            Mutation::CreateRole { role, .. } => {
                if self.store.role_exists(role).await.map_err(store_failure)? {
                    return Err(conflict(role.to_string()));
                }
            }
            Mutation::CreateResource { resource } => {
                if self
                    .store
                    .resource(&resource.id)
                    .await
                    .map_err(store_failure)?
                    .is_some()
                {
                    return Err(conflict(resource.id.to_string()));
                }
            }
            Mutation::AddGrant { role, .. } => {
                if !created_roles.contains(&role)
                    && self.store.role_exists(role).await.map_err(store_failure)?
                {
                    return Err(conflict(role.to_string()));
                }
            }
            Mutation::AddPermission { resource, .. } | Mutation::SetAnnotation { resource, .. } => {
                if !created_resources.contains(&resource)
                    && self
                        .store
                        .resource(resource)
                        .await
                        .map_err(store_failure)?
                        .is_some()
                {
                    return Err(conflict(resource.to_string()));
                }
            }
            // Removals were already rejected for create mode.
            _ => {}
        }
        Ok(())
    }
}

fn store_failure(e: StoreError) -> FailureKind {
    FailureKind::StoreUnavailable {
        reason: e.to_string(),
    }
}

/// Uniformly drawn retry-after hint, used to desynchronize competing
/// retries.
fn draw_retry_after() -> u64 {
    rand::rng().random_range(RETRY_AFTER_RANGE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_stays_in_the_contract_range() {
        for _ in 0..256 {
            let drawn = draw_retry_after();
            assert!(RETRY_AFTER_RANGE.contains(&drawn), "{drawn}");
        }
    }
}
