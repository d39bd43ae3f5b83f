//! The transactional store boundary.

use async_trait::async_trait;
use thiserror::Error;

use crate::{Credential, Mutation, Resource, ResourceId, ResourceKind, RoleId};

/// Failures surfaced by a store implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The optimistic concurrency guard failed: someone else committed
    /// against this branch first. The whole commit was rejected.
    #[error("version conflict: expected base version {expected}, found {actual}")]
    VersionConflict { expected: u64, actual: u64 },

    /// The store cannot be reached or is in a fatal state.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Result of a successful commit.
#[derive(Debug, Clone)]
pub struct CommitResult {
    /// The branch version after the commit.
    pub version: u64,
    /// Credentials of every actor role asserted by this commit
    /// (lookup-or-create, in commit order). Provisioning happens inside the
    /// same transaction as the graph change: either both persist or neither
    /// does. A role that already had a credential keeps it.
    pub provisioned: Vec<Credential>,
}

/// Transactional store for the role/resource/grant graph and the
/// credential table.
///
/// Commits serialize through optimistic concurrency: `commit` succeeds only
/// if `expected_version` still matches the branch version at commit time,
/// and it applies either the entire mutation sequence or nothing.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Whether the tenant account exists.
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the store cannot be reached.
    async fn account_exists(&self, account: &str) -> Result<bool, StoreError>;

    /// Whether a role exists in the graph.
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the store cannot be reached.
    async fn role_exists(&self, role: &RoleId) -> Result<bool, StoreError>;

    /// Look up one resource.
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the store cannot be reached.
    async fn resource(&self, id: &ResourceId) -> Result<Option<Resource>, StoreError>;

    /// All resources of one kind within an account, sorted by identifier.
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the store cannot be reached.
    async fn resources_of_kind(
        &self,
        account: &str,
        kind: ResourceKind,
    ) -> Result<Vec<Resource>, StoreError>;

    /// Whether `role` holds `privilege` on `resource`, directly, through a
    /// transitive group membership, or by owning the resource.
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the store cannot be reached.
    async fn is_permitted(
        &self,
        role: &RoleId,
        privilege: &str,
        resource: &ResourceId,
    ) -> Result<bool, StoreError>;

    /// Current version of a policy branch (0 if never committed to).
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the store cannot be reached.
    async fn current_version(&self, account: &str, branch: &str) -> Result<u64, StoreError>;

    /// Atomically apply `mutations` to `branch`, conditioned on
    /// `expected_version` still matching.
    ///
    /// # Errors
    /// [`StoreError::VersionConflict`] if another commit won the race (no
    /// partial application), [`StoreError::Unavailable`] on store failure.
    async fn commit(
        &self,
        account: &str,
        branch: &str,
        expected_version: u64,
        mutations: &[Mutation],
    ) -> Result<CommitResult, StoreError>;

    /// The credential of an actor role, if one has been provisioned.
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the store cannot be reached.
    async fn credential(&self, role: &RoleId) -> Result<Option<Credential>, StoreError>;

    /// Verify a basic-auth password for a role. Returns `false` for unknown
    /// roles and roles without a password.
    ///
    /// # Errors
    /// [`StoreError::Unavailable`] if the store cannot be reached.
    async fn verify_password(&self, role: &RoleId, password: &str) -> Result<bool, StoreError>;
}
