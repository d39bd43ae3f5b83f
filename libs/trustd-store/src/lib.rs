//! RBAC graph model and the transactional store boundary.
//!
//! The store is an external collaborator: the engines' responsibility ends
//! at producing correctly ordered [`Mutation`]s and committing them through
//! the [`PolicyStore`] transaction API. Commits use optimistic concurrency:
//! a commit succeeds only if the base version read at submission time still
//! matches at commit time; otherwise the whole commit is rejected.
//!
//! [`MemoryStore`] is the in-process reference implementation, used by both
//! engines' tests and by single-node deployments.

mod ids;
mod memory;
mod model;
mod mutation;
mod store;

pub use ids::{ParseIdError, ResourceId, ResourceKind, RoleId, RoleKind};
pub use memory::MemoryStore;
pub use model::{generate_api_key, Credential, Resource};
pub use mutation::Mutation;
pub use store::{CommitResult, PolicyStore, StoreError};
