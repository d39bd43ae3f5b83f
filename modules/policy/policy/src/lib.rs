//! Policy mutation engine.
//!
//! Turns a parsed policy document (a [`PolicySubmission`] plus its
//! pre-expanded [`trustd_store::Mutation`] sequence, produced by the
//! external parser/differ) into a committed set of role/resource/grant
//! changes under optimistic concurrency.
//!
//! The engine performs no internal retry on conflict: exactly one of the
//! competing submissions wins, the losers receive a conflict outcome with a
//! randomized retry-after hint and must resubmit.

mod engine;
mod submission;

pub use engine::{
    CommitObserver, CreatedRole, PolicyLoadResult, PolicyMutationEngine, RETRY_AFTER_RANGE,
};
pub use submission::{LoadMode, PolicySubmission};
