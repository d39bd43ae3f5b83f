//! Append-only audit trail shared by the authentication dispatcher and the
//! policy mutation engine.
//!
//! The trail is a pure sink: emitting an event can never alter an
//! authorization decision (audit-after-decide). Every attempt at either
//! engine produces at least one event; failure events always carry a
//! human-readable error and the actor's client IP.

mod event;
mod sink;

pub use event::{AuditEvent, Operation, Outcome};
pub use sink::{AuditSink, MemorySink, TracingSink};
