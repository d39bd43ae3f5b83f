//! Audit sinks.

use parking_lot::Mutex;

use crate::{AuditEvent, Operation, Outcome};

/// Where audit events go.
///
/// Emission is infallible by contract: a sink that cannot persist an event
/// must handle that internally (buffer, drop with a log line) rather than
/// fail the operation that produced the event.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Sink that writes structured tracing records.
///
/// Failures are logged at `warn`, successes at `info`, both on the dedicated
/// `audit` target so operators can route them separately.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn emit(&self, event: AuditEvent) {
        match event.outcome {
            Outcome::Success => tracing::info!(
                target: "audit",
                event_id = %event.id,
                operation = event.operation.as_str(),
                subject = %event.subject,
                actor = %event.actor,
                client_ip = %event.client_ip,
                "audit"
            ),
            Outcome::Failure => tracing::warn!(
                target: "audit",
                event_id = %event.id,
                operation = event.operation.as_str(),
                subject = %event.subject,
                actor = %event.actor,
                client_ip = %event.client_ip,
                error = event.error_message.as_deref().unwrap_or(""),
                "audit"
            ),
        }
    }
}

/// In-memory append-only sink, used by tests to assert event streams.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far, in emission order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Events recorded for one operation, in emission order.
    #[must_use]
    pub fn for_operation(&self, operation: Operation) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.operation == operation)
            .cloned()
            .collect()
    }
}

impl AuditSink for MemorySink {
    fn emit(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}
