//! Audit event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The operation an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// A full authentication attempt (credentials were presented).
    Authenticate,
    /// A basic-auth login attempt.
    Login,
    /// A dry-run status probe; never carries credentials.
    ValidateStatus,
    /// Enable/disable of a configured authenticator instance.
    UpdateAuthenticatorConfig,
    /// Policy submission in create mode.
    PolicyCreate,
    /// Policy submission in replace mode.
    PolicyReplace,
    /// Policy submission in patch mode.
    PolicyPatch,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authenticate => "authenticate",
            Self::Login => "login",
            Self::ValidateStatus => "validate-status",
            Self::UpdateAuthenticatorConfig => "update-authenticator-config",
            Self::PolicyCreate => "policy-create",
            Self::PolicyReplace => "policy-replace",
            Self::PolicyPatch => "policy-patch",
        }
    }
}

/// Success or failure of the attempted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

/// One append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub operation: Operation,
    /// The entity the operation acted on (webservice, role, resource).
    /// Empty when a policy submission failed before touching anything.
    pub subject: String,
    /// The role that performed (or attempted) the operation.
    pub actor: String,
    pub client_ip: String,
    pub outcome: Outcome,
    pub error_message: Option<String>,
}

impl AuditEvent {
    /// A successful operation against `subject`.
    #[must_use]
    pub fn success(operation: Operation, subject: &str, actor: &str, client_ip: &str) -> Self {
        Self::new(operation, subject, actor, client_ip, Outcome::Success, None)
    }

    /// A failed operation; `error` is the human-readable internal detail.
    #[must_use]
    pub fn failure(
        operation: Operation,
        subject: &str,
        actor: &str,
        client_ip: &str,
        error: &str,
    ) -> Self {
        Self::new(
            operation,
            subject,
            actor,
            client_ip,
            Outcome::Failure,
            Some(error.to_owned()),
        )
    }

    fn new(
        operation: Operation,
        subject: &str,
        actor: &str,
        client_ip: &str,
        outcome: Outcome,
        error_message: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            operation,
            subject: subject.to_owned(),
            actor: actor.to_owned(),
            client_ip: client_ip.to_owned(),
            outcome,
            error_message,
        }
    }
}
