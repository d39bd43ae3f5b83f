//! Shared failure taxonomy for the trust core.
//!
//! Both engines (authentication dispatch and policy mutation) report internal
//! failures as a [`FailureKind`]. A single classification table maps every
//! kind to the coarse, externally visible [`Classification`]; anything the
//! table does not name deliberately collapses to `Unauthorized` so that the
//! response never leaks whether an account, role, or authenticator exists.
//!
//! The fine-grained kind is only ever written to the audit trail and the
//! internal logs, never to the response payload.

mod classification;
mod kind;

pub use classification::{Classification, StatusClassification, classify, classify_status};
pub use kind::FailureKind;

use thiserror::Error;

/// Externally visible error: the coarse classification plus a message that is
/// safe to return to the caller.
///
/// Construct it from a [`FailureKind`]; the conversion applies the
/// classification table and substitutes the redacted message for every
/// unauthorized-class failure.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    classification: Classification,
    message: String,
}

impl ClassifiedError {
    #[must_use]
    pub fn classification(&self) -> Classification {
        self.classification
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<FailureKind> for ClassifiedError {
    fn from(kind: FailureKind) -> Self {
        let classification = classify(&kind);
        let message = match classification {
            // Identity details are never revealed to the caller.
            Classification::Unauthorized { .. } => "authentication failed".to_owned(),
            _ => kind.to_string(),
        };
        Self {
            classification,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_class_errors_redact_the_failure_detail() {
        let err = ClassifiedError::from(FailureKind::AccountNotDefined {
            account: "acme".to_owned(),
        });
        assert!(matches!(
            err.classification(),
            Classification::Unauthorized { retriable: false }
        ));
        assert_eq!(err.message(), "authentication failed");
        assert!(!err.to_string().contains("acme"));
    }

    #[test]
    fn non_unauthorized_errors_keep_their_message() {
        let err = ClassifiedError::from(FailureKind::MissingRequestParam {
            param: "credentials".to_owned(),
        });
        assert_eq!(err.classification(), Classification::BadRequest);
        assert!(err.message().contains("credentials"));
    }
}
