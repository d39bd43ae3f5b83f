//! The classification table shared by both engines.

use serde::{Deserialize, Serialize};

use crate::FailureKind;

/// Coarse, externally visible outcome of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Forbidden,
    BadRequest,
    /// `retriable` is a hint that a refreshed credential may succeed
    /// (set only for expired tokens).
    Unauthorized { retriable: bool },
    ServiceUnavailable,
    InvalidArgument,
    /// Carries the randomized retry-after hint drawn by the policy engine.
    Conflict { retry_after_secs: u64 },
}

/// Map an internal failure kind to its external classification.
///
/// The unauthorized default is intentionally coarse: an unknown account, a
/// missing role, and a disabled authenticator are indistinguishable to the
/// caller, which prevents account and identity enumeration.
#[must_use]
pub fn classify(kind: &FailureKind) -> Classification {
    match kind {
        FailureKind::RoleNotAuthorizedOnResource { .. } => Classification::Forbidden,

        FailureKind::MissingRequestParam { .. }
        | FailureKind::EntityAlreadyExists { .. }
        | FailureKind::DeletionNotPermitted { .. }
        | FailureKind::ImplicitDeletionForbidden { .. } => Classification::BadRequest,

        FailureKind::TokenExpired => Classification::Unauthorized { retriable: true },

        FailureKind::ConcurrencyLimitReached
        | FailureKind::SigningKeyUnavailable
        | FailureKind::StoreUnavailable { .. } => Classification::ServiceUnavailable,

        FailureKind::CsrMissingRequiredField { .. }
        | FailureKind::CertMissingRequiredField { .. } => Classification::InvalidArgument,

        // Conflict is reserved for commit races; every conflict carries a
        // drawn retry-after.
        FailureKind::PolicyConflict { retry_after_secs } => Classification::Conflict {
            retry_after_secs: *retry_after_secs,
        },

        // Everything else fails closed, including kinds with apparently
        // clearer semantics (unknown account, unknown role, disabled
        // authenticator): identity details are never revealed.
        _ => Classification::Unauthorized { retriable: false },
    }
}

/// Classification used only by the side-effect-free `status` probe, which is
/// an operator-facing surface and may be more specific than the
/// authentication path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClassification {
    Forbidden,
    NotImplemented,
    NotFound,
    InternalError,
}

/// Map a failure kind to the status-probe classification.
#[must_use]
pub fn classify_status(kind: &FailureKind) -> StatusClassification {
    match kind {
        FailureKind::RoleNotAuthorizedOnResource { .. } => StatusClassification::Forbidden,
        FailureKind::StatusNotSupported { .. } => StatusClassification::NotImplemented,
        FailureKind::AuthenticatorNotSupported { .. } => StatusClassification::NotFound,
        _ => StatusClassification::InternalError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_only_for_missing_resource_privilege() {
        let kind = FailureKind::RoleNotAuthorizedOnResource {
            role: "acme:user:alice".to_owned(),
            privilege: "authenticate".to_owned(),
            resource: "acme:webservice:authn-oidc/prod".to_owned(),
        };
        assert_eq!(classify(&kind), Classification::Forbidden);
    }

    #[test]
    fn expired_token_sets_the_retriable_hint() {
        assert_eq!(
            classify(&FailureKind::TokenExpired),
            Classification::Unauthorized { retriable: true }
        );
    }

    #[test]
    fn configuration_and_identity_kinds_collapse_to_unauthorized() {
        let kinds = [
            FailureKind::AuthenticatorNotSupported {
                authenticator: "authn-oidc".to_owned(),
            },
            FailureKind::WebserviceNotFound {
                webservice: "authn-oidc/prod".to_owned(),
            },
            FailureKind::AccountNotDefined {
                account: "acme".to_owned(),
            },
            FailureKind::RoleNotFound {
                role: "acme:user:alice".to_owned(),
            },
            FailureKind::AuthenticatorNotWhitelisted {
                authenticator: "authn-oidc/prod".to_owned(),
            },
            FailureKind::InvalidCredentials,
        ];
        for kind in kinds {
            assert_eq!(
                classify(&kind),
                Classification::Unauthorized { retriable: false },
                "{kind:?}"
            );
        }
    }

    #[test]
    fn fatal_kinds_surface_as_service_unavailable() {
        assert_eq!(
            classify(&FailureKind::SigningKeyUnavailable),
            Classification::ServiceUnavailable
        );
        assert_eq!(
            classify(&FailureKind::StoreUnavailable {
                reason: "connection refused".to_owned()
            }),
            Classification::ServiceUnavailable
        );
    }

    #[test]
    fn create_mode_collisions_are_bad_requests_not_conflicts() {
        // The submission itself is malformed for its mode; retrying the
        // identical load cannot succeed, so no retry-after applies.
        assert_eq!(
            classify(&FailureKind::EntityAlreadyExists {
                subject: "acme:host:backend".to_owned()
            }),
            Classification::BadRequest
        );
    }

    #[test]
    fn policy_conflict_carries_the_retry_hint() {
        assert_eq!(
            classify(&FailureKind::PolicyConflict {
                retry_after_secs: 5
            }),
            Classification::Conflict {
                retry_after_secs: 5
            }
        );
    }

    #[test]
    fn status_probe_uses_the_narrower_table() {
        assert_eq!(
            classify_status(&FailureKind::StatusNotSupported {
                authenticator: "authn-gcp".to_owned()
            }),
            StatusClassification::NotImplemented
        );
        assert_eq!(
            classify_status(&FailureKind::AuthenticatorNotSupported {
                authenticator: "authn-zz".to_owned()
            }),
            StatusClassification::NotFound
        );
        assert_eq!(
            classify_status(&FailureKind::InvalidCredentials),
            StatusClassification::InternalError
        );
    }
}
