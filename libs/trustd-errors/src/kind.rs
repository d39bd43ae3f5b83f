//! The closed set of internal failure kinds.

use thiserror::Error;

/// Every way either engine can fail, as one closed enumeration.
///
/// Strategy-level failures bubble up unmodified as one of these kinds; the
/// dispatcher and the policy engine never invent ad-hoc error strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FailureKind {
    // Configuration: the authenticator is not installed/configured/enabled.
    #[error("authenticator '{authenticator}' is not supported")]
    AuthenticatorNotSupported { authenticator: String },

    #[error("webservice '{webservice}' not found")]
    WebserviceNotFound { webservice: String },

    #[error("authenticator '{authenticator}' is not enabled")]
    AuthenticatorNotWhitelisted { authenticator: String },

    #[error("account '{account}' is not defined")]
    AccountNotDefined { account: String },

    // Identity: the principal or its authorization is missing.
    #[error("role '{role}' not found")]
    RoleNotFound { role: String },

    #[error("role '{role}' does not have '{privilege}' privilege on '{resource}'")]
    RoleNotAuthorizedOnResource {
        role: String,
        privilege: String,
        resource: String,
    },

    // Credential: the presented credential is invalid.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token expired")]
    TokenExpired,

    #[error("token invalid: {reason}")]
    TokenInvalid { reason: String },

    // Protocol: the request itself is malformed.
    #[error("missing request parameter '{param}'")]
    MissingRequestParam { param: String },

    #[error("CSR is missing the required '{field}' field")]
    CsrMissingRequiredField { field: String },

    #[error("certificate is missing the required '{field}' field")]
    CertMissingRequiredField { field: String },

    #[error("status is not supported by authenticator '{authenticator}'")]
    StatusNotSupported { authenticator: String },

    // Concurrency.
    #[error("concurrent policy load in progress, retry after {retry_after_secs}s")]
    PolicyConflict { retry_after_secs: u64 },

    #[error("'{subject}' already exists; create-mode submissions may not modify existing entities")]
    EntityAlreadyExists { subject: String },

    #[error("deletion of '{subject}' is not permitted by this submission mode")]
    DeletionNotPermitted { subject: String },

    #[error("implicit deletion of '{subject}' is forbidden in patch mode")]
    ImplicitDeletionForbidden { subject: String },

    #[error("concurrency limit reached")]
    ConcurrencyLimitReached,

    #[error("credential validation timed out")]
    ValidationTimeout,

    // Fatal.
    #[error("token signing key is unavailable")]
    SigningKeyUnavailable,

    #[error("store unavailable: {reason}")]
    StoreUnavailable { reason: String },
}
