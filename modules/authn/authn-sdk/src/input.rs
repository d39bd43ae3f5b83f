//! The per-request value object handed to the dispatcher.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use secrecy::SecretString;

use trustd_errors::FailureKind;

use crate::AuthenticatorType;

type CredentialSource = Box<dyn FnOnce() -> Result<SecretString, FailureKind> + Send>;

enum State {
    /// No credential was supplied with the request.
    Absent,
    /// The body has not been read yet.
    Pending(CredentialSource),
    /// Materialized once; repeated reads return the same value.
    Ready(SecretString),
    /// The source failed; repeated reads return the same error.
    Failed(FailureKind),
}

/// Deferred credential body.
///
/// Credentials are never read from the transport until all cheaper checks
/// (installed/configured/enabled/authorized) pass, so a request destined to
/// fail early never consumes a potentially large body (certificate chains,
/// JWTs). [`LazyCredentials::was_read`] lets tests assert exactly that.
pub struct LazyCredentials {
    state: Mutex<State>,
    read: AtomicBool,
}

impl LazyCredentials {
    /// No credential accompanies the request (status probes, cert
    /// injection bootstrap).
    #[must_use]
    pub fn absent() -> Self {
        Self {
            state: Mutex::new(State::Absent),
            read: AtomicBool::new(false),
        }
    }

    /// A credential already held in memory. It still counts as unread until
    /// the dispatcher materializes it.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        let secret: SecretString = text.into().into();
        Self::from_source(Box::new(move || Ok(secret)))
    }

    /// A credential produced on demand, typically by draining the transport
    /// body. The source runs at most once.
    #[must_use]
    pub fn from_fn<F>(source: F) -> Self
    where
        F: FnOnce() -> Result<SecretString, FailureKind> + Send + 'static,
    {
        Self::from_source(Box::new(source))
    }

    fn from_source(source: CredentialSource) -> Self {
        Self {
            state: Mutex::new(State::Pending(source)),
            read: AtomicBool::new(false),
        }
    }

    /// Read the credential, draining the source on first call.
    ///
    /// # Errors
    ///
    /// [`FailureKind::MissingRequestParam`] when no credential was supplied;
    /// whatever the source reports when draining the body fails, repeated
    /// on every later call.
    pub fn materialize(&self) -> Result<SecretString, FailureKind> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, State::Absent) {
            State::Absent => Err(FailureKind::MissingRequestParam {
                param: "credentials".to_owned(),
            }),
            State::Pending(source) => {
                self.read.store(true, Ordering::Release);
                match source() {
                    Ok(secret) => {
                        *state = State::Ready(secret.clone());
                        Ok(secret)
                    }
                    Err(kind) => {
                        *state = State::Failed(kind.clone());
                        Err(kind)
                    }
                }
            }
            State::Ready(secret) => {
                *state = State::Ready(secret.clone());
                Ok(secret)
            }
            State::Failed(kind) => {
                *state = State::Failed(kind.clone());
                Err(kind)
            }
        }
    }

    /// Whether the credential source has been drained.
    #[must_use]
    pub fn was_read(&self) -> bool {
        self.read.load(Ordering::Acquire)
    }
}

impl fmt::Debug for LazyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match &*self.state.lock() {
            State::Absent => "Absent",
            State::Pending(_) => "Pending",
            State::Ready(_) => "Ready(<redacted>)",
            State::Failed(_) => "Failed",
        };
        f.debug_tuple("LazyCredentials").field(&tag).finish()
    }
}

/// Protocol-agnostic, immutable per-request input.
#[derive(Debug)]
pub struct AuthenticatorInput {
    pub authenticator: AuthenticatorType,
    pub service_id: Option<String>,
    pub account: String,
    /// The target role's login name, when the request names one
    /// (`alice`, `host/backend`). Token-bearing protocols derive it from
    /// the credential instead.
    pub username: Option<String>,
    pub credentials: LazyCredentials,
    pub client_ip: String,
}

impl AuthenticatorInput {
    /// The webservice identifier this request resolves against.
    #[must_use]
    pub fn webservice_identifier(&self) -> String {
        self.authenticator
            .webservice_identifier(self.service_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn pending_credentials_are_unread_until_materialized() {
        let creds = LazyCredentials::from_text("a-jwt");
        assert!(!creds.was_read());

        let secret = creds.materialize().unwrap();
        assert_eq!(secret.expose_secret(), "a-jwt");
        assert!(creds.was_read());
    }

    #[test]
    fn materialize_is_memoized() {
        let creds = LazyCredentials::from_fn(|| Ok("once".to_owned().into()));
        let first = creds.materialize().unwrap();
        let second = creds.materialize().unwrap();
        assert_eq!(first.expose_secret(), second.expose_secret());
    }

    #[test]
    fn absent_credentials_fail_as_missing_param() {
        let creds = LazyCredentials::absent();
        let err = creds.materialize().unwrap_err();
        assert!(matches!(err, FailureKind::MissingRequestParam { .. }));
        assert!(!creds.was_read());
    }

    #[test]
    fn source_failures_repeat_on_every_read() {
        let creds = LazyCredentials::from_fn(|| {
            Err(FailureKind::TokenInvalid {
                reason: "truncated body".to_owned(),
            })
        });
        let first = creds.materialize().unwrap_err();
        assert!(matches!(first, FailureKind::TokenInvalid { .. }));
        assert!(creds.was_read());

        // The original failure is sticky; it does not degrade into a
        // missing-credential error on re-read.
        let second = creds.materialize().unwrap_err();
        assert!(matches!(
            second,
            FailureKind::TokenInvalid { ref reason } if reason == "truncated body"
        ));
    }

    #[test]
    fn debug_never_prints_the_credential() {
        let creds = LazyCredentials::from_text("super-secret");
        let _ = creds.materialize();
        assert!(!format!("{creds:?}").contains("super-secret"));
    }
}
