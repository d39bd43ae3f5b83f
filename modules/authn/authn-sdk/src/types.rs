//! Authenticator protocol identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown authenticator type '{0}'")]
pub struct UnknownAuthenticatorType(pub String);

/// The installed authentication protocols.
///
/// `ApiKey` is the built-in `authn` method: it needs no webservice resource
/// and cannot be disabled. Every other type must be configured in policy and
/// enabled before the dispatcher will route to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorType {
    ApiKey,
    Jwt,
    Oidc,
    Gcp,
    K8s,
}

impl AuthenticatorType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "authn",
            Self::Jwt => "authn-jwt",
            Self::Oidc => "authn-oidc",
            Self::Gcp => "authn-gcp",
            Self::K8s => "authn-k8s",
        }
    }

    /// Whether instances of this type require a policy-declared webservice.
    #[must_use]
    pub fn requires_webservice(self) -> bool {
        !matches!(self, Self::ApiKey)
    }

    /// The webservice identifier for one configured instance, e.g.
    /// `authn-oidc/prod`.
    #[must_use]
    pub fn webservice_identifier(self, service_id: Option<&str>) -> String {
        match service_id {
            Some(sid) => format!("{}/{}", self.as_str(), sid),
            None => self.as_str().to_owned(),
        }
    }
}

impl fmt::Display for AuthenticatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthenticatorType {
    type Err = UnknownAuthenticatorType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authn" => Ok(Self::ApiKey),
            "authn-jwt" => Ok(Self::Jwt),
            "authn-oidc" => Ok(Self::Oidc),
            "authn-gcp" => Ok(Self::Gcp),
            "authn-k8s" => Ok(Self::K8s),
            other => Err(UnknownAuthenticatorType(other.to_owned())),
        }
    }
}
