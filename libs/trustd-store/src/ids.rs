//! Fully qualified role and resource identifiers.
//!
//! Both take the `account:kind:identifier` shape. The account is the
//! top-level tenant namespace; the identifier may itself contain `/`
//! segments (e.g. `authn-oidc/prod`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed identifier '{input}': expected account:kind:identifier")]
pub struct ParseIdError {
    input: String,
}

/// What kind of principal a role is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    User,
    Host,
    Group,
    Policy,
    Layer,
}

impl RoleKind {
    /// Actor roles can authenticate; structural roles cannot.
    #[must_use]
    pub fn is_actor(self) -> bool {
        matches!(self, Self::User | Self::Host)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Host => "host",
            Self::Group => "group",
            Self::Policy => "policy",
            Self::Layer => "layer",
        }
    }
}

impl FromStr for RoleKind {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "host" => Ok(Self::Host),
            "group" => Ok(Self::Group),
            "policy" => Ok(Self::Policy),
            "layer" => Ok(Self::Layer),
            other => Err(ParseIdError {
                input: other.to_owned(),
            }),
        }
    }
}

/// Fully qualified role identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId {
    pub account: String,
    pub kind: RoleKind,
    pub identifier: String,
}

impl RoleId {
    #[must_use]
    pub fn new(account: &str, kind: RoleKind, identifier: &str) -> Self {
        Self {
            account: account.to_owned(),
            kind,
            identifier: identifier.to_owned(),
        }
    }

    #[must_use]
    pub fn user(account: &str, name: &str) -> Self {
        Self::new(account, RoleKind::User, name)
    }

    #[must_use]
    pub fn host(account: &str, name: &str) -> Self {
        Self::new(account, RoleKind::Host, name)
    }

    /// The login username for an actor role: `alice` for users,
    /// `host/backend` for hosts.
    #[must_use]
    pub fn username(&self) -> String {
        match self.kind {
            RoleKind::User => self.identifier.clone(),
            _ => format!("{}/{}", self.kind.as_str(), self.identifier),
        }
    }

    /// Resolve a login username back to a role id within `account`.
    #[must_use]
    pub fn from_username(account: &str, username: &str) -> Self {
        match username.strip_prefix("host/") {
            Some(rest) => Self::host(account, rest),
            None => Self::user(account, username),
        }
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.account, self.kind.as_str(), self.identifier)
    }
}

impl FromStr for RoleId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(account), Some(kind), Some(identifier)) if !account.is_empty() => Ok(Self {
                account: account.to_owned(),
                kind: kind.parse()?,
                identifier: identifier.to_owned(),
            }),
            _ => Err(ParseIdError {
                input: s.to_owned(),
            }),
        }
    }
}

/// What kind of protected thing a resource is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A configured authenticator instance (`authn-<type>/<service-id>`).
    Webservice,
    Variable,
    Policy,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Webservice => "webservice",
            Self::Variable => "variable",
            Self::Policy => "policy",
        }
    }
}

/// Fully qualified resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub account: String,
    pub kind: ResourceKind,
    pub identifier: String,
}

impl ResourceId {
    #[must_use]
    pub fn new(account: &str, kind: ResourceKind, identifier: &str) -> Self {
        Self {
            account: account.to_owned(),
            kind,
            identifier: identifier.to_owned(),
        }
    }

    #[must_use]
    pub fn webservice(account: &str, identifier: &str) -> Self {
        Self::new(account, ResourceKind::Webservice, identifier)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.account, self.kind.as_str(), self.identifier)
    }
}
