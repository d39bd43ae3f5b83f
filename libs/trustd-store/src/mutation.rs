//! Atomic changes to the role/resource/grant graph.

use crate::{Resource, ResourceId, RoleId};

/// One atomic change to the graph.
///
/// A policy submission expands into an ordered sequence of mutations; the
/// commit is all-or-nothing. Removals carry an `explicit` flag: patch-mode
/// submissions may only remove entities the document names explicitly,
/// never as an implicit side effect of the diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateRole {
        role: RoleId,
        owner: RoleId,
    },
    DeleteRole {
        role: RoleId,
        explicit: bool,
    },
    CreateResource {
        resource: Resource,
    },
    DeleteResource {
        resource: ResourceId,
        explicit: bool,
    },
    AddGrant {
        role: RoleId,
        member: RoleId,
    },
    RemoveGrant {
        role: RoleId,
        member: RoleId,
        explicit: bool,
    },
    AddPermission {
        resource: ResourceId,
        privilege: String,
        role: RoleId,
    },
    RemovePermission {
        resource: ResourceId,
        privilege: String,
        role: RoleId,
        explicit: bool,
    },
    SetAnnotation {
        resource: ResourceId,
        name: String,
        value: String,
    },
    RemoveAnnotation {
        resource: ResourceId,
        name: String,
        explicit: bool,
    },
}

impl Mutation {
    /// The entity this mutation acts on, for audit records.
    #[must_use]
    pub fn subject(&self) -> String {
        match self {
            Self::CreateRole { role, .. } | Self::DeleteRole { role, .. } => role.to_string(),
            Self::CreateResource { resource } => resource.id.to_string(),
            Self::DeleteResource { resource, .. } => resource.to_string(),
            Self::AddGrant { role, member } | Self::RemoveGrant { role, member, .. } => {
                format!("{role} <- {member}")
            }
            Self::AddPermission {
                resource,
                privilege,
                role,
            }
            | Self::RemovePermission {
                resource,
                privilege,
                role,
                ..
            } => format!("{resource}!{privilege} -> {role}"),
            Self::SetAnnotation { resource, name, .. }
            | Self::RemoveAnnotation { resource, name, .. } => format!("{resource}@{name}"),
        }
    }

    /// Whether this mutation removes something from the graph.
    #[must_use]
    pub fn is_removal(&self) -> bool {
        matches!(
            self,
            Self::DeleteRole { .. }
                | Self::DeleteResource { .. }
                | Self::RemoveGrant { .. }
                | Self::RemovePermission { .. }
                | Self::RemoveAnnotation { .. }
        )
    }

    /// Whether a removal was explicitly named by the submitted document.
    #[must_use]
    pub fn is_explicit_removal(&self) -> bool {
        match self {
            Self::DeleteRole { explicit, .. }
            | Self::DeleteResource { explicit, .. }
            | Self::RemoveGrant { explicit, .. }
            | Self::RemovePermission { explicit, .. }
            | Self::RemoveAnnotation { explicit, .. } => *explicit,
            _ => false,
        }
    }

    /// Whether this mutation touches a webservice resource. Commits that do
    /// must invalidate the configured-authenticator cache.
    #[must_use]
    pub fn touches_webservice(&self) -> bool {
        use crate::ResourceKind;
        let id = match self {
            Self::CreateResource { resource } => &resource.id,
            Self::DeleteResource { resource, .. } => resource,
            Self::AddPermission { resource, .. }
            | Self::RemovePermission { resource, .. }
            | Self::SetAnnotation { resource, .. }
            | Self::RemoveAnnotation { resource, .. } => resource,
            Self::CreateRole { .. }
            | Self::DeleteRole { .. }
            | Self::AddGrant { .. }
            | Self::RemoveGrant { .. } => return false,
        };
        id.kind == ResourceKind::Webservice
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceKind;

    #[test]
    fn removal_flags_are_reported() {
        let m = Mutation::DeleteRole {
            role: RoleId::user("acme", "alice"),
            explicit: true,
        };
        assert!(m.is_removal());
        assert!(m.is_explicit_removal());

        let m = Mutation::RemoveGrant {
            role: RoleId::new("acme", crate::RoleKind::Group, "ops"),
            member: RoleId::user("acme", "alice"),
            explicit: false,
        };
        assert!(m.is_removal());
        assert!(!m.is_explicit_removal());

        let m = Mutation::CreateRole {
            role: RoleId::user("acme", "alice"),
            owner: RoleId::new("acme", crate::RoleKind::Policy, "root"),
        };
        assert!(!m.is_removal());
    }

    #[test]
    fn webservice_touch_detection() {
        let ws = ResourceId::webservice("acme", "authn-oidc/prod");
        let var = ResourceId::new("acme", ResourceKind::Variable, "db/password");

        let m = Mutation::SetAnnotation {
            resource: ws,
            name: "authn/enabled".to_owned(),
            value: "true".to_owned(),
        };
        assert!(m.touches_webservice());

        let m = Mutation::SetAnnotation {
            resource: var,
            name: "owner".to_owned(),
            value: "ops".to_owned(),
        };
        assert!(!m.touches_webservice());
    }
}
