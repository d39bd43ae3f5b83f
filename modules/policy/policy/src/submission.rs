//! Policy submission value objects.

use trustd_audit::Operation;
use trustd_store::RoleId;

/// How a submitted document is applied to the current graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Only additions: fails entirely if any mutation would modify a
    /// pre-existing entity.
    Create,
    /// Full replacement of the branch: any add or remove is permitted.
    Replace,
    /// Incremental update: adds always, removes only when the document
    /// names them explicitly.
    Patch,
}

impl LoadMode {
    /// Whether this mode may delete entities at all.
    #[must_use]
    pub fn delete_permitted(self) -> bool {
        match self {
            Self::Create => false,
            Self::Replace | Self::Patch => true,
        }
    }

    /// The privilege the submitting role must hold on the branch policy.
    #[must_use]
    pub fn required_privilege(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Replace | Self::Patch => "update",
        }
    }

    #[must_use]
    pub fn operation(self) -> Operation {
        match self {
            Self::Create => Operation::PolicyCreate,
            Self::Replace => Operation::PolicyReplace,
            Self::Patch => Operation::PolicyPatch,
        }
    }
}

/// One submitted policy document, already parsed by the external parser.
///
/// `raw_text` is kept only for audit/diagnostic purposes; the engine never
/// interprets it. The mutation sequence the parser derived from it is passed
/// to [`crate::PolicyMutationEngine::submit`] alongside this value.
#[derive(Debug, Clone)]
pub struct PolicySubmission {
    pub account: String,
    /// Policy branch the document loads into (`root` unless scoped).
    pub branch: String,
    pub submitting_role: RoleId,
    pub raw_text: String,
    pub mode: LoadMode,
    pub client_ip: String,
    /// Version of the branch the mutation set was computed against.
    pub expected_base_version: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_permission_follows_the_mode() {
        assert!(!LoadMode::Create.delete_permitted());
        assert!(LoadMode::Replace.delete_permitted());
        assert!(LoadMode::Patch.delete_permitted());
    }

    #[test]
    fn create_requires_create_privilege_and_the_rest_update() {
        assert_eq!(LoadMode::Create.required_privilege(), "create");
        assert_eq!(LoadMode::Replace.required_privilege(), "update");
        assert_eq!(LoadMode::Patch.required_privilege(), "update");
    }
}
