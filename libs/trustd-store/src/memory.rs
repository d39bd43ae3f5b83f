//! In-memory reference store.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::{
    CommitResult, Credential, Mutation, PolicyStore, Resource, ResourceId, ResourceKind, RoleId,
    StoreError,
};

#[derive(Default)]
struct Inner {
    accounts: HashSet<String>,
    /// role -> owner
    roles: HashMap<RoleId, RoleId>,
    resources: HashMap<ResourceId, Resource>,
    /// (role, member): member belongs to role
    grants: HashSet<(RoleId, RoleId)>,
    permissions: HashSet<(ResourceId, String, RoleId)>,
    credentials: HashMap<RoleId, Credential>,
    passwords: HashMap<RoleId, [u8; 32]>,
    /// (account, branch) -> version
    versions: HashMap<(String, String), u64>,
}

impl Inner {
    /// Transitive closure of roles this role is a member of, including
    /// itself.
    fn memberships(&self, role: &RoleId) -> HashSet<RoleId> {
        let mut closure: HashSet<RoleId> = HashSet::from([role.clone()]);
        loop {
            let next: Vec<RoleId> = self
                .grants
                .iter()
                .filter(|(_, member)| closure.contains(member))
                .map(|(r, _)| r.clone())
                .filter(|r| !closure.contains(r))
                .collect();
            if next.is_empty() {
                return closure;
            }
            closure.extend(next);
        }
    }

    fn apply(&mut self, mutation: &Mutation, asserted_actors: &mut Vec<RoleId>) {
        match mutation {
            Mutation::CreateRole { role, owner } => {
                self.roles.insert(role.clone(), owner.clone());
                if role.kind.is_actor() && !asserted_actors.contains(role) {
                    asserted_actors.push(role.clone());
                }
            }
            Mutation::DeleteRole { role, .. } => {
                self.roles.remove(role);
                self.credentials.remove(role);
                self.passwords.remove(role);
                self.grants
                    .retain(|(r, member)| r != role && member != role);
                self.permissions.retain(|(_, _, r)| r != role);
            }
            Mutation::CreateResource { resource } => {
                self.resources.insert(resource.id.clone(), resource.clone());
            }
            Mutation::DeleteResource { resource, .. } => {
                self.resources.remove(resource);
                self.permissions.retain(|(res, _, _)| res != resource);
            }
            Mutation::AddGrant { role, member } => {
                self.grants.insert((role.clone(), member.clone()));
            }
            Mutation::RemoveGrant { role, member, .. } => {
                self.grants.remove(&(role.clone(), member.clone()));
            }
            Mutation::AddPermission {
                resource,
                privilege,
                role,
            } => {
                self.permissions
                    .insert((resource.clone(), privilege.clone(), role.clone()));
            }
            Mutation::RemovePermission {
                resource,
                privilege,
                role,
                ..
            } => {
                self.permissions
                    .remove(&(resource.clone(), privilege.clone(), role.clone()));
            }
            Mutation::SetAnnotation {
                resource,
                name,
                value,
            } => {
                if let Some(res) = self.resources.get_mut(resource) {
                    res.annotations.insert(name.clone(), value.clone());
                }
            }
            Mutation::RemoveAnnotation { resource, name, .. } => {
                if let Some(res) = self.resources.get_mut(resource) {
                    res.annotations.remove(name);
                }
            }
        }
    }
}

/// In-process store holding the whole graph behind one `RwLock`.
///
/// Commits take the write lock for the duration of the version check and
/// mutation application, which makes the optimistic guard and credential
/// provisioning trivially transactional.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account namespace.
    pub fn add_account(&self, account: &str) {
        self.inner.write().accounts.insert(account.to_owned());
    }

    /// Seed a role without going through a policy commit.
    pub fn add_role(&self, role: RoleId, owner: RoleId) {
        self.inner.write().roles.insert(role, owner);
    }

    /// Seed a resource without going through a policy commit.
    pub fn add_resource(&self, resource: Resource) {
        self.inner
            .write()
            .resources
            .insert(resource.id.clone(), resource);
    }

    /// Seed a membership edge: `member` belongs to `role`.
    pub fn add_grant(&self, role: RoleId, member: RoleId) {
        self.inner.write().grants.insert((role, member));
    }

    /// Seed a permission grant.
    pub fn add_permission(&self, resource: ResourceId, privilege: &str, role: RoleId) {
        self.inner
            .write()
            .permissions
            .insert((resource, privilege.to_owned(), role));
    }

    /// Set a basic-auth password for a role. Only the SHA-256 digest is
    /// retained.
    pub fn set_password(&self, role: RoleId, password: &str) {
        let digest: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        self.inner.write().passwords.insert(role, digest);
    }

    /// Look up or create the credential of an actor role.
    pub fn provision_credential(&self, role: &RoleId) -> Credential {
        let mut inner = self.inner.write();
        inner
            .credentials
            .entry(role.clone())
            .or_insert_with(|| Credential::new(role.clone()))
            .clone()
    }
}

#[async_trait]
impl PolicyStore for MemoryStore {
    async fn account_exists(&self, account: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().accounts.contains(account))
    }

    async fn role_exists(&self, role: &RoleId) -> Result<bool, StoreError> {
        Ok(self.inner.read().roles.contains_key(role))
    }

    async fn resource(&self, id: &ResourceId) -> Result<Option<Resource>, StoreError> {
        Ok(self.inner.read().resources.get(id).cloned())
    }

    async fn resources_of_kind(
        &self,
        account: &str,
        kind: ResourceKind,
    ) -> Result<Vec<Resource>, StoreError> {
        let inner = self.inner.read();
        let mut found: Vec<Resource> = inner
            .resources
            .values()
            .filter(|r| r.id.account == account && r.id.kind == kind)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.id.identifier.cmp(&b.id.identifier));
        Ok(found)
    }

    async fn is_permitted(
        &self,
        role: &RoleId,
        privilege: &str,
        resource: &ResourceId,
    ) -> Result<bool, StoreError> {
        let inner = self.inner.read();
        let closure = inner.memberships(role);
        if let Some(res) = inner.resources.get(resource) {
            if closure.contains(&res.owner) {
                return Ok(true);
            }
        }
        Ok(closure.iter().any(|r| {
            inner
                .permissions
                .contains(&(resource.clone(), privilege.to_owned(), r.clone()))
        }))
    }

    async fn current_version(&self, account: &str, branch: &str) -> Result<u64, StoreError> {
        Ok(self
            .inner
            .read()
            .versions
            .get(&(account.to_owned(), branch.to_owned()))
            .copied()
            .unwrap_or(0))
    }

    async fn commit(
        &self,
        account: &str,
        branch: &str,
        expected_version: u64,
        mutations: &[Mutation],
    ) -> Result<CommitResult, StoreError> {
        let mut inner = self.inner.write();
        let key = (account.to_owned(), branch.to_owned());
        let actual = inner.versions.get(&key).copied().unwrap_or(0);
        if actual != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual,
            });
        }

        let mut asserted_actors = Vec::new();
        for mutation in mutations {
            inner.apply(mutation, &mut asserted_actors);
        }

        // Lookup-or-create credentials for every actor role asserted by this
        // commit, under the same lock as the graph change.
        let provisioned = asserted_actors
            .into_iter()
            .map(|role| {
                inner
                    .credentials
                    .entry(role.clone())
                    .or_insert_with(|| Credential::new(role))
                    .clone()
            })
            .collect();

        let version = actual + 1;
        inner.versions.insert(key, version);
        Ok(CommitResult {
            version,
            provisioned,
        })
    }

    async fn credential(&self, role: &RoleId) -> Result<Option<Credential>, StoreError> {
        Ok(self.inner.read().credentials.get(role).cloned())
    }

    async fn verify_password(&self, role: &RoleId, password: &str) -> Result<bool, StoreError> {
        let digest: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        Ok(self
            .inner
            .read()
            .passwords
            .get(role)
            .is_some_and(|stored| stored == &digest))
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;
    use crate::RoleKind;

    fn root(account: &str) -> RoleId {
        RoleId::new(account, RoleKind::Policy, "root")
    }

    #[tokio::test]
    async fn commit_bumps_the_version_and_rejects_stale_bases() {
        let store = MemoryStore::new();
        store.add_account("acme");

        let alice = RoleId::user("acme", "alice");
        let mutations = vec![Mutation::CreateRole {
            role: alice.clone(),
            owner: root("acme"),
        }];

        let result = store.commit("acme", "root", 0, &mutations).await.unwrap();
        assert_eq!(result.version, 1);

        // A second commit against the already-consumed base version loses.
        let err = store
            .commit("acme", "root", 0, &mutations)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::VersionConflict {
                expected: 0,
                actual: 1
            }
        );
        assert_eq!(store.current_version("acme", "root").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn provisioning_is_idempotent_across_commits() {
        let store = MemoryStore::new();
        store.add_account("acme");

        let host = RoleId::host("acme", "backend");
        let mutations = vec![Mutation::CreateRole {
            role: host.clone(),
            owner: root("acme"),
        }];

        let first = store.commit("acme", "root", 0, &mutations).await.unwrap();
        let second = store.commit("acme", "root", 1, &mutations).await.unwrap();

        assert_eq!(first.provisioned.len(), 1);
        assert_eq!(second.provisioned.len(), 1);
        assert_eq!(
            first.provisioned[0].api_key.expose_secret(),
            second.provisioned[0].api_key.expose_secret(),
            "re-asserting a role must not rotate its credential"
        );
    }

    #[tokio::test]
    async fn structural_roles_get_no_credentials() {
        let store = MemoryStore::new();
        store.add_account("acme");

        let group = RoleId::new("acme", RoleKind::Group, "ops");
        let mutations = vec![Mutation::CreateRole {
            role: group.clone(),
            owner: root("acme"),
        }];
        let result = store.commit("acme", "root", 0, &mutations).await.unwrap();
        assert!(result.provisioned.is_empty());
        assert!(store.credential(&group).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn permissions_flow_through_transitive_memberships() {
        let store = MemoryStore::new();
        store.add_account("acme");

        let alice = RoleId::user("acme", "alice");
        let ops = RoleId::new("acme", RoleKind::Group, "ops");
        let admins = RoleId::new("acme", RoleKind::Group, "admins");
        let ws = ResourceId::webservice("acme", "authn-oidc/prod");

        store.add_role(alice.clone(), root("acme"));
        store.add_role(ops.clone(), root("acme"));
        store.add_role(admins.clone(), root("acme"));
        store.add_resource(Resource::new(ws.clone(), root("acme")));

        // alice -> ops -> admins, permission granted to admins.
        store.add_grant(ops.clone(), alice.clone());
        store.add_grant(admins.clone(), ops.clone());
        store.add_permission(ws.clone(), "authenticate", admins.clone());

        assert!(store
            .is_permitted(&alice, "authenticate", &ws)
            .await
            .unwrap());
        assert!(!store.is_permitted(&alice, "update", &ws).await.unwrap());
    }

    #[tokio::test]
    async fn resource_owner_holds_every_privilege() {
        let store = MemoryStore::new();
        store.add_account("acme");

        let admin = RoleId::user("acme", "admin");
        let ws = ResourceId::webservice("acme", "authn-jwt/ci");
        store.add_role(admin.clone(), root("acme"));
        store.add_resource(Resource::new(ws.clone(), admin.clone()));

        assert!(store.is_permitted(&admin, "update", &ws).await.unwrap());
    }

    #[tokio::test]
    async fn password_verification_uses_the_stored_digest() {
        let store = MemoryStore::new();
        let alice = RoleId::user("acme", "alice");
        store.set_password(alice.clone(), "s3cret");

        assert!(store.verify_password(&alice, "s3cret").await.unwrap());
        assert!(!store.verify_password(&alice, "wrong").await.unwrap());
        let bob = RoleId::user("acme", "bob");
        assert!(!store.verify_password(&bob, "s3cret").await.unwrap());
    }
}
