//! In-memory [`AuthressApi`] for tests and local development.
//!
//! Evaluates permissions from the stored access records using a small role
//! table, which is enough to exercise every flow of the API without a real
//! Authress account.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use accountgate_core::{AccountId, UserId};

use crate::model::{
    AccessRecord, Connection, RecordStatus, ResourceUser, ResourceUsers, RoleRef, Tenant,
    UserIdentity, UserResources,
};
use crate::{AuthressApi, AuthressError, Permission, ResourceRef, Role, VerifiedIdentity};

pub const FAKE_API_URL: &str = "https://auth.example.test";

#[derive(Debug, Default)]
struct FakeState {
    tokens: HashMap<String, VerifiedIdentity>,
    users: HashMap<UserId, UserIdentity>,
    records: BTreeMap<String, AccessRecord>,
    connections: HashMap<String, Connection>,
    tenants: HashMap<String, Tenant>,
    role_permissions: HashMap<Role, Vec<Permission>>,
    verifier_down: bool,
    record_writes_down: bool,
}

#[derive(Debug)]
pub struct InMemoryAuthress {
    api_url: String,
    invalid_access_key: bool,
    state: Mutex<FakeState>,
}

impl Default for InMemoryAuthress {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAuthress {
    pub fn new() -> Self {
        let mut state = FakeState::default();
        let all = vec![Permission::new("*")];
        state.role_permissions.insert(Role::ACCOUNT_OWNER, all.clone());
        state.role_permissions.insert(Role::AUTHRESS_OWNER, all);
        state.role_permissions.insert(
            Role::AUTHRESS_READ_RESOURCE,
            vec![
                Permission::READ,
                Permission::ACCOUNTS_READ,
                Permission::SSO_READ,
                Permission::USERS_READ,
            ],
        );

        Self {
            api_url: FAKE_API_URL.to_string(),
            invalid_access_key: false,
            state: Mutex::new(state),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Behave as if the service client access key could not be parsed.
    pub fn with_invalid_access_key(mut self) -> Self {
        self.invalid_access_key = true;
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn guard(&self) -> Result<MutexGuard<'_, FakeState>, AuthressError> {
        self.check_service_client()?;
        Ok(self.state())
    }

    /// Accept `token` as a valid access token for `user_id`.
    pub fn issue_token(&self, token: &str, user_id: &str, tenant_id: Option<AccountId>) {
        let identity = VerifiedIdentity {
            user_id: UserId::new(user_id),
            issuer: self.api_url.clone(),
            tenant_id,
        };
        self.state().tokens.insert(token.to_string(), identity);
    }

    pub fn add_user(&self, identity: UserIdentity) {
        self.state().users.insert(identity.user_id.clone(), identity);
    }

    /// Fail token verification as an unreachable Authress would.
    pub fn fail_token_verification(&self) {
        self.state().verifier_down = true;
    }

    /// Fail every access record create and update.
    pub fn fail_record_writes(&self) {
        self.state().record_writes_down = true;
    }

    pub fn put_record(&self, record: AccessRecord) {
        self.state().records.insert(record.record_id.clone(), record);
    }

    pub fn record(&self, record_id: &str) -> Option<AccessRecord> {
        self.state().records.get(record_id).cloned()
    }

    pub fn connection(&self, connection_id: &str) -> Option<Connection> {
        self.state().connections.get(connection_id).cloned()
    }

    pub fn tenant(&self, tenant_id: &str) -> Option<Tenant> {
        self.state().tenants.get(tenant_id).cloned()
    }
}

fn unavailable() -> AuthressError {
    AuthressError::Api {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

fn normalize(uri: &str) -> &str {
    let uri = uri.trim_start_matches('/');
    uri.strip_suffix("/*").unwrap_or(uri)
}

/// `granted` covers `uri` itself and everything below it.
fn covers(granted: &str, uri: &str) -> bool {
    let granted = normalize(granted);
    let uri = normalize(uri);
    uri == granted
        || uri
            .strip_prefix(granted)
            .is_some_and(|rest| rest.starts_with('/'))
}

impl FakeState {
    fn grants(&self, role: &Role, permission: &Permission) -> bool {
        self.role_permissions
            .get(role)
            .is_some_and(|ps| ps.iter().any(|p| p.is_wildcard() || p == permission))
    }

    /// Resource uris granted to `user_id` through roles carrying `permission`.
    fn granted_uris<'a>(
        &'a self,
        user_id: &'a UserId,
        permission: &'a Permission,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.active_records_for(user_id)
            .flat_map(|r| r.statements.iter())
            .filter(move |s| s.roles.iter().any(|role| self.grants(role, permission)))
            .flat_map(|s| s.resources.iter().map(|r| r.resource_uri.as_str()))
    }

    fn active_records_for<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> impl Iterator<Item = &'a AccessRecord> + 'a {
        self.records
            .values()
            .filter(|r| r.status != Some(RecordStatus::Deleted))
            .filter(move |r| r.users.iter().any(|u| &u.user_id == user_id))
    }
}

#[async_trait]
impl AuthressApi for InMemoryAuthress {
    fn api_url(&self) -> &str {
        &self.api_url
    }

    fn check_service_client(&self) -> Result<(), AuthressError> {
        if self.invalid_access_key {
            return Err(AuthressError::InvalidAccessKey(
                "expected 4 '.'-separated parts, found 2".to_string(),
            ));
        }
        Ok(())
    }

    async fn verify_token(&self, token: &str) -> Result<VerifiedIdentity, AuthressError> {
        let state = self.state();
        if state.verifier_down {
            return Err(unavailable());
        }
        state
            .tokens
            .get(token)
            .cloned()
            .ok_or_else(|| AuthressError::token("token is not recognised"))
    }

    async fn authorize_user(
        &self,
        user_id: &UserId,
        resource_uri: &str,
        permission: &Permission,
    ) -> Result<(), AuthressError> {
        let state = self.guard()?;
        if state
            .granted_uris(user_id, permission)
            .any(|granted| covers(granted, resource_uri))
        {
            return Ok(());
        }
        Err(AuthressError::Unauthorized {
            user_id: user_id.to_string(),
            resource_uri: resource_uri.to_string(),
            permission: permission.to_string(),
        })
    }

    async fn get_user_resources(
        &self,
        user_id: &UserId,
        resource_uri: &str,
        permission: &Permission,
        limit: u32,
    ) -> Result<UserResources, AuthressError> {
        let state = self.guard()?;
        let parent = normalize(resource_uri);
        let mut access_to_all_sub_resources = false;
        let mut resources: Vec<String> = Vec::new();

        for granted in state.granted_uris(user_id, permission) {
            if covers(granted, parent) {
                access_to_all_sub_resources = true;
            } else if covers(parent, granted) {
                let uri = normalize(granted).to_string();
                if !resources.contains(&uri) {
                    resources.push(uri);
                }
            }
        }
        resources.sort();
        resources.truncate(limit as usize);

        Ok(UserResources {
            resources: resources.into_iter().map(ResourceRef::new).collect(),
            access_to_all_sub_resources,
        })
    }

    async fn get_user(&self, user_id: &UserId) -> Result<UserIdentity, AuthressError> {
        self.guard()?
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| AuthressError::not_found(format!("user '{user_id}'")))
    }

    async fn get_resource_users(&self, resource_uri: &str) -> Result<ResourceUsers, AuthressError> {
        let state = self.guard()?;
        let mut by_user: BTreeMap<UserId, Vec<Role>> = BTreeMap::new();

        for record in state.records.values().filter(|r| !r.is_deleted()) {
            let roles: Vec<&Role> = record
                .statements
                .iter()
                .filter(|s| s.resources.iter().any(|r| covers(&r.resource_uri, resource_uri)))
                .flat_map(|s| s.roles.iter())
                .collect();
            if roles.is_empty() {
                continue;
            }
            for user in &record.users {
                let entry = by_user.entry(user.user_id.clone()).or_default();
                for role in &roles {
                    if !entry.contains(role) {
                        entry.push((*role).clone());
                    }
                }
            }
        }

        Ok(ResourceUsers {
            users: by_user
                .into_iter()
                .map(|(user_id, roles)| ResourceUser {
                    user_id,
                    roles: roles.into_iter().map(|role_id| RoleRef { role_id }).collect(),
                })
                .collect(),
        })
    }

    async fn get_record(&self, record_id: &str) -> Result<AccessRecord, AuthressError> {
        self.guard()?
            .records
            .get(record_id)
            .cloned()
            .ok_or_else(|| AuthressError::not_found(format!("record '{record_id}'")))
    }

    async fn create_record(&self, record: &AccessRecord) -> Result<AccessRecord, AuthressError> {
        let mut state = self.guard()?;
        if state.record_writes_down {
            return Err(unavailable());
        }
        let mut created = record.clone();
        created.status = Some(RecordStatus::Active);
        state
            .records
            .insert(created.record_id.clone(), created.clone());
        Ok(created)
    }

    async fn update_record(
        &self,
        record_id: &str,
        record: &AccessRecord,
    ) -> Result<AccessRecord, AuthressError> {
        let mut state = self.guard()?;
        if state.record_writes_down {
            return Err(unavailable());
        }
        let Some(existing) = state.records.get_mut(record_id) else {
            return Err(AuthressError::not_found(format!("record '{record_id}'")));
        };
        *existing = record.clone();
        existing.record_id = record_id.to_string();
        Ok(existing.clone())
    }

    async fn delete_record(&self, record_id: &str) -> Result<(), AuthressError> {
        self.guard()?
            .records
            .remove(record_id)
            .map(|_| ())
            .ok_or_else(|| AuthressError::not_found(format!("record '{record_id}'")))
    }

    async fn get_connection(&self, connection_id: &str) -> Result<Connection, AuthressError> {
        self.guard()?
            .connections
            .get(connection_id)
            .cloned()
            .ok_or_else(|| AuthressError::not_found(format!("connection '{connection_id}'")))
    }

    async fn update_connection(
        &self,
        connection_id: &str,
        connection: &Connection,
    ) -> Result<Connection, AuthressError> {
        self.guard()?
            .connections
            .insert(connection_id.to_string(), connection.clone());
        Ok(connection.clone())
    }

    async fn delete_connection(&self, connection_id: &str) -> Result<(), AuthressError> {
        self.guard()?
            .connections
            .remove(connection_id)
            .map(|_| ())
            .ok_or_else(|| AuthressError::not_found(format!("connection '{connection_id}'")))
    }

    async fn get_tenant(&self, tenant_id: &str) -> Result<Tenant, AuthressError> {
        self.guard()?
            .tenants
            .get(tenant_id)
            .cloned()
            .ok_or_else(|| AuthressError::not_found(format!("tenant '{tenant_id}'")))
    }

    async fn create_tenant(&self, tenant: &Tenant) -> Result<Tenant, AuthressError> {
        let mut state = self.guard()?;
        if state.tenants.contains_key(&tenant.tenant_id) {
            return Err(AuthressError::Api {
                status: 409,
                message: format!("tenant '{}' already exists", tenant.tenant_id),
            });
        }
        state
            .tenants
            .insert(tenant.tenant_id.clone(), tenant.clone());
        Ok(tenant.clone())
    }

    async fn update_tenant(&self, tenant_id: &str, tenant: &Tenant) -> Result<Tenant, AuthressError> {
        let mut state = self.guard()?;
        let Some(existing) = state.tenants.get_mut(tenant_id) else {
            return Err(AuthressError::not_found(format!("tenant '{tenant_id}'")));
        };
        *existing = tenant.clone();
        Ok(existing.clone())
    }

    async fn delete_tenant(&self, tenant_id: &str) -> Result<(), AuthressError> {
        self.guard()?
            .tenants
            .remove(tenant_id)
            .map(|_| ())
            .ok_or_else(|| AuthressError::not_found(format!("tenant '{tenant_id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Statement, UserRef};

    fn grant(fake: &InMemoryAuthress, user: &str, role: Role, uri: &str) {
        fake.put_record(AccessRecord::new(
            format!("rec_{user}_{uri}"),
            "test",
            vec![UserRef::new(user.into())],
            vec![Statement {
                roles: vec![role],
                resources: vec![ResourceRef::new(uri)],
            }],
        ));
    }

    #[test]
    fn coverage_follows_path_segments() {
        assert!(covers("accounts/acc_1", "accounts/acc_1"));
        assert!(covers("accounts/acc_1", "accounts/acc_1/sso"));
        assert!(covers("/accounts/acc_1/*", "accounts/acc_1/users"));
        assert!(!covers("accounts/acc_1", "accounts/acc_10"));
        assert!(!covers("accounts/acc_1/sso", "accounts/acc_1"));
    }

    #[tokio::test]
    async fn read_role_cannot_update() {
        let fake = InMemoryAuthress::new();
        let bob = UserId::new("bob");
        grant(&fake, "bob", Role::AUTHRESS_READ_RESOURCE, "accounts/acc_1");

        fake.authorize_user(&bob, "accounts/acc_1/users", &Permission::USERS_READ)
            .await
            .unwrap();
        let err = fake
            .authorize_user(&bob, "accounts/acc_1", &Permission::ACCOUNTS_UPDATE)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthressError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn user_resources_distinguish_children_from_parent_access() {
        let fake = InMemoryAuthress::new();
        let alice = UserId::new("alice");
        grant(&fake, "alice", Role::ACCOUNT_OWNER, "accounts/acc_1");
        grant(&fake, "alice", Role::ACCOUNT_OWNER, "accounts/acc_2");

        let listed = fake
            .get_user_resources(&alice, "accounts", &Permission::ACCOUNTS_READ, 20)
            .await
            .unwrap();
        assert!(!listed.access_to_all_sub_resources);
        assert_eq!(
            listed.resources,
            vec![ResourceRef::new("accounts/acc_1"), ResourceRef::new("accounts/acc_2")]
        );

        let items = fake
            .get_user_resources(&alice, "accounts/acc_1/resources", &Permission::READ, 20)
            .await
            .unwrap();
        assert!(items.access_to_all_sub_resources);
        assert!(items.resources.is_empty());
    }

    #[tokio::test]
    async fn invalid_access_key_blocks_management_calls() {
        let fake = InMemoryAuthress::new().with_invalid_access_key();
        let err = fake.get_record("rec_1").await.unwrap_err();
        assert!(matches!(err, AuthressError::InvalidAccessKey(_)));
    }
}
