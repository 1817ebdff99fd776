//! Permissions wrapper used by the API handlers.
//!
//! Every method is a thin flow around one or more Authress calls. The only
//! stateful one is [`PermissionsService::set_role_for_user`], which does a
//! read-modify-write of the user's access record in an account and falls
//! back to creating it.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::try_join_all;

use accountgate_core::{AccountId, ThingId, UserId};

use crate::model::{
    AccessRecord, AssignedUserRoles, Connection, ConnectionData, ResourceRef, SsoConfiguration,
    SsoConnection, SsoTenant, Statement, Tenant, TenantConnection, TenantData, UserIdentity,
    UserRef, UserResources,
};
use crate::{AuthressApi, AuthressError, Permission, Role, VerifiedIdentity};

const USER_RESOURCES_PAGE_SIZE: u32 = 20;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Access record holding one user's roles within one account.
///
/// One record per account+user keeps removal a single delete.
pub fn account_record_id(account_id: &AccountId, user_id: &UserId) -> String {
    format!("rec_A:{account_id}:U:{user_id}")
}

pub fn sso_connection_id(account_id: &AccountId) -> String {
    format!("con_sso-{account_id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthressProperties {
    pub api_url: String,
}

#[derive(Clone)]
pub struct PermissionsService {
    authress: Arc<dyn AuthressApi>,
}

impl core::fmt::Debug for PermissionsService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PermissionsService")
            .field("api_url", &self.authress.api_url())
            .finish()
    }
}

impl PermissionsService {
    pub fn new(authress: Arc<dyn AuthressApi>) -> Self {
        Self { authress }
    }

    /// Confirms the service client credentials are usable.
    pub fn get_authress_properties(&self) -> Result<AuthressProperties, AuthressError> {
        self.authress.check_service_client()?;
        Ok(AuthressProperties {
            api_url: self.authress.api_url().to_string(),
        })
    }

    pub fn api_url(&self) -> &str {
        self.authress.api_url()
    }

    pub async fn verify_user_token(&self, token: &str) -> Result<VerifiedIdentity, AuthressError> {
        self.authress.verify_token(token).await
    }

    pub async fn has_access_to_resource(
        &self,
        user_id: &UserId,
        resource_uri: &str,
        permission: &Permission,
    ) -> Result<bool, AuthressError> {
        match self
            .authress
            .authorize_user(user_id, resource_uri, permission)
            .await
        {
            Ok(()) => Ok(true),
            Err(AuthressError::Unauthorized { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Resources below `resource_uri` the user holds `permission` on.
    pub async fn get_user_resources(
        &self,
        user_id: &UserId,
        resource_uri: &str,
        permission: &Permission,
    ) -> Result<UserResources, AuthressError> {
        self.authress
            .get_user_resources(user_id, resource_uri, permission, USER_RESOURCES_PAGE_SIZE)
            .await
    }

    /// Only the resources explicitly listed in the user's permissions; access
    /// inherited from a parent is not expanded.
    pub async fn get_explicit_user_resources(
        &self,
        user_id: &UserId,
        resource_uri: &str,
        permission: &Permission,
    ) -> Result<Vec<String>, AuthressError> {
        let resources = self
            .get_user_resources(user_id, resource_uri, permission)
            .await?;
        Ok(resources
            .resources
            .into_iter()
            .map(|r| r.resource_uri)
            .collect())
    }

    /// Resolve user ids to identities; users unknown to Authress are dropped.
    pub async fn get_user_data_map(
        &self,
        user_ids: &[UserId],
    ) -> Result<HashMap<UserId, UserIdentity>, AuthressError> {
        let lookups = user_ids.iter().map(|user_id| async move {
            match self.authress.get_user(user_id).await {
                Ok(identity) => Ok(Some(identity)),
                Err(e) if e.is_not_found() => Ok(None),
                Err(e) => {
                    tracing::error!(%user_id, error = %e, "Failed to resolve user");
                    Err(e)
                }
            }
        });

        Ok(try_join_all(lookups)
            .await?
            .into_iter()
            .flatten()
            .map(|u| (u.user_id.clone(), u))
            .collect())
    }

    pub async fn get_users_that_have_access_to_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Vec<AssignedUserRoles>, AuthressError> {
        self.resource_users(&format!("accounts/{account_id}")).await
    }

    pub async fn get_users_that_have_access_to_resource(
        &self,
        account_id: &AccountId,
        thing_id: &ThingId,
    ) -> Result<Vec<AssignedUserRoles>, AuthressError> {
        self.resource_users(&format!("accounts/{account_id}/resources/{thing_id}"))
            .await
    }

    async fn resource_users(&self, resource_uri: &str) -> Result<Vec<AssignedUserRoles>, AuthressError> {
        let result = self.authress.get_resource_users(resource_uri).await?;
        Ok(result.users.into_iter().map(AssignedUserRoles::from).collect())
    }

    pub async fn remove_user_from_account(
        &self,
        account_id: &AccountId,
        user_id: &UserId,
    ) -> Result<(), AuthressError> {
        let record_id = account_record_id(account_id, user_id);
        match self.authress.delete_record(&record_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => {
                tracing::error!(
                    %account_id,
                    %user_id,
                    error = %e,
                    "Failed to remove user from account"
                );
                Err(e)
            }
        }
    }

    /// Replace the user's roles on `resource_uris` within the account.
    ///
    /// Statements that name any of the target resources are replaced by one
    /// statement granting `roles`. Statements for other resources are kept.
    /// An empty `roles` removes the user's access to those resources.
    pub async fn set_role_for_user(
        &self,
        account_id: &AccountId,
        user_id: &UserId,
        resource_uris: &[String],
        roles: &[Role],
    ) -> Result<(), AuthressError> {
        let record_id = account_record_id(account_id, user_id);
        let statement = (!roles.is_empty()).then(|| Statement {
            roles: roles.to_vec(),
            resources: resource_uris.iter().map(ResourceRef::new).collect(),
        });

        match self.authress.get_record(&record_id).await {
            Ok(record) if !record.is_deleted() => {
                let updated = merge_statements(record, user_id, resource_uris, statement.clone());
                match self.authress.update_record(&record_id, &updated).await {
                    Ok(_) => return Ok(()),
                    // Deleted between read and write: fall through to create.
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let Some(statement) = statement else {
            return Ok(());
        };
        let record = AccessRecord::new(
            record_id,
            format!("Account: {account_id}, User: {user_id}"),
            vec![UserRef::new(user_id.clone())],
            vec![statement],
        );
        self.authress.create_record(&record).await?;
        Ok(())
    }

    /// Current SSO setup of the account; `None` when missing or unreadable.
    pub async fn get_sso_configuration(&self, account_id: &AccountId) -> Option<SsoConfiguration> {
        let connection_id = sso_connection_id(account_id);
        let lookup = async {
            let connection = self.authress.get_connection(&connection_id).await?;
            let tenant = self.authress.get_tenant(account_id.as_str()).await?;
            Ok::<_, AuthressError>((connection, tenant))
        };

        match lookup.await {
            Ok((connection, tenant)) => Some(SsoConfiguration {
                connection: SsoConnection::from(connection),
                tenant: SsoTenant {
                    tenant_lookup_identifier: tenant.tenant_lookup_identifier,
                },
            }),
            Err(e) if e.is_not_found() => None,
            Err(e) => {
                tracing::error!(
                    %account_id,
                    error = %e,
                    "Failed to get sso configuration for account"
                );
                None
            }
        }
    }

    /// Point the account's tenant (looked up by `domain`) at its connection.
    pub async fn update_sso_configuration(
        &self,
        account_id: &AccountId,
        domain: &str,
        connection: &SsoConnection,
    ) -> Result<(), AuthressError> {
        let connection_id = sso_connection_id(account_id);
        let update = Connection {
            kind: connection.kind,
            authentication_url: Some(connection.authentication_url.clone()),
            issuer_url: connection.issuer_url.clone(),
            token_url: connection.token_url.clone(),
            provider_certificate: connection.provider_certificate.clone(),
            client_id: connection.client_id.clone(),
            client_secret: connection.client_secret.clone(),
            data: Some(ConnectionData {
                name: Some(format!("SSO login ({account_id})")),
                supported_content_type: Some(FORM_URLENCODED.to_string()),
            }),
        };
        self.authress
            .update_connection(&connection_id, &update)
            .await?;

        let tenant = Tenant {
            tenant_id: account_id.to_string(),
            tenant_lookup_identifier: Some(domain.to_string()),
            data: Some(TenantData {
                name: Some(format!("SSO for {account_id}")),
            }),
            connection: Some(TenantConnection { connection_id }),
        };

        match self.authress.update_tenant(account_id.as_str(), &tenant).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                self.authress.create_tenant(&tenant).await?;
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    %account_id,
                    error = %e,
                    "Failed to update sso configuration for account"
                );
                Err(e)
            }
        }
    }

    pub async fn delete_sso_configuration(&self, account_id: &AccountId) -> Result<(), AuthressError> {
        let connection_id = sso_connection_id(account_id);
        tolerate_missing(
            self.authress.delete_connection(&connection_id).await,
            account_id,
        )?;
        tolerate_missing(
            self.authress.delete_tenant(account_id.as_str()).await,
            account_id,
        )
    }
}

fn tolerate_missing(result: Result<(), AuthressError>, account_id: &AccountId) -> Result<(), AuthressError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => {
            tracing::error!(
                %account_id,
                error = %e,
                "Failed to delete sso configuration for account"
            );
            Err(e)
        }
    }
}

/// Drop statements naming any of `resource_uris` (ignoring a trailing `/*`),
/// append `statement`, and pin the record to `user_id`.
fn merge_statements(
    mut record: AccessRecord,
    user_id: &UserId,
    resource_uris: &[String],
    statement: Option<Statement>,
) -> AccessRecord {
    record.statements.retain(|s| {
        !s.resources.iter().any(|r| {
            let uri = r.resource_uri.strip_suffix("/*").unwrap_or(&r.resource_uri);
            resource_uris.iter().any(|target| target == uri)
        })
    });
    record.statements.extend(statement);
    record.users = vec![UserRef::new(user_id.clone())];
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::InMemoryAuthress;
    use crate::model::{ConnectionType, RecordStatus};

    fn account() -> AccountId {
        "acc_one".parse().unwrap()
    }

    fn setup() -> (Arc<InMemoryAuthress>, PermissionsService) {
        let fake = Arc::new(InMemoryAuthress::new());
        let service = PermissionsService::new(fake.clone());
        (fake, service)
    }

    fn statement(role: Role, uri: &str) -> Statement {
        Statement {
            roles: vec![role],
            resources: vec![ResourceRef::new(uri)],
        }
    }

    #[tokio::test]
    async fn set_role_creates_missing_record() {
        let (fake, service) = setup();
        let alice = UserId::new("alice");

        service
            .set_role_for_user(&account(), &alice, &["accounts/acc_one".to_string()], &[Role::ACCOUNT_OWNER])
            .await
            .unwrap();

        let record = fake.record("rec_A:acc_one:U:alice").unwrap();
        assert_eq!(record.name, "Account: acc_one, User: alice");
        assert_eq!(record.users, vec![UserRef::new(alice.clone())]);
        assert_eq!(record.statements, vec![statement(Role::ACCOUNT_OWNER, "accounts/acc_one")]);
        assert!(
            service
                .has_access_to_resource(&alice, "accounts/acc_one", &Permission::ACCOUNTS_UPDATE)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn explicit_resources_list_only_named_children() {
        let (fake, service) = setup();
        let alice = UserId::new("alice");
        fake.put_record(AccessRecord::new(
            "rec_alice",
            "alice",
            vec![UserRef::new(alice.clone())],
            vec![
                statement(Role::ACCOUNT_OWNER, "accounts/acc_one"),
                statement(Role::ACCOUNT_OWNER, "accounts/acc_two"),
            ],
        ));

        let uris = service
            .get_explicit_user_resources(&alice, "accounts", &Permission::ACCOUNTS_READ)
            .await
            .unwrap();
        assert_eq!(uris, ["accounts/acc_one", "accounts/acc_two"]);

        // Access through the parent names no child explicitly.
        let items = service
            .get_explicit_user_resources(&alice, "accounts/acc_one/resources", &Permission::READ)
            .await
            .unwrap();
        assert!(items.is_empty());

        let nobody = service
            .get_explicit_user_resources(&UserId::new("bob"), "accounts", &Permission::ACCOUNTS_READ)
            .await
            .unwrap();
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn set_role_replaces_only_matching_statements() {
        let (fake, service) = setup();
        let bob = UserId::new("bob");
        let mut existing = AccessRecord::new(
            account_record_id(&account(), &bob),
            "custom name",
            vec![UserRef::new("someone-else".into())],
            vec![
                statement(Role::AUTHRESS_READ_RESOURCE, "accounts/acc_one/*"),
                statement(Role::AUTHRESS_OWNER, "accounts/acc_one/resources/thg_1"),
            ],
        );
        existing
            .extra
            .insert("admins".to_string(), serde_json::json!([{ "userId": "ops" }]));
        fake.put_record(existing);

        service
            .set_role_for_user(&account(), &bob, &["accounts/acc_one".to_string()], &[Role::ACCOUNT_OWNER])
            .await
            .unwrap();

        let record = fake.record("rec_A:acc_one:U:bob").unwrap();
        assert_eq!(record.name, "custom name");
        assert_eq!(record.users, vec![UserRef::new(bob)]);
        assert_eq!(
            record.statements,
            vec![
                statement(Role::AUTHRESS_OWNER, "accounts/acc_one/resources/thg_1"),
                statement(Role::ACCOUNT_OWNER, "accounts/acc_one"),
            ]
        );
        assert!(record.extra.contains_key("admins"));
    }

    #[tokio::test]
    async fn deleted_record_is_recreated() {
        let (fake, service) = setup();
        let carol = UserId::new("carol");
        let mut deleted = AccessRecord::new(
            account_record_id(&account(), &carol),
            "old",
            vec![UserRef::new(carol.clone())],
            vec![statement(Role::ACCOUNT_OWNER, "accounts/acc_one")],
        );
        deleted.status = Some(RecordStatus::Deleted);
        fake.put_record(deleted);

        service
            .set_role_for_user(
                &account(),
                &carol,
                &["accounts/acc_one".to_string()],
                &[Role::AUTHRESS_READ_RESOURCE],
            )
            .await
            .unwrap();

        let record = fake.record("rec_A:acc_one:U:carol").unwrap();
        assert_eq!(record.name, "Account: acc_one, User: carol");
        assert!(!record.is_deleted());
        assert_eq!(record.statements[0].roles, vec![Role::AUTHRESS_READ_RESOURCE]);
    }

    #[tokio::test]
    async fn empty_roles_on_missing_record_is_a_no_op() {
        let (fake, service) = setup();
        let dave = UserId::new("dave");
        service
            .set_role_for_user(&account(), &dave, &["accounts/acc_one".to_string()], &[])
            .await
            .unwrap();
        assert!(fake.record("rec_A:acc_one:U:dave").is_none());
    }

    #[tokio::test]
    async fn removing_an_absent_user_succeeds() {
        let (_fake, service) = setup();
        service
            .remove_user_from_account(&account(), &UserId::new("nobody"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn user_data_map_skips_unknown_users() {
        let (fake, service) = setup();
        fake.add_user(UserIdentity {
            user_id: "alice".into(),
            name: Some("Alice".to_string()),
            email: None,
            picture: None,
        });

        let map = service
            .get_user_data_map(&["alice".into(), "ghost".into()])
            .await
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[&UserId::new("alice")].name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn account_users_list_roles_per_user() {
        let (_fake, service) = setup();
        let uri = vec!["accounts/acc_one".to_string()];
        service
            .set_role_for_user(&account(), &"alice".into(), &uri, &[Role::ACCOUNT_OWNER])
            .await
            .unwrap();
        service
            .set_role_for_user(&account(), &"bob".into(), &uri, &[Role::AUTHRESS_READ_RESOURCE])
            .await
            .unwrap();

        let users = service
            .get_users_that_have_access_to_account(&account())
            .await
            .unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].user_id.as_str(), "alice");
        assert_eq!(users[1].roles, vec![Role::AUTHRESS_READ_RESOURCE]);
    }

    #[tokio::test]
    async fn sso_configuration_lifecycle() {
        let (fake, service) = setup();
        assert!(service.get_sso_configuration(&account()).await.is_none());

        let connection = SsoConnection {
            kind: Some(ConnectionType::Oauth2),
            authentication_url: "https://idp.example/authorize".to_string(),
            issuer_url: Some("https://idp.example".to_string()),
            token_url: None,
            provider_certificate: None,
            client_id: Some("client".to_string()),
            client_secret: None,
        };
        // No tenant exists yet: update falls back to create.
        service
            .update_sso_configuration(&account(), "example.com", &connection)
            .await
            .unwrap();

        let stored = fake.connection("con_sso-acc_one").unwrap();
        assert_eq!(
            stored.data.unwrap().supported_content_type.as_deref(),
            Some(FORM_URLENCODED)
        );
        let tenant = fake.tenant("acc_one").unwrap();
        assert_eq!(tenant.connection.unwrap().connection_id, "con_sso-acc_one");

        let sso = service.get_sso_configuration(&account()).await.unwrap();
        assert_eq!(sso.tenant.tenant_lookup_identifier.as_deref(), Some("example.com"));
        assert_eq!(sso.connection, connection);

        service.delete_sso_configuration(&account()).await.unwrap();
        assert!(fake.tenant("acc_one").is_none());
        // Deleting again tolerates the missing connection and tenant.
        service.delete_sso_configuration(&account()).await.unwrap();
    }

    #[test]
    fn invalid_service_client_surfaces_in_properties() {
        let fake = Arc::new(InMemoryAuthress::new().with_invalid_access_key());
        let service = PermissionsService::new(fake);
        assert!(matches!(
            service.get_authress_properties(),
            Err(AuthressError::InvalidAccessKey(_))
        ));
    }
}
