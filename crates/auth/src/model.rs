//! Authress wire types and the SSO shapes exposed by the API.
//!
//! Field names follow Authress' JSON (camelCase). Access records keep any
//! field we do not model in `extra` so a read-modify-write does not drop it.

use serde::{Deserialize, Serialize};

use accountgate_core::UserId;

use crate::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    pub resource_uri: String,
}

impl ResourceRef {
    pub fn new(resource_uri: impl Into<String>) -> Self {
        Self {
            resource_uri: resource_uri.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub user_id: UserId,
}

impl UserRef {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// Grants `roles` on every resource in `resources`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub roles: Vec<Role>,
    pub resources: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Active,
    Deleted,
    #[serde(other)]
    Unknown,
}

/// Permission-assignment document stored in Authress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecord {
    pub record_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub users: Vec<UserRef>,

    #[serde(default)]
    pub statements: Vec<Statement>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AccessRecord {
    pub fn new(
        record_id: impl Into<String>,
        name: impl Into<String>,
        users: Vec<UserRef>,
        statements: Vec<Statement>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            name: name.into(),
            users,
            statements,
            status: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.status == Some(RecordStatus::Deleted)
    }
}

/// Resources a user holds a permission on, below some parent uri.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResources {
    #[serde(default)]
    pub resources: Vec<ResourceRef>,

    /// The user holds the permission on the parent itself, and therefore
    /// on everything below it.
    #[serde(default)]
    pub access_to_all_sub_resources: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRef {
    pub role_id: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUser {
    pub user_id: UserId,
    #[serde(default)]
    pub roles: Vec<RoleRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceUsers {
    #[serde(default)]
    pub users: Vec<ResourceUser>,
}

/// A user together with the roles it holds on some resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedUserRoles {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl From<ResourceUser> for AssignedUserRoles {
    fn from(user: ResourceUser) -> Self {
        Self {
            user_id: user.user_id,
            roles: user.roles.into_iter().map(|r| r.role_id).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionType {
    Oauth2,
    Saml,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_content_type: Option<String>,
}

/// Federated identity provider connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ConnectionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ConnectionData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConnection {
    pub connection_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_lookup_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TenantData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<TenantConnection>,
}

/// SSO connection settings as accepted and returned by the accounts API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoConnection {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ConnectionType>,
    pub authentication_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_certificate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl From<Connection> for SsoConnection {
    fn from(c: Connection) -> Self {
        Self {
            kind: c.kind,
            authentication_url: c.authentication_url.unwrap_or_default(),
            issuer_url: c.issuer_url,
            token_url: c.token_url,
            provider_certificate: c.provider_certificate,
            client_id: c.client_id,
            client_secret: c.client_secret,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoTenant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_lookup_identifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SsoConfiguration {
    pub connection: SsoConnection,
    pub tenant: SsoTenant,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn access_record_keeps_unmodelled_fields() {
        let raw = json!({
            "recordId": "rec_1",
            "name": "Account: a, User: u",
            "users": [{ "userId": "u" }],
            "statements": [{ "roles": ["AccountOwner"], "resources": [{ "resourceUri": "accounts/a" }] }],
            "status": "ACTIVE",
            "admins": [{ "userId": "ops" }],
            "lastUpdated": "2024-01-01T00:00:00Z"
        });

        let record: AccessRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(record.status, Some(RecordStatus::Active));
        assert_eq!(record.statements[0].roles, vec![Role::ACCOUNT_OWNER]);
        assert!(record.extra.contains_key("admins"));

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["admins"], raw["admins"]);
        assert_eq!(back["lastUpdated"], raw["lastUpdated"]);
    }

    #[test]
    fn unknown_record_status_does_not_fail_decoding() {
        let record: AccessRecord =
            serde_json::from_value(json!({ "recordId": "r", "status": "PENDING" })).unwrap();
        assert_eq!(record.status, Some(RecordStatus::Unknown));
        assert!(!record.is_deleted());
    }

    #[test]
    fn connection_type_uses_authress_spelling() {
        assert_eq!(serde_json::to_value(ConnectionType::Oauth2).unwrap(), json!("OAUTH2"));
        let c: SsoConnection = serde_json::from_value(json!({
            "type": "SAML",
            "authenticationUrl": "https://idp.example/sso"
        }))
        .unwrap();
        assert_eq!(c.kind, Some(ConnectionType::Saml));
    }
}
