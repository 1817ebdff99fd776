use serde::Deserialize;
use serde_json::{Value, json};

use accountgate_auth::{AssignedUserRoles, Role, SsoConfiguration, SsoConnection, UserIdentity};
use accountgate_core::Account;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAccountRequest {
    pub company: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSsoRequest {
    pub domain: Option<String>,
    pub connection: Option<SsoConnection>,
}

#[derive(Debug, Deserialize)]
pub struct SetUserRolesRequest {
    pub roles: Vec<Role>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn account_to_json(account: &Account, public_base_url: &str) -> Value {
    json!({
        "accountId": account.account_id,
        "links": {
            "self": { "href": format!("{public_base_url}/accounts/{}", account.account_id) }
        }
    })
}

pub fn sso_to_json(sso: Option<SsoConfiguration>) -> Value {
    match sso {
        Some(sso) => json!({
            "domain": sso.tenant.tenant_lookup_identifier,
            "connection": sso.connection,
        }),
        None => json!({}),
    }
}

/// Roles of a user merged with what the identity provider knows about them.
pub fn user_to_json(user: AssignedUserRoles, identity: Option<&UserIdentity>) -> Value {
    let mut out = json!({
        "userId": user.user_id,
        "roles": user.roles,
    });
    if let (Some(identity), Some(map)) = (identity, out.as_object_mut()) {
        if let Some(name) = &identity.name {
            map.insert("name".to_string(), json!(name));
        }
        if let Some(email) = &identity.email {
            map.insert("email".to_string(), json!(email));
        }
        if let Some(picture) = &identity.picture {
            map.insert("picture".to_string(), json!(picture));
        }
    }
    out
}
