use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier checked against Authress.
///
/// Permissions are opaque strings (e.g. "accounts:read"). Role definitions in
/// Authress decide which roles grant which permissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const ACCOUNTS_READ: Permission = Permission(Cow::Borrowed("accounts:read"));
    pub const ACCOUNTS_UPDATE: Permission = Permission(Cow::Borrowed("accounts:update"));
    pub const SSO_READ: Permission = Permission(Cow::Borrowed("sso:read"));
    pub const SSO_UPDATE: Permission = Permission(Cow::Borrowed("sso:update"));
    pub const USERS_READ: Permission = Permission(Cow::Borrowed("users:read"));
    pub const USERS_UPDATE: Permission = Permission(Cow::Borrowed("users:update"));
    pub const USERS_DELETE: Permission = Permission(Cow::Borrowed("users:delete"));
    pub const READ: Permission = Permission(Cow::Borrowed("READ"));
    pub const CREATE: Permission = Permission(Cow::Borrowed("CREATE"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
