use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier as defined in the Authress management portal.
///
/// Roles are opaque strings at this layer; Authress maps them to
/// permissions. The constants below are the roles this service assigns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Full control over an account, granted to the user that created it.
    pub const ACCOUNT_OWNER: Role = Role(Cow::Borrowed("AccountOwner"));

    /// Built-in Authress role: full control including re-sharing.
    pub const AUTHRESS_OWNER: Role = Role(Cow::Borrowed("Authress:Owner"));

    /// Built-in Authress role: read-only access.
    pub const AUTHRESS_READ_RESOURCE: Role = Role(Cow::Borrowed("Authress:ReadResource"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
