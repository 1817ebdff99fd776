use accountgate_core::{AccountId, UserId};

/// Authenticated caller of a request, inserted by the token middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserContext {
    user_id: UserId,
    tenant_id: Option<AccountId>,
}

impl UserContext {
    pub fn new(user_id: UserId, tenant_id: Option<AccountId>) -> Self {
        Self { user_id, tenant_id }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Account whose SSO tenant the user logged in through.
    pub fn tenant_id(&self) -> Option<&AccountId> {
        self.tenant_id.as_ref()
    }
}
