//! Customer account entity.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Entity, UserId};

/// Mutable account attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_creator_id: Option<UserId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// A customer account: the grouping users and resources belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: AccountId,
    #[serde(default)]
    pub data: AccountData,
}

impl Account {
    pub fn new(account_id: AccountId, data: AccountData) -> Self {
        Self { account_id, data }
    }

    /// Resource uri of the account in the authorization service.
    pub fn resource_uri(&self) -> String {
        format!("accounts/{}", self.account_id)
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.account_id
    }
}
