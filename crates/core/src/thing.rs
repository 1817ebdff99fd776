//! Example resource owned by an account.

use serde::{Deserialize, Serialize};

use crate::{AccountId, Entity, ThingId};

/// A thing stored inside an account.
///
/// Callers only ever see `thing_id`; storage and the authorization service
/// address it by [`Thing::global_id`] / [`Thing::resource_uri`], which
/// include the owning account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thing {
    pub thing_id: ThingId,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Thing {
    pub fn new(thing_id: ThingId, data: serde_json::Value) -> Self {
        Self { thing_id, data }
    }

    /// Globally unique key: `{accountId}|{thingId}`.
    pub fn global_id(account_id: &AccountId, thing_id: &ThingId) -> String {
        format!("{account_id}|{thing_id}")
    }

    pub fn resource_uri(account_id: &AccountId, thing_id: &ThingId) -> String {
        format!("accounts/{account_id}/resources/{thing_id}")
    }
}

impl Entity for Thing {
    type Id = ThingId;

    fn id(&self) -> &Self::Id {
        &self.thing_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_id_and_uri_are_account_scoped() {
        let account: AccountId = "acc_a1".parse().unwrap();
        let thing: ThingId = "thg_t1".parse().unwrap();
        assert_eq!(Thing::global_id(&account, &thing), "acc_a1|thg_t1");
        assert_eq!(Thing::resource_uri(&account, &thing), "accounts/acc_a1/resources/thg_t1");
    }
}
