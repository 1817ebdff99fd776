use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use accountgate_core::{AccountId, Entity, Thing, ThingId};

/// Account-scoped thing storage; a thing is only visible through its account.
pub trait ThingsRepository: Send + Sync {
    fn get_thing(&self, account_id: &AccountId, thing_id: &ThingId) -> Option<Thing>;
    fn get_all_things(&self, account_id: &AccountId) -> Vec<Thing>;
    fn create_thing(&self, account_id: &AccountId, thing: Thing);
    /// Replace the thing's data; `None` when the thing does not exist.
    fn update_thing(
        &self,
        account_id: &AccountId,
        thing_id: &ThingId,
        data: serde_json::Value,
    ) -> Option<Thing>;
    fn delete_thing(&self, account_id: &AccountId, thing_id: &ThingId) -> bool;
}

impl<S> ThingsRepository for Arc<S>
where
    S: ThingsRepository + ?Sized,
{
    fn get_thing(&self, account_id: &AccountId, thing_id: &ThingId) -> Option<Thing> {
        (**self).get_thing(account_id, thing_id)
    }

    fn get_all_things(&self, account_id: &AccountId) -> Vec<Thing> {
        (**self).get_all_things(account_id)
    }

    fn create_thing(&self, account_id: &AccountId, thing: Thing) {
        (**self).create_thing(account_id, thing)
    }

    fn update_thing(
        &self,
        account_id: &AccountId,
        thing_id: &ThingId,
        data: serde_json::Value,
    ) -> Option<Thing> {
        (**self).update_thing(account_id, thing_id, data)
    }

    fn delete_thing(&self, account_id: &AccountId, thing_id: &ThingId) -> bool {
        (**self).delete_thing(account_id, thing_id)
    }
}

/// In-memory thing store for tests/dev, keyed by [`Thing::global_id`].
#[derive(Debug, Default)]
pub struct InMemoryThingsRepository {
    inner: RwLock<HashMap<String, (AccountId, Thing)>>,
}

impl InMemoryThingsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ThingsRepository for InMemoryThingsRepository {
    fn get_thing(&self, account_id: &AccountId, thing_id: &ThingId) -> Option<Thing> {
        let map = self.inner.read().ok()?;
        map.get(&Thing::global_id(account_id, thing_id))
            .map(|(_, thing)| thing.clone())
    }

    fn get_all_things(&self, account_id: &AccountId) -> Vec<Thing> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        let mut things: Vec<Thing> = map
            .values()
            .filter_map(|(a, thing)| if a == account_id { Some(thing.clone()) } else { None })
            .collect();
        things.sort_by(|a, b| a.thing_id.cmp(&b.thing_id));
        things
    }

    fn create_thing(&self, account_id: &AccountId, thing: Thing) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(
                Thing::global_id(account_id, thing.id()),
                (account_id.clone(), thing),
            );
        }
    }

    fn update_thing(
        &self,
        account_id: &AccountId,
        thing_id: &ThingId,
        data: serde_json::Value,
    ) -> Option<Thing> {
        let mut map = self.inner.write().ok()?;
        let (_, thing) = map.get_mut(&Thing::global_id(account_id, thing_id))?;
        thing.data = data;
        Some(thing.clone())
    }

    fn delete_thing(&self, account_id: &AccountId, thing_id: &ThingId) -> bool {
        match self.inner.write() {
            Ok(mut map) => map.remove(&Thing::global_id(account_id, thing_id)).is_some(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn things_are_isolated_per_account() {
        let repo = InMemoryThingsRepository::new();
        let a: AccountId = "acc_a".parse().unwrap();
        let b: AccountId = "acc_b".parse().unwrap();
        let id: ThingId = "thg_1".parse().unwrap();

        repo.create_thing(&a, Thing::new(id.clone(), json!({ "name": "first" })));

        assert!(repo.get_thing(&a, &id).is_some());
        assert!(repo.get_thing(&b, &id).is_none());
        assert!(repo.get_all_things(&b).is_empty());
        assert!(repo.update_thing(&b, &id, json!({})).is_none());
        assert!(!repo.delete_thing(&b, &id));

        let updated = repo.update_thing(&a, &id, json!({ "name": "second" })).unwrap();
        assert_eq!(updated.data["name"], "second");
        assert_eq!(repo.get_all_things(&a), vec![updated]);
        assert!(repo.delete_thing(&a, &id));
    }
}
