use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use accountgate_core::{Account, AccountData, AccountId, Entity};

/// Account payload storage.
pub trait AccountsRepository: Send + Sync {
    fn get_account(&self, account_id: &AccountId) -> Option<Account>;
    fn get_all_accounts(&self) -> Vec<Account>;
    fn create_account(&self, account: Account);
    /// Replace the account's data; `None` when the account does not exist.
    fn update_account(&self, account_id: &AccountId, data: AccountData) -> Option<Account>;
    fn delete_account(&self, account_id: &AccountId) -> bool;
}

impl<S> AccountsRepository for Arc<S>
where
    S: AccountsRepository + ?Sized,
{
    fn get_account(&self, account_id: &AccountId) -> Option<Account> {
        (**self).get_account(account_id)
    }

    fn get_all_accounts(&self) -> Vec<Account> {
        (**self).get_all_accounts()
    }

    fn create_account(&self, account: Account) {
        (**self).create_account(account)
    }

    fn update_account(&self, account_id: &AccountId, data: AccountData) -> Option<Account> {
        (**self).update_account(account_id, data)
    }

    fn delete_account(&self, account_id: &AccountId) -> bool {
        (**self).delete_account(account_id)
    }
}

/// In-memory account store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAccountsRepository {
    inner: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountsRepository for InMemoryAccountsRepository {
    fn get_account(&self, account_id: &AccountId) -> Option<Account> {
        let map = self.inner.read().ok()?;
        map.get(account_id).cloned()
    }

    fn get_all_accounts(&self) -> Vec<Account> {
        let map = match self.inner.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };

        let mut accounts: Vec<Account> = map.values().cloned().collect();
        accounts.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        accounts
    }

    fn create_account(&self, account: Account) {
        if let Ok(mut map) = self.inner.write() {
            map.insert(account.id().clone(), account);
        }
    }

    fn update_account(&self, account_id: &AccountId, data: AccountData) -> Option<Account> {
        let mut map = self.inner.write().ok()?;
        let account = map.get_mut(account_id)?;
        account.data = data;
        Some(account.clone())
    }

    fn delete_account(&self, account_id: &AccountId) -> bool {
        match self.inner.write() {
            Ok(mut map) => map.remove(account_id).is_some(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accountgate_core::UserId;

    fn account(id: &str) -> Account {
        Account::new(
            id.parse().unwrap(),
            AccountData {
                account_creator_id: Some(UserId::new("alice")),
                company: None,
            },
        )
    }

    #[test]
    fn update_only_touches_existing_accounts() {
        let repo = InMemoryAccountsRepository::new();
        repo.create_account(account("acc_a"));

        let updated = repo
            .update_account(
                &"acc_a".parse().unwrap(),
                AccountData {
                    account_creator_id: None,
                    company: Some("Acme".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.data.company.as_deref(), Some("Acme"));

        assert!(
            repo.update_account(&"acc_missing".parse().unwrap(), AccountData::default())
                .is_none()
        );
        assert!(repo.get_account(&"acc_missing".parse().unwrap()).is_none());
    }

    #[test]
    fn list_and_delete() {
        let repo: Arc<dyn AccountsRepository> = Arc::new(InMemoryAccountsRepository::new());
        repo.create_account(account("acc_b"));
        repo.create_account(account("acc_a"));

        let ids: Vec<String> = repo
            .get_all_accounts()
            .into_iter()
            .map(|a| a.account_id.to_string())
            .collect();
        assert_eq!(ids, ["acc_a", "acc_b"]);

        assert!(repo.delete_account(&"acc_a".parse().unwrap()));
        assert!(!repo.delete_account(&"acc_a".parse().unwrap()));
        assert_eq!(repo.get_all_accounts().len(), 1);
    }
}
