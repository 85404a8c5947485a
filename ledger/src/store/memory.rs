// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! In-memory account store. Nothing survives the process.

use std::collections::BTreeMap;

use super::{AccountStore, StoreResult};
use crate::account::{Account, Address, TokenInfo};

/// [`AccountStore`] over a `BTreeMap`, so iteration is ordered by address.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    accounts: BTreeMap<Address, Account>,
    token_info: Option<TokenInfo>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl AccountStore for MemoryStore {
    fn get(&self, address: &Address) -> StoreResult<Option<Account>> {
        Ok(self.accounts.get(address).cloned())
    }

    fn insert(&mut self, address: Address, account: Account) -> StoreResult<Option<Account>> {
        Ok(self.accounts.insert(address, account))
    }

    fn token_info(&self) -> StoreResult<Option<TokenInfo>> {
        Ok(self.token_info.clone())
    }

    fn set_token_info(&mut self, info: TokenInfo) -> StoreResult<()> {
        self.token_info = Some(info);
        Ok(())
    }

    fn accounts(&self) -> StoreResult<Vec<Account>> {
        Ok(self.accounts.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ChangeSet;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn insert_returns_previous_record() {
        let mut store = MemoryStore::new();
        let first = Account::with_balance(addr("alice"), 10);
        assert!(store.insert(addr("alice"), first.clone()).unwrap().is_none());

        let previous = store
            .insert(addr("alice"), Account::with_balance(addr("alice"), 20))
            .unwrap();
        assert_eq!(previous, Some(first));
        assert_eq!(store.get(&addr("alice")).unwrap().unwrap().balance, 20);
    }

    #[test]
    fn unknown_address_is_none() {
        let store = MemoryStore::new();
        assert!(store.get(&addr("nobody")).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn default_commit_writes_accounts_and_token_info() {
        let mut store = MemoryStore::new();
        let mut changes = ChangeSet::new();
        changes.put_account(Account::with_balance(addr("bob"), 3));
        changes.put_account(Account::with_balance(addr("alice"), 7));
        changes.set_token_info(TokenInfo {
            name: "Coin".into(),
            ticker: "COIN".into(),
            total_supply: 10,
        });

        store.commit(changes).unwrap();

        let accounts = store.accounts().unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].address.as_str(), "alice");
        assert_eq!(store.token_info().unwrap().unwrap().total_supply, 10);
    }
}
