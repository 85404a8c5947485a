// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # SledStore — Persistent Account Store
//!
//! Ledger records on disk, built on sled's embedded key-value store.
//!
//! ## Key Layout
//!
//! Everything lives in one sled tree so that a single `Batch` covers every
//! write an operation makes:
//!
//! | Key                      | Value               |
//! |--------------------------|---------------------|
//! | `acct/` + address (UTF-8)| `bincode(Account)`  |
//! | `meta/token_info`        | `bincode(TokenInfo)`|
//!
//! ## Atomicity
//!
//! [`AccountStore::commit`] applies the whole [`ChangeSet`] as one sled
//! `Batch`, then flushes. Either every record of an operation lands on disk or
//! none does.

use sled::{Batch, Db, Tree};
use std::path::Path;

use super::{AccountStore, ChangeSet, StoreError, StoreResult};
use crate::account::{Account, Address, TokenInfo};
use crate::config::{ACCOUNT_KEY_PREFIX, LEDGER_TREE, TOKEN_INFO_KEY};

/// Persistent [`AccountStore`] backed by sled.
///
/// Cloning shares the underlying database handle.
#[derive(Debug, Clone)]
pub struct SledStore {
    /// The underlying sled database handle.
    db: Db,
    /// Accounts and token metadata, distinguished by key prefix.
    records: Tree,
}

impl SledStore {
    /// Open or create a store at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a store that is deleted when dropped. Used by tests and
    /// `--in-memory` nodes that still want the sled code path.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let records = db.open_tree(LEDGER_TREE)?;
        Ok(Self { db, records })
    }

    /// Number of account records on disk.
    pub fn account_count(&self) -> usize {
        self.records.scan_prefix(ACCOUNT_KEY_PREFIX).count()
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn account_key(address: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(ACCOUNT_KEY_PREFIX.len() + address.as_str().len());
    key.extend_from_slice(ACCOUNT_KEY_PREFIX);
    key.extend_from_slice(address.as_str().as_bytes());
    key
}

fn encode<T: serde::Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Decode an account and check it is filed under its own address.
fn decode_account(address: &Address, bytes: &[u8]) -> StoreResult<Account> {
    let account: Account = decode(bytes)?;
    if &account.address != address {
        return Err(StoreError::Corrupt(format!(
            "record under {} belongs to {}",
            address, account.address
        )));
    }
    Ok(account)
}

impl AccountStore for SledStore {
    fn get(&self, address: &Address) -> StoreResult<Option<Account>> {
        match self.records.get(account_key(address))? {
            Some(bytes) => Ok(Some(decode_account(address, &bytes)?)),
            None => Ok(None),
        }
    }

    fn insert(&mut self, address: Address, account: Account) -> StoreResult<Option<Account>> {
        let bytes = encode(&account)?;
        match self.records.insert(account_key(&address), bytes)? {
            Some(previous) => Ok(Some(decode_account(&address, &previous)?)),
            None => Ok(None),
        }
    }

    fn token_info(&self) -> StoreResult<Option<TokenInfo>> {
        match self.records.get(TOKEN_INFO_KEY)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_token_info(&mut self, info: TokenInfo) -> StoreResult<()> {
        self.records.insert(TOKEN_INFO_KEY, encode(&info)?)?;
        Ok(())
    }

    fn accounts(&self) -> StoreResult<Vec<Account>> {
        let mut accounts = Vec::new();
        for entry in self.records.scan_prefix(ACCOUNT_KEY_PREFIX) {
            let (_key, value) = entry?;
            accounts.push(decode::<Account>(&value)?);
        }
        Ok(accounts)
    }

    fn commit(&mut self, changes: ChangeSet) -> StoreResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        // Encode everything before touching the tree.
        let mut batch = Batch::default();
        for (address, account) in &changes.accounts {
            batch.insert(account_key(address), encode(account)?);
        }
        if let Some(info) = &changes.token_info {
            batch.insert(TOKEN_INFO_KEY, encode(info)?);
        }

        self.records.apply_batch(batch)?;
        self.db.flush()?;
        Ok(())
    }
}
