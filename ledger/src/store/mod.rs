// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Account Store
//!
//! The ledger's only persistence substrate: a key-value mapping from
//! [`Address`] to [`Account`], plus the single [`TokenInfo`] record.
//!
//! ## Backends
//!
//! ```text
//! memory.rs — BTreeMap-backed store for tests and benches
//! db.rs     — sled-backed store with bincode records and atomic batches
//! ```
//!
//! ## Commit Model
//!
//! The ledger never writes records one at a time. Each operation stages its
//! writes in a [`ChangeSet`] and hands it to [`AccountStore::commit`]. The
//! default implementation replays the set through `insert`; backends that can
//! do better (sled's `Batch`) override it so a crash never leaves half an
//! operation on disk.

pub mod db;
pub mod memory;

use std::collections::BTreeMap;

use crate::account::{Account, Address, TokenInfo};

pub use db::SledStore;
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur while reading or writing ledger records.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// ChangeSet
// ---------------------------------------------------------------------------

/// The full set of writes produced by one ledger operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Account records to upsert, keyed by address.
    pub accounts: BTreeMap<Address, Account>,
    /// Token metadata to write, if the operation sets it.
    pub token_info: Option<TokenInfo>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an account record, replacing any earlier staged copy.
    pub fn put_account(&mut self, account: Account) {
        self.accounts.insert(account.address.clone(), account);
    }

    pub fn set_token_info(&mut self, info: TokenInfo) {
        self.token_info = Some(info);
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.token_info.is_none()
    }
}

// ---------------------------------------------------------------------------
// AccountStore
// ---------------------------------------------------------------------------

/// Key-value backing store for ledger records.
pub trait AccountStore {
    /// Fetch the record for `address`, or `None` if it was never written.
    fn get(&self, address: &Address) -> StoreResult<Option<Account>>;

    /// Upsert a record, returning the previous one.
    fn insert(&mut self, address: Address, account: Account) -> StoreResult<Option<Account>>;

    /// The persisted token metadata, if the ledger was ever initialized.
    fn token_info(&self) -> StoreResult<Option<TokenInfo>>;

    /// Persist token metadata.
    fn set_token_info(&mut self, info: TokenInfo) -> StoreResult<()>;

    /// Every stored account, ordered by address.
    fn accounts(&self) -> StoreResult<Vec<Account>>;

    /// Apply every write in `changes`.
    fn commit(&mut self, changes: ChangeSet) -> StoreResult<()> {
        for (address, account) in changes.accounts {
            self.insert(address, account)?;
        }
        if let Some(info) = changes.token_info {
            self.set_token_info(info)?;
        }
        Ok(())
    }
}
