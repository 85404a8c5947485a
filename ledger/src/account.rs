// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Account Model
//!
//! The records the ledger persists: one [`Account`] per address, plus the
//! ledger-global [`TokenInfo`] fixed at initialization.
//!
//! An address that has never been referenced has no record at all. The ledger
//! treats that the same as an account with zero balance and no allowances,
//! and materializes it through [`Account::empty`] only when it becomes a
//! transfer or approval target.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::MAX_ADDRESS_LENGTH;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Errors produced when parsing an [`Address`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must not be empty")]
    Empty,

    #[error("address is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },
}

/// Opaque identity of a token holder.
///
/// The ledger never interprets the contents. Construction only guarantees the
/// string is non-empty and bounded, so a blank identity can never own funds.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Validate and wrap an address string.
    pub fn new(value: impl Into<String>) -> Result<Self, AddressError> {
        let value = value.into();
        if value.is_empty() {
            return Err(AddressError::Empty);
        }
        if value.len() > MAX_ADDRESS_LENGTH {
            return Err(AddressError::TooLong {
                len: value.len(),
                max: MAX_ADDRESS_LENGTH,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// The stored state of a single token holder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Key of this record in the account store.
    pub address: Address,
    /// Token units owned by this address.
    pub balance: u64,
    /// Spending rights granted to other addresses, keyed by spender.
    /// A missing entry means an allowance of zero.
    pub allowances: BTreeMap<Address, u64>,
}

impl Account {
    /// A zero-balance account with no allowances.
    pub fn empty(address: Address) -> Self {
        Self::with_balance(address, 0)
    }

    /// A fresh account holding `balance` units.
    pub fn with_balance(address: Address, balance: u64) -> Self {
        Self {
            address,
            balance,
            allowances: BTreeMap::new(),
        }
    }

    /// Amount `spender` may currently move out of this account.
    pub fn allowance(&self, spender: &Address) -> u64 {
        self.allowances.get(spender).copied().unwrap_or(0)
    }

    /// Replace the allowance for `spender`. Zero drops the entry.
    pub fn set_allowance(&mut self, spender: Address, amount: u64) {
        if amount == 0 {
            self.allowances.remove(&spender);
        } else {
            self.allowances.insert(spender, amount);
        }
    }

    /// Subtract `amount` from the balance. Returns `None` on underflow and
    /// leaves the balance untouched.
    pub fn debit(&mut self, amount: u64) -> Option<u64> {
        self.balance = self.balance.checked_sub(amount)?;
        Some(self.balance)
    }

    /// Add `amount` to the balance. Returns `None` on overflow and leaves the
    /// balance untouched.
    pub fn credit(&mut self, amount: u64) -> Option<u64> {
        self.balance = self.balance.checked_add(amount)?;
        Some(self.balance)
    }
}

// ---------------------------------------------------------------------------
// TokenInfo
// ---------------------------------------------------------------------------

/// Ledger-global metadata, written once by `initialize`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Display name (e.g. "Coin").
    pub name: String,
    /// Ticker symbol (e.g. "COIN").
    pub ticker: String,
    /// Fixed supply. No mint or burn exists after initialization.
    pub total_supply: u64,
}
