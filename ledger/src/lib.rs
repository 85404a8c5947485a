// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Token Ledger — Core Library
//!
//! A fixed-supply fungible token: balances per address, plus allowances that
//! let an owner delegate spending to third parties.
//!
//! ## Architecture
//!
//! - **account** — `Address`, `Account` and `TokenInfo` records.
//! - **identity** — the `CallerIdentity` seam through which the dispatch layer
//!   tells the ledger who is calling.
//! - **store** — the `AccountStore` trait with in-memory and sled backends.
//! - **ledger** — the state machine: initialize, transfer, approve,
//!   transfer_from, and the read-only queries.
//! - **config** — constants shared by the library and the node.
//!
//! ## Guarantees
//!
//! 1. The sum of all balances equals the total supply after every call.
//! 2. No balance underflows or overflows; every arithmetic step is checked.
//! 3. A call either commits all of its writes or none of them.

pub mod account;
pub mod config;
pub mod identity;
pub mod ledger;
pub mod store;

pub use account::{Account, Address, AddressError, TokenInfo};
pub use identity::{Anonymous, CallerIdentity, IdentityError, StaticCaller};
pub use ledger::{Ledger, LedgerError, LedgerResult, Outcome, Rejection};
pub use store::{AccountStore, ChangeSet, MemoryStore, SledStore, StoreError};
