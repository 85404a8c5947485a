// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger State Machine
//!
//! The only writer of the [`AccountStore`]. Every token rule lives here.
//!
//! ## States
//!
//! ```text
//! Uninitialized --initialize--> Initialized
//! ```
//!
//! `initialize` is the only transition. Every other operation fails with
//! [`LedgerError::NotInitialized`] until it has run, and a second
//! `initialize` fails with [`LedgerError::AlreadyInitialized`].
//!
//! ## Operation Shape
//!
//! A mutating operation:
//!
//! 1. Resolves the caller through the injected [`CallerIdentity`].
//! 2. Loads the records it touches into a `WorkingSet`.
//! 3. Validates and mutates the staged copies only.
//! 4. Commits the staged copies as one [`ChangeSet`].
//!
//! A rejection returns before step 4, so a failed call never writes. Because
//! all reads go through the working set, an address that appears twice in one
//! call (self-transfer, `from == to`) sees its own staged edits: the debit and
//! the credit land on the same record and net out.
//!
//! ## Failure Classes
//!
//! - Business-rule rejections come back as `Ok(Outcome::Rejected(..))`; the
//!   caller sees `false` and nothing changed.
//! - Faults (no caller, not initialized, storage failure) are `Err`.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::account::{Account, Address, TokenInfo};
use crate::identity::{CallerIdentity, IdentityError};
use crate::store::{AccountStore, ChangeSet, StoreError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Faults that abort a ledger call.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// An operation ran before `initialize`.
    #[error("ledger not initialized")]
    NotInitialized,

    /// `initialize` ran twice.
    #[error("ledger already initialized for {ticker}")]
    AlreadyInitialized { ticker: String },

    /// The dispatch layer failed to supply a caller.
    #[error("caller identity unavailable: {0}")]
    Identity(#[from] IdentityError),

    /// The backing store failed.
    #[error("account store failure: {0}")]
    Store(#[from] StoreError),

    /// Stored balances no longer add up to the total supply.
    #[error("supply mismatch: accounts hold {held}, total supply is {total_supply}")]
    SupplyMismatch { held: u128, total_supply: u64 },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a mutating operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("no account for {address}")]
    UnknownAccount { address: Address },

    #[error("{address} holds {balance}, needs {amount}")]
    InsufficientBalance {
        address: Address,
        balance: u64,
        amount: u64,
    },

    #[error("{spender} may move {allowance} from {owner}, requested {amount}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        allowance: u64,
        amount: u64,
    },

    #[error("crediting {amount} would overflow the balance of {address}")]
    BalanceOverflow { address: Address, amount: u64 },
}

impl Rejection {
    /// Stable short code, matching the serialized `reason` tag.
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::UnknownAccount { .. } => "unknown_account",
            Rejection::InsufficientBalance { .. } => "insufficient_balance",
            Rejection::InsufficientAllowance { .. } => "insufficient_allowance",
            Rejection::BalanceOverflow { .. } => "balance_overflow",
        }
    }
}

/// Result of a mutating operation that did not fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// All writes were committed.
    Applied,
    /// Nothing was written.
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Outcome::Applied => None,
            Outcome::Rejected(reason) => Some(reason),
        }
    }
}

impl From<Outcome> for bool {
    fn from(outcome: Outcome) -> Self {
        outcome.is_applied()
    }
}

// ---------------------------------------------------------------------------
// WorkingSet
// ---------------------------------------------------------------------------

/// Staged copies of the records one operation touches.
///
/// Reads consult staged copies first, so an operation always sees its own
/// pending edits. Nothing reaches the store until the change set is
/// committed.
struct WorkingSet<'a, S> {
    store: &'a S,
    staged: BTreeMap<Address, Account>,
}

impl<'a, S: AccountStore> WorkingSet<'a, S> {
    fn new(store: &'a S) -> Self {
        Self {
            store,
            staged: BTreeMap::new(),
        }
    }

    /// The current record for `address`, or `None` if it has never existed.
    fn existing(&self, address: &Address) -> Result<Option<Account>, StoreError> {
        match self.staged.get(address) {
            Some(account) => Ok(Some(account.clone())),
            None => self.store.get(address),
        }
    }

    /// The current record for `address`, or a fresh empty one.
    fn get_or_default(&self, address: &Address) -> Result<Account, StoreError> {
        Ok(self
            .existing(address)?
            .unwrap_or_else(|| Account::empty(address.clone())))
    }

    /// Stage an empty record for `address` if none exists yet.
    fn materialize(&mut self, address: &Address) -> Result<(), StoreError> {
        if self.existing(address)?.is_none() {
            self.stage(Account::empty(address.clone()));
        }
        Ok(())
    }

    fn stage(&mut self, account: Account) {
        self.staged.insert(account.address.clone(), account);
    }

    fn into_changes(self) -> ChangeSet {
        ChangeSet {
            accounts: self.staged,
            token_info: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// The token ledger over a backing store `S`.
///
/// One value owns all token state for the life of the process. It is passed
/// explicitly to whatever dispatches calls. Mutating methods take `&mut self`,
/// so concurrent callers must serialize access (the node wraps it in a mutex).
#[derive(Debug)]
pub struct Ledger<S> {
    store: S,
    token: Option<TokenInfo>,
}

impl<S: AccountStore> Ledger<S> {
    /// Open a ledger over `store`, picking up a previous initialization if the
    /// store holds token metadata.
    pub fn open(store: S) -> LedgerResult<Self> {
        let token = store.token_info()?;
        match &token {
            Some(info) => tracing::info!(
                name = %info.name,
                ticker = %info.ticker,
                total_supply = info.total_supply,
                "ledger restored from store"
            ),
            None => tracing::debug!("ledger opened uninitialized"),
        }
        Ok(Self { store, token })
    }

    pub fn is_initialized(&self) -> bool {
        self.token.is_some()
    }

    /// Read-only access to the backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Token metadata, or `NotInitialized`.
    pub fn token_info(&self) -> LedgerResult<&TokenInfo> {
        self.token.as_ref().ok_or(LedgerError::NotInitialized)
    }

    // -- Mutating operations ------------------------------------------------

    /// Create the token and hand the whole supply to the caller.
    ///
    /// Overwrites any existing record of the creator. Returns the creator's
    /// address.
    ///
    /// # Errors
    ///
    /// [`LedgerError::AlreadyInitialized`] on a second call.
    pub fn initialize(
        &mut self,
        caller: &dyn CallerIdentity,
        name: impl Into<String>,
        ticker: impl Into<String>,
        total_supply: u64,
    ) -> LedgerResult<Address> {
        let creator = caller.current_caller()?;
        if let Some(existing) = &self.token {
            tracing::warn!(creator = %creator, ticker = %existing.ticker, "re-initialization refused");
            return Err(LedgerError::AlreadyInitialized {
                ticker: existing.ticker.clone(),
            });
        }

        let info = TokenInfo {
            name: name.into(),
            ticker: ticker.into(),
            total_supply,
        };

        let mut changes = ChangeSet::new();
        changes.put_account(Account::with_balance(creator.clone(), total_supply));
        changes.set_token_info(info.clone());
        self.store.commit(changes)?;

        tracing::info!(
            creator = %creator,
            name = %info.name,
            ticker = %info.ticker,
            total_supply,
            "ledger initialized"
        );
        self.token = Some(info);
        Ok(creator)
    }

    /// Move `amount` from the caller to `to`.
    ///
    /// Rejected when the caller has no account or too small a balance. The
    /// recipient is created on success if it did not exist.
    pub fn transfer(
        &mut self,
        caller: &dyn CallerIdentity,
        to: &Address,
        amount: u64,
    ) -> LedgerResult<Outcome> {
        self.token_info()?;
        let from = caller.current_caller()?;

        let mut ws = WorkingSet::new(&self.store);

        let Some(mut sender) = ws.existing(&from)? else {
            return Ok(rejected("transfer", Rejection::UnknownAccount { address: from }));
        };
        if sender.debit(amount).is_none() {
            return Ok(rejected(
                "transfer",
                Rejection::InsufficientBalance {
                    address: from,
                    balance: sender.balance,
                    amount,
                },
            ));
        }
        ws.stage(sender);

        // For a self-transfer this re-reads the debited copy.
        let mut recipient = ws.get_or_default(to)?;
        if recipient.credit(amount).is_none() {
            return Ok(rejected(
                "transfer",
                Rejection::BalanceOverflow {
                    address: to.clone(),
                    amount,
                },
            ));
        }
        ws.stage(recipient);

        let changes = ws.into_changes();
        self.store.commit(changes)?;
        tracing::debug!(from = %from, to = %to, amount, "transfer applied");
        Ok(Outcome::Applied)
    }

    /// Set the amount `spender` may move out of the caller's account.
    ///
    /// Replaces any previous allowance; it does not add to it. The owner must
    /// currently hold at least `amount`. The spender is created if it did not
    /// exist.
    pub fn approve(
        &mut self,
        caller: &dyn CallerIdentity,
        spender: &Address,
        amount: u64,
    ) -> LedgerResult<Outcome> {
        self.token_info()?;
        let owner_address = caller.current_caller()?;

        let mut ws = WorkingSet::new(&self.store);

        let Some(mut owner) = ws.existing(&owner_address)? else {
            return Ok(rejected(
                "approve",
                Rejection::UnknownAccount {
                    address: owner_address,
                },
            ));
        };
        // Compatibility quirk: approvals are capped by the owner's current
        // balance, even though transfer_from checks the balance again.
        if owner.balance < amount {
            return Ok(rejected(
                "approve",
                Rejection::InsufficientBalance {
                    address: owner_address,
                    balance: owner.balance,
                    amount,
                },
            ));
        }

        ws.materialize(spender)?;
        owner.set_allowance(spender.clone(), amount);
        ws.stage(owner);

        let changes = ws.into_changes();
        self.store.commit(changes)?;
        tracing::debug!(owner = %owner_address, spender = %spender, amount, "approval set");
        Ok(Outcome::Applied)
    }

    /// Move `amount` from `from` to `to` on the caller's allowance.
    ///
    /// Rejected when the caller or `from` has no account, when the allowance
    /// granted by `from` to the caller is below `amount`, or when `from` does
    /// not hold `amount`. On success the allowance shrinks by `amount`.
    pub fn transfer_from(
        &mut self,
        caller: &dyn CallerIdentity,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> LedgerResult<Outcome> {
        self.token_info()?;
        let spender = caller.current_caller()?;

        let mut ws = WorkingSet::new(&self.store);

        if ws.existing(&spender)?.is_none() {
            return Ok(rejected(
                "transfer_from",
                Rejection::UnknownAccount { address: spender },
            ));
        }
        let Some(mut source) = ws.existing(from)? else {
            return Ok(rejected(
                "transfer_from",
                Rejection::UnknownAccount {
                    address: from.clone(),
                },
            ));
        };

        let allowance = source.allowance(&spender);
        if allowance < amount {
            return Ok(rejected(
                "transfer_from",
                Rejection::InsufficientAllowance {
                    owner: from.clone(),
                    spender,
                    allowance,
                    amount,
                },
            ));
        }
        if source.debit(amount).is_none() {
            return Ok(rejected(
                "transfer_from",
                Rejection::InsufficientBalance {
                    address: from.clone(),
                    balance: source.balance,
                    amount,
                },
            ));
        }
        source.set_allowance(spender.clone(), allowance - amount);
        ws.stage(source);

        let mut recipient = ws.get_or_default(to)?;
        if recipient.credit(amount).is_none() {
            return Ok(rejected(
                "transfer_from",
                Rejection::BalanceOverflow {
                    address: to.clone(),
                    amount,
                },
            ));
        }
        ws.stage(recipient);

        let changes = ws.into_changes();
        self.store.commit(changes)?;
        tracing::debug!(
            spender = %spender,
            from = %from,
            to = %to,
            amount,
            "delegated transfer applied"
        );
        Ok(Outcome::Applied)
    }

    // -- Queries ------------------------------------------------------------

    /// Balance of `address`; zero when it has no account.
    pub fn balance_of(&self, address: &Address) -> LedgerResult<u64> {
        self.token_info()?;
        Ok(self.store.get(address)?.map_or(0, |a| a.balance))
    }

    /// Amount `spender` may move out of `owner`; zero when either is unknown.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> LedgerResult<u64> {
        self.token_info()?;
        Ok(self
            .store
            .get(owner)?
            .map_or(0, |account| account.allowance(spender)))
    }

    pub fn name(&self) -> LedgerResult<&str> {
        Ok(&self.token_info()?.name)
    }

    pub fn ticker(&self) -> LedgerResult<&str> {
        Ok(&self.token_info()?.ticker)
    }

    pub fn total_supply(&self) -> LedgerResult<u64> {
        Ok(self.token_info()?.total_supply)
    }

    /// The full record of `address`, if it exists.
    pub fn account(&self, address: &Address) -> LedgerResult<Option<Account>> {
        self.token_info()?;
        Ok(self.store.get(address)?)
    }

    /// Every account, ordered by address.
    pub fn accounts(&self) -> LedgerResult<Vec<Account>> {
        self.token_info()?;
        Ok(self.store.accounts()?)
    }

    // -- Integrity ----------------------------------------------------------

    /// Recompute the sum of all balances and check it equals the total
    /// supply. Returns the sum.
    pub fn audit_supply(&self) -> LedgerResult<u64> {
        let total_supply = self.total_supply()?;
        let held: u128 = self
            .store
            .accounts()?
            .iter()
            .map(|a| u128::from(a.balance))
            .sum();

        if held != u128::from(total_supply) {
            tracing::error!(held, total_supply, "supply invariant violated");
            return Err(LedgerError::SupplyMismatch { held, total_supply });
        }
        Ok(total_supply)
    }

    /// BLAKE3 Merkle root over all account records, sorted by address.
    ///
    /// ```text
    /// leaf = BLAKE3(address || bincode(account))
    /// node = BLAKE3(left || right)   (odd node is paired with itself)
    /// ```
    ///
    /// An empty ledger has the all-zero root.
    pub fn state_root(&self) -> LedgerResult<[u8; 32]> {
        let accounts = self.store.accounts()?;
        if accounts.is_empty() {
            return Ok([0u8; 32]);
        }

        let mut level = Vec::with_capacity(accounts.len());
        for account in &accounts {
            let record = bincode::serialize(account)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let mut preimage = Vec::with_capacity(account.address.as_str().len() + record.len());
            preimage.extend_from_slice(account.address.as_str().as_bytes());
            preimage.extend_from_slice(&record);
            level.push(<[u8; 32]>::from(blake3::hash(&preimage)));
        }

        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| {
                    let mut hasher = blake3::Hasher::new();
                    hasher.update(&pair[0]);
                    hasher.update(pair.get(1).unwrap_or(&pair[0]));
                    <[u8; 32]>::from(hasher.finalize())
                })
                .collect();
        }

        Ok(level[0])
    }
}

fn rejected(operation: &'static str, reason: Rejection) -> Outcome {
    tracing::debug!(operation, %reason, "operation rejected");
    Outcome::Rejected(reason)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
