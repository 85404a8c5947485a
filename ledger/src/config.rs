// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Ledger Constants
//!
//! Every fixed parameter of the ledger and its node lives here, so the
//! storage layout and the network defaults can be read in one place.

// ---------------------------------------------------------------------------
// Version
// ---------------------------------------------------------------------------

/// Version of the ledger semantics. Bump when an operation changes meaning.
pub const LEDGER_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Upper bound on address length in bytes. Addresses are opaque, but an
/// unbounded key would let a single request bloat the store.
pub const MAX_ADDRESS_LENGTH: usize = 256;

// ---------------------------------------------------------------------------
// Storage Layout
// ---------------------------------------------------------------------------

/// Name of the sled tree holding every ledger record.
pub const LEDGER_TREE: &str = "ledger";

/// Key prefix for account records. The address bytes follow the prefix.
pub const ACCOUNT_KEY_PREFIX: &[u8] = b"acct/";

/// Key of the token metadata record.
pub const TOKEN_INFO_KEY: &[u8] = b"meta/token_info";

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Default JSON-RPC / REST port.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// HTTP header carrying the authenticated caller address. The node expects
/// an authenticating proxy in front of it to set this.
pub const CALLER_HEADER: &str = "x-caller";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_are_distinct() {
        assert_ne!(DEFAULT_RPC_PORT, DEFAULT_METRICS_PORT);
    }

    #[test]
    fn token_info_key_cannot_collide_with_accounts() {
        assert!(!TOKEN_INFO_KEY.starts_with(ACCOUNT_KEY_PREFIX));
    }
}
