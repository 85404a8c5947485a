// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Caller Identity
//!
//! Every mutating ledger operation acts on behalf of whoever invoked it. The
//! ledger never derives that identity itself: the dispatch layer hands in a
//! [`CallerIdentity`] which has already authenticated the caller.
//!
//! A missing identity is a configuration fault, never a business rule, so it
//! surfaces as an error that aborts the call.

use crate::account::{Address, AddressError};

/// Errors raised while resolving the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("no caller identity supplied")]
    Missing,

    #[error("caller identity is malformed: {0}")]
    Malformed(#[from] AddressError),
}

/// Source of the authenticated address invoking an operation.
pub trait CallerIdentity {
    /// The address of the current caller. Must never yield an empty identity.
    fn current_caller(&self) -> Result<Address, IdentityError>;
}

/// A caller fixed at construction. Used by the node once the request has been
/// authenticated, by offline tooling, and by tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticCaller(Address);

impl StaticCaller {
    pub fn new(address: Address) -> Self {
        Self(address)
    }

    /// Parse a raw identity string, rejecting empty or oversized values.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        Ok(Self(Address::new(raw)?))
    }

    pub fn address(&self) -> &Address {
        &self.0
    }
}

impl CallerIdentity for StaticCaller {
    fn current_caller(&self) -> Result<Address, IdentityError> {
        Ok(self.0.clone())
    }
}

/// An identity that was never established. Resolving it always fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct Anonymous;

impl CallerIdentity for Anonymous {
    fn current_caller(&self) -> Result<Address, IdentityError> {
        Err(IdentityError::Missing)
    }
}

impl<T: CallerIdentity + ?Sized> CallerIdentity for &T {
    fn current_caller(&self) -> Result<Address, IdentityError> {
        (**self).current_caller()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_caller_resolves_to_its_address() {
        let caller = StaticCaller::parse("alice").unwrap();
        assert_eq!(caller.current_caller().unwrap().as_str(), "alice");
    }

    #[test]
    fn blank_identity_is_malformed() {
        assert!(matches!(
            StaticCaller::parse(""),
            Err(IdentityError::Malformed(AddressError::Empty))
        ));
    }

    #[test]
    fn anonymous_never_resolves() {
        assert_eq!(Anonymous.current_caller(), Err(IdentityError::Missing));
    }
}
