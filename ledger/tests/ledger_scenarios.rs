//! Integration tests for the token ledger.
//!
//! These run whole operation sequences against both store backends and check
//! the ledger-wide invariants: balances always sum to the total supply, failed
//! calls never write, and a persisted ledger comes back exactly as it was.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use token_ledger::{
    AccountStore, Address, Ledger, LedgerError, MemoryStore, Outcome, Rejection, SledStore,
    StaticCaller,
};

fn addr(s: &str) -> Address {
    Address::new(s).unwrap()
}

fn who(s: &str) -> StaticCaller {
    StaticCaller::parse(s).unwrap()
}

/// Walks the reference A/B/C/D scenario and checks every step.
fn run_reference_scenario<S: AccountStore>(store: S) -> Ledger<S> {
    let mut ledger = Ledger::open(store).unwrap();

    // 1. A creates the token.
    let creator = ledger.initialize(&who("A"), "Coin", "COIN", 1000).unwrap();
    assert_eq!(creator, addr("A"));
    assert_eq!(ledger.balance_of(&addr("A")).unwrap(), 1000);
    assert_eq!(ledger.total_supply().unwrap(), 1000);

    // 2. A pays B.
    assert!(ledger.transfer(&who("A"), &addr("B"), 300).unwrap().is_applied());
    assert_eq!(ledger.balance_of(&addr("A")).unwrap(), 700);
    assert_eq!(ledger.balance_of(&addr("B")).unwrap(), 300);

    // 3. B lets C spend 100.
    assert!(ledger.approve(&who("B"), &addr("C"), 100).unwrap().is_applied());
    assert_eq!(ledger.allowance(&addr("B"), &addr("C")).unwrap(), 100);

    // 4. C overreaches.
    let outcome = ledger
        .transfer_from(&who("C"), &addr("B"), &addr("D"), 150)
        .unwrap();
    assert!(!outcome.is_applied());
    assert_eq!(ledger.balance_of(&addr("B")).unwrap(), 300);
    assert_eq!(ledger.balance_of(&addr("D")).unwrap(), 0);
    assert_eq!(ledger.allowance(&addr("B"), &addr("C")).unwrap(), 100);

    // 5. C spends exactly the allowance.
    let outcome = ledger
        .transfer_from(&who("C"), &addr("B"), &addr("D"), 100)
        .unwrap();
    assert!(outcome.is_applied());
    assert_eq!(ledger.balance_of(&addr("B")).unwrap(), 200);
    assert_eq!(ledger.balance_of(&addr("D")).unwrap(), 100);
    assert_eq!(ledger.allowance(&addr("B"), &addr("C")).unwrap(), 0);

    assert_eq!(ledger.audit_supply().unwrap(), 1000);
    ledger
}

// ---------------------------------------------------------------------------
// Reference scenario
// ---------------------------------------------------------------------------

#[test]
fn reference_scenario_in_memory() {
    run_reference_scenario(MemoryStore::new());
}

#[test]
fn reference_scenario_on_sled() {
    let store = SledStore::open_temporary().unwrap();
    let ledger = run_reference_scenario(store);
    assert_eq!(ledger.store().account_count(), 4);
}

#[test]
fn both_backends_reach_the_same_state_root() {
    let memory = run_reference_scenario(MemoryStore::new());
    let sled = run_reference_scenario(SledStore::open_temporary().unwrap());
    assert_eq!(memory.state_root().unwrap(), sled.state_root().unwrap());
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn reopened_ledger_keeps_token_and_balances() {
    let dir = tempfile::tempdir().expect("tempdir");
    let root_before = {
        let store = SledStore::open(dir.path()).unwrap();
        let ledger = run_reference_scenario(store);
        ledger.state_root().unwrap()
    };

    let mut ledger = Ledger::open(SledStore::open(dir.path()).unwrap()).unwrap();
    assert!(ledger.is_initialized());
    assert_eq!(ledger.name().unwrap(), "Coin");
    assert_eq!(ledger.ticker().unwrap(), "COIN");
    assert_eq!(ledger.balance_of(&addr("D")).unwrap(), 100);
    assert_eq!(ledger.state_root().unwrap(), root_before);

    // The initialization guard survives a restart.
    assert!(matches!(
        ledger.initialize(&who("Z"), "Again", "AGN", 1),
        Err(LedgerError::AlreadyInitialized { .. })
    ));
}

// ---------------------------------------------------------------------------
// Invariant sweep
// ---------------------------------------------------------------------------

const HOLDERS: [&str; 5] = ["alice", "bob", "carol", "dave", "erin"];

/// Applies a long random sequence of operations and checks, after every call,
/// that balances still sum to the supply and rejected calls wrote nothing.
fn sweep<S: AccountStore>(store: S, seed: u64, steps: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ledger = Ledger::open(store).unwrap();
    ledger.initialize(&who("alice"), "Sweep", "SWP", 10_000).unwrap();

    for _ in 0..steps {
        let caller = HOLDERS[rng.gen_range(0..HOLDERS.len())];
        let a = addr(HOLDERS[rng.gen_range(0..HOLDERS.len())]);
        let b = addr(HOLDERS[rng.gen_range(0..HOLDERS.len())]);
        let amount = rng.gen_range(0..4_000u64);

        let root_before = ledger.state_root().unwrap();
        let outcome = match rng.gen_range(0..3) {
            0 => ledger.transfer(&who(caller), &a, amount).unwrap(),
            1 => ledger.approve(&who(caller), &a, amount).unwrap(),
            _ => ledger.transfer_from(&who(caller), &a, &b, amount).unwrap(),
        };

        if let Outcome::Rejected(_) = outcome {
            assert_eq!(ledger.state_root().unwrap(), root_before);
        }
        assert_eq!(ledger.audit_supply().unwrap(), 10_000);
    }
}

#[test]
fn random_operations_preserve_supply_in_memory() {
    for seed in 0..8 {
        sweep(MemoryStore::new(), seed, 300);
    }
}

#[test]
fn random_operations_preserve_supply_on_sled() {
    sweep(SledStore::open_temporary().unwrap(), 42, 200);
}

// ---------------------------------------------------------------------------
// Delegation edge cases
// ---------------------------------------------------------------------------

#[test]
fn allowance_larger_than_balance_cannot_overdraw() {
    let mut ledger = Ledger::open(MemoryStore::new()).unwrap();
    ledger.initialize(&who("owner"), "Coin", "COIN", 100).unwrap();
    ledger.approve(&who("owner"), &addr("spender"), 100).unwrap();
    ledger.transfer(&who("owner"), &addr("elsewhere"), 60).unwrap();

    let outcome = ledger
        .transfer_from(&who("spender"), &addr("owner"), &addr("spender"), 100)
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Rejected(Rejection::InsufficientBalance {
            address: addr("owner"),
            balance: 40,
            amount: 100,
        })
    );

    // The spender can still take what is actually there.
    assert!(ledger
        .transfer_from(&who("spender"), &addr("owner"), &addr("spender"), 40)
        .unwrap()
        .is_applied());
    assert_eq!(ledger.allowance(&addr("owner"), &addr("spender")).unwrap(), 60);
    assert_eq!(ledger.balance_of(&addr("owner")).unwrap(), 0);
}

#[test]
fn allowances_are_per_owner_spender_pair() {
    let mut ledger = Ledger::open(MemoryStore::new()).unwrap();
    ledger.initialize(&who("alice"), "Coin", "COIN", 1000).unwrap();
    ledger.transfer(&who("alice"), &addr("bob"), 500).unwrap();

    ledger.approve(&who("alice"), &addr("carol"), 10).unwrap();
    ledger.approve(&who("bob"), &addr("carol"), 20).unwrap();
    ledger.approve(&who("alice"), &addr("dave"), 30).unwrap();

    assert_eq!(ledger.allowance(&addr("alice"), &addr("carol")).unwrap(), 10);
    assert_eq!(ledger.allowance(&addr("bob"), &addr("carol")).unwrap(), 20);
    assert_eq!(ledger.allowance(&addr("alice"), &addr("dave")).unwrap(), 30);
    assert_eq!(ledger.allowance(&addr("carol"), &addr("alice")).unwrap(), 0);

    ledger
        .transfer_from(&who("carol"), &addr("alice"), &addr("carol"), 10)
        .unwrap();
    assert_eq!(ledger.allowance(&addr("alice"), &addr("carol")).unwrap(), 0);
    assert_eq!(ledger.allowance(&addr("bob"), &addr("carol")).unwrap(), 20);
    assert_eq!(ledger.allowance(&addr("alice"), &addr("dave")).unwrap(), 30);
}
