//! End-to-end tests against a real sandbox validator.
//!
//! These need a `near-sandbox`-compatible binary (configured path,
//! `SANDBOX_BIN`, or on `PATH`) and are ignored by default:
//!
//! ```text
//! cargo test -p sandbox_harness --test sandbox_e2e -- --ignored
//! ```

use sandbox_harness::prelude::*;

#[test]
#[ignore = "requires a sandbox validator binary"]
fn start_stop_start_ends_healthy() {
    let sandbox = SandboxBuilder::from_env().build().unwrap();

    sandbox.start().unwrap();
    assert!(sandbox.is_running());

    sandbox.stop().unwrap();
    assert!(!sandbox.is_running());

    sandbox.start().unwrap();
    assert!(sandbox.is_running());

    sandbox.stop().unwrap();
}

#[test]
#[ignore = "requires a sandbox validator binary"]
fn start_is_a_no_op_when_already_running() {
    let sandbox = Sandbox::builder().build().unwrap();
    sandbox.start().unwrap();

    // Second start must detect the healthy process and return immediately.
    let started = std::time::Instant::now();
    sandbox.start().unwrap();
    assert!(started.elapsed() < std::time::Duration::from_secs(3));
    assert!(sandbox.is_running());

    sandbox.stop().unwrap();
}

#[test]
#[ignore = "requires a sandbox validator binary"]
fn snapshot_round_trip_reverts_balances() {
    let sandbox = Sandbox::builder().build().unwrap();
    sandbox.start().unwrap();

    let client = ChainClient::connect(&sandbox).unwrap();
    let alice = client.create_account("alice", None).unwrap();
    let bob = client.create_account("bob", None).unwrap();
    let alice_before = alice.balance().unwrap();
    let bob_before = bob.balance().unwrap();

    // Dump immediately followed by restore must leave reads identical.
    let snapshot = sandbox.dump_state().unwrap();
    assert!(!snapshot.is_empty());
    sandbox.restore_state(&snapshot).unwrap();
    assert_eq!(alice.balance().unwrap(), alice_before);

    // A mutation after the snapshot reverts on restore; unrelated values
    // stay put.
    alice
        .transfer(bob.id(), 1_000_000_000_000_000_000_000_000)
        .unwrap();
    assert_ne!(bob.balance().unwrap(), bob_before);

    sandbox.restore_state(&snapshot).unwrap();
    assert_eq!(alice.balance().unwrap(), alice_before);
    assert_eq!(bob.balance().unwrap(), bob_before);

    sandbox.stop().unwrap();
}

#[test]
#[ignore = "requires a sandbox validator binary"]
fn reset_returns_the_chain_to_genesis() {
    let sandbox = Sandbox::builder().build().unwrap();
    sandbox.start().unwrap();

    let client = ChainClient::connect(&sandbox).unwrap();
    let alice = client.create_account("alice", None).unwrap();
    assert!(alice.balance().is_ok());

    sandbox.reset_state().unwrap();
    assert!(sandbox.is_running());

    // The account was created after genesis, so it is gone after the reset.
    let fresh_client = ChainClient::connect(&sandbox).unwrap();
    assert!(fresh_client.balance(alice.id()).is_err());
}
