//! Chain-client integration tests against the in-process stub validator.
//!
//! These exercise the full synchronous surface (account creation, calls,
//! views, deploys, transfers, state patching) over real HTTP, without
//! needing the actual validator binary.

mod support;

use sandbox_harness::prelude::*;
use support::{init_test_logging, StubValidator, MASTER_ACCOUNT_ID};

fn counter_record(account_id: &str, value: i64) -> serde_json::Value {
    json!({ "Counter": { "account_id": account_id, "value": value } })
}

#[test]
fn created_accounts_get_distinct_ids_and_are_resolvable() {
    init_test_logging();
    let stub = StubValidator::spawn();
    let client = stub.client();

    let first = client.create_account("alice", None).unwrap();
    let second = client.create_account("alice", None).unwrap();

    assert_ne!(first.id(), second.id());
    assert!(first.id().starts_with("alice-"));
    assert!(first.id().ends_with(".test.near"));

    // Both accounts exist on chain with the default funding.
    assert!(first.balance().unwrap() > 0);
    assert_eq!(first.balance().unwrap(), second.balance().unwrap());
}

#[test]
fn get_or_create_caches_generated_ids_only() {
    let stub = StubValidator::spawn();
    let client = stub.client();

    // A base name always creates; two calls never collide.
    let first = client.get_or_create_account("worker").unwrap();
    let second = client.get_or_create_account("worker").unwrap();
    assert_ne!(first.id(), second.id());

    // A generated id hits the cache and maps to the same account.
    let cached = client.get_or_create_account(first.id()).unwrap();
    assert_eq!(cached.id(), first.id());
}

#[test]
fn subaccounts_nest_under_their_parent() {
    let stub = StubValidator::spawn();
    let client = stub.client();

    let parent = client.create_account("parent", None).unwrap();
    let child = parent.create_subaccount("child", Some(1_000)).unwrap();

    assert!(child.id().starts_with("child-"));
    assert!(child.id().ends_with(&format!(".{}", parent.id())));
    assert_eq!(child.balance().unwrap(), 1_000);
}

#[test]
fn counter_calls_and_views_round_trip() {
    init_test_logging();
    let stub = StubValidator::spawn();
    let client = stub.client();

    let alice = client.create_account("alice", None).unwrap();
    let counter_account = client.create_account("counter", None).unwrap();
    counter_account.deploy(b"\0asm-counter-bytecode").unwrap();
    let counter = counter_account.as_contract();

    // Two increments through account A: second result is first plus one.
    let first: i64 = counter
        .call_as(&alice, "increment", json!({}))
        .unwrap()
        .into_result()
        .unwrap()
        .parse()
        .unwrap();
    let second: i64 = counter
        .call_as(&alice, "increment", json!({}))
        .unwrap()
        .into_result()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(second, first + 1);

    // The view agrees with the last state-changing result.
    let viewed = counter.view("get_count", json!({})).unwrap();
    assert_eq!(viewed, json!(second));
}

#[test]
fn snapshot_restore_reverts_counter_state() {
    let stub = StubValidator::spawn();
    let client = stub.client();

    let counter_account = client.create_account("counter", None).unwrap();
    counter_account.deploy(b"\0asm-counter-bytecode").unwrap();
    let counter = counter_account.as_contract();

    // Snapshot taken before any increments: counter is zero.
    let snapshot = StateSnapshot::from_records(vec![counter_record(counter.id(), 0)]);

    counter.call("increment", json!({})).unwrap();
    counter.call("increment", json!({})).unwrap();
    assert_eq!(counter.view("get_count", json!({})).unwrap(), json!(2));

    client.patch_state(snapshot.records()).unwrap();
    assert_eq!(counter.view("get_count", json!({})).unwrap(), json!(0));
}

#[test]
fn restore_through_the_sandbox_facade_is_recoverable() {
    let stub = StubValidator::spawn();

    // A sandbox pointed at the stub's port can restore without any process.
    let reachable = Sandbox::builder().with_rpc_port(stub.port()).build().unwrap();
    let snapshot = StateSnapshot::from_records(vec![counter_record("counter.test.near", 7)]);
    reachable.restore_state(&snapshot).unwrap();

    // A sandbox pointed at a dead port reports the failure without
    // poisoning anything; the caller decides what to do next.
    let unreachable = Sandbox::builder().with_rpc_port(1).build().unwrap();
    let err = unreachable.restore_state(&snapshot).unwrap_err();
    assert!(matches!(err, HarnessError::RestoreFailed(_)));

    // The reachable one still works afterwards.
    reachable.restore_state(&snapshot).unwrap();
}

#[test]
fn failed_calls_produce_a_structured_report() {
    let stub = StubValidator::spawn();
    let client = stub.client();

    let contract_account = client.create_account("victim", None).unwrap();
    contract_account.deploy(b"\0asm-counter-bytecode").unwrap();
    let contract = contract_account.as_contract();

    let outcome = contract.call("boom", json!({ "n": 42 })).unwrap();
    assert!(!outcome.is_success());

    let failure = match outcome {
        CallOutcome::Failure(failure) => failure,
        CallOutcome::Success { .. } => panic!("expected a failure"),
    };
    assert!(failure.message.contains("Smart contract panicked: boom"));
    assert_eq!(failure.method_name.as_deref(), Some("boom"));
    assert_eq!(failure.args.as_deref(), Some(r#"{"n":42}"#));
    assert_eq!(failure.receiver_id.as_deref(), Some(contract.id()));
    assert!(failure.logs.iter().any(|l| l == "about to fail"));
    assert!(!failure.receipt_failures.is_empty());
}

#[test]
fn successful_calls_are_never_failure_shaped() {
    let stub = StubValidator::spawn();
    let client = stub.client();

    let counter_account = client.create_account("counter", None).unwrap();
    counter_account.deploy(b"\0asm-counter-bytecode").unwrap();

    let outcome = counter_account
        .call(counter_account.id(), "increment", json!({}))
        .unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.value(), Some("1"));
    // Logs are surfaced on success without affecting the decision.
    assert!(outcome.logs().iter().any(|l| l.contains("counter is now")));
}

#[test]
fn view_failures_surface_as_errors() {
    let stub = StubValidator::spawn();
    let client = stub.client();

    // No contract deployed anywhere near this account.
    let err = client
        .view_function("ghost.test.near", "get_count", json!({}))
        .unwrap_err();
    assert!(matches!(err, HarnessError::Rpc(RpcError::Server { .. })));
}

#[test]
fn unknown_senders_are_rejected_with_context() {
    let stub = StubValidator::spawn();
    let client = stub.client();

    let err = client
        .call_function("stranger.near", "any.test.near", "noop", json!({}), 0, None)
        .unwrap_err();
    assert!(matches!(err, HarnessError::UnknownAccount(_)));
}

#[test]
fn transfers_move_funds() {
    let stub = StubValidator::spawn();
    let client = stub.client();

    let alice = client.create_account("alice", Some(10_000)).unwrap();
    let bob = client.create_account("bob", Some(500)).unwrap();

    alice.transfer(bob.id(), 2_500).unwrap();

    assert_eq!(alice.balance().unwrap(), 7_500);
    assert_eq!(bob.balance().unwrap(), 3_000);
}

#[test]
fn master_account_is_usable_without_creation() {
    let stub = StubValidator::spawn();
    let client = stub.client();

    assert_eq!(client.master_account_id(), MASTER_ACCOUNT_ID);
    // The master identity is pre-registered; viewing it works immediately.
    assert!(client.balance(MASTER_ACCOUNT_ID).unwrap() > 0);
}

#[test]
fn threaded_calls_through_one_client_do_not_interleave() {
    let stub = StubValidator::spawn();
    let client = stub.client();

    // Each thread drives its own counter contract through the shared client;
    // every returned value must belong to exactly one submission.
    let mut threads = Vec::new();
    for name in ["left", "right"] {
        let client = client.clone();
        threads.push(std::thread::spawn(move || {
            let account = client.create_account(name, None).unwrap();
            account.deploy(b"\0asm-counter-bytecode").unwrap();
            let contract = account.as_contract();

            let mut seen = Vec::new();
            for _ in 0..5 {
                let value: i64 = contract
                    .call("increment", json!({}))
                    .unwrap()
                    .into_result()
                    .unwrap()
                    .parse()
                    .unwrap();
                seen.push(value);
            }
            seen
        }));
    }

    for thread in threads {
        assert_eq!(thread.join().unwrap(), vec![1, 2, 3, 4, 5]);
    }
}
