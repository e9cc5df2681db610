//! In-process stub validator for integration tests.
//!
//! Serves the JSON-RPC surface the harness depends on (`status`, `query`,
//! `broadcast_tx_commit`, `sandbox_patch_state`) over a real HTTP listener,
//! with just enough chain semantics for the tests: balances, nonces, one
//! deployable "counter" contract per account. Runs on its own runtime thread
//! so the harness side can exercise its own execution context.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Json, State};
use axum::routing::post;
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parking_lot::Mutex;
use sandbox_harness::prelude::*;
use serde_json::{json, Value};

/// Seed for the stub's master key; deterministic across test runs.
const MASTER_SEED: [u8; 32] = [42u8; 32];

/// Master account pre-funded in the stub ledger.
pub const MASTER_ACCOUNT_ID: &str = "test.near";

/// Route harness logs into the test harness output.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Default)]
struct ChainState {
    balances: HashMap<String, u128>,
    nonces: HashMap<String, u64>,
    counters: HashMap<String, i64>,
    deployed: HashSet<String>,
    height: u64,
}

type Shared = Arc<Mutex<ChainState>>;

/// A stub validator bound to a random localhost port.
pub struct StubValidator {
    endpoint: String,
    port: u16,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl StubValidator {
    /// Spawn the stub on a background runtime thread.
    pub fn spawn() -> Self {
        let (addr_tx, addr_rx) = std::sync::mpsc::channel::<SocketAddr>();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let thread = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("stub runtime");
            runtime.block_on(async move {
                let mut state = ChainState::default();
                state
                    .balances
                    .insert(MASTER_ACCOUNT_ID.to_string(), u128::MAX / 2);
                let shared: Shared = Arc::new(Mutex::new(state));

                let app = Router::new().route("/", post(handle)).with_state(shared);
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind stub listener");
                addr_tx
                    .send(listener.local_addr().expect("stub addr"))
                    .expect("report stub addr");

                axum::serve(listener, app)
                    .with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .expect("serve stub");
            });
        });

        let addr = addr_rx.recv().expect("stub never reported its address");
        StubValidator {
            endpoint: format!("http://localhost:{}", addr.port()),
            port: addr.port(),
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Secret key of the stub's master account, in text encoding.
    pub fn master_secret_key() -> String {
        KeyPair::from_seed(MASTER_SEED).secret_key()
    }

    /// Chain client bound to this stub, signing as the master account.
    pub fn client(&self) -> ChainClient {
        ChainClient::new(&self.endpoint, MASTER_ACCOUNT_ID, &Self::master_secret_key())
            .expect("stub client")
    }
}

impl Drop for StubValidator {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

async fn handle(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let id = body.get("id").cloned().unwrap_or(Value::Null);
    let method = body.get("method").and_then(Value::as_str).unwrap_or("");
    let params = body.get("params").cloned().unwrap_or(Value::Null);

    let response = match method {
        "status" => status(&state),
        "query" => query(&state, &params),
        "broadcast_tx_commit" => broadcast(&state, &params),
        "sandbox_patch_state" => patch_state(&state, &params),
        other => Err((-32601, format!("Method '{other}' in request was not found"))),
    };

    Json(match response {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err((code, message)) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": code, "message": message }
        }),
    })
}

type RpcOutcome = Result<Value, (i64, String)>;

fn status(state: &Shared) -> RpcOutcome {
    let mut state = state.lock();
    state.height += 1;
    Ok(json!({
        "chain_id": "localnet",
        "sync_info": {
            "latest_block_hash": format!("BLockHash{}", state.height),
            "latest_block_height": state.height,
        }
    }))
}

fn query(state: &Shared, params: &Value) -> RpcOutcome {
    let request_type = params
        .get("request_type")
        .and_then(Value::as_str)
        .unwrap_or("");
    let account_id = params
        .get("account_id")
        .and_then(Value::as_str)
        .unwrap_or("");
    let state = state.lock();

    match request_type {
        "view_access_key" => Ok(json!({
            "nonce": state.nonces.get(account_id).copied().unwrap_or(0),
            "permission": "FullAccess",
        })),
        "view_account" => match state.balances.get(account_id) {
            Some(balance) => Ok(json!({
                "amount": balance.to_string(),
                "storage_usage": 100,
            })),
            None => Err((-32000, format!("account {account_id} does not exist"))),
        },
        "call_function" => {
            if !state.deployed.contains(account_id) {
                return Err((-32000, format!("no contract code on {account_id}")));
            }
            let method_name = params
                .get("method_name")
                .and_then(Value::as_str)
                .unwrap_or("");
            match method_name {
                "get_count" => {
                    let count = state.counters.get(account_id).copied().unwrap_or(0);
                    Ok(json!({
                        "result": count.to_string().into_bytes(),
                        "logs": [],
                        "block_height": state.height,
                    }))
                }
                other => Err((-32000, format!("method {other} not found"))),
            }
        }
        other => Err((-32602, format!("unknown request_type {other}"))),
    }
}

fn broadcast(state: &Shared, params: &Value) -> RpcOutcome {
    let encoded = params
        .get(0)
        .and_then(Value::as_str)
        .ok_or((-32602, "expected [signed_tx_base64]".to_string()))?;
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| (-32700, format!("bad base64: {e}")))?;
    let signed: Value =
        serde_json::from_slice(&bytes).map_err(|e| (-32700, format!("bad tx json: {e}")))?;
    let tx = signed
        .get("transaction")
        .cloned()
        .ok_or((-32602, "missing transaction".to_string()))?;

    let signer = tx.get("signer_id").and_then(Value::as_str).unwrap_or("");
    let receiver = tx.get("receiver_id").and_then(Value::as_str).unwrap_or("");
    let nonce = tx.get("nonce").and_then(Value::as_u64).unwrap_or(0);
    let empty = Vec::new();
    let actions = tx
        .get("actions")
        .and_then(Value::as_array)
        .unwrap_or(&empty);

    let mut chain = state.lock();
    chain.nonces.insert(signer.to_string(), nonce);

    let mut status = json!({ "SuccessValue": "" });
    let mut logs: Vec<String> = Vec::new();

    for action in actions {
        if action.as_str() == Some("CreateAccount") {
            chain.balances.entry(receiver.to_string()).or_insert(0);
            continue;
        }
        if let Some(transfer) = action.get("Transfer") {
            let amount: u128 = transfer
                .get("deposit")
                .and_then(Value::as_str)
                .and_then(|d| d.parse().ok())
                .unwrap_or(0);
            if let Some(balance) = chain.balances.get_mut(signer) {
                *balance = balance.saturating_sub(amount);
            }
            *chain.balances.entry(receiver.to_string()).or_insert(0) += amount;
            continue;
        }
        if action.get("AddKey").is_some() {
            continue;
        }
        if action.get("DeployContract").is_some() {
            chain.deployed.insert(receiver.to_string());
            continue;
        }
        if let Some(call) = action.get("FunctionCall") {
            let method_name = call.get("method_name").and_then(Value::as_str).unwrap_or("");
            if !chain.deployed.contains(receiver) {
                status = failure_status("cannot call a contract-less account");
                break;
            }
            match method_name {
                "increment" => {
                    let count = chain.counters.entry(receiver.to_string()).or_insert(0);
                    *count += 1;
                    logs.push(format!("counter is now {count}"));
                    status = json!({ "SuccessValue": BASE64.encode(count.to_string()) });
                }
                "boom" => {
                    logs.push("about to fail".to_string());
                    status = failure_status("Smart contract panicked: boom");
                    break;
                }
                other => {
                    status = failure_status(&format!("MethodResolveError: {other}"));
                    break;
                }
            }
        }
    }

    Ok(json!({
        "final_execution_status": "EXECUTED_OPTIMISTIC",
        "status": status.clone(),
        "transaction": {
            "signer_id": signer,
            "receiver_id": receiver,
            "nonce": nonce,
            "actions": actions,
        },
        "transaction_outcome": {
            "id": "StubTxHash11111111111111111111111",
            "outcome": {
                "executor_id": signer,
                "logs": [],
                "status": { "SuccessReceiptId": "StubReceipt1111111111111111111111" },
            }
        },
        "receipts_outcome": [
            {
                "id": "StubReceipt1111111111111111111111",
                "outcome": {
                    "executor_id": receiver,
                    "logs": logs,
                    "status": status,
                }
            }
        ],
    }))
}

fn failure_status(message: &str) -> Value {
    json!({
        "Failure": {
            "ActionError": {
                "index": 0,
                "kind": { "FunctionCallError": { "ExecutionError": message } }
            }
        }
    })
}

fn patch_state(state: &Shared, params: &Value) -> RpcOutcome {
    let records = params
        .get("records")
        .and_then(Value::as_array)
        .ok_or((-32602, "expected records array".to_string()))?;

    let mut chain = state.lock();
    for record in records {
        if let Some(counter) = record.get("Counter") {
            let account = counter
                .get("account_id")
                .and_then(Value::as_str)
                .unwrap_or("");
            let value = counter.get("value").and_then(Value::as_i64).unwrap_or(0);
            chain.counters.insert(account.to_string(), value);
        }
        if let Some(account) = record.get("Account") {
            let id = account
                .get("account_id")
                .and_then(Value::as_str)
                .unwrap_or("");
            let amount: u128 = account
                .get("amount")
                .and_then(Value::as_str)
                .and_then(|a| a.parse().ok())
                .unwrap_or(0);
            chain.balances.insert(id.to_string(), amount);
        }
    }
    Ok(json!({}))
}
