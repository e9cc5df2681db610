use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::{debug, trace};
use serde_json::{json, Value};

use super::{RpcError, RpcResult, JSON_RPC_VERSION};
use crate::types::{
    AccessKeyView, AccountView, CallViewResult, FinalOutcome, SignedTransaction, StatusResponse,
};

/// Default timeout applied to every request.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC 2.0 client bound to one endpoint.
///
/// Cheap to clone; the underlying HTTP connection pool is shared.
#[derive(Debug, Clone)]
pub struct RpcClient {
    endpoint: String,
    http: reqwest::Client,
}

impl RpcClient {
    /// Client with the default timeout.
    pub fn new(endpoint: impl Into<String>) -> RpcResult<Self> {
        Self::with_timeout(endpoint, DEFAULT_RPC_TIMEOUT)
    }

    /// Client with a custom per-request timeout.
    ///
    /// Health probing uses a ~1s timeout here so a hung probe cannot stall
    /// a startup polling loop.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> RpcResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    /// Endpoint this client talks to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Perform one JSON-RPC call and return its `result` member.
    pub async fn call(&self, method: &str, params: Value) -> RpcResult<Value> {
        if log::log_enabled!(log::Level::Trace) {
            trace!("rpc call: {method}");
        }
        let request = json!({
            "jsonrpc": JSON_RPC_VERSION,
            "id": method,
            "method": method,
            "params": params,
        });

        let response = self.http.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RpcError::Http(status.as_u16()));
        }

        let body: Value = response.json().await?;
        parse_response(body)
    }

    /// Lightweight node status query; doubles as the health probe.
    pub async fn status(&self) -> RpcResult<StatusResponse> {
        let result = self.call("status", json!([])).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Hash of the most recent block, for anchoring transactions.
    pub async fn latest_block_hash(&self) -> RpcResult<String> {
        Ok(self.status().await?.sync_info.latest_block_hash)
    }

    /// Submit a signed transaction and wait for its final outcome.
    pub async fn broadcast_tx_commit(&self, tx: &SignedTransaction) -> RpcResult<FinalOutcome> {
        let encoded = tx.to_base64()?;
        debug!(
            "broadcasting transaction from {} to {}",
            tx.transaction.signer_id, tx.transaction.receiver_id
        );
        let result = self.call("broadcast_tx_commit", json!([encoded])).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Read-only contract call, executed without a signature.
    pub async fn view_call(
        &self,
        contract_id: &str,
        method_name: &str,
        args: &Value,
    ) -> RpcResult<CallViewResult> {
        let result = self
            .call(
                "query",
                json!({
                    "request_type": "call_function",
                    "finality": "optimistic",
                    "account_id": contract_id,
                    "method_name": method_name,
                    "args_base64": BASE64.encode(args.to_string().as_bytes()),
                }),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Account metadata (balance, storage, code hash).
    pub async fn view_account(&self, account_id: &str) -> RpcResult<AccountView> {
        let result = self
            .call(
                "query",
                json!({
                    "request_type": "view_account",
                    "finality": "optimistic",
                    "account_id": account_id,
                }),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Access-key state; used to prime nonce cursors.
    pub async fn view_access_key(
        &self,
        account_id: &str,
        public_key: &str,
    ) -> RpcResult<AccessKeyView> {
        let result = self
            .call(
                "query",
                json!({
                    "request_type": "view_access_key",
                    "finality": "optimistic",
                    "account_id": account_id,
                    "public_key": public_key,
                }),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Privileged state patch: replace matching ledger records wholesale.
    ///
    /// Success is an empty object response; anything else is reported as an
    /// error for the caller to act on.
    pub async fn patch_state(&self, records: &[Value]) -> RpcResult<()> {
        let result = self
            .call("sandbox_patch_state", json!({ "records": records }))
            .await?;
        match &result {
            Value::Object(map) if map.is_empty() => Ok(()),
            _ => Err(RpcError::UnexpectedResponse(result)),
        }
    }
}

/// Split a JSON-RPC response envelope into result or error.
fn parse_response(body: Value) -> RpcResult<Value> {
    if let Some(error) = body.get("error") {
        return Err(RpcError::Server {
            code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
            message: error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
            data: error.get("data").cloned(),
        });
    }
    match body.get("result") {
        Some(result) => Ok(result.clone()),
        None => Err(RpcError::MissingResult),
    }
}
