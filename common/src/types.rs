//! Wire types exchanged with the sandbox validator.
//!
//! The submission side ([`Action`], [`Transaction`], [`SignedTransaction`])
//! uses this crate's pinned convention: transactions are canonical JSON,
//! signed with ed25519 over the SHA-256 digest of that encoding, and shipped
//! base64-encoded. The response side mirrors the execution-outcome JSON the
//! validator produces.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::KeyPair;

/// Token amounts, in the chain's smallest indivisible unit.
pub type Balance = u128;

/// Gas units attached to a function call.
pub type Gas = u64;

/// A single operation inside a transaction.
///
/// Amounts are serialized as decimal strings so values above 2^53 survive
/// JSON round trips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Action {
    /// Create the receiver account.
    CreateAccount,
    /// Move tokens from signer to receiver.
    Transfer {
        /// Amount in the smallest unit, as a decimal string.
        deposit: String,
    },
    /// Install contract code on the receiver account.
    DeployContract {
        /// Base64-encoded contract bytecode.
        code: String,
    },
    /// Invoke a method on the receiver's contract.
    FunctionCall {
        /// Method to invoke.
        method_name: String,
        /// Base64-encoded JSON arguments.
        args: String,
        /// Gas attached to the call.
        gas: Gas,
        /// Deposit attached to the call, as a decimal string.
        deposit: String,
    },
    /// Register a full-access key on the receiver account.
    AddKey {
        /// Public key in text encoding.
        public_key: String,
    },
}

impl Action {
    /// Build a `FunctionCall` action from JSON arguments.
    pub fn function_call(method_name: &str, args: &serde_json::Value, gas: Gas, deposit: Balance) -> Self {
        Action::FunctionCall {
            method_name: method_name.to_string(),
            args: BASE64.encode(args.to_string().as_bytes()),
            gas,
            deposit: deposit.to_string(),
        }
    }
}

/// An unsigned transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Account paying for and signing the transaction.
    pub signer_id: String,
    /// Signer's public key in text encoding.
    pub public_key: String,
    /// Access-key nonce; must strictly increase per key.
    pub nonce: u64,
    /// Account the actions apply to.
    pub receiver_id: String,
    /// Recent block hash anchoring the transaction.
    pub block_hash: String,
    /// Ordered operations to execute.
    pub actions: Vec<Action>,
}

impl Transaction {
    /// SHA-256 digest of the canonical JSON encoding; the byte sequence that
    /// gets signed.
    pub fn signing_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        let encoded = serde_json::to_vec(self)?;
        Ok(Sha256::digest(&encoded).to_vec())
    }

    /// Sign with `pair`, consuming the transaction.
    pub fn sign(self, pair: &KeyPair) -> Result<SignedTransaction, serde_json::Error> {
        let payload = self.signing_payload()?;
        let signature = pair.sign(&payload);
        Ok(SignedTransaction {
            transaction: self,
            signature,
        })
    }
}

/// A transaction plus its signature, ready for submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransaction {
    /// The signed payload.
    pub transaction: Transaction,
    /// Signature over [`Transaction::signing_payload`], in text encoding.
    pub signature: String,
}

impl SignedTransaction {
    /// Base64 form used as the `broadcast_tx_commit` parameter.
    pub fn to_base64(&self) -> Result<String, serde_json::Error> {
        Ok(BASE64.encode(serde_json::to_vec(self)?))
    }
}

// ---------------------------------------------------------------------------
// Execution outcome views
// ---------------------------------------------------------------------------

/// Status of a transaction or of a single receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExecutionStatus {
    /// Completed; carries the base64-encoded return value.
    SuccessValue(String),
    /// Completed by handing off to the given receipt.
    SuccessReceiptId(String),
    /// Failed; carries the structured error the runtime produced.
    Failure(serde_json::Value),
    /// Not (yet) known.
    #[default]
    Unknown,
}

/// Outcome of one execution step (transaction or receipt).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionOutcome {
    /// Account that executed the step.
    #[serde(default)]
    pub executor_id: Option<String>,
    /// Gas burnt by the step.
    #[serde(default)]
    pub gas_burnt: Option<u64>,
    /// Log lines emitted during the step.
    #[serde(default)]
    pub logs: Vec<String>,
    /// Step status.
    #[serde(default)]
    pub status: ExecutionStatus,
    /// Receipts spawned by the step.
    #[serde(default)]
    pub receipt_ids: Vec<String>,
    /// Tokens burnt, as a decimal string.
    #[serde(default)]
    pub tokens_burnt: Option<String>,
}

/// An [`ExecutionOutcome`] with its identifying hash.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutcomeWithId {
    /// Hash of the transaction or receipt.
    #[serde(default)]
    pub id: Option<String>,
    /// The outcome itself.
    #[serde(default)]
    pub outcome: ExecutionOutcome,
}

/// The transaction as echoed back inside the final outcome.
///
/// Actions stay loosely typed; the harness only digs out `FunctionCall`
/// fields when reconstructing a failure report.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransactionView {
    /// Signing account.
    #[serde(default)]
    pub signer_id: Option<String>,
    /// Target account.
    #[serde(default)]
    pub receiver_id: Option<String>,
    /// Transaction hash.
    #[serde(default)]
    pub hash: Option<String>,
    /// Nonce used.
    #[serde(default)]
    pub nonce: Option<u64>,
    /// Signer public key.
    #[serde(default)]
    pub public_key: Option<String>,
    /// Raw action list.
    #[serde(default)]
    pub actions: Vec<serde_json::Value>,
}

/// Full execution trace returned by `broadcast_tx_commit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalOutcome {
    /// Overall status; the only field the success/failure decision reads.
    #[serde(default)]
    pub status: ExecutionStatus,
    /// Echo of the submitted transaction.
    #[serde(default)]
    pub transaction: Option<TransactionView>,
    /// Outcome of converting the transaction into its first receipt.
    #[serde(default)]
    pub transaction_outcome: Option<OutcomeWithId>,
    /// Per-receipt outcomes, in execution order.
    #[serde(default)]
    pub receipts_outcome: Vec<OutcomeWithId>,
    /// Coarse progress marker, e.g. `EXECUTED_OPTIMISTIC`.
    #[serde(default)]
    pub final_execution_status: Option<String>,
}

/// Result of a read-only `call_function` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallViewResult {
    /// Raw return bytes.
    #[serde(default)]
    pub result: Vec<u8>,
    /// Log lines emitted by the view call.
    #[serde(default)]
    pub logs: Vec<String>,
    /// Block the view executed against.
    #[serde(default)]
    pub block_height: Option<u64>,
}

/// Result of a `view_account` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    /// Balance in the smallest unit, as a decimal string.
    pub amount: String,
    /// Storage used by the account, in bytes.
    #[serde(default)]
    pub storage_usage: Option<u64>,
    /// Hash of the deployed contract code, if any.
    #[serde(default)]
    pub code_hash: Option<String>,
}

impl AccountView {
    /// Balance parsed to an integer.
    pub fn balance(&self) -> Option<Balance> {
        self.amount.parse().ok()
    }
}

/// Result of a `view_access_key` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessKeyView {
    /// Current nonce of the key.
    pub nonce: u64,
    /// Permission descriptor; opaque to the harness.
    #[serde(default)]
    pub permission: serde_json::Value,
}

/// Node sync details inside a `status` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncInfo {
    /// Hash of the most recent block.
    pub latest_block_hash: String,
    /// Height of the most recent block.
    #[serde(default)]
    pub latest_block_height: Option<u64>,
}

/// Response of the lightweight `status` query used for health probing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Chain identifier the node runs.
    #[serde(default)]
    pub chain_id: Option<String>,
    /// Sync progress of the node.
    pub sync_info: SyncInfo,
}
