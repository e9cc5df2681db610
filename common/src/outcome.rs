//! Decoding of raw execution traces into call outcomes.
//!
//! The decision rule is deliberately narrow: a trace is a success if and only
//! if its top-level `status` carries a `SuccessValue`. Nothing about the
//! transport layer (HTTP status, error types, timeouts) participates in the
//! decision.

use std::fmt::{self, Display, Formatter};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ExecutionStatus, FinalOutcome};

/// Error raised when a trace claims success but its payload is unreadable.
#[derive(Error, Debug)]
pub enum OutcomeError {
    /// Success value was not valid base64.
    #[error("success value is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    /// Success value bytes were not valid UTF-8.
    #[error("success value is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Decoded result of a state-changing call.
#[derive(Debug, Clone)]
pub enum CallOutcome {
    /// The call completed with a return value.
    Success {
        /// Base64-decoded return payload, interpreted as text.
        value: String,
        /// Log lines emitted across all execution steps.
        logs: Vec<String>,
    },
    /// The call failed; the report is reconstructed from the trace alone.
    Failure(Box<ExecutionFailure>),
}

impl CallOutcome {
    /// Decode a raw execution trace.
    ///
    /// Logs attached to a success are surfaced through the `log` facade but
    /// never influence the success/failure decision.
    pub fn decode(raw: &FinalOutcome) -> Result<Self, OutcomeError> {
        let logs = collect_logs(raw);
        match &raw.status {
            ExecutionStatus::SuccessValue(encoded) => {
                let value = String::from_utf8(BASE64.decode(encoded)?)?;
                for line in &logs {
                    info!("contract log: {line}");
                }
                debug!("call succeeded with value {value:?}");
                Ok(CallOutcome::Success { value, logs })
            }
            status => Ok(CallOutcome::Failure(Box::new(ExecutionFailure::from_trace(
                raw, status, logs,
            )))),
        }
    }

    /// Whether the outcome is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success { .. })
    }

    /// The decoded return value, if successful.
    pub fn value(&self) -> Option<&str> {
        match self {
            CallOutcome::Success { value, .. } => Some(value),
            CallOutcome::Failure(_) => None,
        }
    }

    /// Log lines emitted during execution, success or not.
    pub fn logs(&self) -> &[String] {
        match self {
            CallOutcome::Success { logs, .. } => logs,
            CallOutcome::Failure(failure) => &failure.logs,
        }
    }

    /// Parse the success value as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        self.value().and_then(|v| serde_json::from_str(v).ok())
    }

    /// Convert into a `Result`, turning a failure into its report.
    pub fn into_result(self) -> Result<String, Box<ExecutionFailure>> {
        match self {
            CallOutcome::Success { value, .. } => Ok(value),
            CallOutcome::Failure(failure) => Err(failure),
        }
    }
}

/// Structured report of a failed call.
///
/// Every field is recovered from the execution trace itself; building the
/// report performs no further network traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionFailure {
    /// Human-readable description of the failure.
    pub message: String,
    /// Method that was invoked, when the trace echoes a function call.
    pub method_name: Option<String>,
    /// Call arguments, decoded to text where possible.
    pub args: Option<String>,
    /// Gas attached to the call.
    pub gas: Option<u64>,
    /// Deposit attached to the call, as a decimal string.
    pub deposit: Option<String>,
    /// Account that signed the transaction.
    pub signer_id: Option<String>,
    /// Account the transaction targeted.
    pub receiver_id: Option<String>,
    /// Log lines emitted across all execution steps.
    pub logs: Vec<String>,
    /// Failure details of individual receipts.
    pub receipt_failures: Vec<ReceiptFailure>,
}

/// Failure detail of a single receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptFailure {
    /// Receipt hash.
    pub receipt_id: Option<String>,
    /// Account that executed the receipt.
    pub executor_id: Option<String>,
    /// The structured error the runtime reported.
    pub error: serde_json::Value,
}

impl ExecutionFailure {
    fn from_trace(raw: &FinalOutcome, status: &ExecutionStatus, logs: Vec<String>) -> Self {
        let message = match status {
            ExecutionStatus::Failure(detail) => format!("execution failed: {detail}"),
            other => format!("transaction did not produce a success value (status: {other:?})"),
        };

        let transaction = raw.transaction.as_ref();
        let call = transaction.and_then(|tx| {
            tx.actions
                .iter()
                .find_map(|action| action.get("FunctionCall"))
        });

        let receipt_failures = raw
            .receipts_outcome
            .iter()
            .filter_map(|receipt| match &receipt.outcome.status {
                ExecutionStatus::Failure(error) => Some(ReceiptFailure {
                    receipt_id: receipt.id.clone(),
                    executor_id: receipt.outcome.executor_id.clone(),
                    error: error.clone(),
                }),
                _ => None,
            })
            .collect();

        ExecutionFailure {
            message,
            method_name: call
                .and_then(|c| c.get("method_name"))
                .and_then(|v| v.as_str())
                .map(String::from),
            args: call
                .and_then(|c| c.get("args"))
                .and_then(|v| v.as_str())
                .map(decode_args),
            gas: call.and_then(|c| c.get("gas")).and_then(|v| v.as_u64()),
            deposit: call
                .and_then(|c| c.get("deposit"))
                .and_then(|v| v.as_str())
                .map(String::from),
            signer_id: transaction.and_then(|tx| tx.signer_id.clone()),
            receiver_id: transaction.and_then(|tx| tx.receiver_id.clone()),
            logs,
            receipt_failures,
        }
    }
}

impl Display for ExecutionFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(method) = &self.method_name {
            write!(f, " (method: {method}")?;
            if let Some(receiver) = &self.receiver_id {
                write!(f, " on {receiver}")?;
            }
            write!(f, ")")?;
        }
        if !self.logs.is_empty() {
            write!(f, "; logs: {:?}", self.logs)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecutionFailure {}

fn collect_logs(raw: &FinalOutcome) -> Vec<String> {
    let mut logs = Vec::new();
    if let Some(outcome) = &raw.transaction_outcome {
        logs.extend(outcome.outcome.logs.iter().cloned());
    }
    for receipt in &raw.receipts_outcome {
        logs.extend(receipt.outcome.logs.iter().cloned());
    }
    logs
}

/// Arguments are base64 JSON on the wire; fall back to the raw string when
/// they do not decode cleanly.
fn decode_args(encoded: &str) -> String {
    BASE64
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| encoded.to_string())
}
