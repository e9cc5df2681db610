use serde_json::Value;
use thiserror::Error;

/// Error type for JSON-RPC operations.
#[derive(Error, Debug)]
pub enum RpcError {
    /// Request never produced a response (connection refused, timeout, ...).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Endpoint answered with a non-success HTTP status.
    #[error("unexpected HTTP status {0}")]
    Http(u16),

    /// A request or response payload failed to encode or decode.
    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// Endpoint answered with a JSON-RPC error object.
    ///
    /// Standard codes follow the JSON-RPC 2.0 reservation: -32700 parse
    /// error, -32600 invalid request, -32601 method not found, -32602
    /// invalid params, -32603 internal error; -32000..-32099 are
    /// server-defined.
    #[error("RPC error {code}: {message}")]
    Server {
        /// JSON-RPC error code.
        code: i64,
        /// Human-readable message.
        message: String,
        /// Optional structured detail.
        data: Option<Value>,
    },

    /// Response carried neither a result nor an error member.
    #[error("response carried no result")]
    MissingResult,

    /// Response had a result, but not the one the method promises.
    #[error("unexpected response payload: {0}")]
    UnexpectedResponse(Value),
}

/// Result type alias for JSON-RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;
