//! Error types for every failure domain in the crate.
//!
//! Each enum corresponds to one layer of §7 of the design: transport,
//! marshalling, handler/RPC, server construction, and the two client
//! surfaces. Handler failures are recovered by the server loop and turned
//! into wire error objects; transport and construction failures propagate
//! to the caller.

use thiserror::Error;

/// Low-level I/O and framing failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed")]
    Closed,

    #[error("line exceeded {limit} bytes")]
    LineTooLong { limit: usize },
}

/// A marshalling failure: wrong JSON kind, arity mismatch, out-of-range
/// value, or a missing record field. Always carries the offending
/// argument name so the server can report it verbatim (§4.B).
#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid params: {param}: {reason}")]
pub struct MarshalError {
    pub param: String,
    pub reason: String,
}

impl MarshalError {
    pub fn new(param: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            reason: reason.into(),
        }
    }
}

/// The error a handler body raises. `Rpc` carries an explicit
/// (code, message, data) triple that the server propagates verbatim.
/// `InvalidParams` comes from marshalling and maps to -32602. `Internal`
/// is any other handler failure, masked to a generic -32000 message on
/// the wire (the real cause is logged).
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("rpc error {code}: {message}")]
    Rpc {
        code: i32,
        message: String,
        data: serde_json::Value,
    },

    #[error(transparent)]
    InvalidParams(#[from] MarshalError),

    #[error("internal handler error: {0}")]
    Internal(String),
}

impl RpcError {
    pub fn rpc(code: i32, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data,
        }
    }

    /// Standard JSON-RPC 2.0 error codes (§3).
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    pub const SERVER_ERROR: i32 = -32000;

    /// The (code, message, data) triple this error maps to on the wire,
    /// per the handler failure taxonomy in §4.D step 7.
    pub fn to_wire(&self) -> (i32, String, serde_json::Value) {
        match self {
            RpcError::Rpc {
                code,
                message,
                data,
            } => (*code, message.clone(), data.clone()),
            RpcError::InvalidParams(e) => (Self::INVALID_PARAMS, e.to_string(), serde_json::Value::Null),
            RpcError::Internal(cause) => {
                tracing::error!(cause = %cause, "handler raised an internal error");
                (
                    Self::SERVER_ERROR,
                    "Error: Unknown error occurred".to_string(),
                    serde_json::Value::Null,
                )
            }
        }
    }
}

/// Fatal failures constructing a [`crate::server::Server`] (§4.E).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("could not resolve any endpoint for {host}")]
    AddressUnresolvable { host: String },

    #[error("could not bind any resolved endpoint")]
    BindError,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures surfaced to a [`crate::client::Client`] caller.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("client is shutting down")]
    Closed,
}

/// Failures surfaced to an [`crate::http_client::HttpClient`] caller.
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("timed out waiting for response headers")]
    HeaderTimeout,

    #[error("timed out waiting for response body")]
    BodyTimeout,

    #[error("response headers exceeded {limit} bytes")]
    HeaderTooLarge { limit: usize },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("unexpected status {0}")]
    UnexpectedStatus(u16),

    #[error("response was not application/json")]
    UnexpectedContentType,

    #[error("failed to serialize request: {0}")]
    Serialize(#[from] serde_json::Error),
}
