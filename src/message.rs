//! Wire-level JSON-RPC 2.0 message types (§3).
//!
//! These mirror the JSON-RPC 2.0 specification directly: a request
//! carries `jsonrpc`/`method`/`params`/`id`, a response always carries
//! both `result` and `error` (the unused one serialized as `null`, per
//! the deliberate choice in §3/§9), and ids may be either a JSON number
//! or a JSON string.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC request id. The spec also allows `null`, which this crate
/// models as `Option<RequestId>` at the call sites that need it (a
/// response to an undeterminable request has no id at all).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

impl RequestId {
    pub fn new_string(id: impl Into<String>) -> Self {
        RequestId::String(id.into())
    }

    pub fn new_number(id: i64) -> Self {
        RequestId::Number(id)
    }

    /// Canonical string form used as the client's pending-map key (§3,
    /// "Client state"). Both id kinds are matched by this string, so a
    /// request id of `1` and `"1"` collide deliberately — the wire
    /// format does not distinguish them once round-tripped through a
    /// `HashMap` key.
    pub fn as_key(&self) -> String {
        match self {
            RequestId::String(s) => s.clone(),
            RequestId::Number(n) => n.to_string(),
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{s}"),
            RequestId::Number(n) => write!(f, "{n}"),
        }
    }
}

/// JSON-RPC 2.0 request. `params` is required to be an array by this
/// implementation (positional params only, §1/§6) even though the
/// field is modeled as `Value` to tolerate malformed input during
/// parsing — arity/shape is enforced by the marshalling layer, not by
/// this type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    pub id: RequestId,
}

impl Request {
    pub fn new(method: impl Into<String>, params: Value, id: RequestId) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.into(),
            params,
            id,
        }
    }

    /// Serialize to a single CR LF terminated line, per §6's wire
    /// framing rule for the stream transport.
    pub fn to_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.extend_from_slice(b"\r\n");
        Ok(bytes)
    }
}

/// JSON-RPC 2.0 response. Always carries both `result` and `error` so
/// the wire shape is uniform regardless of outcome (§3, §9) — callers
/// that want strict spec compliance (exactly one of the two fields
/// present) can filter `null` fields before re-serializing, but parsing
/// accepts either shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    pub jsonrpc: String,
    pub result: Value,
    pub error: Value,
    pub id: Option<RequestId>,
}

impl Response {
    pub fn success(result: Value, id: RequestId) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result,
            error: Value::Null,
            id: Some(id),
        }
    }

    pub fn error(code: i32, message: impl Into<String>, data: Value, id: Option<RequestId>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Value::Null,
            error: serde_json::json!({
                "code": code,
                "message": message.into(),
                "data": data,
            }),
            id,
        }
    }

    pub fn is_err(&self) -> bool {
        !self.error.is_null()
    }

    pub fn to_line(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.extend_from_slice(b"\r\n");
        Ok(bytes)
    }
}
