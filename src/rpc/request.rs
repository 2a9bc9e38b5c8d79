//! Inbound RPC request parsing.
//!
//! A request body is `{"method": "<name>", "params": {...}}`.  Parsing
//! only checks the envelope; each handler validates its own params
//! through the typed accessors, which return `None` for absent or
//! mistyped values instead of sentinel numbers.

use serde_json::{Map, Value};

/// Why an inbound body could not become an [`RpcRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// Body is not valid JSON.
    InvalidJson,
    /// Body is JSON but has no string `method` member.
    MissingMethod,
}

/// A parsed, immutable RPC request.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    method: String,
    params: Map<String, Value>,
}

impl RpcRequest {
    pub fn new(method: &str, params: Map<String, Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Parse a message body.  A missing or non-object `params` member
    /// yields an empty parameter map.
    pub fn parse(payload: &[u8]) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_slice(payload).map_err(|_| RequestError::InvalidJson)?;
        let Value::Object(mut body) = value else {
            return Err(RequestError::MissingMethod);
        };

        let method = match body.remove("method") {
            Some(Value::String(m)) => m,
            _ => return Err(RequestError::MissingMethod),
        };

        let params = match body.remove("params") {
            Some(Value::Object(p)) => p,
            _ => Map::new(),
        };

        Ok(Self { method, params })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    // ── Typed accessors ───────────────────────────────────────

    /// Non-negative integer parameter.
    pub fn uint(&self, name: &str) -> Option<u64> {
        self.params.get(name)?.as_u64()
    }

    /// Any JSON number.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.params.get(name)?.as_f64()
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.params.get(name)?.as_bool()
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.params.get(name)?.as_str()
    }
}
