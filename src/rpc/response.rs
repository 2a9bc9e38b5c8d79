//! Handler results and the correlated response document.

use serde::Serialize;

use crate::topics::{self, Topic};

/// Outcome of exactly one handler invocation.
///
/// Either `success` with an optional informational message, or an
/// error that always carries a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcResult {
    success: bool,
    message: Option<String>,
}

impl RpcResult {
    pub fn success() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn success_with(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// `{"result":"success"|"error","message":...}`; `message` is
    /// omitted when absent.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        #[derive(Serialize)]
        struct Document<'a> {
            result: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            message: Option<&'a str>,
        }

        serde_json::to_vec(&Document {
            result: if self.success { "success" } else { "error" },
            message: self.message(),
        })
    }
}

/// A response ready to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcResponse {
    pub topic: Topic,
    pub body: Vec<u8>,
    pub success: bool,
}

impl RpcResponse {
    /// Correlate `result` with request `id`.
    pub fn for_request(id: u32, result: &RpcResult) -> Result<Self, serde_json::Error> {
        Ok(Self {
            topic: topics::response_topic(id),
            body: result.to_json()?,
            success: result.is_success(),
        })
    }
}
