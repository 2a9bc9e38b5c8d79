//! RPC registry and dispatcher.
//!
//! ```text
//!  (topic, payload)
//!        │
//!        ▼
//!   parse body ──[invalid JSON]──▶ error response if the topic carries an id
//!        │
//!   method? ─────[absent]────────▶ dropped
//!        │
//!   lookup ──────[unknown]───────▶ dropped (not acknowledged)
//!        │
//!   request id ──[absent]────────▶ dropped
//!        │
//!   handler.handle(req, ctx) ────▶ RpcResponse on rpc/response/<id>
//! ```
//!
//! The dispatcher never touches a transport.  It returns a
//! [`DispatchOutcome`] and the orchestrator publishes it.

use log::{error, info, warn};

use crate::app::events::RpcMethod;
use crate::app::ports::RpcContext;
use crate::error::RegistryError;
use crate::topics;

use super::request::{RequestError, RpcRequest};
use super::response::{RpcResponse, RpcResult};

/// Room in the method table.
pub const MAX_METHODS: usize = 8;

/// Error message for bodies that are not JSON.
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON payload.";

/// A typed request handler.
///
/// Runs synchronously inside one tick.  It must validate every
/// parameter before mutating anything through `ctx`, and offload
/// long-running hardware work to a worker.
pub trait RpcHandler {
    fn handle(&self, request: &RpcRequest, ctx: &mut dyn RpcContext) -> RpcResult;
}

/// Why an inbound request produced no response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    InvalidJson,
    MissingMethod,
    UnknownMethod,
    /// The topic has no numeric trailing segment to answer on.
    NoRequestId,
    /// The response document could not be serialized.
    Encode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Publish `response`.  `method` is `None` when the body was not
    /// parseable.
    Respond {
        method: Option<RpcMethod>,
        response: RpcResponse,
    },
    Dropped(DropReason),
}

struct Registration {
    name: &'static str,
    handler: Box<dyn RpcHandler>,
}

// ───────────────────────────────────────────────────────────────
// Builder
// ───────────────────────────────────────────────────────────────

/// Collects registrations; duplicates fail here, never at dispatch.
#[derive(Default)]
pub struct DispatcherBuilder {
    table: heapless::Vec<Registration, MAX_METHODS>,
}

impl DispatcherBuilder {
    pub fn register(
        mut self,
        name: &'static str,
        handler: impl RpcHandler + 'static,
    ) -> Result<Self, RegistryError> {
        if self.table.iter().any(|r| r.name == name) {
            return Err(RegistryError::DuplicateMethod(name));
        }
        self.table
            .push(Registration {
                name,
                handler: Box::new(handler),
            })
            .map_err(|_| RegistryError::TooManyMethods)?;
        Ok(self)
    }

    pub fn build(self) -> RpcDispatcher {
        RpcDispatcher { table: self.table }
    }
}

// ───────────────────────────────────────────────────────────────
// Dispatcher
// ───────────────────────────────────────────────────────────────

pub struct RpcDispatcher {
    table: heapless::Vec<Registration, MAX_METHODS>,
}

impl RpcDispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Registered method names, in registration order.
    pub fn methods(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.table.iter().map(|r| r.name)
    }

    pub fn is_registered(&self, method: &str) -> bool {
        self.lookup(method).is_some()
    }

    fn lookup(&self, method: &str) -> Option<&Registration> {
        self.table.iter().find(|r| r.name == method)
    }

    /// Handle one inbound request.  The handler runs at most once.
    pub fn dispatch(&self, topic: &str, payload: &[u8], ctx: &mut dyn RpcContext) -> DispatchOutcome {
        let request_id = topics::request_id(topic);

        let request = match RpcRequest::parse(payload) {
            Ok(r) => r,
            Err(RequestError::InvalidJson) => {
                error!("RPC: invalid JSON on {}", topic);
                let Some(id) = request_id else {
                    return DispatchOutcome::Dropped(DropReason::InvalidJson);
                };
                return Self::respond(None, id, &RpcResult::error(INVALID_JSON_MESSAGE));
            }
            Err(RequestError::MissingMethod) => {
                error!("RPC: payload missing 'method' on {}", topic);
                return DispatchOutcome::Dropped(DropReason::MissingMethod);
            }
        };

        let Some(registration) = self.lookup(request.method()) else {
            warn!("RPC: unknown method '{}'", request.method());
            return DispatchOutcome::Dropped(DropReason::UnknownMethod);
        };

        let Some(id) = request_id else {
            warn!("RPC: no request id in topic {}", topic);
            return DispatchOutcome::Dropped(DropReason::NoRequestId);
        };

        let result = registration.handler.handle(&request, ctx);
        info!(
            "RPC: {} #{} -> {} {}",
            registration.name,
            id,
            if result.is_success() { "success" } else { "error" },
            result.message().unwrap_or("")
        );

        Self::respond(RpcMethod::try_from(registration.name).ok(), id, &result)
    }

    fn respond(method: Option<RpcMethod>, id: u32, result: &RpcResult) -> DispatchOutcome {
        match RpcResponse::for_request(id, result) {
            Ok(response) => DispatchOutcome::Respond { method, response },
            Err(e) => {
                error!("RPC: response #{} not encodable: {}", id, e);
                DispatchOutcome::Dropped(DropReason::Encode)
            }
        }
    }
}
