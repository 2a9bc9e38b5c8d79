//! JSON RPC over the broker link.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       RPC Stack                            │
//! │                                                            │
//! │  rpc/request/<id> ──▶ ┌────────────┐    ┌──────────────┐   │
//! │                       │ Dispatcher │───▶│   handlers   │   │
//! │                       │ (registry) │    │ (validation) │   │
//! │                       └────────────┘    └──────┬───────┘   │
//! │                             │                  ▼           │
//! │  rpc/response/<id> ◀── RpcResponse      &mut dyn RpcContext│
//! └────────────────────────────────────────────────────────────┘
//! ```

pub mod dispatcher;
pub mod handlers;
pub mod request;
pub mod response;

pub use dispatcher::{DispatchOutcome, DropReason, RpcDispatcher, RpcHandler};
pub use request::RpcRequest;
pub use response::{RpcResponse, RpcResult};
