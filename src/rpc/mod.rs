//! RPC layer: request/reply messages and their dispatch.
//!
//! # Data Flow
//! ```text
//! JSON body → RpcMessage (request.rs)
//!     → Dispatcher::handle (dispatcher.rs)
//!         → wire::decode_tree → EditApplier / FilterEvaluator / LockManager
//!         → Datastores publish or snapshot
//!     → RpcReply (reply.rs) with <ok>, data or rpc-error records
//! ```
//!
//! # Responsibilities
//! - Map every operation onto the core subsystems
//! - Enforce datastore locks before any write
//! - Translate internal errors into NETCONF error reports
//! - Serve lock and session state under `netconf-state`

pub mod dispatcher;
pub mod monitoring;
pub mod reply;
pub mod request;
pub mod wire;

pub use dispatcher::Dispatcher;
pub use reply::{ErrorTag, ErrorType, RpcError, RpcReply};
pub use request::{DefaultOperation, Rpc, RpcMessage, TestOption, WireFilter};
pub use wire::{decode_tree, encode_tree, DecodeError, WireNode};
