//! HTTP transport.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request id, trace span)
//!     → handlers.rs
//!         POST   /netconf/session          hello → session id + capabilities
//!         POST   /netconf/session/{id}/rpc one RPC message → one reply
//!         DELETE /netconf/session/{id}     transport close → locks released
//!     → Dispatcher
//! ```
//!
//! # Design Decisions
//! - Replies with `rpc-error` records are still HTTP 200; only transport
//!   failures (unknown session, undecodable body, session limit) change
//!   the status code
//! - Sessions are independent of TCP connections; a client may reconnect
//!   between RPCs

pub mod handlers;
pub mod request;
pub mod server;

pub use handlers::{Hello, HelloReply};
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
