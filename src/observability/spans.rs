//! Span constructors shared by the transport and the dispatcher.

use tracing::Span;

use crate::session::SessionId;

/// Span wrapping the handling of one RPC.
pub fn rpc_span(session: SessionId, message_id: &str, operation: &'static str) -> Span {
    tracing::info_span!(
        "rpc",
        session_id = %session,
        message_id = %message_id,
        operation = operation
    )
}
