use axum::{
    extract::{ConnectInfo, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::http::server::AppState;
use crate::rpc::{Dispatcher, RpcError, RpcMessage, RpcReply};
use crate::session::{SessionError, SessionId};

pub const TRANSPORT: &str = "http";
const ANONYMOUS: &str = "anonymous";

pub const BASE_CAPABILITY: &str = "urn:ietf:params:netconf:base:1.1";
pub const CANDIDATE_CAPABILITY: &str = "urn:ietf:params:netconf:capability:candidate:1.0";
pub const VALIDATE_CAPABILITY: &str = "urn:ietf:params:netconf:capability:validate:1.1";
pub const XPATH_CAPABILITY: &str = "urn:ietf:params:netconf:capability:xpath:1.0";

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Hello {
    pub username: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HelloReply {
    pub session_id: SessionId,
    pub capabilities: Vec<String>,
}

/// Capabilities advertised in the hello reply: protocol features plus one
/// URI per loaded module.
pub fn capabilities(dispatcher: &Dispatcher) -> Vec<String> {
    let mut caps = vec![BASE_CAPABILITY.to_string()];
    if dispatcher.datastores().candidate_enabled() {
        caps.push(CANDIDATE_CAPABILITY.to_string());
    }
    caps.push(VALIDATE_CAPABILITY.to_string());
    caps.push(XPATH_CAPABILITY.to_string());
    caps.extend(
        dispatcher
            .schema()
            .modules()
            .iter()
            .map(|m| format!("{}?module={}", m.namespace, m.name)),
    );
    caps
}

fn error_response(status: StatusCode, reply: RpcReply) -> Response {
    (status, Json(reply)).into_response()
}

/// `POST /netconf/session`
pub async fn open_session(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: String,
) -> Response {
    let hello = if body.trim().is_empty() {
        Hello::default()
    } else {
        match serde_json::from_str::<Hello>(&body) {
            Ok(hello) => hello,
            Err(e) => {
                let error = RpcError::malformed(format!("invalid hello: {}", e));
                return error_response(StatusCode::BAD_REQUEST, RpcReply::error(None, error));
            }
        }
    };
    let username = hello.username.as_deref().unwrap_or(ANONYMOUS);

    match state
        .dispatcher
        .open_session(username, TRANSPORT, Some(peer.ip().to_string()))
    {
        Ok(info) => (
            StatusCode::CREATED,
            Json(HelloReply {
                session_id: info.id,
                capabilities: capabilities(&state.dispatcher),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, peer = %peer, "Session refused");
            error_response(StatusCode::SERVICE_UNAVAILABLE, RpcReply::error(None, e.into()))
        }
    }
}

/// `POST /netconf/session/{id}/rpc`
pub async fn rpc(
    State(state): State<AppState>,
    Path(session): Path<SessionId>,
    body: String,
) -> Response {
    if state.dispatcher.sessions().get(session).is_none() {
        let error = SessionError::Unknown(session).into();
        return error_response(StatusCode::NOT_FOUND, RpcReply::error(None, error));
    }

    let message = match serde_json::from_str::<RpcMessage>(&body) {
        Ok(message) => message,
        Err(e) => {
            let reply = state
                .dispatcher
                .reject(session, message_id_of(&body), &e.to_string());
            return error_response(StatusCode::BAD_REQUEST, reply);
        }
    };

    Json(state.dispatcher.handle(session, message)).into_response()
}

/// `DELETE /netconf/session/{id}`
pub async fn close_session(
    State(state): State<AppState>,
    Path(session): Path<SessionId>,
) -> StatusCode {
    if state.dispatcher.end_session(session) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// Best-effort message id of a request that failed to decode.
fn message_id_of(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("message-id")? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
