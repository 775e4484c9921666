//! RPC dispatch: routes decoded requests to the core subsystems.

use std::sync::Arc;
use std::time::Instant;

use crate::datastore::{DatastoreName, Datastores};
use crate::edit::EditApplier;
use crate::filter::{Filter, FilterEvaluator};
use crate::lock::{LockError, LockManager};
use crate::model::ConfigTree;
use crate::observability::{metrics, spans};
use crate::rpc::monitoring;
use crate::rpc::reply::{RpcError, RpcReply};
use crate::rpc::request::{Rpc, RpcMessage, TestOption, WireFilter};
use crate::rpc::wire::{decode_tree, encode_tree, WireNode};
use crate::schema::Schema;
use crate::session::{SessionError, SessionId, SessionInfo, SessionRegistry};
use crate::validate::Validator;

/// Shared server state plus the request handlers. Constructed once at
/// startup and shared by every transport connection.
pub struct Dispatcher {
    schema: Arc<Schema>,
    validator: Arc<dyn Validator>,
    datastores: Datastores,
    locks: LockManager,
    sessions: SessionRegistry,
}

impl Dispatcher {
    pub fn new(
        schema: Arc<Schema>,
        validator: Arc<dyn Validator>,
        datastores: Datastores,
        sessions: SessionRegistry,
    ) -> Self {
        Self {
            schema,
            validator,
            datastores,
            locks: LockManager::new(),
            sessions,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn datastores(&self) -> &Datastores {
        &self.datastores
    }

    pub fn locks(&self) -> &LockManager {
        &self.locks
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn open_session(
        &self,
        username: &str,
        transport: &str,
        source_host: Option<String>,
    ) -> Result<Arc<SessionInfo>, SessionError> {
        let info = self.sessions.open(username, transport, source_host)?;
        metrics::set_active_sessions(self.sessions.len());
        tracing::info!(session_id = %info.id, username, transport, "Session opened");
        Ok(info)
    }

    /// Tear down a session: release its locks (dropping candidate changes
    /// made under a candidate lock) and then forget it.
    pub fn end_session(&self, session: SessionId) -> bool {
        let txn = self.datastores.write();
        let released = self.locks.on_session_end(session);
        if released.contains(&DatastoreName::Candidate) && txn.discard_candidate() {
            tracing::info!(%session, "Discarded candidate changes of ended session");
        }
        drop(txn);
        let closed = self.sessions.close(session).is_some();
        metrics::set_active_sessions(self.sessions.len());
        if closed {
            tracing::info!(%session, released = released.len(), "Session closed");
        }
        closed
    }

    /// End every open session. Used on shutdown.
    pub fn end_all_sessions(&self) {
        for session in self.sessions.all() {
            self.end_session(session.id);
        }
    }

    /// Reply to a request that could not be decoded.
    pub fn reject(&self, session: SessionId, message_id: Option<String>, reason: &str) -> RpcReply {
        if let Some(info) = self.sessions.get(session) {
            info.record_bad_rpc();
        }
        tracing::warn!(%session, reason, "Malformed RPC");
        RpcReply::error(message_id, RpcError::malformed(reason))
    }

    pub fn handle(&self, session: SessionId, message: RpcMessage) -> RpcReply {
        let RpcMessage { message_id, rpc } = message;
        let operation = rpc.name();

        let Some(info) = self.sessions.get(session) else {
            return RpcReply::error(Some(message_id), SessionError::Unknown(session).into());
        };

        let span = spans::rpc_span(session, &message_id, operation);
        let _entered = span.enter();
        let started = Instant::now();

        let reply = match self.dispatch(&info, rpc) {
            Ok(Some(data)) => RpcReply::data(message_id, data),
            Ok(None) => RpcReply::ok(message_id),
            Err(error) => {
                tracing::warn!(
                    error_tag = ?error.error_tag,
                    error_path = error.error_path.as_deref().unwrap_or(""),
                    "RPC failed"
                );
                RpcReply::error(Some(message_id), error)
            }
        };

        info.record_rpc(!reply.is_error());
        let outcome = if reply.is_error() { "error" } else { "ok" };
        metrics::record_rpc(operation, outcome, started.elapsed());
        tracing::debug!(outcome, elapsed_ms = started.elapsed().as_millis() as u64, "RPC handled");
        reply
    }

    fn dispatch(&self, info: &SessionInfo, rpc: Rpc) -> Result<Option<Vec<WireNode>>, RpcError> {
        let session = info.id;
        match rpc {
            Rpc::Get { filter } => {
                let filter = decode_filter(filter)?;
                let running = self.datastores.snapshot(DatastoreName::Running)?;
                let state = monitoring::state_tree(
                    &self.locks,
                    &self.sessions,
                    self.datastores.candidate_enabled(),
                );
                Ok(Some(self.select(&running.concat(&state), filter.as_ref())))
            }
            Rpc::GetConfig { source, filter } => {
                let filter = decode_filter(filter)?;
                let tree = self.datastores.snapshot(source)?;
                Ok(Some(self.select(&tree, filter.as_ref())))
            }
            Rpc::EditConfig {
                target,
                default_operation,
                test_option,
                config,
            } => {
                let patch = decode_tree(&self.schema, &config)?;
                let applier = EditApplier::new(&self.schema, self.validator.as_ref());
                let default_op = default_operation.into();

                if test_option == TestOption::TestOnly {
                    self.locks.check_write(target, session)?;
                    let current = self.datastores.snapshot(target)?;
                    applier.apply(&current, &patch, default_op)?;
                    return Ok(None);
                }

                let txn = self.datastores.write();
                self.locks.check_write(target, session)?;
                txn.commit_edit(target, |current| {
                    applier
                        .apply(current, &patch, default_op)
                        .map_err(RpcError::from)
                })?;
                if target == DatastoreName::Running {
                    metrics::record_commit(target);
                }
                tracing::info!(%session, datastore = %target, "Edit committed");
                Ok(None)
            }
            Rpc::Lock { target } => {
                self.datastores.ensure_enabled(target)?;
                let txn = self.datastores.write();
                // A free candidate with pending changes cannot be locked.
                if target == DatastoreName::Candidate
                    && txn.is_candidate_modified()
                    && self.locks.holder(target).is_none()
                {
                    tracing::info!(%session, datastore = %target, "Lock denied, uncommitted changes");
                    return Err(LockError::Modified { datastore: target }.into());
                }
                self.locks.lock(target, session)?;
                Ok(None)
            }
            Rpc::Unlock { target } => {
                self.datastores.ensure_enabled(target)?;
                self.locks.unlock(target, session)?;
                Ok(None)
            }
            Rpc::Validate { source } => {
                let tree = self.datastores.snapshot(source)?;
                self.validator.validate(&tree)?;
                Ok(None)
            }
            Rpc::Commit => {
                self.datastores.ensure_enabled(DatastoreName::Candidate)?;
                let txn = self.datastores.write();
                self.locks.check_write(DatastoreName::Running, session)?;
                self.locks.check_write(DatastoreName::Candidate, session)?;
                let committed = txn
                    .commit_candidate(|tree| self.validator.validate(tree).map_err(RpcError::from))?;
                if committed {
                    metrics::record_commit(DatastoreName::Running);
                    tracing::info!(%session, "Candidate committed");
                }
                Ok(None)
            }
            Rpc::DiscardChanges => {
                self.datastores.ensure_enabled(DatastoreName::Candidate)?;
                let txn = self.datastores.write();
                self.locks.check_write(DatastoreName::Candidate, session)?;
                if txn.discard_candidate() {
                    tracing::info!(%session, "Candidate changes discarded");
                }
                Ok(None)
            }
            Rpc::CloseSession => {
                self.end_session(session);
                Ok(None)
            }
            Rpc::KillSession { session_id } => {
                if session_id == session {
                    return Err(RpcError::invalid_value("a session cannot kill itself"));
                }
                if !self.end_session(session_id) {
                    return Err(SessionError::Unknown(session_id).into());
                }
                tracing::info!(%session, killed = %session_id, "Session killed");
                Ok(None)
            }
        }
    }

    fn select(&self, tree: &ConfigTree, filter: Option<&Filter>) -> Vec<WireNode> {
        let selected = FilterEvaluator::new(&self.schema).select(tree, filter);
        encode_tree(&selected)
    }
}

fn decode_filter(filter: Option<WireFilter>) -> Result<Option<Filter>, RpcError> {
    filter
        .map(WireFilter::into_filter)
        .transpose()
        .map_err(RpcError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataNode, QName};
    use crate::rpc::reply::ErrorTag;
    use crate::schema::{LeafType, Module, SchemaNode};
    use crate::validate::SchemaValidator;
    use serde_json::json;

    fn dispatcher(candidate: bool) -> Dispatcher {
        let schema = Arc::new(
            Schema::new(vec![Module::new(
                "ed1",
                "urn:ed1",
                [SchemaNode::leaf("first", LeafType::string())],
            )])
            .unwrap(),
        );
        let initial = ConfigTree::from_roots(vec![DataNode::leaf(QName::new("urn:ed1", "first"), "a")]);
        Dispatcher::new(
            schema.clone(),
            Arc::new(SchemaValidator::new(schema)),
            Datastores::new(initial, candidate),
            SessionRegistry::new(8),
        )
    }

    fn rpc(value: serde_json::Value) -> RpcMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn unknown_session_is_rejected() {
        let d = dispatcher(false);
        let reply = d.handle(SessionId(42), rpc(json!({"message-id": "1", "operation": "commit"})));
        assert_eq!(reply.errors[0].error_tag, ErrorTag::InvalidValue);
    }

    #[test]
    fn candidate_disabled_is_not_supported() {
        let d = dispatcher(false);
        let s = d.open_session("u", "test", None).unwrap();
        let reply = d.handle(s.id, rpc(json!({"message-id": "1", "operation": "commit"})));
        assert_eq!(reply.errors[0].error_tag, ErrorTag::OperationNotSupported);
    }

    #[test]
    fn close_session_releases_locks() {
        let d = dispatcher(false);
        let s = d.open_session("u", "test", None).unwrap();
        let lock = d.handle(s.id, rpc(json!({"message-id": "1", "operation": "lock", "target": "running"})));
        assert!(lock.ok);
        let close = d.handle(s.id, rpc(json!({"message-id": "2", "operation": "close-session"})));
        assert!(close.ok);
        assert!(d.locks().holder(DatastoreName::Running).is_none());
        assert!(d.sessions().is_empty());
    }

    #[test]
    fn session_counters_track_outcomes() {
        let d = dispatcher(false);
        let s = d.open_session("u", "test", None).unwrap();
        d.handle(s.id, rpc(json!({"message-id": "1", "operation": "unlock", "target": "running"})));
        d.handle(s.id, rpc(json!({"message-id": "2", "operation": "get-config", "source": "running"})));
        d.reject(s.id, None, "not json");
        assert_eq!(s.in_rpcs(), 2);
        assert_eq!(s.in_bad_rpcs(), 1);
        assert_eq!(s.out_rpc_errors(), 2);
    }
}
