//! Client sessions.
//!
//! # Data Flow
//! ```text
//! transport hello  → SessionRegistry::open  → SessionId (1, 2, 3, ...)
//! each RPC         → SessionInfo counters
//! transport close  → Dispatcher::end_session → LockManager::on_session_end
//!                  → SessionRegistry::close
//! ```
//!
//! # Design Decisions
//! - Ids come from a registry-owned counter, never reused within a process
//! - The registry is constructed at startup and passed by reference
//! - Per-session counters are atomics so RPC handling never takes a lock
//! - A slot is reserved on the `active` counter before the session is inserted

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Numeric NETCONF session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session limit of {0} reached")]
    Limit(usize),
    #[error("unknown session {0}")]
    Unknown(SessionId),
}

/// State tracked for one open session.
#[derive(Debug)]
pub struct SessionInfo {
    pub id: SessionId,
    pub username: String,
    pub transport: String,
    pub source_host: Option<String>,
    pub login_time: DateTime<Utc>,
    in_rpcs: AtomicU64,
    in_bad_rpcs: AtomicU64,
    out_rpc_errors: AtomicU64,
}

impl SessionInfo {
    pub fn record_rpc(&self, ok: bool) {
        self.in_rpcs.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.out_rpc_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_bad_rpc(&self) {
        self.in_bad_rpcs.fetch_add(1, Ordering::Relaxed);
        self.out_rpc_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn in_rpcs(&self) -> u64 {
        self.in_rpcs.load(Ordering::Relaxed)
    }

    pub fn in_bad_rpcs(&self) -> u64 {
        self.in_bad_rpcs.load(Ordering::Relaxed)
    }

    pub fn out_rpc_errors(&self) -> u64 {
        self.out_rpc_errors.load(Ordering::Relaxed)
    }
}

/// Open sessions, keyed by id.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<SessionInfo>>,
    next_id: AtomicU32,
    active: AtomicUsize,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU32::new(1),
            active: AtomicUsize::new(0),
            max_sessions,
        }
    }

    pub fn open(
        &self,
        username: impl Into<String>,
        transport: impl Into<String>,
        source_host: Option<String>,
    ) -> Result<Arc<SessionInfo>, SessionError> {
        let max = self.max_sessions;
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .map_err(|_| SessionError::Limit(max))?;
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let info = Arc::new(SessionInfo {
            id,
            username: username.into(),
            transport: transport.into(),
            source_host,
            login_time: Utc::now(),
            in_rpcs: AtomicU64::new(0),
            in_bad_rpcs: AtomicU64::new(0),
            out_rpc_errors: AtomicU64::new(0),
        });
        self.sessions.insert(id, info.clone());
        Ok(info)
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<SessionInfo>> {
        self.sessions.get(&id).map(|r| r.value().clone())
    }

    pub fn close(&self, id: SessionId) -> Option<Arc<SessionInfo>> {
        let (_, info) = self.sessions.remove(&id)?;
        self.active.fetch_sub(1, Ordering::AcqRel);
        Some(info)
    }

    /// All open sessions ordered by id.
    pub fn all(&self) -> Vec<Arc<SessionInfo>> {
        let mut sessions: Vec<_> = self.sessions.iter().map(|r| r.value().clone()).collect();
        sessions.sort_by_key(|s| s.id);
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
