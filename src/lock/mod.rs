//! Datastore lock manager.
//!
//! # Responsibilities
//! - Grant exclusive ownership of a datastore to at most one session
//! - Release locks on explicit unlock or when the owning session ends
//! - Gate mutating operations from sessions that do not hold the lock
//!
//! # Design Decisions
//! - Per-datastore entries in a sharded map: independent datastores never
//!   contend with each other
//! - Never waits: a held lock is reported to the caller, not queued
//! - No re-entrancy and no expiry

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::datastore::DatastoreName;
use crate::observability::metrics;
use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockRecord {
    pub owner: SessionId,
    pub acquired_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    #[error("lock on {datastore} is held by session {held_by}")]
    Denied {
        datastore: DatastoreName,
        held_by: SessionId,
    },
    #[error("{datastore} is not locked")]
    NotLocked { datastore: DatastoreName },
    #[error("{datastore} has uncommitted changes")]
    Modified { datastore: DatastoreName },
}

#[derive(Debug, Default)]
pub struct LockManager {
    locks: DashMap<DatastoreName, LockRecord>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self, datastore: DatastoreName, session: SessionId) -> Result<(), LockError> {
        match self.locks.entry(datastore) {
            Entry::Occupied(entry) => {
                let held_by = entry.get().owner;
                metrics::record_lock_event(datastore, "denied");
                tracing::info!(%datastore, %session, %held_by, "Lock denied");
                Err(LockError::Denied { datastore, held_by })
            }
            Entry::Vacant(entry) => {
                entry.insert(LockRecord {
                    owner: session,
                    acquired_at: Utc::now(),
                });
                metrics::record_lock_event(datastore, "acquired");
                tracing::info!(%datastore, %session, "Lock acquired");
                Ok(())
            }
        }
    }

    pub fn unlock(&self, datastore: DatastoreName, session: SessionId) -> Result<(), LockError> {
        match self.locks.entry(datastore) {
            Entry::Occupied(entry) if entry.get().owner == session => {
                entry.remove();
                metrics::record_lock_event(datastore, "released");
                tracing::info!(%datastore, %session, "Lock released");
                Ok(())
            }
            Entry::Occupied(entry) => Err(LockError::Denied {
                datastore,
                held_by: entry.get().owner,
            }),
            Entry::Vacant(_) => Err(LockError::NotLocked { datastore }),
        }
    }

    /// Release every lock held by `session`. Returns the released datastores.
    pub fn on_session_end(&self, session: SessionId) -> Vec<DatastoreName> {
        let held: Vec<DatastoreName> = self
            .locks
            .iter()
            .filter(|r| r.value().owner == session)
            .map(|r| *r.key())
            .collect();

        let mut released = Vec::new();
        for datastore in held {
            if self
                .locks
                .remove_if(&datastore, |_, record| record.owner == session)
                .is_some()
            {
                metrics::record_lock_event(datastore, "session-end");
                tracing::info!(%datastore, %session, "Lock released at session end");
                released.push(datastore);
            }
        }
        released.sort();
        released
    }

    pub fn is_locked_by_other(&self, datastore: DatastoreName, session: SessionId) -> bool {
        self.locks
            .get(&datastore)
            .is_some_and(|r| r.owner != session)
    }

    /// `Err(Denied)` when another session holds the lock on `datastore`.
    pub fn check_write(&self, datastore: DatastoreName, session: SessionId) -> Result<(), LockError> {
        match self.locks.get(&datastore) {
            Some(r) if r.owner != session => Err(LockError::Denied {
                datastore,
                held_by: r.owner,
            }),
            _ => Ok(()),
        }
    }

    pub fn holder(&self, datastore: DatastoreName) -> Option<LockRecord> {
        self.locks.get(&datastore).map(|r| *r.value())
    }

    /// Every held lock, ordered by datastore.
    pub fn snapshot(&self) -> Vec<(DatastoreName, LockRecord)> {
        let mut locks: Vec<_> = self.locks.iter().map(|r| (*r.key(), *r.value())).collect();
        locks.sort_by_key(|(name, _)| *name);
        locks
    }
}
