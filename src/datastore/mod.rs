//! Named configuration datastores.
//!
//! # Data Flow
//! ```text
//! readers: snapshot(name) → Arc<ConfigTree> (never blocks)
//! writers: write() → WriteTxn holding the write gate
//!     → caller checks lock ownership while holding it
//!     → commit_edit(name, f)
//!     → f(current snapshot) computes a new tree on a private copy
//!     → atomic swap; readers see the old or the new tree, never a mix
//! ```
//!
//! # Design Decisions
//! - Trees are immutable once published; an edit always publishes a new Arc
//! - An untouched candidate has no tree of its own and mirrors running
//! - Lock grants and write ownership checks happen under the same gate as
//!   publishes, so a write cannot land after another session's lock grant

use arc_swap::{ArcSwap, ArcSwapOption};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::model::ConfigTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatastoreName {
    Running,
    Candidate,
}

impl DatastoreName {
    pub fn as_str(self) -> &'static str {
        match self {
            DatastoreName::Running => "running",
            DatastoreName::Candidate => "candidate",
        }
    }
}

impl fmt::Display for DatastoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatastoreName {
    type Err = DatastoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(DatastoreName::Running),
            "candidate" => Ok(DatastoreName::Candidate),
            other => Err(DatastoreError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatastoreError {
    #[error("unknown datastore '{0}'")]
    Unknown(String),
    #[error("the {0} datastore is not enabled")]
    Unsupported(DatastoreName),
}

pub struct Datastores {
    running: ArcSwap<ConfigTree>,
    candidate: ArcSwapOption<ConfigTree>,
    candidate_enabled: bool,
    write_gate: Mutex<()>,
}

impl Datastores {
    pub fn new(initial: ConfigTree, candidate_enabled: bool) -> Self {
        Self {
            running: ArcSwap::from_pointee(initial),
            candidate: ArcSwapOption::empty(),
            candidate_enabled,
            write_gate: Mutex::new(()),
        }
    }

    pub fn candidate_enabled(&self) -> bool {
        self.candidate_enabled
    }

    /// `Err(Unsupported)` for the candidate when it is disabled.
    pub fn ensure_enabled(&self, name: DatastoreName) -> Result<(), DatastoreError> {
        if name == DatastoreName::Candidate && !self.candidate_enabled {
            return Err(DatastoreError::Unsupported(name));
        }
        Ok(())
    }

    /// Current contents of a datastore.
    pub fn snapshot(&self, name: DatastoreName) -> Result<Arc<ConfigTree>, DatastoreError> {
        self.ensure_enabled(name)?;
        Ok(match name {
            DatastoreName::Running => self.running.load_full(),
            DatastoreName::Candidate => self
                .candidate
                .load_full()
                .unwrap_or_else(|| self.running.load_full()),
        })
    }

    /// Take the write gate. Everything done while the returned transaction
    /// is alive is ordered against every other writer, including lock
    /// grants and ownership checks made by the caller.
    pub fn write(&self) -> WriteTxn<'_> {
        WriteTxn {
            stores: self,
            _gate: self.write_gate.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    pub fn is_candidate_modified(&self) -> bool {
        self.candidate.load().is_some()
    }
}

/// Exclusive write access to the datastores.
pub struct WriteTxn<'a> {
    stores: &'a Datastores,
    _gate: MutexGuard<'a, ()>,
}

impl WriteTxn<'_> {
    /// Compute a new tree from the current one and publish it. Nothing is
    /// published when `f` fails.
    pub fn commit_edit<F, E>(&self, name: DatastoreName, f: F) -> Result<Arc<ConfigTree>, E>
    where
        F: FnOnce(&ConfigTree) -> Result<ConfigTree, E>,
        E: From<DatastoreError>,
    {
        let current = self.stores.snapshot(name)?;
        let next = Arc::new(f(&current)?);
        match name {
            DatastoreName::Running => self.stores.running.store(next.clone()),
            DatastoreName::Candidate => self.stores.candidate.store(Some(next.clone())),
        }
        Ok(next)
    }

    /// Validate the candidate with `check` and make it the running tree.
    /// Returns whether there was anything to commit.
    pub fn commit_candidate<F, E>(&self, check: F) -> Result<bool, E>
    where
        F: FnOnce(&ConfigTree) -> Result<(), E>,
        E: From<DatastoreError>,
    {
        self.stores.ensure_enabled(DatastoreName::Candidate)?;
        let Some(candidate) = self.stores.candidate.load_full() else {
            return Ok(false);
        };
        check(&candidate)?;
        self.stores.running.store(candidate);
        self.stores.candidate.store(None);
        Ok(true)
    }

    /// Drop pending candidate changes. Returns whether any existed.
    pub fn discard_candidate(&self) -> bool {
        self.stores.candidate.swap(None).is_some()
    }

    pub fn is_candidate_modified(&self) -> bool {
        self.stores.is_candidate_modified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataNode, QName};

    fn leaf(value: &str) -> ConfigTree {
        ConfigTree::from_roots(vec![DataNode::leaf(QName::new("ed1", "first"), value)])
    }

    #[test]
    fn failed_edit_publishes_nothing() {
        let stores = Datastores::new(leaf("a"), false);
        let before = stores.snapshot(DatastoreName::Running).unwrap();

        let result: Result<_, DatastoreError> = stores.write().commit_edit(DatastoreName::Running, |_| {
            Err(DatastoreError::Unknown("boom".into()))
        });
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &stores.snapshot(DatastoreName::Running).unwrap()));
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let stores = Datastores::new(leaf("a"), false);
        let old = stores.snapshot(DatastoreName::Running).unwrap();
        stores
            .write()
            .commit_edit::<_, DatastoreError>(DatastoreName::Running, |_| Ok(leaf("b")))
            .unwrap();
        assert_eq!(*old, leaf("a"));
        assert_eq!(*stores.snapshot(DatastoreName::Running).unwrap(), leaf("b"));
    }

    #[test]
    fn candidate_mirrors_running_until_edited() {
        let stores = Datastores::new(leaf("a"), true);
        assert_eq!(*stores.snapshot(DatastoreName::Candidate).unwrap(), leaf("a"));
        assert!(!stores.is_candidate_modified());

        stores
            .write()
            .commit_edit::<_, DatastoreError>(DatastoreName::Candidate, |_| Ok(leaf("b")))
            .unwrap();
        assert!(stores.is_candidate_modified());
        assert_eq!(*stores.snapshot(DatastoreName::Running).unwrap(), leaf("a"));

        assert_eq!(stores.write().commit_candidate::<_, DatastoreError>(|_| Ok(())), Ok(true));
        assert_eq!(*stores.snapshot(DatastoreName::Running).unwrap(), leaf("b"));
        assert!(!stores.is_candidate_modified());
        assert_eq!(stores.write().commit_candidate::<_, DatastoreError>(|_| Ok(())), Ok(false));
    }

    #[test]
    fn discard_reverts_candidate() {
        let stores = Datastores::new(leaf("a"), true);
        stores
            .write()
            .commit_edit::<_, DatastoreError>(DatastoreName::Candidate, |_| Ok(leaf("b")))
            .unwrap();
        assert!(stores.write().discard_candidate());
        assert_eq!(*stores.snapshot(DatastoreName::Candidate).unwrap(), leaf("a"));
        assert!(!stores.write().discard_candidate());
    }

    #[test]
    fn writers_wait_for_the_gate() {
        let stores = Datastores::new(leaf("a"), false);
        let txn = stores.write();
        std::thread::scope(|scope| {
            let writer = scope.spawn(|| {
                stores
                    .write()
                    .commit_edit::<_, DatastoreError>(DatastoreName::Running, |_| Ok(leaf("late")))
                    .unwrap();
            });
            std::thread::sleep(std::time::Duration::from_millis(20));
            assert!(!writer.is_finished());
            txn.commit_edit::<_, DatastoreError>(DatastoreName::Running, |_| Ok(leaf("first")))
                .unwrap();
            drop(txn);
            writer.join().unwrap();
        });
        assert_eq!(*stores.snapshot(DatastoreName::Running).unwrap(), leaf("late"));
    }

    #[test]
    fn disabled_candidate_is_unsupported() {
        let stores = Datastores::new(ConfigTree::new(), false);
        assert_eq!(
            stores.snapshot(DatastoreName::Candidate).unwrap_err(),
            DatastoreError::Unsupported(DatastoreName::Candidate)
        );
        assert_eq!("startup".parse::<DatastoreName>().unwrap_err(), DatastoreError::Unknown("startup".into()));
    }
}
