//! Operational state served by `get`: the `netconf-state` subtree.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::datastore::DatastoreName;
use crate::lock::LockManager;
use crate::model::{ConfigTree, DataNode, QName};
use crate::schema::builtin::MONITORING_NS;
use crate::session::SessionRegistry;

fn q(name: &str) -> QName {
    QName::new(MONITORING_NS, name)
}

fn leaf(name: &str, value: impl ToString) -> DataNode {
    DataNode::leaf(q(name), value.to_string())
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Snapshot of lock and session state as a data tree.
pub fn state_tree(
    locks: &LockManager,
    sessions: &SessionRegistry,
    candidate_enabled: bool,
) -> ConfigTree {
    let mut names = vec![DatastoreName::Running];
    if candidate_enabled {
        names.push(DatastoreName::Candidate);
    }

    let datastores = DataNode::container(q("datastores")).with_children(names.into_iter().map(
        |name| {
            let mut entry = DataNode::list_entry(q("datastore")).with_child(leaf("name", name));
            if let Some(record) = locks.holder(name) {
                entry.children.push(DataNode::container(q("locks")).with_child(
                    DataNode::container(q("global-lock")).with_children([
                        leaf("locked-by-session", record.owner),
                        leaf("locked-time", timestamp(record.acquired_at)),
                    ]),
                ));
            }
            entry
        },
    ));

    let sessions = DataNode::container(q("sessions")).with_children(sessions.all().iter().map(
        |s| {
            let mut entry = DataNode::list_entry(q("session")).with_children([
                leaf("session-id", s.id),
                leaf("transport", &s.transport),
                leaf("username", &s.username),
            ]);
            if let Some(host) = &s.source_host {
                entry.children.push(leaf("source-host", host));
            }
            entry.children.extend([
                leaf("login-time", timestamp(s.login_time)),
                leaf("in-rpcs", s.in_rpcs()),
                leaf("in-bad-rpcs", s.in_bad_rpcs()),
                leaf("out-rpc-errors", s.out_rpc_errors()),
            ]);
            entry
        },
    ));

    ConfigTree::from_roots(vec![
        DataNode::container(q("netconf-state")).with_children([datastores, sessions])
    ])
}
