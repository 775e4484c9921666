//! Session, lock and candidate behaviour across several sessions.

use serde_json::{json, Value};
use std::sync::Barrier;
use std::thread;

use netconf_agent::datastore::DatastoreName;
use netconf_agent::session::SessionError;

mod common;
use common::{assert_ok, ed1, ed2, error_tag, Client, EMPTY};

fn lock(target: &str) -> serde_json::Value {
    json!({"operation": "lock", "target": target})
}

fn unlock(target: &str) -> serde_json::Value {
    json!({"operation": "unlock", "target": target})
}

#[test]
fn lock_is_exclusive_and_not_reentrant() {
    let d = common::dispatcher();
    let mut s1 = Client::open(&d);
    let mut s2 = Client::open(&d);

    assert_ok(&s1.rpc(lock("running")));

    let denied = s2.rpc(lock("running"));
    assert_eq!(error_tag(&denied), "lock-denied");
    assert_eq!(denied.errors[0].error_info.session_id, Some(s1.session));

    let again = s1.rpc(lock("running"));
    assert_eq!(error_tag(&again), "lock-denied");
    assert_eq!(again.errors[0].error_info.session_id, Some(s1.session));

    let foreign_unlock = s2.rpc(unlock("running"));
    assert_eq!(error_tag(&foreign_unlock), "lock-denied");
    assert_eq!(foreign_unlock.errors[0].error_info.session_id, Some(s1.session));

    assert_ok(&s1.rpc(unlock("running")));
    assert_ok(&s2.rpc(lock("running")));
}

#[test]
fn unlocking_a_free_datastore_fails() {
    let d = common::dispatcher();
    let mut s1 = Client::open(&d);
    assert_eq!(error_tag(&s1.rpc(unlock("running"))), "operation-failed");
}

#[test]
fn locks_block_writes_but_not_reads() {
    let d = common::dispatcher();
    let mut s1 = Client::open(&d);
    let mut s2 = Client::open(&d);

    assert_ok(&s1.rpc(lock("running")));

    let blocked = s2.edit(ed1("TestFirst", None));
    assert_eq!(error_tag(&blocked), "lock-denied");
    assert_eq!(s2.get_config(), EMPTY);
    assert_ok(&s2.rpc(json!({"operation": "get"})));

    assert_ok(&s1.edit(ed1("TestFirst", None)));
    assert!(s2.get_config().contains("TestFirst"));
}

#[test]
fn ending_a_session_releases_its_locks() {
    let d = common::dispatcher();
    let mut s1 = Client::open(&d);
    let mut s2 = Client::open(&d);

    assert_ok(&s1.rpc(lock("running")));
    assert_ok(&s1.rpc(lock("candidate")));
    assert!(d.end_session(s1.session));

    assert!(d.locks().holder(DatastoreName::Running).is_none());
    assert!(d.locks().holder(DatastoreName::Candidate).is_none());
    assert_ok(&s2.rpc(lock("running")));

    let stale = s1.rpc(json!({"operation": "get"}));
    assert_eq!(error_tag(&stale), "invalid-value");
}

#[test]
fn kill_session_ends_another_session() {
    let d = common::dispatcher();
    let mut s1 = Client::open(&d);
    let mut s2 = Client::open(&d);
    assert_ok(&s2.rpc(lock("running")));

    let own = s1.session.0;
    let reply = s1.rpc(json!({"operation": "kill-session", "session-id": own}));
    assert_eq!(error_tag(&reply), "invalid-value");

    let victim = s2.session.0;
    assert_ok(&s1.rpc(json!({"operation": "kill-session", "session-id": victim})));
    assert!(d.sessions().get(s2.session).is_none());
    assert!(d.locks().holder(DatastoreName::Running).is_none());

    let gone = s1.rpc(json!({"operation": "kill-session", "session-id": victim}));
    assert_eq!(error_tag(&gone), "invalid-value");
}

#[test]
fn close_session_ends_the_caller() {
    let d = common::dispatcher();
    let mut s1 = Client::open(&d);
    assert_ok(&s1.rpc(json!({"operation": "close-session"})));
    assert!(d.sessions().is_empty());
}

#[test]
fn candidate_commit_and_discard() {
    let d = common::dispatcher();
    let mut c = Client::open(&d);

    // No pending changes: both succeed and change nothing.
    assert_ok(&c.rpc(json!({"operation": "commit"})));
    assert_ok(&c.rpc(json!({"operation": "discard-changes"})));

    assert_ok(&c.edit_target("candidate", ed1("Pending", None)));
    assert_eq!(c.get_config(), EMPTY);
    assert!(c.get_config_from("candidate", None).contains("Pending"));

    assert_ok(&c.rpc(json!({"operation": "discard-changes"})));
    assert_eq!(c.get_config_from("candidate", None), EMPTY);

    assert_ok(&c.edit_target("candidate", ed1("Committed", None)));
    assert_ok(&c.rpc(json!({"operation": "commit"})));
    assert!(c.get_config().contains("Committed"));
    assert!(!d.datastores().is_candidate_modified());
}

#[test]
fn commit_respects_locks_on_either_datastore() {
    let d = common::dispatcher();
    let mut s1 = Client::open(&d);
    let mut s2 = Client::open(&d);

    assert_ok(&s1.edit_target("candidate", ed1("x", None)));
    assert_ok(&s2.rpc(lock("running")));

    let reply = s1.rpc(json!({"operation": "commit"}));
    assert_eq!(error_tag(&reply), "lock-denied");
    assert_eq!(reply.errors[0].error_info.session_id, Some(s2.session));
    assert_eq!(s1.get_config(), EMPTY);
}

#[test]
fn candidate_changes_die_with_the_lock_holder() {
    let d = common::dispatcher();
    let mut s1 = Client::open(&d);
    let mut s2 = Client::open(&d);

    assert_ok(&s1.rpc(lock("candidate")));
    assert_ok(&s1.edit_target("candidate", ed1("Abandoned", None)));
    assert!(d.datastores().is_candidate_modified());

    assert!(d.end_session(s1.session));
    assert!(!d.datastores().is_candidate_modified());
    assert_eq!(s2.get_config_from("candidate", None), EMPTY);
}

#[test]
fn candidate_unsupported_when_disabled() {
    let d = common::dispatcher_with(false, 4);
    let mut c = Client::open(&d);
    assert_eq!(error_tag(&c.rpc(lock("candidate"))), "operation-not-supported");
    assert_eq!(
        error_tag(&c.edit_target("candidate", ed1("x", None))),
        "operation-not-supported"
    );
    assert_eq!(error_tag(&c.rpc(json!({"operation": "commit"}))), "operation-not-supported");
}

#[test]
fn validate_checks_the_stored_tree() {
    let d = common::dispatcher();
    let mut c = Client::open(&d);
    assert_ok(&c.rpc(json!({"operation": "validate", "source": "running"})));
    assert_ok(&c.edit_target("candidate", ed1("x", None)));
    assert_ok(&c.rpc(json!({"operation": "validate", "source": "candidate"})));
}

#[test]
fn get_includes_monitoring_state() {
    let d = common::dispatcher();
    let mut s1 = Client::open(&d);
    let _s2 = Client::open(&d);
    assert_ok(&s1.edit(ed1("TestFirst", None)));
    assert_ok(&s1.rpc(lock("running")));

    let reply = s1.rpc(json!({"operation": "get"}));
    assert_ok(&reply);
    let text = serde_json::to_string(&reply.data.expect("data")).expect("json");
    assert!(text.contains("TestFirst"));
    assert!(text.contains("netconf-state"));
    assert!(text.contains("locked-by-session"));
    assert_eq!(text.matches("\"session-id\"").count(), 2);

    let config = s1.get_config();
    assert!(!config.contains("netconf-state"));
}

#[test]
fn session_limit_is_enforced() {
    let d = common::dispatcher_with(true, 2);
    let _a = Client::open(&d);
    let b = Client::open(&d);
    assert!(matches!(
        d.open_session("late", "test", None),
        Err(SessionError::Limit(2))
    ));

    d.end_session(b.session);
    assert!(d.open_session("late", "test", None).is_ok());
}

#[test]
fn message_ids_are_echoed() {
    let d = common::dispatcher();
    let mut c = Client::open(&d);
    let ok = c.rpc(json!({"operation": "get-config", "source": "running"}));
    assert_eq!(ok.message_id.as_deref(), Some("1"));
    let err = c.rpc(unlock("running"));
    assert_eq!(err.message_id.as_deref(), Some("2"));
}

#[test]
fn modified_candidate_cannot_be_locked() {
    let d = common::dispatcher();
    let mut s1 = Client::open(&d);
    let mut s2 = Client::open(&d);

    assert_ok(&s1.edit_target("candidate", ed1("Unlocked", None)));
    let denied = s2.rpc(lock("candidate"));
    assert_eq!(error_tag(&denied), "lock-denied");
    assert_eq!(denied.errors[0].error_info.session_id, None);
    assert!(d.locks().holder(DatastoreName::Candidate).is_none());

    // Running is unaffected by pending candidate changes.
    assert_ok(&s2.rpc(lock("running")));

    assert_ok(&s1.rpc(json!({"operation": "discard-changes"})));
    assert_ok(&s2.rpc(lock("candidate")));
}

fn leaf_text(value: &Value) -> String {
    value
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

#[test]
fn readers_never_see_a_partial_commit() {
    let d = common::dispatcher();

    thread::scope(|s| {
        s.spawn(|| {
            let mut writer = Client::open(&d);
            for i in 0..200 {
                assert_ok(&writer.edit(ed2(&format!("n{i}"), Some(i), Some("replace"))));
            }
        });
        for _ in 0..4 {
            s.spawn(|| {
                let mut reader = Client::open(&d);
                for _ in 0..200 {
                    let data = reader.get_config_value(None);
                    let Some(top) = data.as_array().and_then(|a| a.first()) else {
                        continue;
                    };
                    let children = top["children"].as_array().expect("top has children");
                    assert_eq!(children.len(), 2, "{data}");
                    let name = leaf_text(&children[0]["value"]);
                    let num = leaf_text(&children[1]["value"]);
                    assert_eq!(name, format!("n{num}"));
                }
            });
        }
    });
}

#[test]
fn no_edit_lands_after_a_lock_is_granted() {
    for _ in 0..50 {
        let d = common::dispatcher();
        let start = Barrier::new(2);

        let locked_view = thread::scope(|s| {
            let holder = s.spawn(|| {
                let mut c = Client::open(&d);
                start.wait();
                assert_ok(&c.rpc(lock("running")));
                c.get_config()
            });
            s.spawn(|| {
                let mut c = Client::open(&d);
                start.wait();
                for i in 0.. {
                    let reply = c.edit(ed1(&format!("v{i}"), None));
                    if reply.is_error() {
                        assert_eq!(error_tag(&reply), "lock-denied");
                        break;
                    }
                }
            });
            holder.join().unwrap()
        });

        let mut observer = Client::open(&d);
        assert_eq!(observer.get_config(), locked_view);
    }
}

#[test]
fn concurrent_hellos_respect_the_session_limit() {
    let d = common::dispatcher_with(true, 3);
    let start = Barrier::new(12);
    let opened: usize = thread::scope(|s| {
        let handles: Vec<_> = (0..12)
            .map(|_| {
                s.spawn(|| {
                    start.wait();
                    d.open_session("tester", "test", None).is_ok() as usize
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });
    assert_eq!(opened, 3);
    assert_eq!(d.sessions().len(), 3);
}
