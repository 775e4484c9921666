//! Built-in `ietf-netconf-monitoring` state module.

use crate::schema::node::{LeafType, Module, SchemaNode};

pub const MONITORING_MODULE: &str = "ietf-netconf-monitoring";
pub const MONITORING_NS: &str = "urn:ietf:params:xml:ns:yang:ietf-netconf-monitoring";

fn counter(name: &str) -> SchemaNode {
    SchemaNode::leaf(name, LeafType::integer(0, u32::MAX as i64))
}

/// The monitoring module: lock state per datastore and the session table.
/// Everything in it is state data.
pub fn monitoring_module() -> Module {
    let locks = SchemaNode::container("locks").with_children([SchemaNode::container(
        "global-lock",
    )
    .with_children([
        SchemaNode::leaf("locked-by-session", LeafType::integer(1, u32::MAX as i64)),
        SchemaNode::leaf("locked-time", LeafType::string()),
    ])]);

    let datastores = SchemaNode::container("datastores").with_children([SchemaNode::list(
        "datastore",
        ["name"],
    )
    .with_children([
        SchemaNode::leaf("name", LeafType::enumeration(["running", "candidate"])),
        locks,
    ])]);

    let sessions = SchemaNode::container("sessions").with_children([SchemaNode::list(
        "session",
        ["session-id"],
    )
    .with_children([
        SchemaNode::leaf("session-id", LeafType::integer(1, u32::MAX as i64)),
        SchemaNode::leaf("transport", LeafType::string()),
        SchemaNode::leaf("username", LeafType::string()),
        SchemaNode::leaf("source-host", LeafType::string()),
        SchemaNode::leaf("login-time", LeafType::string()),
        counter("in-rpcs"),
        counter("in-bad-rpcs"),
        counter("out-rpc-errors"),
    ])]);

    Module::new(
        MONITORING_MODULE,
        MONITORING_NS,
        [SchemaNode::container("netconf-state")
            .state()
            .with_children([datastores, sessions])],
    )
    .with_prefix("ncm")
}
