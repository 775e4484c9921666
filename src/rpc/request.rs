//! RPC request messages.
//!
//! ```json
//! {"message-id": "101", "operation": "edit-config", "target": "running",
//!  "default-operation": "merge", "config": [ ... wire nodes ... ]}
//! ```

use serde::{Deserialize, Serialize};

use crate::datastore::DatastoreName;
use crate::filter::{Filter, FilterNode, PathExpr, PathSyntaxError};
use crate::model::Operation;
use crate::rpc::wire::WireNode;
use crate::session::SessionId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcMessage {
    #[serde(rename = "message-id")]
    pub message_id: String,
    #[serde(flatten)]
    pub rpc: Rpc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "operation",
    rename_all = "kebab-case",
    rename_all_fields = "kebab-case"
)]
pub enum Rpc {
    Get {
        #[serde(default)]
        filter: Option<WireFilter>,
    },
    GetConfig {
        source: DatastoreName,
        #[serde(default)]
        filter: Option<WireFilter>,
    },
    EditConfig {
        target: DatastoreName,
        #[serde(default)]
        default_operation: DefaultOperation,
        #[serde(default)]
        test_option: TestOption,
        #[serde(default)]
        config: Vec<WireNode>,
    },
    Lock {
        target: DatastoreName,
    },
    Unlock {
        target: DatastoreName,
    },
    Validate {
        source: DatastoreName,
    },
    Commit,
    DiscardChanges,
    CloseSession,
    KillSession {
        session_id: SessionId,
    },
}

impl Rpc {
    pub fn name(&self) -> &'static str {
        match self {
            Rpc::Get { .. } => "get",
            Rpc::GetConfig { .. } => "get-config",
            Rpc::EditConfig { .. } => "edit-config",
            Rpc::Lock { .. } => "lock",
            Rpc::Unlock { .. } => "unlock",
            Rpc::Validate { .. } => "validate",
            Rpc::Commit => "commit",
            Rpc::DiscardChanges => "discard-changes",
            Rpc::CloseSession => "close-session",
            Rpc::KillSession { .. } => "kill-session",
        }
    }
}

/// Request-level default for nodes without an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultOperation {
    #[default]
    Merge,
    Replace,
    None,
}

impl From<DefaultOperation> for Operation {
    fn from(op: DefaultOperation) -> Self {
        match op {
            DefaultOperation::Merge => Operation::Merge,
            DefaultOperation::Replace => Operation::Replace,
            DefaultOperation::None => Operation::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestOption {
    #[default]
    TestThenSet,
    Set,
    /// Validate the edit without committing it.
    TestOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireFilter {
    Subtree {
        #[serde(default)]
        content: Vec<FilterNode>,
    },
    Xpath {
        select: String,
    },
}

impl WireFilter {
    pub fn into_filter(self) -> Result<Filter, PathSyntaxError> {
        match self {
            WireFilter::Subtree { content } => Ok(Filter::Subtree(content)),
            WireFilter::Xpath { select } => Ok(Filter::XPath(PathExpr::parse(&select)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> RpcMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn edit_config_with_defaults() {
        let msg = parse(json!({
            "message-id": "1",
            "operation": "edit-config",
            "target": "running",
            "config": [{"name": "first", "value": "x"}]
        }));
        assert_eq!(msg.message_id, "1");
        match msg.rpc {
            Rpc::EditConfig {
                target,
                default_operation,
                test_option,
                config,
            } => {
                assert_eq!(target, DatastoreName::Running);
                assert_eq!(default_operation, DefaultOperation::Merge);
                assert_eq!(test_option, TestOption::TestThenSet);
                assert_eq!(config.len(), 1);
            }
            other => panic!("unexpected rpc {:?}", other),
        }
    }

    #[test]
    fn kebab_case_fields_and_unit_variants() {
        let msg = parse(json!({
            "message-id": "2",
            "operation": "edit-config",
            "target": "candidate",
            "default-operation": "none",
            "test-option": "test-only"
        }));
        assert!(matches!(
            msg.rpc,
            Rpc::EditConfig {
                default_operation: DefaultOperation::None,
                test_option: TestOption::TestOnly,
                ..
            }
        ));

        let kill = parse(json!({"message-id": "3", "operation": "kill-session", "session-id": 7}));
        assert_eq!(kill.rpc, Rpc::KillSession { session_id: SessionId(7) });

        let commit = parse(json!({"message-id": "4", "operation": "commit"}));
        assert_eq!(commit.rpc.name(), "commit");
    }

    #[test]
    fn filters() {
        let msg = parse(json!({
            "message-id": "5",
            "operation": "get-config",
            "source": "running",
            "filter": {"type": "xpath", "select": "/top/area[1]"}
        }));
        let Rpc::GetConfig { filter: Some(filter), .. } = msg.rpc else {
            panic!("expected get-config with filter");
        };
        assert!(matches!(filter.into_filter(), Ok(Filter::XPath(_))));

        let bad = WireFilter::Xpath {
            select: "top[".to_string(),
        };
        assert!(bad.into_filter().is_err());
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let result: Result<RpcMessage, _> =
            serde_json::from_value(json!({"message-id": "6", "operation": "reboot"}));
        assert!(result.is_err());
    }
}
