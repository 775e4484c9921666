//! Data nodes, qualified names and edit operations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Namespace-qualified node name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QName {
    pub namespace: String,
    pub name: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)
    }
}

/// Schema kind of a data node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Container,
    /// One entry of a keyed list.
    List,
    Leaf,
    /// One value of a leaf-list.
    LeafList,
}

impl NodeKind {
    /// Kinds that own child nodes.
    pub fn is_interior(self) -> bool {
        matches!(self, NodeKind::Container | NodeKind::List)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Container => "container",
            NodeKind::List => "list",
            NodeKind::Leaf => "leaf",
            NodeKind::LeafList => "leaf-list",
        };
        f.write_str(s)
    }
}

/// Edit operation carried by a patch node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Merge,
    Replace,
    Create,
    Delete,
    Remove,
    None,
}

impl Operation {
    /// Operations that may bring new data into the tree.
    pub fn is_constructive(self) -> bool {
        matches!(self, Operation::Merge | Operation::Replace | Operation::Create)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Merge => "merge",
            Operation::Replace => "replace",
            Operation::Create => "create",
            Operation::Delete => "delete",
            Operation::Remove => "remove",
            Operation::None => "none",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown operation name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown edit operation '{0}'")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" => Ok(Operation::Merge),
            "replace" => Ok(Operation::Replace),
            "create" => Ok(Operation::Create),
            "delete" => Ok(Operation::Delete),
            "remove" => Ok(Operation::Remove),
            "none" => Ok(Operation::None),
            other => Err(UnknownOperation(other.to_string())),
        }
    }
}

/// A node of a configuration or patch tree.
///
/// `operation` is only meaningful in patch trees; trees produced by the
/// edit engine never carry one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataNode {
    pub name: QName,
    pub kind: NodeKind,
    pub value: Option<String>,
    pub children: Vec<DataNode>,
    pub operation: Option<Operation>,
}

impl DataNode {
    fn new(name: QName, kind: NodeKind, value: Option<String>) -> Self {
        Self {
            name,
            kind,
            value,
            children: Vec::new(),
            operation: None,
        }
    }

    pub fn container(name: QName) -> Self {
        Self::new(name, NodeKind::Container, None)
    }

    pub fn list_entry(name: QName) -> Self {
        Self::new(name, NodeKind::List, None)
    }

    pub fn leaf(name: QName, value: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Leaf, Some(value.into()))
    }

    pub fn leaf_list_entry(name: QName, value: impl Into<String>) -> Self {
        Self::new(name, NodeKind::LeafList, Some(value.into()))
    }

    /// Copy of this node without children or operation.
    pub fn shell(&self) -> Self {
        Self::new(self.name.clone(), self.kind, self.value.clone())
    }

    pub fn with_child(mut self, child: DataNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = DataNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = Some(operation);
        self
    }

    /// First child with the given local name.
    pub fn child(&self, local_name: &str) -> Option<&DataNode> {
        self.children.iter().find(|c| c.name.name == local_name)
    }

    /// Value of the first child leaf with the given local name.
    pub fn child_value(&self, local_name: &str) -> Option<&str> {
        self.child(local_name).and_then(|c| c.value.as_deref())
    }

    /// Whether this node or any descendant explicitly requests an operation
    /// satisfying `pred`.
    pub fn any_operation(&self, pred: &impl Fn(Operation) -> bool) -> bool {
        self.operation.is_some_and(pred) || self.children.iter().any(|c| c.any_operation(pred))
    }

    /// Whether any descendant (excluding this node) explicitly requests an
    /// operation satisfying `pred`.
    pub fn any_descendant_operation(&self, pred: &impl Fn(Operation) -> bool) -> bool {
        self.children.iter().any(|c| c.any_operation(pred))
    }

    /// Number of nodes in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(DataNode::subtree_len).sum::<usize>()
    }
}
