//! JSON wire form of data trees.
//!
//! ```json
//! [{"name": "top", "namespace": "urn:example:rfc1", "children": [
//!     {"name": "interface", "operation": "create", "children": [
//!         {"name": "name", "value": "eth0"},
//!         {"name": "mtu", "value": 1500}
//!     ]}
//! ]}]
//! ```
//!
//! A missing namespace is inherited from the parent. A root may omit it when
//! exactly one module defines a top-level node of that name. Namespaces may
//! be given as namespace URI, module name or module prefix.

use serde::{Deserialize, Deserializer, Serialize};

use crate::model::{ConfigTree, DataNode, DataPath, NodeKind, Operation, QName};
use crate::schema::{Schema, SchemaNode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<String>,
    /// Edit operation attribute; parsed when the tree is decoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<WireNode>,
}

impl WireNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            value: None,
            operation: None,
            children: Vec::new(),
        }
    }
}

/// Accept strings, numbers and booleans as leaf values.
fn scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(serde_json::Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "leaf value must be a scalar, found {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown element '{element}' at {path}")]
    UnknownElement { path: String, element: String },
    #[error("unknown namespace '{0}'")]
    UnknownNamespace(String),
    #[error("top-level element '{0}' is defined by several modules; a namespace is required")]
    AmbiguousRoot(String),
    #[error("{path}: a {kind} cannot have children")]
    UnexpectedChildren { path: String, kind: NodeKind },
    #[error("{path}: unknown edit operation '{operation}'")]
    BadOperation {
        path: String,
        element: String,
        operation: String,
    },
}

/// Resolve a wire tree against the schema.
pub fn decode_tree(schema: &Schema, nodes: &[WireNode]) -> Result<ConfigTree, DecodeError> {
    let mut roots = Vec::with_capacity(nodes.len());
    for wire in nodes {
        let namespace = match &wire.namespace {
            Some(ns) => schema
                .resolve_namespace(ns)
                .ok_or_else(|| DecodeError::UnknownNamespace(ns.clone()))?
                .to_string(),
            None => {
                let mut candidates = schema.roots_named(&wire.name);
                match (candidates.next(), candidates.next()) {
                    (Some(root), None) => root.namespace.clone(),
                    (Some(_), Some(_)) => return Err(DecodeError::AmbiguousRoot(wire.name.clone())),
                    (None, _) => {
                        return Err(DecodeError::UnknownElement {
                            path: format!("/{}", wire.name),
                            element: wire.name.clone(),
                        })
                    }
                }
            }
        };
        roots.push(decode_node(schema, wire, None, &namespace, &DataPath::root())?);
    }
    Ok(ConfigTree::from_roots(roots))
}

fn decode_node(
    schema: &Schema,
    wire: &WireNode,
    parent: Option<&SchemaNode>,
    inherited_ns: &str,
    path: &DataPath,
) -> Result<DataNode, DecodeError> {
    let namespace = match &wire.namespace {
        Some(ns) => schema
            .resolve_namespace(ns)
            .ok_or_else(|| DecodeError::UnknownNamespace(ns.clone()))?,
        None => inherited_ns,
    };
    let name = QName::new(namespace, wire.name.as_str());
    let prefix = schema.prefix_of(namespace).unwrap_or(namespace);
    let here = path.child(prefix, &wire.name);

    let schema_node = schema
        .lookup(parent, &name)
        .ok_or_else(|| DecodeError::UnknownElement {
            path: here.to_string(),
            element: wire.name.clone(),
        })?;

    if !schema_node.kind.is_interior() && !wire.children.is_empty() {
        return Err(DecodeError::UnexpectedChildren {
            path: here.to_string(),
            kind: schema_node.kind,
        });
    }

    let mut node = match schema_node.kind {
        NodeKind::Container => DataNode::container(name),
        NodeKind::List => DataNode::list_entry(name),
        NodeKind::Leaf => DataNode::leaf(name, ""),
        NodeKind::LeafList => DataNode::leaf_list_entry(name, ""),
    };
    if !schema_node.kind.is_interior() {
        node.value = Some(wire.value.clone().unwrap_or_default());
    }
    node.operation = wire
        .operation
        .as_deref()
        .map(str::parse::<Operation>)
        .transpose()
        .map_err(|e| DecodeError::BadOperation {
            path: here.to_string(),
            element: wire.name.clone(),
            operation: e.0,
        })?;

    for child in &wire.children {
        node.children
            .push(decode_node(schema, child, Some(schema_node), namespace, &here)?);
    }
    Ok(node)
}

/// Render a tree in wire form. Namespaces are written on roots and wherever
/// they change.
pub fn encode_tree(tree: &ConfigTree) -> Vec<WireNode> {
    tree.roots().iter().map(|n| encode_node(n, None)).collect()
}

fn encode_node(node: &DataNode, parent_ns: Option<&str>) -> WireNode {
    let namespace = (parent_ns != Some(node.name.namespace.as_str()))
        .then(|| node.name.namespace.clone());
    WireNode {
        name: node.name.name.clone(),
        namespace,
        value: node.value.clone(),
        operation: node.operation.map(|op| op.to_string()),
        children: node
            .children
            .iter()
            .map(|c| encode_node(c, Some(&node.name.namespace)))
            .collect(),
    }
}
