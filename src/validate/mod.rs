//! Whole-tree validation against the schema.
//!
//! # Responsibilities
//! - Every node exists in the schema with the kind it claims
//! - No state data inside a configuration tree
//! - Leaf values conform to their type (ranges, lengths, enumerations)
//! - List entries carry all keys; key tuples and leaf-list values are unique
//! - Mandatory leaves are present; `leafref` values point at existing data
//!
//! # Design Decisions
//! - The edit engine only sees the `Validator` trait, so tests can swap in
//!   a stub oracle
//! - Validation stops at the first violation and reports its path

pub mod types;

use std::collections::HashSet;
use std::sync::Arc;

use crate::filter::PathExpr;
use crate::model::{ConfigTree, DataNode, DataPath, NodeKind};
use crate::schema::{LeafType, Schema, SchemaNode};

/// A schema constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: {message}")]
pub struct ValidationError {
    pub path: String,
    pub message: String,
    pub app_tag: Option<String>,
}

impl ValidationError {
    pub fn new(path: &DataPath, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
            app_tag: None,
        }
    }

    pub fn with_app_tag(mut self, tag: impl Into<String>) -> Self {
        self.app_tag = Some(tag.into());
        self
    }
}

/// Schema-constraint oracle consulted after every structural edit.
pub trait Validator: Send + Sync {
    fn validate(&self, tree: &ConfigTree) -> Result<(), ValidationError>;
}

/// Validates configuration trees against a [`Schema`].
pub struct SchemaValidator {
    schema: Arc<Schema>,
}

impl SchemaValidator {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self { schema }
    }

    fn check_siblings(
        &self,
        tree: &ConfigTree,
        nodes: &[DataNode],
        parent: Option<&SchemaNode>,
        path: &DataPath,
    ) -> Result<(), ValidationError> {
        let mut singletons = HashSet::new();
        let mut entries = HashSet::new();
        let mut values = HashSet::new();

        for node in nodes {
            let schema_node = self.schema.lookup(parent, &node.name).ok_or_else(|| {
                ValidationError::new(path, format!("unknown element '{}'", node.name))
            })?;
            let prefix = schema_node.module.as_str();
            let local = node.name.name.as_str();

            if schema_node.kind != node.kind {
                return Err(ValidationError::new(
                    &path.child(prefix, local),
                    format!("'{}' is a {}, not a {}", local, schema_node.kind, node.kind),
                ));
            }
            if !schema_node.config {
                return Err(ValidationError::new(
                    &path.child(prefix, local),
                    "state data is not allowed in configuration",
                ));
            }

            match node.kind {
                NodeKind::Container => {
                    let here = path.child(prefix, local);
                    if !singletons.insert(&node.name) {
                        return Err(ValidationError::new(&here, "duplicate container")
                            .with_app_tag("too-many-elements"));
                    }
                    self.check_siblings(tree, &node.children, Some(schema_node), &here)?;
                    self.check_mandatory(node, schema_node, &here)?;
                }
                NodeKind::List => {
                    let keys = list_keys(node, schema_node).map_err(|key| {
                        ValidationError::new(
                            &path.child(prefix, local),
                            format!("list entry is missing key '{}'", key),
                        )
                        .with_app_tag("missing-key")
                    })?;
                    let here = path.entry(prefix, local, keys.iter().map(|(k, v)| (*k, *v)));
                    let tuple: Vec<&str> = keys.iter().map(|(_, v)| *v).collect();
                    if !entries.insert((&node.name, tuple)) {
                        return Err(ValidationError::new(&here, "duplicate list entry")
                            .with_app_tag("data-not-unique"));
                    }
                    self.check_siblings(tree, &node.children, Some(schema_node), &here)?;
                    self.check_mandatory(node, schema_node, &here)?;
                }
                NodeKind::Leaf => {
                    let here = path.child(prefix, local);
                    if !singletons.insert(&node.name) {
                        return Err(ValidationError::new(&here, "duplicate leaf")
                            .with_app_tag("too-many-elements"));
                    }
                    self.check_value(tree, node, schema_node, &here)?;
                }
                NodeKind::LeafList => {
                    let value = node.value.as_deref().unwrap_or_default();
                    let here = path.value(prefix, local, value);
                    if !values.insert((&node.name, value)) {
                        return Err(ValidationError::new(&here, "duplicate leaf-list value")
                            .with_app_tag("data-not-unique"));
                    }
                    self.check_value(tree, node, schema_node, &here)?;
                }
            }
        }
        Ok(())
    }

    fn check_mandatory(
        &self,
        node: &DataNode,
        schema_node: &SchemaNode,
        path: &DataPath,
    ) -> Result<(), ValidationError> {
        for child in schema_node.children.iter().filter(|c| c.mandatory && c.config) {
            if !node.children.iter().any(|c| c.name == child.qname()) {
                return Err(ValidationError::new(
                    &path.child(&child.module, &child.name),
                    format!("missing mandatory element '{}'", child.name),
                )
                .with_app_tag("missing-element"));
            }
        }
        Ok(())
    }

    fn check_value(
        &self,
        tree: &ConfigTree,
        node: &DataNode,
        schema_node: &SchemaNode,
        path: &DataPath,
    ) -> Result<(), ValidationError> {
        let leaf_type = schema_node.leaf_type();
        if let LeafType::Leafref { path: target } = &leaf_type {
            let value = node.value.as_deref().unwrap_or_default();
            return self.check_leafref(tree, value, target, path);
        }
        types::check(&leaf_type, node.value.as_deref())
            .map_err(|message| ValidationError::new(path, message))
    }

    fn check_leafref(
        &self,
        tree: &ConfigTree,
        value: &str,
        target: &str,
        path: &DataPath,
    ) -> Result<(), ValidationError> {
        let expr = PathExpr::parse(target).map_err(|e| {
            ValidationError::new(path, format!("invalid leafref path '{}': {}", target, e))
        })?;
        let found = expr
            .select_nodes(&self.schema, tree)
            .iter()
            .any(|n| n.value.as_deref() == Some(value));
        if found {
            Ok(())
        } else {
            Err(ValidationError::new(
                path,
                format!("leafref value '{}' does not match any {}", value, target),
            )
            .with_app_tag("instance-required"))
        }
    }
}

impl Validator for SchemaValidator {
    fn validate(&self, tree: &ConfigTree) -> Result<(), ValidationError> {
        self.check_siblings(tree, tree.roots(), None, &DataPath::root())
    }
}

/// Key values of a list entry in key order, or the first missing key.
pub(crate) fn list_keys<'n>(
    node: &'n DataNode,
    schema_node: &'n SchemaNode,
) -> Result<Vec<(&'n str, &'n str)>, &'n str> {
    schema_node
        .keys
        .iter()
        .map(|key| {
            node.children
                .iter()
                .find(|c| c.name.name == *key && c.name.namespace == schema_node.namespace)
                .and_then(|c| c.value.as_deref())
                .map(|v| (key.as_str(), v))
                .ok_or(key.as_str())
        })
        .collect()
}
