//! Subtree filtering (RFC 6241 section 6).
//!
//! Filter node roles:
//! - content match: a node carrying a value; the target must have an equal
//!   value, and all content matches of a sibling set must hold for the
//!   parent to be included
//! - selection: no value and no children; selects the whole matching subtree
//! - containment: has children; recurses and is included only if something
//!   below it was selected

use serde::{Deserialize, Serialize};

use crate::filter::selection::Selection;
use crate::model::DataNode;
use crate::schema::Schema;

/// One node of a subtree filter. A missing namespace matches any namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FilterNode>,
}

impl FilterNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            value: None,
            children: Vec::new(),
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = FilterNode>) -> Self {
        self.children.extend(children);
        self
    }

    fn is_content_match(&self) -> bool {
        self.value.is_some() && self.children.is_empty()
    }

    fn matches_name(&self, node: &DataNode, schema: &Schema) -> bool {
        if node.name.name != self.name {
            return false;
        }
        match &self.namespace {
            None => true,
            Some(ns) => {
                let resolved = schema.resolve_namespace(ns).unwrap_or(ns);
                resolved == node.name.namespace
            }
        }
    }
}

/// Select every part of the tree matched by the top-level filter nodes.
pub fn evaluate(schema: &Schema, filter: &[FilterNode], roots: &[DataNode]) -> Selection {
    let mut selection = Selection::new();
    for f in filter {
        for (i, root) in roots.iter().enumerate() {
            if f.matches_name(root, schema) {
                match_node(schema, f, root, &[i], &mut selection);
            }
        }
    }
    selection
}

/// Match `filter` against `node` (names already equal). Returns whether
/// anything at or below `node` was selected.
fn match_node(
    schema: &Schema,
    filter: &FilterNode,
    node: &DataNode,
    path: &[usize],
    out: &mut Selection,
) -> bool {
    if let Some(expected) = &filter.value {
        if node.value.as_deref() != Some(expected.as_str()) {
            return false;
        }
    }
    if filter.children.is_empty() {
        out.insert(path.to_vec());
        return true;
    }

    let mut local = Selection::new();

    for f in filter.children.iter().filter(|f| f.is_content_match()) {
        let mut matched = false;
        for (i, child) in node.children.iter().enumerate() {
            if f.matches_name(child, schema) && child.value == f.value {
                local.insert(child_path(path, i));
                matched = true;
            }
        }
        if !matched {
            return false;
        }
    }

    if filter.children.iter().all(FilterNode::is_content_match) {
        out.insert(path.to_vec());
        return true;
    }

    for f in filter.children.iter().filter(|f| !f.is_content_match()) {
        for (i, child) in node.children.iter().enumerate() {
            if f.matches_name(child, schema) {
                match_node(schema, f, child, &child_path(path, i), &mut local);
            }
        }
    }

    if local.is_empty() {
        return false;
    }
    out.append(&mut local);
    true
}

fn child_path(path: &[usize], index: usize) -> Vec<usize> {
    let mut child = path.to_vec();
    child.push(index);
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QName;
    use crate::schema::{LeafType, Module, SchemaNode};

    fn q(name: &str) -> QName {
        QName::new("urn:users", name)
    }

    fn schema() -> Schema {
        Schema::new(vec![Module::new(
            "users",
            "urn:users",
            [SchemaNode::container("users").with_children([SchemaNode::list("user", ["name"])
                .with_children([
                    SchemaNode::leaf("name", LeafType::string()),
                    SchemaNode::leaf("type", LeafType::string()),
                    SchemaNode::leaf("full-name", LeafType::string()),
                ])])],
        )])
        .unwrap()
    }

    fn roots() -> Vec<DataNode> {
        let user = |name: &str, kind: &str| {
            DataNode::list_entry(q("user")).with_children([
                DataNode::leaf(q("name"), name),
                DataNode::leaf(q("type"), kind),
                DataNode::leaf(q("full-name"), format!("{} full", name)),
            ])
        };
        vec![DataNode::container(q("users")).with_children([
            user("root", "superuser"),
            user("fred", "admin"),
            user("barney", "admin"),
        ])]
    }

    fn run(filter: FilterNode) -> Vec<Vec<usize>> {
        evaluate(&schema(), &[filter], &roots()).into_iter().collect()
    }

    #[test]
    fn selection_node_takes_whole_subtree() {
        assert_eq!(run(FilterNode::new("users")), vec![vec![0]]);
    }

    #[test]
    fn content_match_only_selects_matching_entries_whole() {
        let filter = FilterNode::new("users").with_children([FilterNode::new("user")
            .with_children([FilterNode::new("name").with_value("fred")])]);
        assert_eq!(run(filter), vec![vec![0, 1]]);
    }

    #[test]
    fn content_match_with_selection_limits_fields() {
        let filter = FilterNode::new("users").with_children([FilterNode::new("user")
            .with_children([
                FilterNode::new("type").with_value("admin"),
                FilterNode::new("full-name"),
            ])]);
        assert_eq!(
            run(filter),
            vec![vec![0, 1, 1], vec![0, 1, 2], vec![0, 2, 1], vec![0, 2, 2]]
        );
    }

    #[test]
    fn unmatched_containment_is_empty() {
        let filter = FilterNode::new("users")
            .with_children([FilterNode::new("user").with_children([FilterNode::new("missing")])]);
        assert!(run(filter).is_empty());
        assert!(run(FilterNode::new("nonexistent")).is_empty());
    }

    #[test]
    fn namespace_resolves_module_name() {
        assert_eq!(run(FilterNode::new("users").in_namespace("users")), vec![vec![0]]);
        assert!(run(FilterNode::new("users").in_namespace("urn:other")).is_empty());
    }
}
