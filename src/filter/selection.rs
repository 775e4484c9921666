//! Node selections and pruning.
//!
//! A selection is a set of index paths into a tree (`[2, 0, 5]` is the sixth
//! child of the first child of the third root). Ordering index paths
//! lexicographically is document order, so a `BTreeSet` both deduplicates
//! and orders the result.

use std::collections::BTreeSet;

use crate::model::{ConfigTree, DataNode, NodeKind};
use crate::schema::{Schema, SchemaNode};

pub type Selection = BTreeSet<Vec<usize>>;

/// Node at an index path; `None` for the empty path or a stale index.
pub fn node_at<'t>(roots: &'t [DataNode], path: &[usize]) -> Option<&'t DataNode> {
    let (first, rest) = path.split_first()?;
    let mut node = roots.get(*first)?;
    for index in rest {
        node = node.children.get(*index)?;
    }
    Some(node)
}

/// Children of the node at `path`; the roots for the empty path.
pub fn children_at<'t>(roots: &'t [DataNode], path: &[usize]) -> &'t [DataNode] {
    if path.is_empty() {
        return roots;
    }
    node_at(roots, path).map(|n| n.children.as_slice()).unwrap_or(&[])
}

/// Index paths of every node strictly below `path`, in document order.
pub fn descendants(roots: &[DataNode], path: &[usize], out: &mut Vec<Vec<usize>>) {
    for (i, _) in children_at(roots, path).iter().enumerate() {
        let mut child = path.to_vec();
        child.push(i);
        out.push(child.clone());
        descendants(roots, &child, out);
    }
}

/// Build the response tree for a selection: every selected node is copied
/// whole, and ancestors are synthesized to preserve the path from the root.
/// Synthesized list entries keep their key leaves so they stay addressable.
pub fn prune(schema: &Schema, tree: &ConfigTree, selection: &Selection) -> ConfigTree {
    let mut roots = Vec::new();
    for (i, node) in tree.roots().iter().enumerate() {
        let schema_node = schema.root(&node.name);
        if let Some(pruned) = prune_node(node, schema_node, &[i], selection) {
            roots.push(pruned);
        }
    }
    ConfigTree::from_roots(roots)
}

fn prune_node(
    node: &DataNode,
    schema_node: Option<&SchemaNode>,
    path: &[usize],
    selection: &Selection,
) -> Option<DataNode> {
    if selection.contains(path) {
        return Some(node.clone());
    }

    // Selected descendants sort directly after `path` and share it as prefix.
    let has_selected_descendant = selection
        .range(path.to_vec()..)
        .next()
        .is_some_and(|p| p.starts_with(path));
    if !has_selected_descendant {
        return None;
    }

    let mut out = node.shell();
    for (i, child) in node.children.iter().enumerate() {
        let mut child_path = path.to_vec();
        child_path.push(i);
        let child_schema = schema_node.and_then(|s| s.child(&child.name));
        if let Some(pruned) = prune_node(child, child_schema, &child_path, selection) {
            out.children.push(pruned);
        } else if node.kind == NodeKind::List
            && schema_node.is_some_and(|s| s.is_key(&child.name.name))
        {
            out.children.push(child.clone());
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QName;
    use crate::schema::{LeafType, Module};

    fn q(name: &str) -> QName {
        QName::new("urn:t", name)
    }

    fn schema() -> Schema {
        Schema::new(vec![Module::new(
            "t",
            "urn:t",
            [SchemaNode::container("top").with_children([SchemaNode::list("entry", ["id"])
                .with_children([
                    SchemaNode::leaf("id", LeafType::string()),
                    SchemaNode::leaf("a", LeafType::string()),
                    SchemaNode::leaf("b", LeafType::string()),
                ])])],
        )])
        .unwrap()
    }

    fn tree() -> ConfigTree {
        let entry = |id: &str| {
            DataNode::list_entry(q("entry")).with_children([
                DataNode::leaf(q("id"), id),
                DataNode::leaf(q("a"), "x"),
                DataNode::leaf(q("b"), "y"),
            ])
        };
        ConfigTree::from_roots(vec![
            DataNode::container(q("top")).with_children([entry("1"), entry("2")])
        ])
    }

    #[test]
    fn synthesized_entries_keep_keys() {
        let tree = tree();
        let selection: Selection = [vec![0, 1, 2]].into_iter().collect();
        let pruned = prune(&schema(), &tree, &selection);

        let expected = ConfigTree::from_roots(vec![DataNode::container(q("top")).with_child(
            DataNode::list_entry(q("entry")).with_children([
                DataNode::leaf(q("id"), "2"),
                DataNode::leaf(q("b"), "y"),
            ]),
        )]);
        assert_eq!(pruned, expected);
    }

    #[test]
    fn selected_node_is_copied_whole() {
        let tree = tree();
        let selection: Selection = [vec![0, 0], vec![0, 0, 1]].into_iter().collect();
        let pruned = prune(&schema(), &tree, &selection);
        assert_eq!(pruned.roots()[0].children, vec![tree.roots()[0].children[0].clone()]);
    }

    #[test]
    fn empty_selection_is_empty_tree() {
        assert!(prune(&schema(), &tree(), &Selection::new()).is_empty());
    }

    #[test]
    fn descendants_in_document_order() {
        let tree = tree();
        let mut out = Vec::new();
        descendants(tree.roots(), &[0], &mut out);
        assert_eq!(out.len(), 8);
        assert_eq!(out[0], vec![0, 0]);
        assert_eq!(out[1], vec![0, 0, 0]);
        assert_eq!(node_at(tree.roots(), &out[5]).and_then(|n| n.value.as_deref()), Some("2"));
    }
}
