//! The configuration tree: an ordered forest of data nodes.

use crate::model::node::{DataNode, NodeKind};

/// Ordered forest of top-level data nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigTree {
    roots: Vec<DataNode>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roots(roots: Vec<DataNode>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[DataNode] {
        &self.roots
    }

    pub fn roots_mut(&mut self) -> &mut Vec<DataNode> {
        &mut self.roots
    }

    pub fn into_roots(self) -> Vec<DataNode> {
        self.roots
    }

    pub fn push(&mut self, node: DataNode) {
        self.roots.push(node);
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes in the forest.
    pub fn node_count(&self) -> usize {
        self.roots.iter().map(DataNode::subtree_len).sum()
    }

    /// Drop containers that hold no children, innermost first. Containers
    /// carry no data of their own, so an empty one is indistinguishable
    /// from an absent one.
    pub fn prune_empty_containers(&mut self) {
        prune_empty(&mut self.roots);
    }

    /// First root with the given local name.
    pub fn root(&self, local_name: &str) -> Option<&DataNode> {
        self.roots.iter().find(|n| n.name.name == local_name)
    }

    /// A new forest holding this tree's roots followed by `other`'s.
    pub fn concat(&self, other: &ConfigTree) -> ConfigTree {
        let mut roots = self.roots.clone();
        roots.extend(other.roots.iter().cloned());
        ConfigTree { roots }
    }
}

fn prune_empty(nodes: &mut Vec<DataNode>) {
    for node in nodes.iter_mut() {
        prune_empty(&mut node.children);
    }
    nodes.retain(|n| n.kind != NodeKind::Container || !n.children.is_empty());
}

impl From<Vec<DataNode>> for ConfigTree {
    fn from(roots: Vec<DataNode>) -> Self {
        Self::from_roots(roots)
    }
}
