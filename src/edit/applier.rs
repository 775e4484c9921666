//! The edit-config algorithm.

use crate::edit::error::EditError;
use crate::model::{ConfigTree, DataNode, DataPath, NodeKind, Operation};
use crate::schema::{Schema, SchemaNode};
use crate::validate::{list_keys, Validator};

/// Applies patch trees to configuration trees.
///
/// The applier works on a private copy of the current tree and validates
/// the result before handing it back; the caller decides whether to commit.
pub struct EditApplier<'a> {
    schema: &'a Schema,
    validator: &'a dyn Validator,
}

impl<'a> EditApplier<'a> {
    pub fn new(schema: &'a Schema, validator: &'a dyn Validator) -> Self {
        Self { schema, validator }
    }

    /// Apply `patch` to `current` with `default_op` for nodes (and their
    /// descendants) that carry no explicit operation.
    pub fn apply(
        &self,
        current: &ConfigTree,
        patch: &ConfigTree,
        default_op: Operation,
    ) -> Result<ConfigTree, EditError> {
        let mut working = current.clone();
        self.apply_siblings(
            working.roots_mut(),
            patch.roots(),
            default_op,
            None,
            &DataPath::root(),
        )?;
        working.prune_empty_containers();
        self.validator.validate(&working)?;
        tracing::debug!(
            default_operation = %default_op,
            patch_nodes = patch.node_count(),
            result_nodes = working.node_count(),
            "Edit applied"
        );
        Ok(working)
    }

    fn apply_siblings(
        &self,
        existing: &mut Vec<DataNode>,
        patch: &[DataNode],
        inherited: Operation,
        parent: Option<&SchemaNode>,
        path: &DataPath,
    ) -> Result<(), EditError> {
        for p in patch {
            // Key leaves are handled as part of their list entry.
            if let Some(list) = parent.filter(|s| s.kind == NodeKind::List) {
                if list.is_key(&p.name.name) && p.name.namespace == list.namespace {
                    continue;
                }
            }

            let op = p.operation.unwrap_or(inherited);
            let schema_node = self.resolve(parent, p, path)?;
            let here = self.node_path(p, schema_node, path)?;
            let position = find_match(existing, p, schema_node);

            match op {
                Operation::Merge => self.merge(existing, position, p, schema_node, &here)?,
                Operation::Replace => {
                    let built = self.build(p, op, schema_node, &here)?;
                    match position {
                        Some(i) => existing[i] = built,
                        None => insert_sibling(existing, built),
                    }
                }
                Operation::Create => {
                    if position.is_some() {
                        return Err(EditError::DataExists {
                            path: here.to_string(),
                        });
                    }
                    let built = self.build(p, op, schema_node, &here)?;
                    insert_sibling(existing, built);
                }
                Operation::Delete | Operation::Remove => {
                    self.check_removal(p, op, schema_node, &here)?;
                    match position {
                        Some(i) => {
                            existing.remove(i);
                        }
                        None if op == Operation::Delete => {
                            return Err(EditError::DataMissing {
                                path: here.to_string(),
                            })
                        }
                        None => {}
                    }
                }
                Operation::None => self.descend(existing, position, p, schema_node, &here)?,
            }
        }
        Ok(())
    }

    fn merge(
        &self,
        existing: &mut Vec<DataNode>,
        position: Option<usize>,
        p: &DataNode,
        schema_node: &SchemaNode,
        here: &DataPath,
    ) -> Result<(), EditError> {
        let Some(i) = position else {
            let built = self.build(p, Operation::Merge, schema_node, here)?;
            insert_sibling(existing, built);
            return Ok(());
        };

        match p.kind {
            NodeKind::Leaf => existing[i].value = p.value.clone(),
            NodeKind::LeafList => {}
            NodeKind::Container | NodeKind::List => {
                self.check_keys(p, Operation::Merge, schema_node, here)?;
                self.apply_siblings(
                    &mut existing[i].children,
                    &p.children,
                    Operation::Merge,
                    Some(schema_node),
                    here,
                )?;
            }
        }
        Ok(())
    }

    /// Effective operation `none`: the node only addresses its descendants.
    fn descend(
        &self,
        existing: &mut [DataNode],
        position: Option<usize>,
        p: &DataNode,
        schema_node: &SchemaNode,
        here: &DataPath,
    ) -> Result<(), EditError> {
        match position {
            Some(i) => {
                if p.kind.is_interior() {
                    self.check_keys(p, Operation::None, schema_node, here)?;
                    self.apply_siblings(
                        &mut existing[i].children,
                        &p.children,
                        Operation::None,
                        Some(schema_node),
                        here,
                    )?;
                }
                Ok(())
            }
            None if p.any_descendant_operation(&Operation::is_constructive) => {
                Err(EditError::BadOperation {
                    path: here.to_string(),
                    operation: Operation::None,
                    reason: "descendants request new data under a node that does not exist"
                        .to_string(),
                })
            }
            None if !p.any_descendant_operation(&|op| op == Operation::Delete)
                && p.any_descendant_operation(&|op| op == Operation::Remove) =>
            {
                Ok(())
            }
            None => Err(EditError::DataMissing {
                path: here.to_string(),
            }),
        }
    }

    /// A fresh node built from the patch, as created by `op`.
    fn build(
        &self,
        p: &DataNode,
        op: Operation,
        schema_node: &SchemaNode,
        here: &DataPath,
    ) -> Result<DataNode, EditError> {
        let mut node = p.shell();
        if !p.kind.is_interior() {
            return Ok(node);
        }

        if p.kind == NodeKind::List {
            self.check_keys(p, op, schema_node, here)?;
            for key in &schema_node.keys {
                if let Some(k) = p
                    .children
                    .iter()
                    .find(|c| c.name.name == *key && c.name.namespace == schema_node.namespace)
                {
                    node.children.push(k.shell());
                }
            }
        }
        self.apply_siblings(&mut node.children, &p.children, op, Some(schema_node), here)?;
        Ok(node)
    }

    /// Key leaves may only restate their entry's operation.
    fn check_keys(
        &self,
        p: &DataNode,
        op: Operation,
        schema_node: &SchemaNode,
        here: &DataPath,
    ) -> Result<(), EditError> {
        if p.kind != NodeKind::List {
            return Ok(());
        }
        for child in &p.children {
            if !schema_node.is_key(&child.name.name) {
                continue;
            }
            if let Some(key_op) = child.operation.filter(|k| *k != op) {
                return Err(EditError::BadOperation {
                    path: here.child(&schema_node.module, &child.name.name).to_string(),
                    operation: key_op,
                    reason: format!("list key cannot be edited apart from its entry ({})", op),
                });
            }
        }
        Ok(())
    }

    fn check_removal(
        &self,
        p: &DataNode,
        op: Operation,
        schema_node: &SchemaNode,
        here: &DataPath,
    ) -> Result<(), EditError> {
        self.check_keys(p, op, schema_node, here)?;
        let non_key_constructive = p.children.iter().any(|c| {
            let is_key = p.kind == NodeKind::List && schema_node.is_key(&c.name.name);
            !is_key && c.any_operation(&Operation::is_constructive)
        });
        if non_key_constructive {
            return Err(EditError::BadOperation {
                path: here.to_string(),
                operation: op,
                reason: "descendants of a removed node cannot request new data".to_string(),
            });
        }
        Ok(())
    }

    fn resolve<'s>(
        &'s self,
        parent: Option<&'s SchemaNode>,
        p: &DataNode,
        path: &DataPath,
    ) -> Result<&'s SchemaNode, EditError> {
        let bad = |reason: &str| EditError::BadElement {
            path: path
                .child(
                    self.schema.prefix_of(&p.name.namespace).unwrap_or(&p.name.namespace),
                    &p.name.name,
                )
                .to_string(),
            element: p.name.name.clone(),
            reason: reason.to_string(),
        };

        let schema_node = self
            .schema
            .lookup(parent, &p.name)
            .ok_or_else(|| bad("unknown element"))?;
        if schema_node.kind != p.kind {
            return Err(bad(&format!("expected a {}, found a {}", schema_node.kind, p.kind)));
        }
        if !schema_node.config {
            return Err(bad("state data cannot be edited"));
        }
        Ok(schema_node)
    }

    fn node_path(
        &self,
        p: &DataNode,
        schema_node: &SchemaNode,
        path: &DataPath,
    ) -> Result<DataPath, EditError> {
        let prefix = schema_node.module.as_str();
        let local = p.name.name.as_str();
        Ok(match p.kind {
            NodeKind::List => {
                let keys = list_keys(p, schema_node).map_err(|key| EditError::MissingKey {
                    path: path.child(prefix, local).to_string(),
                    key: key.to_string(),
                })?;
                path.entry(prefix, local, keys)
            }
            NodeKind::LeafList => path.value(prefix, local, p.value.as_deref().unwrap_or_default()),
            NodeKind::Container | NodeKind::Leaf => path.child(prefix, local),
        })
    }
}

/// Existing sibling addressed by a patch node: list entries by full key
/// tuple, leaf-list entries by value, everything else by name.
fn find_match(existing: &[DataNode], p: &DataNode, schema_node: &SchemaNode) -> Option<usize> {
    existing.iter().position(|e| {
        if e.name != p.name {
            return false;
        }
        match p.kind {
            NodeKind::List => {
                let wanted = list_keys(p, schema_node).ok();
                wanted.is_some() && list_keys(e, schema_node).ok() == wanted
            }
            NodeKind::LeafList => e.value == p.value,
            NodeKind::Container | NodeKind::Leaf => true,
        }
    })
}

/// Insert after the last sibling of the same name, else append.
fn insert_sibling(existing: &mut Vec<DataNode>, node: DataNode) {
    match existing.iter().rposition(|e| e.name == node.name) {
        Some(i) => existing.insert(i + 1, node),
        None => existing.push(node),
    }
}
