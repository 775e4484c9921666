//! Schema node definitions.

use serde::Deserialize;
use std::collections::HashSet;

use crate::filter::xpath::PathExpr;
use crate::model::{NodeKind, QName};
use crate::schema::loader::SchemaError;

/// Value type of a leaf or leaf-list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "base", rename_all = "kebab-case")]
pub enum LeafType {
    String {
        #[serde(default)]
        min_length: Option<usize>,
        #[serde(default)]
        max_length: Option<usize>,
    },
    Integer {
        #[serde(default)]
        min: Option<i64>,
        #[serde(default)]
        max: Option<i64>,
    },
    Boolean,
    Enumeration {
        values: Vec<String>,
    },
    /// Presence-only leaf carrying no value.
    Empty,
    /// Value must equal an existing leaf selected by `path`.
    Leafref {
        path: String,
    },
}

impl LeafType {
    pub fn string() -> Self {
        LeafType::String {
            min_length: None,
            max_length: None,
        }
    }

    pub fn integer(min: i64, max: i64) -> Self {
        LeafType::Integer {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LeafType::Enumeration {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn leafref(path: impl Into<String>) -> Self {
        LeafType::Leafref { path: path.into() }
    }
}

impl Default for LeafType {
    fn default() -> Self {
        LeafType::string()
    }
}

fn default_config() -> bool {
    true
}

/// One node of a module's schema tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SchemaNode {
    pub name: String,
    pub kind: NodeKind,
    /// Key leaf names, in key order (lists only).
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default, rename = "type")]
    pub leaf_type: Option<LeafType>,
    #[serde(default = "default_config")]
    pub config: bool,
    #[serde(default)]
    pub mandatory: bool,
    #[serde(default)]
    pub children: Vec<SchemaNode>,
    /// Owning module name; filled in by [`Module::new`].
    #[serde(skip)]
    pub module: String,
    /// Owning module namespace; filled in by [`Module::new`].
    #[serde(skip)]
    pub namespace: String,
}

impl SchemaNode {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            keys: Vec::new(),
            leaf_type: None,
            config: true,
            mandatory: false,
            children: Vec::new(),
            module: String::new(),
            namespace: String::new(),
        }
    }

    pub fn container(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Container)
    }

    pub fn list<I, S>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut node = Self::new(name, NodeKind::List);
        node.keys = keys.into_iter().map(Into::into).collect();
        node
    }

    pub fn leaf(name: impl Into<String>, leaf_type: LeafType) -> Self {
        let mut node = Self::new(name, NodeKind::Leaf);
        node.leaf_type = Some(leaf_type);
        node
    }

    pub fn leaf_list(name: impl Into<String>, leaf_type: LeafType) -> Self {
        let mut node = Self::new(name, NodeKind::LeafList);
        node.leaf_type = Some(leaf_type);
        node
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = SchemaNode>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Mark the node as state data.
    pub fn state(mut self) -> Self {
        self.config = false;
        self
    }

    pub fn qname(&self) -> QName {
        QName::new(self.namespace.clone(), self.name.clone())
    }

    pub fn is_key(&self, local_name: &str) -> bool {
        self.keys.iter().any(|k| k == local_name)
    }

    pub fn child(&self, name: &QName) -> Option<&SchemaNode> {
        self.children
            .iter()
            .find(|c| c.name == name.name && c.namespace == name.namespace)
    }

    /// Child in this node's own namespace.
    pub fn child_named(&self, local_name: &str) -> Option<&SchemaNode> {
        self.children
            .iter()
            .find(|c| c.name == local_name && c.namespace == self.namespace)
    }

    pub fn leaf_type(&self) -> LeafType {
        self.leaf_type.clone().unwrap_or_default()
    }

    fn bind(&mut self, module: &str, namespace: &str, parent_config: bool) {
        self.module = module.to_string();
        self.namespace = namespace.to_string();
        self.config = self.config && parent_config;
        let config = self.config;
        for child in &mut self.children {
            child.bind(module, namespace, config);
        }
    }

    fn check(&self, path: &str) -> Result<(), SchemaError> {
        let path = if path.ends_with(':') {
            format!("{}{}", path, self.name)
        } else {
            format!("{}/{}", path, self.name)
        };

        if !self.kind.is_interior() && !self.children.is_empty() {
            return Err(SchemaError::Structure {
                path,
                reason: format!("a {} cannot have children", self.kind),
            });
        }

        let mut seen = HashSet::new();
        for child in &self.children {
            if !seen.insert(child.name.as_str()) {
                return Err(SchemaError::Structure {
                    path: format!("{}/{}", path, child.name),
                    reason: "duplicate sibling name".to_string(),
                });
            }
        }

        if self.kind == NodeKind::List {
            if self.config && self.keys.is_empty() {
                return Err(SchemaError::Structure {
                    path,
                    reason: "configuration list without keys".to_string(),
                });
            }
            for key in &self.keys {
                match self.child_named(key) {
                    Some(k) if k.kind == NodeKind::Leaf => {}
                    _ => {
                        return Err(SchemaError::Structure {
                            path,
                            reason: format!("key '{}' is not a leaf child", key),
                        })
                    }
                }
            }
        }

        if let Some(LeafType::Leafref { path: target }) = &self.leaf_type {
            PathExpr::parse(target).map_err(|e| SchemaError::Structure {
                path: path.clone(),
                reason: format!("invalid leafref path '{}': {}", target, e),
            })?;
        }

        for child in &self.children {
            child.check(&path)?;
        }
        Ok(())
    }
}

/// A named module contributing top-level nodes in one namespace.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Module {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default, rename = "node")]
    pub nodes: Vec<SchemaNode>,
}

impl Module {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        nodes: impl IntoIterator<Item = SchemaNode>,
    ) -> Self {
        let mut module = Self {
            name: name.into(),
            namespace: namespace.into(),
            prefix: None,
            nodes: nodes.into_iter().collect(),
        };
        module.bind();
        module
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(&self.name)
    }

    /// Propagate module identity and config-ness into every node.
    pub(crate) fn bind(&mut self) {
        let (name, namespace) = (self.name.clone(), self.namespace.clone());
        for node in &mut self.nodes {
            node.bind(&name, &namespace, true);
        }
    }
}

/// The complete set of modules known to the agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    modules: Vec<Module>,
}

impl Schema {
    pub fn new(modules: Vec<Module>) -> Result<Self, SchemaError> {
        let mut schema = Self::default();
        for module in modules {
            schema.add_module(module)?;
        }
        Ok(schema)
    }

    pub fn add_module(&mut self, mut module: Module) -> Result<(), SchemaError> {
        module.bind();
        if self
            .modules
            .iter()
            .any(|m| m.namespace == module.namespace || m.name == module.name)
        {
            return Err(SchemaError::DuplicateModule(module.name));
        }
        let mut seen = HashSet::new();
        for node in &module.nodes {
            if !seen.insert(node.name.as_str()) {
                return Err(SchemaError::Structure {
                    path: format!("/{}:{}", module.name, node.name),
                    reason: "duplicate top-level name".to_string(),
                });
            }
            node.check(&format!("/{}:", module.name))?;
        }
        tracing::debug!(module = %module.name, namespace = %module.namespace, "Schema module added");
        self.modules.push(module);
        Ok(())
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module_by_namespace(&self, namespace: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.namespace == namespace)
    }

    /// Namespace denoted by a module name, prefix or namespace string.
    pub fn resolve_namespace(&self, prefix: &str) -> Option<&str> {
        self.modules
            .iter()
            .find(|m| m.name == prefix || m.prefix() == prefix || m.namespace == prefix)
            .map(|m| m.namespace.as_str())
    }

    /// Module name used as path prefix for a namespace.
    pub fn prefix_of(&self, namespace: &str) -> Option<&str> {
        self.module_by_namespace(namespace).map(|m| m.name.as_str())
    }

    pub fn root(&self, name: &QName) -> Option<&SchemaNode> {
        self.module_by_namespace(&name.namespace)
            .and_then(|m| m.nodes.iter().find(|n| n.name == name.name))
    }

    /// Top-level nodes with the given local name, across all modules.
    pub fn roots_named<'a>(&'a self, local_name: &'a str) -> impl Iterator<Item = &'a SchemaNode> + 'a {
        self.modules
            .iter()
            .flat_map(|m| m.nodes.iter())
            .filter(move |n| n.name == local_name)
    }

    /// Schema node for `name` under `parent`, or among the roots when
    /// `parent` is `None`.
    pub fn lookup<'s>(
        &'s self,
        parent: Option<&'s SchemaNode>,
        name: &QName,
    ) -> Option<&'s SchemaNode> {
        match parent {
            Some(p) => p.child(name),
            None => self.root(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interfaces() -> Module {
        Module::new(
            "rfc1",
            "urn:rfc1",
            [SchemaNode::container("top").with_children([SchemaNode::list(
                "interface",
                ["name"],
            )
            .with_children([
                SchemaNode::leaf("name", LeafType::string()),
                SchemaNode::leaf("mtu", LeafType::integer(0, 65535)),
            ])])],
        )
    }

    #[test]
    fn module_binding_propagates_namespace() {
        let schema = Schema::new(vec![interfaces()]).unwrap();
        let top = schema.root(&QName::new("urn:rfc1", "top")).unwrap();
        let iface = top.child(&QName::new("urn:rfc1", "interface")).unwrap();

        assert_eq!(iface.module, "rfc1");
        assert!(iface.is_key("name"));
        assert!(iface.child_named("mtu").is_some());
        assert_eq!(schema.resolve_namespace("rfc1"), Some("urn:rfc1"));
        assert_eq!(schema.prefix_of("urn:rfc1"), Some("rfc1"));
    }

    #[test]
    fn state_propagates_to_children() {
        let module = Module::new(
            "mon",
            "urn:mon",
            [SchemaNode::container("stats")
                .state()
                .with_children([SchemaNode::leaf("count", LeafType::integer(0, i64::MAX))])],
        );
        let schema = Schema::new(vec![module]).unwrap();
        let stats = schema.root(&QName::new("urn:mon", "stats")).unwrap();
        assert!(!stats.children[0].config);
    }

    #[test]
    fn rejects_keyless_config_list() {
        let module = Module::new("bad", "urn:bad", [SchemaNode::list("entry", Vec::<String>::new())]);
        assert!(matches!(
            Schema::new(vec![module]),
            Err(SchemaError::Structure { .. })
        ));
    }

    #[test]
    fn rejects_key_that_is_not_a_leaf() {
        let module = Module::new(
            "bad",
            "urn:bad",
            [SchemaNode::list("entry", ["id"])
                .with_children([SchemaNode::container("id")])],
        );
        assert!(Schema::new(vec![module]).is_err());
    }

    #[test]
    fn rejects_duplicate_module() {
        let err = Schema::new(vec![interfaces(), interfaces()]).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateModule(name) if name == "rfc1"));
    }
}
