//! Filter evaluation for retrieval requests.
//!
//! # Data Flow
//! ```text
//! ConfigTree snapshot + Filter
//!     → subtree.rs (RFC 6241 shape matching)   ┐
//!     → xpath.rs   (path expression queries)   ┴→ Selection (index paths)
//!     → selection.rs prune (copy selected subtrees, synthesize ancestors)
//!     → new ConfigTree for the reply
//! ```
//!
//! # Design Decisions
//! - Evaluation never fails: unknown names simply match nothing
//! - Path expressions are parsed when the request is decoded, so syntax
//!   errors surface before any datastore is touched
//! - Results are deduplicated and in document order regardless of how
//!   many filter criteria hit the same node

pub mod selection;
pub mod subtree;
pub mod xpath;

pub use selection::Selection;
pub use subtree::FilterNode;
pub use xpath::{PathExpr, PathSyntaxError};

use crate::model::ConfigTree;
use crate::schema::Schema;

/// A retrieval filter.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Subtree(Vec<FilterNode>),
    XPath(PathExpr),
}

/// Prunes trees down to what a filter selects. Never mutates the source.
pub struct FilterEvaluator<'a> {
    schema: &'a Schema,
}

impl<'a> FilterEvaluator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    pub fn select(&self, tree: &ConfigTree, filter: Option<&Filter>) -> ConfigTree {
        let selection = match filter {
            None => return tree.clone(),
            Some(Filter::Subtree(nodes)) if nodes.is_empty() => return tree.clone(),
            Some(Filter::Subtree(nodes)) => subtree::evaluate(self.schema, nodes, tree.roots()),
            Some(Filter::XPath(expr)) => expr.evaluate(self.schema, tree),
        };
        tracing::trace!(selected = selection.len(), "Filter evaluated");
        selection::prune(self.schema, tree, &selection)
    }
}
