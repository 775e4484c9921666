//! Configuration tree model.
//!
//! # Data Flow
//! ```text
//! wire request (JSON)
//!     → rpc::wire decodes against the schema
//!     → ConfigTree (ordered forest of DataNode)
//!     → edit / filter / validate operate on it
//!     → rpc::wire encodes it back for replies
//! ```
//!
//! # Design Decisions
//! - Parents own their children exclusively; no back-pointers
//! - Paths for error reports are built alongside the traversal (path.rs)
//! - List entries and leaf-list values are sibling nodes sharing a name,
//!   identified by key tuple and value respectively

pub mod node;
pub mod path;
pub mod tree;

pub use node::{DataNode, NodeKind, Operation, QName};
pub use path::DataPath;
pub use tree::ConfigTree;
