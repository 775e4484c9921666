//! Schema metadata consumed by the edit engine, the filter evaluator and the
//! validator.
//!
//! # Data Flow
//! ```text
//! module files (TOML)
//!     → loader.rs (parse & deserialize)
//!     → Schema::new (structural checks, namespace/config propagation)
//!     → builtin.rs adds the netconf-monitoring state module
//!     → Arc<Schema> shared read-only by all subsystems
//! ```
//!
//! # Design Decisions
//! - The schema is never mutated after startup
//! - Config lists must declare keys; keys must be leaf children
//! - A state (`config = false`) node makes its whole subtree state

pub mod builtin;
pub mod loader;
pub mod node;

pub use loader::{load_schema, SchemaError};
pub use node::{LeafType, Module, Schema, SchemaNode};
