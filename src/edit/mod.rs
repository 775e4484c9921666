//! Edit-config application engine.
//!
//! # Data Flow
//! ```text
//! current ConfigTree (snapshot) + patch tree + default operation
//!     → applier.rs clones the snapshot into a private working copy
//!     → depth-first walk over the patch in document order, one handler
//!       per operation (merge, replace, create, delete, remove, none)
//!     → Validator checks the whole working copy
//!     → Ok(new tree) for the caller to swap in, or Err with the datastore
//!       untouched
//! ```
//!
//! # Design Decisions
//! - Node paths are carried down the recursion for error reports; nodes
//!   have no parent links
//! - A node's effective operation is its own annotation, else the nearest
//!   annotated ancestor's, else the request default
//! - List entries are matched by full key tuple and leaf-list entries by
//!   value; key leaves are never edited on their own

pub mod applier;
pub mod error;

pub use applier::EditApplier;
pub use error::EditError;
