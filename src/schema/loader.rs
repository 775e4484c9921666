//! Schema loading from TOML module files.
//!
//! A module file holds one or more `[[module]]` tables:
//!
//! ```toml
//! [[module]]
//! name = "rfc1"
//! namespace = "urn:example:rfc1"
//!
//! [[module.node]]
//! name = "top"
//! kind = "container"
//!
//! [[module.node.children]]
//! name = "interface"
//! kind = "list"
//! keys = ["name"]
//! children = [
//!     { name = "name", kind = "leaf", type = { base = "string" } },
//!     { name = "mtu", kind = "leaf", type = { base = "integer", min = 0, max = 65535 } },
//! ]
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::schema::node::{Module, Schema};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("module '{0}' is defined twice or shares a namespace")]
    DuplicateModule(String),
    #[error("{path}: {reason}")]
    Structure { path: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct ModuleFile {
    #[serde(default, rename = "module")]
    modules: Vec<Module>,
}

impl Schema {
    /// Parse a schema from the text of one module file.
    pub fn from_toml_str(content: &str) -> Result<Self, SchemaError> {
        let file: ModuleFile = toml::from_str(content)?;
        Schema::new(file.modules)
    }
}

/// Load a schema from a module file, or from every `.toml` file in a
/// directory (in file name order).
pub fn load_schema(path: &Path) -> Result<Schema, SchemaError> {
    let io_err = |source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    };

    let files = if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)
            .map_err(io_err)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut modules = Vec::new();
    for file in &files {
        let content = fs::read_to_string(file).map_err(|source| SchemaError::Io {
            path: file.clone(),
            source,
        })?;
        let parsed: ModuleFile = toml::from_str(&content)?;
        modules.extend(parsed.modules);
    }

    let schema = Schema::new(modules)?;
    tracing::info!(
        path = %path.display(),
        modules = schema.modules().len(),
        "Schema loaded"
    );
    Ok(schema)
}
