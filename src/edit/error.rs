//! Edit failures.

use crate::model::Operation;
use crate::validate::ValidationError;

/// Why an edit was rejected. Every variant aborts the whole transaction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("data already exists at {path}")]
    DataExists { path: String },

    #[error("data is missing at {path}")]
    DataMissing { path: String },

    #[error("operation '{operation}' cannot be applied at {path}: {reason}")]
    BadOperation {
        path: String,
        operation: Operation,
        reason: String,
    },

    #[error("element '{element}' at {path}: {reason}")]
    BadElement {
        path: String,
        element: String,
        reason: String,
    },

    #[error("list entry at {path} is missing key '{key}'")]
    MissingKey { path: String, key: String },

    #[error("validation failed at {path}: {message}")]
    Invalid {
        path: String,
        message: String,
        app_tag: Option<String>,
    },
}

impl EditError {
    pub fn path(&self) -> &str {
        match self {
            EditError::DataExists { path }
            | EditError::DataMissing { path }
            | EditError::BadOperation { path, .. }
            | EditError::BadElement { path, .. }
            | EditError::MissingKey { path, .. }
            | EditError::Invalid { path, .. } => path,
        }
    }
}

impl From<ValidationError> for EditError {
    fn from(e: ValidationError) -> Self {
        EditError::Invalid {
            path: e.path,
            message: e.message,
            app_tag: e.app_tag,
        }
    }
}
