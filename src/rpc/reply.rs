//! RPC replies and the mapping of internal failures to `rpc-error` reports.

use serde::{Deserialize, Serialize};

use crate::datastore::DatastoreError;
use crate::edit::EditError;
use crate::filter::PathSyntaxError;
use crate::lock::LockError;
use crate::rpc::wire::{DecodeError, WireNode};
use crate::session::{SessionError, SessionId};
use crate::validate::ValidationError;

pub const LOCK_DENIED_MESSAGE: &str =
    "Access to the requested lock is denied because the lock is currently held by another entity.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RpcReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<WireNode>>,
    #[serde(default, rename = "rpc-error", skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RpcError>,
}

impl RpcReply {
    pub fn ok(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            ok: true,
            data: None,
            errors: Vec::new(),
        }
    }

    pub fn data(message_id: impl Into<String>, data: Vec<WireNode>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            ok: false,
            data: Some(data),
            errors: Vec::new(),
        }
    }

    /// An error reply. The message id is absent when the request could not
    /// be parsed far enough to find it.
    pub fn error(message_id: Option<String>, error: RpcError) -> Self {
        Self {
            message_id,
            ok: false,
            data: None,
            errors: vec![error],
        }
    }

    pub fn is_error(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Transport,
    Rpc,
    Protocol,
    Application,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorTag {
    InUse,
    InvalidValue,
    TooBig,
    MissingAttribute,
    BadAttribute,
    UnknownAttribute,
    MissingElement,
    BadElement,
    UnknownElement,
    UnknownNamespace,
    AccessDenied,
    LockDenied,
    ResourceDenied,
    DataExists,
    DataMissing,
    OperationNotSupported,
    OperationFailed,
    MalformedMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ErrorInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bad_element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bad_attribute: Option<String>,
}

impl ErrorInfo {
    pub fn is_empty(&self) -> bool {
        self.session_id.is_none() && self.bad_element.is_none() && self.bad_attribute.is_none()
    }
}

/// One `rpc-error` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RpcError {
    pub error_type: ErrorType,
    pub error_tag: ErrorTag,
    #[serde(default)]
    pub error_severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_app_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "ErrorInfo::is_empty")]
    pub error_info: ErrorInfo,
}

impl RpcError {
    pub fn new(error_type: ErrorType, error_tag: ErrorTag) -> Self {
        Self {
            error_type,
            error_tag,
            error_severity: Severity::Error,
            error_app_tag: None,
            error_path: None,
            error_message: None,
            error_info: ErrorInfo::default(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.error_path = Some(path.into());
        self
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Rpc, ErrorTag::MalformedMessage).with_message(message)
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Protocol, ErrorTag::InvalidValue).with_message(message)
    }
}

impl From<EditError> for RpcError {
    fn from(e: EditError) -> Self {
        let message = e.to_string();
        match e {
            EditError::DataExists { path } => {
                RpcError::new(ErrorType::Application, ErrorTag::DataExists)
                    .with_path(path)
                    .with_message(message)
            }
            EditError::DataMissing { path } => {
                RpcError::new(ErrorType::Application, ErrorTag::DataMissing)
                    .with_path(path)
                    .with_message(message)
            }
            EditError::BadOperation { path, .. } => {
                let mut err = RpcError::new(ErrorType::Protocol, ErrorTag::BadAttribute)
                    .with_path(path)
                    .with_message(message);
                err.error_info.bad_attribute = Some("operation".to_string());
                err
            }
            EditError::BadElement { path, element, .. } => {
                let mut err = RpcError::new(ErrorType::Application, ErrorTag::UnknownElement)
                    .with_path(path)
                    .with_message(message);
                err.error_info.bad_element = Some(element);
                err
            }
            EditError::MissingKey { path, key } => {
                let mut err = RpcError::new(ErrorType::Application, ErrorTag::MissingElement)
                    .with_path(path)
                    .with_message(message);
                err.error_info.bad_element = Some(key);
                err
            }
            EditError::Invalid {
                path,
                message,
                app_tag,
            } => {
                let mut err = RpcError::new(ErrorType::Application, ErrorTag::InvalidValue)
                    .with_path(path)
                    .with_message(message);
                err.error_app_tag = app_tag;
                err
            }
        }
    }
}

impl From<ValidationError> for RpcError {
    fn from(e: ValidationError) -> Self {
        EditError::from(e).into()
    }
}

impl From<LockError> for RpcError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::Denied { held_by, .. } => {
                let mut err = RpcError::new(ErrorType::Protocol, ErrorTag::LockDenied)
                    .with_message(LOCK_DENIED_MESSAGE);
                err.error_info.session_id = Some(held_by);
                err
            }
            LockError::Modified { .. } => {
                RpcError::new(ErrorType::Protocol, ErrorTag::LockDenied)
                    .with_message(e.to_string())
            }
            LockError::NotLocked { .. } => {
                RpcError::new(ErrorType::Protocol, ErrorTag::OperationFailed)
                    .with_message(e.to_string())
            }
        }
    }
}

impl From<DatastoreError> for RpcError {
    fn from(e: DatastoreError) -> Self {
        let tag = match e {
            DatastoreError::Unknown(_) => ErrorTag::InvalidValue,
            DatastoreError::Unsupported(_) => ErrorTag::OperationNotSupported,
        };
        RpcError::new(ErrorType::Protocol, tag).with_message(e.to_string())
    }
}

impl From<DecodeError> for RpcError {
    fn from(e: DecodeError) -> Self {
        let message = e.to_string();
        match e {
            DecodeError::UnknownElement { path, element } => {
                let mut err = RpcError::new(ErrorType::Application, ErrorTag::UnknownElement)
                    .with_path(path)
                    .with_message(message);
                err.error_info.bad_element = Some(element);
                err
            }
            DecodeError::UnknownNamespace(_) => {
                RpcError::new(ErrorType::Application, ErrorTag::UnknownNamespace)
                    .with_message(message)
            }
            DecodeError::AmbiguousRoot(element) => {
                let mut err = RpcError::new(ErrorType::Application, ErrorTag::MissingAttribute)
                    .with_message(message);
                err.error_info.bad_element = Some(element);
                err.error_info.bad_attribute = Some("namespace".to_string());
                err
            }
            DecodeError::UnexpectedChildren { path, .. } => {
                RpcError::new(ErrorType::Application, ErrorTag::BadElement)
                    .with_path(path)
                    .with_message(message)
            }
            DecodeError::BadOperation { path, element, .. } => {
                let mut err = RpcError::new(ErrorType::Protocol, ErrorTag::BadAttribute)
                    .with_path(path)
                    .with_message(message);
                err.error_info.bad_attribute = Some("operation".to_string());
                err.error_info.bad_element = Some(element);
                err
            }
        }
    }
}

impl From<PathSyntaxError> for RpcError {
    fn from(e: PathSyntaxError) -> Self {
        RpcError::invalid_value(format!("invalid path expression: {}", e))
    }
}

impl From<SessionError> for RpcError {
    fn from(e: SessionError) -> Self {
        let tag = match e {
            SessionError::Limit(_) => ErrorTag::ResourceDenied,
            SessionError::Unknown(_) => ErrorTag::InvalidValue,
        };
        RpcError::new(ErrorType::Protocol, tag).with_message(e.to_string())
    }
}
