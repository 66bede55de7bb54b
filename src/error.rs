//! Unified application error model and mapping helpers.
//! This module provides the error enum reported by both HTTP entry points (listing
//! and append) and returned by the folder index, document store and provisioner,
//! along with the mapping from host-level `StoreError`s.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::storage::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Root folder id unset or deployment configuration invalid.
    Configuration { code: String, message: String },
    /// Document or folder id does not resolve.
    NotFound { code: String, message: String },
    /// Permission denied by the host.
    Access { code: String, message: String },
    /// Missing or malformed request field.
    Validation { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Configuration { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Access { code, .. }
            | AppError::Validation { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Configuration { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Access { message, .. }
            | AppError::Validation { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn configuration<S: Into<String>>(code: S, msg: S) -> Self { AppError::Configuration { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn access<S: Into<String>>(code: S, msg: S) -> Self { AppError::Access { code: code.into(), message: msg.into() } }
    pub fn validation<S: Into<String>>(code: S, msg: S) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    pub fn is_configuration(&self) -> bool { matches!(self, AppError::Configuration { .. }) }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Configuration { .. } => 500,
            AppError::NotFound { .. } => 404,
            AppError::Access { .. } => 403,
            AppError::Validation { .. } => 400,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Prefer a typed error carried inside the anyhow chain
        if let Some(app) = err.downcast_ref::<AppError>() { return app.clone(); }
        if let Some(store) = err.downcast_ref::<StoreError>() { return AppError::from(store); }
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}

impl From<&StoreError> for AppError {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => AppError::NotFound {
                code: format!("{}_not_found", kind),
                message: format!("{} not found: {}", kind, id),
            },
            StoreError::PermissionDenied(what) => AppError::Access {
                code: "access_denied".into(),
                message: format!("permission denied: {}", what),
            },
            StoreError::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => AppError::Access {
                code: "access_denied".into(),
                message: format!("permission denied: {}", e),
            },
            other => AppError::Internal { code: "store_error".into(), message: other.to_string() },
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self { AppError::from(&err) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::configuration("root_folder_unset", "unset").http_status(), 500);
        assert_eq!(AppError::not_found("document_not_found", "missing").http_status(), 404);
        assert_eq!(AppError::access("access_denied", "no").http_status(), 403);
        assert_eq!(AppError::validation("file_id_missing", "oops").http_status(), 400);
        assert_eq!(AppError::internal("internal", "panic").http_status(), 500);
    }

    #[test]
    fn store_errors_map_onto_taxonomy() {
        let nf = AppError::from(StoreError::NotFound { kind: "folder", id: "abc".into() });
        assert_eq!(nf.code_str(), "folder_not_found");
        assert!(nf.message().contains("abc"));

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert!(matches!(AppError::from(StoreError::Io(denied)), AppError::Access { .. }));

        let other = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
        assert!(matches!(AppError::from(StoreError::Io(other)), AppError::Internal { .. }));
    }

    #[test]
    fn anyhow_keeps_typed_errors() {
        let e: anyhow::Error = AppError::validation("file_id_missing", "fileId is required").into();
        let back = AppError::from(e);
        assert_eq!(back.code_str(), "file_id_missing");

        let e = anyhow::anyhow!("boom");
        assert!(matches!(AppError::from(e), AppError::Internal { .. }));
    }
}
