use std::path::PathBuf;

use super::{Store, StoreError};

/// Ids are opaque, but only `[A-Za-z0-9_-]` ever resolves. This keeps an id
/// from naming anything outside the data root.
pub(crate) fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 128 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl Store {
    pub(crate) fn folders_dir(&self) -> PathBuf { self.root.join("folders") }

    pub(crate) fn documents_dir(&self) -> PathBuf { self.root.join("documents") }

    pub(crate) fn folder_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_id(id) { return Err(StoreError::NotFound { kind: "folder", id: id.to_string() }); }
        Ok(self.folders_dir().join(format!("{}.json", id)))
    }

    pub(crate) fn document_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !is_valid_id(id) { return Err(StoreError::NotFound { kind: "document", id: id.to_string() }); }
        Ok(self.documents_dir().join(format!("{}.json", id)))
    }
}
