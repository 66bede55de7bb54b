//! Host capabilities consumed by the folder index, document store and provisioner.
//! `SharedStore` implements both traits; tests substitute in-memory fakes.

use crate::storage::{DocumentInfo, DocumentKind, DocumentRecord, FolderInfo, StoreResult};

/// Hierarchical folder tree containing documents.
pub trait FolderProvider {
    fn folder(&self, id: &str) -> StoreResult<FolderInfo>;

    /// Direct child folders, in host enumeration order.
    fn child_folders(&self, id: &str) -> StoreResult<Vec<FolderInfo>>;

    /// Documents directly contained in the folder, of any kind.
    fn documents_in(&self, id: &str) -> StoreResult<Vec<DocumentInfo>>;

    fn create_folder(&self, parent_id: &str, name: &str) -> StoreResult<FolderInfo>;
}

/// Persistent spreadsheet-like documents.
pub trait DocumentHost {
    fn document(&self, id: &str) -> StoreResult<DocumentRecord>;

    /// Apply `f` to the document as one unit of serialisation and persist the result.
    fn update_document<R>(&self, id: &str, f: impl FnOnce(&mut DocumentRecord) -> R) -> StoreResult<R>;

    /// Create an empty, unfiled document.
    fn create_document(&self, name: &str, kind: DocumentKind) -> StoreResult<DocumentInfo>;

    fn move_document(&self, document_id: &str, folder_id: &str) -> StoreResult<()>;
}
