//!
//! bridgebook storage module
//! --------------------------
//! This module implements the on-disk host for bridge documents using a simple
//! id-addressed layout under a configured data root:
//!
//!   folders/<id>.json     FolderRecord (name, parent, child folder ids, document ids)
//!   documents/<id>.json   DocumentRecord (name, kind, folder, timestamps, sheets)
//!
//! A sheet keeps every row including its header, so a sheet's last row is simply
//! its row count. Records are replaced atomically on every change.
//!
//! Key responsibilities:
//! - Folder creation and child enumeration for the folder index.
//! - Document creation, filing (move into a folder) and read-modify-write updates.
//! - Mapping host failures onto `StoreError` (missing ids, permission denials).
//!
//! The public API centers around the `Store` type, which is usually wrapped in a
//! thread-safe `SharedStore` (`Arc<Mutex<Store>>`) so that each document update is
//! serialised within the process.

use std::{fs, path::{Path, PathBuf}};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::host::{DocumentHost, FolderProvider};

mod io;
mod paths;
pub mod types;

pub use types::{DocumentInfo, DocumentKind, DocumentRecord, FolderInfo, FolderRecord, HeaderStyle, SheetRecord};

/// Host-level failure. Mapped onto the boundary taxonomy by `AppError::from`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Core on-disk storage handle for the folder/document tree.
#[derive(Clone)]
pub struct Store {
    /// Root folder holding `folders/` and `documents/`.
    root: PathBuf,
}

impl Store {
    /// Create a new Store rooted at the given filesystem path.
    /// The directory layout is created if it does not already exist.
    pub fn new<P: AsRef<Path>>(root: P) -> StoreResult<Self> {
        let s = Self { root: root.as_ref().to_path_buf() };
        fs::create_dir_all(s.folders_dir())?;
        fs::create_dir_all(s.documents_dir())?;
        Ok(s)
    }

    /// Return the configured root folder for this Store.
    pub fn root_path(&self) -> &PathBuf { &self.root }

    pub fn load_folder(&self, id: &str) -> StoreResult<FolderRecord> {
        io::read_json(&self.folder_path(id)?, "folder", id)
    }

    fn save_folder(&self, rec: &FolderRecord) -> StoreResult<()> {
        io::write_json_atomic(&self.folder_path(&rec.id)?, rec)
    }

    pub fn load_document(&self, id: &str) -> StoreResult<DocumentRecord> {
        io::read_json(&self.document_path(id)?, "document", id)
    }

    fn save_document(&self, rec: &DocumentRecord) -> StoreResult<()> {
        io::write_json_atomic(&self.document_path(&rec.id)?, rec)
    }

    /// Create a folder. With no parent the folder is a tree root.
    pub fn create_folder(&self, parent: Option<&str>, name: &str) -> StoreResult<FolderRecord> {
        let mut parent_rec = match parent {
            Some(pid) => Some(self.load_folder(pid)?),
            None => None,
        };
        let rec = FolderRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            parent: parent.map(|p| p.to_string()),
            folders: Vec::new(),
            documents: Vec::new(),
            created_at: Utc::now().timestamp_millis(),
        };
        self.save_folder(&rec)?;
        if let Some(p) = parent_rec.as_mut() {
            p.folders.push(rec.id.clone());
            self.save_folder(p)?;
        }
        debug!(target: "bridgebook::store", "create_folder: id='{}' name='{}' parent={:?}", rec.id, rec.name, parent);
        Ok(rec)
    }

    /// Create an unfiled document with no sheets.
    pub fn create_document(&self, name: &str, kind: DocumentKind) -> StoreResult<DocumentRecord> {
        let now = Utc::now().timestamp_millis();
        let rec = DocumentRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind,
            folder: None,
            created_at: now,
            updated_at: now,
            sheets: Vec::new(),
        };
        self.save_document(&rec)?;
        debug!(target: "bridgebook::store", "create_document: id='{}' name='{}' kind={:?}", rec.id, rec.name, kind);
        Ok(rec)
    }

    /// File a document under `folder_id`, detaching it from its previous folder.
    pub fn move_document(&self, document_id: &str, folder_id: &str) -> StoreResult<()> {
        let mut doc = self.load_document(document_id)?;
        let mut target = self.load_folder(folder_id)?;
        if doc.folder.as_deref() == Some(folder_id) { return Ok(()); }
        if let Some(prev_id) = doc.folder.take() {
            match self.load_folder(&prev_id) {
                Ok(mut prev) => {
                    prev.documents.retain(|d| d != document_id);
                    self.save_folder(&prev)?;
                }
                Err(StoreError::NotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        target.documents.push(document_id.to_string());
        self.save_folder(&target)?;
        doc.folder = Some(folder_id.to_string());
        self.save_document(&doc)?;
        debug!(target: "bridgebook::store", "move_document: id='{}' -> folder='{}'", document_id, folder_id);
        Ok(())
    }

    /// Read-modify-write one document. The record is only persisted (and its
    /// `updated_at` bumped) when `f` actually changed it.
    pub fn update_document<R>(&self, id: &str, f: impl FnOnce(&mut DocumentRecord) -> R) -> StoreResult<R> {
        let before = self.load_document(id)?;
        let mut doc = before.clone();
        let out = f(&mut doc);
        if doc != before {
            doc.updated_at = Utc::now().timestamp_millis().max(before.updated_at);
            self.save_document(&doc)?;
            debug!(target: "bridgebook::store", "update_document: id='{}' saved", id);
        }
        Ok(out)
    }
}

#[derive(Clone)]
pub struct SharedStore(pub Arc<Mutex<Store>>);

impl SharedStore {
    pub fn new<P: AsRef<Path>>(root: P) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let store = Store::new(root).with_context(|| format!("Failed to open data root: {}", root.display()))?;
        Ok(Self(Arc::new(Mutex::new(store))))
    }

    pub fn root_path(&self) -> PathBuf { self.0.lock().root_path().clone() }

    /// Create a folder with no parent (a listing root).
    pub fn create_root_folder(&self, name: &str) -> StoreResult<FolderInfo> {
        let rec = self.0.lock().create_folder(None, name)?;
        Ok(FolderInfo { id: rec.id, name: rec.name })
    }
}

impl FolderProvider for SharedStore {
    fn folder(&self, id: &str) -> StoreResult<FolderInfo> {
        let rec = self.0.lock().load_folder(id)?;
        Ok(FolderInfo { id: rec.id, name: rec.name })
    }

    fn child_folders(&self, id: &str) -> StoreResult<Vec<FolderInfo>> {
        let guard = self.0.lock();
        let rec = guard.load_folder(id)?;
        let mut out = Vec::with_capacity(rec.folders.len());
        for child_id in &rec.folders {
            let child = guard.load_folder(child_id)?;
            out.push(FolderInfo { id: child.id, name: child.name });
        }
        Ok(out)
    }

    fn documents_in(&self, id: &str) -> StoreResult<Vec<DocumentInfo>> {
        let guard = self.0.lock();
        let rec = guard.load_folder(id)?;
        let mut out = Vec::with_capacity(rec.documents.len());
        for doc_id in &rec.documents {
            out.push(guard.load_document(doc_id)?.info());
        }
        Ok(out)
    }

    fn create_folder(&self, parent_id: &str, name: &str) -> StoreResult<FolderInfo> {
        let rec = self.0.lock().create_folder(Some(parent_id), name)?;
        Ok(FolderInfo { id: rec.id, name: rec.name })
    }
}

impl DocumentHost for SharedStore {
    fn document(&self, id: &str) -> StoreResult<DocumentRecord> { self.0.lock().load_document(id) }

    fn update_document<R>(&self, id: &str, f: impl FnOnce(&mut DocumentRecord) -> R) -> StoreResult<R> {
        self.0.lock().update_document(id, f)
    }

    fn create_document(&self, name: &str, kind: DocumentKind) -> StoreResult<DocumentInfo> {
        Ok(self.0.lock().create_document(name, kind)?.info())
    }

    fn move_document(&self, document_id: &str, folder_id: &str) -> StoreResult<()> {
        self.0.lock().move_document(document_id, folder_id)
    }
}
