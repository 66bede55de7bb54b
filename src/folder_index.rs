//! Folder index: the folder tree presented as a flat, sorted catalog of bridge
//! documents, plus get-or-create of named subfolders.
//!
//! The walk is an explicit stack-based depth-first traversal over
//! `FolderProvider`, so tree depth never grows the call stack. At each node the
//! directly contained spreadsheets are collected before its children are
//! visited. Sibling order is whatever the host yields; the result is sorted by
//! Japanese collation afterwards.

use std::collections::{HashMap, HashSet};

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collation::NameCollator;
use crate::config::is_unset_root;
use crate::error::{AppError, AppResult};
use crate::host::FolderProvider;
use crate::storage::{DocumentInfo, DocumentKind, FolderInfo};
use crate::timefmt;

/// One discovered bridge document, as shown to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeListEntry {
    pub name: String,
    pub id: String,
    pub url: String,
    pub last_updated: String,
}

/// How entries are rendered: url base and display timezone.
#[derive(Debug, Clone)]
pub struct EntryFormat {
    pub public_base_url: String,
    pub offset: FixedOffset,
}

impl EntryFormat {
    fn entry(&self, doc: &DocumentInfo) -> BridgeListEntry {
        BridgeListEntry {
            name: doc.name.clone(),
            id: doc.id.clone(),
            url: format!("{}/documents/{}", self.public_base_url, doc.id),
            last_updated: timefmt::format_millis(doc.updated_at, &self.offset, timefmt::LAST_UPDATED_FORMAT),
        }
    }
}

/// Subfolders resolved during one invocation, keyed by (parent id, name).
/// Never shared across requests.
#[derive(Debug, Default)]
pub struct FolderCache {
    entries: HashMap<(String, String), FolderInfo>,
}

impl FolderCache {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

pub struct FolderIndex<'a, P: FolderProvider> {
    provider: &'a P,
}

impl<'a, P: FolderProvider> FolderIndex<'a, P> {
    pub fn new(provider: &'a P) -> Self { Self { provider } }

    pub fn folder(&self, folder_id: &str) -> AppResult<FolderInfo> {
        if is_unset_root(folder_id) {
            return Err(AppError::configuration("root_folder_unset", "root folder id is not configured"));
        }
        Ok(self.provider.folder(folder_id)?)
    }

    /// Every spreadsheet reachable from `root_folder_id`, in traversal order.
    pub fn collect_documents(&self, root_folder_id: &str) -> AppResult<Vec<DocumentInfo>> {
        let root = self.folder(root_folder_id)?;
        let mut out: Vec<DocumentInfo> = Vec::new();
        let mut seen_docs: HashSet<String> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = vec![root.id];
        while let Some(folder_id) = stack.pop() {
            // A folder reachable twice is walked once
            if !visited.insert(folder_id.clone()) { continue; }
            for doc in self.provider.documents_in(&folder_id)? {
                if doc.kind != DocumentKind::Spreadsheet { continue; }
                if seen_docs.insert(doc.id.clone()) { out.push(doc); }
            }
            let children = self.provider.child_folders(&folder_id)?;
            // Reverse so the first child is visited first
            for child in children.into_iter().rev() {
                stack.push(child.id);
            }
        }
        debug!(target: "bridgebook::folders", "collect_documents: root='{}' folders={} documents={}", root_folder_id, visited.len(), out.len());
        Ok(out)
    }

    /// The full catalog under `root_folder_id`, sorted by Japanese collation of `name`.
    pub fn list_all_documents(&self, root_folder_id: &str, format: &EntryFormat) -> AppResult<Vec<BridgeListEntry>> {
        let docs = self.collect_documents(root_folder_id)?;
        let collator = NameCollator::japanese()?;
        let mut entries: Vec<BridgeListEntry> = docs.iter().map(|d| format.entry(d)).collect();
        entries.sort_by(|a, b| collator.compare(&a.name, &b.name));
        Ok(entries)
    }

    /// Id of the child folder named exactly `name`, created when absent.
    pub fn resolve_subfolder(&self, parent_folder_id: &str, name: &str) -> AppResult<String> {
        Ok(self.find_or_create(parent_folder_id, name)?.id)
    }

    /// `resolve_subfolder` through an invocation-scoped cache: repeated lookups of
    /// the same (parent, name) reuse the first result and never create twice.
    pub fn resolve_subfolder_cached(&self, cache: &mut FolderCache, parent_folder_id: &str, name: &str) -> AppResult<FolderInfo> {
        let key = (parent_folder_id.to_string(), name.to_string());
        if let Some(hit) = cache.entries.get(&key) { return Ok(hit.clone()); }
        let info = self.find_or_create(parent_folder_id, name)?;
        cache.entries.insert(key, info.clone());
        Ok(info)
    }

    fn find_or_create(&self, parent_folder_id: &str, name: &str) -> AppResult<FolderInfo> {
        let existing = self.provider.child_folders(parent_folder_id)?;
        if let Some(found) = existing.into_iter().find(|f| f.name == name) {
            return Ok(found);
        }
        let created = self.provider.create_folder(parent_folder_id, name)?;
        debug!(target: "bridgebook::folders", "resolve_subfolder: created '{}' under '{}' id='{}'", name, parent_folder_id, created.id);
        Ok(created)
    }
}
