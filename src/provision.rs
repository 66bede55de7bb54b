//! Bulk provisioning of bridge documents.
//!
//! Orchestration over the core primitives: each input row names a bridge and,
//! optionally, a subfolder of the root. Rows are processed independently; a
//! skipped or failed row never aborts the rest of the batch. Subfolders are
//! resolved through one `FolderCache` per run.
//!
//! The list-document mode reads its rows from the `一括作成リスト` sheet of a
//! document (A: bridge name, B: folder name) and writes the per-row result
//! text back into column C.

use std::fmt;

use tracing::{info, warn};

use crate::document_store::{new_record_sheet, write_header};
use crate::error::{AppError, AppResult};
use crate::folder_index::{FolderCache, FolderIndex};
use crate::host::{DocumentHost, FolderProvider};
use crate::record::SchemaVariant;
use crate::storage::{DocumentKind, FolderInfo, SheetRecord, StoreError};

pub const LIST_SHEET_NAME: &str = "一括作成リスト";
pub const LIST_SHEET_HEADER: [&str; 3] = ["橋の名前(必須)", "フォルダ名(任意)", "作成結果"];
const LIST_SHEET_WIDTHS: [(u32, u32); 3] = [(1, 200), (2, 150), (3, 300)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRow {
    pub bridge_name: String,
    pub subfolder: String,
}

impl ProvisionRow {
    pub fn new(bridge_name: &str, subfolder: &str) -> Self {
        Self { bridge_name: bridge_name.to_string(), subfolder: subfolder.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Created { folder_name: String, document_id: String },
    SkippedNoName,
    SkippedDuplicate,
    Failed(String),
}

impl RowOutcome {
    pub fn is_skipped(&self) -> bool { matches!(self, RowOutcome::SkippedNoName | RowOutcome::SkippedDuplicate) }
}

/// The status text written back to the list sheet.
impl fmt::Display for RowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowOutcome::Created { folder_name, .. } => write!(f, "作成完了 ({})", folder_name),
            RowOutcome::SkippedNoName => write!(f, "スキップ: 名前なし"),
            RowOutcome::SkippedDuplicate => write!(f, "スキップ: 同名ファイルあり"),
            RowOutcome::Failed(msg) => write!(f, "エラー: {}", msg),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionReport {
    pub outcomes: Vec<RowOutcome>,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListRun {
    /// The list sheet was missing and has been created; nothing provisioned.
    Prepared,
    /// The list sheet holds only its header.
    NoData,
    Completed(ProvisionReport),
}

pub struct BulkProvisioner<'a, H: FolderProvider + DocumentHost> {
    host: &'a H,
    root_folder_id: &'a str,
    variant: SchemaVariant,
    sheet_name: &'a str,
}

impl<'a, H: FolderProvider + DocumentHost> BulkProvisioner<'a, H> {
    pub fn new(host: &'a H, root_folder_id: &'a str, variant: SchemaVariant, sheet_name: &'a str) -> Self {
        Self { host, root_folder_id, variant, sheet_name }
    }

    /// Provision one document per usable row. Fails as a whole only when the
    /// root folder itself cannot be resolved.
    pub fn provision(&self, rows: &[ProvisionRow]) -> AppResult<ProvisionReport> {
        let index = FolderIndex::new(self.host);
        let parent = index.folder(self.root_folder_id)?;
        let mut cache = FolderCache::new();
        let mut report = ProvisionReport::default();
        for (i, row) in rows.iter().enumerate() {
            let outcome = match self.provision_one(&index, &mut cache, &parent, row) {
                Ok(o) => o,
                Err(e) => {
                    warn!(target: "bridgebook::provision", "row {}: '{}' failed: {}", i + 1, row.bridge_name, e);
                    RowOutcome::Failed(e.message().to_string())
                }
            };
            if outcome.is_skipped() {
                report.skipped += 1;
            } else if let RowOutcome::Failed(_) = outcome {
                report.failed += 1;
            } else {
                report.created += 1;
            }
            report.outcomes.push(outcome);
        }
        info!(target: "bridgebook::provision", "provision done: created={} skipped={} failed={} folders_resolved={}",
            report.created, report.skipped, report.failed, cache.len());
        Ok(report)
    }

    fn provision_one(&self, index: &FolderIndex<'_, H>, cache: &mut FolderCache, parent: &FolderInfo, row: &ProvisionRow) -> AppResult<RowOutcome> {
        let name = row.bridge_name.trim();
        if name.is_empty() { return Ok(RowOutcome::SkippedNoName); }

        let sub = row.subfolder.trim();
        let target = if sub.is_empty() { parent.clone() } else { index.resolve_subfolder_cached(cache, &parent.id, sub)? };

        if self.host.documents_in(&target.id)?.iter().any(|d| d.name == name) {
            return Ok(RowOutcome::SkippedDuplicate);
        }

        // Filed last: a document only shows up in its folder once it carries its sheet
        let doc = self.host.create_document(name, DocumentKind::Spreadsheet)
            .map_err(|e| step_failed("create document", name, e))?;
        let (sheet_name, variant) = (self.sheet_name, self.variant);
        self.host.update_document(&doc.id, |d| d.sheets.push(new_record_sheet(sheet_name, variant)))
            .map_err(|e| step_failed("add sheet", &doc.id, e))?;
        self.host.move_document(&doc.id, &target.id)
            .map_err(|e| step_failed("move into folder", &doc.id, e))?;
        info!(target: "bridgebook::provision", "created '{}' in '{}' ({})", name, target.name, doc.id);
        Ok(RowOutcome::Created { folder_name: target.name, document_id: doc.id })
    }

    /// Run from the list sheet of `list_document_id`, writing results to column C.
    pub fn run_list_document(&self, list_document_id: &str) -> AppResult<ListRun> {
        let doc = self.host.document(list_document_id)?;
        let Some(list) = doc.sheet(LIST_SHEET_NAME) else {
            self.host.update_document(list_document_id, |d| {
                if d.sheet(LIST_SHEET_NAME).is_none() {
                    let mut sheet = SheetRecord::new(LIST_SHEET_NAME);
                    write_header(&mut sheet, &LIST_SHEET_HEADER, &LIST_SHEET_WIDTHS);
                    d.sheets.push(sheet);
                }
            })?;
            info!(target: "bridgebook::provision", "prepared list sheet in '{}'", doc.name);
            return Ok(ListRun::Prepared);
        };
        let last_row = list.last_row();
        if last_row < 2 { return Ok(ListRun::NoData); }

        let rows: Vec<ProvisionRow> = (2..=last_row)
            .map(|r| ProvisionRow::new(list.cell(r, 1), list.cell(r, 2)))
            .collect();
        let report = self.provision(&rows)?;

        self.host.update_document(list_document_id, |d| {
            if let Some(sheet) = d.sheet_mut(LIST_SHEET_NAME) {
                for (i, outcome) in report.outcomes.iter().enumerate() {
                    sheet.set_cell(i + 2, 3, &outcome.to_string());
                }
            }
        })?;
        Ok(ListRun::Completed(report))
    }
}

/// Names the provisioning step that failed and the document it left behind.
fn step_failed(step: &str, subject: &str, err: StoreError) -> AppError {
    let cause = AppError::from(err);
    AppError::internal("provision_step_failed".to_string(), format!("{} ({}): {}", step, subject, cause.message()))
}
