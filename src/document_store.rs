//! Document store: resolve a write target inside a document and append one row.
//!
//! Numbering rule: a new row's sequence is the sheet's last row *before* the
//! append. With the header in row 1, the first data row gets 1, the second 2.
//! The formula is kept literally; a sheet whose header was removed numbers from 0.

use chrono::{FixedOffset, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::host::DocumentHost;
use crate::record::{RecordInput, SchemaVariant};
use crate::storage::{DocumentKind, HeaderStyle, SheetRecord};
use crate::timefmt;

pub const HEADER_BACKGROUND: &str = "#4285f4";
pub const HEADER_FONT_COLOR: &str = "white";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetHandle {
    pub document_id: String,
    pub document_name: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppendResult {
    pub document_name: String,
    pub sheet_name: String,
    /// Value written to the No column.
    pub sequence: usize,
    /// Receipt time written to column 1 (variant A only).
    pub received_at: Option<String>,
    /// 1-based row the record landed on.
    pub row: usize,
}

/// Write `header` into row 1 and apply header presentation.
pub fn write_header(sheet: &mut SheetRecord, header: &[&str], widths: &[(u32, u32)]) {
    let row: Vec<String> = header.iter().map(|h| h.to_string()).collect();
    if sheet.rows.is_empty() { sheet.rows.push(row); } else { sheet.rows[0] = row; }
    sheet.header_style = Some(HeaderStyle {
        background: HEADER_BACKGROUND.to_string(),
        font_color: HEADER_FONT_COLOR.to_string(),
        bold: true,
    });
    sheet.frozen_rows = 1;
    for (col, w) in widths { sheet.column_widths.insert(*col, *w); }
}

/// A fresh sheet carrying `variant`'s header.
pub fn new_record_sheet(name: &str, variant: SchemaVariant) -> SheetRecord {
    let mut sheet = SheetRecord::new(name);
    write_header(&mut sheet, variant.header(), variant.column_widths());
    sheet
}

pub struct DocumentStore<'a, H: DocumentHost> {
    host: &'a H,
    variant: SchemaVariant,
    offset: FixedOffset,
}

impl<'a, H: DocumentHost> DocumentStore<'a, H> {
    pub fn new(host: &'a H, variant: SchemaVariant, offset: FixedOffset) -> Self {
        Self { host, variant, offset }
    }

    pub fn variant(&self) -> SchemaVariant { self.variant }

    /// Only spreadsheets resolve as write targets; any other kind is not found.
    pub fn open_document(&self, document_id: &str) -> AppResult<DocumentHandle> {
        let doc = self.host.document(document_id)?;
        if doc.kind != DocumentKind::Spreadsheet {
            return Err(AppError::not_found("document_not_found".to_string(), format!("document is not a spreadsheet: {}", document_id)));
        }
        Ok(DocumentHandle { id: doc.id, name: doc.name })
    }

    /// Exact-name lookup; a missing sheet is created with the active header.
    /// Calling twice never yields two sheets of the same name.
    pub fn get_or_create_sheet(&self, doc: &DocumentHandle, sheet_name: &str) -> AppResult<SheetHandle> {
        if sheet_name.is_empty() {
            return Err(AppError::validation("invalid_sheet_name", "sheet name must not be empty"));
        }
        let variant = self.variant;
        let (created, document_name) = self.host.update_document(&doc.id, |d| {
            if d.sheet(sheet_name).is_some() { return (false, d.name.clone()); }
            d.sheets.push(new_record_sheet(sheet_name, variant));
            (true, d.name.clone())
        })?;
        if created {
            info!(target: "bridgebook::store", "created sheet '{}' in '{}' ({})", sheet_name, document_name, doc.id);
        }
        Ok(SheetHandle { document_id: doc.id.clone(), document_name, name: sheet_name.to_string() })
    }

    /// Append one record as the sheet's new final row.
    pub fn append_record(&self, sheet: &SheetHandle, record: &RecordInput) -> AppResult<AppendResult> {
        if record.variant() != self.variant {
            return Err(AppError::internal(
                "variant_mismatch".to_string(),
                format!("record is variant {} but the store writes variant {}", record.variant(), self.variant),
            ));
        }
        let received_at = match self.variant {
            SchemaVariant::A => Some(timefmt::format_instant(Utc::now(), &self.offset, timefmt::RECEIVED_AT_FORMAT)),
            SchemaVariant::B => None,
        };
        let result = self.host.update_document(&sheet.document_id, |d| {
            let document_name = d.name.clone();
            let Some(target) = d.sheet_mut(&sheet.name) else {
                return Err(AppError::not_found("sheet_not_found".to_string(), format!("sheet not found: {}", sheet.name)));
            };
            let sequence = target.last_row();
            target.append_row(record.to_row(sequence, received_at.as_deref().unwrap_or("")));
            Ok(AppendResult {
                document_name,
                sheet_name: target.name.clone(),
                sequence,
                received_at: received_at.clone(),
                row: target.last_row(),
            })
        })??;
        debug!(target: "bridgebook::store", "append_record: doc='{}' sheet='{}' seq={} row={}", sheet.document_id, sheet.name, result.sequence, result.row);
        Ok(result)
    }

    pub fn last_row(&self, sheet: &SheetHandle) -> AppResult<usize> {
        let doc = self.host.document(&sheet.document_id)?;
        doc.sheet(&sheet.name)
            .map(|s| s.last_row())
            .ok_or_else(|| AppError::not_found("sheet_not_found".to_string(), format!("sheet not found: {}", sheet.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{VariantARecord, VariantBRecord};
    use crate::storage::{DocumentKind, SharedStore};

    fn setup() -> (tempfile::TempDir, SharedStore, String) {
        let tmp = tempfile::tempdir().unwrap();
        let shared = SharedStore::new(tmp.path()).unwrap();
        let doc = shared.0.lock().create_document("○○橋", DocumentKind::Spreadsheet).unwrap();
        (tmp, shared, doc.id)
    }

    fn jst() -> FixedOffset { timefmt::fixed_offset(540).unwrap() }

    #[test]
    fn get_or_create_sheet_is_idempotent() {
        let (_tmp, shared, id) = setup();
        let store = DocumentStore::new(&shared, SchemaVariant::B, jst());
        let doc = store.open_document(&id).unwrap();
        let a = store.get_or_create_sheet(&doc, "X").unwrap();
        let b = store.get_or_create_sheet(&doc, "X").unwrap();
        assert_eq!(a, b);
        let rec = shared.document(&id).unwrap();
        assert_eq!(rec.sheets.iter().filter(|s| s.name == "X").count(), 1);
        let sheet = rec.sheet("X").unwrap();
        assert_eq!(sheet.last_row(), 1);
        assert_eq!(sheet.header().unwrap()[0], "No.");
        assert_eq!(sheet.frozen_rows, 1);
        assert_eq!(sheet.header_style.as_ref().unwrap().background, HEADER_BACKGROUND);
    }

    #[test]
    fn sequence_is_pre_append_row_count() {
        let (_tmp, shared, id) = setup();
        let store = DocumentStore::new(&shared, SchemaVariant::B, jst());
        let doc = store.open_document(&id).unwrap();
        let sheet = store.get_or_create_sheet(&doc, "点検データ").unwrap();
        assert_eq!(store.last_row(&sheet).unwrap(), 1);

        let rec = RecordInput::B(VariantBRecord { member: "主桁".into(), ..Default::default() });
        let first = store.append_record(&sheet, &rec).unwrap();
        assert_eq!(first.sequence, 1);
        assert_eq!(store.last_row(&sheet).unwrap(), 2);
        let second = store.append_record(&sheet, &rec).unwrap();
        assert_eq!(second.sequence, 2);
        assert_eq!(second.row, 3);
        assert_eq!(second.document_name, "○○橋");

        let stored = shared.document(&id).unwrap();
        let rows = &stored.sheet("点検データ").unwrap().rows;
        assert_eq!(rows[2][0], "2");
        assert_eq!(rows[2][5], "主桁");
        assert_eq!(rows[2].len(), 17);
    }

    #[test]
    fn variant_a_writes_receipt_time_first() {
        let (_tmp, shared, id) = setup();
        let store = DocumentStore::new(&shared, SchemaVariant::A, jst());
        let doc = store.open_document(&id).unwrap();
        let sheet = store.get_or_create_sheet(&doc, "下面").unwrap();
        let rec = RecordInput::A(VariantARecord { damage_name: "腐食".into(), ..Default::default() });
        let res = store.append_record(&sheet, &rec).unwrap();
        let ts = res.received_at.clone().unwrap();
        assert_eq!(ts.len(), "2026/10/17 09:30:00".len());
        let stored = shared.document(&id).unwrap();
        let row = &stored.sheet("下面").unwrap().rows[1];
        assert_eq!(row[0], ts);
        assert_eq!(row[1], "1");
        assert_eq!(row[4], "腐食");
    }

    #[test]
    fn missing_document_and_mismatched_variant() {
        let (_tmp, shared, id) = setup();
        let store = DocumentStore::new(&shared, SchemaVariant::B, jst());
        assert!(matches!(store.open_document("does-not-exist"), Err(AppError::NotFound { .. })));

        let doc = store.open_document(&id).unwrap();
        let sheet = store.get_or_create_sheet(&doc, "S").unwrap();
        let wrong = RecordInput::A(VariantARecord::default());
        assert_eq!(store.append_record(&sheet, &wrong).unwrap_err().code_str(), "variant_mismatch");
        assert_eq!(store.last_row(&sheet).unwrap(), 1);
    }

    #[test]
    fn non_spreadsheet_is_not_a_write_target() {
        let (_tmp, shared, _id) = setup();
        let pdf = shared.create_document("写真.pdf", DocumentKind::Other).unwrap();
        let store = DocumentStore::new(&shared, SchemaVariant::B, jst());
        let err = store.open_document(&pdf.id).unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        assert_eq!(err.code_str(), "document_not_found");
        assert!(shared.document(&pdf.id).unwrap().sheets.is_empty());
    }

    #[test]
    fn deleted_sheet_is_not_found_on_append() {
        let (_tmp, shared, id) = setup();
        let store = DocumentStore::new(&shared, SchemaVariant::B, jst());
        let doc = store.open_document(&id).unwrap();
        let sheet = store.get_or_create_sheet(&doc, "S").unwrap();
        shared.update_document(&id, |d| d.sheets.clear()).unwrap();
        let rec = RecordInput::B(VariantBRecord::default());
        assert!(matches!(store.append_record(&sheet, &rec), Err(AppError::NotFound { .. })));
    }
}
