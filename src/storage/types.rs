//! Persisted host records: folders, documents and their sheets.
//! Keep this module purely about types/serde and light helpers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// The only kind picked up by the bridge listing.
    #[default]
    Spreadsheet,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FolderRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Child folder ids in creation order.
    #[serde(default)]
    pub folders: Vec<String>,
    /// Contained document ids in creation order.
    #[serde(default)]
    pub documents: Vec<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeaderStyle {
    pub background: String,
    pub font_color: String,
    pub bold: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetRecord {
    pub name: String,
    /// Every row including the header; `rows[0]` is row 1.
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    #[serde(default)]
    pub header_style: Option<HeaderStyle>,
    #[serde(default)]
    pub frozen_rows: u32,
    /// 1-based column -> width in pixels
    #[serde(default)]
    pub column_widths: BTreeMap<u32, u32>,
}

impl SheetRecord {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), rows: Vec::new(), header_style: None, frozen_rows: 0, column_widths: BTreeMap::new() }
    }

    /// Index of the last non-empty row, 1-based; 0 for an empty sheet.
    pub fn last_row(&self) -> usize { self.rows.len() }

    pub fn header(&self) -> Option<&[String]> { self.rows.first().map(|r| r.as_slice()) }

    pub fn append_row(&mut self, row: Vec<String>) { self.rows.push(row); }

    /// Write a single cell, growing rows and columns with empty strings as needed.
    pub fn set_cell(&mut self, row: usize, col: usize, value: &str) {
        debug_assert!(row >= 1 && col >= 1);
        while self.rows.len() < row { self.rows.push(Vec::new()); }
        let r = &mut self.rows[row - 1];
        while r.len() < col { r.push(String::new()); }
        r[col - 1] = value.to_string();
    }

    /// Cell text at a 1-based position; missing cells read as "".
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows.get(row.wrapping_sub(1))
            .and_then(|r| r.get(col.wrapping_sub(1)))
            .map(|s| s.as_str())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: DocumentKind,
    /// Containing folder; `None` while unfiled.
    #[serde(default)]
    pub folder: Option<String>,
    pub created_at: i64,
    /// Epoch milliseconds of the last content change.
    pub updated_at: i64,
    #[serde(default)]
    pub sheets: Vec<SheetRecord>,
}

impl DocumentRecord {
    pub fn sheet(&self, name: &str) -> Option<&SheetRecord> { self.sheets.iter().find(|s| s.name == name) }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut SheetRecord> { self.sheets.iter_mut().find(|s| s.name == name) }

    pub fn info(&self) -> DocumentInfo {
        DocumentInfo { id: self.id.clone(), name: self.name.clone(), kind: self.kind, updated_at: self.updated_at }
    }
}

/// Lightweight folder view returned by `FolderProvider`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderInfo {
    pub id: String,
    pub name: String,
}

/// Lightweight document view returned by `FolderProvider`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInfo {
    pub id: String,
    pub name: String,
    pub kind: DocumentKind,
    pub updated_at: i64,
}
