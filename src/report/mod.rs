/// Report and tabular-exchange structures
///
/// Import/export works over plain tabular structures; encoding to an actual
/// spreadsheet or PDF file is the client's concern. A `Workbook` is a list of
/// named sheets, each a header row plus string cells; a `Document` is the
/// paginated print-style counterpart.

mod export;

pub use export::{
    filtrar_por_fechas, plantilla_importacion, ReportBuilder, ReportFilters, ReporteMensual,
};

use serde::{Deserialize, Serialize};

/// A single named sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, header: &[&str]) -> Self {
        Self {
            name: name.into(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

/// A workbook of named sheets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// The sheet named `name` (case-insensitive), else the first sheet
    pub fn sheet_named_or_first(&self, name: &str) -> Option<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name.to_lowercase() == name.to_lowercase())
            .or_else(|| self.sheets.first())
    }
}

/// Header block of a print-style document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentHeader {
    pub title: String,
    pub generated_at: String,
    pub total: usize,
    /// Human-readable "filter: value" lines
    pub filters: Vec<String>,
}

/// One page of the main table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPage {
    pub number: usize,
    pub rows: Vec<Vec<String>>,
}

/// Paginated print-style document: header block, main table, per-sector
/// summary table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub header: DocumentHeader,
    pub table_header: Vec<String>,
    pub pages: Vec<DocumentPage>,
    pub sector_summary: Sheet,
}
