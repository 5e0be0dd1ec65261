//! Result types returned by the generation entry points.

use serde::{Deserialize, Serialize};

/// MIME type of the combined document.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// The combined BOL document plus per-row details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// Combined PDF bytes, one or more pages per row in sequence order.
    #[serde(skip)]
    pub pdf: Vec<u8>,

    /// Suggested download name, e.g. `All_BOLs_Combined.pdf`.
    pub file_name: String,

    /// Always `application/pdf`.
    pub media_type: String,

    /// One entry per row, in sequence order.
    pub rows: Vec<RowSummary>,

    pub stats: BatchStats,
}

/// What happened to one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSummary {
    /// 1-based sequence, also embedded in the BOL number.
    pub sequence: usize,

    /// Stem of the row's intermediate files, e.g. `3_Acme_BOL`.
    pub file_stem: String,

    /// Paragraphs whose text changed during substitution.
    pub paragraphs_rewritten: usize,

    /// Size of the row's rendered PDF.
    pub pdf_bytes: usize,

    /// Time spent in the renderer for this row.
    pub render_duration_ms: u64,
}

/// Aggregate statistics for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_rows: usize,
    pub total_duration_ms: u64,
    /// Sum of per-row render time.
    pub render_duration_ms: u64,
    pub merge_duration_ms: u64,
    pub output_bytes: usize,
}

/// Pre-flight view of a pickup plan and template; nothing is rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectReport {
    /// Data rows that would each produce one BOL.
    pub row_count: usize,
    /// Header of the pickup plan, in sheet order.
    pub columns: Vec<String>,
    /// Required columns absent from the header. Non-empty means a run
    /// would fail.
    pub missing_columns: Vec<String>,
    /// Which markers the template contains.
    pub markers: Vec<MarkerPresence>,
}

impl InspectReport {
    /// Whether a generation run with these inputs would get past validation.
    pub fn is_ready(&self) -> bool {
        self.missing_columns.is_empty() && self.row_count > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerPresence {
    pub marker: String,
    pub found: bool,
}
