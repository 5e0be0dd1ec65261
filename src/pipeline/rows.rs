//! Row records: one pickup per spreadsheet row.
//!
//! A [`RowSet`] owns the header and the records built from it. Sequences are
//! assigned on insertion (1, 2, 3, …), so the order of `records()` is the
//! order rows appeared in the sheet and the order their pages appear in the
//! combined PDF.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Columns every pickup plan must carry.
pub const REQUIRED_COLUMNS: [&str; 4] = ["Address", "Phone", "Note", "DSP"];

/// One spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRecord {
    sequence: usize,
    fields: BTreeMap<String, String>,
}

impl RowRecord {
    /// 1-based position of the row among data rows.
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    /// Value of a named field; absent fields read as empty.
    pub fn field(&self, name: &str) -> &str {
        self.fields.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// DSP value with path separators replaced, safe to embed in a file name.
    pub fn dsp_slug(&self) -> String {
        sanitize_path_component(self.field("DSP"))
    }

    /// Stem shared by the row's intermediate files, e.g. `3_Acme_Logistics_BOL`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}_BOL", self.sequence, self.dsp_slug())
    }
}

/// Replace `/` and `\` with `_`.
pub fn sanitize_path_component(value: &str) -> String {
    value.replace(['/', '\\'], "_")
}

/// Header plus ordered records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSet {
    columns: Vec<String>,
    records: Vec<RowRecord>,
}

impl RowSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    /// Append a row; `values` line up with the header by position.
    ///
    /// Missing trailing values read as empty; extra values are ignored. When
    /// a column name repeats, the first occurrence wins.
    pub fn push_row(&mut self, values: Vec<String>) -> &RowRecord {
        let mut fields = BTreeMap::new();
        let mut values = values.into_iter();
        for column in &self.columns {
            let value = values.next().unwrap_or_default();
            fields.entry(column.clone()).or_insert(value);
        }
        let sequence = self.records.len() + 1;
        self.records.push(RowRecord { sequence, fields });
        &self.records[sequence - 1]
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[RowRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Required columns absent from the header, in `required` order.
    pub fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|name| !self.columns.iter().any(|c| c == *name))
            .map(|name| name.to_string())
            .collect()
    }
}
