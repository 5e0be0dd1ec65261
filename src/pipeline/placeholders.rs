//! Template markers and the per-row values that replace them.

use crate::config::RunContext;
use crate::pipeline::rows::RowRecord;

/// Marker replaced by the composed address / phone / note line.
pub const PICKUP_MARKER: &str = "SEA-[pickup address]+TEPHONE+NOTE";
/// Marker replaced by the generated BOL number.
pub const BOL_NUMBER_MARKER: &str = "UNI-SEA-PICKUP-MM/DD/YYYY-SEQ";
/// Marker replaced by the carrier line with the DSP appended.
pub const CARRIER_MARKER: &str = "Carrier Name: GN GREENWHEELS INC.";
/// Marker replaced by the short ship date.
pub const SHIP_DATE_MARKER: &str = "Ship_date";

/// Every marker a template is expected to contain.
pub const ALL_MARKERS: [&str; 4] = [
    PICKUP_MARKER,
    BOL_NUMBER_MARKER,
    CARRIER_MARKER,
    SHIP_DATE_MARKER,
];

/// Token → replacement pairs applied to one document.
///
/// Entries keep insertion order; each token is applied at most once per
/// paragraph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderSet {
    entries: Vec<(String, String)>,
}

impl PlaceholderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite a token. Empty tokens are ignored since they would
    /// match between every character.
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        let token = token.into();
        if token.is_empty() {
            return;
        }
        let value = value.into();
        match self.entries.iter_mut().find(|(t, _)| *t == token) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((token, value)),
        }
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the four replacements for one row.
    ///
    /// The DSP value is sanitised once and used both in the carrier line and
    /// in the row's file names.
    pub fn for_row(record: &RowRecord, context: &RunContext) -> Self {
        let pickup = format!(
            "SEA - {} | TEL: {} | Note: {}",
            record.field("Address"),
            record.field("Phone"),
            record.field("Note")
        );
        let bol_number = bol_number(&context.display_date, record.sequence());
        let carrier = format!("{CARRIER_MARKER} - {}", record.dsp_slug());

        let mut set = Self::new();
        set.insert(PICKUP_MARKER, pickup);
        set.insert(BOL_NUMBER_MARKER, bol_number);
        set.insert(CARRIER_MARKER, carrier);
        set.insert(SHIP_DATE_MARKER, context.short_date.clone());
        set
    }
}

/// `UNI-SEA-PICKUP-{display_date}-{sequence}`.
pub fn bol_number(display_date: &str, sequence: usize) -> String {
    format!("UNI-SEA-PICKUP-{display_date}-{sequence}")
}
