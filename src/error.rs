//! Error types for the pickup-bol library.
//!
//! Three error types mirror the three ways a batch can die:
//!
//! * [`BolError`] is **fatal**: returned as `Err(BolError)` from every public
//!   entry point. Bad input files, missing spreadsheet columns, and the two
//!   collaborator failures below all surface through it.
//!
//! * [`ConversionError`]: one row's document could not be rendered to PDF
//!   (binary missing, non-zero exit, timeout, no output). Wrapped in
//!   [`BolError::Conversion`] together with the failing row's sequence.
//!
//! * [`MergeError`]: the rendered PDFs could not be concatenated. Wrapped in
//!   [`BolError::Merge`].
//!
//! None of these are recovered internally: the batch is all-or-nothing, so
//! the first error aborts the run and no combined PDF is produced.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pickup-bol library.
#[derive(Debug, Error)]
pub enum BolError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file was read but is not a ZIP-based Office package.
    #[error("'{path}' is not an Office document (.docx/.xlsx)\nFirst bytes: {magic:?}")]
    NotAnOfficePackage { path: PathBuf, magic: [u8; 4] },

    /// The Word template could not be parsed.
    #[error("Invalid Word template: {detail}")]
    InvalidTemplate { detail: String },

    /// The pickup plan spreadsheet could not be parsed.
    #[error("Invalid pickup plan spreadsheet: {detail}")]
    InvalidSpreadsheet { detail: String },

    // ── Batch errors ──────────────────────────────────────────────────────
    /// Required columns are absent from the spreadsheet header.
    #[error("Excel is missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    /// The spreadsheet has a header but no data rows.
    #[error("Pickup plan contains no rows to generate")]
    NoRows,

    /// Rendering one row's document to PDF failed; the whole batch is aborted.
    #[error("PDF conversion failed on row {sequence}: {source}")]
    Conversion {
        sequence: usize,
        #[source]
        source: ConversionError,
    },

    /// Concatenating the per-row PDFs failed.
    #[error("PDF merge failed: {0}")]
    Merge(#[from] MergeError),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the combined PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The ship date string is not `MM/DD/YYYY` or `YYYY-MM-DD`.
    #[error("Invalid ship date '{input}': expected MM/DD/YYYY or YYYY-MM-DD")]
    InvalidShipDate { input: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BolError {
    /// Sequence of the row that aborted the batch, if a row was at fault.
    pub fn failed_row(&self) -> Option<usize> {
        match self {
            BolError::Conversion { sequence, .. } => Some(*sequence),
            BolError::Merge(MergeError::Unreadable { sequence, .. })
            | BolError::Merge(MergeError::Encrypted { sequence }) => Some(*sequence),
            _ => None,
        }
    }
}

/// Rendering a single row's document to PDF failed.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ConversionError {
    /// The converter executable could not be found.
    #[error("converter '{program}' not found; install LibreOffice or set --office-program")]
    ProgramNotFound { program: String },

    /// The converter could not be started for another reason.
    #[error("could not launch '{program}': {detail}")]
    LaunchFailed { program: String, detail: String },

    /// The converter ran but reported failure.
    #[error("converter exited with status {}: {stderr}", code.map_or_else(|| "signal".to_string(), |c| c.to_string()))]
    NonZeroExit { code: Option<i32>, stderr: String },

    /// The converter did not finish in time and was killed.
    #[error("converter timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The converter finished but the expected PDF is not there.
    #[error("converter produced no output at '{path}'")]
    MissingOutput { path: PathBuf },

    /// The converter produced something that is not a PDF.
    #[error("converter output is not a PDF: {detail}")]
    InvalidOutput { detail: String },

    /// Writing the filled document or reading the result failed.
    #[error("I/O error: {detail}")]
    Io { detail: String },
}

/// Concatenating the per-row PDFs failed.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum MergeError {
    /// Nothing to merge.
    #[error("no documents to merge")]
    Empty,

    /// One of the inputs could not be parsed as a PDF.
    #[error("PDF for row {sequence} is unreadable: {detail}")]
    Unreadable { sequence: usize, detail: String },

    /// One of the inputs is encrypted and cannot be merged.
    #[error("PDF for row {sequence} is encrypted")]
    Encrypted { sequence: usize },

    /// The combined document could not be serialised.
    #[error("failed to write combined PDF: {detail}")]
    WriteFailed { detail: String },
}
