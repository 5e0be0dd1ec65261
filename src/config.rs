//! Configuration types for a BOL generation run.
//!
//! All generation behaviour is controlled through [`GenerationConfig`], built
//! via its [`GenerationConfigBuilder`]. The per-run values that end up inside
//! the documents (the ship date in its two formats) live separately in
//! [`RunContext`], which the caller owns and passes in on every run; the
//! library keeps no state between runs.

use crate::error::BolError;
use crate::pipeline::merge::PdfMerger;
use crate::pipeline::render::DocumentRenderer;
use crate::progress::ProgressCallback;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default file name of the combined PDF.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "All_BOLs_Combined.pdf";

/// Configuration for a generation run.
///
/// Built via [`GenerationConfig::builder()`] or using
/// [`GenerationConfig::default()`].
///
/// # Example
/// ```rust
/// use pickup_bol::GenerationConfig;
///
/// let config = GenerationConfig::builder()
///     .office_program("/opt/libreoffice/program/soffice")
///     .conversion_timeout_secs(90)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct GenerationConfig {
    /// Office suite executable used by the default renderer. Default: `soffice`.
    ///
    /// Resolved through `PATH` when not absolute.
    pub office_program: PathBuf,

    /// Per-row conversion timeout in seconds. Default: 120.
    ///
    /// A cold LibreOffice start with a fresh profile takes several seconds;
    /// a hung conversion is killed once this elapses and aborts the batch.
    pub conversion_timeout_secs: u64,

    /// File name reported for the combined PDF. Default: `All_BOLs_Combined.pdf`.
    pub output_file_name: String,

    /// Worksheet to read rows from. Default: the first sheet.
    pub sheet_name: Option<String>,

    /// Parent directory for the run's private scratch directory.
    /// Default: the system temp directory.
    pub work_dir: Option<PathBuf>,

    /// Pre-constructed renderer. Takes precedence over `office_program`.
    pub renderer: Option<Arc<dyn DocumentRenderer>>,

    /// Pre-constructed merger. Default: [`crate::pipeline::merge::LopdfMerger`].
    pub merger: Option<Arc<dyn PdfMerger>>,

    /// Receives per-row progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            office_program: PathBuf::from("soffice"),
            conversion_timeout_secs: 120,
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
            sheet_name: None,
            work_dir: None,
            renderer: None,
            merger: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("office_program", &self.office_program)
            .field("conversion_timeout_secs", &self.conversion_timeout_secs)
            .field("output_file_name", &self.output_file_name)
            .field("sheet_name", &self.sheet_name)
            .field("work_dir", &self.work_dir)
            .field("renderer", &self.renderer.as_ref().map(|r| r.name().to_string()))
            .field("merger", &self.merger.as_ref().map(|_| "<dyn PdfMerger>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl GenerationConfig {
    /// Create a new builder for `GenerationConfig`.
    pub fn builder() -> GenerationConfigBuilder {
        GenerationConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`GenerationConfig`].
#[derive(Debug)]
pub struct GenerationConfigBuilder {
    config: GenerationConfig,
}

impl GenerationConfigBuilder {
    pub fn office_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.office_program = program.into();
        self
    }

    pub fn conversion_timeout_secs(mut self, secs: u64) -> Self {
        self.config.conversion_timeout_secs = secs;
        self
    }

    pub fn output_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.output_file_name = name.into();
        self
    }

    pub fn sheet_name(mut self, name: impl Into<String>) -> Self {
        self.config.sheet_name = Some(name.into());
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.config.renderer = Some(renderer);
        self
    }

    pub fn merger(mut self, merger: Arc<dyn PdfMerger>) -> Self {
        self.config.merger = Some(merger);
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GenerationConfig, BolError> {
        let c = &self.config;
        if c.conversion_timeout_secs == 0 {
            return Err(BolError::InvalidConfig(
                "Conversion timeout must be ≥ 1 second".into(),
            ));
        }
        if c.office_program.as_os_str().is_empty() {
            return Err(BolError::InvalidConfig(
                "Office program path must not be empty".into(),
            ));
        }
        let name = c.output_file_name.trim();
        if name.is_empty() || !name.to_ascii_lowercase().ends_with(".pdf") {
            return Err(BolError::InvalidConfig(format!(
                "Output file name must end in .pdf, got '{}'",
                c.output_file_name
            )));
        }
        if name.contains(['/', '\\']) {
            return Err(BolError::InvalidConfig(format!(
                "Output file name must not contain a path separator, got '{}'",
                c.output_file_name
            )));
        }
        Ok(self.config)
    }
}

// ── Run context ──────────────────────────────────────────────────────────

/// Per-run values substituted into every document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    /// `MM/DD/YYYY`, embedded in BOL numbers.
    pub display_date: String,
    /// `MM/DD/YY`, replaces the ship-date marker.
    pub short_date: String,
}

impl RunContext {
    pub fn new(display_date: impl Into<String>, short_date: impl Into<String>) -> Self {
        Self {
            display_date: display_date.into(),
            short_date: short_date.into(),
        }
    }

    /// Format both date strings from a calendar date.
    pub fn from_ship_date(date: NaiveDate) -> Self {
        Self {
            display_date: date.format("%m/%d/%Y").to_string(),
            short_date: date.format("%m/%d/%y").to_string(),
        }
    }
}

/// Parse a ship date given as `MM/DD/YYYY` or `YYYY-MM-DD`.
pub fn parse_ship_date(input: &str) -> Result<NaiveDate, BolError> {
    let s = input.trim();
    NaiveDate::parse_from_str(s, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .map_err(|_| BolError::InvalidShipDate {
            input: input.to_string(),
        })
}
