//! # pickup-bol
//!
//! Generate one Bill of Lading per pickup row and combine them into a single
//! PDF.
//!
//! A pickup plan (`.xlsx`, one row per pickup) and a Word template (`.docx`)
//! go in. For every row the template is copied, four text markers are
//! replaced with that row's values, the copy is rendered to PDF by a
//! headless office suite, and all PDFs are concatenated in row order.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .xlsx + .docx
//!  │
//!  ├─ 1. Input       read both packages, check required columns
//!  ├─ 2. Fill        per row: copy template, substitute markers
//!  ├─ 3. Render      per row: soffice --convert-to pdf (sequential)
//!  ├─ 4. Merge       lopdf concatenation (spawn_blocking)
//!  └─ 5. Output      combined PDF + per-row stats
//! ```
//!
//! ## Template markers
//!
//! | Marker | Replaced with |
//! |--------|---------------|
//! | `SEA-[pickup address]+TEPHONE+NOTE` | `SEA - {Address} \| TEL: {Phone} \| Note: {Note}` |
//! | `UNI-SEA-PICKUP-MM/DD/YYYY-SEQ` | `UNI-SEA-PICKUP-{MM/DD/YYYY}-{sequence}` |
//! | `Carrier Name: GN GREENWHEELS INC.` | the same text followed by ` - {DSP}` |
//! | `Ship_date` | the ship date as `MM/DD/YY` |
//!
//! Markers are matched on a paragraph's whole text, so a marker split
//! across differently formatted runs is still found. A rewritten paragraph
//! takes the formatting of its first run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pickup_bol::{generate_to_file, parse_ship_date, GenerationConfig, RunContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = RunContext::from_ship_date(parse_ship_date("06/01/2024")?);
//!     let config = GenerationConfig::default();
//!     let stats = generate_to_file(
//!         "pickup_plan.xlsx",
//!         "bol_template.docx",
//!         "All_BOLs_Combined.pdf",
//!         &context,
//!         &config,
//!     )
//!     .await?;
//!     eprintln!("{} BOLs in {}ms", stats.total_rows, stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pickup-bol` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pickup-bol = { version = "0.3", default-features = false }
//! ```
//!
//! ## Runtime requirement
//!
//! The default renderer needs LibreOffice (`soffice`) on `PATH` or passed via
//! [`GenerationConfigBuilder::office_program`]. Any other converter can be
//! plugged in through [`DocumentRenderer`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod docx;
pub mod error;
pub mod generate;
pub mod opc;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod xlsx;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{parse_ship_date, GenerationConfig, GenerationConfigBuilder, RunContext};
pub use docx::{DocxDocument, DocxTemplate};
pub use error::{BolError, ConversionError, MergeError};
pub use generate::{
    generate, generate_from_bytes, generate_sync, generate_to_file, inspect, inspect_inputs,
    run_batch,
};
pub use output::{BatchOutput, BatchStats, InspectReport, MarkerPresence, RowSummary};
pub use pipeline::merge::{LopdfMerger, PdfMerger, RunArtifact};
pub use pipeline::placeholders::PlaceholderSet;
pub use pipeline::render::{DocumentRenderer, OfficeRenderer, RenderFuture};
pub use pipeline::rows::{RowRecord, RowSet};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
