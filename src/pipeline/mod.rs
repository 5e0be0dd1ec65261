//! Pipeline stages for BOL generation.
//!
//! Each submodule implements one step of a batch; [`crate::generate`]
//! strings them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ rows ──▶ placeholders ──▶ substitute ──▶ render ──▶ merge
//! (.xlsx/   (records)  (per-row        (fill the      (docx →   (one PDF)
//!  .docx)               tokens)         template)      PDF)
//! ```
//!
//! 1. [`input`]: read the uploaded packages and check their magic
//! 2. [`rows`]: ordered row records and the required-column check
//! 3. [`placeholders`]: the four markers and their per-row replacements
//! 4. [`substitute`]: replace markers in a run-fragmented document
//! 5. [`render`]: convert each filled document to PDF; the only
//!    stage that launches an external process
//! 6. [`merge`]: concatenate per-row PDFs on the blocking pool

pub mod input;
pub mod merge;
pub mod placeholders;
pub mod render;
pub mod rows;
pub mod substitute;
