//! Progress-callback trait for per-row generation events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! events as the batch processes each row.
//!
//! Rows are processed strictly one after another, so events arrive in row
//! order: `on_row_start(n)` is always followed by either `on_row_complete(n)`
//! or `on_row_error(n)` before row `n + 1` starts. After an error no further
//! row events are sent.
//!
//! # Example
//!
//! ```rust
//! use pickup_bol::{BatchProgressCallback, GenerationConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_row_complete(&self, sequence: usize, total_rows: usize, pdf_bytes: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("BOL {}/{} ready ({} bytes)", sequence, total_rows, pdf_bytes);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { completed: AtomicUsize::new(0) });
//!
//! let config = GenerationConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch pipeline as it processes each row.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once, after input validation and before the first row.
    fn on_batch_start(&self, total_rows: usize) {
        let _ = total_rows;
    }

    /// Called before a row's document is filled and rendered.
    ///
    /// # Arguments
    /// * `sequence`: 1-based row sequence
    /// * `total_rows`: rows in the batch
    fn on_row_start(&self, sequence: usize, total_rows: usize) {
        let _ = (sequence, total_rows);
    }

    /// Called when a row's PDF has been rendered.
    ///
    /// # Arguments
    /// * `pdf_bytes`: size of the rendered PDF
    fn on_row_complete(&self, sequence: usize, total_rows: usize, pdf_bytes: usize) {
        let _ = (sequence, total_rows, pdf_bytes);
    }

    /// Called when a row fails. The batch aborts right after.
    fn on_row_error(&self, sequence: usize, total_rows: usize, error: &str) {
        let _ = (sequence, total_rows, error);
    }

    /// Called once every row has rendered, before merging.
    fn on_merge_start(&self, artifacts: usize) {
        let _ = artifacts;
    }

    /// Called once the combined PDF exists.
    fn on_batch_complete(&self, total_rows: usize, output_bytes: usize) {
        let _ = (total_rows, output_bytes);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
