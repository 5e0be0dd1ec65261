//! Batch generation entry points.
//!
//! [`run_batch`] is the core: one filled template per row, each rendered to
//! PDF, all merged into a single document. The other entry points only
//! differ in where the inputs come from and where the output goes.
//!
//! Rows are processed strictly in sequence. The first failing row aborts the
//! batch with [`BolError::Conversion`] naming its sequence; nothing is
//! merged and no partial output is returned. Intermediate files live in a
//! per-run scratch directory that is removed on every exit path.

use crate::config::{GenerationConfig, RunContext};
use crate::docx::DocxTemplate;
use crate::error::{BolError, ConversionError};
use crate::output::{BatchOutput, BatchStats, InspectReport, MarkerPresence, RowSummary, PDF_MEDIA_TYPE};
use crate::pipeline::merge::{LopdfMerger, PdfMerger, RunArtifact};
use crate::pipeline::placeholders::{PlaceholderSet, ALL_MARKERS};
use crate::pipeline::render::{DocumentRenderer, OfficeRenderer};
use crate::pipeline::rows::{RowRecord, RowSet, REQUIRED_COLUMNS};
use crate::pipeline::{input, substitute};
use crate::xlsx;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Generate the combined BOL PDF for already-parsed inputs.
///
/// # Errors
/// - [`BolError::MissingColumns`] before any work if the header lacks a
///   required column
/// - [`BolError::NoRows`] if there is nothing to generate
/// - [`BolError::Conversion`] for the first row that fails to render
/// - [`BolError::Merge`] if the rendered PDFs cannot be combined
pub async fn run_batch(
    rows: &RowSet,
    template: &DocxTemplate,
    context: &RunContext,
    config: &GenerationConfig,
) -> Result<BatchOutput, BolError> {
    let total_start = Instant::now();

    // ── Step 1: Validate inputs ──────────────────────────────────────────
    let missing = rows.missing_columns(&REQUIRED_COLUMNS);
    if !missing.is_empty() {
        return Err(BolError::MissingColumns { missing });
    }
    if rows.is_empty() {
        return Err(BolError::NoRows);
    }
    for marker in ALL_MARKERS {
        if !template.body().contains(marker) {
            warn!("Template does not contain marker '{}'", marker);
        }
    }

    let total_rows = rows.len();
    let callback = config.progress_callback.as_deref();
    info!(
        "Generating {} BOLs for ship date {}",
        total_rows, context.display_date
    );
    if let Some(cb) = callback {
        cb.on_batch_start(total_rows);
    }

    // ── Step 2: Scratch space and renderer ───────────────────────────────
    let scratch = create_scratch_dir(config.work_dir.as_deref())?;
    debug!("Scratch directory: {}", scratch.path().display());

    let renderer: Arc<dyn DocumentRenderer> = match &config.renderer {
        Some(r) => Arc::clone(r),
        None => Arc::new(
            OfficeRenderer::new(&config.office_program, config.conversion_timeout_secs)
                .with_profile_dir(scratch.path().join("office-profile")),
        ),
    };
    let timeout = Duration::from_secs(config.conversion_timeout_secs);

    // ── Step 3: Fill and render each row ─────────────────────────────────
    let mut artifacts = Vec::with_capacity(total_rows);
    let mut summaries = Vec::with_capacity(total_rows);
    let mut render_duration_ms = 0;

    for record in rows.records() {
        let sequence = record.sequence();
        if let Some(cb) = callback {
            cb.on_row_start(sequence, total_rows);
        }

        let result = render_row(
            record,
            template,
            context,
            renderer.as_ref(),
            scratch.path(),
            timeout,
        )
        .await;

        let (artifact, summary) = match result {
            Ok(done) => done,
            Err(e) => {
                warn!("Row {} failed: {}", sequence, e);
                if let Some(cb) = callback {
                    cb.on_row_error(sequence, total_rows, &e.to_string());
                }
                close_scratch(scratch);
                return Err(e);
            }
        };

        info!(
            "BOL {}/{} ready: {} ({} bytes, {}ms)",
            sequence, total_rows, summary.file_stem, summary.pdf_bytes, summary.render_duration_ms
        );
        if let Some(cb) = callback {
            cb.on_row_complete(sequence, total_rows, summary.pdf_bytes);
        }
        render_duration_ms += summary.render_duration_ms;
        artifacts.push(artifact);
        summaries.push(summary);
    }

    // ── Step 4: Merge ────────────────────────────────────────────────────
    if let Some(cb) = callback {
        cb.on_merge_start(artifacts.len());
    }
    let merger: Arc<dyn PdfMerger> = match &config.merger {
        Some(m) => Arc::clone(m),
        None => Arc::new(LopdfMerger),
    };
    let merge_start = Instant::now();
    let merged = tokio::task::spawn_blocking(move || merger.merge(&artifacts))
        .await
        .map_err(|e| BolError::Internal(format!("Merge task panicked: {e}")));
    close_scratch(scratch);
    let pdf = merged??;
    let merge_duration_ms = merge_start.elapsed().as_millis() as u64;

    // ── Step 5: Assemble output ──────────────────────────────────────────
    let stats = BatchStats {
        total_rows,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        merge_duration_ms,
        output_bytes: pdf.len(),
    };
    info!(
        "Combined {} BOLs into {} ({} bytes, {}ms total)",
        total_rows, config.output_file_name, stats.output_bytes, stats.total_duration_ms
    );
    if let Some(cb) = callback {
        cb.on_batch_complete(total_rows, pdf.len());
    }

    Ok(BatchOutput {
        pdf,
        file_name: config.output_file_name.clone(),
        media_type: PDF_MEDIA_TYPE.to_string(),
        rows: summaries,
        stats,
    })
}

/// Read both input files and generate the combined PDF.
///
/// # Example
/// ```rust,no_run
/// use pickup_bol::{generate, parse_ship_date, GenerationConfig, RunContext};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let context = RunContext::from_ship_date(parse_ship_date("06/01/2024")?);
/// let config = GenerationConfig::default();
/// let output = generate("pickup_plan.xlsx", "bol_template.docx", &context, &config).await?;
/// std::fs::write(&output.file_name, &output.pdf)?;
/// # Ok(())
/// # }
/// ```
pub async fn generate(
    rows_path: impl AsRef<Path>,
    template_path: impl AsRef<Path>,
    context: &RunContext,
    config: &GenerationConfig,
) -> Result<BatchOutput, BolError> {
    let (rows, template) = load_inputs(rows_path.as_ref(), template_path.as_ref(), config).await?;
    run_batch(&rows, &template, context, config).await
}

/// Generate from in-memory uploads.
pub async fn generate_from_bytes(
    rows_bytes: &[u8],
    template_bytes: &[u8],
    context: &RunContext,
    config: &GenerationConfig,
) -> Result<BatchOutput, BolError> {
    input::check_magic(Path::new("<pickup plan upload>"), rows_bytes)?;
    input::check_magic(Path::new("<template upload>"), template_bytes)?;
    let rows = xlsx::read_rows(rows_bytes, config.sheet_name.as_deref())?;
    let template = DocxTemplate::from_bytes(template_bytes)?;
    run_batch(&rows, &template, context, config).await
}

/// Generate and write the combined PDF to `output_path`.
///
/// Uses atomic write (temp file + rename) so a failed run never leaves a
/// truncated PDF behind.
pub async fn generate_to_file(
    rows_path: impl AsRef<Path>,
    template_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    context: &RunContext,
    config: &GenerationConfig,
) -> Result<BatchStats, BolError> {
    let output = generate(rows_path, template_path, context, config).await?;
    let path = output_path.as_ref();
    let write_err = |source: std::io::Error| BolError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &output.pdf)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    Ok(output.stats)
}

/// Synchronous wrapper around [`generate`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    rows_path: impl AsRef<Path>,
    template_path: impl AsRef<Path>,
    context: &RunContext,
    config: &GenerationConfig,
) -> Result<BatchOutput, BolError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BolError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate(rows_path, template_path, context, config))
}

/// Check a pickup plan and template without rendering anything.
pub async fn inspect(
    rows_path: impl AsRef<Path>,
    template_path: impl AsRef<Path>,
    config: &GenerationConfig,
) -> Result<InspectReport, BolError> {
    let (rows, template) = load_inputs(rows_path.as_ref(), template_path.as_ref(), config).await?;
    Ok(inspect_inputs(&rows, &template))
}

/// [`inspect`] for already-parsed inputs.
pub fn inspect_inputs(rows: &RowSet, template: &DocxTemplate) -> InspectReport {
    InspectReport {
        row_count: rows.len(),
        columns: rows.columns().to_vec(),
        missing_columns: rows.missing_columns(&REQUIRED_COLUMNS),
        markers: ALL_MARKERS
            .iter()
            .map(|m| MarkerPresence {
                marker: m.to_string(),
                found: template.body().contains(m),
            })
            .collect(),
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn load_inputs(
    rows_path: &Path,
    template_path: &Path,
    config: &GenerationConfig,
) -> Result<(RowSet, DocxTemplate), BolError> {
    let rows_bytes = input::read_package(rows_path).await?;
    let template_bytes = input::read_package(template_path).await?;
    let rows = xlsx::read_rows(&rows_bytes, config.sheet_name.as_deref())?;
    let template = DocxTemplate::from_bytes(&template_bytes)?;
    Ok((rows, template))
}

fn create_scratch_dir(parent: Option<&Path>) -> Result<TempDir, BolError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("pickup-bol-");
    let dir = match parent {
        Some(parent) => {
            std::fs::create_dir_all(parent).map_err(|e| {
                BolError::Internal(format!("work dir {}: {e}", parent.display()))
            })?;
            builder.tempdir_in(parent)
        }
        None => builder.tempdir(),
    };
    dir.map_err(|e| BolError::Internal(format!("Failed to create scratch directory: {e}")))
}

fn close_scratch(scratch: TempDir) {
    let path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!("Could not remove scratch directory {}: {}", path.display(), e);
    }
}

/// A per-row file failure, attributed to the row.
fn row_io_error(sequence: usize, path: &Path, e: impl std::fmt::Display) -> BolError {
    BolError::Conversion {
        sequence,
        source: ConversionError::Io {
            detail: format!("{}: {e}", path.display()),
        },
    }
}

/// Fill one row's document, render it, and read the PDF back.
async fn render_row(
    record: &RowRecord,
    template: &DocxTemplate,
    context: &RunContext,
    renderer: &dyn DocumentRenderer,
    scratch: &Path,
    timeout: Duration,
) -> Result<(RunArtifact, RowSummary), BolError> {
    let sequence = record.sequence();
    let conversion = |source: ConversionError| BolError::Conversion { sequence, source };

    let placeholders = PlaceholderSet::for_row(record, context);
    let mut document = template.instantiate();
    let rewritten = substitute::substitute(&mut document.body, &placeholders);
    debug!(
        "Row {}: {} placeholders, {} paragraphs rewritten",
        sequence,
        placeholders.len(),
        rewritten
    );

    let stem = record.file_stem();
    let docx_path = scratch.join(format!("{stem}.docx"));
    let pdf_path = scratch.join(format!("{stem}.pdf"));
    let docx = document
        .to_bytes()
        .map_err(|e| row_io_error(sequence, &docx_path, e))?;
    tokio::fs::write(&docx_path, &docx)
        .await
        .map_err(|e| row_io_error(sequence, &docx_path, e))?;

    let render_start = Instant::now();
    tokio::time::timeout(timeout, renderer.render(&docx_path, &pdf_path))
        .await
        .map_err(|_| {
            conversion(ConversionError::Timeout {
                secs: timeout.as_secs(),
            })
        })?
        .map_err(conversion)?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let pdf = match tokio::fs::read(&pdf_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(conversion(ConversionError::MissingOutput { path: pdf_path }));
        }
        Err(e) => return Err(row_io_error(sequence, &pdf_path, e)),
    };
    if !pdf.starts_with(b"%PDF") {
        return Err(conversion(ConversionError::InvalidOutput {
            detail: format!("{} does not start with %PDF", pdf_path.display()),
        }));
    }

    let summary = RowSummary {
        sequence,
        file_stem: stem.clone(),
        paragraphs_rewritten: rewritten,
        pdf_bytes: pdf.len(),
        render_duration_ms,
    };
    let artifact = RunArtifact {
        sequence,
        file_stem: stem,
        pdf,
    };
    Ok((artifact, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_write_failure_names_its_row() {
        let path = Path::new("/scratch/4_Acme_BOL.docx");
        let err = row_io_error(4, path, BolError::Internal("failed to write .docx".into()));

        assert_eq!(err.failed_row(), Some(4));
        assert!(
            matches!(
                &err,
                BolError::Conversion {
                    sequence: 4,
                    source: ConversionError::Io { detail }
                } if detail.contains("4_Acme_BOL.docx")
            ),
            "got: {err}"
        );
    }

    #[test]
    fn scratch_dir_is_created_under_work_dir_and_removed() {
        let parent = tempfile::tempdir().unwrap();
        let work = parent.path().join("nested");
        let scratch = create_scratch_dir(Some(&work)).unwrap();
        assert!(scratch.path().starts_with(&work));
        assert!(scratch
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("pickup-bol-"));

        let path = scratch.path().to_path_buf();
        close_scratch(scratch);
        assert!(!path.exists());
    }
}
