//! Batch pipeline integration tests.
//!
//! Inputs are built in memory with `zip`; rendering is done by a fake
//! renderer that reads the filled `.docx` back and writes a one-page PDF
//! whose page width encodes the row sequence (600 + sequence points), so
//! page order in the merged output can be checked without text extraction.

mod common;

use common::{context, one_page_pdf, page_widths, template, three_rows, xlsx, HEADER};
use pickup_bol::{
    generate_from_bytes, generate_to_file, inspect, BatchProgressCallback, BolError,
    ConversionError, DocumentRenderer, DocxTemplate, GenerationConfig, LopdfMerger, MergeError,
    PdfMerger, RenderFuture, RunArtifact,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ── Fake collaborators ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct RenderedRow {
    stem: String,
    dir: PathBuf,
    paragraphs: Vec<String>,
}

#[derive(Default)]
struct FakeRenderer {
    fail_on: Option<usize>,
    hang_on: Option<usize>,
    calls: AtomicUsize,
    rendered: Mutex<Vec<RenderedRow>>,
}

impl FakeRenderer {
    fn failing_on(sequence: usize) -> Self {
        Self {
            fail_on: Some(sequence),
            ..Default::default()
        }
    }

    fn hanging_on(sequence: usize) -> Self {
        Self {
            hang_on: Some(sequence),
            ..Default::default()
        }
    }

    fn rendered(&self) -> Vec<RenderedRow> {
        self.rendered.lock().unwrap().clone()
    }
}

impl DocumentRenderer for FakeRenderer {
    fn name(&self) -> &str {
        "fake"
    }

    fn render<'a>(&'a self, source: &'a Path, destination: &'a Path) -> RenderFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let stem = source.file_stem().unwrap().to_string_lossy().into_owned();
            let sequence: usize = stem.split('_').next().unwrap().parse().unwrap();
            if self.fail_on == Some(sequence) {
                return Err(ConversionError::NonZeroExit {
                    code: Some(1),
                    stderr: "Error: source file could not be loaded".into(),
                });
            }
            if self.hang_on == Some(sequence) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }

            let bytes = tokio::fs::read(source).await.unwrap();
            let filled = DocxTemplate::from_bytes(&bytes).unwrap();
            self.rendered.lock().unwrap().push(RenderedRow {
                stem,
                dir: source.parent().unwrap().to_path_buf(),
                paragraphs: filled.body().paragraph_texts(),
            });

            tokio::fs::write(destination, one_page_pdf(600 + sequence as i64))
                .await
                .unwrap();
            Ok(())
        })
    }
}

#[derive(Default)]
struct CountingMerger {
    calls: AtomicUsize,
    sequences: Mutex<Vec<usize>>,
}

impl PdfMerger for CountingMerger {
    fn merge(&self, artifacts: &[RunArtifact]) -> Result<Vec<u8>, MergeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.sequences.lock().unwrap() = artifacts.iter().map(|a| a.sequence).collect();
        LopdfMerger.merge(artifacts)
    }
}

#[derive(Default)]
struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl BatchProgressCallback for EventLog {
    fn on_batch_start(&self, total_rows: usize) {
        self.push(format!("batch:{total_rows}"));
    }
    fn on_row_start(&self, sequence: usize, _total_rows: usize) {
        self.push(format!("start:{sequence}"));
    }
    fn on_row_complete(&self, sequence: usize, _total_rows: usize, _pdf_bytes: usize) {
        self.push(format!("done:{sequence}"));
    }
    fn on_row_error(&self, sequence: usize, _total_rows: usize, _error: &str) {
        self.push(format!("error:{sequence}"));
    }
    fn on_merge_start(&self, artifacts: usize) {
        self.push(format!("merge:{artifacts}"));
    }
    fn on_batch_complete(&self, total_rows: usize, _output_bytes: usize) {
        self.push(format!("complete:{total_rows}"));
    }
}

struct Harness {
    renderer: Arc<FakeRenderer>,
    merger: Arc<CountingMerger>,
    events: Arc<EventLog>,
    work_dir: tempfile::TempDir,
    config: GenerationConfig,
}

impl Harness {
    fn new(renderer: FakeRenderer) -> Self {
        Self::with_timeout(renderer, 120)
    }

    fn with_timeout(renderer: FakeRenderer, timeout_secs: u64) -> Self {
        let renderer = Arc::new(renderer);
        let merger = Arc::new(CountingMerger::default());
        let events = Arc::new(EventLog::default());
        let work_dir = tempfile::tempdir().unwrap();
        let config = GenerationConfig::builder()
            .renderer(renderer.clone())
            .merger(merger.clone())
            .progress_callback(events.clone())
            .work_dir(work_dir.path())
            .conversion_timeout_secs(timeout_secs)
            .build()
            .unwrap();
        Self {
            renderer,
            merger,
            events,
            work_dir,
            config,
        }
    }

    fn work_dir_is_empty(&self) -> bool {
        std::fs::read_dir(self.work_dir.path()).unwrap().next().is_none()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn one_page_per_row_in_sequence_order() {
    let h = Harness::new(FakeRenderer::default());
    let output = generate_from_bytes(&three_rows(), &template(), &context(), &h.config)
        .await
        .unwrap();

    assert_eq!(page_widths(&output.pdf), vec![601, 602, 603]);
    assert_eq!(output.file_name, "All_BOLs_Combined.pdf");
    assert_eq!(output.media_type, "application/pdf");
    assert_eq!(output.stats.total_rows, 3);
    assert_eq!(output.stats.output_bytes, output.pdf.len());

    let stems: Vec<&str> = output.rows.iter().map(|r| r.file_stem.as_str()).collect();
    assert_eq!(
        stems,
        vec!["1_Acme_Logistics_BOL", "2_Beta_BOL", "3_Gamma_East_BOL"]
    );
    assert!(output.rows.iter().all(|r| r.paragraphs_rewritten == 4));
    assert_eq!(*h.merger.sequences.lock().unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn row_values_replace_every_marker() {
    let h = Harness::new(FakeRenderer::default());
    generate_from_bytes(&three_rows(), &template(), &context(), &h.config)
        .await
        .unwrap();

    let rendered = h.renderer.rendered();
    assert_eq!(rendered.len(), 3);
    assert_eq!(
        rendered[0].paragraphs,
        vec![
            "Ship date: 06/01/24",
            "BOL#: UNI-SEA-PICKUP-06/01/2024-1",
            "SEA - 123 Main St | TEL: 555-1234 | Note: Leave at door",
            "Carrier Name: GN GREENWHEELS INC. - Acme_Logistics",
            "Static footer",
        ]
    );

    // Each row starts from the untouched template.
    assert_eq!(rendered[1].paragraphs[1], "BOL#: UNI-SEA-PICKUP-06/01/2024-2");
    assert_eq!(
        rendered[2].paragraphs[2],
        "SEA - 1 Pier Rd | TEL: 555-9999 | Note: "
    );
    assert_eq!(
        rendered[2].paragraphs[3],
        "Carrier Name: GN GREENWHEELS INC. - Gamma_East"
    );
}

#[tokio::test]
async fn missing_columns_fail_before_any_work() {
    let h = Harness::new(FakeRenderer::default());
    let rows = xlsx(&["Address", "Note"], &[&["1 A St", "x"]]);

    let err = generate_from_bytes(&rows, &template(), &context(), &h.config)
        .await
        .unwrap_err();

    match &err {
        BolError::MissingColumns { missing } => assert_eq!(missing, &["Phone", "DSP"]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("Phone, DSP"));
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.merger.calls.load(Ordering::SeqCst), 0);
    assert!(h.events.events().is_empty());
    assert!(h.work_dir_is_empty());
}

#[tokio::test]
async fn header_only_sheet_has_no_rows() {
    let h = Harness::new(FakeRenderer::default());
    let err = generate_from_bytes(&xlsx(&HEADER, &[]), &template(), &context(), &h.config)
        .await
        .unwrap_err();
    assert!(matches!(err, BolError::NoRows), "got: {err}");
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn conversion_failure_aborts_and_names_the_row() {
    let h = Harness::new(FakeRenderer::failing_on(2));
    let err = generate_from_bytes(&three_rows(), &template(), &context(), &h.config)
        .await
        .unwrap_err();

    assert_eq!(err.failed_row(), Some(2));
    assert!(
        matches!(
            err,
            BolError::Conversion {
                sequence: 2,
                source: ConversionError::NonZeroExit { .. }
            }
        ),
        "got: {err}"
    );
    assert!(err.to_string().contains("row 2"));

    // Row 3 is never attempted and nothing is merged.
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.merger.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.events.events(),
        vec!["batch:3", "start:1", "done:1", "start:2", "error:2"]
    );
    assert!(h.work_dir_is_empty(), "scratch files must not survive a failed run");
}

#[tokio::test]
async fn hanging_renderer_times_out_and_names_the_row() {
    let h = Harness::with_timeout(FakeRenderer::hanging_on(2), 1);
    let started = Instant::now();
    let err = generate_from_bytes(&three_rows(), &template(), &context(), &h.config)
        .await
        .unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(30));
    assert!(
        matches!(
            err,
            BolError::Conversion {
                sequence: 2,
                source: ConversionError::Timeout { secs: 1 }
            }
        ),
        "got: {err}"
    );
    assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.merger.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.events.events(),
        vec!["batch:3", "start:1", "done:1", "start:2", "error:2"]
    );
    assert!(h.work_dir_is_empty(), "scratch files must not survive a timeout");
}

#[tokio::test]
async fn scratch_directory_is_private_and_removed() {
    let h = Harness::new(FakeRenderer::default());
    generate_from_bytes(&three_rows(), &template(), &context(), &h.config)
        .await
        .unwrap();

    let rendered = h.renderer.rendered();
    let dir = &rendered[0].dir;
    assert!(dir.starts_with(h.work_dir.path()));
    assert!(rendered.iter().all(|r| &r.dir == dir), "one scratch dir per run");
    assert_eq!(rendered[0].stem, "1_Acme_Logistics_BOL");
    assert!(!dir.exists());
    assert!(h.work_dir_is_empty());
}

#[tokio::test]
async fn progress_events_arrive_in_row_order() {
    let h = Harness::new(FakeRenderer::default());
    generate_from_bytes(&three_rows(), &template(), &context(), &h.config)
        .await
        .unwrap();

    assert_eq!(
        h.events.events(),
        vec![
            "batch:3", "start:1", "done:1", "start:2", "done:2", "start:3", "done:3", "merge:3",
            "complete:3",
        ]
    );
}

#[tokio::test]
async fn merge_failure_is_reported_and_scratch_removed() {
    struct GarbageMerger;
    impl PdfMerger for GarbageMerger {
        fn merge(&self, _artifacts: &[RunArtifact]) -> Result<Vec<u8>, MergeError> {
            Err(MergeError::Unreadable {
                sequence: 1,
                detail: "broken xref".into(),
            })
        }
    }

    let work_dir = tempfile::tempdir().unwrap();
    let config = GenerationConfig::builder()
        .renderer(Arc::new(FakeRenderer::default()))
        .merger(Arc::new(GarbageMerger))
        .work_dir(work_dir.path())
        .build()
        .unwrap();

    let err = generate_from_bytes(&three_rows(), &template(), &context(), &config)
        .await
        .unwrap_err();
    assert!(matches!(err, BolError::Merge(MergeError::Unreadable { .. })), "got: {err}");
    assert!(std::fs::read_dir(work_dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn non_package_upload_is_rejected() {
    let h = Harness::new(FakeRenderer::default());
    let err = generate_from_bytes(b"Address,Phone,Note,DSP\n", &template(), &context(), &h.config)
        .await
        .unwrap_err();
    assert!(matches!(err, BolError::NotAnOfficePackage { .. }), "got: {err}");
}

#[tokio::test]
async fn generate_to_file_writes_the_combined_pdf() {
    let h = Harness::new(FakeRenderer::default());
    let dir = tempfile::tempdir().unwrap();
    let rows_path = dir.path().join("pickup_plan.xlsx");
    let template_path = dir.path().join("bol_template.docx");
    std::fs::write(&rows_path, three_rows()).unwrap();
    std::fs::write(&template_path, template()).unwrap();
    let out_path = dir.path().join("out").join("All_BOLs_Combined.pdf");

    let stats = generate_to_file(&rows_path, &template_path, &out_path, &context(), &h.config)
        .await
        .unwrap();

    let pdf = std::fs::read(&out_path).unwrap();
    assert_eq!(stats.output_bytes, pdf.len());
    assert_eq!(page_widths(&pdf), vec![601, 602, 603]);
    assert!(!out_path.with_extension("pdf.tmp").exists());
}

#[tokio::test]
async fn inspect_reports_columns_and_markers() {
    let dir = tempfile::tempdir().unwrap();
    let rows_path = dir.path().join("plan.xlsx");
    let template_path = dir.path().join("bol.docx");
    std::fs::write(&rows_path, xlsx(&["Address", "DSP"], &[&["1 A St", "X"]])).unwrap();
    std::fs::write(&template_path, template()).unwrap();

    let report = inspect(&rows_path, &template_path, &GenerationConfig::default())
        .await
        .unwrap();

    assert_eq!(report.row_count, 1);
    assert_eq!(report.columns, vec!["Address", "DSP"]);
    assert_eq!(report.missing_columns, vec!["Phone", "Note"]);
    assert!(report.markers.iter().all(|m| m.found));
    assert!(!report.is_ready());
}

#[tokio::test]
async fn missing_input_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = inspect(
        dir.path().join("missing.xlsx"),
        dir.path().join("missing.docx"),
        &GenerationConfig::default(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BolError::FileNotFound { .. }), "got: {err}");
}

#[tokio::test]
async fn missing_office_program_fails_on_the_first_row() {
    let work_dir = tempfile::tempdir().unwrap();
    let config = GenerationConfig::builder()
        .office_program("/nonexistent/bin/soffice")
        .work_dir(work_dir.path())
        .build()
        .unwrap();

    let err = generate_from_bytes(&three_rows(), &template(), &context(), &config)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            BolError::Conversion {
                sequence: 1,
                source: ConversionError::ProgramNotFound { .. }
            }
        ),
        "got: {err}"
    );
    assert!(std::fs::read_dir(work_dir.path()).unwrap().next().is_none());
}
