//! CLI binary for pickup-bol.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `GenerationConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pickup_bol::{
    generate, generate_to_file, inspect, parse_ship_date, BatchProgressCallback, GenerationConfig,
    ProgressCallback, RunContext,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: [&str; 11] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per BOL.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the row currently rendering; rows never overlap.
    row_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading pickup plan…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            row_started: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.row_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_rows: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} BOLs  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&TICKS);

        self.bar.set_length(total_rows as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Rendering");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Generating {total_rows} BOLs…"))
        ));
    }

    fn on_row_start(&self, sequence: usize, _total_rows: usize) {
        if let Ok(mut started) = self.row_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("row {sequence}"));
    }

    fn on_row_complete(&self, sequence: usize, total_rows: usize, pdf_bytes: usize) {
        self.bar.println(format!(
            "  {} BOL {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            sequence,
            total_rows,
            dim(&format!("{:>6} KB", pdf_bytes.div_ceil(1024))),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_row_error(&self, sequence: usize, total_rows: usize, error: &str) {
        let first_line = error.lines().next().unwrap_or(error);
        let msg: String = if first_line.chars().count() > 80 {
            format!("{}\u{2026}", first_line.chars().take(79).collect::<String>())
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} BOL {:>3}/{:<3}  {}  {}",
            red("✗"),
            sequence,
            total_rows,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.abandon();
    }

    fn on_merge_start(&self, artifacts: usize) {
        self.bar.set_prefix("Merging");
        self.bar.set_message(format!("{artifacts} PDFs"));
    }

    fn on_batch_complete(&self, total_rows: usize, output_bytes: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} BOLs combined  {}",
            green("✔"),
            bold(&total_rows.to_string()),
            dim(&format!("{} KB", output_bytes.div_ceil(1024))),
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate All_BOLs_Combined.pdf for today's pickups
  pickup-bol --rows pickup_plan.xlsx --template bol_template.docx

  # Explicit ship date and output path
  pickup-bol --rows plan.xlsx --template bol.docx --ship-date 06/01/2024 -o out/week23.pdf

  # Check inputs without rendering anything
  pickup-bol --rows plan.xlsx --template bol.docx --inspect-only

  # Per-row JSON summary on stdout
  pickup-bol --rows plan.xlsx --template bol.docx --json > summary.json

TEMPLATE MARKERS:
  SEA-[pickup address]+TEPHONE+NOTE   →  SEA - {Address} | TEL: {Phone} | Note: {Note}
  UNI-SEA-PICKUP-MM/DD/YYYY-SEQ       →  UNI-SEA-PICKUP-{MM/DD/YYYY}-{row}
  Carrier Name: GN GREENWHEELS INC.   →  Carrier Name: GN GREENWHEELS INC. - {DSP}
  Ship_date                           →  {MM/DD/YY}

REQUIRED COLUMNS:
  Address, Phone, Note, DSP (header row, exact names)

REQUIREMENTS:
  LibreOffice must be installed. `soffice` is looked up on PATH unless
  --office-program (or PICKUP_BOL_OFFICE_PROGRAM) points elsewhere.
"#;

/// Fill a Bill of Lading template once per pickup row and merge the PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "pickup-bol",
    version,
    about = "Generate one combined Bill of Lading PDF from a pickup plan",
    long_about = "Fill a Word Bill of Lading template once per row of a pickup-plan spreadsheet, \
render every copy to PDF with a headless LibreOffice, and merge them into one PDF in row order.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Pickup plan spreadsheet (.xlsx) with Address, Phone, Note and DSP columns.
    #[arg(long, env = "PICKUP_BOL_ROWS")]
    rows: PathBuf,

    /// Bill of Lading Word template (.docx).
    #[arg(long, env = "PICKUP_BOL_TEMPLATE")]
    template: PathBuf,

    /// Ship date as MM/DD/YYYY or YYYY-MM-DD. Default: today.
    #[arg(long, env = "PICKUP_BOL_SHIP_DATE")]
    ship_date: Option<String>,

    /// Combined PDF path. Default: ./All_BOLs_Combined.pdf
    #[arg(short, long, env = "PICKUP_BOL_OUTPUT")]
    output: Option<PathBuf>,

    /// LibreOffice executable.
    #[arg(long, env = "PICKUP_BOL_OFFICE_PROGRAM", default_value = "soffice")]
    office_program: PathBuf,

    /// Per-row conversion timeout in seconds.
    #[arg(long, env = "PICKUP_BOL_TIMEOUT", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Worksheet name. Default: the first sheet.
    #[arg(long, env = "PICKUP_BOL_SHEET")]
    sheet: Option<String>,

    /// Parent directory for intermediate files. Default: system temp dir.
    #[arg(long, env = "PICKUP_BOL_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Print a JSON summary on stdout.
    #[arg(long, env = "PICKUP_BOL_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PICKUP_BOL_NO_PROGRESS")]
    no_progress: bool,

    /// Check inputs (columns, markers, row count) without rendering.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PICKUP_BOL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PICKUP_BOL_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        let report = inspect(&cli.rows, &cli.template, &config)
            .await
            .context("Failed to inspect inputs")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialise report")?
            );
        } else {
            println!("Pickup plan:  {}", cli.rows.display());
            println!("Template:     {}", cli.template.display());
            println!("Rows:         {}", report.row_count);
            println!("Columns:      {}", report.columns.join(", "));
            if !report.missing_columns.is_empty() {
                println!("Missing:      {}", red(&report.missing_columns.join(", ")));
            }
            println!("Markers:");
            for m in &report.markers {
                let tick = if m.found { green("✓") } else { red("✗") };
                println!("  {tick} {}", m.marker);
            }
            println!(
                "Ready:        {}",
                if report.is_ready() { green("yes") } else { red("no") }
            );
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    let ship_date = match &cli.ship_date {
        Some(s) => parse_ship_date(s).context("Invalid --ship-date")?,
        None => chrono::Local::now().date_naive(),
    };
    let context = RunContext::from_ship_date(ship_date);
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output_file_name));

    // ── Run generation ───────────────────────────────────────────────────
    if cli.json {
        let output = generate(&cli.rows, &cli.template, &context, &config)
            .await
            .context("Generation failed")?;
        tokio::fs::write(&output_path, &output.pdf)
            .await
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
        return Ok(());
    }

    let stats = generate_to_file(&cli.rows, &cli.template, &output_path, &context, &config)
        .await
        .context("Generation failed")?;

    if !cli.quiet {
        eprintln!(
            "{}  {} BOLs  {}ms  →  {}",
            if show_progress { cyan("◆") } else { green("✔") },
            stats.total_rows,
            stats.total_duration_ms,
            bold(&output_path.display().to_string()),
        );
        eprintln!(
            "   {} render  /  {} merge",
            dim(&format!("{}ms", stats.render_duration_ms)),
            dim(&format!("{}ms", stats.merge_duration_ms)),
        );
    }

    Ok(())
}

/// Map CLI args to `GenerationConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .office_program(&cli.office_program)
        .conversion_timeout_secs(cli.timeout);

    if let Some(name) = cli.output.as_deref().and_then(reported_file_name) {
        builder = builder.output_file_name(name);
    }
    if let Some(ref sheet) = cli.sheet {
        builder = builder.sheet_name(sheet);
    }
    if let Some(ref dir) = cli.work_dir {
        builder = builder.work_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// File name reported for `--output`, when it is a `.pdf` name. Other paths
/// are still written to; the report keeps the default name.
fn reported_file_name(output: &Path) -> Option<String> {
    let name = output.file_name()?.to_string_lossy();
    name.to_ascii_lowercase()
        .ends_with(".pdf")
        .then(|| name.into_owned())
}
