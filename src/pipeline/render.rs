//! Document rendering: turn a filled `.docx` into a PDF.
//!
//! The pipeline only sees the [`DocumentRenderer`] capability. The default
//! backend, [`OfficeRenderer`], shells out to a headless LibreOffice
//! (`soffice --convert-to pdf`) through `tokio::process`, so the runtime's
//! worker threads are never blocked while the office suite works.
//!
//! ## Profile isolation
//!
//! LibreOffice refuses to run two instances against one user profile and
//! will silently hand the job to an already-running desktop instance. Each
//! run therefore points `-env:UserInstallation` at a profile directory
//! inside its own scratch space.

use crate::error::ConversionError;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::debug;

/// Boxed future returned by [`DocumentRenderer::render`].
pub type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ConversionError>> + Send + 'a>>;

/// Converts one rich-text document file into a PDF file.
pub trait DocumentRenderer: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Render `source` (a `.docx`) to `destination` (a `.pdf`).
    ///
    /// On success `destination` exists and holds a PDF.
    fn render<'a>(&'a self, source: &'a Path, destination: &'a Path) -> RenderFuture<'a>;
}

/// Keep at most this many bytes of converter stderr in errors.
const STDERR_LIMIT: usize = 2048;

/// Headless LibreOffice backend.
#[derive(Debug, Clone)]
pub struct OfficeRenderer {
    program: PathBuf,
    timeout: Duration,
    profile_dir: Option<PathBuf>,
}

impl OfficeRenderer {
    pub fn new(program: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            timeout: Duration::from_secs(timeout_secs.max(1)),
            profile_dir: None,
        }
    }

    /// Use a private LibreOffice user profile at `dir`.
    pub fn with_profile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile_dir = Some(dir.into());
        self
    }

    fn program_name(&self) -> String {
        self.program.display().to_string()
    }

    async fn convert(&self, source: &Path, destination: &Path) -> Result<(), ConversionError> {
        let outdir = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut cmd = Command::new(&self.program);
        cmd.arg("--headless").arg("--norestore").arg("--nologo");
        if let Some(profile) = &self.profile_dir {
            cmd.arg(format!("-env:UserInstallation={}", file_url(profile)));
        }
        cmd.arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(outdir)
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConversionError::ProgramNotFound {
                program: self.program_name(),
            },
            _ => ConversionError::LaunchFailed {
                program: self.program_name(),
                detail: e.to_string(),
            },
        })?;

        // Dropping the child on timeout kills it.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ConversionError::Timeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| ConversionError::Io {
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ConversionError::NonZeroExit {
                code: output.status.code(),
                stderr: truncate(String::from_utf8_lossy(&output.stderr).trim()),
            });
        }

        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let produced = outdir.join(format!("{stem}.pdf"));
        if tokio::fs::metadata(&produced).await.is_err() {
            return Err(ConversionError::MissingOutput { path: produced });
        }
        if produced != destination {
            tokio::fs::rename(&produced, destination)
                .await
                .map_err(|e| ConversionError::Io {
                    detail: format!("moving {}: {e}", produced.display()),
                })?;
        }

        check_pdf_magic(destination).await?;
        debug!(
            "{} → {}",
            source.display(),
            destination.display()
        );
        Ok(())
    }
}

impl DocumentRenderer for OfficeRenderer {
    fn name(&self) -> &str {
        "office"
    }

    fn render<'a>(&'a self, source: &'a Path, destination: &'a Path) -> RenderFuture<'a> {
        Box::pin(self.convert(source, destination))
    }
}

/// `file://` URL for an absolute local path.
fn file_url(path: &Path) -> String {
    let s = path.display().to_string().replace('\\', "/");
    if s.starts_with('/') {
        format!("file://{s}")
    } else {
        format!("file:///{s}")
    }
}

fn truncate(s: &str) -> String {
    if s.len() <= STDERR_LIMIT {
        return s.to_string();
    }
    let mut end = STDERR_LIMIT;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

async fn check_pdf_magic(path: &Path) -> Result<(), ConversionError> {
    let io_err = |e: std::io::Error| ConversionError::Io {
        detail: format!("{}: {e}", path.display()),
    };
    let mut file = tokio::fs::File::open(path).await.map_err(io_err)?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic).await {
        Ok(_) if &magic == b"%PDF" => Ok(()),
        Ok(_) => Err(ConversionError::InvalidOutput {
            detail: format!("starts with {magic:?}"),
        }),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(ConversionError::InvalidOutput {
            detail: "file is shorter than a PDF header".into(),
        }),
        Err(e) => Err(io_err(e)),
    }
}
