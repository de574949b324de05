//! Exporter: load the rendered page into an engine, wait for diagrams,
//! paginate, and write the PDF.
//!
//! Ordering is the one hard rule here: pagination never starts before the
//! diagram completion signal has resolved or `diagram_timeout` has elapsed.
//! A timeout is not fatal; the page is printed as it stands, with any
//! diagram that did not finish still shown as text. An engine that gives up
//! on the wait before `diagram_timeout` ([`DiagramWait::Expired`]) is
//! treated the same way.
//!
//! The PDF is written all-or-nothing: bytes go to a temporary file in the
//! destination directory which is then renamed over `output_path`. A failed
//! export leaves no partial file behind.

use crate::config::ConversionConfig;
use crate::engine::{DiagramWait, PageSession, PdfOptions, RenderEngine};
use crate::error::{DiagramError, Md2PdfError};
use crate::output::DiagramReport;
use crate::pipeline::render::RenderedPage;
use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// What the exporter produced.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub output_path: PathBuf,
    pub bytes: u64,
    pub page_count: usize,
    pub diagrams: DiagramReport,
    /// Non-fatal diagram problems, timeout first if there was one.
    pub warnings: Vec<DiagramError>,
    /// Time spent blocked on the completion signal.
    pub diagram_wait_ms: u64,
}

/// Export `page` to `output_path` using `engine`.
///
/// The page session is always closed, whether or not export succeeds.
///
/// # Errors
/// - [`Md2PdfError::RenderEngine`]: the page could not be loaded or printed.
/// - [`Md2PdfError::Export`]: printing produced no bytes, or the file could
///   not be written.
pub async fn export_page(
    page: &RenderedPage,
    output_path: &Path,
    config: &ConversionConfig,
    engine: &dyn RenderEngine,
) -> Result<ExportOutcome, Md2PdfError> {
    let options = PdfOptions::from_config(config);

    let mut session = engine.open_page(page).await?;
    let printed = print_when_settled(session.as_mut(), page, config, &options).await;
    session.close().await;
    let printed = printed?;

    if printed.pdf.is_empty() {
        return Err(Md2PdfError::Export {
            path: output_path.to_path_buf(),
            detail: "pagination produced an empty document".into(),
        });
    }

    let page_count = count_pdf_pages(&printed.pdf);
    let bytes = write_atomic(output_path, printed.pdf).await?;
    info!(
        "Wrote {} ({} bytes, {} page(s))",
        output_path.display(),
        bytes,
        page_count
    );

    Ok(ExportOutcome {
        output_path: output_path.to_path_buf(),
        bytes,
        page_count,
        diagrams: printed.diagrams,
        warnings: printed.warnings,
        diagram_wait_ms: printed.diagram_wait_ms,
    })
}

struct Printed {
    pdf: Vec<u8>,
    diagrams: DiagramReport,
    warnings: Vec<DiagramError>,
    diagram_wait_ms: u64,
}

async fn print_when_settled(
    session: &mut dyn PageSession,
    page: &RenderedPage,
    config: &ConversionConfig,
    options: &PdfOptions,
) -> Result<Printed, Md2PdfError> {
    let mut diagrams = DiagramReport::default();
    let mut warnings = Vec::new();
    let mut diagram_wait_ms = 0;

    if page.has_diagrams() {
        let wait_start = Instant::now();
        let waited = tokio::time::timeout(config.diagram_timeout, session.wait_for_diagrams()).await;
        diagram_wait_ms = wait_start.elapsed().as_millis() as u64;

        let expired_after = match waited {
            Ok(Ok(DiagramWait::Settled(report))) => {
                diagrams = report;
                debug!(
                    "Diagram pass settled in {}ms: {}/{} rendered",
                    diagram_wait_ms, diagrams.rendered, diagrams.total
                );
                None
            }
            Ok(Ok(DiagramWait::Expired)) => Some(diagram_wait_ms),
            Ok(Err(e)) => return Err(e),
            Err(_) => Some(config.diagram_timeout.as_millis() as u64),
        };

        let timed_out = expired_after.is_some();
        if let Some(waited_ms) = expired_after {
            let timeout = DiagramError::DiagramRenderTimeout { waited_ms };
            warn!("{timeout}");
            warnings.push(timeout);
            diagrams = DiagramReport::abandoned(page.diagram_blocks);
        }

        for w in diagrams.to_warnings() {
            warn!("{w}");
            warnings.push(w);
        }
        if let Some(ref cb) = config.progress_callback {
            cb.on_diagrams_settled(&diagrams, timed_out);
        }
    }

    let pdf = session.print_pdf(options).await?;
    debug!("printToPDF returned {} bytes", pdf.len());

    Ok(Printed {
        pdf,
        diagrams,
        warnings,
        diagram_wait_ms,
    })
}

/// Write `bytes` to `path` via a sibling temporary file and a rename.
/// Returns the number of bytes written.
pub(crate) async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<u64, Md2PdfError> {
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&target, &bytes))
        .await
        .map_err(|e| Md2PdfError::Internal(format!("write task failed: {e}")))?
}

fn write_atomic_blocking(path: &Path, bytes: &[u8]) -> Result<u64, Md2PdfError> {
    let export_err = |detail: String| Md2PdfError::Export {
        path: path.to_path_buf(),
        detail,
    };

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| export_err(format!("create {}: {e}", dir.display())))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| export_err(format!("create temporary file: {e}")))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| export_err(e.to_string()))?;
    tmp.persist(path).map_err(|e| export_err(e.error.to_string()))?;

    Ok(bytes.len() as u64)
}

// ── Page counting ────────────────────────────────────────────────────────

static RE_PAGE_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u)/Type\s*/Page\b").unwrap());

// `/Count` may come before or after `/Type /Pages` in the dictionary.
static RE_PAGES_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?-u)/Type\s*/Pages\b[^>]*?/Count\s+(\d+)|/Count\s+(\d+)[^>]*?/Type\s*/Pages\b",
    )
    .unwrap()
});

/// Number of pages in a PDF.
///
/// Counts `/Type /Page` dictionaries (not the `/Pages` tree nodes). When
/// page objects are hidden in compressed object streams, falls back to the
/// largest `/Count` of a `/Pages` node.
pub fn count_pdf_pages(pdf: &[u8]) -> usize {
    let objects = RE_PAGE_OBJECT.find_iter(pdf).count();
    if objects > 0 {
        return objects;
    }
    RE_PAGES_COUNT
        .captures_iter(pdf)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .filter_map(|m| std::str::from_utf8(m.as_bytes()).ok()?.parse::<usize>().ok())
        .max()
        .unwrap_or(0)
}
