//! Conversion entry points.
//!
//! Every entry point runs the same stages in the same order:
//!
//! ```text
//! load ──▶ render ──▶ [launch] ──▶ export
//! ```
//!
//! Loading and rendering happen before a browser is started, so a missing
//! input or a bad diagram library path fails fast without spawning a
//! process. [`convert_with_engine`] skips the launch and reuses a browser the
//! caller already owns, which is how several documents share one engine.

use crate::config::ConversionConfig;
use crate::engine::{ChromeEngine, RenderEngine};
use crate::error::Md2PdfError;
use crate::output::{ConversionOutput, ConversionStats, DocumentSummary};
use crate::pipeline::export::{self, export_page};
use crate::pipeline::load::{load_document, SourceDocument};
use crate::pipeline::render::{self, render_document, RenderedPage};
use crate::progress::Stage;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Convert a markdown file to PDF.
///
/// Launches a headless browser for this one conversion and shuts it down
/// afterwards, whether or not the conversion succeeded.
///
/// # Arguments
/// * `input`  — Path to the markdown file
/// * `config` — Conversion configuration
///
/// # Returns
/// `Ok(ConversionOutput)` once the PDF exists on disk, even if some diagrams
/// did not render (check `output.warnings`).
///
/// # Errors
/// Returns `Err(Md2PdfError)` only for fatal errors:
/// - input missing or unreadable ([`Md2PdfError::NotFound`])
/// - browser not found, failed to start, or crashed ([`Md2PdfError::RenderEngine`])
/// - empty PDF or write failure ([`Md2PdfError::Export`])
pub async fn convert(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    let total_start = Instant::now();
    let input = input.as_ref();
    let mut stats = ConversionStats::default();

    let (doc, page) = load_and_render(input, config, &mut stats).await?;

    stage_start(config, Stage::Launch);
    let launch_start = Instant::now();
    let engine = ChromeEngine::launch(&config.launch).await?;
    stats.launch_duration_ms = launch_start.elapsed().as_millis() as u64;
    stage_complete(config, Stage::Launch, stats.launch_duration_ms);

    let result = export_stage(&doc, &page, config, &engine, stats, total_start).await;
    engine.shutdown().await;
    result
}

/// Convert a markdown file to PDF on an engine the caller owns.
///
/// The engine is left running. Each call opens its own page, so concurrent
/// calls on one engine do not interfere.
pub async fn convert_with_engine(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
    engine: &dyn RenderEngine,
) -> Result<ConversionOutput, Md2PdfError> {
    let total_start = Instant::now();
    let mut stats = ConversionStats::default();

    let (doc, page) = load_and_render(input.as_ref(), config, &mut stats).await?;
    export_stage(&doc, &page, config, engine, stats, total_start).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Md2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}

/// Write the rendered HTML page instead of a PDF.
///
/// No browser is involved; the page still carries the diagram script, so
/// opening the file in a browser shows the diagrams. `output` defaults to
/// the input path with an `.html` extension.
pub async fn convert_to_html(
    input: impl AsRef<Path>,
    output: Option<&Path>,
    config: &ConversionConfig,
) -> Result<PathBuf, Md2PdfError> {
    let input = input.as_ref();
    let mut stats = ConversionStats::default();
    let (_, page) = load_and_render(input, config, &mut stats).await?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| input.with_extension("html"));
    let bytes = export::write_atomic(&output, page.html.into_bytes()).await?;
    info!("Wrote {} ({} bytes)", output.display(), bytes);

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(&output, bytes);
    }
    Ok(output)
}

/// Describe a markdown file without rendering it.
///
/// Does not require a browser.
pub async fn inspect(input: impl AsRef<Path>) -> Result<DocumentSummary, Md2PdfError> {
    let doc = load_document(input).await?;
    Ok(render::summarize(&doc))
}

// ── Stages ───────────────────────────────────────────────────────────────

async fn load_and_render(
    input: &Path,
    config: &ConversionConfig,
    stats: &mut ConversionStats,
) -> Result<(SourceDocument, RenderedPage), Md2PdfError> {
    info!("Starting conversion: {}", input.display());
    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_start(input);
    }

    stage_start(config, Stage::Load);
    let start = Instant::now();
    let doc = load_document(input).await?;
    stats.load_duration_ms = start.elapsed().as_millis() as u64;
    stage_complete(config, Stage::Load, stats.load_duration_ms);

    stage_start(config, Stage::Render);
    let start = Instant::now();
    let page = render_document(&doc, config).await?;
    stats.render_duration_ms = start.elapsed().as_millis() as u64;
    stage_complete(config, Stage::Render, stats.render_duration_ms);

    info!(
        "Rendered '{}' with {} diagram block(s) in {}ms",
        page.title, page.diagram_blocks, stats.render_duration_ms
    );
    Ok((doc, page))
}

async fn export_stage(
    doc: &SourceDocument,
    page: &RenderedPage,
    config: &ConversionConfig,
    engine: &dyn RenderEngine,
    mut stats: ConversionStats,
    total_start: Instant,
) -> Result<ConversionOutput, Md2PdfError> {
    let output_path = config.resolve_output_path(&doc.path);

    stage_start(config, Stage::Export);
    let start = Instant::now();
    let outcome = export_page(page, &output_path, config, engine).await?;
    stats.export_duration_ms = start.elapsed().as_millis() as u64;
    stats.diagram_wait_ms = outcome.diagram_wait_ms;
    stage_complete(config, Stage::Export, stats.export_duration_ms);

    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Conversion complete: {} → {} ({} pages, {} warning(s), {}ms)",
        doc.path.display(),
        outcome.output_path.display(),
        outcome.page_count,
        outcome.warnings.len(),
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_conversion_complete(&outcome.output_path, outcome.bytes);
    }

    Ok(ConversionOutput {
        output_path: outcome.output_path,
        bytes: outcome.bytes,
        page_count: outcome.page_count,
        title: page.title.clone(),
        diagrams: outcome.diagrams,
        warnings: outcome.warnings,
        stats,
    })
}

fn stage_start(config: &ConversionConfig, stage: Stage) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(stage);
    }
}

fn stage_complete(config: &ConversionConfig, stage: Stage, elapsed_ms: u64) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_complete(stage, elapsed_ms);
    }
}
