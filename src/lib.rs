//! # edgequake-md2pdf
//!
//! Convert Markdown documents, including Mermaid diagrams, to PDF with a
//! headless browser.
//!
//! ## Why a browser?
//!
//! Diagram libraries lay out their output against a live DOM: they measure
//! text, compute box sizes, and emit SVG sized to fit. A pure text transform
//! cannot do that, so this crate renders Markdown to an HTML page, lets a
//! headless Chromium run the diagram pass inside the page, and only then
//! prints the page to PDF. An explicit completion signal (a promise the
//! injected script resolves) separates the two, bounded by a timeout so a
//! stuck diagram never blocks the conversion.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown file
//!  │
//!  ├─ 1. Load    read the file (lossy UTF-8)
//!  ├─ 2. Render  pulldown-cmark → HTML page, stylesheet, heading ids
//!  ├─ 3. Inject  diagram script: load library → init → render blocks → signal
//!  ├─ 4. Launch  headless Chromium (chromiumoxide, --no-sandbox)
//!  └─ 5. Export  await signal (bounded) → printToPDF → atomic write
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_md2pdf::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::default();
//!     let output = convert("design.md", &config).await?;
//!     println!("{} ({} pages)", output.output_path.display(), output.page_count);
//!     for warning in &output.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-md2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Finding Chrome
//!
//! The browser is located in this order: the configured executable, the
//! `CHROME_PATH` environment variable, the platform's usual install
//! locations, then `PATH`. See the `chrome-locate` crate.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assets;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, DiagramLibrary, LaunchOptions, Length, LengthUnit,
    Margin, PageFormat,
};
pub use convert::{convert, convert_sync, convert_to_html, convert_with_engine, inspect};
pub use engine::{ChromeEngine, DiagramWait, PageSession, PdfOptions, RenderEngine};
pub use error::{DiagramError, Md2PdfError};
pub use output::{
    ConversionOutput, ConversionStats, DiagramBlockError, DiagramReport, DocumentSummary,
};
pub use pipeline::export::count_pdf_pages;
pub use pipeline::render::RenderedPage;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
