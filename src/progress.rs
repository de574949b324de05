//! Progress-callback trait for stage-by-stage conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages.
//!
//! The trait is `Send + Sync` so one callback can observe several
//! conversions running on different tasks.
//!
//! # Example
//!
//! ```rust
//! use edgequake_md2pdf::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ConversionProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::DiagramReport;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading the markdown file.
    Load,
    /// Markdown → HTML page.
    Render,
    /// Starting the browser.
    Launch,
    /// Loading the page, waiting for diagrams, printing.
    Export,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Load => "Loading",
            Stage::Render => "Rendering",
            Stage::Launch => "Launching browser",
            Stage::Export => "Exporting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Called by the conversion pipeline as it progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once, before the input is read.
    fn on_conversion_start(&self, input: &Path) {
        let _ = input;
    }

    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called once the diagram pass has resolved or been abandoned.
    /// Not called for documents without diagrams.
    ///
    /// # Arguments
    /// * `report`    — counts resolved by the page (or an abandoned report)
    /// * `timed_out` — the completion signal did not arrive in time
    fn on_diagrams_settled(&self, report: &DiagramReport, timed_out: bool) {
        let _ = (report, timed_out);
    }

    /// Called once after the PDF has been written.
    fn on_conversion_complete(&self, output: &Path, bytes: u64) {
        let _ = (output, bytes);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
