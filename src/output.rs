//! Result types returned by the conversion entry points.

use crate::error::DiagramError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The produced PDF and everything learned while producing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Where the PDF was written.
    pub output_path: PathBuf,
    /// Size of the PDF in bytes. Always > 0.
    pub bytes: u64,
    /// Number of pages in the PDF.
    pub page_count: usize,
    /// Document title (first H1, else the input file stem).
    pub title: String,
    /// What the in-page diagram pass reported.
    pub diagrams: DiagramReport,
    /// Non-fatal diagram problems, in the order they were observed.
    pub warnings: Vec<DiagramError>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// `true` when every diagram rendered and nothing timed out.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Outcome of the batch diagram pass, as resolved by the page's completion
/// signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramReport {
    /// Diagram blocks found in the page.
    pub total: usize,
    /// Blocks replaced by an SVG.
    pub rendered: usize,
    /// Blocks left as text.
    pub failed: usize,
    /// Per-block failures.
    #[serde(default)]
    pub errors: Vec<DiagramBlockError>,
    /// Set when the library itself never became usable.
    #[serde(default, rename = "libraryError")]
    pub library_error: Option<String>,
}

impl DiagramReport {
    /// Report for a page whose signal never fired: nothing counted as
    /// rendered, every block left as text.
    pub fn abandoned(total: usize) -> Self {
        Self {
            total,
            rendered: 0,
            failed: total,
            errors: Vec::new(),
            library_error: None,
        }
    }

    /// Interpret the value the page's completion promise resolved with.
    ///
    /// A missing signal (`null`) or a value that is not report-shaped means
    /// the diagram script never ran properly; both become a library error
    /// covering `expected_total` blocks.
    pub fn from_signal(value: serde_json::Value, expected_total: usize) -> Self {
        if value.is_null() {
            return Self {
                library_error: Some("diagram script did not install its completion signal".into()),
                ..Self::abandoned(expected_total)
            };
        }
        match serde_json::from_value::<DiagramReport>(value) {
            Ok(report) => report,
            Err(e) => Self {
                library_error: Some(format!("malformed diagram report: {e}")),
                ..Self::abandoned(expected_total)
            },
        }
    }

    /// Translate the report into non-fatal diagram errors.
    pub fn to_warnings(&self) -> Vec<DiagramError> {
        let mut out = Vec::new();
        if let Some(ref detail) = self.library_error {
            out.push(DiagramError::LibraryUnavailable {
                detail: detail.clone(),
            });
        }
        out.extend(self.errors.iter().map(|e| DiagramError::BlockFailed {
            index: e.index,
            detail: e.message.clone(),
        }));
        out
    }
}

/// One diagram block that failed to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramBlockError {
    /// 1-indexed position among the document's diagram blocks.
    pub index: usize,
    pub message: String,
}

/// Wall-clock timings per stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub load_duration_ms: u64,
    pub render_duration_ms: u64,
    pub launch_duration_ms: u64,
    /// Time spent blocked on the diagram completion signal.
    pub diagram_wait_ms: u64,
    pub export_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// What [`crate::inspect`] learns about a document without rendering it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub path: PathBuf,
    pub title: String,
    pub headings: usize,
    pub diagram_blocks: usize,
    pub words: usize,
    pub bytes: usize,
}
