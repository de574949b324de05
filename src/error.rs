//! Error types for the edgequake-md2pdf library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Md2PdfError`] — **Fatal**: the conversion cannot produce a PDF at all
//!   (missing input, browser did not start, PDF could not be written).
//!   Returned as `Err(Md2PdfError)` from the top-level `convert*` functions,
//!   and no output file exists afterwards.
//!
//! * [`DiagramError`] — **Non-fatal**: diagram rendering degraded (a block
//!   failed to parse, the library never loaded, or the completion signal
//!   timed out). The PDF is still produced with the affected blocks shown as
//!   text; the errors are stored in
//!   [`crate::output::ConversionOutput::warnings`].
//!
//! Callers can tell the two apart by type instead of by inspecting messages.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-md2pdf library.
///
/// Diagram-level degradation uses [`DiagramError`] and is reported in the
/// conversion output rather than propagated here.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input path does not resolve to a readable file.
    #[error("Markdown file not found: '{path}' ({detail})\nCheck the path exists and is readable.")]
    NotFound { path: PathBuf, detail: String },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// The rendering engine could not be located, failed to launch, crashed,
    /// or could not load the page.
    #[error(
        "Rendering engine error: {0}\n\
If Chrome cannot start inside a container, keep the default --no-sandbox launch flag."
    )]
    RenderEngine(String),

    // ── Export errors ─────────────────────────────────────────────────────
    /// Pagination produced no document, or the PDF could not be written.
    #[error("Failed to export PDF to '{path}': {detail}")]
    Export { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Md2PdfError {
    /// Every `Md2PdfError` aborts the conversion; recoverable conditions are
    /// [`DiagramError`]s.
    pub fn is_fatal(&self) -> bool {
        true
    }
}

impl From<chrome_locate::ChromeLocateError> for Md2PdfError {
    fn from(e: chrome_locate::ChromeLocateError) -> Self {
        Md2PdfError::RenderEngine(e.to_string())
    }
}

/// A non-fatal diagram rendering problem.
///
/// The conversion continues and the affected diagram blocks stay as
/// preformatted text in the PDF.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum DiagramError {
    /// The completion signal did not arrive within the configured bound.
    #[error("Diagram rendering did not finish within {waited_ms}ms; unrendered diagrams are shown as text")]
    DiagramRenderTimeout { waited_ms: u64 },

    /// The diagram library could not be loaded or initialised in the page.
    #[error("Diagram library unavailable: {detail}")]
    LibraryUnavailable { detail: String },

    /// A single diagram block failed to render.
    #[error("Diagram {index}: {detail}")]
    BlockFailed { index: usize, detail: String },
}

impl DiagramError {
    /// Diagram errors never abort a conversion.
    pub fn is_fatal(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let e = Md2PdfError::NotFound {
            path: PathBuf::from("/tmp/missing.md"),
            detail: "no such file".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("/tmp/missing.md"), "got: {msg}");
        assert!(msg.contains("no such file"), "got: {msg}");
    }

    #[test]
    fn render_engine_display_mentions_sandbox() {
        let e = Md2PdfError::RenderEngine("failed to launch".into());
        let msg = e.to_string();
        assert!(msg.contains("failed to launch"));
        assert!(msg.contains("--no-sandbox"));
    }

    #[test]
    fn export_display() {
        let e = Md2PdfError::Export {
            path: PathBuf::from("out.pdf"),
            detail: "disk full".into(),
        };
        assert!(e.to_string().contains("out.pdf"));
        assert!(e.to_string().contains("disk full"));
    }

    #[test]
    fn timeout_display() {
        let e = DiagramError::DiagramRenderTimeout { waited_ms: 30000 };
        assert!(e.to_string().contains("30000ms"));
    }

    #[test]
    fn block_failed_display() {
        let e = DiagramError::BlockFailed {
            index: 2,
            detail: "Parse error on line 1".into(),
        };
        assert!(e.to_string().contains("Diagram 2"));
        assert!(e.to_string().contains("Parse error"));
    }

    #[test]
    fn fatality_is_distinguishable_by_type() {
        assert!(Md2PdfError::Internal("x".into()).is_fatal());
        assert!(!DiagramError::DiagramRenderTimeout { waited_ms: 1 }.is_fatal());
    }

    #[test]
    fn locate_error_maps_to_render_engine() {
        let e: Md2PdfError = chrome_locate::ChromeLocateError::NotFound { searched: 3 }.into();
        assert!(matches!(e, Md2PdfError::RenderEngine(_)));
    }

    #[test]
    fn diagram_error_serialises() {
        let e = DiagramError::LibraryUnavailable {
            detail: "script load failed".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("LibraryUnavailable"));
        let back: DiagramError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
