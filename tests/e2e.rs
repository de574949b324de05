//! End-to-end integration tests for edgequake-md2pdf.
//!
//! These tests launch a real headless Chromium and, for the diagram tests,
//! load Mermaid from the CDN. They are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly
//! requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! To use a specific browser:
//!   E2E_ENABLED=1 CHROME_PATH=/usr/bin/chromium cargo test --test e2e

use edgequake_md2pdf::{
    convert, convert_with_engine, count_pdf_pages, ChromeEngine, ConversionConfig, DiagramError,
    DiagramLibrary, LaunchOptions, Md2PdfError, PageFormat,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test unless E2E_ENABLED is set *and* a browser can be found.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
        if let Err(e) = chrome_locate::locate_chrome() {
            println!("SKIP — {e}");
            return;
        }
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("edgequake_md2pdf=debug")),
            )
            .with_test_writer()
            .try_init();
    }};
}

fn write_doc(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn assert_pdf(path: &Path) -> Vec<u8> {
    let bytes = std::fs::read(path).unwrap();
    assert!(bytes.starts_with(b"%PDF-"), "not a PDF: {}", path.display());
    assert!(count_pdf_pages(&bytes) >= 1);
    bytes
}

const DESIGN_DOC: &str = r#"# System Design

A short document with one diagram.

## Flow

```mermaid
graph TD
    Client --> Server
    Server --> Database
```

## Notes

| Component | Role |
|-----------|------|
| Client    | UI   |
| Server    | API  |
"#;

// ── Conversions ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn plain_document_converts() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "plain.md", "# Hello\n\nJust text.\n");

    let output = convert(&input, &ConversionConfig::default()).await.unwrap();

    assert_eq!(output.output_path, dir.path().join("plain.pdf"));
    assert!(output.is_clean());
    assert_eq!(output.stats.diagram_wait_ms, 0);
    assert_pdf(&output.output_path);
}

#[tokio::test]
async fn diagram_document_renders_diagrams() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "design.md", DESIGN_DOC);

    let config = ConversionConfig::builder()
        .diagram_timeout(Duration::from_secs(60))
        .build()
        .unwrap();
    let output = convert(&input, &config).await.unwrap();

    println!("{:#?}", output.diagrams);
    assert_eq!(output.diagrams.total, 1);
    assert_eq!(output.diagrams.rendered, 1, "warnings: {:?}", output.warnings);
    assert_eq!(output.title, "System Design");
    assert_pdf(&output.output_path);
}

#[tokio::test]
async fn invalid_diagram_stays_text_and_pdf_is_produced() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let content = "# Broken\n\n```mermaid\ngraph TD\n  A --> B\n```\n\n```mermaid\nthis is not mermaid (((\n```\n";
    let input = write_doc(dir.path(), "broken.md", content);

    let config = ConversionConfig::builder()
        .diagram_timeout(Duration::from_secs(60))
        .build()
        .unwrap();
    let output = convert(&input, &config).await.unwrap();

    assert_eq!(output.diagrams.total, 2);
    assert_eq!(output.diagrams.rendered, 1);
    assert!(output
        .warnings
        .iter()
        .any(|w| matches!(w, DiagramError::BlockFailed { index: 2, .. })));
    assert_pdf(&output.output_path);
}

#[tokio::test]
async fn unreachable_library_degrades_to_text() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "offline.md", DESIGN_DOC);

    let config = ConversionConfig::builder()
        .diagram_library(DiagramLibrary::Remote(
            "http://127.0.0.1:9/mermaid.min.js".into(),
        ))
        .diagram_timeout(Duration::from_secs(20))
        .build()
        .unwrap();
    let output = convert(&input, &config).await.unwrap();

    assert_eq!(output.diagrams.rendered, 0);
    assert!(output
        .warnings
        .iter()
        .any(|w| matches!(w, DiagramError::LibraryUnavailable { .. })));
    assert_pdf(&output.output_path);
}

#[tokio::test]
async fn page_count_is_stable_across_runs() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let long: String = (1..=40)
        .map(|i| format!("## Section {i}\n\n{}\n\n", "Lorem ipsum dolor sit amet. ".repeat(20)))
        .collect();
    let input = write_doc(dir.path(), "long.md", &long);

    let engine = ChromeEngine::launch(&LaunchOptions::default()).await.unwrap();
    let config = ConversionConfig::builder()
        .page_format(PageFormat::A5)
        .build()
        .unwrap();

    let first = convert_with_engine(&input, &config, &engine).await.unwrap();
    let second = convert_with_engine(&input, &config, &engine).await.unwrap();
    engine.shutdown().await;

    assert!(first.page_count > 1);
    assert_eq!(first.page_count, second.page_count);
}

#[tokio::test]
async fn missing_browser_is_render_engine_error() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_doc(dir.path(), "doc.md", "# Doc\n");

    let config = ConversionConfig::builder()
        .chrome_executable(dir.path().join("no-such-chrome"))
        .build()
        .unwrap();
    let err = convert(&input, &config).await.unwrap_err();

    assert!(matches!(err, Md2PdfError::RenderEngine(_)), "got: {err:?}");
    assert!(!dir.path().join("doc.pdf").exists());
}
