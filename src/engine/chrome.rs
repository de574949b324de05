//! Headless Chromium engine driven over the DevTools protocol.
//!
//! ```text
//! locate executable ──▶ launch (--headless, --no-sandbox) ──▶ handler task
//!        │
//!        └─ per conversion: new target ──▶ goto file://page.html
//!                             ──▶ Runtime.evaluate(awaitPromise) ──▶ Page.printToPDF
//! ```
//!
//! The page HTML is written to a temporary file rather than injected with
//! `document.write`, so the page gets a real `load` event and its `<base>`
//! element resolves relative images against the source directory.

use crate::assets::DIAGRAM_SIGNAL;
use crate::config::LaunchOptions;
use crate::engine::{DiagramWait, PageSession, PdfOptions, RenderEngine};
use crate::error::Md2PdfError;
use crate::output::DiagramReport;
use crate::pipeline::render::RenderedPage;
use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::time::Instant;
use tempfile::{TempDir, TempPath};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A running headless Chromium instance.
///
/// Launch once and share by reference; every [`RenderEngine::open_page`]
/// call gets its own browser target.
pub struct ChromeEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    // Private profile so concurrent engines never share a lock file.
    _profile: TempDir,
}

impl ChromeEngine {
    /// Locate and start the browser.
    ///
    /// # Errors
    /// [`Md2PdfError::RenderEngine`] when no executable is found or the
    /// process does not expose its DevTools endpoint within
    /// [`LaunchOptions::launch_timeout`].
    pub async fn launch(options: &LaunchOptions) -> Result<Self, Md2PdfError> {
        let start = Instant::now();
        let executable = chrome_locate::locate_chrome_with(options.chrome_executable.as_deref())?;
        debug!("Using browser executable {}", executable.display());

        let profile = tempfile::Builder::new()
            .prefix("md2pdf-profile-")
            .tempdir()
            .map_err(|e| {
                Md2PdfError::RenderEngine(format!("Failed to create browser profile dir: {e}"))
            })?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(&executable)
            .user_data_dir(profile.path())
            .launch_timeout(options.launch_timeout)
            .request_timeout(options.request_timeout)
            .arg("--disable-gpu")
            .arg("--hide-scrollbars")
            .arg("--mute-audio");
        if options.no_sandbox {
            builder = builder.no_sandbox();
        }
        for arg in &options.args {
            builder = builder.arg(arg.as_str());
        }
        let browser_config = builder.build().map_err(Md2PdfError::RenderEngine)?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            Md2PdfError::RenderEngine(format!(
                "Failed to launch {}: {e}",
                executable.display()
            ))
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("DevTools handler error: {e}");
                }
            }
        });

        info!(
            "Browser started in {}ms ({})",
            start.elapsed().as_millis(),
            executable.display()
        );

        Ok(Self {
            browser,
            handler,
            _profile: profile,
        })
    }

    /// Close the browser and wait for the process to exit.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Browser did not close cleanly: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for browser exit failed: {e}");
        }
        self.handler.abort();
        debug!("Browser shut down");
    }
}

#[async_trait]
impl RenderEngine for ChromeEngine {
    async fn open_page(&self, page: &RenderedPage) -> Result<Box<dyn PageSession>, Md2PdfError> {
        let html_path = tempfile::Builder::new()
            .prefix("md2pdf-")
            .suffix(".html")
            .tempfile()
            .map_err(|e| Md2PdfError::RenderEngine(format!("Failed to create page file: {e}")))?
            .into_temp_path();
        tokio::fs::write(&html_path, &page.html)
            .await
            .map_err(|e| Md2PdfError::RenderEngine(format!("Failed to write page file: {e}")))?;

        let url = url::Url::from_file_path(&html_path).map_err(|_| {
            Md2PdfError::RenderEngine(format!(
                "Page file path is not absolute: {}",
                html_path.display()
            ))
        })?;

        let target = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| Md2PdfError::RenderEngine(format!("Failed to open page: {e}")))?;

        // goto resolves after the load event, i.e. after the injected script
        // has installed its completion signal.
        let navigated = target.goto(url.to_string()).await.map(|_| ());
        if let Err(e) = navigated {
            let _ = target.close().await;
            return Err(Md2PdfError::RenderEngine(format!(
                "Failed to load {url}: {e}"
            )));
        }
        debug!("Loaded {} into a new page", url);

        Ok(Box::new(ChromeSession {
            page: target,
            diagram_blocks: page.diagram_blocks,
            _html: html_path,
        }))
    }
}

struct ChromeSession {
    page: Page,
    diagram_blocks: usize,
    _html: TempPath,
}

#[async_trait]
impl PageSession for ChromeSession {
    async fn wait_for_diagrams(&mut self) -> Result<DiagramWait, Md2PdfError> {
        let params = EvaluateParams::builder()
            .expression(signal_expression())
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(Md2PdfError::RenderEngine)?;

        // The handler drops commands older than the launch's request
        // timeout; for a pending promise that only means the page is slow.
        let result = match self.page.evaluate_expression(params).await {
            Ok(result) => result,
            Err(CdpError::Timeout) => {
                debug!("DevTools request timed out while awaiting the diagram signal");
                return Ok(DiagramWait::Expired);
            }
            Err(e) => {
                return Err(Md2PdfError::RenderEngine(format!(
                    "Waiting for diagram signal failed: {e}"
                )))
            }
        };

        let value = result.value().cloned().unwrap_or(serde_json::Value::Null);
        Ok(DiagramWait::Settled(DiagramReport::from_signal(
            value,
            self.diagram_blocks,
        )))
    }

    async fn print_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>, Md2PdfError> {
        let params = PrintToPdfParams {
            landscape: Some(options.landscape),
            print_background: Some(options.print_background),
            paper_width: Some(options.paper_width),
            paper_height: Some(options.paper_height),
            margin_top: Some(options.margin_top),
            margin_right: Some(options.margin_right),
            margin_bottom: Some(options.margin_bottom),
            margin_left: Some(options.margin_left),
            display_header_footer: Some(options.footer_template.is_some()),
            // An empty header keeps Chrome from printing its default
            // title/date header when only a footer is wanted.
            header_template: options
                .footer_template
                .as_ref()
                .map(|_| "<span></span>".to_string()),
            footer_template: options.footer_template.clone(),
            ..Default::default()
        };

        self.page
            .pdf(params)
            .await
            .map_err(|e| Md2PdfError::RenderEngine(format!("printToPDF failed: {e}")))
    }

    async fn close(self: Box<Self>) {
        let ChromeSession { page, _html, .. } = *self;
        if let Err(e) = page.close().await {
            debug!("Closing page failed: {e}");
        }
    }
}

/// Expression resolving to the page's diagram report, or `null` when the
/// signal was never installed.
fn signal_expression() -> String {
    format!("Promise.resolve(window.{DIAGRAM_SIGNAL} || null)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_expression_tolerates_missing_signal() {
        assert_eq!(
            signal_expression(),
            "Promise.resolve(window.__MD2PDF_DIAGRAMS__ || null)"
        );
    }

    #[tokio::test]
    async fn launch_with_bad_executable_is_engine_error() {
        let options = LaunchOptions {
            chrome_executable: Some("/no/such/chrome".into()),
            ..LaunchOptions::default()
        };
        let err = ChromeEngine::launch(&options).await.err().unwrap();
        assert!(matches!(err, Md2PdfError::RenderEngine(_)), "got: {err:?}");
    }
}
