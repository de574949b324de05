//! Rendering-engine abstraction.
//!
//! The exporter talks to a browser only through two traits:
//!
//! - [`RenderEngine`]: a long-lived engine that can open isolated pages;
//! - [`PageSession`]: one loaded page, able to await the diagram completion
//!   signal and to paginate itself into PDF bytes.
//!
//! [`chrome::ChromeEngine`] drives headless Chromium over the DevTools
//! protocol. Tests substitute a scripted in-process engine to exercise the
//! ordering and timeout rules without a browser.

pub mod chrome;

use crate::config::ConversionConfig;
use crate::error::Md2PdfError;
use crate::output::DiagramReport;
use crate::pipeline::render::RenderedPage;
use async_trait::async_trait;

pub use chrome::ChromeEngine;

/// A browser able to host rendered pages.
///
/// One engine may serve several conversions at once; each call to
/// [`open_page`](RenderEngine::open_page) returns an independent session.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Load `page` into a fresh page and return once the document has
    /// finished loading (scripts included).
    async fn open_page(&self, page: &RenderedPage) -> Result<Box<dyn PageSession>, Md2PdfError>;
}

/// A single loaded page.
#[async_trait]
pub trait PageSession: Send {
    /// Block until the page's diagram completion signal resolves.
    ///
    /// Callers bound this with a timeout. An implementation whose transport
    /// gives up on the wait first returns [`DiagramWait::Expired`], which is
    /// handled exactly like the caller's own timeout.
    async fn wait_for_diagrams(&mut self) -> Result<DiagramWait, Md2PdfError>;

    /// Paginate the page in its current state.
    async fn print_pdf(&mut self, options: &PdfOptions) -> Result<Vec<u8>, Md2PdfError>;

    /// Release the page. Never fails; problems are logged.
    async fn close(self: Box<Self>);
}

/// How a wait on the diagram completion signal ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagramWait {
    /// The signal resolved with the page's report.
    Settled(DiagramReport),
    /// The engine stopped waiting before the signal resolved.
    Expired,
}

/// Pagination settings in the units the DevTools protocol expects (inches).
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub paper_width: f64,
    pub paper_height: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub landscape: bool,
    pub print_background: bool,
    /// Footer template; `None` disables header and footer entirely.
    pub footer_template: Option<String>,
}

impl PdfOptions {
    pub fn from_config(config: &ConversionConfig) -> Self {
        // Chrome swaps the sides itself when `landscape` is set, so the
        // portrait dimensions are passed through unchanged.
        let (paper_width, paper_height) = config.page_format.dimensions_in();
        let m = &config.margin;
        Self {
            paper_width,
            paper_height,
            margin_top: m.top.to_inches(),
            margin_right: m.right.to_inches(),
            margin_bottom: m.bottom.to_inches(),
            margin_left: m.left.to_inches(),
            landscape: config.landscape,
            print_background: config.print_background,
            footer_template: config.footer_template.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PageFormat;

    #[test]
    fn options_follow_config() {
        let config = ConversionConfig::builder()
            .page_format(PageFormat::Letter)
            .margin("1in 0.5in".parse().unwrap())
            .landscape(true)
            .print_background(false)
            .page_numbers(true)
            .build()
            .unwrap();

        let opts = PdfOptions::from_config(&config);
        assert_eq!((opts.paper_width, opts.paper_height), (8.5, 11.0));
        assert_eq!(opts.margin_top, 1.0);
        assert_eq!(opts.margin_right, 0.5);
        assert_eq!(opts.margin_bottom, 1.0);
        assert_eq!(opts.margin_left, 0.5);
        assert!(opts.landscape);
        assert!(!opts.print_background);
        assert!(opts.footer_template.is_some());
    }

    #[test]
    fn default_options_are_a4_without_footer() {
        let opts = PdfOptions::from_config(&ConversionConfig::default());
        assert_eq!((opts.paper_width, opts.paper_height), (8.27, 11.7));
        assert!(opts.print_background);
        assert!(opts.footer_template.is_none());
    }
}
