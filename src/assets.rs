//! Fixed page assets: the stylesheet, the print footer, and the constants
//! shared between the injected diagram script and the exporter.
//!
//! All text lives here so the look of the output can be changed without
//! touching the rendering or export logic.

/// Default Mermaid build loaded by the page (Mermaid 10, UMD bundle).
pub const DEFAULT_MERMAID_URL: &str = "https://cdn.jsdelivr.net/npm/mermaid@10/dist/mermaid.min.js";

/// Global the injected script assigns its completion promise to.
///
/// The exporter awaits this promise through the DevTools protocol; it
/// resolves exactly once with a `DiagramReport`-shaped object.
pub const DIAGRAM_SIGNAL: &str = "__MD2PDF_DIAGRAMS__";

/// Info-string tag that marks a fenced code block as a diagram.
pub const DIAGRAM_LANGUAGE: &str = "mermaid";

/// The built-in stylesheet.
///
/// Body text uses a neutral sans-serif stack; diagram regions are centred
/// and framed. Placeholders that never received an SVG (library missing,
/// timeout) fall back to preformatted text.
pub const DEFAULT_STYLESHEET: &str = r#"
html { -webkit-print-color-adjust: exact; print-color-adjust: exact; }
body {
  font-family: 'Helvetica Neue', Helvetica, Arial, sans-serif;
  font-size: 11pt;
  line-height: 1.5;
  color: #1f2328;
  margin: 0;
}
h1, h2, h3, h4, h5, h6 { line-height: 1.25; margin: 1.4em 0 0.6em; page-break-after: avoid; }
h1 { font-size: 2em; border-bottom: 1px solid #d0d7de; padding-bottom: 0.3em; }
h2 { font-size: 1.5em; border-bottom: 1px solid #d0d7de; padding-bottom: 0.3em; }
p, ul, ol, table, pre, blockquote { margin: 0 0 1em; }
a { color: #0969da; text-decoration: none; }
img { max-width: 100%; }
code {
  font-family: 'SFMono-Regular', Menlo, Consolas, 'Liberation Mono', monospace;
  font-size: 0.9em;
  background: #f6f8fa;
  border-radius: 4px;
  padding: 0.15em 0.3em;
}
pre { background: #f6f8fa; border-radius: 6px; padding: 12px 16px; overflow: auto; page-break-inside: avoid; }
pre code { background: none; padding: 0; font-size: 0.85em; }
blockquote { color: #59636e; border-left: 4px solid #d0d7de; padding: 0 1em; margin-left: 0; }
table { border-collapse: collapse; }
th, td { border: 1px solid #d0d7de; padding: 6px 13px; }
tr:nth-child(2n) { background: #f6f8fa; }
.page-break { page-break-after: always; break-after: page; }
.mermaid {
  display: flex;
  justify-content: center;
  margin: 20px 0;
  padding: 12px;
  border: 1px solid #d0d7de;
  border-radius: 6px;
  page-break-inside: avoid;
}
.mermaid svg { max-width: 100%; height: auto; }
.mermaid:not([data-processed]) {
  display: block;
  white-space: pre;
  font-family: 'SFMono-Regular', Menlo, Consolas, 'Liberation Mono', monospace;
  font-size: 0.85em;
  background: #f6f8fa;
}
"#;

/// Footer printed by `--page-numbers`. Chrome fills the `pageNumber` and
/// `totalPages` spans; templates carry no page CSS, hence the inline styles.
pub const DEFAULT_FOOTER_TEMPLATE: &str = r#"<div style="width:100%;font-size:8pt;color:#59636e;text-align:center;font-family:'Helvetica Neue',Helvetica,Arial,sans-serif;"><span class="pageNumber"></span> / <span class="totalPages"></span></div>"#;
