//! Diagram-script injection: phase two of the two-phase diagram rendering.
//!
//! Phase one happens in [`super::render`]: fenced `mermaid` blocks come out
//! of the markdown transformer as ordinary `<pre><code class="language-mermaid">`
//! elements. Diagram rendering needs real, measurable DOM nodes, so it
//! cannot run as a text transform. Instead the page carries the script
//! built here, which runs after the window `load` event and, strictly in order:
//!
//! ```text
//! load library ──▶ initialize ──▶ scan blocks ──▶ batch render ──▶ settle signal
//! ```
//!
//! The signal is a promise stored on `window` under [`DIAGRAM_SIGNAL`]. It
//! resolves exactly once with `{ total, rendered, failed, errors, libraryError? }`
//! and never rejects:
//!
//! - a block that fails to parse is restored to its original `<pre>` and
//!   recorded in `errors`; the pass continues with the next block;
//! - a library that fails to load or initialise settles the signal at once
//!   with every block counted as failed, leaving the blocks as code text.
//!
//! The library `<script src>` is only appended once `load` has fired, so a
//! slow download never holds up page navigation. The exporter's bounded wait
//! on the signal is the only place that waits for it.

use crate::assets::{DIAGRAM_LANGUAGE, DIAGRAM_SIGNAL};
use crate::config::DiagramLibrary;
use crate::error::Md2PdfError;
use tracing::debug;

const DIAGRAM_SCRIPT_TEMPLATE: &str = r#"(function () {
  'use strict';
  var LIBRARY_URL = __LIBRARY_URL__;
  var THEME = __THEME__;
  var SELECTOR = 'pre > code.language-__LANG__';
  var settle;
  window.__SIGNAL__ = new Promise(function (resolve) { settle = resolve; });

  function message(err) {
    return String((err && err.message) || err);
  }

  function abandon(reason) {
    var total = document.querySelectorAll(SELECTOR).length;
    settle({ total: total, rendered: 0, failed: total, errors: [], libraryError: reason });
  }

  function loadLibrary(done) {
    if (window.mermaid) { done(window.mermaid); return; }
    if (!LIBRARY_URL) { done(null, 'inlined library did not define window.mermaid'); return; }
    var script = document.createElement('script');
    script.src = LIBRARY_URL;
    script.onload = function () {
      if (window.mermaid) { done(window.mermaid); }
      else { done(null, LIBRARY_URL + ' loaded but did not define window.mermaid'); }
    };
    script.onerror = function () { done(null, 'failed to load ' + LIBRARY_URL); };
    document.head.appendChild(script);
  }

  function placeholders() {
    var found = [];
    document.querySelectorAll(SELECTOR).forEach(function (code) {
      var pre = code.parentElement;
      var div = document.createElement('div');
      div.className = 'mermaid';
      div.textContent = code.textContent;
      div.setAttribute('data-diagram-index', String(found.length + 1));
      pre.replaceWith(div);
      found.push({ div: div, pre: pre });
    });
    return found;
  }

  async function renderAll(lib, nodes) {
    var report = { total: nodes.length, rendered: 0, failed: 0, errors: [] };
    for (var i = 0; i < nodes.length; i++) {
      var node = nodes[i];
      var id = 'md2pdf-diagram-' + (i + 1);
      try {
        var out = await lib.render(id, node.div.textContent);
        node.div.innerHTML = out.svg;
        node.div.setAttribute('data-processed', 'true');
        report.rendered++;
      } catch (err) {
        [id, 'd' + id].forEach(function (stray) {
          var el = document.getElementById(stray);
          if (el) { el.remove(); }
        });
        node.div.replaceWith(node.pre);
        report.failed++;
        report.errors.push({ index: i + 1, message: message(err) });
      }
    }
    return report;
  }

  function start() {
    try {
      loadLibrary(function (lib, error) {
        if (!lib) { abandon(error); return; }
        try {
          lib.initialize({ startOnLoad: false, theme: THEME });
        } catch (err) {
          abandon('initialize failed: ' + message(err));
          return;
        }
        renderAll(lib, placeholders()).then(settle, function (err) { abandon(message(err)); });
      });
    } catch (err) {
      abandon(message(err));
    }
  }

  if (document.readyState === 'complete') {
    start();
  } else {
    window.addEventListener('load', start);
  }
})();"#;

/// Build the `<script>` tags that implement the diagram pass.
///
/// For [`DiagramLibrary::Local`] the library source is read here and inlined
/// ahead of the driver script; for [`DiagramLibrary::Remote`] the driver
/// loads it by URL.
pub async fn script_tags(library: &DiagramLibrary, theme: &str) -> Result<String, Md2PdfError> {
    let mut tags = String::new();

    let url = match library {
        DiagramLibrary::Remote(url) => Some(url.as_str()),
        DiagramLibrary::Local(path) => {
            let source = tokio::fs::read_to_string(path).await.map_err(|e| {
                Md2PdfError::InvalidConfig(format!(
                    "Failed to read diagram library {}: {e}",
                    path.display()
                ))
            })?;
            debug!("Inlining diagram library {} ({} bytes)", path.display(), source.len());
            tags.push_str("<script>");
            tags.push_str(&escape_script_body(&source));
            tags.push_str("</script>\n");
            None
        }
    };

    tags.push_str("<script>");
    tags.push_str(&diagram_script(url, theme));
    tags.push_str("</script>\n");
    Ok(tags)
}

/// The driver script with its parameters substituted.
///
/// `library_url = None` expects the library to be present already.
pub fn diagram_script(library_url: Option<&str>, theme: &str) -> String {
    DIAGRAM_SCRIPT_TEMPLATE
        .replace("__LIBRARY_URL__", &js_literal(&library_url))
        .replace("__THEME__", &js_literal(theme))
        .replace("__LANG__", DIAGRAM_LANGUAGE)
        .replace("__SIGNAL__", DIAGRAM_SIGNAL)
}

/// Serialise a value as a JavaScript literal that is also safe inside an
/// HTML `<script>` element.
fn js_literal<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
}

/// Keep inlined source from closing its `<script>` element early.
fn escape_script_body(source: &str) -> String {
    source.replace("</script", "<\\/script").replace("</SCRIPT", "<\\/SCRIPT")
}
