//! Renderer: markdown → a styled, navigable HTML page.
//!
//! Markdown conversion is delegated to `pulldown-cmark`; this module only
//! adjusts the event stream before HTML is written:
//!
//! - headings without an explicit `{#id}` get a slug id so in-document
//!   links keep working in the PDF;
//! - fenced blocks tagged `mermaid` (any case) are normalised to the
//!   lowercase tag and counted. They stay ordinary code blocks here; the
//!   injected script in [`super::inject`] turns them into diagrams later.
//!
//! The diagram script is only attached when at least one diagram block
//! exists, so diagram-free documents never depend on the diagram library.

use crate::assets::DIAGRAM_LANGUAGE;
use crate::config::ConversionConfig;
use crate::error::Md2PdfError;
use crate::output::DocumentSummary;
use crate::pipeline::inject;
use crate::pipeline::load::SourceDocument;
use once_cell::sync::Lazy;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// The converted document, ready to be loaded by the rendering engine.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Complete HTML document (stylesheet and scripts embedded).
    pub html: String,
    pub title: String,
    /// Number of diagram blocks the page will ask the diagram pass to render.
    pub diagram_blocks: usize,
    /// Directory relative links resolve against.
    pub base_dir: Option<PathBuf>,
}

impl RenderedPage {
    /// `true` when the exporter must wait for the diagram completion signal.
    pub fn has_diagrams(&self) -> bool {
        self.diagram_blocks > 0
    }
}

/// Convert `doc` into a [`RenderedPage`].
pub async fn render_document(
    doc: &SourceDocument,
    config: &ConversionConfig,
) -> Result<RenderedPage, Md2PdfError> {
    let prepared = prepare(&doc.content);
    let title = prepared.title.clone().unwrap_or_else(|| doc.stem());
    let base_dir = doc.base_dir();

    let mut body = String::with_capacity(doc.content.len() * 3 / 2);
    html::push_html(&mut body, prepared.events.into_iter());

    let scripts = if prepared.diagram_blocks > 0 {
        inject::script_tags(&config.diagram_library, &config.diagram_theme).await?
    } else {
        String::new()
    };

    let base_tag = base_dir
        .as_deref()
        .and_then(|dir| url::Url::from_directory_path(dir).ok())
        .map(|u| format!("<base href=\"{}\">\n", escape_html(u.as_str())))
        .unwrap_or_default();

    let html = format!(
        "<!DOCTYPE html>\n\
<html lang=\"en\">\n\
<head>\n\
<meta charset=\"utf-8\">\n\
<title>{title}</title>\n\
{base_tag}\
<style>{css}</style>\n\
</head>\n\
<body>\n\
<main class=\"markdown-body\">\n\
{body}\
</main>\n\
{scripts}\
</body>\n\
</html>\n",
        title = escape_html(&title),
        css = config.stylesheet,
    );

    debug!(
        "Rendered '{}': {} bytes of HTML, {} diagram block(s), {} heading(s)",
        title,
        html.len(),
        prepared.diagram_blocks,
        prepared.headings
    );

    Ok(RenderedPage {
        html,
        title,
        diagram_blocks: prepared.diagram_blocks,
        base_dir,
    })
}

/// Describe `doc` without producing HTML.
pub fn summarize(doc: &SourceDocument) -> DocumentSummary {
    let prepared = prepare(&doc.content);
    DocumentSummary {
        path: doc.path.clone(),
        title: prepared.title.unwrap_or_else(|| doc.stem()),
        headings: prepared.headings,
        diagram_blocks: prepared.diagram_blocks,
        words: prepared.words,
        bytes: doc.content.len(),
    }
}

// ── Event preparation ────────────────────────────────────────────────────

struct Prepared<'a> {
    events: Vec<Event<'a>>,
    title: Option<String>,
    diagram_blocks: usize,
    headings: usize,
    words: usize,
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options
}

fn prepare(markdown: &str) -> Prepared<'_> {
    let markdown = strip_front_matter(markdown);
    let mut events: Vec<Event<'_>> = Parser::new_ext(markdown, markdown_options()).collect();

    let mut diagram_blocks = 0;
    let mut words = 0;
    for event in events.iter_mut() {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                if let Some(normalised) = normalise_diagram_info(info) {
                    *info = CowStr::from(normalised);
                    diagram_blocks += 1;
                }
            }
            Event::Text(text) | Event::Code(text) => {
                words += text.split_whitespace().count();
            }
            _ => {}
        }
    }

    let (title, headings) = assign_heading_ids(&mut events);

    Prepared {
        events,
        title,
        diagram_blocks,
        headings,
        words,
    }
}

/// Returns the rewritten info string when `info` names the diagram language.
fn normalise_diagram_info(info: &str) -> Option<String> {
    let mut parts = info.splitn(2, ' ');
    let lang = parts.next()?;
    if !lang.eq_ignore_ascii_case(DIAGRAM_LANGUAGE) {
        return None;
    }
    Some(match parts.next() {
        Some(rest) => format!("{DIAGRAM_LANGUAGE} {rest}"),
        None => DIAGRAM_LANGUAGE.to_string(),
    })
}

/// Give every heading an id and return (first H1 text, heading count).
///
/// Explicit `{#id}` attributes are kept; generated slugs never collide with
/// them or with each other (`intro`, `intro-1`, `intro-2`, …).
fn assign_heading_ids(events: &mut [Event<'_>]) -> (Option<String>, usize) {
    let mut used: HashMap<String, usize> = HashMap::new();
    for event in events.iter() {
        if let Event::Start(Tag::Heading { id: Some(id), .. }) = event {
            used.insert(id.to_string(), 0);
        }
    }

    let mut title = None;
    let mut headings = 0;

    for i in 0..events.len() {
        let (level, has_id) = match &events[i] {
            Event::Start(Tag::Heading { level, id, .. }) => (*level, id.is_some()),
            _ => continue,
        };
        headings += 1;

        let text = heading_text(&events[i + 1..]);
        if level == HeadingLevel::H1 && title.is_none() && !text.trim().is_empty() {
            title = Some(text.trim().to_string());
        }
        if has_id {
            continue;
        }

        let slug = unique_slug(&text, &mut used);
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(CowStr::from(slug));
        }
    }

    (title, headings)
}

/// Concatenate the text of the heading whose content starts at `events[0]`.
fn heading_text(events: &[Event<'_>]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::End(TagEnd::Heading(_)) => break,
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

fn unique_slug(text: &str, used: &mut HashMap<String, usize>) -> String {
    let mut base = slug::slugify(text);
    if base.is_empty() {
        base = "section".to_string();
    }

    let mut candidate = base.clone();
    while let Some(count) = used.get_mut(&base).map(|c| {
        *c += 1;
        *c
    }) {
        candidate = format!("{base}-{count}");
        if !used.contains_key(&candidate) {
            break;
        }
    }
    used.entry(candidate.clone()).or_insert(0);
    candidate
}

static RE_FRONT_MATTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\A---[ \t]*\r?\n.*?\r?\n(?:---|\.\.\.)[ \t]*(?:\r?\n|\z)").unwrap());

/// Drop a leading YAML front-matter block.
fn strip_front_matter(markdown: &str) -> &str {
    match RE_FRONT_MATTER.find(markdown) {
        Some(m) => &markdown[m.end()..],
        None => markdown,
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::DIAGRAM_SIGNAL;

    fn doc(content: &str) -> SourceDocument {
        SourceDocument::from_text("design_document.md", content)
    }

    async fn render(content: &str) -> RenderedPage {
        render_document(&doc(content), &ConversionConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn plain_document_has_no_diagram_script() {
        let page = render("# Title\n\nSome *text*.\n\n```rust\nfn main() {}\n```\n").await;
        assert_eq!(page.diagram_blocks, 0);
        assert!(!page.has_diagrams());
        assert!(!page.html.contains(DIAGRAM_SIGNAL));
        assert!(!page.html.contains("mermaid.min.js"));
        assert!(page.html.contains("<em>text</em>"));
    }

    #[tokio::test]
    async fn diagram_blocks_stay_code_and_get_script() {
        let page = render("# D\n\n```mermaid\ngraph TD; A-->B\n```\n").await;
        assert_eq!(page.diagram_blocks, 1);
        assert!(page.html.contains(r#"<pre><code class="language-mermaid">graph TD; A--&gt;B"#));
        assert!(page.html.contains(DIAGRAM_SIGNAL));
        let script = page.html.find(DIAGRAM_SIGNAL).unwrap();
        let block = page.html.find("language-mermaid").unwrap();
        assert!(block < script, "script must follow the content it scans");
    }

    #[tokio::test]
    async fn diagram_tag_is_case_normalised() {
        let page = render("```Mermaid title\nflowchart LR\n```\n\n```MERMAID\npie\n```\n").await;
        assert_eq!(page.diagram_blocks, 2);
        assert_eq!(page.html.matches(r#"class="language-mermaid""#).count(), 2);
    }

    #[tokio::test]
    async fn stylesheet_is_embedded() {
        let config = ConversionConfig::builder()
            .stylesheet("body { color: red; }")
            .build()
            .unwrap();
        let page = render_document(&doc("hi"), &config).await.unwrap();
        assert!(page.html.contains("<style>body { color: red; }</style>"));
    }

    #[tokio::test]
    async fn title_from_first_h1_else_stem() {
        let page = render("## Not this\n\n# Fish & `Chips`\n\n# Later\n").await;
        assert_eq!(page.title, "Fish & Chips");
        assert!(page.html.contains("<title>Fish &amp; Chips</title>"));

        let page = render("no headings here").await;
        assert_eq!(page.title, "design_document");
    }

    #[tokio::test]
    async fn headings_get_unique_ids() {
        let page = render("# Intro\n\n## Intro\n\n## Intro {#intro-1}\n\n### Intro\n").await;
        assert!(page.html.contains(r#"<h1 id="intro">"#), "{}", page.html);
        assert!(page.html.contains(r#"<h2 id="intro-2">"#), "{}", page.html);
        assert!(page.html.contains(r#"<h2 id="intro-1">"#), "{}", page.html);
        assert!(page.html.contains(r#"<h3 id="intro-3">"#), "{}", page.html);
    }

    #[tokio::test]
    async fn base_href_points_at_document_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = SourceDocument::from_text(dir.path().join("doc.md"), "![x](img/x.png)");
        let page = render_document(&source, &ConversionConfig::default())
            .await
            .unwrap();
        assert!(page.html.contains("<base href=\"file://"));
        assert!(page.base_dir.is_some());
    }

    #[tokio::test]
    async fn front_matter_is_not_rendered() {
        let page = render("---\ntitle: hidden\nauthor: me\n---\n# Shown\n").await;
        assert!(!page.html.contains("hidden"));
        assert!(page.html.contains("Shown</h1>"));
    }

    #[test]
    fn front_matter_requires_leading_fence() {
        assert_eq!(strip_front_matter("text\n---\na: b\n---\n"), "text\n---\na: b\n---\n");
        assert_eq!(strip_front_matter("---\na: b\n...\nbody"), "body");
    }

    #[test]
    fn summary_counts_structure() {
        let s = summarize(&doc(
            "# Design\n\nThree words here.\n\n## Flow\n\n```mermaid\ngraph TD\n```\n",
        ));
        assert_eq!(s.title, "Design");
        assert_eq!(s.headings, 2);
        assert_eq!(s.diagram_blocks, 1);
        assert!(s.words >= 5);
    }

    #[test]
    fn non_diagram_info_strings_untouched() {
        assert_eq!(normalise_diagram_info("rust"), None);
        assert_eq!(normalise_diagram_info("mermaidx"), None);
        assert_eq!(normalise_diagram_info("mermaid"), Some("mermaid".into()));
        assert_eq!(
            normalise_diagram_info("Mermaid {theme=dark}"),
            Some("mermaid {theme=dark}".into())
        );
    }

    #[test]
    fn empty_heading_slug_falls_back() {
        let mut used = HashMap::new();
        assert_eq!(unique_slug("!!!", &mut used), "section");
        assert_eq!(unique_slug("???", &mut used), "section-1");
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
