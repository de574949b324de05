//! CLI binary for edgequake-md2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use edgequake_md2pdf::{
    convert, convert_to_html, inspect, ConversionConfig, ConversionOutput,
    ConversionProgressCallback, DiagramLibrary, DiagramReport, LaunchOptions, Margin, PageFormat,
    ProgressCallback, Stage,
};
use indicatif::{ProgressBar, ProgressFinish, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner naming the current stage, plus one
/// log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner().with_finish(ProgressFinish::AndClear);
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_prefix(stage.label());
        self.bar.set_message(match stage {
            Stage::Load => "reading markdown…",
            Stage::Render => "building page…",
            Stage::Launch => "starting headless Chromium…",
            Stage::Export => "waiting for diagrams and printing…",
        });
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<18} {}",
            green("✓"),
            stage.label(),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_diagrams_settled(&self, report: &DiagramReport, timed_out: bool) {
        let line = if timed_out {
            yellow(&format!("diagrams timed out ({} left as text)", report.total))
        } else if report.failed > 0 {
            yellow(&format!(
                "{}/{} diagrams rendered, {} left as text",
                report.rendered, report.total, report.failed
            ))
        } else {
            dim(&format!("{}/{} diagrams rendered", report.rendered, report.total))
        };
        self.bar.println(format!("    {line}"));
    }

    fn on_conversion_complete(&self, _output: &Path, _bytes: u64) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic conversion (writes design.pdf next to the input)
  md2pdf design.md

  # Choose output path and paper
  md2pdf design.md -o out/design.pdf --format Letter --margin "0.75in"

  # Landscape with page numbers
  md2pdf slides.md --landscape --page-numbers

  # Offline: inline a local Mermaid build instead of the CDN copy
  md2pdf design.md --mermaid-file ./vendor/mermaid.min.js

  # Slow diagrams: wait up to two minutes before printing anyway
  md2pdf big.md --diagram-timeout 120

  # Write the HTML page instead of a PDF
  md2pdf design.md --html

  # Inspect structure (no browser needed)
  md2pdf --inspect-only --json design.md

ENVIRONMENT VARIABLES:
  CHROME_PATH             Browser executable (checked after --chrome)
  MD2PDF_*                Every option, e.g. MD2PDF_FORMAT=Letter
  RUST_LOG                Log filter, overrides -v / -q

SETUP:
  A Chromium-based browser must be installed. It is searched for in
  CHROME_PATH, the usual install locations, then PATH. The browser is
  started with --no-sandbox by default so it runs inside containers; pass
  --sandbox to keep Chrome's sandbox on.
"#;

#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Convert Markdown files with Mermaid diagrams to PDF",
    long_about = "Convert a Markdown document to PDF using headless Chromium. Fenced \
```mermaid blocks are rendered as diagrams before the page is printed; diagrams that \
fail or time out are kept as text and the PDF is still produced.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown file to convert.
    input: PathBuf,

    /// Output path. Default: the input with a .pdf (or .html) extension.
    #[arg(short, long, env = "MD2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Paper format: Letter, Legal, Tabloid, Ledger, A0–A6.
    #[arg(long, env = "MD2PDF_FORMAT", default_value = "A4")]
    format: PageFormat,

    /// Page margins, CSS shorthand with units (px, in, cm, mm, pt).
    #[arg(long, env = "MD2PDF_MARGIN", default_value = "20mm")]
    margin: Margin,

    #[arg(long, env = "MD2PDF_LANDSCAPE")]
    landscape: bool,

    /// Do not print background colours and images.
    #[arg(long, env = "MD2PDF_NO_BACKGROUND")]
    no_background: bool,

    /// Replace the built-in stylesheet with this CSS file.
    #[arg(long, env = "MD2PDF_STYLESHEET")]
    stylesheet: Option<PathBuf>,

    /// Seconds to wait for diagrams before printing anyway.
    #[arg(long, env = "MD2PDF_DIAGRAM_TIMEOUT", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..=3600))]
    diagram_timeout: u64,

    /// URL the page loads Mermaid from.
    #[arg(long, env = "MD2PDF_MERMAID_URL", conflicts_with = "mermaid_file")]
    mermaid_url: Option<String>,

    /// Local Mermaid build to inline into the page (no network needed).
    #[arg(long, env = "MD2PDF_MERMAID_FILE")]
    mermaid_file: Option<PathBuf>,

    /// Mermaid theme: default, neutral, dark, forest, base.
    #[arg(long, env = "MD2PDF_MERMAID_THEME", default_value = "default")]
    mermaid_theme: String,

    /// Browser executable. Default: CHROME_PATH, install locations, PATH.
    #[arg(long, env = "MD2PDF_CHROME")]
    chrome: Option<PathBuf>,

    /// Keep Chrome's sandbox enabled (drops --no-sandbox).
    #[arg(long, env = "MD2PDF_SANDBOX")]
    sandbox: bool,

    /// Extra browser flag; repeatable.
    #[arg(long = "chrome-arg", env = "MD2PDF_CHROME_ARG", allow_hyphen_values = true)]
    chrome_args: Vec<String>,

    /// Print "page / total" in the footer.
    #[arg(long, env = "MD2PDF_PAGE_NUMBERS")]
    page_numbers: bool,

    /// Write the HTML page instead of a PDF.
    #[arg(long, env = "MD2PDF_HTML")]
    html: bool,

    /// Show document structure and exit.
    #[arg(long)]
    inspect_only: bool,

    /// Print the result as JSON on stdout.
    #[arg(long, env = "MD2PDF_JSON")]
    json: bool,

    #[arg(long, env = "MD2PDF_NO_PROGRESS")]
    no_progress: bool,

    #[arg(short, long, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    #[arg(short, long, env = "MD2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // stage lines cover what matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.inspect_only || cli.html {
                eprintln!("{} {:#}", red("✘"), e);
            } else {
                eprintln!("{} PDF generation failed: {:#}", red("✘"), e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let summary = inspect(&cli.input)
            .await
            .context("Failed to inspect document")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
            );
        } else {
            println!("File:         {}", summary.path.display());
            println!("Title:        {}", summary.title);
            println!("Headings:     {}", summary.headings);
            println!("Diagrams:     {}", summary.diagram_blocks);
            println!("Words:        {}", summary.words);
            println!("Bytes:        {}", summary.bytes);
        }
        return Ok(());
    }

    if !cli.quiet && !cli.json && !cli.html {
        eprintln!("Converting {} to PDF...", cli.input.display());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let mut config = build_config(cli).await?;
    // The spinner starts ticking on creation, so only after validation.
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>;
        config.progress_callback = Some(cb);
    }

    // ── HTML mode ────────────────────────────────────────────────────────
    if cli.html {
        let out = convert_to_html(&cli.input, cli.output.as_deref(), &config)
            .await
            .context("HTML generation failed")?;
        if cli.json {
            println!("{}", serde_json::json!({ "output_path": out }));
        } else if !cli.quiet {
            eprintln!("{} HTML written to: {}", green("✔"), bold(&out.display().to_string()));
        }
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let output = convert(&cli.input, &config).await.context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&output);
    }
    Ok(())
}

fn print_summary(output: &ConversionOutput) {
    for warning in &output.warnings {
        eprintln!("{} {}", yellow("⚠"), warning);
    }
    eprintln!(
        "{} PDF created successfully at: {}",
        green("✔"),
        bold(&output.output_path.display().to_string())
    );
    eprintln!(
        "   {}",
        dim(&format!(
            "{} pages  {} bytes  {}ms",
            output.page_count, output.bytes, output.stats.total_duration_ms
        ))
    );
}

async fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .page_format(cli.format)
        .margin(cli.margin)
        .landscape(cli.landscape)
        .print_background(!cli.no_background)
        .diagram_timeout(Duration::from_secs(cli.diagram_timeout))
        .diagram_theme(cli.mermaid_theme.clone())
        .page_numbers(cli.page_numbers)
        .launch(LaunchOptions {
            chrome_executable: cli.chrome.clone(),
            no_sandbox: !cli.sandbox,
            args: cli.chrome_args.clone(),
            ..LaunchOptions::default()
        });

    if let Some(ref out) = cli.output {
        builder = builder.output_path(out.clone());
    }

    if let Some(ref path) = cli.stylesheet {
        let css = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read stylesheet {}", path.display()))?;
        if css.trim().is_empty() {
            bail!("Stylesheet {} is empty", path.display());
        }
        builder = builder.stylesheet(css);
    }

    if let Some(ref path) = cli.mermaid_file {
        builder = builder.diagram_library(DiagramLibrary::Local(path.clone()));
    } else if let Some(ref url) = cli.mermaid_url {
        builder = builder.diagram_library(DiagramLibrary::Remote(url.clone()));
    }

    builder.build().context("Invalid configuration")
}
