//! Configuration types for Markdown-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The config is validated once in
//! [`ConversionConfigBuilder::build`] and never mutated while a conversion
//! runs, so one value can be shared by concurrent conversions.
//!
//! Paper sizes and margins are typed ([`PageFormat`], [`Margin`],
//! [`Length`]) and parse from the strings users already know from print
//! dialogs and CSS (`"A4"`, `"20mm"`, `"1in 0.75in"`).

use crate::assets::{DEFAULT_FOOTER_TEMPLATE, DEFAULT_MERMAID_URL, DEFAULT_STYLESHEET};
use crate::error::Md2PdfError;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Configuration for a Markdown-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_md2pdf::{ConversionConfig, PageFormat};
/// use std::time::Duration;
///
/// let config = ConversionConfig::builder()
///     .page_format(PageFormat::Letter)
///     .margin("0.75in".parse().unwrap())
///     .diagram_timeout(Duration::from_secs(10))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Destination of the PDF. `None` writes next to the input with a
    /// `.pdf` extension.
    pub output_path: Option<PathBuf>,

    /// Paper size. Default: A4.
    pub page_format: PageFormat,

    /// Page margins. Default: 20mm on every side.
    pub margin: Margin,

    /// Rotate the paper to landscape. Default: false.
    pub landscape: bool,

    /// Keep background colours and images when printing. Default: true.
    pub print_background: bool,

    /// CSS text embedded in the page `<head>`. Default: [`DEFAULT_STYLESHEET`].
    pub stylesheet: String,

    /// Where the page loads the Mermaid library from.
    pub diagram_library: DiagramLibrary,

    /// Mermaid theme name passed to `mermaid.initialize`. Default: `"default"`.
    pub diagram_theme: String,

    /// Upper bound on waiting for the diagram completion signal.
    /// Default: 30 s.
    ///
    /// Elapsing is not fatal: the PDF is produced with any unrendered
    /// diagrams shown as text.
    pub diagram_timeout: Duration,

    /// Browser launch settings.
    pub launch: LaunchOptions,

    /// HTML template for the page footer (Chrome print template syntax,
    /// e.g. `<span class="pageNumber">`). `None` prints no header/footer.
    pub footer_template: Option<String>,

    /// Optional stage-by-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            output_path: None,
            page_format: PageFormat::default(),
            margin: Margin::default(),
            landscape: false,
            print_background: true,
            stylesheet: DEFAULT_STYLESHEET.to_string(),
            diagram_library: DiagramLibrary::default(),
            diagram_theme: "default".to_string(),
            diagram_timeout: Duration::from_secs(30),
            launch: LaunchOptions::default(),
            footer_template: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("output_path", &self.output_path)
            .field("page_format", &self.page_format)
            .field("margin", &self.margin)
            .field("landscape", &self.landscape)
            .field("print_background", &self.print_background)
            .field("stylesheet", &format_args!("<{} bytes>", self.stylesheet.len()))
            .field("diagram_library", &self.diagram_library)
            .field("diagram_theme", &self.diagram_theme)
            .field("diagram_timeout", &self.diagram_timeout)
            .field("launch", &self.launch)
            .field("footer_template", &self.footer_template.is_some())
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The PDF destination for `input`: the configured path, or `input`
    /// with its extension replaced by `.pdf`.
    pub fn resolve_output_path(&self, input: &Path) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| input.with_extension("pdf"))
    }

    /// Paper width and height in inches after applying orientation.
    pub fn paper_size_in(&self) -> (f64, f64) {
        let (w, h) = self.page_format.dimensions_in();
        if self.landscape {
            (h, w)
        } else {
            (w, h)
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = Some(path.into());
        self
    }

    pub fn page_format(mut self, format: PageFormat) -> Self {
        self.config.page_format = format;
        self
    }

    pub fn margin(mut self, margin: Margin) -> Self {
        self.config.margin = margin;
        self
    }

    pub fn landscape(mut self, v: bool) -> Self {
        self.config.landscape = v;
        self
    }

    pub fn print_background(mut self, v: bool) -> Self {
        self.config.print_background = v;
        self
    }

    /// Replace the built-in stylesheet.
    pub fn stylesheet(mut self, css: impl Into<String>) -> Self {
        self.config.stylesheet = css.into();
        self
    }

    pub fn diagram_library(mut self, library: DiagramLibrary) -> Self {
        self.config.diagram_library = library;
        self
    }

    pub fn diagram_theme(mut self, theme: impl Into<String>) -> Self {
        self.config.diagram_theme = theme.into();
        self
    }

    pub fn diagram_timeout(mut self, timeout: Duration) -> Self {
        self.config.diagram_timeout = timeout;
        self
    }

    pub fn launch(mut self, launch: LaunchOptions) -> Self {
        self.config.launch = launch;
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.launch.chrome_executable = Some(path.into());
        self
    }

    pub fn footer_template(mut self, html: impl Into<String>) -> Self {
        self.config.footer_template = Some(html.into());
        self
    }

    /// Print "page / total" centred in the footer.
    pub fn page_numbers(mut self, v: bool) -> Self {
        self.config.footer_template = v.then(|| DEFAULT_FOOTER_TEMPLATE.to_string());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2PdfError> {
        let c = &self.config;

        if c.diagram_timeout.is_zero() {
            return Err(Md2PdfError::InvalidConfig(
                "Diagram timeout must be greater than zero".into(),
            ));
        }

        let (width, height) = c.paper_size_in();
        let m = &c.margin;
        if m.left.to_inches() + m.right.to_inches() >= width
            || m.top.to_inches() + m.bottom.to_inches() >= height
        {
            return Err(Md2PdfError::InvalidConfig(format!(
                "Margins {} leave no printable area on {} paper",
                m, c.page_format
            )));
        }

        if c.diagram_theme.trim().is_empty() {
            return Err(Md2PdfError::InvalidConfig(
                "Diagram theme must not be empty".into(),
            ));
        }

        if let DiagramLibrary::Local(ref path) = c.diagram_library {
            if !path.is_file() {
                return Err(Md2PdfError::InvalidConfig(format!(
                    "Diagram library file not found: {}",
                    path.display()
                )));
            }
        }

        if c.launch.launch_timeout.is_zero() {
            return Err(Md2PdfError::InvalidConfig(
                "Browser launch timeout must be greater than zero".into(),
            ));
        }

        // Embedded verbatim in a <style> element.
        if c.stylesheet.to_ascii_lowercase().contains("</style") {
            return Err(Md2PdfError::InvalidConfig(
                "Stylesheet must not contain a closing </style> tag".into(),
            ));
        }

        let mut config = self.config;
        let floor = config.diagram_timeout + REQUEST_TIMEOUT_HEADROOM;
        if config.launch.request_timeout < floor {
            config.launch.request_timeout = floor;
        }
        Ok(config)
    }
}

// ── Launch options ───────────────────────────────────────────────────────

/// Rendering-engine startup settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchOptions {
    /// Explicit browser executable. `None` searches `CHROME_PATH`, install
    /// locations, then `PATH`.
    pub chrome_executable: Option<PathBuf>,

    /// Pass `--no-sandbox`. Default: true, since the Chrome sandbox is
    /// usually unavailable inside containers and CI runners.
    pub no_sandbox: bool,

    /// Extra command-line flags for the browser.
    pub args: Vec<String>,

    /// How long to wait for the browser's DevTools endpoint. Default: 20 s.
    pub launch_timeout: Duration,

    /// How long a single DevTools command may stay pending, including the
    /// one awaiting the diagram signal. Default: 60 s.
    /// [`ConversionConfigBuilder::build`] raises it to
    /// [`REQUEST_TIMEOUT_HEADROOM`] past the diagram timeout.
    pub request_timeout: Duration,
}

/// Margin kept between the diagram timeout and the DevTools request timeout,
/// so the diagram wait always ends on its own bound first.
pub const REQUEST_TIMEOUT_HEADROOM: Duration = Duration::from_secs(10);

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            no_sandbox: true,
            args: Vec::new(),
            launch_timeout: Duration::from_secs(20),
            request_timeout: Duration::from_secs(60),
        }
    }
}

// ── Diagram library ──────────────────────────────────────────────────────

/// Source of the Mermaid library loaded by the injected page script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagramLibrary {
    /// Loaded by the browser from a URL (default: jsDelivr, Mermaid 10).
    Remote(String),
    /// Read from disk at render time and inlined into the page, so
    /// conversion needs no network access.
    Local(PathBuf),
}

impl Default for DiagramLibrary {
    fn default() -> Self {
        DiagramLibrary::Remote(DEFAULT_MERMAID_URL.to_string())
    }
}

// ── Paper formats ────────────────────────────────────────────────────────

/// Standard paper sizes, matching the names browsers use in print dialogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageFormat {
    Letter,
    Legal,
    Tabloid,
    Ledger,
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
    A6,
}

impl PageFormat {
    /// All supported formats, in the order they are listed in help text.
    pub const ALL: [PageFormat; 11] = [
        PageFormat::Letter,
        PageFormat::Legal,
        PageFormat::Tabloid,
        PageFormat::Ledger,
        PageFormat::A0,
        PageFormat::A1,
        PageFormat::A2,
        PageFormat::A3,
        PageFormat::A4,
        PageFormat::A5,
        PageFormat::A6,
    ];

    /// Portrait width and height in inches.
    pub fn dimensions_in(self) -> (f64, f64) {
        match self {
            PageFormat::Letter => (8.5, 11.0),
            PageFormat::Legal => (8.5, 14.0),
            PageFormat::Tabloid => (11.0, 17.0),
            PageFormat::Ledger => (17.0, 11.0),
            PageFormat::A0 => (33.1, 46.8),
            PageFormat::A1 => (23.4, 33.1),
            PageFormat::A2 => (16.54, 23.4),
            PageFormat::A3 => (11.7, 16.54),
            PageFormat::A4 => (8.27, 11.7),
            PageFormat::A5 => (5.83, 8.27),
            PageFormat::A6 => (4.13, 5.83),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PageFormat::Letter => "Letter",
            PageFormat::Legal => "Legal",
            PageFormat::Tabloid => "Tabloid",
            PageFormat::Ledger => "Ledger",
            PageFormat::A0 => "A0",
            PageFormat::A1 => "A1",
            PageFormat::A2 => "A2",
            PageFormat::A3 => "A3",
            PageFormat::A4 => "A4",
            PageFormat::A5 => "A5",
            PageFormat::A6 => "A6",
        }
    }
}

impl fmt::Display for PageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PageFormat {
    type Err = Md2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PageFormat::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                Md2PdfError::InvalidConfig(format!(
                    "Unknown page format '{wanted}' (expected one of: {})",
                    PageFormat::ALL.map(PageFormat::name).join(", ")
                ))
            })
    }
}

// ── Lengths and margins ──────────────────────────────────────────────────

/// Units accepted in margin strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnit {
    /// CSS pixels, 96 per inch. A bare number is read as pixels.
    Px,
    In,
    Cm,
    Mm,
    /// Points, 72 per inch.
    Pt,
}

impl LengthUnit {
    fn per_inch(self) -> f64 {
        match self {
            LengthUnit::Px => 96.0,
            LengthUnit::In => 1.0,
            LengthUnit::Cm => 2.54,
            LengthUnit::Mm => 25.4,
            LengthUnit::Pt => 72.0,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            LengthUnit::Px => "px",
            LengthUnit::In => "in",
            LengthUnit::Cm => "cm",
            LengthUnit::Mm => "mm",
            LengthUnit::Pt => "pt",
        }
    }
}

/// A non-negative linear measurement such as `20mm` or `0.5in`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Length {
    pub value: f64,
    pub unit: LengthUnit,
}

impl Length {
    pub const fn new(value: f64, unit: LengthUnit) -> Self {
        Self { value, unit }
    }

    pub const fn mm(value: f64) -> Self {
        Self::new(value, LengthUnit::Mm)
    }

    pub fn to_inches(self) -> f64 {
        self.value / self.unit.per_inch()
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

static RE_LENGTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d+(?:\.\d+)?|\.\d+)(px|in|cm|mm|pt)?$").unwrap());

impl FromStr for Length {
    type Err = Md2PdfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let caps = RE_LENGTH.captures(s).ok_or_else(|| {
            Md2PdfError::InvalidConfig(format!(
                "Invalid length '{s}' (expected e.g. 20mm, 1.5cm, 0.75in, 72pt, 96px)"
            ))
        })?;

        let value: f64 = caps[1]
            .parse()
            .map_err(|_| Md2PdfError::InvalidConfig(format!("Invalid number in length '{s}'")))?;

        let unit = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
            None | Some("px") => LengthUnit::Px,
            Some("in") => LengthUnit::In,
            Some("cm") => LengthUnit::Cm,
            Some("mm") => LengthUnit::Mm,
            Some("pt") => LengthUnit::Pt,
            Some(other) => {
                return Err(Md2PdfError::InvalidConfig(format!("Unknown unit '{other}'")))
            }
        };

        Ok(Length { value, unit })
    }
}

/// Page margins, one [`Length`] per side.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl Margin {
    /// The same margin on every side.
    pub const fn uniform(length: Length) -> Self {
        Self {
            top: length,
            right: length,
            bottom: length,
            left: length,
        }
    }
}

impl Default for Margin {
    fn default() -> Self {
        Margin::uniform(Length::mm(20.0))
    }
}

impl fmt::Display for Margin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.top, self.right, self.bottom, self.left)
    }
}

impl FromStr for Margin {
    type Err = Md2PdfError;

    /// Parse CSS `margin` shorthand with one to four lengths:
    /// `all`, `vertical horizontal`, `top horizontal bottom`,
    /// `top right bottom left`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split_whitespace()
            .map(Length::from_str)
            .collect::<Result<Vec<_>, _>>()?;

        match parts.as_slice() {
            [all] => Ok(Margin::uniform(*all)),
            [v, h] => Ok(Margin {
                top: *v,
                right: *h,
                bottom: *v,
                left: *h,
            }),
            [t, h, b] => Ok(Margin {
                top: *t,
                right: *h,
                bottom: *b,
                left: *h,
            }),
            [t, r, b, l] => Ok(Margin {
                top: *t,
                right: *r,
                bottom: *b,
                left: *l,
            }),
            _ => Err(Md2PdfError::InvalidConfig(format!(
                "Margin '{}' must have 1 to 4 lengths",
                s.trim()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn default_config_matches_reference_settings() {
        let c = ConversionConfig::default();
        assert_eq!(c.page_format, PageFormat::A4);
        assert_eq!(c.margin, Margin::uniform(Length::mm(20.0)));
        assert!(c.print_background);
        assert!(c.launch.no_sandbox);
        assert_eq!(c.diagram_theme, "default");
        assert!(c.stylesheet.contains(".mermaid"));
        assert_eq!(
            c.diagram_library,
            DiagramLibrary::Remote(DEFAULT_MERMAID_URL.to_string())
        );
    }

    #[test]
    fn default_config_builds() {
        ConversionConfig::builder().build().expect("defaults are valid");
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = ConversionConfig::builder()
            .diagram_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, Md2PdfError::InvalidConfig(_)));
    }

    #[test]
    fn request_timeout_outlasts_diagram_timeout() {
        let c = ConversionConfig::builder()
            .diagram_timeout(Duration::from_secs(120))
            .build()
            .unwrap();
        assert_eq!(
            c.launch.request_timeout,
            Duration::from_secs(120) + REQUEST_TIMEOUT_HEADROOM
        );

        let defaults = ConversionConfig::builder().build().unwrap();
        assert_eq!(defaults.launch.request_timeout, Duration::from_secs(60));
        assert!(defaults.launch.request_timeout > defaults.diagram_timeout);
    }

    #[test]
    fn stylesheet_closing_tag_rejected() {
        let err = ConversionConfig::builder()
            .stylesheet("body { color: red }\n</STYLE><script>alert(1)</script>")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("</style>"), "got: {err}");

        ConversionConfig::builder()
            .stylesheet("a::after { content: '<style>' }")
            .build()
            .unwrap();
    }

    #[test]
    fn oversized_margins_rejected() {
        let err = ConversionConfig::builder()
            .page_format(PageFormat::A6)
            .margin("3in".parse().unwrap())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("printable area"), "got: {err}");
    }

    #[test]
    fn missing_local_library_rejected() {
        let err = ConversionConfig::builder()
            .diagram_library(DiagramLibrary::Local("/no/such/mermaid.js".into()))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("/no/such/mermaid.js"));
    }

    #[test]
    fn page_numbers_toggle_footer() {
        let on = ConversionConfig::builder().page_numbers(true).build().unwrap();
        assert!(on.footer_template.unwrap().contains("pageNumber"));
        let off = ConversionConfig::builder().page_numbers(false).build().unwrap();
        assert!(off.footer_template.is_none());
    }

    #[test]
    fn output_path_defaults_next_to_input() {
        let c = ConversionConfig::default();
        assert_eq!(
            c.resolve_output_path(Path::new("docs/design.md")),
            PathBuf::from("docs/design.pdf")
        );
        let c = ConversionConfig::builder().output_path("out/x.pdf").build().unwrap();
        assert_eq!(
            c.resolve_output_path(Path::new("docs/design.md")),
            PathBuf::from("out/x.pdf")
        );
    }

    #[test]
    fn landscape_swaps_dimensions() {
        let c = ConversionConfig::builder().landscape(true).build().unwrap();
        assert_eq!(c.paper_size_in(), (11.7, 8.27));
    }

    #[test]
    fn page_format_parse_is_case_insensitive() {
        assert_eq!("a4".parse::<PageFormat>().unwrap(), PageFormat::A4);
        assert_eq!(" Letter ".parse::<PageFormat>().unwrap(), PageFormat::Letter);
        assert!("B5".parse::<PageFormat>().is_err());
    }

    #[test]
    fn length_units_convert_to_inches() {
        assert!(approx("25.4mm".parse::<Length>().unwrap().to_inches(), 1.0));
        assert!(approx("2.54cm".parse::<Length>().unwrap().to_inches(), 1.0));
        assert!(approx("72pt".parse::<Length>().unwrap().to_inches(), 1.0));
        assert!(approx("96px".parse::<Length>().unwrap().to_inches(), 1.0));
        assert!(approx("96".parse::<Length>().unwrap().to_inches(), 1.0));
        assert!(approx("0.5IN".parse::<Length>().unwrap().to_inches(), 0.5));
        assert!(approx(".5in".parse::<Length>().unwrap().to_inches(), 0.5));
    }

    #[test]
    fn length_rejects_garbage() {
        assert!("-5mm".parse::<Length>().is_err());
        assert!("5 furlongs".parse::<Length>().is_err());
        assert!("".parse::<Length>().is_err());
    }

    #[test]
    fn margin_shorthand() {
        let m: Margin = "10mm 20mm".parse().unwrap();
        assert_eq!(m.top, Length::mm(10.0));
        assert_eq!(m.right, Length::mm(20.0));
        assert_eq!(m.bottom, Length::mm(10.0));
        assert_eq!(m.left, Length::mm(20.0));

        let m: Margin = "1mm 2mm 3mm".parse().unwrap();
        assert_eq!((m.top, m.left, m.bottom), (Length::mm(1.0), Length::mm(2.0), Length::mm(3.0)));

        let m: Margin = "1mm 2mm 3mm 4mm".parse().unwrap();
        assert_eq!(m.left, Length::mm(4.0));

        assert!("1mm 2mm 3mm 4mm 5mm".parse::<Margin>().is_err());
        assert!("".parse::<Margin>().is_err());
    }

    #[test]
    fn margin_display_roundtrips_through_parse() {
        let m: Margin = "1in 2cm".parse().unwrap();
        assert_eq!(m.to_string().parse::<Margin>().unwrap(), m);
    }
}
