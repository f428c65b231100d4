//! Configuration types for Markdown-to-PDF conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The defaults reproduce the fixed
//! report run exactly: `PROJECT_REPORT.md` in, `PROJECT_REPORT.pdf` out,
//! `temp.html` left behind for inspection, A4 with 2 cm margins.

use crate::error::Md2PdfError;
use crate::pipeline::pdf::PdfEngine;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Source document read when no input is given.
pub const DEFAULT_INPUT: &str = "PROJECT_REPORT.md";

/// PDF written when no output is given.
pub const DEFAULT_OUTPUT: &str = "PROJECT_REPORT.pdf";

/// Assembled HTML always written before rendering.
pub const DEFAULT_DEBUG_HTML: &str = "temp.html";

/// Image files embedded as data-URIs when present next to the report.
pub const DEFAULT_IMAGES: [&str; 2] = ["md1_lambda_0.5_mu_1.0.png", "md1_lambda_0.9_mu_1.0.png"];

/// Configuration for a single Markdown-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use md2pdf::ConversionConfig;
/// use std::time::Duration;
///
/// let config = ConversionConfig::builder()
///     .input("notes.md")
///     .output("notes.pdf")
///     .load_timeout(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// assert_eq!(config.output.to_str(), Some("notes.pdf"));
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Markdown source. Default: `PROJECT_REPORT.md`.
    pub input: PathBuf,

    /// PDF destination, overwritten if present. Default: `PROJECT_REPORT.pdf`.
    pub output: PathBuf,

    /// Where the assembled HTML is written before rendering. Default: `temp.html`.
    ///
    /// The file is not cleaned up afterwards.
    pub debug_html: PathBuf,

    /// Directory the image allow-list is resolved against. Default: `.`.
    pub asset_dir: PathBuf,

    /// Image file names eligible for data-URI embedding.
    ///
    /// Files that do not exist at run time are skipped without error.
    pub images: Vec<String>,

    /// Whether images are inlined into the Markdown or into the rendered HTML.
    /// Default: [`ImageStage::AfterRender`].
    pub image_stage: ImageStage,

    /// Bounds for the wait on asynchronous math typesetting.
    pub typeset: TypesetPolicy,

    /// Paper size, margins and background printing.
    pub page: PageSettings,

    /// Path to a Chrome/Chromium executable. If None, the engine searches
    /// the usual install locations.
    pub chrome_executable: Option<PathBuf>,

    /// Pre-constructed PDF engine. Takes precedence over the built-in
    /// Chromium engine; mainly useful for tests and custom browsers.
    pub engine: Option<Arc<dyn PdfEngine>>,

    /// Stage and typeset events for progress reporting.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            debug_html: PathBuf::from(DEFAULT_DEBUG_HTML),
            asset_dir: PathBuf::from("."),
            images: DEFAULT_IMAGES.iter().map(|s| s.to_string()).collect(),
            image_stage: ImageStage::default(),
            typeset: TypesetPolicy::default(),
            page: PageSettings::default(),
            chrome_executable: None,
            engine: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("input", &self.input)
            .field("output", &self.output)
            .field("debug_html", &self.debug_html)
            .field("asset_dir", &self.asset_dir)
            .field("images", &self.images)
            .field("image_stage", &self.image_stage)
            .field("typeset", &self.typeset)
            .field("page", &self.page)
            .field("chrome_executable", &self.chrome_executable)
            .field("engine", &self.engine.as_ref().map(|e| e.name().to_string()))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
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
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input = path.into();
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output = path.into();
        self
    }

    pub fn debug_html(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.debug_html = path.into();
        self
    }

    pub fn asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.asset_dir = dir.into();
        self
    }

    /// Replace the image allow-list.
    pub fn images<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.images = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn image_stage(mut self, stage: ImageStage) -> Self {
        self.config.image_stage = stage;
        self
    }

    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.config.typeset.load_timeout = timeout;
        self
    }

    pub fn typeset_timeout(mut self, timeout: Duration) -> Self {
        self.config.typeset.typeset_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.typeset.poll_interval = interval;
        self
    }

    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.config.typeset.settle_delay = delay;
        self
    }

    pub fn page(mut self, page: PageSettings) -> Self {
        self.config.page = page;
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_executable = Some(path.into());
        self
    }

    pub fn engine(mut self, engine: Arc<dyn PdfEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Md2PdfError> {
        let c = &self.config;
        if c.input.as_os_str().is_empty() {
            return Err(Md2PdfError::InvalidConfig("input path is empty".into()));
        }
        if c.output.as_os_str().is_empty() {
            return Err(Md2PdfError::InvalidConfig("output path is empty".into()));
        }
        if c.debug_html.as_os_str().is_empty() {
            return Err(Md2PdfError::InvalidConfig("debug HTML path is empty".into()));
        }
        if c.typeset.load_timeout.is_zero() || c.typeset.typeset_timeout.is_zero() {
            return Err(Md2PdfError::InvalidConfig(
                "typeset timeouts must be non-zero".into(),
            ));
        }
        if c.typeset.poll_interval.is_zero() {
            return Err(Md2PdfError::InvalidConfig(
                "poll interval must be non-zero".into(),
            ));
        }
        c.page.validate()?;
        Ok(self.config)
    }
}

// ── Enums & nested settings ──────────────────────────────────────────────

/// Where data-URI substitution happens relative to Markdown rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageStage {
    /// Rewrite `![alt](file)` into an `<img>` tag before rendering.
    BeforeRender,
    /// Rewrite `src=`/`href=` attributes in the rendered HTML. (default)
    #[default]
    AfterRender,
}

/// Bounds for the `NotLoaded → Loaded → Complete` typeset wait.
///
/// Each transition has its own timeout. When a bound is hit the PDF is
/// still exported, just with unrendered formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypesetPolicy {
    /// Maximum wait for the MathJax global to become usable. Default: 15 s.
    pub load_timeout: Duration,
    /// Maximum wait for the typeset promise to resolve. Default: 30 s.
    pub typeset_timeout: Duration,
    /// Delay between "is MathJax loaded" probes. Default: 100 ms.
    pub poll_interval: Duration,
    /// Pause after typesetting so layout reflows before printing. Default: 1 s.
    pub settle_delay: Duration,
}

impl Default for TypesetPolicy {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_secs(15),
            typeset_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            settle_delay: Duration::from_secs(1),
        }
    }
}

/// Page margins in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    /// The same margin on all four sides.
    pub fn uniform(cm: f64) -> Self {
        Self {
            top: cm,
            right: cm,
            bottom: cm,
            left: cm,
        }
    }
}

/// Physical page layout for PDF export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSettings {
    /// Paper width in inches. Default: 8.27 (A4).
    pub width_in: f64,
    /// Paper height in inches. Default: 11.69 (A4).
    pub height_in: f64,
    /// Margins in centimetres. Default: 2 cm all sides.
    pub margins_cm: Margins,
    /// Print CSS backgrounds (table header shading, code blocks). Default: true.
    pub print_background: bool,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self::a4()
    }
}

impl PageSettings {
    /// A4 portrait, 2 cm margins, backgrounds printed.
    pub fn a4() -> Self {
        Self {
            width_in: 8.27,
            height_in: 11.69,
            margins_cm: Margins::uniform(2.0),
            print_background: true,
        }
    }

    /// Convert a centimetre length to inches, the unit DevTools expects.
    pub fn cm_to_in(cm: f64) -> f64 {
        cm / 2.54
    }

    fn validate(&self) -> Result<(), Md2PdfError> {
        if self.width_in <= 0.0 || self.height_in <= 0.0 {
            return Err(Md2PdfError::InvalidConfig(format!(
                "page size must be positive, got {}x{} in",
                self.width_in, self.height_in
            )));
        }
        let m = self.margins_cm;
        if [m.top, m.right, m.bottom, m.left].iter().any(|v| *v < 0.0) {
            return Err(Md2PdfError::InvalidConfig("margins must be ≥ 0".into()));
        }
        let width_cm = self.width_in * 2.54;
        let height_cm = self.height_in * 2.54;
        if m.left + m.right >= width_cm || m.top + m.bottom >= height_cm {
            return Err(Md2PdfError::InvalidConfig(
                "margins leave no printable area".into(),
            ));
        }
        Ok(())
    }
}
