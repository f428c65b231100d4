//! # md2pdf
//!
//! Render a Markdown report with LaTeX math and local images to a
//! paginated A4 PDF through headless Chromium.
//!
//! ## Why this crate?
//!
//! Markdown engines and LaTeX disagree about what `\`, `_` and `*` mean, so
//! feeding a math-heavy report straight through a Markdown renderer mangles
//! its formulas. This crate hides every formula behind an opaque token
//! before rendering, puts it back afterwards in the delimiters MathJax
//! expects, inlines the report's images as data-URIs, and lets a headless
//! browser typeset and paginate the result.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PROJECT_REPORT.md
//!  │
//!  ├─ 1. Input     read UTF-8 source (missing file is fatal)
//!  ├─ 2. Isolate   \[..\] / \(..\) → MDPDFMATHQ… tokens
//!  ├─ 3. Render    comrak, GFM + hard breaks
//!  ├─ 4. Restore   tokens → canonical delimiters
//!  ├─ 5. Images    allow-listed files → data-URIs
//!  ├─ 6. Assemble  print stylesheet + MathJax bootstrap → temp.html
//!  └─ 7. PDF       Chromium: load, bounded typeset wait, print A4
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2pdf::{convert, ConversionConfig, Fidelity};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let output = convert(&ConversionConfig::default()).await?;
//!     if output.fidelity == Fidelity::Degraded {
//!         for w in &output.warnings {
//!             eprintln!("warning: {w}");
//!         }
//!     }
//!     println!("wrote {}", output.output_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! md2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Runtime requirements
//!
//! A Chrome or Chromium install for PDF export, and outbound network access
//! for the two CDN scripts the document references. Without network access
//! the PDF is still written, with formulas left as raw LaTeX and
//! [`Fidelity::Degraded`] reported.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod template;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionConfig, ConversionConfigBuilder, ImageStage, Margins, PageSettings, TypesetPolicy,
};
pub use convert::{convert, convert_sync, render_html, PreparedDocument};
pub use error::{Md2PdfError, RenderWarning};
pub use output::{ConversionOutput, ConversionStats, Fidelity, RenderOutcome};
pub use pipeline::images::ImageAsset;
pub use pipeline::pdf::{ChromiumEngine, PdfEngine, RenderRequest};
pub use pipeline::typeset::TypesetState;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
