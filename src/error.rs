//! Error types for the md2pdf library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`Md2PdfError`] — **Fatal**: the run cannot produce a PDF at all
//!   (missing input, browser could not start, export failed). Returned as
//!   `Err(Md2PdfError)` from the top-level `convert*` functions.
//!
//! * [`RenderWarning`] — **Non-fatal**: something degraded the output
//!   (math engine never loaded, typesetting timed out, a placeholder went
//!   missing) but a PDF was still written. Collected into
//!   [`crate::output::ConversionOutput::warnings`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the md2pdf library.
#[derive(Debug, Error)]
pub enum Md2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The Markdown source was not found at the given path.
    #[error("Markdown file not found: '{path}'\nRun md2pdf from the directory containing the report.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The source file exists but is not valid UTF-8.
    #[error("Markdown file '{path}' is not valid UTF-8 (first bad byte at offset {offset})")]
    InvalidUtf8 { path: PathBuf, offset: usize },

    /// Any other I/O failure while reading the source.
    #[error("Failed to read '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// The Markdown renderer failed to format HTML.
    #[error("Markdown rendering failed: {0}")]
    MarkdownRender(String),

    /// Could not write the intermediate HTML document.
    #[error("Failed to write debug HTML '{path}': {source}")]
    DebugHtmlWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Chromium could not be found or started.
    #[error(
        "Failed to launch headless browser: {0}\n\n\
A Chrome or Chromium installation is required.\n\
  • Install chromium from your package manager, or\n\
  • pass --chrome /path/to/chrome to point at an existing binary.\n"
    )]
    BrowserLaunchFailed(String),

    /// The assembled document could not be opened in the browser page.
    #[error("Failed to load '{path}' in the browser: {detail}")]
    PageLoadFailed { path: PathBuf, detail: String },

    /// The browser failed to print the page to PDF.
    #[error("PDF export failed: {0}")]
    PdfExportFailed(String),

    /// The conversion finished with reduced fidelity and the caller asked
    /// for strict mode.
    ///
    /// Returned by [`crate::output::ConversionOutput::into_strict`].
    #[error("PDF was rendered with reduced fidelity ({warnings} warning(s)); math may appear as raw LaTeX")]
    Degraded { warnings: usize },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal condition observed during a run.
///
/// Warnings never abort the pipeline. Their presence turns a
/// [`crate::output::Fidelity::Full`] result into
/// [`crate::output::Fidelity::Degraded`].
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum RenderWarning {
    /// The MathJax global never became usable within the load bound.
    #[error("math engine did not load within {secs}s; formulas left as raw LaTeX")]
    MathEngineNotLoaded { secs: u64 },

    /// MathJax loaded but its typeset pass did not settle in time.
    #[error("math typesetting did not finish within {secs}s")]
    TypesetTimedOut { secs: u64 },

    /// MathJax reported an error while typesetting.
    #[error("math typesetting failed: {detail}")]
    TypesetFailed { detail: String },

    /// Page load did not complete in time; export continued on a partial page.
    #[error("page load did not complete within {secs}s")]
    PageLoadTimedOut { secs: u64 },

    /// The source already contained text that looks like a math placeholder.
    #[error("source contains the reserved placeholder prefix '{prefix}'")]
    PlaceholderCollision { prefix: String },

    /// A placeholder was dropped or duplicated between isolation and restoration.
    #[error("placeholder '{placeholder}' found {occurrences} time(s) in rendered HTML, expected 1")]
    PlaceholderMismatch {
        placeholder: String,
        occurrences: usize,
    },
}

impl RenderWarning {
    /// Whether this warning means formulas may be unrendered in the PDF.
    pub fn affects_math(&self) -> bool {
        !matches!(self, RenderWarning::PlaceholderCollision { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_not_found_display() {
        let e = Md2PdfError::InputNotFound {
            path: PathBuf::from("PROJECT_REPORT.md"),
        };
        assert!(e.to_string().contains("PROJECT_REPORT.md"));
    }

    #[test]
    fn degraded_display() {
        let e = Md2PdfError::Degraded { warnings: 2 };
        assert!(e.to_string().contains("2 warning"), "got: {e}");
    }

    #[test]
    fn typeset_timeout_display() {
        let w = RenderWarning::TypesetTimedOut { secs: 30 };
        assert!(w.to_string().contains("30s"));
    }

    #[test]
    fn mismatch_display() {
        let w = RenderWarning::PlaceholderMismatch {
            placeholder: "MDPDFMATHQD0QEND".into(),
            occurrences: 2,
        };
        let msg = w.to_string();
        assert!(msg.contains("MDPDFMATHQD0QEND"));
        assert!(msg.contains("2 time"));
    }

    #[test]
    fn collision_does_not_affect_math() {
        let w = RenderWarning::PlaceholderCollision {
            prefix: "X".into(),
        };
        assert!(!w.affects_math());
        assert!(RenderWarning::MathEngineNotLoaded { secs: 1 }.affects_math());
    }
}
