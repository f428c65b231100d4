//! Result types returned by the conversion entry points.

use crate::error::{Md2PdfError, RenderWarning};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How faithfully the PDF reflects the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fidelity {
    /// Math typeset, every placeholder resolved.
    Full,
    /// A PDF was written but formulas may show as raw LaTeX.
    Degraded,
}

/// What a [`crate::pipeline::pdf::PdfEngine`] produced for one document.
///
/// Callers can tell "rendered" from "rendered with reduced fidelity" without
/// inspecting logs, and a genuine failure is never mistaken for either.
#[derive(Debug)]
pub enum RenderOutcome {
    /// PDF bytes with math fully typeset.
    Success(Vec<u8>),
    /// PDF bytes exported after a typeset bound was hit or typesetting failed.
    Degraded(Vec<u8>, Vec<RenderWarning>),
    /// No PDF could be produced.
    Failure(Md2PdfError),
}

impl RenderOutcome {
    /// The PDF bytes, if any were produced.
    pub fn pdf(&self) -> Option<&[u8]> {
        match self {
            RenderOutcome::Success(pdf) | RenderOutcome::Degraded(pdf, _) => Some(pdf),
            RenderOutcome::Failure(_) => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RenderOutcome::Success(_))
    }
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// `\[...\]` spans isolated from the source.
    pub display_math: usize,
    /// `\(...\)` spans isolated from the source.
    pub inline_math: usize,
    /// References rewritten to data-URIs.
    pub images_inlined: usize,
    /// Allow-listed image files absent from disk.
    pub images_missing: usize,
    /// Size of the assembled HTML document.
    pub html_bytes: usize,
    /// Size of the written PDF.
    pub pdf_bytes: usize,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
}

/// Everything a successful run reports back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Where the PDF was written.
    pub output_path: PathBuf,
    /// Where the assembled HTML was written.
    pub debug_html_path: PathBuf,
    pub fidelity: Fidelity,
    /// Non-fatal conditions observed during the run.
    pub warnings: Vec<RenderWarning>,
    pub stats: ConversionStats,
}

impl ConversionOutput {
    /// Treat a degraded result as an error.
    ///
    /// The PDF has already been written; this only changes what the caller
    /// sees.
    pub fn into_strict(self) -> Result<Self, Md2PdfError> {
        match self.fidelity {
            Fidelity::Full => Ok(self),
            Fidelity::Degraded => Err(Md2PdfError::Degraded {
                warnings: self.warnings.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(fidelity: Fidelity, warnings: Vec<RenderWarning>) -> ConversionOutput {
        ConversionOutput {
            output_path: PathBuf::from("out.pdf"),
            debug_html_path: PathBuf::from("temp.html"),
            fidelity,
            warnings,
            stats: ConversionStats::default(),
        }
    }

    #[test]
    fn strict_passes_full_fidelity() {
        assert!(output(Fidelity::Full, vec![]).into_strict().is_ok());
    }

    #[test]
    fn strict_rejects_degraded() {
        let out = output(
            Fidelity::Degraded,
            vec![RenderWarning::MathEngineNotLoaded { secs: 15 }],
        );
        match out.into_strict() {
            Err(Md2PdfError::Degraded { warnings }) => assert_eq!(warnings, 1),
            other => panic!("expected Degraded error, got {other:?}"),
        }
    }

    #[test]
    fn outcome_pdf_accessor() {
        assert_eq!(RenderOutcome::Success(vec![1, 2]).pdf(), Some(&[1u8, 2][..]));
        assert!(RenderOutcome::Degraded(vec![1], vec![]).pdf().is_some());
        assert!(RenderOutcome::Failure(Md2PdfError::Internal("x".into()))
            .pdf()
            .is_none());
    }
}
