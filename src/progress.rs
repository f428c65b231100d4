//! Progress-callback trait for per-stage conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages and as the browser's
//! math engine moves through its typeset states.
//!
//! # Example
//!
//! ```rust
//! use md2pdf::{ConversionConfig, ConversionProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ConversionProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::Fidelity;
use crate::pipeline::typeset::TypesetState;
use std::fmt;
use std::sync::Arc;

/// The sequential stages of one conversion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ReadInput,
    LoadImages,
    IsolateMath,
    RenderMarkdown,
    RestoreMath,
    InlineImages,
    Assemble,
    RenderPdf,
    WriteOutput,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::ReadInput => "read input",
            Stage::LoadImages => "load images",
            Stage::IsolateMath => "isolate math",
            Stage::RenderMarkdown => "render markdown",
            Stage::RestoreMath => "restore math",
            Stage::InlineImages => "inline images",
            Stage::Assemble => "assemble document",
            Stage::RenderPdf => "render pdf",
            Stage::WriteOutput => "write output",
        };
        f.write_str(label)
    }
}

/// Called by the conversion pipeline as it runs.
///
/// All methods have default no-op implementations so callers only
/// override what they care about. Implementations must be `Send + Sync`
/// because the PDF engine reports typeset transitions from async tasks.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called just before a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called each time the math engine advances a typeset state.
    fn on_typeset_state(&self, state: TypesetState) {
        let _ = state;
    }

    /// Called once after the PDF has been written.
    fn on_conversion_complete(&self, fidelity: Fidelity) {
        let _ = fidelity;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
