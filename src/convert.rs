//! Conversion entry points.
//!
//! [`convert`] runs the whole pipeline for one report and writes the PDF.
//! [`render_html`] runs only the text stages (math isolation through
//! document assembly) and never touches a browser, which makes it the
//! natural target for tests and for debugging a report's HTML.

use crate::config::{ConversionConfig, ImageStage};
use crate::error::{Md2PdfError, RenderWarning};
use crate::output::{ConversionOutput, ConversionStats, Fidelity, RenderOutcome};
use crate::pipeline::images::{self, ImageAsset};
use crate::pipeline::pdf::{ChromiumEngine, PdfEngine, RenderRequest};
use crate::pipeline::{assemble, input, markdown, math};
use crate::progress::{ProgressCallback, Stage};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Assembled document plus what the text stages observed.
#[derive(Debug, Clone)]
pub struct PreparedDocument {
    /// Complete standalone HTML document.
    pub html: String,
    pub display_math: usize,
    pub inline_math: usize,
    /// References rewritten to data-URIs.
    pub images_inlined: usize,
    /// Placeholder collisions and mismatches.
    pub warnings: Vec<RenderWarning>,
}

/// Run the text stages on `markdown` and return the assembled document.
///
/// Only `assets` are inlined; references to anything else are left as
/// written.
///
/// # Example
/// ```rust
/// use md2pdf::{render_html, ImageStage};
///
/// let doc = render_html(r"Solve \(x^2=4\) for x.", &[], ImageStage::AfterRender).unwrap();
/// assert!(doc.html.contains(r"\(x^2=4\)"));
/// assert!(doc.warnings.is_empty());
/// ```
pub fn render_html(
    markdown: &str,
    assets: &[ImageAsset],
    stage: ImageStage,
) -> Result<PreparedDocument, Md2PdfError> {
    prepare(markdown, assets, stage, None)
}

/// Convert the configured Markdown report to PDF.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ConversionOutput)` whenever a PDF was written, including when math
/// typesetting timed out (check `output.fidelity`).
///
/// # Errors
/// Returns `Err(Md2PdfError)` only for fatal errors:
/// - Markdown source missing or unreadable
/// - Debug HTML could not be written
/// - Browser could not start, load the page, or export
/// - Output PDF could not be written
pub async fn convert(config: &ConversionConfig) -> Result<ConversionOutput, Md2PdfError> {
    let total_start = Instant::now();
    let progress = config.progress_callback.as_ref();
    info!("Starting conversion: {}", config.input.display());

    // ── Step 1: Read source ──────────────────────────────────────────────
    let started = stage_start(progress, Stage::ReadInput);
    let source = input::read_markdown(&config.input).await?;
    stage_complete(progress, Stage::ReadInput, started);

    // ── Step 2: Load allow-listed images ─────────────────────────────────
    let started = stage_start(progress, Stage::LoadImages);
    let catalog = images::load_assets(&config.asset_dir, &config.images).await;
    stage_complete(progress, Stage::LoadImages, started);

    // ── Steps 3-7: Text stages ───────────────────────────────────────────
    let prepared = prepare(&source, &catalog.assets, config.image_stage, progress)?;

    // ── Step 8: Write debug HTML ─────────────────────────────────────────
    write_file(&config.debug_html, prepared.html.as_bytes())
        .await
        .map_err(|e| Md2PdfError::DebugHtmlWriteFailed {
            path: config.debug_html.clone(),
            source: e,
        })?;
    debug!("Wrote {}", config.debug_html.display());

    // ── Step 9: Render PDF ───────────────────────────────────────────────
    let engine = resolve_engine(config);
    let started = stage_start(progress, Stage::RenderPdf);
    let render_start = Instant::now();
    let outcome = engine
        .render(RenderRequest {
            document: &config.debug_html,
            page: &config.page,
            typeset: &config.typeset,
            progress,
        })
        .await;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    let (pdf, render_warnings) = match outcome {
        RenderOutcome::Success(pdf) => (pdf, Vec::new()),
        RenderOutcome::Degraded(pdf, warnings) => (pdf, warnings),
        RenderOutcome::Failure(e) => {
            warn!("PDF engine '{}' failed: {}", engine.name(), e);
            return Err(e);
        }
    };
    stage_complete(progress, Stage::RenderPdf, started);
    info!("Rendered {} bytes of PDF in {}ms", pdf.len(), render_duration_ms);

    // ── Step 10: Write output ────────────────────────────────────────────
    let started = stage_start(progress, Stage::WriteOutput);
    write_atomic(&config.output, &pdf).await?;
    stage_complete(progress, Stage::WriteOutput, started);

    // ── Step 11: Fidelity and stats ──────────────────────────────────────
    let mut warnings = prepared.warnings;
    warnings.extend(render_warnings);
    let fidelity = if warnings.iter().any(RenderWarning::affects_math) {
        Fidelity::Degraded
    } else {
        Fidelity::Full
    };

    let stats = ConversionStats {
        display_math: prepared.display_math,
        inline_math: prepared.inline_math,
        images_inlined: prepared.images_inlined,
        images_missing: catalog.missing.len(),
        html_bytes: prepared.html.len(),
        pdf_bytes: pdf.len(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
    };

    match fidelity {
        Fidelity::Full => info!(
            "Conversion complete: {} ({}ms total)",
            config.output.display(),
            stats.total_duration_ms
        ),
        Fidelity::Degraded => warn!(
            "Conversion complete with {} warning(s): {}",
            warnings.len(),
            config.output.display()
        ),
    }

    if let Some(cb) = progress {
        cb.on_conversion_complete(fidelity);
    }

    Ok(ConversionOutput {
        output_path: config.output.clone(),
        debug_html_path: config.debug_html.clone(),
        fidelity,
        warnings,
        stats,
    })
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(config: &ConversionConfig) -> Result<ConversionOutput, Md2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn prepare(
    source: &str,
    assets: &[ImageAsset],
    image_stage: ImageStage,
    progress: Option<&ProgressCallback>,
) -> Result<PreparedDocument, Md2PdfError> {
    let mut warnings = Vec::new();
    let mut images_inlined = 0;

    // Isolate
    let started = stage_start(progress, Stage::IsolateMath);
    if math::collides(source) {
        warn!(
            "Source already contains '{}'; restored math may be wrong",
            math::PLACEHOLDER_PREFIX
        );
        warnings.push(RenderWarning::PlaceholderCollision {
            prefix: math::PLACEHOLDER_PREFIX.to_string(),
        });
    }
    let isolated = math::isolate(source);
    stage_complete(progress, Stage::IsolateMath, started);

    let mut text = isolated.text.clone();
    if image_stage == ImageStage::BeforeRender {
        let started = stage_start(progress, Stage::InlineImages);
        let (inlined, n) = images::inline_markdown(&text, assets);
        text = inlined;
        images_inlined += n;
        stage_complete(progress, Stage::InlineImages, started);
    }

    // Render
    let started = stage_start(progress, Stage::RenderMarkdown);
    let rendered = markdown::render_markdown(&text)?;
    stage_complete(progress, Stage::RenderMarkdown, started);

    // Restore
    let started = stage_start(progress, Stage::RestoreMath);
    let restored = math::restore(&rendered, &isolated.spans);
    warnings.extend(restored.warnings);
    let mut body = restored.html;
    stage_complete(progress, Stage::RestoreMath, started);

    if image_stage == ImageStage::AfterRender {
        let started = stage_start(progress, Stage::InlineImages);
        let (inlined, n) = images::inline_html(&body, assets);
        body = inlined;
        images_inlined += n;
        stage_complete(progress, Stage::InlineImages, started);
    }
    debug!("Inlined {} image reference(s)", images_inlined);

    // Assemble
    let started = stage_start(progress, Stage::Assemble);
    let html = assemble::assemble(&body);
    stage_complete(progress, Stage::Assemble, started);

    Ok(PreparedDocument {
        html,
        display_math: isolated.count(math::MathKind::Display),
        inline_math: isolated.count(math::MathKind::Inline),
        images_inlined,
        warnings,
    })
}

/// Use the injected engine if there is one, otherwise launch Chromium.
fn resolve_engine(config: &ConversionConfig) -> Arc<dyn PdfEngine> {
    if let Some(ref engine) = config.engine {
        return Arc::clone(engine);
    }
    match config.chrome_executable {
        Some(ref exe) => Arc::new(ChromiumEngine::with_executable(exe)),
        None => Arc::new(ChromiumEngine::new()),
    }
}

fn stage_start(progress: Option<&ProgressCallback>, stage: Stage) -> Instant {
    if let Some(cb) = progress {
        cb.on_stage_start(stage);
    }
    Instant::now()
}

fn stage_complete(progress: Option<&ProgressCallback>, stage: Stage, started: Instant) {
    let elapsed_ms = started.elapsed().as_millis() as u64;
    debug!("Stage '{}' took {}ms", stage, elapsed_ms);
    if let Some(cb) = progress {
        cb.on_stage_complete(stage, elapsed_ms);
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}

/// Atomic write: temp file next to the target, then rename over it.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Md2PdfError> {
    let io_err = |e: std::io::Error| Md2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let tmp_path = path.with_extension("pdf.tmp");
    write_file(&tmp_path, bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(io_err)
}
