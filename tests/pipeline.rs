//! Library-level tests for the full conversion pipeline.
//!
//! A scripted [`PdfEngine`] stands in for Chromium so every path, including
//! the math-engine timeout, runs without a browser or network access.

use async_trait::async_trait;
use md2pdf::pipeline::pdf::export;
use md2pdf::pipeline::typeset::DocumentPage;
use md2pdf::{
    convert, ConversionConfig, ConversionConfigBuilder, ConversionProgressCallback, Fidelity,
    Md2PdfError, PageSettings, PdfEngine, RenderOutcome, RenderRequest, RenderWarning, Stage,
    TypesetState,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const FAKE_PDF: &[u8] = b"%PDF-1.4\n1 0 obj<<>>endobj\n%%EOF\n";
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

// ── Test doubles ─────────────────────────────────────────────────────────────

/// A page whose math engine loads after `load_after` probes, or never.
struct FakePage {
    load_after: Option<usize>,
    probes: AtomicUsize,
}

#[async_trait]
impl DocumentPage for FakePage {
    async fn math_engine_loaded(&self) -> Result<bool, Md2PdfError> {
        let n = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self.load_after.is_some_and(|after| n >= after))
    }

    async fn typeset(&self) -> Result<(), Md2PdfError> {
        Ok(())
    }

    async fn print_pdf(&self, _page: &PageSettings) -> Result<Vec<u8>, Md2PdfError> {
        Ok(FAKE_PDF.to_vec())
    }
}

#[derive(Clone, Copy)]
enum Script {
    /// MathJax loads on the second probe.
    Typesets,
    /// MathJax never loads.
    NeverLoads,
    /// The browser cannot print.
    Fails,
}

/// Engine that records the document it was given and follows a script.
struct ScriptedEngine {
    script: Script,
    seen_html: Mutex<Option<String>>,
}

impl ScriptedEngine {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            seen_html: Mutex::new(None),
        })
    }

    fn seen_html(&self) -> String {
        self.seen_html.lock().unwrap().clone().expect("engine was not called")
    }
}

#[async_trait]
impl PdfEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn render(&self, request: RenderRequest<'_>) -> RenderOutcome {
        let html = std::fs::read_to_string(request.document).unwrap_or_default();
        *self.seen_html.lock().unwrap() = Some(html);

        let load_after = match self.script {
            Script::Typesets => Some(2),
            Script::NeverLoads => None,
            Script::Fails => {
                return RenderOutcome::Failure(Md2PdfError::PdfExportFailed(
                    "printToPDF: target closed".into(),
                ))
            }
        };
        let page = FakePage {
            load_after,
            probes: AtomicUsize::new(0),
        };
        export(&page, request).await
    }
}

#[derive(Default)]
struct EventLog {
    stages: Mutex<Vec<Stage>>,
    states: Mutex<Vec<TypesetState>>,
    fidelity: Mutex<Option<Fidelity>>,
}

impl ConversionProgressCallback for EventLog {
    fn on_stage_complete(&self, stage: Stage, _elapsed_ms: u64) {
        self.stages.lock().unwrap().push(stage);
    }

    fn on_typeset_state(&self, state: TypesetState) {
        self.states.lock().unwrap().push(state);
    }

    fn on_conversion_complete(&self, fidelity: Fidelity) {
        *self.fidelity.lock().unwrap() = Some(fidelity);
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new(report: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("PROJECT_REPORT.md"), report).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn add_image(&self, name: &str) {
        std::fs::write(self.path(name), PNG_MAGIC).unwrap();
    }

    fn builder(&self, engine: Arc<dyn PdfEngine>) -> ConversionConfigBuilder {
        ConversionConfig::builder()
            .input(self.path("PROJECT_REPORT.md"))
            .output(self.path("PROJECT_REPORT.pdf"))
            .debug_html(self.path("temp.html"))
            .asset_dir(self.dir.path())
            .load_timeout(Duration::from_millis(200))
            .typeset_timeout(Duration::from_millis(200))
            .poll_interval(Duration::from_millis(5))
            .settle_delay(Duration::from_millis(1))
            .engine(engine)
    }
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn report_with_math_and_images_converts_with_full_fidelity() {
    let ws = Workspace::new(
        "# Queue analysis\n\n\
         Utilisation is \\(\\rho = \\lambda / \\mu\\).\n\n\
         \\[ L_q = \\frac{\\rho^2}{1 - \\rho} \\]\n\n\
         ![M/D/1 at 0.5](md1_lambda_0.5_mu_1.0.png)\n",
    );
    ws.add_image("md1_lambda_0.5_mu_1.0.png");
    let engine = ScriptedEngine::new(Script::Typesets);
    let config = ws.builder(engine.clone()).build().unwrap();

    let output = convert(&config).await.unwrap();

    assert_eq!(output.fidelity, Fidelity::Full);
    assert!(output.warnings.is_empty(), "{:?}", output.warnings);
    assert_eq!(std::fs::read(ws.path("PROJECT_REPORT.pdf")).unwrap(), FAKE_PDF);

    let html = read(&ws.path("temp.html"));
    assert_eq!(engine.seen_html(), html);
    assert!(html.contains(r"\(\rho = \lambda / \mu\)"));
    assert!(html.contains(r"\[L_q = \frac{\rho^2}{1 - \rho}\]"));
    assert!(html.contains("src=\"data:image/png;base64,"));
    assert!(!html.contains("MDPDFMATHQ"));

    assert_eq!(output.stats.display_math, 1);
    assert_eq!(output.stats.inline_math, 1);
    assert_eq!(output.stats.images_inlined, 1);
    assert_eq!(output.stats.images_missing, 1);
    assert_eq!(output.stats.pdf_bytes, FAKE_PDF.len());
    assert_eq!(output.stats.html_bytes, html.len());
}

#[tokio::test]
async fn missing_input_is_fatal_and_writes_nothing() {
    let ws = Workspace::new("unused");
    std::fs::remove_file(ws.path("PROJECT_REPORT.md")).unwrap();
    let engine = ScriptedEngine::new(Script::Typesets);
    let config = ws.builder(engine.clone()).build().unwrap();

    let err = convert(&config).await.unwrap_err();

    assert!(matches!(err, Md2PdfError::InputNotFound { .. }), "got {err:?}");
    assert!(!ws.path("PROJECT_REPORT.pdf").exists());
    assert!(!ws.path("temp.html").exists());
    assert!(engine.seen_html.lock().unwrap().is_none());
}

#[tokio::test]
async fn math_engine_timeout_still_writes_pdf() {
    let ws = Workspace::new("Solve \\(x^2=4\\) for x.\n");
    let config = ws
        .builder(ScriptedEngine::new(Script::NeverLoads))
        .build()
        .unwrap();

    let output = tokio::time::timeout(Duration::from_secs(10), convert(&config))
        .await
        .expect("conversion must not hang")
        .unwrap();

    assert_eq!(output.fidelity, Fidelity::Degraded);
    assert!(matches!(
        output.warnings[..],
        [RenderWarning::MathEngineNotLoaded { .. }]
    ));
    let pdf = std::fs::read(ws.path("PROJECT_REPORT.pdf")).unwrap();
    assert!(!pdf.is_empty());
    assert!(output.clone().into_strict().is_err());
}

#[tokio::test]
async fn export_failure_leaves_only_debug_html() {
    let ws = Workspace::new("# Title\n");
    let config = ws.builder(ScriptedEngine::new(Script::Fails)).build().unwrap();

    let err = convert(&config).await.unwrap_err();

    assert!(matches!(err, Md2PdfError::PdfExportFailed(_)), "got {err:?}");
    assert!(!ws.path("PROJECT_REPORT.pdf").exists());
    assert!(read(&ws.path("temp.html")).contains("<h1>Title</h1>"));
}

#[tokio::test]
async fn missing_image_reference_is_kept() {
    let ws = Workspace::new("![chart](missing.png)\n");
    let engine = ScriptedEngine::new(Script::Typesets);
    let config = ws
        .builder(engine.clone())
        .images(["missing.png"])
        .build()
        .unwrap();

    let output = convert(&config).await.unwrap();

    let html = engine.seen_html();
    assert!(html.contains("src=\"missing.png\""));
    assert!(!html.contains("data:image"));
    assert_eq!(output.stats.images_inlined, 0);
    assert_eq!(output.stats.images_missing, 1);
    assert_eq!(output.fidelity, Fidelity::Full);
}

#[tokio::test]
async fn plain_math_scenario() {
    let ws = Workspace::new("Solve \\(x^2=4\\) for x.\n");
    let engine = ScriptedEngine::new(Script::Typesets);
    let config = ws.builder(engine.clone()).build().unwrap();

    convert(&config).await.unwrap();

    let html = engine.seen_html();
    assert!(html.contains("Solve \\(x^2=4\\) for x."));
    assert!(!html.contains("MDPDFMATHQ"));
}

#[tokio::test]
async fn existing_output_is_overwritten() {
    let ws = Workspace::new("text\n");
    std::fs::write(ws.path("PROJECT_REPORT.pdf"), b"stale").unwrap();
    let config = ws
        .builder(ScriptedEngine::new(Script::Typesets))
        .build()
        .unwrap();

    convert(&config).await.unwrap();

    assert_eq!(std::fs::read(ws.path("PROJECT_REPORT.pdf")).unwrap(), FAKE_PDF);
    assert!(!ws.path("PROJECT_REPORT.pdf.tmp").exists());
}

#[tokio::test]
async fn progress_events_follow_the_pipeline() {
    let ws = Workspace::new("\\[a\\]\n");
    let log = Arc::new(EventLog::default());
    let config = ws
        .builder(ScriptedEngine::new(Script::Typesets))
        .progress_callback(log.clone())
        .build()
        .unwrap();

    convert(&config).await.unwrap();

    assert_eq!(
        *log.stages.lock().unwrap(),
        vec![
            Stage::ReadInput,
            Stage::LoadImages,
            Stage::IsolateMath,
            Stage::RenderMarkdown,
            Stage::RestoreMath,
            Stage::InlineImages,
            Stage::Assemble,
            Stage::RenderPdf,
            Stage::WriteOutput,
        ]
    );
    assert_eq!(
        *log.states.lock().unwrap(),
        vec![
            TypesetState::NotLoaded,
            TypesetState::Loaded,
            TypesetState::Complete
        ]
    );
    assert_eq!(*log.fidelity.lock().unwrap(), Some(Fidelity::Full));
}
