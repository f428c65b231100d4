//! PDF export through headless Chromium.
//!
//! ## Why a trait?
//!
//! [`PdfEngine`] is the seam between the pure text pipeline and the
//! browser. The default [`ChromiumEngine`] drives Chrome over the DevTools
//! protocol via `chromiumoxide`; tests and embedders can inject their own
//! engine through [`crate::config::ConversionConfigBuilder::engine`].
//!
//! ## Lifecycle
//!
//! The browser is launched per document and closed unconditionally before
//! `render` returns, including when page load or export fails. The
//! DevTools event handler runs on its own task for the lifetime of the
//! browser and is aborted after close.

use crate::config::{PageSettings, TypesetPolicy};
use crate::error::{Md2PdfError, RenderWarning};
use crate::output::RenderOutcome;
use crate::pipeline::typeset::{wait_for_typeset, DocumentPage, TypesetState};
use crate::progress::ProgressCallback;
use crate::template::{MATHJAX_LOADED_PROBE, MATHJAX_TYPESET};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Everything an engine needs to render one assembled document.
#[derive(Clone, Copy)]
pub struct RenderRequest<'a> {
    /// The assembled HTML on disk.
    pub document: &'a Path,
    pub page: &'a PageSettings,
    pub typeset: &'a TypesetPolicy,
    pub progress: Option<&'a ProgressCallback>,
}

/// Turns an assembled HTML document into PDF bytes.
#[async_trait]
pub trait PdfEngine: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Render the document. Must not panic; every failure is a
    /// [`RenderOutcome::Failure`].
    async fn render(&self, request: RenderRequest<'_>) -> RenderOutcome;
}

/// Wait for typesetting on a loaded page, then print it.
///
/// This is the engine-independent half of rendering: a timed-out or failed
/// typeset still prints, and yields [`RenderOutcome::Degraded`].
pub async fn export(page: &dyn DocumentPage, request: RenderRequest<'_>) -> RenderOutcome {
    let report = wait_for_typeset(page, request.typeset, request.progress).await;

    let pdf = match page.print_pdf(request.page).await {
        Ok(pdf) => pdf,
        Err(e) => return RenderOutcome::Failure(e),
    };
    debug!("Printed {} bytes of PDF", pdf.len());

    if report.state == TypesetState::Complete && report.warnings.is_empty() {
        RenderOutcome::Success(pdf)
    } else {
        RenderOutcome::Degraded(pdf, report.warnings)
    }
}

/// Map page settings onto the DevTools print parameters.
pub fn print_params(page: &PageSettings) -> PrintToPdfParams {
    let m = page.margins_cm;
    PrintToPdfParams {
        landscape: Some(false),
        display_header_footer: Some(false),
        print_background: Some(page.print_background),
        scale: Some(1.0),
        paper_width: Some(page.width_in),
        paper_height: Some(page.height_in),
        margin_top: Some(PageSettings::cm_to_in(m.top)),
        margin_bottom: Some(PageSettings::cm_to_in(m.bottom)),
        margin_left: Some(PageSettings::cm_to_in(m.left)),
        margin_right: Some(PageSettings::cm_to_in(m.right)),
        prefer_css_page_size: Some(false),
        ..Default::default()
    }
}

// ── Chromium ─────────────────────────────────────────────────────────────

const CHROME_ARGS: [&str; 4] = [
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--disable-extensions",
];

/// Headless Chrome/Chromium via the DevTools protocol.
#[derive(Debug, Clone, Default)]
pub struct ChromiumEngine {
    executable: Option<PathBuf>,
}

impl ChromiumEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific Chrome binary instead of searching for one.
    pub fn with_executable(path: impl Into<PathBuf>) -> Self {
        Self {
            executable: Some(path.into()),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, Md2PdfError> {
        let mut builder = BrowserConfig::builder().no_sandbox().args(CHROME_ARGS);
        if let Some(ref exe) = self.executable {
            builder = builder.chrome_executable(exe);
        }
        builder.build().map_err(Md2PdfError::BrowserLaunchFailed)
    }

    /// Open the document in a fresh page and run [`export`] on it.
    async fn render_in(&self, browser: &Browser, request: RenderRequest<'_>) -> RenderOutcome {
        let path = match tokio::fs::canonicalize(request.document).await {
            Ok(p) => p,
            Err(e) => {
                return RenderOutcome::Failure(Md2PdfError::PageLoadFailed {
                    path: request.document.to_path_buf(),
                    detail: e.to_string(),
                })
            }
        };
        let url = format!("file://{}", path.display());

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                return RenderOutcome::Failure(Md2PdfError::PageLoadFailed {
                    path,
                    detail: e.to_string(),
                })
            }
        };

        // Navigation waits for the load event, which includes the CDN
        // scripts. Bound it by the load timeout and carry on regardless.
        let mut load_warning = None;
        match timeout(request.typeset.load_timeout, page.goto(url.as_str())).await {
            Ok(Ok(_)) => debug!("Loaded {}", url),
            Ok(Err(e)) => {
                return RenderOutcome::Failure(Md2PdfError::PageLoadFailed {
                    path,
                    detail: e.to_string(),
                })
            }
            Err(_) => {
                warn!("Page load still pending after {:?}", request.typeset.load_timeout);
                load_warning = Some(RenderWarning::PageLoadTimedOut {
                    secs: request.typeset.load_timeout.as_secs(),
                });
            }
        }

        let outcome = export(&ChromiumPage { page: &page }, request).await;
        match (outcome, load_warning) {
            (RenderOutcome::Success(pdf), Some(w)) => RenderOutcome::Degraded(pdf, vec![w]),
            (RenderOutcome::Degraded(pdf, mut warnings), Some(w)) => {
                warnings.insert(0, w);
                RenderOutcome::Degraded(pdf, warnings)
            }
            (outcome, _) => outcome,
        }
    }
}

#[async_trait]
impl PdfEngine for ChromiumEngine {
    fn name(&self) -> &str {
        "chromium"
    }

    async fn render(&self, request: RenderRequest<'_>) -> RenderOutcome {
        let config = match self.browser_config() {
            Ok(c) => c,
            Err(e) => return RenderOutcome::Failure(e),
        };

        let (mut browser, mut handler) = match Browser::launch(config).await {
            Ok(pair) => pair,
            Err(e) => {
                return RenderOutcome::Failure(Md2PdfError::BrowserLaunchFailed(e.to_string()))
            }
        };
        info!("Launched headless browser");

        let handle = tokio::spawn(async move { while handler.next().await.is_some() {} });

        let outcome = self.render_in(&browser, request).await;

        if let Err(e) = browser.close().await {
            warn!("Browser close failed: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("Browser wait failed: {}", e);
        }
        handle.abort();
        debug!("Browser released");

        outcome
    }
}

/// [`DocumentPage`] over a live DevTools page.
struct ChromiumPage<'a> {
    page: &'a Page,
}

#[async_trait]
impl DocumentPage for ChromiumPage<'_> {
    async fn math_engine_loaded(&self) -> Result<bool, Md2PdfError> {
        let result = self
            .page
            .evaluate(MATHJAX_LOADED_PROBE)
            .await
            .map_err(|e| Md2PdfError::Internal(format!("probe failed: {e}")))?;
        result
            .into_value::<bool>()
            .map_err(|e| Md2PdfError::Internal(format!("probe returned non-bool: {e}")))
    }

    async fn typeset(&self) -> Result<(), Md2PdfError> {
        self.page
            .evaluate(MATHJAX_TYPESET)
            .await
            .map(|_| ())
            .map_err(|e| Md2PdfError::Internal(format!("typesetPromise rejected: {e}")))
    }

    async fn print_pdf(&self, page: &PageSettings) -> Result<Vec<u8>, Md2PdfError> {
        self.page
            .pdf(print_params(page))
            .await
            .map_err(|e| Md2PdfError::PdfExportFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::typeset::tests::{fast_policy, ScriptedPage, TypesetBehaviour};

    fn request<'a>(page: &'a PageSettings, policy: &'a TypesetPolicy) -> RenderRequest<'a> {
        RenderRequest {
            document: Path::new("temp.html"),
            page,
            typeset: policy,
            progress: None,
        }
    }

    #[tokio::test]
    async fn typeset_page_exports_success() {
        let (page, policy) = (PageSettings::a4(), fast_policy());
        let doc = ScriptedPage::new(Some(1), TypesetBehaviour::Resolve);
        let outcome = export(&doc, request(&page, &policy)).await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn missing_math_engine_still_exports_pdf() {
        let (page, policy) = (PageSettings::a4(), fast_policy());
        let doc = ScriptedPage::new(None, TypesetBehaviour::Resolve);
        match export(&doc, request(&page, &policy)).await {
            RenderOutcome::Degraded(pdf, warnings) => {
                assert!(!pdf.is_empty());
                assert!(matches!(
                    warnings[..],
                    [RenderWarning::MathEngineNotLoaded { .. }]
                ));
            }
            other => panic!("expected Degraded, got {other:?}"),
        }
    }

    #[test]
    fn a4_print_params() {
        let params = print_params(&PageSettings::a4());
        assert_eq!(params.paper_width, Some(8.27));
        assert_eq!(params.paper_height, Some(11.69));
        assert_eq!(params.print_background, Some(true));
        let margin = params.margin_left.unwrap();
        assert!((margin - 2.0 / 2.54).abs() < 1e-9);
        assert_eq!(params.margin_top, params.margin_bottom);
    }

    #[test]
    fn browser_config_builds_with_explicit_executable() {
        let engine = ChromiumEngine::with_executable("/usr/bin/chromium");
        assert!(engine.browser_config().is_ok());
        assert_eq!(engine.name(), "chromium");
    }
}
