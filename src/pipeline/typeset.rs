//! Bounded wait for asynchronous math typesetting.
//!
//! MathJax loads from a CDN after the page itself, then typesets on its own
//! schedule. Printing before it finishes yields raw `\(...\)` text; waiting
//! forever hangs the run when the CDN is unreachable. The wait is therefore
//! an explicit three-state protocol with one timeout per transition:
//!
//! ```text
//! NotLoaded ──(load_timeout)──▶ Loaded ──(typeset_timeout)──▶ Complete
//! ```
//!
//! Hitting either bound stops the wait in the state reached so far and
//! records a [`RenderWarning`]; the caller exports the PDF regardless.

use crate::config::{PageSettings, TypesetPolicy};
use crate::error::{Md2PdfError, RenderWarning};
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// How far the math engine got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypesetState {
    /// The MathJax API is not available yet.
    NotLoaded,
    /// MathJax is loaded; typesetting has not settled.
    Loaded,
    /// The typeset pass resolved and the settle delay elapsed.
    Complete,
}

impl fmt::Display for TypesetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TypesetState::NotLoaded => "not loaded",
            TypesetState::Loaded => "loaded",
            TypesetState::Complete => "complete",
        })
    }
}

/// A loaded document page that can be probed, typeset and printed.
///
/// The Chromium engine implements this over a DevTools page; tests
/// implement it with scripted behaviour.
#[async_trait]
pub trait DocumentPage: Send + Sync {
    /// Whether the math engine's API is available.
    async fn math_engine_loaded(&self) -> Result<bool, Md2PdfError>;

    /// Run a full typeset pass and wait for it to resolve.
    async fn typeset(&self) -> Result<(), Md2PdfError>;

    /// Print the page to PDF bytes.
    async fn print_pdf(&self, page: &PageSettings) -> Result<Vec<u8>, Md2PdfError>;
}

/// Final state of the wait plus anything that went wrong on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypesetReport {
    pub state: TypesetState,
    pub warnings: Vec<RenderWarning>,
}

impl TypesetReport {
    fn stopped(state: TypesetState, warning: RenderWarning) -> Self {
        Self {
            state,
            warnings: vec![warning],
        }
    }
}

/// Drive `page` through `NotLoaded → Loaded → Complete` within `policy`.
///
/// Never fails: every problem becomes a warning in the report.
pub async fn wait_for_typeset(
    page: &dyn DocumentPage,
    policy: &TypesetPolicy,
    progress: Option<&ProgressCallback>,
) -> TypesetReport {
    let notify = |state: TypesetState| {
        if let Some(cb) = progress {
            cb.on_typeset_state(state);
        }
    };
    notify(TypesetState::NotLoaded);

    // ── NotLoaded → Loaded ───────────────────────────────────────────────
    match timeout(policy.load_timeout, poll_until_loaded(page, policy)).await {
        Ok(()) => {
            debug!("Math engine loaded");
            notify(TypesetState::Loaded);
        }
        Err(_) => {
            warn!(
                "Math engine not loaded after {:?}; exporting without typeset math",
                policy.load_timeout
            );
            return TypesetReport::stopped(
                TypesetState::NotLoaded,
                RenderWarning::MathEngineNotLoaded {
                    secs: policy.load_timeout.as_secs(),
                },
            );
        }
    }

    // ── Loaded → Complete ────────────────────────────────────────────────
    match timeout(policy.typeset_timeout, page.typeset()).await {
        Ok(Ok(())) => {
            sleep(policy.settle_delay).await;
            info!("Math typesetting complete");
            notify(TypesetState::Complete);
            TypesetReport {
                state: TypesetState::Complete,
                warnings: Vec::new(),
            }
        }
        Ok(Err(e)) => {
            warn!("Math typesetting failed: {}", e);
            TypesetReport::stopped(
                TypesetState::Loaded,
                RenderWarning::TypesetFailed {
                    detail: e.to_string(),
                },
            )
        }
        Err(_) => {
            warn!(
                "Math typesetting still running after {:?}; exporting anyway",
                policy.typeset_timeout
            );
            TypesetReport::stopped(
                TypesetState::Loaded,
                RenderWarning::TypesetTimedOut {
                    secs: policy.typeset_timeout.as_secs(),
                },
            )
        }
    }
}

/// Probe until the math engine reports loaded. Probe errors count as
/// "not yet"; the caller's timeout bounds the loop.
async fn poll_until_loaded(page: &dyn DocumentPage, policy: &TypesetPolicy) {
    loop {
        match page.math_engine_loaded().await {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => debug!("Math engine probe failed: {}", e),
        }
        sleep(policy.poll_interval).await;
    }
}
