//! Document assembly: HTML body → standalone printable document.

use crate::template::document_shell;
use tracing::debug;

/// Wrap the processed body in the print shell.
pub fn assemble(body: &str) -> String {
    let html = document_shell(body.trim_end());
    debug!("Assembled document: {} bytes", html.len());
    html
}
