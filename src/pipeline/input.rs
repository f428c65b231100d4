//! Input resolution: read the Markdown source into memory.
//!
//! Absence of the source is the only fatal input condition. The file is
//! read once, decoded as UTF-8, and a leading byte-order mark is dropped so
//! it cannot leak into the first heading.

use crate::error::Md2PdfError;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Read and decode the Markdown source at `path`.
pub async fn read_markdown(path: &Path) -> Result<String, Md2PdfError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => Md2PdfError::InputNotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => Md2PdfError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Md2PdfError::InputReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let text = String::from_utf8(bytes).map_err(|e| Md2PdfError::InvalidUtf8 {
        path: path.to_path_buf(),
        offset: e.utf8_error().valid_up_to(),
    })?;

    let text = match text.strip_prefix('\u{FEFF}') {
        Some(rest) => rest.to_string(),
        None => text,
    };

    debug!("Read {} bytes of Markdown from {}", text.len(), path.display());
    Ok(text)
}
