//! Image inlining: allow-listed local files → base64 data-URIs.
//!
//! Embedding the images makes the assembled HTML self-contained, so the
//! browser never touches the filesystem for them and `temp.html` can be
//! opened from anywhere. Only a fixed allow-list is considered; files on
//! that list that do not exist are skipped silently and references to them
//! are left exactly as written.
//!
//! Two rewrite variants exist:
//!
//! * [`inline_markdown`] turns `![alt](file)` into an `<img>` tag before
//!   Markdown rendering.
//! * [`inline_html`] rewrites `src="file"` / `href="file"` attributes in
//!   rendered HTML. This is the default, because it also covers raw HTML
//!   the author wrote by hand.

use crate::pipeline::literal_pattern;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::{Captures, Regex};
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, warn};

/// One allow-listed image that was found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub file_name: String,
    /// MIME subtype, taken from the file extension.
    pub mime_ext: String,
    pub data_uri: String,
}

impl ImageAsset {
    /// Build an asset from raw file bytes.
    pub fn from_bytes(file_name: &str, bytes: &[u8]) -> Self {
        let mime_ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| "png".to_string());
        let data_uri = format!("data:image/{};base64,{}", mime_ext, STANDARD.encode(bytes));
        Self {
            file_name: file_name.to_string(),
            mime_ext,
            data_uri,
        }
    }
}

/// Result of loading the allow-list.
#[derive(Debug, Clone, Default)]
pub struct ImageCatalog {
    pub assets: Vec<ImageAsset>,
    /// Allow-listed names that were not on disk.
    pub missing: Vec<String>,
}

/// Read every allow-listed file under `dir`.
///
/// Missing files are recorded in [`ImageCatalog::missing`] and never fail
/// the run. Files that exist but cannot be read are skipped with a warning.
pub async fn load_assets(dir: &Path, names: &[String]) -> ImageCatalog {
    let mut catalog = ImageCatalog::default();

    for name in names {
        let path = dir.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                debug!("Loaded image {} ({} bytes)", name, bytes.len());
                catalog.assets.push(ImageAsset::from_bytes(name, &bytes));
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Image {} not present, leaving references as-is", name);
                catalog.missing.push(name.clone());
            }
            Err(e) => {
                warn!("Skipping unreadable image {}: {}", path.display(), e);
                catalog.missing.push(name.clone());
            }
        }
    }

    catalog
}

/// Rewrite `![alt](file)` references in Markdown into data-URI `<img>` tags.
///
/// Returns the new text and the number of references replaced. The alt
/// text is attribute-escaped so the parsed `alt` equals the original.
pub fn inline_markdown(text: &str, assets: &[ImageAsset]) -> (String, usize) {
    let mut text = text.to_string();
    let mut replaced = 0;

    for asset in assets {
        let Ok(re) = Regex::new(&format!(
            r"!\[([^\]]*)\]\(\s*{}\s*\)",
            literal_pattern(&asset.file_name)
        )) else {
            continue;
        };
        text = re
            .replace_all(&text, |caps: &Captures<'_>| {
                replaced += 1;
                format!(
                    r#"<img src="{}" alt="{}" style="max-width: 100%; height: auto; margin: 10px 0;" />"#,
                    asset.data_uri,
                    html_escape::encode_double_quoted_attribute(&caps[1])
                )
            })
            .into_owned();
    }

    (text, replaced)
}

/// Rewrite `src=` / `href=` attributes pointing at allow-listed files.
///
/// Both quote styles are matched; the attribute is re-emitted with double
/// quotes. A file is recognised under every form it can take in rendered
/// HTML (see [`reference_forms`]). Returns the new HTML and the number of
/// attributes replaced.
pub fn inline_html(html: &str, assets: &[ImageAsset]) -> (String, usize) {
    let mut html = html.to_string();
    let mut replaced = 0;

    for asset in assets {
        let forms = reference_forms(&asset.file_name)
            .iter()
            .map(|f| literal_pattern(f))
            .collect::<Vec<_>>()
            .join("|");
        let Ok(re) = Regex::new(&format!(
            r#"\b(src|href)\s*=\s*(?:"(?:{forms})"|'(?:{forms})')"#
        )) else {
            continue;
        };
        html = re
            .replace_all(&html, |caps: &Captures<'_>| {
                replaced += 1;
                format!(r#"{}="{}""#, &caps[1], asset.data_uri)
            })
            .into_owned();
    }

    (html, replaced)
}

/// Spellings of `file_name` inside an HTML attribute.
///
/// Hand-written HTML keeps the name as typed or attribute-escaped. The
/// Markdown renderer percent-encodes link destinations and then escapes
/// `&` and `'`, so `état.png` becomes `%C3%A9tat.png`.
fn reference_forms(file_name: &str) -> Vec<String> {
    let mut forms = vec![file_name.to_string()];
    for form in [
        html_escape::encode_double_quoted_attribute(file_name).into_owned(),
        href_form(file_name),
    ] {
        if !forms.contains(&form) {
            forms.push(form);
        }
    }
    forms
}

/// Link destination as the Markdown renderer writes it into `src`/`href`.
fn href_form(file_name: &str) -> String {
    let mut out = String::with_capacity(file_name.len());
    match comrak::html::escape_href(&mut out, file_name, false) {
        Ok(()) => out,
        Err(_) => file_name.to_string(),
    }
}
