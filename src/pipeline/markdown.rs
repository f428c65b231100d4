//! Markdown → HTML via comrak.
//!
//! GFM tables, strikethrough, autolinks and task lists are enabled, single
//! newlines become `<br />`, and raw HTML passes through untouched so
//! hand-written `<img>` tags and pre-inlined images survive. The tag filter
//! is off for the same reason.

use crate::error::Md2PdfError;
use comrak::options::Options;
use comrak::{format_html, parse_document, Arena};

/// Renderer options used for every report.
pub(crate) fn default_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;

    let render = &mut options.render;
    render.hardbreaks = true;
    render.github_pre_lang = true;
    render.r#unsafe = true;

    options
}

/// Render Markdown text to an HTML fragment.
pub fn render_markdown(text: &str) -> Result<String, Md2PdfError> {
    let options = default_options();
    let arena = Arena::new();
    let root = parse_document(&arena, text, &options);

    let mut html = String::new();
    format_html(root, &options, &mut html)
        .map_err(|err| Md2PdfError::MarkdownRender(err.to_string()))?;
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_gfm_table() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n").unwrap();
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn single_newline_is_a_hard_break() {
        let html = render_markdown("line one\nline two\n").unwrap();
        assert!(html.contains("<br />"), "got: {html}");
    }

    #[test]
    fn placeholder_token_survives_untouched() {
        let html = render_markdown("before\n\nMDPDFMATHQD0QEND\n\nafter MDPDFMATHQI1QEND.\n").unwrap();
        assert!(html.contains("<p>MDPDFMATHQD0QEND</p>"), "got: {html}");
        assert!(html.contains("after MDPDFMATHQI1QEND."));
    }

    #[test]
    fn raw_html_passes_through() {
        let html = render_markdown("<img src=\"data:image/png;base64,AA==\" alt=\"x\" />\n").unwrap();
        assert!(html.contains("data:image/png;base64,AA=="));
    }

    #[test]
    fn image_syntax_keeps_file_reference() {
        let html = render_markdown("![chart](missing.png)\n").unwrap();
        assert!(html.contains(r#"src="missing.png""#), "got: {html}");
        assert!(html.contains(r#"alt="chart""#));
    }
}
