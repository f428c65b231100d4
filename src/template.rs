//! Fixed document shell and browser-side scripts.
//!
//! Everything the browser sees that is not derived from the report lives
//! here: the print stylesheet, the MathJax bootstrap, and the probe scripts
//! the PDF engine evaluates while waiting for typesetting. Keeping them in
//! one module means a stylesheet tweak or a MathJax upgrade touches exactly
//! one file, and the tests below can assert on them without a browser.

/// Polyfill for older engines, served from Cloudflare's polyfill mirror.
pub const POLYFILL_URL: &str = "https://cdnjs.cloudflare.com/polyfill/v3/polyfill.min.js?features=es6";

/// MathJax 3 combined TeX input / CHTML output bundle.
pub const MATHJAX_URL: &str = "https://cdn.jsdelivr.net/npm/mathjax@3/es5/tex-mml-chtml.js";

/// Print-oriented stylesheet.
///
/// Page margins are also set on the PDF export itself; the `@page` rule
/// keeps the HTML preview in `temp.html` consistent with the PDF.
pub const PRINT_STYLESHEET: &str = r#"
        @page { margin: 2cm; }
        body {
            font-family: 'Times New Roman', serif;
            line-height: 1.6;
            max-width: 100%;
            padding: 20px;
        }
        h1, h2, h3, h4 { page-break-after: avoid; }
        img { max-width: 100%; height: auto; page-break-inside: avoid; margin: 10px 0; display: block; }
        pre { page-break-inside: avoid; overflow-x: auto; background-color: #f4f4f4; padding: 10px; }
        code { font-family: 'Courier New', monospace; background-color: #f4f4f4; padding: 2px 4px; }
        pre code { padding: 0; }
        table { border-collapse: collapse; width: 100%; margin: 1em 0; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        th { background-color: #f2f2f2; }
        blockquote { border-left: 4px solid #ddd; margin-left: 0; padding-left: 20px; }
        p { margin: 0.5em 0; }
"#;

/// MathJax configuration; must run before the MathJax bundle loads.
///
/// Inline: `$...$`, `\(...\)`. Display: `$$...$$`, `\[...\]`.
pub const MATHJAX_CONFIG: &str = r#"
        window.MathJax = {
            tex: {
                inlineMath: [['$', '$'], ['\\(', '\\)']],
                displayMath: [['$$', '$$'], ['\\[', '\\]']],
                processEscapes: true,
                processEnvironments: true
            },
            options: {
                skipHtmlTags: ['script', 'noscript', 'style', 'textarea', 'pre', 'code']
            }
        };
"#;

/// Evaluates to `true` once the MathJax bundle has replaced the config
/// object with the real API.
///
/// `window.MathJax` alone is not enough: the config script defines it
/// before the bundle has loaded.
pub const MATHJAX_LOADED_PROBE: &str = "typeof window.MathJax === 'object' \
     && window.MathJax !== null \
     && typeof window.MathJax.typesetPromise === 'function'";

/// Runs a full typeset pass; resolves to `true` when it settles.
pub const MATHJAX_TYPESET: &str = "window.MathJax.typesetPromise().then(() => true)";

/// Wrap an HTML body in the complete standalone document.
pub fn document_shell(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <style>{PRINT_STYLESHEET}    </style>
    <script>{MATHJAX_CONFIG}    </script>
    <script src="{POLYFILL_URL}"></script>
    <script id="MathJax-script" async src="{MATHJAX_URL}"></script>
</head>
<body>
{body}
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_declares_both_delimiter_families() {
        assert!(MATHJAX_CONFIG.contains(r"['\\(', '\\)']"));
        assert!(MATHJAX_CONFIG.contains(r"['\\[', '\\]']"));
        assert!(MATHJAX_CONFIG.contains("['$', '$']"));
        assert!(MATHJAX_CONFIG.contains("['$$', '$$']"));
    }

    #[test]
    fn config_skips_code_and_pre() {
        let skip = MATHJAX_CONFIG
            .lines()
            .find(|l| l.contains("skipHtmlTags"))
            .expect("skipHtmlTags line");
        for tag in ["script", "style", "code", "pre"] {
            assert!(skip.contains(&format!("'{tag}'")), "missing {tag}");
        }
    }

    #[test]
    fn stylesheet_has_print_rules() {
        assert!(PRINT_STYLESHEET.contains("@page { margin: 2cm; }"));
        assert!(PRINT_STYLESHEET.contains("page-break-after: avoid"));
        assert!(PRINT_STYLESHEET.contains("border-collapse: collapse"));
    }

    #[test]
    fn config_precedes_bundle() {
        let doc = document_shell("<p>hi</p>");
        let config_at = doc.find("window.MathJax = {").unwrap();
        let bundle_at = doc.find(MATHJAX_URL).unwrap();
        assert!(config_at < bundle_at);
        assert!(doc.contains("<body>\n<p>hi</p>\n</body>"));
    }
}
