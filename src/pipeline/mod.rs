//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! Each submodule implements exactly one transformation step. Data flows
//! strictly forward; no stage re-enters an earlier one.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ math::isolate ──▶ markdown ──▶ math::restore ──▶ images ──▶ assemble ──▶ pdf
//! (read)    (placeholders)    (comrak)     (delimiters)      (data-URI) (shell)      │
//!                                                                       typeset ◀────┘
//! ```
//!
//! 1. [`input`]    — read the Markdown source; the only fatal input check
//! 2. [`math`]     — swap `\[...\]` / `\(...\)` for opaque tokens so the
//!    Markdown engine cannot mangle backslashes and underscores, then put
//!    them back after rendering
//! 3. [`markdown`] — GFM rendering with hard line breaks
//! 4. [`images`]   — embed allow-listed local images as data-URIs
//! 5. [`assemble`] — wrap the body in the print shell with MathJax bootstrap
//! 6. [`typeset`]  — bounded `NotLoaded → Loaded → Complete` wait
//! 7. [`pdf`]      — drive headless Chromium and export A4 PDF

pub mod assemble;
pub mod images;
pub mod input;
pub mod markdown;
pub mod math;
pub mod pdf;
pub mod typeset;

/// Escape literal text so it can be embedded in a regex pattern.
///
/// File names carry `.` and math tokens may one day carry other
/// metacharacters; every pattern built from data goes through here.
pub fn literal_pattern(text: &str) -> String {
    regex::escape(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn dot_is_not_a_wildcard() {
        let re = Regex::new(&literal_pattern("md1_lambda_0.5.png")).unwrap();
        assert!(re.is_match("md1_lambda_0.5.png"));
        assert!(!re.is_match("md1_lambda_0x5Xpng"));
    }

    #[test]
    fn escapes_every_metacharacter() {
        let nasty = r"a.b*c+d?e(f)g[h]i{j}k|l^m$n\o";
        let re = Regex::new(&format!("^{}$", literal_pattern(nasty))).unwrap();
        assert!(re.is_match(nasty));
    }
}
