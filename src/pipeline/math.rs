//! Math isolation and restoration around Markdown rendering.
//!
//! Markdown engines treat `\`, `_`, `*` and `{}` as syntax, which corrupts
//! LaTeX. Before rendering, [`isolate`] swaps every `\[...\]` and `\(...\)`
//! span for an opaque alphanumeric token; after rendering, [`restore`] swaps
//! each token back for the span in the delimiters MathJax is configured to
//! recognise.
//!
//! ## Token shape
//!
//! `MDPDFMATHQ` + `D`/`I` + index + `QEND`, e.g. `MDPDFMATHQD0QEND`.
//! Tokens are plain ASCII letters and digits so no Markdown rule touches
//! them, and the `QEND` terminator keeps token 1 from being a prefix of
//! token 10.
//!
//! ## Ordering
//!
//! Display math is extracted first, then inline math; indices run across
//! both passes in that order. Spans are kept as an ordered `Vec`, not a map,
//! because identical formulas may appear many times.

use crate::error::RenderWarning;
use crate::pipeline::literal_pattern;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Reserved prefix of every placeholder token.
pub const PLACEHOLDER_PREFIX: &str = "MDPDFMATHQ";
const PLACEHOLDER_SUFFIX: &str = "QEND";

static RE_DISPLAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\\\[(.*?)\\\]").unwrap());
static RE_INLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\\\((.*?)\\\)").unwrap());
static RE_ANY_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        "{}[DI][0-9]+{}",
        literal_pattern(PLACEHOLDER_PREFIX),
        literal_pattern(PLACEHOLDER_SUFFIX)
    ))
    .unwrap()
});
static RE_DISPLAY_PARAGRAPH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"<p>\s*({}D[0-9]+{})\s*</p>",
        literal_pattern(PLACEHOLDER_PREFIX),
        literal_pattern(PLACEHOLDER_SUFFIX)
    ))
    .unwrap()
});
static RE_TAG_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([A-Za-z!/?])").unwrap());

/// Display (`\[...\]`) or inline (`\(...\)`) math.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MathKind {
    Display,
    Inline,
}

impl MathKind {
    fn tag(self) -> char {
        match self {
            MathKind::Display => 'D',
            MathKind::Inline => 'I',
        }
    }
}

/// One isolated formula.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathSpan {
    pub kind: MathKind,
    /// Formula body with surrounding whitespace trimmed.
    pub raw_content: String,
    pub placeholder: String,
}

impl MathSpan {
    fn new(kind: MathKind, content: &str, index: usize) -> Self {
        Self {
            kind,
            raw_content: content.trim().to_string(),
            placeholder: format!("{PLACEHOLDER_PREFIX}{}{index}{PLACEHOLDER_SUFFIX}", kind.tag()),
        }
    }

    /// The formula in canonical delimiters.
    pub fn delimited(&self) -> String {
        match self.kind {
            MathKind::Display => format!("\\[{}\\]", self.raw_content),
            MathKind::Inline => format!("\\({}\\)", self.raw_content),
        }
    }

    /// [`Self::delimited`] made safe to splice into HTML.
    ///
    /// A `<` that would open a tag and every `"` are escaped, so the span is
    /// safe both as text and inside a quoted attribute such as `alt`. The
    /// browser decodes the entities, so MathJax sees the original characters.
    fn delimited_html(&self) -> String {
        RE_TAG_OPEN
            .replace_all(&self.delimited(), "&lt;$1")
            .replace('"', "&quot;")
    }
}

/// Output of [`isolate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isolated {
    /// Source with every math span replaced by its token.
    pub text: String,
    /// Spans in token-index order.
    pub spans: Vec<MathSpan>,
}

impl Isolated {
    pub fn count(&self, kind: MathKind) -> usize {
        self.spans.iter().filter(|s| s.kind == kind).count()
    }
}

/// Output of [`restore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub html: String,
    /// Dropped, duplicated or leftover placeholders.
    pub warnings: Vec<RenderWarning>,
}

/// Whether `text` already contains something shaped like a placeholder.
pub fn collides(text: &str) -> bool {
    text.contains(PLACEHOLDER_PREFIX)
}

/// Replace every math span in `text` with a unique placeholder.
///
/// Unterminated delimiters do not match and pass through unchanged.
/// Display math is surrounded by blank lines so the renderer gives its token
/// a paragraph of its own.
pub fn isolate(text: &str) -> Isolated {
    let mut spans: Vec<MathSpan> = Vec::new();

    let after_display = RE_DISPLAY.replace_all(text, |caps: &regex::Captures<'_>| {
        let span = MathSpan::new(MathKind::Display, &caps[1], spans.len());
        let token = format!("\n\n{}\n\n", span.placeholder);
        spans.push(span);
        token
    });

    let after_inline = RE_INLINE.replace_all(&after_display, |caps: &regex::Captures<'_>| {
        let span = MathSpan::new(MathKind::Inline, &caps[1], spans.len());
        let token = span.placeholder.clone();
        spans.push(span);
        token
    });

    debug!(
        "Isolated {} math span(s) ({} display)",
        spans.len(),
        spans.iter().filter(|s| s.kind == MathKind::Display).count()
    );

    Isolated {
        text: after_inline.into_owned(),
        spans,
    }
}

/// Put every span back into rendered HTML.
///
/// A display token the renderer wrapped as `<p>TOKEN</p>` is replaced
/// together with its paragraph tags. Inline tokens keep whatever markup
/// surrounds them. Every token is expected exactly once; anything else is
/// reported as a [`RenderWarning::PlaceholderMismatch`].
pub fn restore(html: &str, spans: &[MathSpan]) -> Restored {
    let mut warnings = Vec::new();

    for span in spans {
        let occurrences = html.matches(span.placeholder.as_str()).count();
        if occurrences != 1 {
            warn!(
                "Placeholder {} occurs {} time(s) in rendered HTML",
                span.placeholder, occurrences
            );
            warnings.push(RenderWarning::PlaceholderMismatch {
                placeholder: span.placeholder.clone(),
                occurrences,
            });
        }
    }

    let mut html = RE_DISPLAY_PARAGRAPH.replace_all(html, "$1").into_owned();
    for span in spans {
        html = html.replace(&span.placeholder, &span.delimited_html());
    }

    // Tokens the span list does not know about, e.g. from a colliding source.
    let leftover: Vec<String> = RE_ANY_TOKEN
        .find_iter(&html)
        .map(|m| m.as_str().to_string())
        .collect();
    if !leftover.is_empty() {
        warn!("{} unknown placeholder(s) left in HTML", leftover.len());
        warnings.extend(leftover.into_iter().map(|placeholder| {
            RenderWarning::PlaceholderMismatch {
                placeholder,
                occurrences: 0,
            }
        }));
    }

    Restored { html, warnings }
}
