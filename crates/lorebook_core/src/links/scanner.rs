//! Bracketed-reference scanning.
//!
//! # Responsibility
//! - Locate `[...]` spans in free text and flag spans that are markdown
//!   external links (`[label](url)`).
//! - Keep the matching strategy behind [`LinkScanner`] so callers never see
//!   the pattern itself.
//!
//! # Invariants
//! - Spans are returned in text order and never overlap.
//! - A span only starts with an alphanumeric character or the unresolved
//!   marker; `[~...]` and `[ ...]` are never spans.

use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;

const LINK_PATTERN: &str = r"\[([\p{L}\p{N}?][^\]~]*)\](\()?";

static LINK_RE: Lazy<Option<Regex>> = Lazy::new(|| match Regex::new(LINK_PATTERN) {
    Ok(re) => Some(re),
    Err(err) => {
        warn!("event=link_pattern_compile module=links status=error error={err}");
        None
    }
});

/// One bracketed span found in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpan {
    /// Byte offset of the opening bracket.
    pub start: usize,
    /// Byte offset just past the closing bracket.
    pub end: usize,
    /// Raw text between the brackets.
    pub inner: String,
    /// Span is immediately followed by `(`.
    pub external: bool,
}

/// Strategy for finding bracketed spans.
pub trait LinkScanner {
    /// Returns every span in `text`, or `None` when the scanner is unusable.
    fn scan(&self, text: &str) -> Option<Vec<LinkSpan>>;
}

/// Default scanner backed by a compiled-once regular expression.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexLinkScanner;

impl LinkScanner for RegexLinkScanner {
    fn scan(&self, text: &str) -> Option<Vec<LinkSpan>> {
        let re = LINK_RE.as_ref()?;
        let spans = re
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let inner = caps.get(1)?;
                let external = caps.get(2).is_some();
                // Inner group ends right before the closing bracket.
                let end = inner.end() + 1;
                Some(LinkSpan {
                    start: whole.start(),
                    end,
                    inner: inner.as_str().to_string(),
                    external,
                })
            })
            .collect();
        Some(spans)
    }
}
