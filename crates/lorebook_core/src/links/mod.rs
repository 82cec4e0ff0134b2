//! Cross-reference extraction and rendering.
//!
//! # Responsibility
//! - Turn `[Entry Name]` markup in descriptions into target slugs.
//! - Mark references to missing entries as `[?Entry Name]` and unmark them
//!   once the target exists.
//!
//! # Invariants
//! - Rendering is a fixed point: rendering already-rendered text against the
//!   same existence predicate returns it unchanged.
//! - Extracted slugs are unique and ordered by first occurrence.
//! - External markdown links `[label](url)` and decorative `[~...]` spans are
//!   never references and are never rewritten.
//! - When the scanner is unavailable the text is returned unmodified with no
//!   references.

pub mod graph;
pub mod scanner;

use crate::model::slug::slugify;
use scanner::{LinkScanner, RegexLinkScanner};

/// Prefix marking a reference whose target did not exist when last rendered.
pub const UNRESOLVED_MARKER: char = '?';
/// Prefix marking a bracketed span that is decoration, not a reference.
pub const DECORATIVE_MARKER: char = '~';

/// Output of [`LinkExtractor::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLinks {
    /// Text with unresolved markers added or removed.
    pub text: String,
    /// Referenced slugs in first-occurrence order.
    pub links: Vec<String>,
}

/// Extracts and renders entry references using a pluggable scanner.
#[derive(Debug, Clone, Default)]
pub struct LinkExtractor<S = RegexLinkScanner> {
    scanner: S,
}

impl LinkExtractor<RegexLinkScanner> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: LinkScanner> LinkExtractor<S> {
    pub fn with_scanner(scanner: S) -> Self {
        Self { scanner }
    }

    /// Returns the slugs referenced by `text`.
    pub fn extract(&self, text: &str) -> Vec<String> {
        self.process(text, None).links
    }

    /// Rewrites unresolved markers in `text` according to `exists`.
    pub fn render<F>(&self, text: &str, exists: F) -> RenderedLinks
    where
        F: Fn(&str) -> bool,
    {
        let exists: &dyn Fn(&str) -> bool = &exists;
        self.process(text, Some(exists))
    }

    fn process(&self, text: &str, exists: Option<&dyn Fn(&str) -> bool>) -> RenderedLinks {
        let Some(spans) = self.scanner.scan(text) else {
            return RenderedLinks {
                text: text.to_string(),
                links: Vec::new(),
            };
        };

        let mut rendered = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut links: Vec<String> = Vec::new();

        for span in spans {
            // The default scanner never yields `[~` spans; custom scanners may.
            if span.external || span.inner.starts_with(DECORATIVE_MARKER) {
                continue;
            }

            let cleaned = collapse_whitespace(&span.inner);
            let was_unresolved = cleaned.starts_with(UNRESOLVED_MARKER);
            let label = cleaned
                .trim_start_matches(|ch: char| ch == UNRESOLVED_MARKER || ch.is_whitespace())
                .trim_end();

            let id = slugify(label);
            if id.is_empty() {
                continue;
            }

            if let Some(exists) = exists {
                let replacement = match (exists(&id), was_unresolved) {
                    (true, true) => Some(format!("[{label}]")),
                    (false, false) => Some(format!("[{UNRESOLVED_MARKER}{label}]")),
                    _ => None,
                };
                if let Some(replacement) = replacement {
                    if let Some(before) = text.get(cursor..span.start) {
                        rendered.push_str(before);
                        rendered.push_str(&replacement);
                        cursor = span.end;
                    }
                }
            }

            if !links.contains(&id) {
                links.push(id);
            }
        }

        if let Some(rest) = text.get(cursor..) {
            rendered.push_str(rest);
        }

        RenderedLinks {
            text: rendered,
            links,
        }
    }
}

/// Returns the slugs referenced by `text` using the default scanner.
pub fn extract_links(text: &str) -> Vec<String> {
    LinkExtractor::new().extract(text)
}

/// Renders `text` against `exists` using the default scanner.
pub fn render_links<F>(text: &str, exists: F) -> RenderedLinks
where
    F: Fn(&str) -> bool,
{
    LinkExtractor::new().render(text, exists)
}

fn collapse_whitespace(value: &str) -> String {
    let mut collapsed = String::with_capacity(value.len());
    let mut previous_space = false;
    for ch in value.chars() {
        let ch = if matches!(ch, '\n' | '\r') { ' ' } else { ch };
        if ch == ' ' {
            if previous_space {
                continue;
            }
            previous_space = true;
        } else {
            previous_space = false;
        }
        collapsed.push(ch);
    }
    collapsed
}

#[cfg(test)]
mod tests {
    use super::scanner::{LinkScanner, LinkSpan};
    use super::{extract_links, render_links, LinkExtractor};

    fn only_exists(slug: &str) -> bool {
        slug == "exists"
    }

    #[test]
    fn duplicate_references_coalesce() {
        assert_eq!(extract_links("[Exists] [Exists]"), vec!["exists".to_string()]);
    }

    #[test]
    fn external_links_are_not_references() {
        assert!(extract_links("[Exists](http://x)").is_empty());
        let rendered = render_links("[Missing](http://x)", only_exists);
        assert_eq!(rendered.text, "[Missing](http://x)");
    }

    #[test]
    fn decorative_brackets_are_untouched() {
        assert!(extract_links("[~Not Exists]").is_empty());
        let rendered = render_links("a [~Not Exists] b", only_exists);
        assert_eq!(rendered.text, "a [~Not Exists] b");
    }

    #[test]
    fn missing_targets_get_marked() {
        let rendered = render_links("[Not Exists]", only_exists);
        assert_eq!(rendered.text, "[?Not Exists]");
        assert_eq!(rendered.links, vec!["not-exists".to_string()]);
    }

    #[test]
    fn resolved_targets_lose_marker() {
        let rendered = render_links("see [?Exists] now", only_exists);
        assert_eq!(rendered.text, "see [Exists] now");
        assert_eq!(rendered.links, vec!["exists".to_string()]);
    }

    #[test]
    fn already_marked_missing_target_is_unchanged() {
        let rendered = render_links("[?Gone]", only_exists);
        assert_eq!(rendered.text, "[?Gone]");
    }

    #[test]
    fn render_is_a_fixed_point() {
        let samples = [
            "[Exists] and [Not Exists] and [?Exists] and [?Other]",
            "multi\n[Not\nExists] line [Exists](http://x) [~deco]",
            "[Exists] [Exists] [exists] [?  Not   there]",
            "no links at all",
            "[] [?] [ x] unbalanced [Exists",
            "[??Exists] [??Other] [? ?Exists] [?? Other]",
        ];
        for sample in samples {
            let once = render_links(sample, only_exists);
            let twice = render_links(&once.text, only_exists);
            assert_eq!(once.text, twice.text, "render changed `{sample}` twice");
            assert_eq!(once.links, twice.links);
        }
    }

    #[test]
    fn repeated_markers_collapse_to_one() {
        let resolved = render_links("[??Exists]", only_exists);
        assert_eq!(resolved.text, "[Exists]");
        assert_eq!(resolved.links, vec!["exists".to_string()]);

        let missing = render_links("[??Other]", only_exists);
        assert_eq!(missing.text, "[??Other]");
        assert_eq!(missing.links, vec!["other".to_string()]);
    }

    struct TildeScanner;

    impl LinkScanner for TildeScanner {
        fn scan(&self, text: &str) -> Option<Vec<LinkSpan>> {
            Some(vec![LinkSpan {
                start: 0,
                end: text.len(),
                inner: text.trim_matches(|ch: char| ch == '[' || ch == ']').to_string(),
                external: false,
            }])
        }
    }

    #[test]
    fn decorative_spans_from_custom_scanners_are_skipped() {
        let extractor = LinkExtractor::with_scanner(TildeScanner);
        let rendered = extractor.render("[~Aside]", |_| false);
        assert_eq!(rendered.text, "[~Aside]");
        assert!(rendered.links.is_empty());
    }

    #[test]
    fn newlines_and_spaces_collapse_before_slugging() {
        let rendered = render_links("[Grand\n  Canyon]", |_| false);
        assert_eq!(rendered.text, "[?Grand Canyon]");
        assert_eq!(rendered.links, vec!["grand-canyon".to_string()]);
    }

    #[test]
    fn links_keep_first_occurrence_order() {
        assert_eq!(
            extract_links("[Beta] [Alpha] [beta]"),
            vec!["beta".to_string(), "alpha".to_string()]
        );
    }

    struct BrokenScanner;

    impl LinkScanner for BrokenScanner {
        fn scan(&self, _text: &str) -> Option<Vec<LinkSpan>> {
            None
        }
    }

    #[test]
    fn unusable_scanner_degrades_to_original_text() {
        let extractor = LinkExtractor::with_scanner(BrokenScanner);
        let rendered = extractor.render("[Not Exists]", |_| false);
        assert_eq!(rendered.text, "[Not Exists]");
        assert!(rendered.links.is_empty());
    }
}
