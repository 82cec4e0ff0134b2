//! Entry identifier normalization.
//!
//! # Responsibility
//! - Derive the canonical identifier (slug) from a display name.
//!
//! # Invariants
//! - Output is lowercase and contains only alphanumerics and single hyphens.
//! - Output never starts or ends with a hyphen.
//! - The same input always yields the same slug.

/// Converts a free-form entry name into its canonical slug.
///
/// Runs of non-alphanumeric characters collapse into one hyphen, e.g.
/// `"Mount  St. Helens"` becomes `"mount-st-helens"`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::slugify;

    #[test]
    fn slug_lowercases_and_hyphenates() {
        assert_eq!(slugify("Not Exists"), "not-exists");
        assert_eq!(slugify("Mount  St. Helens"), "mount-st-helens");
    }

    #[test]
    fn slug_trims_leading_and_trailing_separators() {
        assert_eq!(slugify("  --Hello, World!-- "), "hello-world");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn slug_keeps_unicode_letters() {
        assert_eq!(slugify("Café Müller"), "café-müller");
    }
}
