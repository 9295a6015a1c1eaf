//! Slug normalization.
//!
//! Turning a candidate slug into a *unique* one is the slug registry's job
//! (probe + uniqueness constraint in the storage layer); this module only
//! owns the pure normalization step.

/// Normalize a name into a URL-safe token: lowercase ASCII alphanumerics
/// separated by single hyphens, no leading/trailing hyphen.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        // Non-ASCII or all-symbol names still need a probe base.
        slug.push_str("item");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(slugify("Blue Hoodie"), "blue-hoodie");
        assert_eq!(slugify("  Ankara   Dress 2 "), "ankara-dress-2");
        assert_eq!(slugify("Café au Lait!"), "caf-au-lait");
    }

    #[test]
    fn never_produces_an_empty_slug() {
        assert_eq!(slugify("***"), "item");
        assert_eq!(slugify(""), "item");
    }

    proptest! {
        /// Property: output is always non-empty, lowercase, and contains
        /// only `[a-z0-9-]` with no edge or doubled hyphens.
        #[test]
        fn output_is_url_safe(name in "\\PC{0,64}") {
            let slug = slugify(&name);
            prop_assert!(!slug.is_empty());
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }

        /// Property: slugify is idempotent.
        #[test]
        fn idempotent(name in "\\PC{0,64}") {
            let once = slugify(&name);
            prop_assert_eq!(slugify(&once), once);
        }
    }
}
