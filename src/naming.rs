//! Slug normalization for collections and images.
//!
//! Every collection and image in the manifest is addressed by a slug derived
//! from the stable CMS identifier (`uid`), falling back to the document id.
//! Slugs end up in URLs and in derivative file paths, so they are reduced to
//! lowercase ASCII alphanumerics separated by single dashes:
//!
//! - `"Linee di Ombra"` → `linee-di-ombra`
//! - `"Città  Eterna!"` → `citta-eterna`
//! - `"---"` with fallback `"XyZ_123"` → `xyz-123`
//! - `""` with fallback `""` → `asset`
//!
//! Within one collection, [`SlugRegistry`] appends `-2`, `-3`, … on collision.
//! Collections each get their own registry; the same image slug may appear in
//! several collections.

use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Used when neither the value nor the fallback produce any slug characters.
pub const SLUG_SENTINEL: &str = "asset";

/// Normalize `value` into a slug, falling back to `fallback`, then to [`SLUG_SENTINEL`].
pub fn slugify(value: Option<&str>, fallback: &str) -> String {
    let candidate = normalize_segment(value.unwrap_or_default());
    if !candidate.is_empty() {
        return candidate;
    }
    let fallback = normalize_segment(fallback);
    if !fallback.is_empty() {
        return fallback;
    }
    SLUG_SENTINEL.to_string()
}

/// Strip diacritics, collapse non-alphanumeric runs to `-`, trim dashes, lowercase.
fn normalize_segment(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for c in value.trim().nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Tracks the slugs already handed out inside one collection.
#[derive(Debug, Default)]
pub struct SlugRegistry {
    used: HashSet<String>,
}

impl SlugRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `base`, or the first free `base-N` (N ≥ 2) if it is taken.
    pub fn claim(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut index = 2;
        loop {
            let candidate = format!("{base}-{index}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            index += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // slugify
    // =========================================================================

    #[test]
    fn lowercases_and_dashes_spaces() {
        assert_eq!(slugify(Some("Linee di Ombra"), "id"), "linee-di-ombra");
    }

    #[test]
    fn strips_diacritics() {
        assert_eq!(slugify(Some("Città Eterna"), "id"), "citta-eterna");
        assert_eq!(slugify(Some("Crème brûlée"), "id"), "creme-brulee");
    }

    #[test]
    fn collapses_runs_of_separators() {
        assert_eq!(slugify(Some("a -- b__c!!d"), "id"), "a-b-c-d");
    }

    #[test]
    fn trims_leading_and_trailing_separators() {
        assert_eq!(slugify(Some("  --Alba--  "), "id"), "alba");
    }

    #[test]
    fn keeps_digits() {
        assert_eq!(slugify(Some("work-01"), "id"), "work-01");
    }

    #[test]
    fn empty_value_uses_fallback() {
        assert_eq!(slugify(Some("!!!"), "XyZ_123"), "xyz-123");
        assert_eq!(slugify(None, "ZqP9aBc"), "zqp9abc");
    }

    #[test]
    fn empty_value_and_fallback_uses_sentinel() {
        assert_eq!(slugify(None, ""), SLUG_SENTINEL);
        assert_eq!(slugify(Some("  "), "-- --"), SLUG_SENTINEL);
    }

    #[test]
    fn non_latin_only_uses_fallback() {
        assert_eq!(slugify(Some("東京"), "tokyo-doc"), "tokyo-doc");
    }

    #[test]
    fn slugify_is_idempotent() {
        let once = slugify(Some("Über  Straße 5"), "x");
        assert_eq!(slugify(Some(&once), "x"), once);
    }

    // =========================================================================
    // SlugRegistry
    // =========================================================================

    #[test]
    fn first_claim_is_unchanged() {
        let mut reg = SlugRegistry::new();
        assert_eq!(reg.claim("foo"), "foo");
    }

    #[test]
    fn collisions_get_numeric_suffix() {
        let mut reg = SlugRegistry::new();
        assert_eq!(reg.claim("foo"), "foo");
        assert_eq!(reg.claim("foo"), "foo-2");
        assert_eq!(reg.claim("foo"), "foo-3");
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn suffix_skips_slugs_already_taken() {
        let mut reg = SlugRegistry::new();
        reg.claim("foo-2");
        reg.claim("foo");
        assert_eq!(reg.claim("foo"), "foo-3");
    }

    #[test]
    fn registries_are_independent() {
        let mut a = SlugRegistry::new();
        let mut b = SlugRegistry::new();
        assert_eq!(a.claim("alba"), "alba");
        assert_eq!(b.claim("alba"), "alba");
    }
}
