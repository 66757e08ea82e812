//! Slug derivation for titles.

/// Derive a URL slug from a title.
///
/// The title is lowercased and every run of characters that are not ASCII
/// letters or digits collapses into a single `-`. Leading and trailing
/// hyphens are dropped, so `"  Intro: Pitch Decks!"` becomes
/// `"intro-pitch-decks"`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(ch);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(slugify("Product -- Market   Fit"), "product-market-fit");
    }

    #[test]
    fn trims_edges() {
        assert_eq!(slugify("  Intro: Pitch Decks!"), "intro-pitch-decks");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn keeps_digits() {
        assert_eq!(slugify("Week 1 / Day 2"), "week-1-day-2");
    }

    #[test]
    fn drops_non_ascii_letters() {
        assert_eq!(slugify("Café Società"), "caf-societ");
    }

    #[test]
    fn titles_differing_only_in_punctuation_collide() {
        assert_eq!(slugify("Fundraising 101"), slugify("fundraising: 101!"));
    }
}
