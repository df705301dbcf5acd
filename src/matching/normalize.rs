//! Title normalization and similarity
//!
//! Episode names and candidate titles are normalized identically before
//! they are compared.

/// Characters removed outright.
const STRIPPED: &[char] = &[
    ',', ';', ':', '!', '?', '\'', '"', '`', '´', '’', '‘', '“', '”', '„', '(', ')', '[', ']',
    '{', '}', '#', '*', '+', '|', '…',
];

/// Characters that separate words.
const SEPARATORS: &[char] = &['.', '-', '–', '—', '_', '/', '\\'];

/// Normalizes a title for comparison.
///
/// Lowercases, transliterates German umlauts and ß to ASCII digraphs, maps
/// `&` to "and", strips punctuation and joins the remaining words with
/// single dots. Normalizing an already normalized title returns it unchanged.
pub fn normalize_title(title: &str) -> String {
    let mut spaced = String::with_capacity(title.len());

    for c in title.to_lowercase().chars() {
        match c {
            'ä' => spaced.push_str("ae"),
            'ö' => spaced.push_str("oe"),
            'ü' => spaced.push_str("ue"),
            'ß' => spaced.push_str("ss"),
            '&' => spaced.push_str(" and "),
            c if STRIPPED.contains(&c) => {}
            c if SEPARATORS.contains(&c) || c.is_whitespace() => spaced.push(' '),
            c => spaced.push(c),
        }
    }

    spaced.split_whitespace().collect::<Vec<_>>().join(".")
}

/// Normalized Levenshtein similarity between 0.0 and 1.0.
///
/// Symmetric, and 1.0 for identical inputs.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Der Fall"), "der.fall");
        assert_eq!(normalize_title("Schöne Grüße aus Gießen"), "schoene.gruesse.aus.giessen");
        assert_eq!(normalize_title("Tom & Jerry"), "tom.and.jerry");
        assert_eq!(normalize_title("  Mord, Teil 2: Die Rache!  "), "mord.teil.2.die.rache");
        assert_eq!(normalize_title("Spider-Man (2002)"), "spider.man.2002");
        assert_eq!(normalize_title("ÄRGER"), "aerger");
        assert_eq!(normalize_title("...."), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for title in [
            "Der Fall",
            "Tatort: Schöne Grüße & Küsse (S01/E05)",
            "a.b..c",
            "  L'Été — Teil 3 / Finale ",
            "",
        ] {
            let once = normalize_title(title);
            assert_eq!(normalize_title(&once), once, "not idempotent for {title:?}");
        }
    }

    #[test]
    fn test_similarity_properties() {
        assert_eq!(string_similarity("der.fall", "der.fall"), 1.0);
        assert_eq!(
            string_similarity("der.fall", "die.falle"),
            string_similarity("die.falle", "der.fall")
        );
        assert!(string_similarity("der.fall", "die.falle") < 1.0);
        assert!(string_similarity("abc", "xyz") < 0.1);
    }
}
