//! Text normalisation shared by every matcher.
//!
//! Canonical form: lowercase ASCII letters and digits, words separated by a
//! single space, no leading or trailing whitespace. Diacritics are removed by
//! NFD decomposition followed by dropping combining marks, so `"ressuscité"`
//! and `"ressuscite"` normalise identically. Everything else (punctuation,
//! apostrophes, symbols, non-Latin scripts) becomes a word separator.
//!
//! Because the output is pure ASCII, byte offsets and character offsets into
//! a normalised string coincide; the matchers rely on this when they report
//! how many characters of a buffer a match consumed.

pub mod distance;

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Normalise `text` into canonical token form.
///
/// Total and idempotent: `normalize(&normalize(s)) == normalize(s)` for every
/// input, including empty and non-Latin strings.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;

    for c in lowered.nfd() {
        if is_combining_mark(c) {
            continue;
        }
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }

    out
}

/// Normalise `text` and split it into words.
///
/// Empty input yields an empty vector, never `[""]`.
pub fn to_words(text: &str) -> Vec<String> {
    let normalized = normalize(text);
    words(&normalized).map(str::to_owned).collect()
}

/// Split an already-normalised string into words without allocating.
pub fn words(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split(' ').filter(|w| !w.is_empty())
}

/// Length of `words` joined by single spaces.
pub fn joined_len<S: AsRef<str>>(words: &[S]) -> usize {
    if words.is_empty() {
        return 0;
    }
    words.iter().map(|w| w.as_ref().len()).sum::<usize>() + words.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_case_diacritics_and_punctuation() {
        assert_eq!(
            normalize("  Je suis MORT, et ressuscité avec Christ !  "),
            "je suis mort et ressuscite avec christ"
        );
    }

    #[test]
    fn apostrophes_split_words() {
        assert_eq!(normalize("J'ai dit: «aujourd'hui»"), "j ai dit aujourd hui");
    }

    #[test]
    fn collapses_unicode_whitespace() {
        assert_eq!(normalize("a\u{00A0}\t\n b\u{2003}c"), "a b c");
    }

    #[test]
    fn non_latin_text_normalises_to_empty() {
        assert_eq!(normalize("こんにちは"), "");
        assert_eq!(normalize("—…!?"), "");
    }

    #[test]
    fn to_words_of_empty_input_is_empty() {
        assert!(to_words("").is_empty());
        assert!(to_words("  ,;  ").is_empty());
        assert_eq!(to_words("Çà et là"), vec!["ca", "et", "la"]);
    }

    #[test]
    fn joined_len_counts_separators() {
        assert_eq!(joined_len::<&str>(&[]), 0);
        assert_eq!(joined_len(&["je"]), 2);
        assert_eq!(joined_len(&["je", "suis", "mort"]), 12);
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in any::<String>()) {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once.clone());
        }

        #[test]
        fn normalized_output_is_canonical(s in "\\PC*") {
            let out = normalize(&s);
            prop_assert!(out.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b' '));
            prop_assert!(!out.starts_with(' ') && !out.ends_with(' '));
            prop_assert!(!out.contains("  "));
        }
    }
}
