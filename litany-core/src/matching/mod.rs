//! Phrase matchers.
//!
//! Two independent, stateless strategies scan a normalised buffer for one
//! occurrence of the target phrase:
//!
//! - [`anchor::AnchorMatcher`]: ordered word-stem anchors, gaps tolerated.
//!   Cheap and robust to heavy distortion between anchors; blind to a
//!   misrecognised anchor.
//! - [`fuzzy::FuzzyWindowMatcher`]: best-scoring word window by edit-distance
//!   ratio. Catches near-exact phrasing that misses an anchor.
//!
//! Both report how many characters of the *normalised* buffer the match
//! covers, so callers can advance past it and never re-scan text that
//! precedes a detected occurrence.

pub mod anchor;
pub mod fuzzy;

pub use anchor::{anchor_match, AnchorMatcher};
pub use fuzzy::{best_window, fuzzy_window_match, FuzzyWindowMatcher, Window};

use crate::text::{normalize, words};

/// The phrase being counted. Computed once at session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPhrase {
    raw: String,
    normalized: String,
    words: Vec<String>,
}

impl TargetPhrase {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let normalized = normalize(&raw);
        let words = words(&normalized).map(str::to_owned).collect();
        Self {
            raw,
            normalized,
            words,
        }
    }

    /// The phrase as supplied by the caller.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Canonical form (words joined by single spaces).
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Denominator for ratio thresholds: normalised length, at least 1.
    pub fn ratio_denominator(&self) -> usize {
        self.normalized.len().max(1)
    }

    /// True when the phrase normalises to nothing and can never match.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Which strategy accepted a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Anchor,
    Fuzzy,
}

/// One accepted occurrence inside a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    /// Characters of the normalised buffer up to and including the match.
    pub consumed_chars: usize,
    pub strategy: MatchStrategy,
}

/// A stateless scan for one occurrence of the target phrase.
///
/// Implementors must be deterministic: the same buffer always yields the
/// same result.
pub trait PhraseMatcher: Send + Sync {
    fn strategy(&self) -> MatchStrategy;

    /// Look for one occurrence in `buffer` (normalised internally).
    fn find(&self, buffer: &str) -> Option<Match>;
}

/// Length of the first `n` words of `words`, re-joined with single spaces.
pub(crate) fn prefix_chars(words: &[&str], n: usize) -> usize {
    crate::text::joined_len(&words[..n.min(words.len())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_phrase_precomputes_canonical_form() {
        let target = TargetPhrase::new("Je suis mort et ressuscité avec Christ");
        assert_eq!(target.normalized(), "je suis mort et ressuscite avec christ");
        assert_eq!(target.word_count(), 7);
        assert_eq!(target.ratio_denominator(), 38);
        assert!(!target.is_empty());
    }

    #[test]
    fn punctuation_only_target_is_empty() {
        let target = TargetPhrase::new("?!");
        assert!(target.is_empty());
        assert_eq!(target.ratio_denominator(), 1);
    }
}
