//! Fuzzy sliding-window matching.
//!
//! ## Algorithm
//!
//! Let `T` be the target word count. For every window width `w` in
//! `[max(1, T - slack), T + slack]` (ascending) and every start offset `i`
//! (ascending) such that the window fits, compute the edit distance between
//! `words[i..i+w]` joined and the normalised target. The globally smallest
//! distance wins; on ties the first window scanned is kept. The window is
//! accepted when `distance / target_len <= max_ratio`.
//!
//! Cost is O(windows × |target|²) per call, which stays small because callers
//! only ever pass a bounded buffer.

use tracing::debug;

use super::{prefix_chars, Match, MatchStrategy, PhraseMatcher, TargetPhrase};
use crate::text::{distance::levenshtein, normalize, words};

/// Best-scoring window found by [`best_window`]. Indices are in words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
    pub distance: usize,
}

impl Window {
    pub fn ratio(&self, target: &TargetPhrase) -> f64 {
        self.distance as f64 / target.ratio_denominator() as f64
    }
}

/// Scan every candidate window of `tokens` and return the closest one.
///
/// Returns `None` only when there is nothing to compare (no tokens, or an
/// empty target).
pub fn best_window(tokens: &[&str], target: &TargetPhrase, slack_words: usize) -> Option<Window> {
    if tokens.is_empty() || target.is_empty() {
        return None;
    }

    let t = target.word_count();
    let min_width = t.saturating_sub(slack_words).max(1);
    let max_width = t + slack_words;

    let mut best: Option<Window> = None;
    let mut joined = String::new();
    for width in min_width..=max_width {
        if width > tokens.len() {
            break;
        }
        for start in 0..=tokens.len() - width {
            joined.clear();
            for (k, token) in tokens[start..start + width].iter().enumerate() {
                if k > 0 {
                    joined.push(' ');
                }
                joined.push_str(token);
            }
            let distance = levenshtein(&joined, target.normalized());
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(Window {
                    start,
                    end: start + width,
                    distance,
                });
            }
        }
    }

    best
}

/// Accept the best window of `buffer` if it is within `max_ratio` of `target`.
///
/// Buffers of fewer than two words are rejected outright. `consumed_chars`
/// covers the normalised buffer through the end of the winning window.
pub fn fuzzy_window_match(
    buffer: &str,
    target: &TargetPhrase,
    slack_words: usize,
    max_ratio: f64,
) -> Option<Match> {
    let normalized = normalize(buffer);
    let tokens: Vec<&str> = words(&normalized).collect();
    if tokens.len() < 2 {
        return None;
    }

    let window = best_window(&tokens, target, slack_words)?;
    let ratio = window.ratio(target);
    debug!(
        distance = window.distance,
        ratio = format_args!("{:.3}", ratio),
        start = window.start,
        end = window.end,
        "best fuzzy window"
    );
    if ratio > max_ratio {
        return None;
    }

    Some(Match {
        consumed_chars: prefix_chars(&tokens, window.end),
        strategy: MatchStrategy::Fuzzy,
    })
}

/// [`PhraseMatcher`] wrapper around [`fuzzy_window_match`].
#[derive(Debug, Clone)]
pub struct FuzzyWindowMatcher {
    target: TargetPhrase,
    slack_words: usize,
    max_ratio: f64,
}

impl FuzzyWindowMatcher {
    pub fn new(target: TargetPhrase, slack_words: usize, max_ratio: f64) -> Self {
        Self {
            target,
            slack_words,
            max_ratio,
        }
    }

    pub fn target(&self) -> &TargetPhrase {
        &self.target
    }

    /// Whole-text decision: is any window of `normalized` within the ratio?
    ///
    /// Unlike [`PhraseMatcher::find`] this accepts single-word text, so a
    /// one-word target can still be recognised in a one-word segment.
    pub fn is_hit(&self, normalized: &str) -> bool {
        let tokens: Vec<&str> = words(normalized).collect();
        best_window(&tokens, &self.target, self.slack_words)
            .map(|w| w.ratio(&self.target) <= self.max_ratio)
            .unwrap_or(false)
    }
}

impl PhraseMatcher for FuzzyWindowMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Fuzzy
    }

    fn find(&self, buffer: &str) -> Option<Match> {
        fuzzy_window_match(buffer, &self.target, self.slack_words, self.max_ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tokens(s: &str) -> Vec<&str> {
        words(s).collect()
    }

    #[test]
    fn ratio_threshold_is_inclusive_and_exact() {
        let target = TargetPhrase::new("je suis mort");
        assert_eq!(target.ratio_denominator(), 12);

        // distance 2 → ratio ≈ 0.167 → accepted
        let w = best_window(&tokens("je sui mor"), &target, 2).expect("window");
        assert_eq!(w.distance, 2);
        assert!(fuzzy_window_match("je sui mor", &target, 2, 0.22).is_some());

        // distance 3 → ratio 0.25 → rejected
        let w = best_window(&tokens("je sui mo"), &target, 2).expect("window");
        assert_eq!(w.distance, 3);
        assert_relative_eq!(w.ratio(&target), 0.25);
        assert!(fuzzy_window_match("je sui mo", &target, 2, 0.22).is_none());
    }

    #[test]
    fn misheard_ending_is_within_ratio() {
        let target = TargetPhrase::new("Je suis mort et ressuscité avec Christ");
        let buffer = "je suis mort et ressucité avec kri";
        let w = best_window(&tokens(&normalize(buffer)), &target, 2).expect("window");
        assert_eq!((w.start, w.end, w.distance), (0, 7, 5));
        assert_relative_eq!(w.ratio(&target), 5.0 / 38.0);

        let m = fuzzy_window_match(buffer, &target, 2, 0.22).expect("accepted");
        assert_eq!(m.consumed_chars, normalize(buffer).len());
        assert_eq!(m.strategy, MatchStrategy::Fuzzy);
    }

    #[test]
    fn consumes_through_end_of_winning_window() {
        let target = TargetPhrase::new("je suis mort");
        let buffer = "bonjour je suis mort et voila";
        let m = fuzzy_window_match(buffer, &target, 2, 0.22).expect("match");
        assert_eq!(&buffer[..m.consumed_chars], "bonjour je suis mort");
    }

    #[test]
    fn ties_keep_first_window_scanned() {
        let target = TargetPhrase::new("je suis mort");
        let w = best_window(&tokens("je suis mort je suis mort"), &target, 0).expect("window");
        assert_eq!((w.start, w.end, w.distance), (0, 3, 0));
    }

    #[test]
    fn narrow_windows_are_scanned_before_wide_ones() {
        // width 2 "suis mort" and width 3 "moi suis mort" both cost 3; the
        // narrower width is scanned first and wins the tie.
        let target = TargetPhrase::new("je suis mort");
        let w = best_window(&tokens("moi suis mort"), &target, 1).expect("window");
        assert_eq!(w.distance, 3);
        assert_eq!((w.start, w.end), (1, 3));
    }

    #[test]
    fn short_buffers_and_empty_targets_are_rejected() {
        let target = TargetPhrase::new("mort");
        assert!(fuzzy_window_match("mort", &target, 2, 1.0).is_none());
        assert!(fuzzy_window_match("", &target, 2, 1.0).is_none());
        assert!(fuzzy_window_match("je suis mort", &TargetPhrase::new(""), 2, 1.0).is_none());
    }

    #[test]
    fn whole_text_hit_accepts_single_words() {
        let matcher = FuzzyWindowMatcher::new(TargetPhrase::new("amen"), 1, 0.25);
        assert!(matcher.is_hit("amen"));
        assert!(matcher.is_hit("amem"));
        assert!(!matcher.is_hit("alleluia"));
        assert!(!matcher.is_hit(""));
    }

    #[test]
    fn unrelated_text_is_rejected() {
        let target = TargetPhrase::new("je suis mort");
        assert!(fuzzy_window_match("il fait beau aujourd hui", &target, 2, 0.22).is_none());
    }
}
