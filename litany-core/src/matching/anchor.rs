//! Ordered-anchor matching.
//!
//! ## Algorithm
//!
//! 1. Normalise the buffer and split it into tokens.
//! 2. Walk the tokens once, left to right. For each anchor stem in order,
//!    advance until a token *starts with* the stem (tolerates truncated and
//!    inflected forms: `"ressuscit"` accepts `"ressuscite"`, `"ressusciter"`).
//! 3. If any stem is never found the match fails with no partial credit.
//! 4. On success the match consumes the buffer through the token that
//!    satisfied the last stem.

use super::{prefix_chars, Match, MatchStrategy, PhraseMatcher};
use crate::text::{normalize, words};

/// Find all `anchors` in order inside `buffer`.
///
/// An empty anchor list never matches: it would otherwise accept every
/// buffer, including an empty one.
pub fn anchor_match<S: AsRef<str>>(buffer: &str, anchors: &[S]) -> Option<Match> {
    if anchors.is_empty() {
        return None;
    }

    let normalized = normalize(buffer);
    let tokens: Vec<&str> = words(&normalized).collect();

    let mut idx = 0usize;
    let mut last_hit = 0usize;
    for anchor in anchors {
        let stem = anchor.as_ref();
        let found = tokens[idx..].iter().position(|t| t.starts_with(stem))?;
        last_hit = idx + found;
        idx = last_hit + 1;
    }

    Some(Match {
        consumed_chars: prefix_chars(&tokens, last_hit + 1),
        strategy: MatchStrategy::Anchor,
    })
}

/// [`PhraseMatcher`] wrapper around [`anchor_match`].
#[derive(Debug, Clone, Default)]
pub struct AnchorMatcher {
    anchors: Vec<String>,
}

impl AnchorMatcher {
    /// `anchors` are expected in normalised form (see `MatchConfig::normalize`).
    pub fn new(anchors: Vec<String>) -> Self {
        Self { anchors }
    }

    pub fn anchors(&self) -> &[String] {
        &self.anchors
    }

    pub fn is_enabled(&self) -> bool {
        !self.anchors.is_empty()
    }
}

impl PhraseMatcher for AnchorMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Anchor
    }

    fn find(&self, buffer: &str) -> Option<Match> {
        anchor_match(buffer, &self.anchors)
    }
}
