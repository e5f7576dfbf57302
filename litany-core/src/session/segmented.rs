//! Silence-gated segment strategy.
//!
//! Every recognizer update (re)arms a silence timer and replaces the
//! pending segment with the not-yet-finalised text. The segment is
//! finalised when the recognizer marks a result final or when the timer
//! fires, then scored exactly once:
//!
//! | mode | increment |
//! |------|-----------|
//! | `exact` | 1 if the segment equals the target, else 0 |
//! | `contains` | non-overlapping whole-word occurrences of the target |
//! | `fuzzy` | 1 if any word window is within the ratio, else 0 |
//!
//! Segments shorter than the configured word floor are dropped unscored.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::{CountingStrategy, Hit, SegmentVerdict, StrategyOutcome, Timer};
use crate::config::{MatchConfig, ScoringMode, StrategyKind};
use crate::ipc::events::{MatchSource, RecognitionResult};
use crate::matching::{FuzzyWindowMatcher, TargetPhrase};
use crate::text::{normalize, words};

pub struct SegmentedSession {
    target: TargetPhrase,
    mode: ScoringMode,
    fuzzy: FuzzyWindowMatcher,
    min_words: usize,
    silence: Duration,
    silence_timer: Timer,
    /// Raw text of the segment being spoken.
    pending: String,
    /// Finalised segments, space-joined.
    transcript: String,
    // Discrete feed cursors.
    finalized_results: usize,
    live_results: usize,
    // Cumulative feed cursors, in characters.
    finalized_chars: usize,
    seen_chars: usize,
}

impl SegmentedSession {
    pub fn new(config: &MatchConfig, target: TargetPhrase) -> Self {
        let min_words = config.min_segment_words(target.word_count());
        Self {
            fuzzy: FuzzyWindowMatcher::new(
                target.clone(),
                config.slack_words,
                config.max_fuzzy_ratio,
            ),
            target,
            mode: config.mode,
            min_words,
            silence: config.silence(),
            silence_timer: Timer::default(),
            pending: String::new(),
            transcript: String::new(),
            finalized_results: 0,
            live_results: 0,
            finalized_chars: 0,
            seen_chars: 0,
        }
    }

    pub fn min_words(&self) -> usize {
        self.min_words
    }

    /// Close the pending segment and score it.
    fn finalize(&mut self) -> StrategyOutcome {
        self.finalized_results = self.live_results;
        self.finalized_chars = self.seen_chars;

        let raw = std::mem::take(&mut self.pending);
        let segment = raw.trim();
        if segment.is_empty() {
            return StrategyOutcome::default();
        }
        if !self.transcript.is_empty() {
            self.transcript.push(' ');
        }
        self.transcript.push_str(segment);

        let normalized = normalize(segment);
        let tokens: Vec<&str> = words(&normalized).collect();
        if tokens.len() < self.min_words {
            debug!(
                words = tokens.len(),
                required = self.min_words,
                "segment too short, not scored"
            );
            return StrategyOutcome {
                segment: Some(SegmentVerdict::TooShort {
                    words: tokens.len(),
                    required: self.min_words,
                }),
                ..StrategyOutcome::default()
            };
        }

        let (source, increment) = match self.mode {
            ScoringMode::Exact => (
                MatchSource::Exact,
                u64::from(normalized == self.target.normalized()),
            ),
            ScoringMode::Contains => (
                MatchSource::Contains,
                count_occurrences(&tokens, self.target.words()) as u64,
            ),
            ScoringMode::Fuzzy => (
                MatchSource::SegmentFuzzy,
                u64::from(self.fuzzy.is_hit(&normalized)),
            ),
        };
        info!(mode = ?self.mode, words = tokens.len(), increment, "segment scored");

        let mut out = StrategyOutcome {
            segment: Some(SegmentVerdict::Scored {
                words: tokens.len(),
                increment,
            }),
            ..StrategyOutcome::default()
        };
        if increment > 0 {
            out.hits.push(Hit { source, increment });
        }
        out
    }
}

/// Count non-overlapping occurrences of `needle` as a whole-word sequence.
///
/// Back-to-back repeats share no delimiter, so `"a b a b"` holds two
/// occurrences of `"a b"`.
pub fn count_occurrences<S: AsRef<str>>(haystack: &[&str], needle: &[S]) -> usize {
    let n = needle.len();
    if n == 0 || haystack.len() < n {
        return 0;
    }
    let mut count = 0;
    let mut i = 0;
    while i + n <= haystack.len() {
        let hit = haystack[i..i + n]
            .iter()
            .zip(needle)
            .all(|(h, w)| *h == w.as_ref());
        if hit {
            count += 1;
            i += n;
        } else {
            i += 1;
        }
    }
    count
}

impl CountingStrategy for SegmentedSession {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Segmented
    }

    fn begin_run(&mut self) {
        self.finalized_results = 0;
        self.live_results = 0;
    }

    fn on_transcript(&mut self, text: &str, is_final: bool, now: Instant) -> StrategyOutcome {
        self.silence_timer.arm(now, self.silence);

        let len = text.chars().count();
        if len < self.finalized_chars {
            self.finalized_chars = 0;
        }
        self.seen_chars = len;

        let live: String = text.chars().skip(self.finalized_chars).collect();
        let live = live.trim();
        if !live.is_empty() {
            self.pending = live.to_string();
        }

        if is_final {
            self.silence_timer.cancel();
            return self.finalize();
        }
        StrategyOutcome::default()
    }

    fn on_results(
        &mut self,
        result_index: usize,
        results: &[RecognitionResult],
        now: Instant,
    ) -> StrategyOutcome {
        self.silence_timer.arm(now, self.silence);

        let from = result_index.max(self.finalized_results);
        self.live_results = results.len();
        let live_slice = results.get(from..).unwrap_or(&[]);

        let live = live_slice
            .iter()
            .map(|r| r.transcript.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !live.is_empty() {
            self.pending = live;
        }

        if live_slice.iter().any(|r| r.is_final) {
            self.silence_timer.cancel();
            return self.finalize();
        }
        StrategyOutcome::default()
    }

    fn poll(&mut self, now: Instant) -> StrategyOutcome {
        if self.silence_timer.fire_if_due(now) {
            debug!(silence_ms = self.silence.as_millis() as u64, "silence gap, finalising segment");
            return self.finalize();
        }
        StrategyOutcome::default()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.silence_timer.deadline()
    }

    fn cancel_timers(&mut self) {
        self.silence_timer.cancel();
        self.pending.clear();
    }

    fn buffer(&self) -> &str {
        &self.pending
    }

    fn transcript(&self) -> &str {
        &self.transcript
    }
}
