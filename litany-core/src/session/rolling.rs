//! Rolling buffer strategy.
//!
//! ## Update path
//!
//! ```text
//! final transcript ──► delta since last update ──► normalise ──► append
//!                                                                 │
//!                               clamp to max_buffer_chars (oldest dropped)
//!                                                                 │
//!                     consume loop: anchors, then fuzzy window, ≤ cap matches
//! ```
//!
//! A match removes the buffer prefix through the matched occurrence, so text
//! before a detected phrase is never scanned again. Non-final transcripts
//! are ignored: a recognizer revising its hypothesis would otherwise be
//! counted twice.
//!
//! A periodic maintenance tick re-clamps the buffer and asks the recognizer
//! to drop its accumulated transcript once it grows past a word threshold.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{CountingStrategy, Hit, StrategyOutcome, Timer};
use crate::config::{MatchConfig, StrategyKind};
use crate::ipc::events::{MatchSource, RecognitionResult};
use crate::matching::{AnchorMatcher, FuzzyWindowMatcher, MatchStrategy, PhraseMatcher, TargetPhrase};
use crate::text::normalize;

pub struct RollingBufferSession {
    /// Tried in order; the first hit wins.
    matchers: Vec<Box<dyn PhraseMatcher>>,
    max_buffer_chars: usize,
    max_consume: usize,
    maintenance_interval: Duration,
    transcript_reset_words: usize,
    /// Normalised, at most `max_buffer_chars` long.
    buffer: String,
    /// Last cumulative transcript (or assembled final results).
    transcript: String,
    /// Character length of the last cumulative transcript seen.
    seen_chars: usize,
    /// Discrete feed: result indices below this are already in the buffer.
    finalized_results: usize,
    maintenance: Timer,
}

impl RollingBufferSession {
    pub fn new(config: &MatchConfig, target: TargetPhrase, now: Instant) -> Self {
        let mut matchers: Vec<Box<dyn PhraseMatcher>> = Vec::with_capacity(2);
        let anchors = AnchorMatcher::new(config.anchors.clone());
        if anchors.is_enabled() {
            matchers.push(Box::new(anchors));
        }
        matchers.push(Box::new(FuzzyWindowMatcher::new(
            target,
            config.slack_words,
            config.max_fuzzy_ratio,
        )));

        let mut maintenance = Timer::default();
        maintenance.arm(now, config.maintenance_interval());

        Self {
            matchers,
            max_buffer_chars: config.max_buffer_chars,
            max_consume: config.max_consume_per_update.max(1),
            maintenance_interval: config.maintenance_interval(),
            transcript_reset_words: config.transcript_reset_words,
            buffer: String::new(),
            transcript: String::new(),
            seen_chars: 0,
            finalized_results: 0,
            maintenance,
        }
    }

    /// Append new text, clamp, then take every match it completes.
    fn ingest(&mut self, delta: &str) -> StrategyOutcome {
        let delta = normalize(delta);
        if delta.is_empty() {
            return StrategyOutcome::default();
        }
        if !self.buffer.is_empty() {
            self.buffer.push(' ');
        }
        self.buffer.push_str(&delta);
        self.clamp_buffer();
        self.consume()
    }

    /// Keep only the newest `max_buffer_chars` characters.
    fn clamp_buffer(&mut self) {
        if self.buffer.len() <= self.max_buffer_chars {
            return;
        }
        // Normalised text is ASCII, so any byte offset is a char boundary.
        let cut = self.buffer.len() - self.max_buffer_chars;
        self.buffer = self.buffer[cut..].trim_start().to_string();
    }

    fn consume(&mut self) -> StrategyOutcome {
        let mut out = StrategyOutcome::default();

        while let Some(found) = self.matchers.iter().find_map(|m| m.find(&self.buffer)) {
            if out.hits.len() >= self.max_consume {
                warn!(
                    cap = self.max_consume,
                    remaining = self.buffer.len(),
                    "consume guard reached; remaining buffer waits for the next update"
                );
                out.consume_guard_hit = true;
                break;
            }
            let rest = self.buffer.get(found.consumed_chars..).unwrap_or("");
            self.buffer = rest.trim_start().to_string();

            let source = match found.strategy {
                MatchStrategy::Anchor => MatchSource::Anchor,
                MatchStrategy::Fuzzy => MatchSource::Fuzzy,
            };
            debug!(?source, consumed = found.consumed_chars, "phrase consumed");
            out.hits.push(Hit {
                source,
                increment: 1,
            });
        }
        out
    }
}

impl CountingStrategy for RollingBufferSession {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Rolling
    }

    fn begin_run(&mut self) {
        self.finalized_results = 0;
    }

    fn on_transcript(&mut self, text: &str, is_final: bool, _now: Instant) -> StrategyOutcome {
        if !is_final {
            return StrategyOutcome::default();
        }

        let len = text.chars().count();
        let delta: String = if len < self.seen_chars {
            // The recognizer restarted its transcript: everything is new.
            text.to_string()
        } else {
            text.chars().skip(self.seen_chars).collect()
        };
        self.seen_chars = len;
        self.transcript = text.to_string();

        self.ingest(&delta)
    }

    fn on_results(
        &mut self,
        result_index: usize,
        results: &[RecognitionResult],
        _now: Instant,
    ) -> StrategyOutcome {
        let from = result_index.max(self.finalized_results);
        let mut delta = String::new();
        // Only a contiguous run of finals advances the cursor.
        for (i, result) in results.iter().enumerate().skip(from) {
            if !result.is_final {
                break;
            }
            let text = result.transcript.trim();
            if !text.is_empty() {
                if !delta.is_empty() {
                    delta.push(' ');
                }
                delta.push_str(text);
            }
            self.finalized_results = i + 1;
        }

        if delta.is_empty() {
            return StrategyOutcome::default();
        }
        if !self.transcript.is_empty() {
            self.transcript.push(' ');
        }
        self.transcript.push_str(&delta);
        self.ingest(&delta)
    }

    fn poll(&mut self, now: Instant) -> StrategyOutcome {
        let mut out = StrategyOutcome::default();
        if !self.maintenance.fire_if_due(now) {
            return out;
        }
        self.maintenance.arm(now, self.maintenance_interval);

        let words = self.transcript.split_whitespace().count();
        if words > self.transcript_reset_words {
            info!(
                words,
                threshold = self.transcript_reset_words,
                "transcript reset requested"
            );
            self.transcript.clear();
            out.reset_transcript = true;
        }
        self.clamp_buffer();
        out
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.maintenance.deadline()
    }

    fn cancel_timers(&mut self) {
        self.maintenance.cancel();
    }

    fn buffer(&self) -> &str {
        &self.buffer
    }

    fn transcript(&self) -> &str {
        &self.transcript
    }
}
