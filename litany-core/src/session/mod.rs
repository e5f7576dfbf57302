//! Counting strategies.
//!
//! A strategy turns recognizer output into occurrences of the target phrase.
//! Two are provided:
//!
//! - [`RollingBufferSession`] keeps a bounded normalised buffer of new text
//!   and repeatedly consumes matches from it (anchors first, then fuzzy).
//! - [`SegmentedSession`] waits for a final result or a silence gap, then
//!   scores the finished segment exactly once.
//!
//! Strategies are sans-IO: time is passed in, nothing blocks, and outcomes
//! are returned to the caller rather than published. The orchestrator
//! ([`crate::PhraseCounter`]) owns the count and the recognizer.

pub mod rolling;
pub mod segmented;
pub mod timer;

pub use rolling::RollingBufferSession;
pub use segmented::SegmentedSession;
pub use timer::Timer;

use std::time::Instant;

use crate::config::{MatchConfig, StrategyKind};
use crate::ipc::events::{MatchSource, RecognitionResult};
use crate::matching::TargetPhrase;

/// One accepted occurrence (or several, for contains scoring).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub source: MatchSource,
    pub increment: u64,
}

/// How a finalised segment was judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentVerdict {
    /// Scored; the increment may still be zero.
    Scored { words: usize, increment: u64 },
    /// Fewer words than the configured floor.
    TooShort { words: usize, required: usize },
}

/// What a strategy call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyOutcome {
    pub hits: Vec<Hit>,
    /// Ask the recognizer to drop its accumulated transcript.
    pub reset_transcript: bool,
    /// The consume loop stopped at its per-update cap.
    pub consume_guard_hit: bool,
    pub segment: Option<SegmentVerdict>,
}

impl StrategyOutcome {
    pub fn total_increment(&self) -> u64 {
        self.hits.iter().map(|h| h.increment).sum()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Common surface of the counting strategies.
pub trait CountingStrategy: Send {
    fn kind(&self) -> StrategyKind;

    /// A recognizer run began: result indices restart from zero.
    fn begin_run(&mut self);

    /// Cumulative feed: the full transcript so far.
    fn on_transcript(&mut self, text: &str, is_final: bool, now: Instant) -> StrategyOutcome;

    /// Discrete feed: results from `result_index` onward changed.
    fn on_results(
        &mut self,
        result_index: usize,
        results: &[RecognitionResult],
        now: Instant,
    ) -> StrategyOutcome;

    /// Fire any timer whose deadline has passed.
    fn poll(&mut self, now: Instant) -> StrategyOutcome;

    fn next_deadline(&self) -> Option<Instant>;

    /// Disarm every timer. Pending work is discarded.
    fn cancel_timers(&mut self);

    /// Normalised text awaiting a match (rolling) or the pending segment.
    fn buffer(&self) -> &str;

    /// Human-readable transcript kept for display.
    fn transcript(&self) -> &str;
}

/// Build the strategy selected by `config.strategy`.
pub fn build_strategy(
    config: &MatchConfig,
    target: &TargetPhrase,
    now: Instant,
) -> Box<dyn CountingStrategy> {
    match config.strategy {
        StrategyKind::Rolling => Box::new(RollingBufferSession::new(config, target.clone(), now)),
        StrategyKind::Segmented => Box::new(SegmentedSession::new(config, target.clone())),
    }
}
