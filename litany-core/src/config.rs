//! Session configuration.
//!
//! `MatchConfig` is plain data: serialisable (camelCase JSON), defaulted
//! field-by-field, and sanitised with [`MatchConfig::normalize`] before a
//! session is built from it.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LitanyError, Result};
use crate::text::normalize;

/// Which counting strategy drives the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Continuous rolling buffer with consume-and-repeat matching.
    #[default]
    Rolling,
    /// Silence-gated segments scored once each.
    Segmented,
}

/// Segment scoring rule (segmented strategy only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Whole segment must equal the target.
    Exact,
    /// Count every whitespace-delimited occurrence of the target.
    #[default]
    Contains,
    /// At most one fuzzy-window hit per segment.
    Fuzzy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct MatchConfig {
    /// Locale tag handed to the recognizer; not interpreted here.
    pub language: String,
    pub strategy: StrategyKind,
    /// Ordered word stems for the anchor matcher. Empty disables it.
    pub anchors: Vec<String>,
    /// Widens the fuzzy window search around the target word count.
    pub slack_words: usize,
    /// Accept a window when `distance / target_len <= max_fuzzy_ratio`.
    pub max_fuzzy_ratio: f64,
    /// Hard cap on the rolling buffer (oldest characters dropped first).
    pub max_buffer_chars: usize,
    /// Inactivity before a pending segment is finalised.
    pub silence_ms: u64,
    pub mode: ScoringMode,
    pub min_words_ratio: f64,
    pub min_words_absolute: Option<usize>,
    /// Delay before restarting a recognizer that ended on its own.
    pub auto_restart_delay_ms: u64,
    /// Rolling buffer maintenance period.
    pub maintenance_interval_ms: u64,
    /// Ask the recognizer to reset its transcript past this many words.
    pub transcript_reset_words: usize,
    /// Consume-loop guard: most matches taken from a single update.
    pub max_consume_per_update: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            language: "fr-FR".into(),
            strategy: StrategyKind::Rolling,
            anchors: Vec::new(),
            slack_words: 2,
            max_fuzzy_ratio: 0.22,
            max_buffer_chars: 800,
            silence_ms: 1_200,
            mode: ScoringMode::Contains,
            min_words_ratio: 0.6,
            min_words_absolute: None,
            auto_restart_delay_ms: 120,
            maintenance_interval_ms: 5_000,
            transcript_reset_words: 120,
            max_consume_per_update: 6,
        }
    }
}

impl MatchConfig {
    /// Defaults tuned for the silence-gated strategy.
    pub fn segmented() -> Self {
        Self {
            strategy: StrategyKind::Segmented,
            max_fuzzy_ratio: 0.24,
            ..Self::default()
        }
    }

    /// Clamp out-of-range values and canonicalise anchors in place.
    pub fn normalize(&mut self) {
        self.language = match self.language.trim() {
            "" => "fr-FR".into(),
            lang => lang.to_string(),
        };
        self.max_fuzzy_ratio = clamp_unit(self.max_fuzzy_ratio, 0.22);
        self.min_words_ratio = clamp_unit(self.min_words_ratio, 0.6);
        self.max_consume_per_update = self.max_consume_per_update.max(1);
        self.maintenance_interval_ms = self.maintenance_interval_ms.max(100);
        self.anchors = normalize_anchors(&self.anchors);
    }

    /// Reject configurations no session can run with.
    pub fn validate(&self, target_phrase: &str) -> Result<()> {
        if normalize(target_phrase).is_empty() {
            return Err(LitanyError::InvalidConfig(format!(
                "target phrase {target_phrase:?} has no countable words"
            )));
        }
        if !(0.0..=1.0).contains(&self.max_fuzzy_ratio) {
            return Err(LitanyError::InvalidConfig(format!(
                "maxFuzzyRatio must be within [0, 1], got {}",
                self.max_fuzzy_ratio
            )));
        }
        Ok(())
    }

    pub fn silence(&self) -> Duration {
        Duration::from_millis(self.silence_ms)
    }

    pub fn auto_restart_delay(&self) -> Duration {
        Duration::from_millis(self.auto_restart_delay_ms)
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_millis(self.maintenance_interval_ms)
    }

    /// Minimum words a finalised segment needs before it is scored.
    pub fn min_segment_words(&self, target_words: usize) -> usize {
        let by_ratio = (target_words as f64 * self.min_words_ratio).ceil() as usize;
        match self.min_words_absolute {
            Some(floor) => by_ratio.max(floor),
            None => by_ratio,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let mut config: MatchConfig = serde_json::from_str(&raw)?;
        config.normalize();
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

fn clamp_unit(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback
    }
}

/// Normalise each stem and drop the ones that end up empty.
///
/// A stem that normalises to several words (`"Jésus-Christ"`) becomes several
/// consecutive stems. Repeats are kept: `["je", "je"]` asks for two tokens.
fn normalize_anchors(raw: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for anchor in raw {
        for stem in crate::text::words(&normalize(anchor)) {
            out.push(stem.to_string());
        }
    }
    out
}
