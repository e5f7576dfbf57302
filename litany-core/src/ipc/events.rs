//! Event types crossing the counter boundary.
//!
//! ## Direction
//!
//! | Type | Direction |
//! |------|-----------|
//! | `RecognizerEvent` | recognizer → counter |
//! | `CountEvent` | counter → presentation (`subscribe_counts`) |
//! | `SessionStatusEvent` | counter → presentation (`subscribe_status`) |
//!
//! All types are camelCase JSON so recorded recognizer scripts and emitted
//! events can be exchanged with a web front end unchanged.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

// ---------------------------------------------------------------------------
// Recognizer events
// ---------------------------------------------------------------------------

/// One event reported by the speech-to-text collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum RecognizerEvent {
    /// Capture actually began.
    Started,
    /// The recognizer ended (requested or not).
    Ended,
    /// The recognizer reported a failure.
    Error {
        code: String,
        #[serde(default)]
        message: Option<String>,
    },
    /// Cumulative feed: the whole transcript so far.
    Transcript {
        text: String,
        #[serde(default)]
        is_final: bool,
    },
    /// Discrete feed: results from `result_index` onward changed.
    Results {
        result_index: usize,
        results: Vec<RecognitionResult>,
    },
}

/// One entry of a discrete result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    pub transcript: String,
    #[serde(default)]
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn finished(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Count events
// ---------------------------------------------------------------------------

/// Emitted for every accepted occurrence (or batch, in contains mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// Total after this increment.
    pub count: u64,
    pub increment: u64,
    pub source: MatchSource,
}

/// Which rule produced an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    /// Rolling buffer, ordered anchors.
    Anchor,
    /// Rolling buffer, fuzzy window.
    Fuzzy,
    /// Segment equal to the target.
    Exact,
    /// Segment occurrences of the target.
    Contains,
    /// Segment with a fuzzy window hit.
    SegmentFuzzy,
}

// ---------------------------------------------------------------------------
// Session status events
// ---------------------------------------------------------------------------

/// Emitted whenever the session status, listening flag or error slot changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusEvent {
    pub status: SessionStatus,
    /// Whether the recognizer reports active capture.
    pub listening: bool,
    /// Last recorded error, if any.
    pub error: Option<SessionError>,
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Not counting; `start()` has not been called or `stop()` was.
    #[default]
    Idle,
    /// Counting; the recognizer has been asked to run.
    Listening,
    /// Recognizer ended unexpectedly; a restart is scheduled.
    Restarting,
    /// Terminal error; the caller must `start()` again.
    Error,
}
