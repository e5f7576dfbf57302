//! # litany-core
//!
//! Incremental phrase-repetition counter: listens to a speech recognizer and
//! counts how many times a target phrase has been said.
//!
//! ## Architecture
//!
//! ```text
//! Recognizer ──StampedEvent──► driver thread (engine::pipeline)
//!                                   │
//!                          PhraseCounter (generation guard, restarts, errors)
//!                                   │
//!                     CountingStrategy: rolling buffer │ silence-gated segments
//!                                   │
//!                   matchers: ordered anchors, fuzzy word window (Levenshtein)
//!                                   │
//!              broadcast::Sender<CountEvent> / broadcast::Sender<SessionStatusEvent>
//! ```
//!
//! Everything below `PhraseCounter` is sans-IO and deterministic; the only
//! thread is the driver owned by [`CounterEngine`].

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod config;
pub mod counter;
pub mod engine;
pub mod error;
pub mod ipc;
pub mod matching;
pub mod recognizer;
pub mod session;
pub mod text;

// Convenience re-exports for downstream crates
pub use config::{MatchConfig, ScoringMode, StrategyKind};
pub use counter::{CounterSnapshot, PhraseCounter};
pub use engine::CounterEngine;
pub use error::{LitanyError, SessionError};
pub use ipc::events::{
    CountEvent, MatchSource, RecognitionResult, RecognizerEvent, SessionStatus,
    SessionStatusEvent,
};
pub use matching::TargetPhrase;
pub use recognizer::{Recognizer, RecognizerFactory, Script, ScriptStep, ScriptedRecognizer};
pub use text::normalize;
