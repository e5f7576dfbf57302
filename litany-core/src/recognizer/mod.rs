//! Speech recognizer abstraction.
//!
//! The `Recognizer` trait decouples counting from any specific speech
//! engine (browser API bridge, cloud streaming client, local model, or the
//! [`ScriptedRecognizer`] used for replay and tests).
//!
//! A recognizer is driven synchronously (`start` / `stop` /
//! `reset_transcript`) and reports back asynchronously through the
//! [`EventSink`] it was started with. Every sink is stamped with the
//! generation of the run it belongs to; the counter drops events whose
//! generation is no longer current, so callbacks from a stopped or
//! replaced recognizer can never mutate the session.

pub mod scripted;

pub use scripted::{Script, ScriptStep, ScriptedRecognizer};

use crossbeam_channel::Sender;
use thiserror::Error;

use crate::error::SessionError;
use crate::ipc::events::RecognizerEvent;

/// A recognizer event tagged with the generation of the run that sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct StampedEvent {
    pub generation: u64,
    pub event: RecognizerEvent,
}

/// Callback handle given to a recognizer at start.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: Sender<StampedEvent>,
}

impl EventSink {
    pub fn new(generation: u64, tx: Sender<StampedEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver `event`. Returns `false` once the counter is gone.
    pub fn emit(&self, event: RecognizerEvent) -> bool {
        self.tx
            .send(StampedEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Everything a recognizer needs to begin a run.
#[derive(Debug, Clone)]
pub struct RecognizerContext {
    /// Locale tag, passed through untouched.
    pub language: String,
    pub sink: EventSink,
}

/// Why a recognizer could not start.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognizerFault {
    #[error("recognition is not available")]
    Unsupported,

    #[error("audio capture permission denied")]
    PermissionDenied,

    #[error("recognizer refused to start: {0}")]
    Refused(String),
}

impl From<RecognizerFault> for SessionError {
    fn from(fault: RecognizerFault) -> Self {
        match fault {
            RecognizerFault::Unsupported => SessionError::EngineUnsupported,
            RecognizerFault::PermissionDenied => SessionError::PermissionDenied,
            RecognizerFault::Refused(message) => SessionError::StartFailure { message },
        }
    }
}

/// Contract for speech-to-text collaborators.
///
/// Implementations must not call back into the counter synchronously; all
/// reporting goes through the context's [`EventSink`].
pub trait Recognizer: Send {
    /// Whether recognition can run at all in this environment.
    fn is_supported(&self) -> bool {
        true
    }

    /// Begin a run. May be called again on the same instance after `Ended`;
    /// implementations that cannot restart in place return an error and the
    /// counter replaces them.
    fn start(&mut self, ctx: RecognizerContext) -> std::result::Result<(), RecognizerFault>;

    /// Stop the current run. Must be idempotent.
    fn stop(&mut self);

    /// Drop the accumulated transcript (cumulative feeds only).
    fn reset_transcript(&mut self) {}
}

/// Produces fresh recognizers: once at first start and again whenever an
/// instance cannot be restarted in place.
pub trait RecognizerFactory: Send {
    fn create(&mut self) -> Box<dyn Recognizer>;
}

impl<F> RecognizerFactory for F
where
    F: FnMut() -> Box<dyn Recognizer> + Send,
{
    fn create(&mut self) -> Box<dyn Recognizer> {
        self()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_stamps_generation() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sink = EventSink::new(7, tx);
        assert!(sink.emit(RecognizerEvent::Started));
        let stamped = rx.try_recv().expect("event delivered");
        assert_eq!(stamped.generation, 7);
        assert_eq!(stamped.event, RecognizerEvent::Started);

        drop(rx);
        assert!(!sink.emit(RecognizerEvent::Ended));
    }

    #[test]
    fn faults_map_onto_session_errors() {
        assert_eq!(
            SessionError::from(RecognizerFault::PermissionDenied),
            SessionError::PermissionDenied
        );
        assert_eq!(
            SessionError::from(RecognizerFault::Refused("busy".into())),
            SessionError::StartFailure {
                message: "busy".into()
            }
        );
    }
}
