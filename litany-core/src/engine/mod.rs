//! `CounterEngine`: threaded host around [`PhraseCounter`].
//!
//! ## Lifecycle
//!
//! ```text
//! CounterEngine::new()       → driver thread spawned, status = Idle
//!     └─► start()            → count reset, recognizer started, status = Listening
//!         └─► stop()         → recognizer stopped, timers cancelled, status = Idle
//! shutdown() / Drop          → driver thread joined, recognizer released
//! ```
//!
//! `start()` and `stop()` block until the driver has applied them, so a
//! `snapshot()` taken right after reflects the new state. Starting a running
//! engine or stopping an idle one is a silent no-op.
//!
//! ## Threading
//!
//! The counter lives on the `litany-session` thread. Commands and recognizer
//! callbacks reach it over crossbeam channels; counts and status changes
//! leave over `tokio::sync::broadcast` so async consumers can subscribe.

pub mod pipeline;

use std::sync::{atomic::AtomicU64, Arc};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::{
    config::MatchConfig,
    counter::{CounterSnapshot, PhraseCounter},
    error::{LitanyError, Result},
    ipc::events::{CountEvent, SessionStatusEvent},
    recognizer::RecognizerFactory,
};

use pipeline::{Command, DiagnosticsSnapshot, PipelineContext, PipelineDiagnostics};

/// Broadcast channel capacity: 256 events buffered for slow consumers.
const BROADCAST_CAP: usize = 256;

/// The top-level counter handle.
///
/// `CounterEngine` is `Send + Sync`. Wrap in `Arc<CounterEngine>` to share
/// between a UI layer and event-forwarding async tasks.
pub struct CounterEngine {
    commands: Sender<Command>,
    count_tx: broadcast::Sender<CountEvent>,
    status_tx: broadcast::Sender<SessionStatusEvent>,
    snapshot: Arc<Mutex<CounterSnapshot>>,
    diagnostics: Arc<PipelineDiagnostics>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl CounterEngine {
    /// Validate `config`, build the counter and spawn its driver thread.
    ///
    /// # Errors
    /// - `LitanyError::InvalidConfig` if the target phrase has no words.
    /// - `LitanyError::Io` if the driver thread cannot be spawned.
    pub fn new<F>(config: MatchConfig, target_phrase: &str, factory: F) -> Result<Self>
    where
        F: RecognizerFactory + 'static,
    {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (count_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);

        let counter = PhraseCounter::new(config, target_phrase, Box::new(factory), event_tx)?;
        let snapshot = Arc::new(Mutex::new(counter.snapshot()));
        let diagnostics = Arc::new(PipelineDiagnostics::default());

        let ctx = PipelineContext {
            counter,
            commands: command_rx,
            events: event_rx,
            count_tx: count_tx.clone(),
            status_tx: status_tx.clone(),
            snapshot: Arc::clone(&snapshot),
            seq: Arc::new(AtomicU64::new(0)),
            diagnostics: Arc::clone(&diagnostics),
        };
        let driver = std::thread::Builder::new()
            .name("litany-session".into())
            .spawn(move || pipeline::run(ctx))?;

        Ok(Self {
            commands: command_tx,
            count_tx,
            status_tx,
            snapshot,
            diagnostics,
            driver: Mutex::new(Some(driver)),
        })
    }

    /// Start counting. Blocks until the driver has applied the request.
    ///
    /// Recognizer failures are not returned here: they land in the
    /// snapshot's error slot and on the status channel.
    ///
    /// # Errors
    /// `LitanyError::ChannelClosed` if the engine was shut down.
    pub fn start(&self) -> Result<()> {
        self.request(Command::Start)
    }

    /// Stop counting. Blocks until the driver has applied the request.
    pub fn stop(&self) -> Result<()> {
        self.request(Command::Stop)
    }

    /// Ask the recognizer to drop its accumulated transcript.
    pub fn reset_transcript(&self) -> Result<()> {
        self.commands
            .send(Command::ResetTranscript)
            .map_err(|_| LitanyError::ChannelClosed)
    }

    /// Stop counting, release the recognizer and join the driver thread.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&self) {
        let Some(driver) = self.driver.lock().take() else {
            return;
        };
        let _ = self.commands.send(Command::Shutdown);
        if driver.join().is_err() {
            warn!("session driver panicked");
        }
        info!("counter engine shut down");
    }

    /// Latest published counter state.
    pub fn snapshot(&self) -> CounterSnapshot {
        self.snapshot.lock().clone()
    }

    pub fn count(&self) -> u64 {
        self.snapshot.lock().count
    }

    pub fn is_listening(&self) -> bool {
        self.snapshot.lock().listening
    }

    /// Subscribe to count increments.
    pub fn subscribe_counts(&self) -> broadcast::Receiver<CountEvent> {
        self.count_tx.subscribe()
    }

    /// Subscribe to status, listening and error changes.
    pub fn subscribe_status(&self) -> broadcast::Receiver<SessionStatusEvent> {
        self.status_tx.subscribe()
    }

    /// Snapshot of driver counters for observability.
    pub fn diagnostics_snapshot(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn request(&self, make: fn(pipeline::Ack) -> Command) -> Result<()> {
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        self.commands
            .send(make(ack_tx))
            .map_err(|_| LitanyError::ChannelClosed)?;
        ack_rx.recv().map_err(|_| LitanyError::ChannelClosed)
    }
}

impl Drop for CounterEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
