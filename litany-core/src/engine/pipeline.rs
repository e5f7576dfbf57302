//! Session driver loop.
//!
//! Runs on a dedicated thread and owns the [`PhraseCounter`]. Each iteration:
//!
//! 1. Wait for a host command, a recognizer event, or the counter's next
//!    timer deadline, whichever comes first.
//! 2. Apply it, then `poll` the counter so due timers fire.
//! 3. Publish queued notices: broadcast count/status events, bump
//!    diagnostics, refresh the shared snapshot.
//!
//! All session state is touched from this thread only, so recognizer
//! callbacks and timers are serialised without locks.

use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::counter::{CounterSnapshot, Notice, PhraseCounter};
use crate::ipc::events::{CountEvent, SessionStatusEvent};
use crate::recognizer::StampedEvent;

/// Upper bound on a wait when no timer is armed.
const IDLE_WAIT: Duration = Duration::from_millis(250);

/// Acknowledgement channel for commands the caller waits on.
pub type Ack = Sender<()>;

/// Host → driver commands.
#[derive(Debug)]
pub enum Command {
    Start(Ack),
    Stop(Ack),
    ResetTranscript,
    Shutdown,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Lock-free counters updated by the driver, read by anyone.
#[derive(Debug, Default)]
pub struct PipelineDiagnostics {
    pub events_in: AtomicUsize,
    pub stale_events_dropped: AtomicUsize,
    pub matches_counted: AtomicUsize,
    pub segments_scored: AtomicUsize,
    pub segments_too_short: AtomicUsize,
    pub consume_guard_hits: AtomicUsize,
    pub transcript_resets: AtomicUsize,
    pub restarts: AtomicUsize,
    pub replacements: AtomicUsize,
    pub errors: AtomicUsize,
}

impl PipelineDiagnostics {
    pub fn reset(&self) {
        for counter in self.all() {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            events_in: self.events_in.load(Ordering::Relaxed),
            stale_events_dropped: self.stale_events_dropped.load(Ordering::Relaxed),
            matches_counted: self.matches_counted.load(Ordering::Relaxed),
            segments_scored: self.segments_scored.load(Ordering::Relaxed),
            segments_too_short: self.segments_too_short.load(Ordering::Relaxed),
            consume_guard_hits: self.consume_guard_hits.load(Ordering::Relaxed),
            transcript_resets: self.transcript_resets.load(Ordering::Relaxed),
            restarts: self.restarts.load(Ordering::Relaxed),
            replacements: self.replacements.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }

    fn all(&self) -> [&AtomicUsize; 10] {
        [
            &self.events_in,
            &self.stale_events_dropped,
            &self.matches_counted,
            &self.segments_scored,
            &self.segments_too_short,
            &self.consume_guard_hits,
            &self.transcript_resets,
            &self.restarts,
            &self.replacements,
            &self.errors,
        ]
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub events_in: usize,
    pub stale_events_dropped: usize,
    pub matches_counted: usize,
    pub segments_scored: usize,
    pub segments_too_short: usize,
    pub consume_guard_hits: usize,
    pub transcript_resets: usize,
    pub restarts: usize,
    pub replacements: usize,
    pub errors: usize,
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Everything the driver thread owns or shares.
pub struct PipelineContext {
    pub counter: PhraseCounter,
    pub commands: Receiver<Command>,
    pub events: Receiver<StampedEvent>,
    pub count_tx: broadcast::Sender<CountEvent>,
    pub status_tx: broadcast::Sender<SessionStatusEvent>,
    pub snapshot: Arc<Mutex<CounterSnapshot>>,
    pub seq: Arc<AtomicU64>,
    pub diagnostics: Arc<PipelineDiagnostics>,
}

/// Drive the counter until `Shutdown` or until every command sender is gone.
pub fn run(mut ctx: PipelineContext) {
    info!("session driver started");

    loop {
        let timeout = ctx
            .counter
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_WAIT);

        let keep_going = select! {
            recv(ctx.commands) -> msg => match msg {
                Ok(command) => apply_command(&mut ctx, command),
                Err(_) => false,
            },
            recv(ctx.events) -> msg => {
                if let Ok(stamped) = msg {
                    ctx.diagnostics.events_in.fetch_add(1, Ordering::Relaxed);
                    ctx.counter.handle_event(stamped, Instant::now());
                }
                true
            },
            default(timeout) => true,
        };

        ctx.counter.poll(Instant::now());
        publish(&mut ctx);

        if !keep_going {
            break;
        }
    }

    ctx.counter.shutdown();
    publish(&mut ctx);
    info!("session driver stopped");
}

/// Returns `false` when the driver should exit.
fn apply_command(ctx: &mut PipelineContext, command: Command) -> bool {
    debug!(?command, "driver command");
    match command {
        Command::Start(ack) => {
            ctx.diagnostics.reset();
            ctx.counter.start(Instant::now());
            publish(ctx);
            let _ = ack.send(());
            true
        }
        Command::Stop(ack) => {
            ctx.counter.stop();
            publish(ctx);
            let _ = ack.send(());
            true
        }
        Command::ResetTranscript => {
            ctx.counter.reset_transcript();
            PipelineDiagnostics::bump(&ctx.diagnostics.transcript_resets);
            true
        }
        Command::Shutdown => false,
    }
}

/// Forward queued notices and refresh the shared snapshot.
fn publish(ctx: &mut PipelineContext) {
    let diag = &ctx.diagnostics;
    for notice in ctx.counter.drain_notices() {
        match notice {
            Notice::Counted {
                count,
                increment,
                source,
            } => {
                diag.matches_counted
                    .fetch_add(increment as usize, Ordering::Relaxed);
                let seq = ctx.seq.fetch_add(1, Ordering::Relaxed);
                // No receivers is not an error.
                let _ = ctx.count_tx.send(CountEvent {
                    seq,
                    count,
                    increment,
                    source,
                });
            }
            Notice::Status(event) => {
                let _ = ctx.status_tx.send(event);
            }
            Notice::StaleEventDropped { .. } => {
                PipelineDiagnostics::bump(&diag.stale_events_dropped)
            }
            Notice::ConsumeGuardHit => PipelineDiagnostics::bump(&diag.consume_guard_hits),
            Notice::SegmentScored { .. } => PipelineDiagnostics::bump(&diag.segments_scored),
            Notice::SegmentTooShort { .. } => {
                PipelineDiagnostics::bump(&diag.segments_too_short)
            }
            Notice::TranscriptResetRequested => {
                PipelineDiagnostics::bump(&diag.transcript_resets)
            }
            Notice::RecognizerRestarted => PipelineDiagnostics::bump(&diag.restarts),
            Notice::RecognizerReplaced => PipelineDiagnostics::bump(&diag.replacements),
            Notice::ErrorRecorded(_) => PipelineDiagnostics::bump(&diag.errors),
        }
    }
    *ctx.snapshot.lock() = ctx.counter.snapshot();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_reset_clears_every_counter() {
        let diag = PipelineDiagnostics::default();
        for counter in diag.all() {
            counter.fetch_add(3, Ordering::Relaxed);
        }
        assert_eq!(diag.snapshot().restarts, 3);
        diag.reset();
        assert_eq!(diag.snapshot(), DiagnosticsSnapshot::default());
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let snap = DiagnosticsSnapshot {
            stale_events_dropped: 2,
            ..DiagnosticsSnapshot::default()
        };
        let json = serde_json::to_value(snap).expect("serialize diagnostics");
        assert_eq!(json["staleEventsDropped"], 2);
    }
}
