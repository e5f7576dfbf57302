//! `PhraseCounter`: session orchestrator.
//!
//! ## Lifecycle
//!
//! ```text
//! PhraseCounter::new()
//!     └─► start(now)      → count = 0, generation += 1, recognizer started, status = Listening
//!         ├─► Ended        → restart armed (auto_restart_delay), status = Restarting
//!         │     └─► poll() → restart in place, or replace via factory (generation += 1)
//!         ├─► Error        → transient: recorded, keep going
//!         │                  terminal:  stop everything, status = Error
//!         └─► stop()       → generation += 1, timers cancelled, status = Idle
//! ```
//!
//! The counter is sans-IO. Time is passed in, recognizer callbacks arrive as
//! [`StampedEvent`]s, and everything observable is queued as [`Notice`]s for
//! the host to publish. Events stamped with an older generation are dropped,
//! which is what makes late callbacks from a stopped or replaced recognizer
//! harmless.

use std::time::Instant;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn};

use crate::config::{MatchConfig, StrategyKind};
use crate::error::{Result, SessionError};
use crate::ipc::events::{MatchSource, RecognizerEvent, SessionStatus, SessionStatusEvent};
use crate::matching::TargetPhrase;
use crate::recognizer::{
    EventSink, Recognizer, RecognizerContext, RecognizerFactory, RecognizerFault, StampedEvent,
};
use crate::session::{
    build_strategy, timer::earliest, CountingStrategy, SegmentVerdict, StrategyOutcome, Timer,
};

/// Something the host should publish or record.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Counted {
        count: u64,
        increment: u64,
        source: MatchSource,
    },
    Status(SessionStatusEvent),
    StaleEventDropped {
        generation: u64,
        current: u64,
    },
    ConsumeGuardHit,
    SegmentScored {
        words: usize,
        increment: u64,
    },
    SegmentTooShort {
        words: usize,
        required: usize,
    },
    TranscriptResetRequested,
    RecognizerRestarted,
    RecognizerReplaced,
    ErrorRecorded(SessionError),
}

/// Point-in-time view of a counter, safe to hand to other threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    pub target: String,
    pub strategy: StrategyKind,
    pub count: u64,
    pub listening: bool,
    pub status: SessionStatus,
    pub error: Option<SessionError>,
    /// Rolling buffer, or the pending segment.
    pub buffer: String,
    pub transcript: String,
    pub generation: u64,
}

pub struct PhraseCounter {
    config: MatchConfig,
    target: TargetPhrase,
    factory: Box<dyn RecognizerFactory>,
    recognizer: Option<Box<dyn Recognizer>>,
    strategy: Option<Box<dyn CountingStrategy>>,
    events: Sender<StampedEvent>,
    should_run: bool,
    listening: bool,
    status: SessionStatus,
    error: Option<SessionError>,
    count: u64,
    generation: u64,
    restart: Timer,
    last_status: Option<SessionStatusEvent>,
    notices: Vec<Notice>,
}

impl PhraseCounter {
    /// Build an idle counter. Recognizer callbacks are delivered on `events`.
    ///
    /// # Errors
    /// `LitanyError::InvalidConfig` when the target normalises to nothing.
    pub fn new(
        mut config: MatchConfig,
        target_phrase: &str,
        factory: Box<dyn RecognizerFactory>,
        events: Sender<StampedEvent>,
    ) -> Result<Self> {
        config.normalize();
        config.validate(target_phrase)?;
        let target = TargetPhrase::new(target_phrase);
        info!(
            target = target.normalized(),
            strategy = ?config.strategy,
            language = %config.language,
            "phrase counter created"
        );

        Ok(Self {
            config,
            target,
            factory,
            recognizer: None,
            strategy: None,
            events,
            should_run: false,
            listening: false,
            status: SessionStatus::Idle,
            error: None,
            count: 0,
            generation: 0,
            restart: Timer::default(),
            last_status: None,
            notices: Vec::new(),
        })
    }

    /// Begin counting. No-op while already running.
    pub fn start(&mut self, now: Instant) {
        if self.should_run {
            debug!("start ignored: session already running");
            return;
        }

        let reused = self.recognizer.is_some();
        let recognizer = self
            .recognizer
            .get_or_insert_with(|| self.factory.create());
        if !recognizer.is_supported() {
            self.fail(SessionError::EngineUnsupported);
            return;
        }

        self.error = None;
        self.count = 0;
        self.generation += 1;
        self.should_run = true;
        self.restart.cancel();

        let mut strategy = build_strategy(&self.config, &self.target, now);
        strategy.begin_run();
        self.strategy = Some(strategy);

        let _span = info_span!("session", generation = self.generation).entered();
        let started = match self.start_recognizer() {
            Ok(()) => Ok(()),
            Err(fault) if reused => {
                info!(%fault, "previous recognizer refused to start, replacing it");
                self.replace_recognizer()
            }
            Err(fault) => Err(fault.into()),
        };
        match started {
            Ok(()) => {
                info!("session started");
                self.set_status(SessionStatus::Listening);
            }
            Err(error) => self.fail(error),
        }
    }

    /// Stop counting. Idempotent; late callbacks become stale.
    pub fn stop(&mut self) {
        let was_running = self.should_run;
        self.halt();
        self.set_status(SessionStatus::Idle);
        if was_running {
            info!(count = self.count, "session stopped");
        }
    }

    /// Stop and release the recognizer.
    pub fn shutdown(&mut self) {
        self.stop();
        self.recognizer = None;
    }

    /// Ask the recognizer to drop its accumulated transcript.
    pub fn reset_transcript(&mut self) {
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.reset_transcript();
        }
    }

    /// Route one recognizer callback.
    pub fn handle_event(&mut self, stamped: StampedEvent, now: Instant) {
        if stamped.generation != self.generation {
            debug!(
                generation = stamped.generation,
                current = self.generation,
                "stale recognizer event dropped"
            );
            self.notices.push(Notice::StaleEventDropped {
                generation: stamped.generation,
                current: self.generation,
            });
            return;
        }

        let _span = info_span!("session", generation = self.generation).entered();
        match stamped.event {
            RecognizerEvent::Started => {
                self.listening = true;
                self.emit_status();
            }
            RecognizerEvent::Ended => {
                self.listening = false;
                if self.should_run {
                    info!(
                        delay_ms = self.config.auto_restart_delay_ms,
                        "recognizer ended, restart scheduled"
                    );
                    self.restart.arm(now, self.config.auto_restart_delay());
                    self.set_status(SessionStatus::Restarting);
                } else {
                    self.emit_status();
                }
            }
            RecognizerEvent::Error { code, message } => {
                let error = SessionError::from_code(&code, message);
                if error.is_terminal() {
                    self.fail(error);
                } else {
                    warn!(%error, "recognizer reported a transient error");
                    self.record_error(error);
                    self.emit_status();
                }
            }
            RecognizerEvent::Transcript { text, is_final } => {
                if let Some(outcome) = self
                    .running_strategy()
                    .map(|s| s.on_transcript(&text, is_final, now))
                {
                    self.apply(outcome);
                }
            }
            RecognizerEvent::Results {
                result_index,
                results,
            } => {
                if let Some(outcome) = self
                    .running_strategy()
                    .map(|s| s.on_results(result_index, &results, now))
                {
                    self.apply(outcome);
                }
            }
        }
    }

    /// Fire due timers: pending restart first, then the strategy's own.
    pub fn poll(&mut self, now: Instant) {
        if self.restart.fire_if_due(now) && self.should_run {
            let _span = info_span!("session", generation = self.generation).entered();
            self.restart_recognizer();
        }
        if let Some(outcome) = self.running_strategy().map(|s| s.poll(now)) {
            self.apply(outcome);
        }
    }

    /// When `poll` next has work to do, if ever.
    pub fn next_deadline(&self) -> Option<Instant> {
        if !self.should_run {
            return None;
        }
        earliest(
            self.restart.deadline(),
            self.strategy.as_ref().and_then(|s| s.next_deadline()),
        )
    }

    /// Take everything queued since the last call.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_running(&self) -> bool {
        self.should_run
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn target(&self) -> &TargetPhrase {
        &self.target
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn buffer(&self) -> &str {
        self.strategy.as_ref().map_or("", |s| s.buffer())
    }

    pub fn transcript(&self) -> &str {
        self.strategy.as_ref().map_or("", |s| s.transcript())
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            target: self.target.raw().to_string(),
            strategy: self.config.strategy,
            count: self.count,
            listening: self.listening,
            status: self.status,
            error: self.error.clone(),
            buffer: self.buffer().to_string(),
            transcript: self.transcript().to_string(),
            generation: self.generation,
        }
    }

    // ── Internal helpers ─────────────────────────────────────────────────────

    fn running_strategy(&mut self) -> Option<&mut Box<dyn CountingStrategy>> {
        if self.should_run {
            self.strategy.as_mut()
        } else {
            None
        }
    }

    fn start_recognizer(&mut self) -> std::result::Result<(), RecognizerFault> {
        let ctx = RecognizerContext {
            language: self.config.language.clone(),
            sink: EventSink::new(self.generation, self.events.clone()),
        };
        match self.recognizer.as_mut() {
            Some(recognizer) => recognizer.start(ctx),
            None => Err(RecognizerFault::Refused("no recognizer".into())),
        }
    }

    /// Restart after an unrequested end: in place first, else a fresh instance.
    fn restart_recognizer(&mut self) {
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.begin_run();
        }

        match self.start_recognizer() {
            Ok(()) => {
                info!("recognizer restarted");
                self.notices.push(Notice::RecognizerRestarted);
                self.set_status(SessionStatus::Listening);
                return;
            }
            Err(fault) => info!(%fault, "restart in place refused, replacing recognizer"),
        }

        match self.replace_recognizer() {
            Ok(()) => self.set_status(SessionStatus::Listening),
            Err(error) => self.fail(error),
        }
    }

    /// Drop the current recognizer and start a fresh one from the factory
    /// under a new generation.
    fn replace_recognizer(&mut self) -> std::result::Result<(), SessionError> {
        if let Some(mut old) = self.recognizer.take() {
            old.stop();
        }
        self.generation += 1;
        let fresh = self.factory.create();
        let supported = fresh.is_supported();
        self.recognizer = Some(fresh);
        if !supported {
            return Err(SessionError::EngineUnsupported);
        }

        self.start_recognizer()?;
        info!(generation = self.generation, "recognizer replaced");
        self.notices.push(Notice::RecognizerReplaced);
        Ok(())
    }

    /// Terminal failure: record, stop everything, surface `Error`.
    fn fail(&mut self, error: SessionError) {
        error!(%error, "session failed");
        self.halt();
        self.record_error(error);
        self.set_status(SessionStatus::Error);
    }

    fn halt(&mut self) {
        self.should_run = false;
        self.generation += 1;
        self.listening = false;
        self.restart.cancel();
        if let Some(strategy) = self.strategy.as_mut() {
            strategy.cancel_timers();
        }
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
    }

    fn record_error(&mut self, error: SessionError) {
        self.notices.push(Notice::ErrorRecorded(error.clone()));
        self.error = Some(error);
    }

    fn apply(&mut self, outcome: StrategyOutcome) {
        for hit in &outcome.hits {
            self.count += hit.increment;
            info!(
                count = self.count,
                increment = hit.increment,
                source = ?hit.source,
                "phrase counted"
            );
            self.notices.push(Notice::Counted {
                count: self.count,
                increment: hit.increment,
                source: hit.source,
            });
        }
        if outcome.reset_transcript {
            self.reset_transcript();
            self.notices.push(Notice::TranscriptResetRequested);
        }
        if outcome.consume_guard_hit {
            self.notices.push(Notice::ConsumeGuardHit);
        }
        match outcome.segment {
            Some(SegmentVerdict::Scored { words, increment }) => {
                self.notices.push(Notice::SegmentScored { words, increment });
            }
            Some(SegmentVerdict::TooShort { words, required }) => {
                self.notices
                    .push(Notice::SegmentTooShort { words, required });
            }
            None => {}
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.emit_status();
    }

    /// Queue a status notice if anything observable changed.
    fn emit_status(&mut self) {
        let event = SessionStatusEvent {
            status: self.status,
            listening: self.listening,
            error: self.error.clone(),
        };
        if self.last_status.as_ref() != Some(&event) {
            self.last_status = Some(event.clone());
            self.notices.push(Notice::Status(event));
        }
    }
}

impl Drop for PhraseCounter {
    fn drop(&mut self) {
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;

    use crate::config::ScoringMode;
    use crate::ipc::events::RecognitionResult;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Start { instance: usize, generation: u64 },
        Stop { instance: usize },
        Reset { instance: usize },
    }

    #[derive(Clone, Default)]
    struct Behaviour {
        unsupported: bool,
        refuse: Option<RecognizerFault>,
        single_use: bool,
    }

    struct FakeRecognizer {
        instance: usize,
        behaviour: Behaviour,
        starts: usize,
        log: Arc<Mutex<Vec<Call>>>,
    }

    impl Recognizer for FakeRecognizer {
        fn is_supported(&self) -> bool {
            !self.behaviour.unsupported
        }

        fn start(&mut self, ctx: RecognizerContext) -> std::result::Result<(), RecognizerFault> {
            if let Some(fault) = &self.behaviour.refuse {
                return Err(fault.clone());
            }
            if self.behaviour.single_use && self.starts > 0 {
                return Err(RecognizerFault::Refused("used".into()));
            }
            self.starts += 1;
            self.log.lock().push(Call::Start {
                instance: self.instance,
                generation: ctx.sink.generation(),
            });
            Ok(())
        }

        fn stop(&mut self) {
            self.log.lock().push(Call::Stop {
                instance: self.instance,
            });
        }

        fn reset_transcript(&mut self) {
            self.log.lock().push(Call::Reset {
                instance: self.instance,
            });
        }
    }

    struct Harness {
        counter: PhraseCounter,
        log: Arc<Mutex<Vec<Call>>>,
        t0: Instant,
    }

    impl Harness {
        fn new(config: MatchConfig, target: &str, behaviour: Behaviour) -> Self {
            let log = Arc::new(Mutex::new(Vec::new()));
            let factory_log = Arc::clone(&log);
            let mut instances = 0;
            let factory = move || -> Box<dyn Recognizer> {
                let rec = FakeRecognizer {
                    instance: instances,
                    behaviour: behaviour.clone(),
                    starts: 0,
                    log: Arc::clone(&factory_log),
                };
                instances += 1;
                Box::new(rec)
            };
            let (tx, _rx) = crossbeam_channel::unbounded();
            let counter =
                PhraseCounter::new(config, target, Box::new(factory), tx).expect("valid config");
            Self {
                counter,
                log,
                t0: Instant::now(),
            }
        }

        fn rolling() -> Self {
            Self::new(MatchConfig::default(), "je suis mort", Behaviour::default())
        }

        fn at(&self, ms: u64) -> Instant {
            self.t0 + Duration::from_millis(ms)
        }

        fn send(&mut self, event: RecognizerEvent, ms: u64) {
            let generation = self.counter.generation();
            self.send_as(generation, event, ms);
        }

        fn send_as(&mut self, generation: u64, event: RecognizerEvent, ms: u64) {
            let now = self.at(ms);
            self.counter
                .handle_event(StampedEvent { generation, event }, now);
        }

        fn starts(&self) -> Vec<(usize, u64)> {
            self.log
                .lock()
                .iter()
                .filter_map(|c| match c {
                    Call::Start {
                        instance,
                        generation,
                    } => Some((*instance, *generation)),
                    _ => None,
                })
                .collect()
        }
    }

    fn final_text(text: &str) -> RecognizerEvent {
        RecognizerEvent::Transcript {
            text: text.into(),
            is_final: true,
        }
    }

    #[test]
    fn counts_phrase_and_reports_notices() {
        let mut h = Harness::rolling();
        h.counter.start(h.t0);
        assert_eq!(h.counter.status(), SessionStatus::Listening);
        assert_eq!(h.starts(), vec![(0, 1)]);

        h.send(RecognizerEvent::Started, 10);
        assert!(h.counter.is_listening());
        h.send(final_text("Je suis mort"), 20);
        assert_eq!(h.counter.count(), 1);

        let notices = h.counter.drain_notices();
        assert!(notices.contains(&Notice::Counted {
            count: 1,
            increment: 1,
            source: MatchSource::Fuzzy
        }));
        assert!(notices
            .iter()
            .any(|n| matches!(n, Notice::Status(s) if s.listening)));
    }

    #[test]
    fn late_callbacks_after_stop_are_ignored() {
        let mut h = Harness::rolling();
        h.counter.start(h.t0);
        let stale = h.counter.generation();
        h.counter.stop();
        assert_eq!(h.counter.status(), SessionStatus::Idle);

        h.send_as(stale, final_text("je suis mort"), 50);
        h.send_as(stale, RecognizerEvent::Ended, 60);
        assert_eq!(h.counter.count(), 0);
        assert_eq!(h.counter.status(), SessionStatus::Idle);
        assert!(h
            .counter
            .drain_notices()
            .iter()
            .any(|n| matches!(n, Notice::StaleEventDropped { .. })));
        assert_eq!(h.counter.next_deadline(), None);
    }

    #[test]
    fn unrequested_end_restarts_after_delay() {
        let mut h = Harness::rolling();
        h.counter.start(h.t0);
        h.send(RecognizerEvent::Started, 0);
        h.send(RecognizerEvent::Ended, 1_000);
        assert_eq!(h.counter.status(), SessionStatus::Restarting);
        assert!(!h.counter.is_listening());
        assert_eq!(h.counter.next_deadline(), Some(h.at(1_120)));

        h.counter.poll(h.at(1_119));
        assert_eq!(h.starts().len(), 1);
        h.counter.poll(h.at(1_120));
        assert_eq!(h.starts(), vec![(0, 1), (0, 1)]);
        assert_eq!(h.counter.status(), SessionStatus::Listening);
    }

    #[test]
    fn repeated_end_events_schedule_a_single_restart() {
        let mut h = Harness::rolling();
        h.counter.start(h.t0);
        h.send(RecognizerEvent::Ended, 0);
        h.send(RecognizerEvent::Ended, 50);
        h.counter.poll(h.at(120));
        assert_eq!(h.starts().len(), 1);
        h.counter.poll(h.at(170));
        h.counter.poll(h.at(500));
        assert_eq!(h.starts().len(), 2);
    }

    #[test]
    fn stop_cancels_a_pending_restart() {
        let mut h = Harness::rolling();
        h.counter.start(h.t0);
        h.send(RecognizerEvent::Ended, 0);
        h.counter.stop();
        h.counter.poll(h.at(10_000));
        assert_eq!(h.starts().len(), 1);
        assert_eq!(h.counter.status(), SessionStatus::Idle);
    }

    #[test]
    fn unrestartable_recognizer_is_replaced_with_new_generation() {
        let behaviour = Behaviour {
            single_use: true,
            ..Behaviour::default()
        };
        let mut h = Harness::new(MatchConfig::default(), "je suis mort", behaviour);
        h.counter.start(h.t0);
        let first = h.counter.generation();
        h.send(RecognizerEvent::Ended, 0);
        h.counter.poll(h.at(120));

        let second = h.counter.generation();
        assert!(second > first);
        assert_eq!(h.starts(), vec![(0, first), (1, second)]);
        assert!(h.log.lock().contains(&Call::Stop { instance: 0 }));
        assert!(h
            .counter
            .drain_notices()
            .contains(&Notice::RecognizerReplaced));

        // The replaced instance can no longer affect the session.
        h.send_as(first, final_text("je suis mort"), 200);
        assert_eq!(h.counter.count(), 0);
        h.send_as(second, final_text("je suis mort"), 210);
        assert_eq!(h.counter.count(), 1);
    }

    #[test]
    fn single_use_recognizer_survives_stop_then_start() {
        let behaviour = Behaviour {
            single_use: true,
            ..Behaviour::default()
        };
        let mut h = Harness::new(MatchConfig::default(), "je suis mort", behaviour);
        h.counter.start(h.t0);
        h.counter.stop();
        h.counter.start(h.at(10));

        assert_eq!(h.counter.status(), SessionStatus::Listening);
        assert_eq!(h.counter.error(), None);
        let generation = h.counter.generation();
        assert_eq!(h.starts(), vec![(0, 1), (1, generation)]);
        assert!(h
            .counter
            .drain_notices()
            .contains(&Notice::RecognizerReplaced));

        h.send(final_text("je suis mort"), 20);
        assert_eq!(h.counter.count(), 1);
    }

    #[test]
    fn permission_error_is_terminal() {
        let mut h = Harness::rolling();
        h.counter.start(h.t0);
        h.send(
            RecognizerEvent::Error {
                code: "not-allowed".into(),
                message: None,
            },
            10,
        );
        assert_eq!(h.counter.status(), SessionStatus::Error);
        assert_eq!(h.counter.error(), Some(&SessionError::PermissionDenied));
        assert!(!h.counter.is_running());
        assert!(h.log.lock().contains(&Call::Stop { instance: 0 }));

        // Ending after the failure does not trigger a restart.
        h.send(RecognizerEvent::Ended, 20);
        h.counter.poll(h.at(1_000));
        assert_eq!(h.starts().len(), 1);
    }

    #[test]
    fn transient_error_is_recorded_and_counting_continues() {
        let mut h = Harness::rolling();
        h.counter.start(h.t0);
        h.send(
            RecognizerEvent::Error {
                code: "network".into(),
                message: Some("offline".into()),
            },
            10,
        );
        assert_eq!(h.counter.status(), SessionStatus::Listening);
        assert!(matches!(
            h.counter.error(),
            Some(SessionError::EngineTransientFailure { .. })
        ));
        h.send(final_text("je suis mort"), 20);
        assert_eq!(h.counter.count(), 1);
    }

    #[test]
    fn unsupported_environment_never_starts() {
        let behaviour = Behaviour {
            unsupported: true,
            ..Behaviour::default()
        };
        let mut h = Harness::new(MatchConfig::default(), "je suis mort", behaviour);
        h.counter.start(h.t0);
        assert!(h.starts().is_empty());
        assert_eq!(h.counter.status(), SessionStatus::Error);
        assert_eq!(h.counter.error(), Some(&SessionError::EngineUnsupported));
    }

    #[test]
    fn refused_start_is_surfaced() {
        let behaviour = Behaviour {
            refuse: Some(RecognizerFault::Refused("device busy".into())),
            ..Behaviour::default()
        };
        let mut h = Harness::new(MatchConfig::default(), "je suis mort", behaviour);
        h.counter.start(h.t0);
        assert!(!h.counter.is_listening());
        assert_eq!(
            h.counter.error(),
            Some(&SessionError::StartFailure {
                message: "device busy".into()
            })
        );
    }

    #[test]
    fn start_while_running_is_a_no_op_and_restart_resets_count() {
        let mut h = Harness::rolling();
        h.counter.start(h.t0);
        h.send(final_text("je suis mort"), 10);
        let generation = h.counter.generation();
        h.counter.start(h.at(20));
        assert_eq!(h.counter.generation(), generation);
        assert_eq!(h.counter.count(), 1);

        h.counter.stop();
        h.counter.start(h.at(30));
        assert_eq!(h.counter.count(), 0);
        assert_eq!(h.counter.error(), None);
    }

    #[test]
    fn segmented_session_counts_after_silence() {
        let config = MatchConfig {
            mode: ScoringMode::Contains,
            ..MatchConfig::segmented()
        };
        let mut h = Harness::new(config, "je suis mort", Behaviour::default());
        h.counter.start(h.t0);
        h.send(
            RecognizerEvent::Results {
                result_index: 0,
                results: vec![RecognitionResult::interim("je suis mort je suis mort")],
            },
            100,
        );
        assert_eq!(h.counter.buffer(), "je suis mort je suis mort");
        assert_eq!(h.counter.next_deadline(), Some(h.at(1_300)));
        h.counter.poll(h.at(1_300));
        assert_eq!(h.counter.count(), 2);
        assert_eq!(h.counter.transcript(), "je suis mort je suis mort");
    }

    #[test]
    fn maintenance_resets_recognizer_transcript() {
        let config = MatchConfig {
            transcript_reset_words: 2,
            ..MatchConfig::default()
        };
        let mut h = Harness::new(config, "je suis mort", Behaviour::default());
        h.counter.start(h.t0);
        h.send(final_text("un deux trois"), 10);
        h.counter.poll(h.at(5_000));
        assert!(h.log.lock().contains(&Call::Reset { instance: 0 }));
        assert!(h
            .counter
            .drain_notices()
            .contains(&Notice::TranscriptResetRequested));
    }

    #[test]
    fn invalid_target_is_rejected() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let factory = || -> Box<dyn Recognizer> { unreachable!("never created") };
        assert!(PhraseCounter::new(MatchConfig::default(), "…", Box::new(factory), tx).is_err());
    }
}
