//! `ScriptedRecognizer` replays recorded recognizer events.
//!
//! Used by the CLI replay mode and by integration tests in place of a real
//! speech engine. A [`Script`] is a shared queue of timed steps; each run
//! pops steps until the queue is empty or an `ended` step is played, so an
//! auto-restarted recognizer continues where the previous run stopped.
//!
//! Script files are JSON lines, one step per line:
//!
//! ```text
//! {"delayMs":300,"event":{"type":"transcript","text":"je suis mort","isFinal":true}}
//! {"delayMs":50,"event":{"type":"ended"}}
//! ```

use std::collections::VecDeque;
use std::io::BufRead;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{Recognizer, RecognizerContext, RecognizerFault};
use crate::error::Result;
use crate::ipc::events::RecognizerEvent;

/// Sleep granularity while waiting out a step delay; bounds `stop()` latency.
const TICK: Duration = Duration::from_millis(5);

/// One timed event of a script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptStep {
    /// Wait before emitting, relative to the previous step.
    #[serde(default)]
    pub delay_ms: u64,
    pub event: RecognizerEvent,
}

impl ScriptStep {
    pub fn new(delay_ms: u64, event: RecognizerEvent) -> Self {
        Self { delay_ms, event }
    }
}

/// Shared step queue. Clones refer to the same queue.
#[derive(Debug, Clone, Default)]
pub struct Script {
    steps: Arc<Mutex<VecDeque<ScriptStep>>>,
}

impl Script {
    pub fn new(steps: impl IntoIterator<Item = ScriptStep>) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.into_iter().collect())),
        }
    }

    /// Parse JSON lines. Blank lines and `#` comments are skipped.
    pub fn from_jsonl<R: BufRead>(reader: R) -> Result<Self> {
        let mut steps = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            steps.push(serde_json::from_str::<ScriptStep>(line)?);
        }
        Ok(Self::new(steps))
    }

    pub fn remaining(&self) -> usize {
        self.steps.lock().len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    fn pop(&self) -> Option<ScriptStep> {
        self.steps.lock().pop_front()
    }
}

/// Recognizer that plays a [`Script`] on a background thread.
pub struct ScriptedRecognizer {
    script: Script,
    supported: bool,
    restartable: bool,
    refusal: Option<RecognizerFault>,
    runs: usize,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    resets: Arc<AtomicUsize>,
}

impl ScriptedRecognizer {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            supported: true,
            restartable: true,
            refusal: None,
            runs: 0,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Report no recognition capability.
    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    /// Refuse every start after the first.
    pub fn single_use(mut self) -> Self {
        self.restartable = false;
        self
    }

    /// Refuse every start with `fault`.
    pub fn refusing(mut self, fault: RecognizerFault) -> Self {
        self.refusal = Some(fault);
        self
    }

    /// Counter shared with the caller; incremented on every transcript reset.
    pub fn reset_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.resets)
    }

    fn join_worker(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("scripted recognizer worker panicked");
            }
        }
    }
}

impl Recognizer for ScriptedRecognizer {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn start(&mut self, ctx: RecognizerContext) -> std::result::Result<(), RecognizerFault> {
        if let Some(fault) = &self.refusal {
            return Err(fault.clone());
        }
        if !self.restartable && self.runs > 0 {
            return Err(RecognizerFault::Refused(
                "recognizer cannot be restarted".into(),
            ));
        }
        self.join_worker();
        self.runs += 1;
        self.running.store(true, Ordering::SeqCst);

        let script = self.script.clone();
        let running = Arc::clone(&self.running);
        let run = self.runs;
        debug!(run, language = %ctx.language, generation = ctx.sink.generation(), "scripted run starting");

        let worker = std::thread::Builder::new()
            .name(format!("litany-script-{run}"))
            .spawn(move || play(script, running, ctx))
            .map_err(|e| RecognizerFault::Refused(e.to_string()))?;
        self.worker = Some(worker);
        Ok(())
    }

    fn stop(&mut self) {
        self.join_worker();
    }

    fn reset_transcript(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
        debug!("scripted recognizer transcript reset");
    }
}

impl Drop for ScriptedRecognizer {
    fn drop(&mut self) {
        self.join_worker();
    }
}

/// Worker body: announce the run, then play steps until the run ends.
fn play(script: Script, running: Arc<AtomicBool>, ctx: RecognizerContext) {
    if !ctx.sink.emit(RecognizerEvent::Started) {
        return;
    }

    while let Some(step) = script.pop() {
        if !wait(&running, Duration::from_millis(step.delay_ms)) {
            return;
        }
        let ends_run = matches!(step.event, RecognizerEvent::Ended);
        if !ctx.sink.emit(step.event) || ends_run {
            running.store(false, Ordering::SeqCst);
            return;
        }
    }
}

/// Sleep for `total` in small ticks. `false` if stopped meanwhile.
fn wait(running: &AtomicBool, total: Duration) -> bool {
    let mut left = total;
    while !left.is_zero() {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let step = left.min(TICK);
        std::thread::sleep(step);
        left -= step;
    }
    running.load(Ordering::SeqCst)
}
