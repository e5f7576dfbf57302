//! Litany command-line host.
//!
//! Loads settings, builds a `CounterEngine` backed by a `ScriptedRecognizer`,
//! replays a recorded recognizer script through it and prints every count and
//! status event to stdout as JSON lines. Logs go to stderr.
//!
//! ## Runtime note
//!
//! The counter runs on its own driver thread. Tokio is only used to forward
//! broadcast events and to wait for the script (or Ctrl-C) without busy
//! polling.

mod settings;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use litany_core::{CounterEngine, Recognizer, Script, ScriptedRecognizer};
use serde::Serialize;
use settings::{default_settings_path, load_settings, parse_mode, parse_strategy, save_settings};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

const USAGE: &str = "Usage: litany [--settings <file>] [--phrase <text>] \
[--strategy rolling|segmented] [--mode exact|contains|fuzzy] [--script <file.jsonl>] [--save]";

/// Grace period after the script runs dry, on top of the silence window.
const SETTLE: Duration = Duration::from_millis(150);

#[derive(Debug, Default)]
struct Args {
    settings: Option<PathBuf>,
    phrase: Option<String>,
    strategy: Option<String>,
    mode: Option<String>,
    script: Option<PathBuf>,
    save: bool,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--settings" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --settings");
                };
                args.settings = Some(PathBuf::from(v));
            }
            "--phrase" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --phrase");
                };
                args.phrase = Some(v);
            }
            "--strategy" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --strategy");
                };
                args.strategy = Some(v);
            }
            "--mode" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --mode");
                };
                args.mode = Some(v);
            }
            "--script" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --script");
                };
                args.script = Some(PathBuf::from(v));
            }
            "--save" => args.save = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other}\n{USAGE}"),
        }
    }
    Ok(args)
}

/// One stdout line: `{"kind": "...", "event": {...}}`.
#[derive(Serialize)]
struct Line<'a, T: Serialize> {
    kind: &'static str,
    event: &'a T,
}

fn print_line<T: Serialize>(kind: &'static str, event: &T) {
    match serde_json::to_string(&Line { kind, event }) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!("failed to serialise {kind} event: {e}"),
    }
}

fn forward<T>(mut rx: broadcast::Receiver<T>, kind: &'static str) -> JoinHandle<()>
where
    T: Serialize + Clone + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => print_line(kind, &event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "{kind} forwarder lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("litany=info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("litany failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = parse_args()?;

    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    settings.apply_env_overrides();
    if let Some(phrase) = args.phrase {
        settings.target_phrase = phrase;
    }
    if let Some(raw) = args.strategy.as_deref() {
        let strategy = parse_strategy(raw).with_context(|| format!("unknown strategy {raw:?}"))?;
        settings.set_strategy(strategy);
    }
    if let Some(raw) = args.mode.as_deref() {
        settings.match_config.mode =
            parse_mode(raw).with_context(|| format!("unknown mode {raw:?}"))?;
    }
    if args.script.is_some() {
        settings.script_path = args.script;
    }
    settings.normalize();

    if args.save {
        save_settings(&settings_path, &settings)
            .with_context(|| format!("saving {}", settings_path.display()))?;
        info!(path = %settings_path.display(), "settings saved");
    }

    let script_path = settings
        .script_path
        .clone()
        .context("no script to replay: pass --script <file.jsonl>")?;
    let file = File::open(&script_path)
        .with_context(|| format!("opening {}", script_path.display()))?;
    let script = Script::from_jsonl(BufReader::new(file))?;
    info!(
        steps = script.remaining(),
        phrase = %settings.target_phrase,
        strategy = ?settings.match_config.strategy,
        "replaying script"
    );

    let factory = {
        let script = script.clone();
        move || -> Box<dyn Recognizer> { Box::new(ScriptedRecognizer::new(script.clone())) }
    };
    let engine = CounterEngine::new(
        settings.match_config.clone(),
        &settings.target_phrase,
        factory,
    )?;

    let forwarders = [
        forward(engine.subscribe_counts(), "count"),
        forward(engine.subscribe_status(), "status"),
    ];

    engine.start()?;

    let settle = settings.match_config.silence()
        + settings.match_config.auto_restart_delay()
        + SETTLE;
    tokio::select! {
        _ = wait_for_script(&script, settle) => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    engine.stop()?;
    let snapshot = engine.snapshot();
    let diagnostics = engine.diagnostics_snapshot();
    drop(engine);
    for forwarder in forwarders {
        if let Err(e) = forwarder.await {
            warn!("event forwarder failed: {e}");
        }
    }

    print_line("snapshot", &snapshot);
    print_line("diagnostics", &diagnostics);
    Ok(())
}

/// Resolve once every step has been played and pending segments had time
/// to close.
async fn wait_for_script(script: &Script, settle: Duration) {
    while !script.is_exhausted() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(settle).await;
}
