//! pumpwatch: Main Entry Point
//!
//! Reads newline-delimited telemetry events, classifies them per pump,
//! and reports decisions.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  JsonLinesSource            LogDecisionSink / JsonLines  │
//! │  (EventSource)              (DecisionSink)               │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ───────────────     │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │               Observer (pure logic)                │  │
//! │  │  Classifier · ContextStore · StateTable            │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `pumpwatch [--json] <events.jsonl | -> [config.json]`
//!
//! Logging goes to stderr (`RUST_LOG` controls the level).  With
//! `--json`, decisions are written to stdout as JSON lines instead of
//! being logged.

use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use pumpwatch::adapters::jsonl::{JsonLinesSink, JsonLinesSource};
use pumpwatch::adapters::log_sink::LogDecisionSink;
use pumpwatch::app::service::{Observer, StopSignal};
use pumpwatch::config::ObserverConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Write decisions to stdout as JSON lines instead of logging them
    #[arg(long)]
    json: bool,
    /// Newline-delimited event file, or `-` for stdin
    input: String,
    /// JSON observer configuration (defaults apply when omitted)
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    info!("pumpwatch v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => ObserverConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ObserverConfig::default(),
    };

    let reader: Box<dyn BufRead> = if cli.input == "-" {
        Box::new(io::stdin().lock())
    } else {
        let file = std::fs::File::open(&cli.input).with_context(|| format!("opening {}", cli.input))?;
        Box::new(BufReader::new(file))
    };
    let mut source = JsonLinesSource::new(reader, config.source_batch_size);

    let mut observer = Observer::new(config)?;
    // Never raised here: a run ends when the input is exhausted.
    let stop = StopSignal::new();

    let stats = if cli.json {
        let mut sink = JsonLinesSink::new(io::stdout().lock());
        observer.run(&mut source, &mut sink, &stop)?
    } else {
        let mut sink = LogDecisionSink::new();
        observer.run(&mut source, &mut sink, &stop)?
    };

    info!(
        "done: batches={} events={} transitions={} emitted={} stale={} malformed={} \
         anomalies={} sink_failures={} rejected_lines={}",
        stats.batches,
        stats.events,
        stats.transitions,
        stats.emitted,
        stats.stale,
        stats.malformed,
        stats.anomalies,
        stats.sink_failures,
        source.rejected(),
    );
    for (pump, state) in observer.pumps() {
        info!("final | {pump}: {state:?}");
    }
    Ok(())
}
