//! Mock source and sink adapters for integration tests.
//!
//! Record every call so tests can assert on the full emission history
//! without touching files or sockets.

use std::collections::VecDeque;

use pumpwatch::app::events::Decision;
use pumpwatch::app::ports::{DecisionSink, EventSource};
use pumpwatch::error::{SinkError, SourceError};
use pumpwatch::events::{Event, PumpId};

// ── Event builders ────────────────────────────────────────────

pub fn pump(id: &str) -> PumpId {
    PumpId::new(id).unwrap()
}

/// Sample with timestamps 500 ms apart.
pub fn sample(id: &str, seq: u64, flow: f32, pressure: f32) -> Event {
    Event::sample(pump(id), seq, seq * 500, flow, pressure)
}

// ── MockSource ────────────────────────────────────────────────

/// Hands out pre-built batches, then either reports exhaustion or fails.
pub struct MockSource {
    batches: VecDeque<Vec<Event>>,
    fail_when_empty: Option<SourceError>,
    pub pulls: usize,
}

#[allow(dead_code)]
impl MockSource {
    pub fn new(batches: Vec<Vec<Event>>) -> Self {
        Self {
            batches: batches.into(),
            fail_when_empty: None,
            pulls: 0,
        }
    }

    /// After the scripted batches, return `err` instead of `None`.
    pub fn failing_after(batches: Vec<Vec<Event>>, err: SourceError) -> Self {
        Self {
            fail_when_empty: Some(err),
            ..Self::new(batches)
        }
    }
}

impl EventSource for MockSource {
    fn next_batch(&mut self) -> Result<Option<Vec<Event>>, SourceError> {
        self.pulls += 1;
        match self.batches.pop_front() {
            Some(batch) => Ok(Some(batch)),
            None => match &self.fail_when_empty {
                Some(err) => Err(err.clone()),
                None => Ok(None),
            },
        }
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub decisions: Vec<Decision>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decisions for one pump, in emission order.
    pub fn for_pump(&self, id: &str) -> Vec<&Decision> {
        self.decisions.iter().filter(|d| d.pump.as_str() == id).collect()
    }
}

impl DecisionSink for RecordingSink {
    fn emit(&mut self, decision: &Decision) -> Result<(), SinkError> {
        self.decisions.push(decision.clone());
        Ok(())
    }
}

// ── FlakySink ─────────────────────────────────────────────────

/// Fails a scripted number of calls before accepting, or always fails.
pub struct FlakySink {
    failures_left: usize,
    always_fail: bool,
    pub attempts: usize,
    pub accepted: Vec<Decision>,
}

#[allow(dead_code)]
impl FlakySink {
    /// Fail the next `n` calls, then accept everything.
    pub fn failing(n: usize) -> Self {
        Self {
            failures_left: n,
            always_fail: false,
            attempts: 0,
            accepted: Vec::new(),
        }
    }

    pub fn broken() -> Self {
        Self {
            always_fail: true,
            ..Self::failing(0)
        }
    }
}

impl DecisionSink for FlakySink {
    fn emit(&mut self, decision: &Decision) -> Result<(), SinkError> {
        self.attempts += 1;
        if self.always_fail {
            return Err(SinkError::Unavailable);
        }
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(SinkError::Io(std::io::ErrorKind::BrokenPipe));
        }
        self.accepted.push(decision.clone());
        Ok(())
    }
}
