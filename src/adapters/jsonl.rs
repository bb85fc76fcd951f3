//! JSON-lines adapters.
//!
//! [`JsonLinesSource`] reads one [`Event`] per line from any `BufRead`;
//! [`JsonLinesSink`] writes one [`Decision`] per line to any `Write`.
//!
//! ```text
//! {"pump":"p1","seq":1,"timestamp_ms":0,"flow_lpm":5.0,"pressure_bar":1.2}
//! {"pump":"p1","seq":2,"timestamp_ms":500,"flow_lpm":0.0,"pressure_bar":0.0,"kind":"fault-clear"}
//! ```
//!
//! Blank lines are skipped.  Lines that do not parse as an event are
//! logged at error level and skipped; they never end the stream.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use log::{debug, error};

use crate::app::events::Decision;
use crate::app::ports::{DecisionSink, EventSource};
use crate::error::{SinkError, SourceError};
use crate::events::Event;

// ───────────────────────────────────────────────────────────────
// Source
// ───────────────────────────────────────────────────────────────

pub struct JsonLinesSource<R> {
    reader: R,
    batch_size: usize,
    line_no: u64,
    rejected: u64,
    done: bool,
}

impl JsonLinesSource<BufReader<File>> {
    /// Open a file of newline-delimited events.
    pub fn open(path: &Path, batch_size: usize) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|e| SourceError::Io(e.kind()))?;
        Ok(Self::new(BufReader::new(file), batch_size))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    /// `batch_size` is clamped to at least one line.
    pub fn new(reader: R, batch_size: usize) -> Self {
        Self {
            reader,
            batch_size: batch_size.max(1),
            line_no: 0,
            rejected: 0,
            done: false,
        }
    }

    /// Lines that failed to parse so far.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

impl<R: BufRead> EventSource for JsonLinesSource<R> {
    fn next_batch(&mut self) -> Result<Option<Vec<Event>>, SourceError> {
        if self.done {
            return Ok(None);
        }
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut line = String::new();
        while batch.len() < self.batch_size {
            line.clear();
            let n = self
                .reader
                .read_line(&mut line)
                .map_err(|e| SourceError::Io(e.kind()))?;
            if n == 0 {
                self.done = true;
                break;
            }
            self.line_no += 1;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(text) {
                Ok(event) => batch.push(event),
                Err(e) => {
                    self.rejected += 1;
                    error!("line {}: unparseable event skipped: {e}", self.line_no);
                }
            }
        }
        if batch.is_empty() && self.done {
            return Ok(None);
        }
        debug!("read {} events (through line {})", batch.len(), self.line_no);
        Ok(Some(batch))
    }
}

// ───────────────────────────────────────────────────────────────
// Sink
// ───────────────────────────────────────────────────────────────

pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DecisionSink for JsonLinesSink<W> {
    fn emit(&mut self, decision: &Decision) -> Result<(), SinkError> {
        let line = serde_json::to_string(decision)
            .map_err(|_| SinkError::Rejected("decision not serializable"))?;
        self.writer
            .write_all(line.as_bytes())
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush())
            .map_err(|e| SinkError::Io(e.kind()))
    }
}
