//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   EventSource ──▶ Observer (domain) ──▶ DecisionSink
//! ```
//!
//! Driven adapters (line readers, log writers, message buses) implement
//! these traits.  The [`Observer`](super::service::Observer) consumes
//! them via generics, so the classification core never touches I/O
//! directly.
//!
//! ## Contract notes
//!
//! - **EventSource** errors are fatal to the current run and propagated.
//! - **DecisionSink** implementations SHOULD be idempotent: a decision may
//!   be offered more than once when an earlier attempt failed.
//! - All port errors are typed; callers must handle every variant explicitly.

use super::events::Decision;
use crate::error::{SinkError, SourceError};
use crate::events::Event;

// ───────────────────────────────────────────────────────────────
// Event source port (driven adapter: telemetry → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the observer pulls ordered batches of events.
pub trait EventSource {
    /// Next batch in arrival order.  `Ok(None)` means the source is
    /// exhausted; an empty batch is allowed and simply yields no work.
    fn next_batch(&mut self) -> Result<Option<Vec<Event>>, SourceError>;
}

// ───────────────────────────────────────────────────────────────
// Decision sink port (driven adapter: domain → log / file / bus)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the observer hands over decisions one at a time,
/// in production order per pump.
pub trait DecisionSink {
    fn emit(&mut self, decision: &Decision) -> Result<(), SinkError>;
}

impl<S: EventSource + ?Sized> EventSource for &mut S {
    fn next_batch(&mut self) -> Result<Option<Vec<Event>>, SourceError> {
        (**self).next_batch()
    }
}

impl<S: DecisionSink + ?Sized> DecisionSink for &mut S {
    fn emit(&mut self, decision: &Decision) -> Result<(), SinkError> {
        (**self).emit(decision)
    }
}

/// Collects decisions in memory.  Handy for tests and embedding.
impl DecisionSink for Vec<Decision> {
    fn emit(&mut self, decision: &Decision) -> Result<(), SinkError> {
        self.push(decision.clone());
        Ok(())
    }
}
