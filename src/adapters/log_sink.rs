//! Log-based decision sink adapter.
//!
//! Implements [`DecisionSink`] by writing one structured line per
//! decision to the `log` facade.  A message-bus adapter would implement
//! the same trait.

use log::{info, warn};

use crate::app::events::Decision;
use crate::app::ports::DecisionSink;
use crate::error::SinkError;

/// Adapter that logs every [`Decision`] it is handed.  Never fails.
#[derive(Debug, Default)]
pub struct LogDecisionSink {
    written: u64,
}

impl LogDecisionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decisions logged so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl DecisionSink for LogDecisionSink {
    fn emit(&mut self, d: &Decision) -> Result<(), SinkError> {
        self.written += 1;
        if d.reason.is_anomaly() {
            warn!(
                "DECISION | pump={} seq={} t={}ms | {:?} -> {:?} | {}",
                d.pump,
                d.seq(),
                d.timestamp_ms,
                d.prior,
                d.new,
                d.reason
            );
        } else {
            info!(
                "DECISION | pump={} seq={} t={}ms | {:?} -> {:?} | {} | \
                 flow={:.2}L/min pressure={:.2}bar faults=0b{:08b}",
                d.pump,
                d.seq(),
                d.timestamp_ms,
                d.prior,
                d.new,
                d.reason,
                d.event.flow_lpm,
                d.event.pressure_bar,
                d.event.fault_bits,
            );
        }
        Ok(())
    }
}
