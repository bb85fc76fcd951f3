//! Pump telemetry event model.
//!
//! Events are produced by the external collector (whatever the
//! [`EventSource`](crate::app::ports::EventSource) wraps) and consumed by
//! the observation loop, one pump sub-sequence at a time.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ Collector   │────▶│  Vec<Event>  │────▶│  Observer    │
//! │ (batch pull)│     │  (one batch) │     │  per pump    │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! An event is a plain data carrier.  [`Event::validate`] checks the
//! fields but never raises: invalid events still reach the classifier,
//! which routes them to the `Fault` path.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InvalidEvent;
use crate::safety::DEFINED_FAULT_MASK;

/// Maximum pump identifier length in bytes.
pub const PUMP_ID_CAP: usize = 32;

// ── Pump identifier ───────────────────────────────────────────

/// Stable key distinguishing independently monitored pumps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PumpId(heapless::String<PUMP_ID_CAP>);

/// Returned when a pump id does not fit in [`PUMP_ID_CAP`] bytes or is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPumpId;

impl fmt::Display for InvalidPumpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pump id must be 1..={PUMP_ID_CAP} bytes")
    }
}

impl std::error::Error for InvalidPumpId {}

impl PumpId {
    pub fn new(id: &str) -> Result<Self, InvalidPumpId> {
        if id.is_empty() {
            return Err(InvalidPumpId);
        }
        let mut s = heapless::String::new();
        s.push_str(id).map_err(|()| InvalidPumpId)?;
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for PumpId {
    type Err = InvalidPumpId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for PumpId {
    fn deserialize<D: serde::Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        // heapless already rejects ids over capacity.
        let s = heapless::String::<PUMP_ID_CAP>::deserialize(de)?;
        if s.is_empty() {
            return Err(serde::de::Error::custom(InvalidPumpId));
        }
        Ok(Self(s))
    }
}

impl fmt::Display for PumpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Event ─────────────────────────────────────────────────────

/// What an event represents.  Kept as a closed set so the classifier's
/// handling stays exhaustive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// Ordinary periodic telemetry.
    #[default]
    Sample,
    /// Explicit fault-clear signal; the only way out of `Fault`.
    FaultClear,
}

/// One pump telemetry sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub pump: PumpId,
    /// Per-pump sequence number.
    pub seq: u64,
    /// Monotonic timestamp (ms).  May repeat or jitter.
    pub timestamp_ms: u64,
    /// Flow rate (L/min).
    pub flow_lpm: f32,
    /// Discharge pressure (bar).
    pub pressure_bar: f32,
    /// Raw fault bitmask, see [`FaultCode`](crate::safety::FaultCode).
    #[serde(default)]
    pub fault_bits: u16,
    #[serde(default)]
    pub kind: EventKind,
}

impl Event {
    /// A fault-free telemetry sample.
    pub fn sample(pump: PumpId, seq: u64, timestamp_ms: u64, flow_lpm: f32, pressure_bar: f32) -> Self {
        Self {
            pump,
            seq,
            timestamp_ms,
            flow_lpm,
            pressure_bar,
            fault_bits: 0,
            kind: EventKind::Sample,
        }
    }

    /// An explicit fault-clear signal with zeroed readings.
    pub fn fault_clear(pump: PumpId, seq: u64, timestamp_ms: u64) -> Self {
        Self {
            kind: EventKind::FaultClear,
            ..Self::sample(pump, seq, timestamp_ms, 0.0, 0.0)
        }
    }

    /// Builder-style fault mask override.
    #[must_use]
    pub fn with_faults(mut self, bits: u16) -> Self {
        self.fault_bits = bits;
        self
    }

    /// Field-level validation.
    ///
    /// Checks run in a fixed order so the same event always reports the
    /// same cause: non-finite readings, negative flow, negative pressure,
    /// then undefined fault bits.
    pub fn validate(&self) -> Result<(), InvalidEvent> {
        if !self.flow_lpm.is_finite() || !self.pressure_bar.is_finite() {
            return Err(InvalidEvent::NonFiniteReading);
        }
        if self.flow_lpm < 0.0 {
            return Err(InvalidEvent::NegativeFlow);
        }
        if self.pressure_bar < 0.0 {
            return Err(InvalidEvent::NegativePressure);
        }
        let undefined = self.fault_bits & !DEFINED_FAULT_MASK;
        if undefined != 0 {
            return Err(InvalidEvent::UndefinedFaultBits { bits: undefined });
        }
        Ok(())
    }

    pub fn has_faults(&self) -> bool {
        self.fault_bits != 0
    }
}
