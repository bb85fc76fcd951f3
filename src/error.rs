//! Unified error types for the pump observer.
//!
//! Classification itself never fails the observer: malformed input and
//! illegal transitions are recorded on the [`Decision`](crate::app::events::Decision)
//! they produce, and stale events are reported as [`StaleEvent`].  Only a
//! collaborator-level failure (the event source) is fatal and surfaces as
//! [`Error`].

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::fsm::PumpState;

// ---------------------------------------------------------------------------
// Top-level observer error
// ---------------------------------------------------------------------------

/// Errors that stop the observation loop and are handed to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The event source could not deliver a batch.
    Source(SourceError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(e) => write!(f, "source: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<SourceError> for Error {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Invalid events
// ---------------------------------------------------------------------------

/// Why an event failed field-level validation.
///
/// Invalid events are never dropped: they are routed to the `Fault` path
/// with reason `malformed-input`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidEvent {
    /// Flow rate below zero.
    NegativeFlow,
    /// Pressure below zero.
    NegativePressure,
    /// Flow or pressure is NaN or infinite.
    NonFiniteReading,
    /// Fault bitmask carries bits outside the defined fault catalogue.
    UndefinedFaultBits { bits: u16 },
}

impl fmt::Display for InvalidEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegativeFlow => write!(f, "negative flow rate"),
            Self::NegativePressure => write!(f, "negative pressure"),
            Self::NonFiniteReading => write!(f, "non-finite reading"),
            Self::UndefinedFaultBits { bits } => {
                write!(f, "undefined fault bits 0x{bits:04x}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Stale events
// ---------------------------------------------------------------------------

/// An event discarded by the reorder window: either further behind the
/// highest sequence number than the window allows, or a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaleEvent {
    pub seq: u64,
    /// Highest sequence number seen for the pump when the event arrived.
    pub highest: u64,
    pub duplicate: bool,
}

impl StaleEvent {
    /// Log tag for discarded events.
    pub const CODE: &'static str = "stale";
}

impl fmt::Display for StaleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.duplicate {
            write!(f, "seq {} already seen (highest {})", self.seq, self.highest)
        } else {
            write!(f, "seq {} outside reorder window (highest {})", self.seq, self.highest)
        }
    }
}

// ---------------------------------------------------------------------------
// Illegal transitions
// ---------------------------------------------------------------------------

/// A transition the state graph does not allow.  Logged as an anomaly;
/// the pump keeps its current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: PumpState,
    pub to: PumpState,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal transition {:?} -> {:?}", self.from, self.to)
    }
}

// ---------------------------------------------------------------------------
// Collaborator errors
// ---------------------------------------------------------------------------

/// Errors from [`EventSource`](crate::app::ports::EventSource) operations.
/// Always fatal to the current `run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The upstream collector could not be reached.
    Unreachable(&'static str),
    /// Reading from the underlying stream failed.
    Io(std::io::ErrorKind),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(what) => write!(f, "source unreachable: {what}"),
            Self::Io(kind) => write!(f, "source I/O error: {kind}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// Errors from [`DecisionSink`](crate::app::ports::DecisionSink) operations.
/// Retried, then counted; never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The sink refused the decision.
    Rejected(&'static str),
    /// The sink is temporarily unavailable.
    Unavailable,
    /// Writing to the underlying stream failed.
    Io(std::io::ErrorKind),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(why) => write!(f, "sink rejected decision: {why}"),
            Self::Unavailable => write!(f, "sink unavailable"),
            Self::Io(kind) => write!(f, "sink I/O error: {kind}"),
        }
    }
}

impl std::error::Error for SinkError {}

/// Errors from loading or validating [`ObserverConfig`](crate::config::ObserverConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// The config document could not be parsed.
    Corrupted,
    /// The config file could not be read.
    Io(std::io::ErrorKind),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::Io(kind) => write!(f, "I/O error: {kind}"),
        }
    }
}

impl std::error::Error for ConfigError {}
