//! Outbound classification decisions.
//!
//! The [`Classifier`](crate::classifier::Classifier) produces one
//! [`Decision`] per admitted event; the
//! [`Observer`](super::service::Observer) hands them to the
//! [`DecisionSink`](super::ports::DecisionSink) port.  Adapters on the
//! other side decide what to do with them (log line, JSON file, alert
//! pipe).

use core::fmt;

use serde::Serialize;

use crate::error::InvalidEvent;
use crate::events::{Event, PumpId};
use crate::fsm::PumpState;
use crate::safety::FaultCode;

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ReasonCode {
    /// First classification of a previously unseen pump.
    Initial,
    /// Transition driven by a single sample.
    Sample,
    /// Transition committed after enough consecutive samples.
    Sustained { samples: u32 },
    /// Priming ran past its timeout; back to Idle.
    PrimingTimeout,
    /// Non-zero fault mask; `code` is the dominant fault.
    FaultLatched { code: FaultCode, bit: u8, severity: u8 },
    /// Explicit clear signal released a latched fault.
    FaultCleared,
    /// The event failed validation and was routed to the Fault path.
    MalformedInput { cause: InvalidEvent },
    /// Qualifying sample counted toward a hysteresis-gated transition.
    Pending { target: PumpState, count: u32, required: u32 },
    /// Nothing changed.
    Steady,
    /// Sample arrived while latched in Fault; ignored until cleared.
    AwaitingClear,
    /// Clear signal arrived while not in Fault.
    ClearIgnored,
    /// Late event; counted but not allowed to commit past a newer transition.
    LateSample,
    /// Proposed transition not in the state graph; state unchanged.
    IllegalTransition { attempted: PumpState },
}

impl ReasonCode {
    /// Stable kebab-case code, suitable for log lines and metrics labels.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Sample => "sample",
            Self::Sustained { .. } => "sustained",
            Self::PrimingTimeout => "priming-timeout",
            Self::FaultLatched { .. } => "fault-latched",
            Self::FaultCleared => "fault-cleared",
            Self::MalformedInput { .. } => "malformed-input",
            Self::Pending { .. } => "pending",
            Self::Steady => "steady",
            Self::AwaitingClear => "awaiting-clear",
            Self::ClearIgnored => "clear-ignored",
            Self::LateSample => "late-sample",
            Self::IllegalTransition { .. } => "illegal-transition",
        }
    }

    /// Reasons a careful operator wants to see even without a transition.
    pub const fn is_anomaly(&self) -> bool {
        matches!(self, Self::IllegalTransition { .. } | Self::MalformedInput { .. })
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sustained { samples } => write!(f, "sustained({samples})"),
            Self::FaultLatched { code, bit, severity } => {
                write!(f, "fault-latched(bit {bit}: {code}, severity {severity})")
            }
            Self::MalformedInput { cause } => write!(f, "malformed-input({cause})"),
            Self::Pending { target, count, required } => {
                write!(f, "pending({target:?} {count}/{required})")
            }
            Self::IllegalTransition { attempted } => {
                write!(f, "illegal-transition(-> {attempted:?})")
            }
            other => f.write_str(other.as_str()),
        }
    }
}

/// The classifier's verdict on one event.  Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub pump: PumpId,
    pub prior: PumpState,
    pub new: PumpState,
    pub event: Event,
    pub reason: ReasonCode,
    pub timestamp_ms: u64,
}

impl Decision {
    /// True when the decision moved the pump to a different state.
    pub fn transitioned(&self) -> bool {
        self.prior != self.new
    }

    pub fn seq(&self) -> u64 {
        self.event.seq
    }
}
