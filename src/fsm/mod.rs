//! Pump operational state model.
//!
//! Classic table-driven FSM, one row per state:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  StateTable                                                   │
//! │  ┌───────────┬──────────────────────────┬──────────────────┐  │
//! │  │ PumpState │ successors               │ on_sample        │  │
//! │  ├───────────┼──────────────────────────┼──────────────────┤  │
//! │  │ Unknown   │ Idle Priming Running Flt │ fn(in)->Option<> │  │
//! │  │ Idle      │ Priming Fault            │ fn(in)->Option<> │  │
//! │  │ Priming   │ Running Fault Idle       │ fn(in)->Option<> │  │
//! │  │ Running   │ Throttled Fault Idle     │ fn(in)->Option<> │  │
//! │  │ Throttled │ Running Fault Idle       │ fn(in)->Option<> │  │
//! │  │ Fault     │ Idle (explicit clear)    │ fn(in)->Option<> │  │
//! │  └───────────┴──────────────────────────┴──────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! `on_sample` proposes where a telemetry sample would take the pump.
//! The [`Classifier`](crate::classifier::Classifier) decides whether the
//! proposal is committed: it checks the successor list, applies
//! hysteresis, and gives the fault mask precedence over all of it.

pub mod context;
pub mod states;

use serde::{Deserialize, Serialize};

use crate::app::events::ReasonCode;
use states::SampleInput;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Every operational state a pump can be classified into.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PumpState {
    Unknown = 0,
    Idle = 1,
    Priming = 2,
    Running = 3,
    Throttled = 4,
    Fault = 5,
}

impl PumpState {
    /// Total number of states; sizes the table and counters.
    pub const COUNT: usize = 6;

    pub const ALL: [PumpState; Self::COUNT] = [
        Self::Unknown,
        Self::Idle,
        Self::Priming,
        Self::Running,
        Self::Throttled,
        Self::Fault,
    ];

    /// States reachable in one step.
    pub const fn successors(self) -> &'static [PumpState] {
        match self {
            Self::Unknown => &[Self::Idle, Self::Priming, Self::Running, Self::Fault],
            Self::Idle => &[Self::Priming, Self::Fault],
            Self::Priming => &[Self::Running, Self::Fault, Self::Idle],
            Self::Running => &[Self::Throttled, Self::Fault, Self::Idle],
            Self::Throttled => &[Self::Running, Self::Fault, Self::Idle],
            Self::Fault => &[Self::Idle],
        }
    }

    pub fn can_transition_to(self, next: PumpState) -> bool {
        self.successors().contains(&next)
    }

    /// Entering these states needs K consecutive qualifying samples.
    pub const fn needs_hysteresis(self) -> bool {
        matches!(self, Self::Throttled | Self::Fault)
    }
}

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// A transition proposed by a state handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proposal {
    pub target: PumpState,
    pub reason: ReasonCode,
}

/// Signature for the per-sample handler.
/// Returns `Some(proposal)` to request a transition, or `None` to stay.
pub type SampleHandlerFn = fn(&SampleInput) -> Option<Proposal>;

/// Static descriptor for a single state.
/// Stored in a fixed-size array, no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: PumpState,
    pub name: &'static str,
    pub on_sample: SampleHandlerFn,
}

/// Fixed-size table indexed by `PumpState as usize`.
pub type StateTable = [StateDescriptor; PumpState::COUNT];
