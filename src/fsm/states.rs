//! Per-state sample handlers and table builder.
//!
//! Each state is a plain `fn` pointer that looks at an interpreted
//! sample and proposes a move.  No closures, no dynamic dispatch.
//!
//! ```text
//!  UNKNOWN ──[first sample]──▶ IDLE | PRIMING | RUNNING
//!
//!  IDLE ──[low flow]──▶ PRIMING ──[nominal flow]──▶ RUNNING
//!    ▲                     │                          │  ▲
//!    │        [stopped / timeout]       [low flow or  │  │ [nominal,
//!    ├─────────────────────┘            over-pressure]│  │  pressure ok]
//!    │                                                ▼  │
//!    └───────────[stopped]──────────────────────── THROTTLED
//!
//!  Any state ──[fault bits]──▶ FAULT ──[explicit clear]──▶ IDLE
//! ```

use serde::{Deserialize, Serialize};

use super::{Proposal, PumpState, StateDescriptor, StateTable};
use crate::app::events::ReasonCode;
use crate::config::ObserverConfig;
use crate::events::Event;

// ═══════════════════════════════════════════════════════════════════════════
//  Sample interpretation
// ═══════════════════════════════════════════════════════════════════════════

/// Coarse flow classification of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowBand {
    /// Below `idle_flow_max`: pump not moving water.
    Stopped,
    /// Between `idle_flow_max` and `running_flow_min`.
    Low,
    /// At or above `running_flow_min`.
    Nominal,
}

/// Thresholds that turn raw readings into a [`Reading`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub idle_flow_max: f32,
    pub running_flow_min: f32,
    pub throttle_pressure_min: f32,
}

impl Thresholds {
    pub fn from_config(config: &ObserverConfig) -> Self {
        Self {
            idle_flow_max: config.idle_flow_max_lpm,
            running_flow_min: config.running_flow_min_lpm,
            throttle_pressure_min: config.throttle_pressure_min_bar,
        }
    }

    pub fn interpret(&self, event: &Event) -> Reading {
        let band = if event.flow_lpm < self.idle_flow_max {
            FlowBand::Stopped
        } else if event.flow_lpm < self.running_flow_min {
            FlowBand::Low
        } else {
            FlowBand::Nominal
        };
        Reading {
            band,
            over_pressure: event.pressure_bar > self.throttle_pressure_min,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reading {
    pub band: FlowBand,
    pub over_pressure: bool,
}

/// Everything a handler may look at.
#[derive(Debug, Clone, Copy)]
pub struct SampleInput {
    pub reading: Reading,
    /// Event time minus the time the current state was entered.
    pub elapsed_in_state_ms: u64,
    pub priming_timeout_ms: u64,
}

fn propose(target: PumpState, reason: ReasonCode) -> Option<Proposal> {
    Some(Proposal { target, reason })
}

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once per classifier.
pub fn build_state_table() -> StateTable {
    [
        // Index 0 — Unknown
        StateDescriptor {
            id: PumpState::Unknown,
            name: "Unknown",
            on_sample: unknown_sample,
        },
        // Index 1 — Idle
        StateDescriptor {
            id: PumpState::Idle,
            name: "Idle",
            on_sample: idle_sample,
        },
        // Index 2 — Priming
        StateDescriptor {
            id: PumpState::Priming,
            name: "Priming",
            on_sample: priming_sample,
        },
        // Index 3 — Running
        StateDescriptor {
            id: PumpState::Running,
            name: "Running",
            on_sample: running_sample,
        },
        // Index 4 — Throttled
        StateDescriptor {
            id: PumpState::Throttled,
            name: "Throttled",
            on_sample: throttled_sample,
        },
        // Index 5 — Fault
        StateDescriptor {
            id: PumpState::Fault,
            name: "Fault",
            on_sample: fault_sample,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  UNKNOWN — first classification, no hysteresis
// ═══════════════════════════════════════════════════════════════════════════

fn unknown_sample(input: &SampleInput) -> Option<Proposal> {
    // Throttling is judged against a running baseline, which a fresh pump
    // does not have yet: nominal flow under back-pressure commits Running.
    let target = match input.reading.band {
        FlowBand::Stopped => PumpState::Idle,
        FlowBand::Low => PumpState::Priming,
        FlowBand::Nominal => PumpState::Running,
    };
    propose(target, ReasonCode::Initial)
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_sample(input: &SampleInput) -> Option<Proposal> {
    match input.reading.band {
        FlowBand::Stopped => None,
        FlowBand::Low => propose(PumpState::Priming, ReasonCode::Sample),
        // Full flow straight out of Idle skips priming; the graph rejects
        // it and the classifier records the anomaly.
        FlowBand::Nominal => propose(PumpState::Running, ReasonCode::Sample),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  PRIMING
// ═══════════════════════════════════════════════════════════════════════════

fn priming_sample(input: &SampleInput) -> Option<Proposal> {
    match input.reading.band {
        FlowBand::Stopped => propose(PumpState::Idle, ReasonCode::Sample),
        FlowBand::Low if input.elapsed_in_state_ms >= input.priming_timeout_ms => {
            propose(PumpState::Idle, ReasonCode::PrimingTimeout)
        }
        FlowBand::Low => None,
        FlowBand::Nominal => propose(PumpState::Running, ReasonCode::Sample),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUNNING
// ═══════════════════════════════════════════════════════════════════════════

fn running_sample(input: &SampleInput) -> Option<Proposal> {
    match input.reading {
        Reading { band: FlowBand::Stopped, .. } => propose(PumpState::Idle, ReasonCode::Sample),
        Reading { band: FlowBand::Low, .. } | Reading { over_pressure: true, .. } => {
            propose(PumpState::Throttled, ReasonCode::Sample)
        }
        Reading { band: FlowBand::Nominal, over_pressure: false } => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  THROTTLED
// ═══════════════════════════════════════════════════════════════════════════

fn throttled_sample(input: &SampleInput) -> Option<Proposal> {
    match input.reading {
        Reading { band: FlowBand::Stopped, .. } => propose(PumpState::Idle, ReasonCode::Sample),
        Reading { band: FlowBand::Nominal, over_pressure: false } => {
            propose(PumpState::Running, ReasonCode::Sample)
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  FAULT — latched; samples never clear it
// ═══════════════════════════════════════════════════════════════════════════

fn fault_sample(_input: &SampleInput) -> Option<Proposal> {
    None
}
