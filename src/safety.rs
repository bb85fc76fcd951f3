//! Fault catalogue and severity ranking.
//!
//! Telemetry carries a fault bitmask.  Each defined bit maps to a
//! [`FaultCode`]; any bit outside the catalogue makes the whole event
//! malformed (see [`Event::validate`](crate::events::Event::validate)).
//!
//! ## Conflicting faults
//!
//! A single sample may raise several bits at once.  The decision reports
//! the **dominant** fault: the bit with the highest severity in the
//! [`SeverityTable`], ties broken by the lowest bit index.
//!
//! ```text
//!  bit │ code           │ default severity
//! ─────┼────────────────┼─────────────────
//!   0  │ SensorDrift    │ 1
//!   1  │ SupplyLow      │ 2
//!   2  │ OverPressure   │ 4
//!   3  │ DryRun         │ 4
//!   4  │ SealLeak       │ 3
//!   5  │ MotorOverTemp  │ 5
//!   6  │ OverCurrent    │ 5
//!   7  │ EmergencyStop  │ 7
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

/// Number of defined fault bits.
pub const FAULT_BITS: usize = 8;

/// Mask covering every defined fault bit.
pub const DEFINED_FAULT_MASK: u16 = (1 << FAULT_BITS) - 1;

/// A single pump fault, identified by its bit in the telemetry mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum FaultCode {
    SensorDrift = 0,
    SupplyLow = 1,
    OverPressure = 2,
    DryRun = 3,
    SealLeak = 4,
    MotorOverTemp = 5,
    OverCurrent = 6,
    EmergencyStop = 7,
}

impl FaultCode {
    /// Every fault in bit order.
    pub const ALL: [FaultCode; FAULT_BITS] = [
        Self::SensorDrift,
        Self::SupplyLow,
        Self::OverPressure,
        Self::DryRun,
        Self::SealLeak,
        Self::MotorOverTemp,
        Self::OverCurrent,
        Self::EmergencyStop,
    ];

    /// Bit index in the telemetry mask.
    pub const fn bit(self) -> u8 {
        self as u8
    }

    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u16 {
        1 << self.bit()
    }

    /// Look a fault up by bit index.
    pub fn from_bit(bit: u8) -> Option<Self> {
        Self::ALL.get(bit as usize).copied()
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SensorDrift => write!(f, "sensor drift"),
            Self::SupplyLow => write!(f, "supply low"),
            Self::OverPressure => write!(f, "over pressure"),
            Self::DryRun => write!(f, "dry run"),
            Self::SealLeak => write!(f, "seal leak"),
            Self::MotorOverTemp => write!(f, "motor over temperature"),
            Self::OverCurrent => write!(f, "over current"),
            Self::EmergencyStop => write!(f, "emergency stop"),
        }
    }
}

/// Severity per fault bit, indexed by [`FaultCode::bit`].  Higher is worse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeverityTable(pub [u8; FAULT_BITS]);

impl Default for SeverityTable {
    fn default() -> Self {
        Self([1, 2, 4, 4, 3, 5, 5, 7])
    }
}

impl SeverityTable {
    pub fn severity(&self, code: FaultCode) -> u8 {
        self.0[code.bit() as usize]
    }

    /// Pick the dominant fault in `bits`.
    ///
    /// Bits outside [`DEFINED_FAULT_MASK`] are ignored.  Returns `None`
    /// when no defined bit is set.
    pub fn dominant(&self, bits: u16) -> Option<FaultCode> {
        let mut best: Option<FaultCode> = None;
        for code in FaultCode::ALL {
            if bits & code.mask() == 0 {
                continue;
            }
            // Strictly greater: on a tie the lower bit (seen first) wins.
            match best {
                Some(b) if self.severity(code) <= self.severity(b) => {}
                _ => best = Some(code),
            }
        }
        best
    }
}
