//! Per-pump reorder window.
//!
//! Tracks the highest sequence number seen and a 64-bit bitmap of which
//! of the trailing sequence numbers have already been admitted.  Bit `d`
//! of the bitmap stands for sequence `highest - d`.
//!
//! ```text
//!            window (e.g. 4)
//!        ◀────────────────────▶
//!   ... │ h-5 │ h-4 │ h-3 │ h-2 │ h-1 │  h  │ ──▶ fresh
//!   stale │      late (if unseen)         │
//! ```
//!
//! - `seq > highest`  → [`Admission::Fresh`], window slides forward.
//! - `highest - seq <= window` and unseen → [`Admission::Late`].
//! - anything else (too old, or already seen) → [`StaleEvent`].

use crate::error::StaleEvent;

/// Largest reorder window the bitmap can represent.
pub const MAX_REORDER_WINDOW: u64 = 63;

/// How an accepted sequence number relates to what was seen before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Above everything seen so far.
    Fresh,
    /// Behind the highest, but inside the window and not seen before.
    Late,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceWindow {
    highest: Option<u64>,
    seen: u64,
}

impl SequenceWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest sequence number admitted so far.
    pub fn highest(&self) -> Option<u64> {
        self.highest
    }

    /// Admit `seq` or reject it as stale.  `window` must not exceed
    /// [`MAX_REORDER_WINDOW`]; larger values are treated as the maximum.
    pub fn admit(&mut self, seq: u64, window: u64) -> Result<Admission, StaleEvent> {
        let window = window.min(MAX_REORDER_WINDOW);
        let Some(highest) = self.highest else {
            self.highest = Some(seq);
            self.seen = 1;
            return Ok(Admission::Fresh);
        };

        if seq > highest {
            let shift = seq - highest;
            self.seen = if shift >= 64 { 0 } else { self.seen << shift };
            self.seen |= 1;
            self.highest = Some(seq);
            return Ok(Admission::Fresh);
        }

        let distance = highest - seq;
        if distance > window {
            return Err(StaleEvent { seq, highest, duplicate: false });
        }
        let bit = 1u64 << distance;
        if self.seen & bit != 0 {
            return Err(StaleEvent { seq, highest, duplicate: true });
        }
        self.seen |= bit;
        Ok(Admission::Late)
    }
}
