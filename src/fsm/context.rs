//! Per-pump classifier context.
//!
//! `ClassifierContext` is the only mutable state the classifier keeps
//! for a pump: current state, when it was entered, hysteresis counters,
//! a short history of raw events, and the reorder window.  One context
//! per pump id, created lazily on the first event, never shared.

use heapless::Deque;

use super::PumpState;
use crate::events::Event;
use crate::reorder::SequenceWindow;
use crate::safety::FaultCode;

/// Number of raw events retained per pump.
pub const HISTORY_CAP: usize = 8;

#[derive(Debug, Clone)]
pub struct ClassifierContext {
    state: PumpState,
    /// Timestamp of the event that committed `state` (0 while Unknown).
    entered_at_ms: u64,
    /// Consecutive qualifying samples per candidate state.
    counters: [u32; PumpState::COUNT],
    history: Deque<Event, HISTORY_CAP>,
    window: SequenceWindow,
    last_commit_seq: Option<u64>,
    /// Dominant fault that latched the current `Fault` state.
    latched_fault: Option<FaultCode>,
    transitions: u64,
}

impl Default for ClassifierContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierContext {
    pub fn new() -> Self {
        Self {
            state: PumpState::Unknown,
            entered_at_ms: 0,
            counters: [0; PumpState::COUNT],
            history: Deque::new(),
            window: SequenceWindow::new(),
            last_commit_seq: None,
            latched_fault: None,
            transitions: 0,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> PumpState {
        self.state
    }

    /// Timestamp of the last committed transition.
    pub fn last_transition_ms(&self) -> u64 {
        self.entered_at_ms
    }

    /// Milliseconds between the current state's entry and `now_ms`.
    /// Saturates at zero when timestamps jitter backwards.
    pub fn elapsed_in_state_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.entered_at_ms)
    }

    /// Consecutive qualifying samples seen for `candidate`.
    pub fn counter(&self, candidate: PumpState) -> u32 {
        self.counters[candidate as usize]
    }

    /// Most recent raw events, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Event> {
        self.history.iter()
    }

    pub fn highest_seq(&self) -> Option<u64> {
        self.window.highest()
    }

    pub fn last_committed_seq(&self) -> Option<u64> {
        self.last_commit_seq
    }

    pub fn latched_fault(&self) -> Option<FaultCode> {
        self.latched_fault
    }

    /// Committed transitions since the context was created.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    // ── Mutation (classifier only) ────────────────────────────

    pub(crate) fn window_mut(&mut self) -> &mut SequenceWindow {
        &mut self.window
    }

    /// Append to the bounded history, evicting the oldest entry.
    pub(crate) fn record(&mut self, event: &Event) {
        if self.history.is_full() {
            self.history.pop_front();
        }
        // Cannot fail: a slot was freed above.
        let _ = self.history.push_back(event.clone());
    }

    /// Count one more qualifying sample for `candidate`, resetting every
    /// other counter.  Returns the new count.
    pub(crate) fn bump(&mut self, candidate: PumpState) -> u32 {
        let idx = candidate as usize;
        let count = self.counters[idx].saturating_add(1);
        self.counters = [0; PumpState::COUNT];
        self.counters[idx] = count;
        count
    }

    pub(crate) fn reset_counters(&mut self) {
        self.counters = [0; PumpState::COUNT];
    }

    /// Apply a transition.  The caller has already checked the graph.
    ///
    /// The commit watermark only moves forward, so a late fault latch
    /// does not reopen older sequence numbers.
    pub(crate) fn commit(&mut self, next: PumpState, event: &Event) {
        self.state = next;
        self.entered_at_ms = event.timestamp_ms;
        self.last_commit_seq = Some(self.last_commit_seq.map_or(event.seq, |c| c.max(event.seq)));
        self.transitions += 1;
        self.reset_counters();
        if next != PumpState::Fault {
            self.latched_fault = None;
        }
    }

    pub(crate) fn latch_fault(&mut self, code: Option<FaultCode>) {
        self.latched_fault = code;
    }
}
