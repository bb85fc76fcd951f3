//! Event-to-state classifier.
//!
//! Turns one event plus a pump's [`ClassifierContext`] into the next
//! context and a [`Decision`].  Deterministic: nothing is read besides
//! the context, the event and the configuration captured at
//! construction.  No clock reads.
//!
//! ## Per-event pipeline
//!
//! ```text
//!  event ─▶ reorder window ──stale──▶ Err(StaleEvent)
//!              │ fresh / late
//!              ▼
//!          validate ──invalid──▶ Fault path (malformed-input, hysteresis)
//!              │
//!              ▼
//!          fault bits ──set──▶ Fault (latched now, no hysteresis)
//!              │
//!              ▼
//!          fault-clear ──▶ Fault → Idle (only way out of Fault)
//!              │
//!              ▼
//!          state handler proposes ─▶ graph check ─▶ hysteresis ─▶ late check ─▶ commit
//! ```
//!
//! The first decision for a pump (`Unknown`) skips hysteresis: there is
//! no prior state to protect against flapping.

use log::{debug, info, warn};

use crate::app::events::{Decision, ReasonCode};
use crate::config::ObserverConfig;
use crate::error::{IllegalTransition, InvalidEvent, StaleEvent};
use crate::events::{Event, EventKind};
use crate::fsm::context::ClassifierContext;
use crate::fsm::states::{SampleInput, Thresholds, build_state_table};
use crate::fsm::{PumpState, StateTable};
use crate::reorder::Admission;
use crate::safety::SeverityTable;

/// Stateless classification engine.  All per-pump state lives in the
/// [`ClassifierContext`] passed to each call, so one classifier can be
/// shared by every worker.
pub struct Classifier {
    table: StateTable,
    thresholds: Thresholds,
    severity: SeverityTable,
    hysteresis: u32,
    priming_timeout_ms: u64,
    reorder_window: u64,
}

impl Classifier {
    pub fn new(config: &ObserverConfig) -> Self {
        Self {
            table: build_state_table(),
            thresholds: Thresholds::from_config(config),
            severity: config.fault_severity,
            hysteresis: config.hysteresis_samples.max(1),
            priming_timeout_ms: config.priming_timeout_ms,
            reorder_window: config.reorder_window,
        }
    }

    /// Pure form: leaves `ctx` untouched and returns the next context
    /// alongside the decision.
    pub fn classify(
        &self,
        ctx: &ClassifierContext,
        event: &Event,
    ) -> Result<(ClassifierContext, Decision), StaleEvent> {
        let mut next = ctx.clone();
        let decision = self.step(&mut next, event)?;
        Ok((next, decision))
    }

    /// Classify a whole sub-sequence in order.  Stale events are skipped
    /// and do not appear in the returned decisions.
    pub fn classify_batch(
        &self,
        ctx: &ClassifierContext,
        events: &[Event],
    ) -> (ClassifierContext, Vec<Decision>) {
        let mut next = ctx.clone();
        let decisions = events
            .iter()
            .filter_map(|e| self.step(&mut next, e).ok())
            .collect();
        (next, decisions)
    }

    /// In-place form used by the observation loop.
    ///
    /// On `Err` the context is unchanged.
    pub fn step(&self, ctx: &mut ClassifierContext, event: &Event) -> Result<Decision, StaleEvent> {
        let admission = match ctx.window_mut().admit(event.seq, self.reorder_window) {
            Ok(a) => a,
            Err(stale) => {
                debug!("[{}] {}: {}", event.pump, StaleEvent::CODE, stale);
                return Err(stale);
            }
        };
        ctx.record(event);

        let prior = ctx.state();
        let reason = if let Err(cause) = event.validate() {
            self.on_malformed(ctx, event, admission, cause)
        } else if event.has_faults() {
            self.on_fault_bits(ctx, event)
        } else {
            match event.kind {
                EventKind::FaultClear => self.on_clear(ctx, event, admission),
                EventKind::Sample => self.on_sample(ctx, event, admission),
            }
        };

        let decision = Decision {
            pump: event.pump.clone(),
            prior,
            new: ctx.state(),
            event: event.clone(),
            reason,
            timestamp_ms: event.timestamp_ms,
        };
        if decision.transitioned() {
            info!(
                "[{}] {} -> {} ({}) seq={}",
                event.pump,
                self.table[prior as usize].name,
                self.table[decision.new as usize].name,
                reason,
                event.seq
            );
        }
        Ok(decision)
    }

    // ── Paths ─────────────────────────────────────────────────

    fn on_malformed(
        &self,
        ctx: &mut ClassifierContext,
        event: &Event,
        admission: Admission,
        cause: InvalidEvent,
    ) -> ReasonCode {
        warn!("[{}] malformed input seq={}: {}", event.pump, event.seq, cause);
        let reason = ReasonCode::MalformedInput { cause };
        if ctx.state() != PumpState::Fault
            && self.gate(ctx, PumpState::Fault, event, admission).is_ok()
        {
            ctx.commit(PumpState::Fault, event);
        }
        reason
    }

    fn on_fault_bits(&self, ctx: &mut ClassifierContext, event: &Event) -> ReasonCode {
        let code = self.severity.dominant(event.fault_bits);
        let reason = match code {
            Some(code) => ReasonCode::FaultLatched {
                code,
                bit: code.bit(),
                severity: self.severity.severity(code),
            },
            // validate() guarantees defined bits; unreachable in practice.
            None => ReasonCode::Steady,
        };
        if ctx.state() != PumpState::Fault {
            ctx.commit(PumpState::Fault, event);
        } else {
            ctx.reset_counters();
        }
        ctx.latch_fault(code);
        reason
    }

    fn on_clear(&self, ctx: &mut ClassifierContext, event: &Event, admission: Admission) -> ReasonCode {
        ctx.reset_counters();
        if ctx.state() == PumpState::Fault && self.behind_commit(ctx, event, admission) {
            // Issued before the fault it would clear.
            ReasonCode::LateSample
        } else if ctx.state() == PumpState::Fault {
            ctx.commit(PumpState::Idle, event);
            ReasonCode::FaultCleared
        } else {
            ReasonCode::ClearIgnored
        }
    }

    fn on_sample(&self, ctx: &mut ClassifierContext, event: &Event, admission: Admission) -> ReasonCode {
        let prior = ctx.state();
        if prior == PumpState::Fault {
            ctx.reset_counters();
            return ReasonCode::AwaitingClear;
        }

        let input = SampleInput {
            reading: self.thresholds.interpret(event),
            elapsed_in_state_ms: ctx.elapsed_in_state_ms(event.timestamp_ms),
            priming_timeout_ms: self.priming_timeout_ms,
        };
        let Some(proposal) = (self.table[prior as usize].on_sample)(&input) else {
            // Non-qualifying sample: any streak toward a gated state ends here.
            ctx.reset_counters();
            return ReasonCode::Steady;
        };

        if !prior.can_transition_to(proposal.target) {
            let anomaly = IllegalTransition { from: prior, to: proposal.target };
            warn!("[{}] anomaly at seq={}: {}", event.pump, event.seq, anomaly);
            ctx.reset_counters();
            return ReasonCode::IllegalTransition { attempted: proposal.target };
        }

        match self.gate(ctx, proposal.target, event, admission) {
            Ok(Some(samples)) => {
                ctx.commit(proposal.target, event);
                ReasonCode::Sustained { samples }
            }
            Ok(None) => {
                ctx.commit(proposal.target, event);
                proposal.reason
            }
            Err(held) => held,
        }
    }

    /// Decide whether a transition into `target` may commit now.
    ///
    /// `Ok(Some(n))`: hysteresis satisfied after `n` samples.
    /// `Ok(None)`: no hysteresis applies.
    /// `Err(reason)`: held back; `reason` explains why.
    fn gate(
        &self,
        ctx: &mut ClassifierContext,
        target: PumpState,
        event: &Event,
        admission: Admission,
    ) -> Result<Option<u32>, ReasonCode> {
        let gated = target.needs_hysteresis() && ctx.state() != PumpState::Unknown;
        let count = if gated { ctx.bump(target) } else { 0 };

        if gated && count < self.hysteresis {
            return Err(ReasonCode::Pending {
                target,
                count,
                required: self.hysteresis,
            });
        }

        if self.behind_commit(ctx, event, admission) {
            if !gated {
                ctx.reset_counters();
            }
            return Err(ReasonCode::LateSample);
        }

        Ok(gated.then_some(count))
    }

    /// A late event at or below the last committed sequence number.
    fn behind_commit(&self, ctx: &ClassifierContext, event: &Event, admission: Admission) -> bool {
        admission == Admission::Late && ctx.last_committed_seq().is_some_and(|c| event.seq <= c)
    }
}
