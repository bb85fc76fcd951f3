//! Observation loop, the hexagonal core.
//!
//! [`Observer`] owns the classifier, the per-pump context store and the
//! running statistics.  All I/O flows through port traits passed in at
//! call sites, making the whole loop testable with mock adapters.
//!
//! ```text
//!  EventSource ──▶ ┌──────────────────────────────┐ ──▶ DecisionSink
//!                  │           Observer            │
//!                  │ partition · classify · emit   │
//!                  └──────────────────────────────┘
//! ```
//!
//! One batch goes through three phases:
//!
//! 1. **Partition** by pump id (first-appearance order), then stable-sort
//!    each pump's events by sequence number.
//! 2. **Classify** pump groups on up to `workers` scoped threads.  A pump
//!    never spans two threads.
//! 3. **Emit** on the caller's thread, pump by pump, in production order.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, error, info, warn};
use serde::Serialize;

use crate::classifier::Classifier;
use crate::config::ObserverConfig;
use crate::error::{Error, SinkError};
use crate::events::{Event, PumpId};
use crate::fsm::PumpState;
use crate::fsm::context::ClassifierContext;
use crate::store::ContextStore;

use super::events::{Decision, ReasonCode};
use super::ports::{DecisionSink, EventSource};

// ───────────────────────────────────────────────────────────────
// Reports
// ───────────────────────────────────────────────────────────────

/// A decision the sink refused on every attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEmission {
    pub pump: PumpId,
    pub seq: u64,
    pub error: SinkError,
}

/// Outcome of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Events pulled from the source.
    pub events: usize,
    /// Distinct pumps in the batch.
    pub pumps: usize,
    /// Decisions that changed a pump's state.
    pub transitions: usize,
    /// Decisions the sink accepted.
    pub emitted: usize,
    /// Events discarded by the reorder window.
    pub stale: usize,
    pub malformed: usize,
    /// Proposed transitions the state graph rejected.
    pub anomalies: usize,
    pub failures: Vec<FailedEmission>,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }
}

/// Running totals across every batch an observer has processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ObserverStats {
    pub batches: u64,
    pub events: u64,
    pub transitions: u64,
    pub emitted: u64,
    pub stale: u64,
    pub malformed: u64,
    pub anomalies: u64,
    pub sink_failures: u64,
}

impl ObserverStats {
    fn absorb(&mut self, r: &BatchReport) {
        self.batches += 1;
        self.events += r.events as u64;
        self.transitions += r.transitions as u64;
        self.emitted += r.emitted as u64;
        self.stale += r.stale as u64;
        self.malformed += r.malformed as u64;
        self.anomalies += r.anomalies as u64;
        self.sink_failures += r.failures.len() as u64;
    }
}

// ───────────────────────────────────────────────────────────────
// Stop signal
// ───────────────────────────────────────────────────────────────

/// Cooperative cancellation for [`Observer::run`].  Checked between
/// batches only; a batch in flight always completes.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ───────────────────────────────────────────────────────────────
// Observer
// ───────────────────────────────────────────────────────────────

/// Decisions produced for one pump within one batch.
#[derive(Default)]
struct PumpOutcome {
    decisions: Vec<Decision>,
    stale: usize,
}

type PumpGroup = (PumpId, Vec<Event>);

pub struct Observer {
    classifier: Classifier,
    store: ContextStore,
    config: ObserverConfig,
    stats: ObserverStats,
}

impl Observer {
    /// Validate `config` and build an observer with no known pumps.
    pub fn new(config: ObserverConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            classifier: Classifier::new(&config),
            store: ContextStore::new(config.context_shards),
            config,
            stats: ObserverStats::default(),
        })
    }

    // ── Loop ──────────────────────────────────────────────────

    /// Pull batches until the source is exhausted or `stop` is raised.
    /// A source error ends the run and is returned; sink errors never do.
    pub fn run(
        &mut self,
        source: &mut impl EventSource,
        sink: &mut impl DecisionSink,
        stop: &StopSignal,
    ) -> Result<ObserverStats, Error> {
        info!(
            "observer started (workers={}, shards={}, audit={})",
            self.config.workers,
            self.store.shard_count(),
            self.config.emit_all_decisions
        );
        loop {
            if stop.is_stopped() {
                info!("stop requested after {} batches", self.stats.batches);
                break;
            }
            if self.run_batch(source, sink)?.is_none() {
                info!("source exhausted after {} batches", self.stats.batches);
                break;
            }
        }
        Ok(self.stats.clone())
    }

    /// Pull and process a single batch.  `Ok(None)` when the source is
    /// exhausted.
    pub fn run_batch(
        &mut self,
        source: &mut impl EventSource,
        sink: &mut impl DecisionSink,
    ) -> Result<Option<BatchReport>, Error> {
        let batch = source.next_batch().inspect_err(|e| error!("event source failed: {e}"))?;
        Ok(batch.map(|events| self.process_batch(events, sink)))
    }

    /// Classify one batch and hand the resulting decisions to `sink`.
    pub fn process_batch(&mut self, events: Vec<Event>, sink: &mut impl DecisionSink) -> BatchReport {
        let mut report = BatchReport {
            events: events.len(),
            ..BatchReport::default()
        };
        let groups = partition(events);
        report.pumps = groups.len();

        for outcome in self.classify_groups(&groups) {
            report.stale += outcome.stale;
            for decision in outcome.decisions {
                self.tally(&decision, &mut report);
                if decision.transitioned() || self.config.emit_all_decisions {
                    self.deliver(sink, &decision, &mut report);
                }
            }
        }

        self.stats.absorb(&report);
        debug!(
            "batch: events={} pumps={} transitions={} emitted={} stale={} malformed={} failed={}",
            report.events,
            report.pumps,
            report.transitions,
            report.emitted,
            report.stale,
            report.malformed,
            report.failed_count()
        );
        report
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state_of(&self, pump: &PumpId) -> Option<PumpState> {
        self.store.state_of(pump)
    }

    /// Copy of a pump's classifier context.
    pub fn context(&self, pump: &PumpId) -> Option<ClassifierContext> {
        self.store.snapshot(pump)
    }

    pub fn pumps(&self) -> Vec<(PumpId, PumpState)> {
        self.store.states()
    }

    pub fn stats(&self) -> &ObserverStats {
        &self.stats
    }

    pub fn config(&self) -> &ObserverConfig {
        &self.config
    }

    // ── Internal ──────────────────────────────────────────────

    /// Classify every group, returning outcomes in group order.
    fn classify_groups(&self, groups: &[PumpGroup]) -> Vec<PumpOutcome> {
        let workers = self.config.workers.min(groups.len());
        let classifier = &self.classifier;
        let store = &self.store;

        if workers <= 1 {
            return groups
                .iter()
                .map(|(pump, events)| classify_group(classifier, store, pump, events))
                .collect();
        }

        // Round-robin pumps over the workers; each slot is filled by
        // exactly one thread.
        let mut buckets: Vec<Vec<(usize, &PumpGroup)>> = vec![Vec::new(); workers];
        for (i, group) in groups.iter().enumerate() {
            buckets[i % workers].push((i, group));
        }

        let mut slots: Vec<Option<PumpOutcome>> = Vec::with_capacity(groups.len());
        slots.resize_with(groups.len(), || None);

        std::thread::scope(|s| {
            let handles: Vec<_> = buckets
                .into_iter()
                .map(|bucket| {
                    s.spawn(move || {
                        bucket
                            .into_iter()
                            .map(|(i, (pump, events))| (i, classify_group(classifier, store, pump, events)))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            for handle in handles {
                match handle.join() {
                    Ok(part) => {
                        for (i, outcome) in part {
                            slots[i] = Some(outcome);
                        }
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
        });

        slots.into_iter().flatten().collect()
    }

    fn tally(&self, decision: &Decision, report: &mut BatchReport) {
        if decision.transitioned() {
            report.transitions += 1;
        }
        match decision.reason {
            ReasonCode::MalformedInput { .. } => report.malformed += 1,
            ReasonCode::IllegalTransition { .. } => report.anomalies += 1,
            _ => {}
        }
    }

    /// Offer `decision` to the sink up to `sink_attempts` times.
    fn deliver(&self, sink: &mut impl DecisionSink, decision: &Decision, report: &mut BatchReport) {
        let attempts = self.config.sink_attempts.max(1);
        let mut last = SinkError::Unavailable;
        for attempt in 1..=attempts {
            match sink.emit(decision) {
                Ok(()) => {
                    report.emitted += 1;
                    return;
                }
                Err(e) => {
                    debug!(
                        "[{}] sink attempt {attempt}/{attempts} failed for seq={}: {e}",
                        decision.pump,
                        decision.seq()
                    );
                    last = e;
                }
            }
        }
        warn!(
            "[{}] decision seq={} dropped after {attempts} attempts: {last}",
            decision.pump,
            decision.seq()
        );
        report.failures.push(FailedEmission {
            pump: decision.pump.clone(),
            seq: decision.seq(),
            error: last,
        });
    }
}

/// Group events by pump in first-appearance order; each group is
/// stable-sorted by sequence number.
fn partition(events: Vec<Event>) -> Vec<PumpGroup> {
    let mut index: HashMap<PumpId, usize> = HashMap::new();
    let mut groups: Vec<PumpGroup> = Vec::new();
    for event in events {
        let slot = *index.entry(event.pump.clone()).or_insert_with(|| {
            groups.push((event.pump.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(event);
    }
    for (_, events) in &mut groups {
        events.sort_by_key(|e| e.seq);
    }
    groups
}

fn classify_group(
    classifier: &Classifier,
    store: &ContextStore,
    pump: &PumpId,
    events: &[Event],
) -> PumpOutcome {
    store.with_context(pump, |ctx| {
        let mut outcome = PumpOutcome::default();
        for event in events {
            match classifier.step(ctx, event) {
                Ok(decision) => outcome.decisions.push(decision),
                Err(_) => outcome.stale += 1,
            }
        }
        outcome
    })
}
