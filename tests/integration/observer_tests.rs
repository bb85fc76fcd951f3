//! Integration tests for the EventSource → Observer → DecisionSink pipeline.
//!
//! Every test drives the public `Observer` API with in-memory adapters
//! and checks both what reached the sink and the per-pump state left
//! behind.

use super::mock_io::{FlakySink, MockSource, RecordingSink, pump, sample};

use pumpwatch::app::events::ReasonCode;
use pumpwatch::app::service::{Observer, StopSignal};
use pumpwatch::config::ObserverConfig;
use pumpwatch::error::{Error, SinkError, SourceError};
use pumpwatch::events::Event;
use pumpwatch::fsm::PumpState;
use pumpwatch::safety::FaultCode;

fn make_observer() -> Observer {
    Observer::new(ObserverConfig::default()).unwrap()
}

// ── Classification scenarios ──────────────────────────────────

#[test]
fn steady_flow_from_unknown_emits_single_running_transition() {
    let mut obs = make_observer();
    let mut sink = RecordingSink::new();

    let report = obs.process_batch(
        vec![sample("P", 1, 5.0, 1.0), sample("P", 2, 5.0, 1.0), sample("P", 3, 5.0, 1.0)],
        &mut sink,
    );

    assert_eq!(report.events, 3);
    assert_eq!(report.transitions, 1);
    assert_eq!(sink.decisions.len(), 1);
    let d = &sink.decisions[0];
    assert_eq!((d.prior, d.new), (PumpState::Unknown, PumpState::Running));
    assert_eq!(d.seq(), 1);
    assert_eq!(obs.state_of(&pump("P")), Some(PumpState::Running));
}

#[test]
fn fault_bit_from_running_latches_fault_immediately() {
    let mut obs = make_observer();
    let mut sink = RecordingSink::new();

    obs.process_batch(vec![sample("P", 1, 5.0, 1.0)], &mut sink);
    obs.process_batch(vec![sample("P", 2, 5.0, 1.0).with_faults(0x4)], &mut sink);

    let last = sink.decisions.last().unwrap();
    assert_eq!((last.prior, last.new), (PumpState::Running, PumpState::Fault));
    assert_eq!(
        last.reason,
        ReasonCode::FaultLatched { code: FaultCode::OverPressure, bit: 2, severity: 4 }
    );
    let ctx = obs.context(&pump("P")).unwrap();
    assert_eq!(ctx.latched_fault(), Some(FaultCode::OverPressure));
}

#[test]
fn two_throttled_samples_then_running_sample_do_not_transition() {
    let mut obs = make_observer();
    let mut sink = RecordingSink::new();

    let report = obs.process_batch(
        vec![
            sample("P", 1, 5.0, 1.0),
            sample("P", 2, 1.0, 1.0),
            sample("P", 3, 1.0, 1.0),
            sample("P", 4, 5.0, 1.0),
        ],
        &mut sink,
    );

    assert_eq!(report.transitions, 1, "only the initial classification");
    assert_eq!(obs.state_of(&pump("P")), Some(PumpState::Running));
    let ctx = obs.context(&pump("P")).unwrap();
    assert_eq!(ctx.counter(PumpState::Throttled), 0, "counter reset by the running sample");
}

#[test]
fn three_throttled_samples_commit_throttled() {
    let mut obs = make_observer();
    let mut sink = RecordingSink::new();

    obs.process_batch(
        vec![
            sample("P", 1, 5.0, 1.0),
            sample("P", 2, 5.0, 8.0),
            sample("P", 3, 5.0, 8.0),
            sample("P", 4, 5.0, 8.0),
        ],
        &mut sink,
    );

    let last = sink.decisions.last().unwrap();
    assert_eq!(last.new, PumpState::Throttled);
    assert_eq!(last.reason, ReasonCode::Sustained { samples: 3 });
    assert_eq!(last.seq(), 4);
}

#[test]
fn fault_clear_returns_pump_to_idle() {
    let mut obs = make_observer();
    let mut sink = RecordingSink::new();

    obs.process_batch(
        vec![
            sample("P", 1, 5.0, 1.0).with_faults(FaultCode::DryRun.mask()),
            sample("P", 2, 5.0, 1.0),
            Event::fault_clear(pump("P"), 3, 1_500),
        ],
        &mut sink,
    );

    let states: Vec<_> = sink.decisions.iter().map(|d| d.new).collect();
    assert_eq!(states, [PumpState::Fault, PumpState::Idle]);
    assert_eq!(sink.decisions[1].reason, ReasonCode::FaultCleared);
}

#[test]
fn malformed_first_event_faults_and_is_counted() {
    let mut obs = make_observer();
    let mut sink = RecordingSink::new();

    let report = obs.process_batch(vec![sample("P", 1, -3.0, 1.0)], &mut sink);

    assert_eq!(report.malformed, 1);
    assert_eq!(sink.decisions.len(), 1);
    assert!(matches!(sink.decisions[0].reason, ReasonCode::MalformedInput { .. }));
    assert_eq!(obs.state_of(&pump("P")), Some(PumpState::Fault));
}

#[test]
fn illegal_transition_is_counted_but_not_applied() {
    let mut obs = make_observer();
    let mut sink = RecordingSink::new();

    let report = obs.process_batch(vec![sample("P", 1, 0.0, 0.0), sample("P", 2, 5.0, 1.0)], &mut sink);

    assert_eq!(report.anomalies, 1);
    assert_eq!(report.transitions, 1);
    assert_eq!(obs.state_of(&pump("P")), Some(PumpState::Idle));
}

// ── Partitioning and ordering ─────────────────────────────────

#[test]
fn interleaved_pumps_are_classified_independently() {
    let mut obs = make_observer();
    let mut sink = RecordingSink::new();

    let report = obs.process_batch(
        vec![
            sample("A", 1, 5.0, 1.0),
            sample("B", 1, 1.0, 1.0),
            sample("A", 2, 0.0, 0.0),
            sample("B", 2, 5.0, 1.0),
        ],
        &mut sink,
    );

    assert_eq!(report.pumps, 2);
    assert_eq!(obs.state_of(&pump("A")), Some(PumpState::Idle));
    assert_eq!(obs.state_of(&pump("B")), Some(PumpState::Running));

    // First-appearance order: all of A, then all of B.
    let order: Vec<&str> = sink.decisions.iter().map(|d| d.pump.as_str()).collect();
    assert_eq!(order, ["A", "A", "B", "B"]);
}

#[test]
fn out_of_order_batch_is_sorted_by_sequence() {
    let mut obs = make_observer();
    let mut sink = RecordingSink::new();

    obs.process_batch(
        vec![sample("P", 3, 0.0, 0.0), sample("P", 1, 1.0, 1.0), sample("P", 2, 5.0, 1.0)],
        &mut sink,
    );

    let path: Vec<_> = sink.for_pump("P").iter().map(|d| (d.seq(), d.new)).collect();
    assert_eq!(
        path,
        [(1, PumpState::Priming), (2, PumpState::Running), (3, PumpState::Idle)]
    );
}

#[test]
fn one_batch_equals_many_small_batches() {
    let events = vec![
        sample("A", 1, 5.0, 1.0),
        sample("B", 1, 0.0, 0.0),
        sample("A", 2, 1.0, 1.0),
        sample("B", 2, 1.0, 1.0),
        sample("A", 3, 1.0, 1.0),
        sample("A", 4, 1.0, 1.0),
        sample("B", 3, 5.0, 1.0),
        sample("A", 5, 5.0, 1.0).with_faults(0x10),
    ];

    let mut whole = make_observer();
    let mut whole_sink = RecordingSink::new();
    whole.process_batch(events.clone(), &mut whole_sink);

    let mut split = make_observer();
    let mut split_sink = RecordingSink::new();
    for e in events {
        split.process_batch(vec![e], &mut split_sink);
    }

    for id in ["A", "B"] {
        assert_eq!(whole_sink.for_pump(id), split_sink.for_pump(id), "pump {id}");
        assert_eq!(whole.state_of(&pump(id)), split.state_of(&pump(id)));
    }
}

#[test]
fn single_worker_matches_parallel_workers() {
    let events: Vec<Event> = (0..12)
        .flat_map(|n| {
            let id = format!("pump-{n}");
            vec![sample(&id, 1, 5.0, 1.0), sample(&id, 2, 5.0, 9.0), sample(&id, 3, 0.0, 0.0)]
        })
        .collect();

    let serial_cfg = ObserverConfig { workers: 1, ..ObserverConfig::default() };
    let parallel_cfg = ObserverConfig { workers: 8, context_shards: 3, ..ObserverConfig::default() };

    let mut serial = Observer::new(serial_cfg).unwrap();
    let mut parallel = Observer::new(parallel_cfg).unwrap();
    let mut a = RecordingSink::new();
    let mut b = RecordingSink::new();
    serial.process_batch(events.clone(), &mut a);
    parallel.process_batch(events, &mut b);

    assert_eq!(a.decisions, b.decisions);
}

// ── Sink failures ─────────────────────────────────────────────

#[test]
fn transient_sink_failure_is_retried() {
    let mut obs = make_observer();
    let mut sink = FlakySink::failing(1);

    let report = obs.process_batch(vec![sample("P", 1, 5.0, 1.0)], &mut sink);

    assert_eq!(sink.attempts, 2);
    assert_eq!(sink.accepted.len(), 1);
    assert_eq!(report.emitted, 1);
    assert_eq!(report.failed_count(), 0);
}

#[test]
fn persistent_sink_failure_is_reported_and_does_not_halt() {
    let mut obs = make_observer();
    let mut sink = FlakySink::broken();

    let report = obs.process_batch(
        vec![sample("P", 1, 5.0, 1.0), sample("Q", 1, 0.0, 0.0)],
        &mut sink,
    );

    assert_eq!(report.emitted, 0);
    assert_eq!(report.failed_count(), 2);
    assert_eq!(sink.attempts, 4, "two attempts per decision");
    assert_eq!(report.failures[0].pump, pump("P"));
    assert_eq!(report.failures[0].seq, 1);
    assert_eq!(report.failures[0].error, SinkError::Unavailable);
    // Classification still advanced.
    assert_eq!(obs.state_of(&pump("Q")), Some(PumpState::Idle));
    assert_eq!(obs.stats().sink_failures, 2);
}

// ── Run loop ──────────────────────────────────────────────────

#[test]
fn run_drains_source_and_accumulates_stats() {
    let mut obs = make_observer();
    let mut source = MockSource::new(vec![
        vec![sample("P", 1, 5.0, 1.0)],
        vec![],
        vec![sample("P", 2, 0.0, 0.0), sample("P", 2, 0.0, 0.0)],
    ]);
    let mut sink = RecordingSink::new();

    let stats = obs.run(&mut source, &mut sink, &StopSignal::new()).unwrap();

    assert_eq!(stats.batches, 3);
    assert_eq!(stats.events, 3);
    assert_eq!(stats.transitions, 2);
    assert_eq!(stats.stale, 1);
    assert_eq!(source.pulls, 4, "three batches plus the final empty pull");
}

#[test]
fn source_failure_is_fatal() {
    let mut obs = make_observer();
    let mut source = MockSource::failing_after(
        vec![vec![sample("P", 1, 5.0, 1.0)]],
        SourceError::Unreachable("collector"),
    );
    let mut sink = RecordingSink::new();

    let err = obs.run(&mut source, &mut sink, &StopSignal::new()).unwrap_err();

    assert_eq!(err, Error::Source(SourceError::Unreachable("collector")));
    assert_eq!(obs.stats().batches, 1, "the good batch was still processed");
    assert_eq!(sink.decisions.len(), 1);
}

#[test]
fn stop_signal_prevents_further_pulls() {
    let mut obs = make_observer();
    let mut source = MockSource::new(vec![vec![sample("P", 1, 5.0, 1.0)]]);
    let mut sink = RecordingSink::new();
    let stop = StopSignal::new();
    stop.stop();

    let stats = obs.run(&mut source, &mut sink, &stop).unwrap();

    assert_eq!(stats.batches, 0);
    assert_eq!(source.pulls, 0);
}

#[test]
fn run_batch_reports_exhaustion() {
    let mut obs = make_observer();
    let mut source = MockSource::new(vec![]);
    let mut sink = RecordingSink::new();
    assert_eq!(obs.run_batch(&mut source, &mut sink).unwrap(), None);
}
