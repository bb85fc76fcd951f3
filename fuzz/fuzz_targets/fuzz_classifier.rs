//! Fuzz target: `Classifier::step`
//!
//! Decodes arbitrary bytes into an event stream for one pump (any
//! sequence order, any readings, any fault mask) and asserts that the
//! classifier never panics, only commits edges of the state graph, and
//! never leaves Fault except on a clear.
//!
//! cargo fuzz run fuzz_classifier

#![no_main]

use libfuzzer_sys::fuzz_target;
use pumpwatch::classifier::Classifier;
use pumpwatch::config::ObserverConfig;
use pumpwatch::events::{Event, EventKind, PumpId};
use pumpwatch::fsm::PumpState;
use pumpwatch::fsm::context::ClassifierContext;

/// Bytes per encoded event: seq(1) ts(2) flow(4) pressure(4) faults(2) kind(1).
const RECORD: usize = 14;

fuzz_target!(|data: &[u8]| {
    let Some((&window, rest)) = data.split_first() else {
        return;
    };
    let config = ObserverConfig {
        reorder_window: u64::from(window % 64),
        ..ObserverConfig::default()
    };
    let classifier = Classifier::new(&config);
    let mut ctx = ClassifierContext::new();
    let Ok(pump) = PumpId::new("fuzz") else {
        return;
    };

    for rec in rest.chunks_exact(RECORD) {
        let seq = u64::from(rec[0]);
        let ts = u64::from(u16::from_le_bytes([rec[1], rec[2]]));
        let flow = f32::from_le_bytes([rec[3], rec[4], rec[5], rec[6]]);
        let pressure = f32::from_le_bytes([rec[7], rec[8], rec[9], rec[10]]);
        let faults = u16::from_le_bytes([rec[11], rec[12]]);
        let mut event = Event::sample(pump.clone(), seq, ts, flow, pressure).with_faults(faults);
        if rec[13] & 1 == 1 {
            event.kind = EventKind::FaultClear;
        }

        let before = ctx.state();
        let snapshot = ctx.clone();
        match classifier.step(&mut ctx, &event) {
            Ok(d) => {
                assert_eq!(d.prior, before);
                assert_eq!(d.new, ctx.state());
                if d.transitioned() {
                    assert!(before.can_transition_to(d.new), "{before:?} -> {:?}", d.new);
                }
                if before == PumpState::Fault && d.new != PumpState::Fault {
                    assert_eq!(event.kind, EventKind::FaultClear);
                }
            }
            Err(_) => {
                assert_eq!(ctx.state(), snapshot.state());
                assert_eq!(ctx.highest_seq(), snapshot.highest_seq());
            }
        }
    }
});
