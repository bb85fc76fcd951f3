//! Fuzz target: event deserialization and validation
//!
//! Feeds arbitrary bytes to the JSON event decoder.  Whatever parses
//! must validate without panicking and survive one trip through the
//! classifier.
//!
//! cargo fuzz run fuzz_event_json

#![no_main]

use libfuzzer_sys::fuzz_target;
use pumpwatch::classifier::Classifier;
use pumpwatch::config::ObserverConfig;
use pumpwatch::events::Event;
use pumpwatch::fsm::context::ClassifierContext;

fuzz_target!(|data: &[u8]| {
    let Ok(event) = serde_json::from_slice::<Event>(data) else {
        return;
    };
    assert!(event.pump.as_str().len() <= pumpwatch::events::PUMP_ID_CAP);
    let _ = event.validate();

    let classifier = Classifier::new(&ObserverConfig::default());
    let mut ctx = ClassifierContext::new();
    let decision = classifier.step(&mut ctx, &event);
    assert!(decision.is_ok(), "first event for a pump is never stale");
});
