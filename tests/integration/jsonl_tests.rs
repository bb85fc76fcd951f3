//! End-to-end: JSON lines in, JSON lines out.

use std::io::Cursor;

use pumpwatch::adapters::jsonl::{JsonLinesSink, JsonLinesSource};
use pumpwatch::app::service::{Observer, StopSignal};
use pumpwatch::config::ObserverConfig;

const EVENTS: &str = r#"{"pump":"north","seq":1,"timestamp_ms":0,"flow_lpm":1.2,"pressure_bar":0.4}
{"pump":"south","seq":1,"timestamp_ms":0,"flow_lpm":4.8,"pressure_bar":2.1}
{"pump":"north","seq":2,"timestamp_ms":1000,"flow_lpm":4.1,"pressure_bar":2.0}
{"pump":"south","seq":2,"timestamp_ms":1000,"flow_lpm":4.8,"pressure_bar":2.1,"fault_bits":8}
{"pump":"south","seq":3,"timestamp_ms":2000,"flow_lpm":0.0,"pressure_bar":0.0,"kind":"fault-clear"}
{"pump":"north","seq":3,"timestamp_ms":2000,"flow_lpm":4.1,"pressure_bar":2.0
"#;

#[test]
fn decisions_round_trip_through_json_lines() {
    let config = ObserverConfig { source_batch_size: 2, ..ObserverConfig::default() };
    let mut source = JsonLinesSource::new(Cursor::new(EVENTS), config.source_batch_size);
    let mut sink = JsonLinesSink::new(Vec::new());
    let mut obs = Observer::new(config).unwrap();

    let stats = obs.run(&mut source, &mut sink, &StopSignal::new()).unwrap();

    assert_eq!(source.rejected(), 1, "truncated last line");
    assert_eq!(stats.events, 5);
    assert_eq!(stats.batches, 3);

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let decisions: Vec<serde_json::Value> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let summary: Vec<(String, String, String)> = decisions
        .iter()
        .map(|d| {
            (
                d["pump"].as_str().unwrap().to_owned(),
                d["new"].as_str().unwrap().to_owned(),
                d["reason"]["kind"].as_str().unwrap().to_owned(),
            )
        })
        .collect();

    let expected = [
        ("north", "Priming", "initial"),
        ("south", "Running", "initial"),
        ("north", "Running", "sample"),
        ("south", "Fault", "fault-latched"),
        ("south", "Idle", "fault-cleared"),
    ];
    assert_eq!(summary.len(), expected.len());
    for (got, want) in summary.iter().zip(expected) {
        assert_eq!((got.0.as_str(), got.1.as_str(), got.2.as_str()), want);
    }
    assert_eq!(decisions[3]["reason"]["kind"], "fault-latched");
    assert_eq!(decisions[3]["reason"]["bit"], 3);
}
