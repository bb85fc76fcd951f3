//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements    | Connects to                  |
//! |-------------|---------------|------------------------------|
//! | `jsonl`     | EventSource   | newline-delimited JSON input |
//! |             | DecisionSink  | newline-delimited JSON output|
//! | `log_sink`  | DecisionSink  | `log` facade                 |

pub mod jsonl;
pub mod log_sink;
