//! Observer configuration parameters
//!
//! All tunable parameters for classification and the observation loop.
//! Values can be overridden from a JSON document; missing fields keep
//! their defaults.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::reorder::MAX_REORDER_WINDOW;
use crate::safety::SeverityTable;

/// Core observer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    // --- Sample interpretation ---
    /// Flow (L/min) below which the pump counts as stopped
    pub idle_flow_max_lpm: f32,
    /// Flow (L/min) at or above which the pump counts as running
    pub running_flow_min_lpm: f32,
    /// Pressure (bar) above which a running pump counts as throttled
    pub throttle_pressure_min_bar: f32,

    // --- Hysteresis ---
    /// Consecutive qualifying samples required to enter Throttled or Fault
    pub hysteresis_samples: u32,
    /// Priming longer than this (ms, event time) falls back to Idle
    pub priming_timeout_ms: u64,

    // --- Ordering ---
    /// How far (in sequence numbers) an event may trail the highest seen
    pub reorder_window: u64,

    // --- Faults ---
    /// Severity per fault bit; ties resolve to the lowest bit
    pub fault_severity: SeverityTable,

    // --- Observation loop ---
    /// Emit every decision, not only transitions
    pub emit_all_decisions: bool,
    /// Parallel classification workers (pumps are never split)
    pub workers: usize,
    /// Number of lock shards in the context store
    pub context_shards: usize,
    /// Attempts per decision before counting a sink failure
    pub sink_attempts: u8,
    /// Events read per batch by line-oriented sources
    pub source_batch_size: usize,
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            // Sample interpretation
            idle_flow_max_lpm: 0.5,
            running_flow_min_lpm: 2.0,
            throttle_pressure_min_bar: 6.0,

            // Hysteresis
            hysteresis_samples: 3,
            priming_timeout_ms: 30_000, // 30 s

            // Ordering
            reorder_window: 4,

            // Faults
            fault_severity: SeverityTable::default(),

            // Observation loop
            emit_all_decisions: false,
            workers: 4,
            context_shards: 16,
            sink_attempts: 2, // one retry
            source_batch_size: 256,
        }
    }
}

impl ObserverConfig {
    /// Reject values that would make classification meaningless.
    /// Invalid ranges are refused, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let thresholds = [
            self.idle_flow_max_lpm,
            self.running_flow_min_lpm,
            self.throttle_pressure_min_bar,
        ];
        if thresholds.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::ValidationFailed("thresholds must be finite"));
        }
        if self.idle_flow_max_lpm < 0.0 {
            return Err(ConfigError::ValidationFailed("idle_flow_max_lpm must be >= 0"));
        }
        if self.running_flow_min_lpm <= self.idle_flow_max_lpm {
            return Err(ConfigError::ValidationFailed(
                "running_flow_min_lpm must be above idle_flow_max_lpm",
            ));
        }
        if self.throttle_pressure_min_bar <= 0.0 {
            return Err(ConfigError::ValidationFailed("throttle_pressure_min_bar must be > 0"));
        }
        if self.hysteresis_samples == 0 {
            return Err(ConfigError::ValidationFailed("hysteresis_samples must be >= 1"));
        }
        if self.priming_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("priming_timeout_ms must be > 0"));
        }
        if self.reorder_window > MAX_REORDER_WINDOW {
            return Err(ConfigError::ValidationFailed("reorder_window must be <= 63"));
        }
        if self.workers == 0 {
            return Err(ConfigError::ValidationFailed("workers must be >= 1"));
        }
        if self.context_shards == 0 {
            return Err(ConfigError::ValidationFailed("context_shards must be >= 1"));
        }
        if self.sink_attempts == 0 {
            return Err(ConfigError::ValidationFailed("sink_attempts must be >= 1"));
        }
        if self.source_batch_size == 0 {
            return Err(ConfigError::ValidationFailed("source_batch_size must be >= 1"));
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.kind()))?;
        Self::from_json(&text)
    }
}
