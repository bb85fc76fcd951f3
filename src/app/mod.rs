//! Application core: classification orchestration, zero I/O.
//!
//! This module contains the observation loop: batch partitioning,
//! parallel per-pump classification, and decision emission.  All
//! interaction with the outside world happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable with
//! in-memory sources and sinks.

pub mod events;
pub mod ports;
pub mod service;
