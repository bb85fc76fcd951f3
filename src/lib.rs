//! Pump telemetry observer library.
//!
//! Classifies per-pump telemetry events into operational states and
//! drives the batch observation loop.  Exposes every module for
//! integration testing and embedding; the `pumpwatch` binary is a thin
//! shell around [`app::service::Observer`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod classifier;
pub mod config;
pub mod error;
pub mod events;
pub mod fsm;
pub mod reorder;
pub mod safety;
pub mod store;
