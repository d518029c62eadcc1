//! Delay analysis
//!
//! This module drives the engine to obtain delay bounds:
//! - [`orchestrator`] - batch and strict-priority tiered calculation
//! - [`report`] - per-service results and deadline verdicts

pub mod orchestrator;
pub mod report;

pub use orchestrator::{batch_delays, calculate_delays, strict_priority_delays};
pub use report::{DelayReport, FlowDelay, ServiceDelays, FAILURE_SENTINEL};
