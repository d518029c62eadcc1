//! # ncsched: delay bounds for scheduled multi-priority networks
//!
//! Computes worst-case end-to-end delays of services in a network whose
//! links are shared by several priority classes under a scheduling policy
//! (strict priority, WFQ, DRR, WRR or none). Each link is split into one
//! rate-latency server per priority class and the resulting network is handed
//! to a network-calculus engine.
//!
//! ## Architecture
//!
//! - **Curves**: per-priority service curve synthesis for every policy
//! - **Topology**: declared edges and services, node pair to edge lookup
//! - **Network**: server, turn and flow creation on an engine
//! - **Engine**: the [`NetworkCalculusEngine`] trait and the built-in
//!   [`RateLatencyEngine`] (TFA, SFA, PMOO, TMA)
//! - **Analysis**: batch and strict-priority tiered delay calculation
//! - **Sweep**: parameter sweeps, incremental flows, flow combinations and
//!   delimited export
//! - **Scripting**: Rhai scenario scripts
//!
//! ## Example
//!
//! ```ignore
//! use ncsched::{config::ScenarioFile, NcSession};
//!
//! let mut session = NcSession::default();
//! ScenarioFile::load("substation.toml")?.apply_to(&mut session)?;
//! session.build_network()?;
//! let report = session.delay_report()?;
//! for service in report.services() {
//!     println!("{}: {:?} ms", service.name, service.max_delay_ms());
//! }
//!
//! let matrix = session.run_full_experiment_sweep()?;
//! matrix.export("experiments", "full")?;
//! ```

pub mod analysis;
pub mod config;
pub mod curves;
pub mod engine;
pub mod error;
pub mod network;
pub mod scripting;
pub mod session;
pub mod sweep;
pub mod topology;
pub mod types;

// Re-export commonly used types
pub use analysis::DelayReport;
pub use config::{ExperimentConfig, ScenarioFile, SchedulingPolicy};
pub use curves::{ArrivalCurve, ServiceCurve};
pub use engine::{AnalysisMethod, Multiplexing, NetworkCalculusEngine, RateLatencyEngine};
pub use error::{NcError, Result};
pub use scripting::ScenarioScript;
pub use session::NcSession;
pub use sweep::{ResultMatrix, SweepGrid};
pub use types::Priority;
