//! Experiment sweeps
//!
//! - [`grid`] - lazy cross product of multiplexing, analysis method, arrival
//!   bounding method and scheduling policy
//! - [`combos`] - iterative generator of flow combinations
//! - [`driver`] - runners that rebuild, analyze and collect rows
//! - [`export`] - the [`ResultMatrix`] and its delimited export

pub mod combos;
pub mod driver;
pub mod export;
pub mod grid;

pub use combos::{declared_flows, FlowCombinations, FlowRef};
pub use driver::{run_flow_combinations, run_incremental_flows, run_sweep};
pub use export::{ResultMatrix, DELIMITER};
pub use grid::{SweepGrid, SweepPoint};
