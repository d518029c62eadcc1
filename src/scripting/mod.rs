//! Rhai scenario scripts
//!
//! Scenarios can be written as Rhai scripts instead of TOML/JSON, which is
//! convenient for generated topologies (loops over field devices, computed
//! bitrates). A script declares the same content as a [`ScenarioFile`].
//!
//! ## Functions
//!
//! - `add_edge(from, to, bitrate, latency)`
//! - `add_service(name, origin_server, bucket_size, bitrate, deadline_ms, multipath, priority)`
//!   where `multipath` is an array of node-name arrays
//! - `set_policy(name)` - `"None"`, `"SP"`, `"WFQ"`, `"DRR"` or `"WRR"`
//! - `set_analysis(name)` - `"TFA"`, `"SFA"`, `"PMOO"` or `"TMA"`
//! - `set_multiplexing(name)` - `"FIFO"` or `"ARBITRARY"`
//! - `set_arrival_bound(name)`
//! - `set_weights([..])`, `set_quanta([..])` - one entry per priority class
//! - `set_packetizer(bool)`
//!
//! Numeric arguments accept both integer and float literals.
//!
//! ## Example
//!
//! ```rhai
//! set_policy("WFQ");
//! add_edge("H1", "S1", 200, 0);
//! for i in 1..=4 {
//!     add_edge(`F${i}`, "H1", 200, 0);
//!     add_service(`PMU${i}`, "S1", 255, 50, 10000, [[`F${i}`, "H1", "S1"]], 0);
//! }
//! ```
//!
//! [`ScenarioFile`]: crate::config::ScenarioFile

mod engine;

pub use engine::{ScenarioScript, SharedScenario};
