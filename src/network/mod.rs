//! Network construction on top of an engine
//!
//! - [`builder`] creates servers (one per edge and priority class) and turns
//! - [`resolver`] maps service paths to server sequences and manages flows

pub mod builder;
pub mod resolver;

pub use builder::{build_servers, create_turns};
pub use resolver::{
    add_flows, arrival_curve, first_flows, remove_all_flows, remove_all_servers, reset_graph,
    resolve_path,
};
