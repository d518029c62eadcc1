//! Topology model
//!
//! The network is a list of directed edges between opaque node names. Every
//! edge owns one engine server per priority class once the network is built.
//! Edge identity is the ordered node pair: `(A, B)` and `(B, A)` are distinct
//! links and lookups never ignore direction.
//!
//! # Main Types
//!
//! - [`Edge`] - A unidirectional link with its per-priority servers
//! - [`EdgeId`] - Index of an edge in its [`Topology`]
//! - [`Topology`] - Edge registry with lookup and turn derivation
//! - [`Service`] - A declared traffic class with its candidate paths

mod service;

pub use service::Service;

use crate::engine::ServerHandle;
use crate::types::Priority;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Index into `Topology::edges`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub u32);

impl EdgeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How turns between edges are derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AdjacencyMode {
    /// `Y` follows `X` when `Y.from == X.to`, reverse links excluded
    #[default]
    Directed,
    /// `Y` neighbours `X` when `Y.from == X.to` or `Y.to == X.from`,
    /// unless `Y` only connects nodes `X` already connects
    Neighbor,
}

/// A unidirectional link between two nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    /// Service rate of the link (bytes/s)
    pub bitrate: f64,
    /// Nominal link delay (s)
    pub latency: f64,
    /// One server per priority, indexed by rank. Empty until the network is built.
    servers: Vec<ServerHandle>,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, bitrate: f64, latency: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            bitrate,
            latency,
            servers: Vec::new(),
        }
    }

    /// Whether this edge connects `from` to `to` (in that order)
    pub fn connects(&self, from: &str, to: &str) -> bool {
        self.from == from && self.to == to
    }

    /// Whether this edge is `other` traversed in the opposite direction
    pub fn reverses(&self, other: &Edge) -> bool {
        self.from == other.to && self.to == other.from
    }

    /// Server carrying the given priority class
    pub fn server(&self, priority: Priority) -> Option<ServerHandle> {
        self.servers.get(priority.rank()).copied()
    }

    /// All servers, indexed by priority rank
    pub fn servers(&self) -> &[ServerHandle] {
        &self.servers
    }

    /// Whether a server exists for every priority class
    pub fn is_built(&self) -> bool {
        self.servers.len() == Priority::COUNT
    }

    /// Register the next server. Servers must be pushed in ascending rank.
    pub(crate) fn push_server(&mut self, server: ServerHandle) {
        debug_assert!(self.servers.len() < Priority::COUNT);
        self.servers.push(server);
    }

    pub(crate) fn clear_servers(&mut self) {
        self.servers.clear();
    }

    /// Label of the server for `priority`, e.g. `"H1,S1:HIGH"`
    pub fn server_label(&self, priority: Priority) -> String {
        format!("{},{}:{}", self.from, self.to, priority)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

/// Registry of all declared edges
#[derive(Debug, Clone, Default)]
pub struct Topology {
    edges: Vec<Edge>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edge. Parallel edges are not deduplicated.
    pub fn add_edge(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        bitrate: f64,
        latency: f64,
    ) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        self.edges.push(Edge::new(from, to, bitrate, latency));
        id
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index())
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id.index())
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Iterate over edges together with their ids
    pub fn iter(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (EdgeId(i as u32), e))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Find the edge connecting `from` to `to`. Direction matters.
    /// With parallel edges the first one declared wins.
    pub fn find_edge(&self, from: &str, to: &str) -> Option<EdgeId> {
        self.edges
            .iter()
            .position(|e| e.connects(from, to))
            .map(|i| EdgeId(i as u32))
    }

    /// Edges that traffic leaving `id` may continue on
    pub fn adjacent_edges(&self, id: EdgeId, mode: AdjacencyMode) -> Vec<EdgeId> {
        let Some(current) = self.edge(id) else {
            return Vec::new();
        };

        self.iter()
            .filter(|(_, candidate)| match mode {
                AdjacencyMode::Directed => {
                    candidate.from == current.to && !candidate.reverses(current)
                }
                AdjacencyMode::Neighbor => {
                    let touches = candidate.from == current.to || candidate.to == current.from;
                    let same_nodes = [&candidate.from, &candidate.to]
                        .iter()
                        .all(|n| **n == current.from || **n == current.to);
                    touches && !same_nodes
                }
            })
            .map(|(other, _)| other)
            .collect()
    }

    /// Drop all server handles (the engine side is cleared separately)
    pub(crate) fn clear_servers(&mut self) {
        for edge in &mut self.edges {
            edge.clear_servers();
        }
    }

    pub fn clear(&mut self) {
        self.edges.clear();
    }
}
