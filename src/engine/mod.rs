//! Analysis engine interface
//!
//! The curve algebra and the tandem analyses are provided by an engine behind
//! the [`NetworkCalculusEngine`] trait. The rest of the crate only builds
//! servers, turns and flows through it and asks it for delay bounds, so the
//! topology and curve logic can be exercised against any implementation
//! (including mocks in tests).
//!
//! [`RateLatencyEngine`] is the built-in implementation for rate-latency
//! servers and token-bucket arrivals.

pub mod rate_latency;

pub use rate_latency::RateLatencyEngine;

use crate::curves::{ArrivalCurve, ServiceCurve};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Handle of a server registered in an engine.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServerHandle(pub u32);

impl ServerHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServerHandle({})", self.0)
    }
}

impl fmt::Display for ServerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Handle of a flow registered in an engine.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowHandle(pub u32);

impl FlowHandle {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for FlowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FlowHandle({})", self.0)
    }
}

impl fmt::Display for FlowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Service order assumed at a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Multiplexing {
    #[default]
    #[serde(rename = "FIFO")]
    Fifo,
    #[serde(rename = "ARBITRARY")]
    Arbitrary,
}

impl Multiplexing {
    pub const ALL: [Multiplexing; 2] = [Multiplexing::Fifo, Multiplexing::Arbitrary];

    pub fn name(self) -> &'static str {
        match self {
            Multiplexing::Fifo => "FIFO",
            Multiplexing::Arbitrary => "ARBITRARY",
        }
    }
}

impl fmt::Display for Multiplexing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the multiplexing of the servers is interpreted during one analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiplexingEnforcement {
    /// Every server keeps the multiplexing it was created with
    ServerLocal,
    /// Every server is treated as arbitrary multiplexing
    GlobalArbitrary,
}

impl MultiplexingEnforcement {
    /// Effective multiplexing of a server created with `declared`
    pub fn effective(self, declared: Multiplexing) -> Multiplexing {
        match self {
            MultiplexingEnforcement::ServerLocal => declared,
            MultiplexingEnforcement::GlobalArbitrary => Multiplexing::Arbitrary,
        }
    }
}

/// Method used to bound the arrivals of cross traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArrivalBoundMethod {
    AggrPbooPerServer,
    #[default]
    AggrPbooConcatenation,
    AggrPmoo,
    AggrTm,
    SegrPboo,
    SegrPmoo,
    SegrTm,
}

impl ArrivalBoundMethod {
    pub const ALL: [ArrivalBoundMethod; 7] = [
        ArrivalBoundMethod::AggrPbooPerServer,
        ArrivalBoundMethod::AggrPbooConcatenation,
        ArrivalBoundMethod::AggrPmoo,
        ArrivalBoundMethod::AggrTm,
        ArrivalBoundMethod::SegrPboo,
        ArrivalBoundMethod::SegrPmoo,
        ArrivalBoundMethod::SegrTm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArrivalBoundMethod::AggrPbooPerServer => "AGGR_PBOO_PER_SERVER",
            ArrivalBoundMethod::AggrPbooConcatenation => "AGGR_PBOO_CONCATENATION",
            ArrivalBoundMethod::AggrPmoo => "AGGR_PMOO",
            ArrivalBoundMethod::AggrTm => "AGGR_TM",
            ArrivalBoundMethod::SegrPboo => "SEGR_PBOO",
            ArrivalBoundMethod::SegrPmoo => "SEGR_PMOO",
            ArrivalBoundMethod::SegrTm => "SEGR_TM",
        }
    }

    /// Whether the method can bound arrivals at FIFO servers
    pub fn supports_fifo(self) -> bool {
        !matches!(
            self,
            ArrivalBoundMethod::AggrTm | ArrivalBoundMethod::SegrPmoo | ArrivalBoundMethod::AggrPmoo
        )
    }

    /// Whether engines are expected to complete with this method at all
    pub fn is_stable(self) -> bool {
        self != ArrivalBoundMethod::SegrTm
    }
}

impl fmt::Display for ArrivalBoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tandem analysis used to compute an end-to-end delay bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AnalysisMethod {
    /// Total flow analysis
    #[serde(rename = "TFA")]
    Tfa,
    /// Separate flow analysis
    #[default]
    #[serde(rename = "SFA")]
    Sfa,
    /// Pay multiplexing only once
    #[serde(rename = "PMOO")]
    Pmoo,
    /// Tandem matching analysis
    #[serde(rename = "TMA")]
    Tma,
}

impl AnalysisMethod {
    pub const ALL: [AnalysisMethod; 4] = [
        AnalysisMethod::Tfa,
        AnalysisMethod::Sfa,
        AnalysisMethod::Pmoo,
        AnalysisMethod::Tma,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AnalysisMethod::Tfa => "TFA",
            AnalysisMethod::Sfa => "SFA",
            AnalysisMethod::Pmoo => "PMOO",
            AnalysisMethod::Tma => "TMA",
        }
    }

    /// PMOO and matching analysis are only defined for arbitrary multiplexing
    pub fn supports_fifo(self) -> bool {
        matches!(self, AnalysisMethod::Tfa | AnalysisMethod::Sfa)
    }
}

impl fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters of one analysis request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisSettings {
    pub arrival_bound: ArrivalBoundMethod,
    pub enforcement: MultiplexingEnforcement,
}

impl AnalysisSettings {
    /// Settings derived from the nominal multiplexing of an experiment:
    /// arbitrary multiplexing is enforced globally, FIFO stays server-local.
    pub fn nominal(arrival_bound: ArrivalBoundMethod, multiplexing: Multiplexing) -> Self {
        let enforcement = match multiplexing {
            Multiplexing::Arbitrary => MultiplexingEnforcement::GlobalArbitrary,
            Multiplexing::Fifo => MultiplexingEnforcement::ServerLocal,
        };
        Self {
            arrival_bound,
            enforcement,
        }
    }

    /// Same settings with arbitrary multiplexing forced on every server
    pub fn forced_arbitrary(self) -> Self {
        Self {
            enforcement: MultiplexingEnforcement::GlobalArbitrary,
            ..self
        }
    }
}

/// Structural engine errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("unknown server {0}")]
    UnknownServer(ServerHandle),

    #[error("unknown flow {0}")]
    UnknownFlow(FlowHandle),

    #[error("flow path is empty")]
    EmptyPath,

    #[error("server {0} is still used by a flow")]
    ServerInUse(ServerHandle),

    #[error("{0}")]
    Internal(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Why a single flow could not be analyzed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisFailure {
    #[error("{method} does not support {multiplexing} multiplexing")]
    UnsupportedCombination {
        method: AnalysisMethod,
        multiplexing: Multiplexing,
    },

    #[error("arrival bounding {method} does not support {multiplexing} multiplexing")]
    UnsupportedArrivalBound {
        method: ArrivalBoundMethod,
        multiplexing: Multiplexing,
    },

    #[error("server {server} is overloaded, no finite bound exists")]
    Unbounded { server: String },

    #[error("engine failure: {0}")]
    EngineInternal(String),

    #[error("cyclic dependency: {0}")]
    CyclicDependency(String),
}

impl AnalysisFailure {
    /// Structural failures invalidate the whole run, not only one flow
    pub fn is_structural(&self) -> bool {
        matches!(self, AnalysisFailure::CyclicDependency(_))
    }
}

impl From<EngineError> for AnalysisFailure {
    fn from(err: EngineError) -> Self {
        AnalysisFailure::EngineInternal(err.to_string())
    }
}

/// Operations the network model needs from a network-calculus engine
///
/// All mutation is synchronous and exclusive (`&mut self`); analysis is a
/// query over the current graph. Delay bounds are returned in seconds.
#[cfg_attr(test, mockall::automock)]
pub trait NetworkCalculusEngine {
    /// Register a server with its service curve and multiplexing discipline
    fn create_server(
        &mut self,
        label: &str,
        curve: ServiceCurve,
        multiplexing: Multiplexing,
    ) -> EngineResult<ServerHandle>;

    /// Connect two servers. Adding an existing turn again is a no-op.
    fn create_turn(&mut self, from: ServerHandle, to: ServerHandle) -> EngineResult<()>;

    /// Register a flow along an ordered, non-empty server path
    fn create_flow(
        &mut self,
        arrival: ArrivalCurve,
        path: &[ServerHandle],
    ) -> EngineResult<FlowHandle>;

    fn remove_flow(&mut self, flow: FlowHandle) -> EngineResult<()>;

    fn remove_server(&mut self, server: ServerHandle) -> EngineResult<()>;

    /// Flows currently present in the graph
    fn flows(&self) -> Vec<FlowHandle>;

    /// Servers currently present in the graph
    fn servers(&self) -> Vec<ServerHandle>;

    /// Number of servers on a flow's path
    fn path_len(&self, flow: FlowHandle) -> Option<usize>;

    /// Worst-case end-to-end delay bound of `flow`, in seconds
    fn analyze(
        &self,
        settings: &AnalysisSettings,
        flow: FlowHandle,
        method: AnalysisMethod,
    ) -> std::result::Result<f64, AnalysisFailure>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_settings() {
        let fifo = AnalysisSettings::nominal(ArrivalBoundMethod::SegrPboo, Multiplexing::Fifo);
        assert_eq!(fifo.enforcement, MultiplexingEnforcement::ServerLocal);
        let arb = AnalysisSettings::nominal(ArrivalBoundMethod::SegrPboo, Multiplexing::Arbitrary);
        assert_eq!(arb.enforcement, MultiplexingEnforcement::GlobalArbitrary);
        assert_eq!(
            fifo.forced_arbitrary().enforcement,
            MultiplexingEnforcement::GlobalArbitrary
        );
    }

    #[test]
    fn test_fifo_support() {
        assert!(AnalysisMethod::Sfa.supports_fifo());
        assert!(!AnalysisMethod::Pmoo.supports_fifo());
        assert!(!AnalysisMethod::Tma.supports_fifo());
        assert!(!ArrivalBoundMethod::AggrTm.supports_fifo());
        assert!(ArrivalBoundMethod::AggrPbooConcatenation.supports_fifo());
        assert!(!ArrivalBoundMethod::SegrTm.is_stable());
    }

    #[test]
    fn test_enforcement() {
        assert_eq!(
            MultiplexingEnforcement::GlobalArbitrary.effective(Multiplexing::Fifo),
            Multiplexing::Arbitrary
        );
        assert_eq!(
            MultiplexingEnforcement::ServerLocal.effective(Multiplexing::Fifo),
            Multiplexing::Fifo
        );
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&ArrivalBoundMethod::AggrPbooConcatenation).unwrap();
        assert_eq!(json, "\"AGGR_PBOO_CONCATENATION\"");
        let m: Multiplexing = serde_json::from_str("\"ARBITRARY\"").unwrap();
        assert_eq!(m, Multiplexing::Arbitrary);
        let a: AnalysisMethod = serde_json::from_str("\"PMOO\"").unwrap();
        assert_eq!(a, AnalysisMethod::Pmoo);
    }

    #[test]
    fn test_structural_failure() {
        assert!(AnalysisFailure::CyclicDependency("x".into()).is_structural());
        assert!(!AnalysisFailure::EngineInternal("x".into()).is_structural());
    }
}
