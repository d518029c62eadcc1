//! Analysis session
//!
//! [`NcSession`] owns everything one experiment works on: the engine, the
//! declared topology and services, and the experiment configuration. All
//! build, reset and analysis operations go through it, so no state survives
//! between runs except what the session explicitly keeps.
//!
//! # Example
//!
//! ```ignore
//! use ncsched::{ExperimentConfig, NcSession};
//!
//! let mut session = NcSession::new(ExperimentConfig::default());
//! session.add_edge("F1", "H1", 200.0, 0.0);
//! session.add_edge("H1", "S1", 200.0, 0.0);
//! session.add_service("SE", "S1", 255.0, 50.0, 10_000.0, vec![path], 0);
//! session.build_network()?;
//! let torn = session.calculate_delays()?;
//! ```

use crate::analysis::{self, DelayReport};
use crate::config::ExperimentConfig;
use crate::curves::{synthesize_service_curves, ServiceCurve};
use crate::engine::{NetworkCalculusEngine, RateLatencyEngine};
use crate::error::{Result, ResultExt};
use crate::network;
use crate::sweep::{self, ResultMatrix, SweepGrid};
use crate::topology::{EdgeId, Service, Topology};
use crate::types::Priority;

/// Explicit context for building and analyzing one network
pub struct NcSession<E: NetworkCalculusEngine = RateLatencyEngine> {
    engine: E,
    topology: Topology,
    services: Vec<Service>,
    config: ExperimentConfig,
}

impl NcSession<RateLatencyEngine> {
    /// Session backed by the built-in engine
    pub fn new(config: ExperimentConfig) -> Self {
        Self::with_engine(RateLatencyEngine::new(), config)
    }
}

impl Default for NcSession<RateLatencyEngine> {
    fn default() -> Self {
        Self::new(ExperimentConfig::default())
    }
}

impl<E: NetworkCalculusEngine> NcSession<E> {
    pub fn with_engine(engine: E, config: ExperimentConfig) -> Self {
        Self {
            engine,
            topology: Topology::new(),
            services: Vec::new(),
            config,
        }
    }

    // ==================== Accessors ====================

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Replace the configuration. The graph is emptied since its servers were
    /// built for the previous configuration.
    pub fn set_config(&mut self, config: ExperimentConfig) -> Result<()> {
        config.validate()?;
        self.reset_graph()?;
        self.config = config;
        Ok(())
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Number of declared flows (paths over all services)
    pub fn declared_flow_count(&self) -> usize {
        self.services.iter().map(|s| s.multipath.len()).sum()
    }

    pub(crate) fn parts_mut(
        &mut self,
    ) -> (&mut E, &Topology, &mut Vec<Service>, &ExperimentConfig) {
        (
            &mut self.engine,
            &self.topology,
            &mut self.services,
            &self.config,
        )
    }

    // ==================== Declarations ====================

    /// Declare a unidirectional link. Parallel edges are kept.
    pub fn add_edge(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        bitrate: f64,
        latency: f64,
    ) -> EdgeId {
        self.topology.add_edge(from, to, bitrate, latency)
    }

    /// Declare a service. Out-of-range priority indices are clamped.
    #[allow(clippy::too_many_arguments)]
    pub fn add_service(
        &mut self,
        name: impl Into<String>,
        origin_server: impl Into<String>,
        bucket_size: f64,
        bitrate: f64,
        deadline_ms: f64,
        multipath: Vec<Vec<String>>,
        priority_index: i64,
    ) {
        let name = name.into();
        let priority = Priority::from_index_clamped(priority_index);
        if priority.rank() as i64 != priority_index {
            tracing::warn!(
                "Priority index {} of service '{}' clamped to {}",
                priority_index,
                name,
                priority
            );
        }
        self.services.push(Service::new(
            name,
            origin_server,
            bucket_size,
            bitrate,
            deadline_ms,
            multipath,
            priority,
        ));
    }

    /// Forget all edges and services, emptying the graph
    pub fn reset_all(&mut self) -> Result<()> {
        self.reset_graph()?;
        self.topology.clear();
        self.services.clear();
        tracing::debug!("Session reset");
        Ok(())
    }

    /// Remove all servers and flows, keeping the declarations
    pub fn reset_graph(&mut self) -> Result<()> {
        network::reset_graph(&mut self.engine, &mut self.topology, &mut self.services)
    }

    /// Remove all flows, keeping the servers
    pub fn clear_flows(&mut self) -> Result<()> {
        network::remove_all_flows(&mut self.engine, &mut self.services)
    }

    // ==================== Build ====================

    /// Service curves of every edge under the current configuration,
    /// indexed by priority rank
    pub fn service_curves(&self) -> Result<Vec<(String, Vec<ServiceCurve>)>> {
        self.topology
            .edges()
            .iter()
            .map(|edge| {
                let curves = synthesize_service_curves(edge, &self.config, Priority::COUNT)?;
                Ok((edge.to_string(), curves))
            })
            .collect()
    }

    /// Synthesize curves, create servers and turns, and resolve every flow.
    ///
    /// Any previous graph is discarded first. On failure the graph is left
    /// empty. Returns the number of flows added.
    pub fn build_network(&mut self) -> Result<usize> {
        self.reset_graph()?;
        match self.try_build() {
            Ok(flows) => Ok(flows),
            Err(err) => {
                if let Err(cleanup) = self.reset_graph() {
                    tracing::warn!("Failed to clean up after build error: {}", cleanup);
                }
                Err(err)
            }
        }
    }

    fn try_build(&mut self) -> Result<usize> {
        let servers =
            network::build_servers(&mut self.engine, &mut self.topology, &self.config)?;
        let turns = network::create_turns(&mut self.engine, &self.topology, self.config.adjacency)?;
        let flows = network::add_flows(
            &mut self.engine,
            &self.topology,
            &mut self.services,
            &self.config,
            self.config.scheduling_policy.fixed_priority(),
            |_| true,
        )
        .context("Failed to resolve service flows")?;

        tracing::info!(
            "Network built: {} edges, {} servers, {} turns, {} flows ({} policy)",
            self.topology.len(),
            servers,
            turns,
            flows.len(),
            self.config.scheduling_policy
        );
        Ok(flows.len())
    }

    // ==================== Analysis ====================

    /// Full delay calculation with per-flow results
    pub fn delay_report(&mut self) -> Result<DelayReport> {
        analysis::calculate_delays(
            &mut self.engine,
            &self.topology,
            &mut self.services,
            &self.config,
        )
    }

    /// Whether any service misses its deadline
    pub fn calculate_delays(&mut self) -> Result<bool> {
        Ok(self.delay_report()?.deadline_torn())
    }

    /// Analyze every supported combination of multiplexing, analysis method,
    /// arrival bounding and scheduling policy
    pub fn run_full_experiment_sweep(&mut self) -> Result<ResultMatrix> {
        self.run_sweep(SweepGrid::full())
    }

    pub fn run_sweep(&mut self, grid: SweepGrid) -> Result<ResultMatrix> {
        sweep::run_sweep(self, grid)
    }

    /// Analyze with the first 1, 2, ... N declared flows in the network
    pub fn run_incremental_flows(&mut self) -> Result<ResultMatrix> {
        sweep::run_incremental_flows(self)
    }

    /// Analyze every ordered `depth`-tuple of declared flows
    pub fn run_flow_combinations(&mut self, depth: usize) -> Result<ResultMatrix> {
        sweep::run_flow_combinations(self, depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulingPolicy;
    use crate::error::NcError;

    fn path(nodes: &[&str]) -> Vec<String> {
        nodes.iter().map(|n| n.to_string()).collect()
    }

    fn session() -> NcSession {
        let mut session = NcSession::default();
        session.add_edge("F1", "H1", 200.0, 0.0);
        session.add_edge("H1", "S1", 200.0, 0.0);
        session.add_service("SE", "S1", 255.0, 50.0, 10_000.0, vec![path(&["F1", "H1", "S1"])], 0);
        session
    }

    #[test]
    fn test_priority_index_clamped() {
        let mut s = session();
        s.add_service("LM", "S1", 1.0, 1.0, 1.0, vec![], 9);
        s.add_service("PMU", "S1", 1.0, 1.0, 1.0, vec![], -3);
        assert_eq!(s.service("LM").unwrap().priority, Priority::Low);
        assert_eq!(s.service("PMU").unwrap().priority, Priority::High);
    }

    #[test]
    fn test_build_network() {
        let mut s = session();
        assert_eq!(s.build_network().unwrap(), 1);
        assert_eq!(s.engine().servers().len(), 2 * Priority::COUNT);
        assert!(s.topology().edges().iter().all(|e| e.is_built()));
        assert_eq!(s.service("SE").unwrap().flows().len(), 1);

        // Rebuilding starts from an empty graph
        assert_eq!(s.build_network().unwrap(), 1);
        assert_eq!(s.engine().servers().len(), 2 * Priority::COUNT);
        assert_eq!(s.engine().flows().len(), 1);
    }

    #[test]
    fn test_failed_build_leaves_empty_graph() {
        let mut s = session();
        s.add_service("BAD", "S1", 1.0, 1.0, 1.0, vec![path(&["F1", "S1"])], 0);
        let err = s.build_network().unwrap_err();
        assert!(err.to_string().contains("F1->S1"));
        assert!(s.engine().servers().is_empty());
        assert!(s.engine().flows().is_empty());
        assert!(s.services().iter().all(|svc| svc.flows().is_empty()));
    }

    #[test]
    fn test_reset_all() {
        let mut s = session();
        s.build_network().unwrap();
        s.reset_all().unwrap();
        assert!(s.topology().is_empty());
        assert!(s.services().is_empty());
        assert!(s.engine().servers().is_empty());
    }

    #[test]
    fn test_set_config_validates() {
        let mut s = session();
        let bad = ExperimentConfig {
            flow_quanta: vec![255],
            ..ExperimentConfig::default()
        };
        assert!(matches!(
            s.set_config(bad),
            Err(NcError::PriorityTable { .. })
        ));
        let sp = ExperimentConfig {
            scheduling_policy: SchedulingPolicy::Sp,
            ..ExperimentConfig::default()
        };
        s.build_network().unwrap();
        s.set_config(sp).unwrap();
        assert!(s.engine().servers().is_empty());
        assert_eq!(s.config().scheduling_policy, SchedulingPolicy::Sp);
    }

    #[test]
    fn test_calculate_delays_reference_sp() {
        let mut s = session();
        s.set_config(ExperimentConfig {
            scheduling_policy: SchedulingPolicy::Sp,
            ..ExperimentConfig::default()
        })
        .unwrap();
        s.build_network().unwrap();
        let report = s.delay_report().unwrap();
        let delay = report.service("SE").unwrap().max_delay_ms().unwrap();
        assert!((delay - 5100.001).abs() < 1e-6, "{}", delay);
        assert!(!report.deadline_torn());
    }

    #[test]
    fn test_service_curves_per_edge() {
        let s = session();
        let curves = s.service_curves().unwrap();
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[0].0, "F1->H1");
        assert_eq!(curves[1].1.len(), Priority::COUNT);
    }
}
