//! Test data builders for scenarios and services

use ncsched::config::{EdgeSpec, ScenarioFile, ServiceSpec};
use ncsched::{ExperimentConfig, NcSession, NetworkCalculusEngine, SchedulingPolicy};

/// Builder for creating test services
pub struct ServiceBuilder {
    spec: ServiceSpec,
}

impl ServiceBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            spec: ServiceSpec {
                name: name.to_string(),
                origin_server: "S1".to_string(),
                bucket_size: 255.0,
                bitrate: 50.0,
                deadline_ms: 10_000.0,
                priority: 0,
                multipath: Vec::new(),
            },
        }
    }

    pub fn path(mut self, nodes: &[&str]) -> Self {
        self.spec
            .multipath
            .push(nodes.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.spec.priority = priority;
        self
    }

    pub fn bitrate(mut self, bitrate: f64) -> Self {
        self.spec.bitrate = bitrate;
        self
    }

    pub fn deadline_ms(mut self, deadline_ms: f64) -> Self {
        self.spec.deadline_ms = deadline_ms;
        self
    }

    pub fn build(self) -> ServiceSpec {
        self.spec
    }
}

/// Builder for creating test scenarios
pub struct ScenarioBuilder {
    scenario: ScenarioFile,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self {
            scenario: ScenarioFile::default(),
        }
    }

    /// Field device F1 behind hub H1, serving substation S1, with one
    /// high-priority service on `F1 -> H1 -> S1`
    pub fn reference() -> Self {
        Self::new()
            .edge("F1", "H1", 200.0)
            .edge("H1", "S1", 200.0)
            .service(ServiceBuilder::new("SE").path(&["F1", "H1", "S1"]))
    }

    pub fn edge(mut self, from: &str, to: &str, bitrate: f64) -> Self {
        self.scenario.edges.push(EdgeSpec {
            from: from.to_string(),
            to: to.to_string(),
            bitrate,
            latency: 0.0,
        });
        self
    }

    pub fn service(mut self, service: ServiceBuilder) -> Self {
        self.scenario.services.push(service.build());
        self
    }

    pub fn config(mut self, config: ExperimentConfig) -> Self {
        self.scenario.experiment = Some(config);
        self
    }

    pub fn policy(mut self, policy: SchedulingPolicy) -> Self {
        self.scenario
            .experiment
            .get_or_insert_with(ExperimentConfig::default)
            .scheduling_policy = policy;
        self
    }

    pub fn build(self) -> ScenarioFile {
        self.scenario
    }

    pub fn session(self) -> NcSession {
        let mut session = NcSession::default();
        self.scenario.apply_to(&mut session).unwrap();
        session
    }

    pub fn session_with<E: NetworkCalculusEngine>(self, engine: E) -> NcSession<E> {
        let mut session = NcSession::with_engine(engine, ExperimentConfig::default());
        self.scenario.apply_to(&mut session).unwrap();
        session
    }
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}
