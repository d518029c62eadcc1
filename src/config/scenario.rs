//! Declarative scenario files
//!
//! A scenario lists the edges and services of a network and optionally the
//! experiment configuration to analyze it with:
//!
//! ```toml
//! [[edges]]
//! from = "F1"
//! to = "H1"
//! bitrate = 200.0
//!
//! [[services]]
//! name = "SE"
//! origin_server = "S1"
//! bucket_size = 255.0
//! bitrate = 50.0
//! deadline_ms = 10000.0
//! priority = 0
//! multipath = [["F1", "H1", "S1"]]
//! ```

use super::{read_document, write_document, ExperimentConfig};
use crate::engine::NetworkCalculusEngine;
use crate::error::{Result, ResultExt};
use crate::session::NcSession;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One declared link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
    pub bitrate: f64,
    #[serde(default)]
    pub latency: f64,
}

/// One declared service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub origin_server: String,
    pub bucket_size: f64,
    pub bitrate: f64,
    pub deadline_ms: f64,
    /// Priority index, 0 = highest. Clamped into range when applied.
    #[serde(default)]
    pub priority: i64,
    pub multipath: Vec<Vec<String>>,
}

/// Topology, services and (optionally) the experiment configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment: Option<ExperimentConfig>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    #[serde(default)]
    pub services: Vec<ServiceSpec>,
}

impl ScenarioFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let scenario: Self = read_document(path)?;
        tracing::info!(
            "Loaded scenario {:?}: {} edges, {} services",
            path,
            scenario.edges.len(),
            scenario.services.len()
        );
        Ok(scenario)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_document(path.as_ref(), self)
    }

    /// Declare everything in `session`. The session's configuration is only
    /// replaced if the scenario carries one.
    pub fn apply_to<E: NetworkCalculusEngine>(&self, session: &mut NcSession<E>) -> Result<()> {
        if let Some(config) = &self.experiment {
            session
                .set_config(config.clone())
                .context("Invalid experiment configuration in scenario")?;
        }
        for edge in &self.edges {
            session.add_edge(edge.from.as_str(), edge.to.as_str(), edge.bitrate, edge.latency);
        }
        for service in &self.services {
            session.add_service(
                service.name.as_str(),
                service.origin_server.as_str(),
                service.bucket_size,
                service.bitrate,
                service.deadline_ms,
                service.multipath.clone(),
                service.priority,
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulingPolicy;
    use crate::types::Priority;

    const SCENARIO: &str = r#"
        [experiment]
        scheduling_policy = "WFQ"

        [[edges]]
        from = "F1"
        to = "H1"
        bitrate = 200.0

        [[edges]]
        from = "H1"
        to = "S1"
        bitrate = 200.0
        latency = 0.002

        [[services]]
        name = "SE"
        origin_server = "S1"
        bucket_size = 255.0
        bitrate = 50.0
        deadline_ms = 10000.0
        priority = 7
        multipath = [["F1", "H1", "S1"]]
    "#;

    #[test]
    fn test_parse_and_apply() {
        let scenario: ScenarioFile = toml::from_str(SCENARIO).unwrap();
        assert_eq!(scenario.edges.len(), 2);
        assert_eq!(scenario.edges[0].latency, 0.0);

        let mut session = NcSession::default();
        scenario.apply_to(&mut session).unwrap();
        assert_eq!(session.config().scheduling_policy, SchedulingPolicy::Wfq);
        assert_eq!(session.topology().len(), 2);
        assert_eq!(session.service("SE").unwrap().priority, Priority::Low);
    }

    #[test]
    fn test_round_trip_files() {
        let scenario: ScenarioFile = toml::from_str(SCENARIO).unwrap();
        let dir = tempfile::tempdir().unwrap();
        for name in ["scenario.toml", "scenario.json"] {
            let path = dir.path().join(name);
            scenario.save(&path).unwrap();
            assert_eq!(ScenarioFile::load(&path).unwrap(), scenario);
        }
    }

    #[test]
    fn test_scenario_without_experiment_keeps_config() {
        let scenario = ScenarioFile::default();
        let mut session = NcSession::new(ExperimentConfig {
            scheduling_policy: SchedulingPolicy::Wrr,
            ..ExperimentConfig::default()
        });
        scenario.apply_to(&mut session).unwrap();
        assert_eq!(session.config().scheduling_policy, SchedulingPolicy::Wrr);
    }
}
