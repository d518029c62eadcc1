use crate::engine::FlowHandle;
use crate::types::Priority;
use serde::{Deserialize, Serialize};

/// A declared traffic class and the flows resolved for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    /// Label of the server the traffic is destined to
    pub origin_server: String,
    /// Token bucket size (bytes)
    pub bucket_size: f64,
    /// Sustained rate (bytes/s)
    pub bitrate: f64,
    pub deadline_ms: f64,
    pub priority: Priority,
    /// Candidate routes, each an ordered node sequence
    pub multipath: Vec<Vec<String>>,
    /// Flows currently registered in the engine for this service
    #[serde(skip)]
    flows: Vec<FlowHandle>,
}

impl Service {
    pub fn new(
        name: impl Into<String>,
        origin_server: impl Into<String>,
        bucket_size: f64,
        bitrate: f64,
        deadline_ms: f64,
        multipath: Vec<Vec<String>>,
        priority: Priority,
    ) -> Self {
        Self {
            name: name.into(),
            origin_server: origin_server.into(),
            bucket_size,
            bitrate,
            deadline_ms,
            priority,
            multipath,
            flows: Vec::new(),
        }
    }

    pub fn flows(&self) -> &[FlowHandle] {
        &self.flows
    }

    pub(crate) fn push_flow(&mut self, flow: FlowHandle) {
        self.flows.push(flow);
    }

    pub(crate) fn clear_flows(&mut self) {
        self.flows.clear();
    }

    /// Copy of this service restricted to one of its paths, without flows
    pub fn with_single_path(&self, path_index: usize) -> Option<Service> {
        let path = self.multipath.get(path_index)?;
        Some(Service {
            multipath: vec![path.clone()],
            flows: Vec::new(),
            ..self.clone()
        })
    }

    /// Copy of this service keeping its first `count` paths, without flows
    pub fn with_first_paths(&self, count: usize) -> Service {
        Service {
            multipath: self.multipath.iter().take(count).cloned().collect(),
            flows: Vec::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> Service {
        Service::new(
            "SE",
            "S1",
            255.0,
            50.0,
            100.0,
            vec![
                vec!["F1".into(), "H1".into(), "S1".into()],
                vec!["F1".into(), "H2".into(), "S1".into()],
            ],
            Priority::Medium,
        )
    }

    #[test]
    fn test_flow_list() {
        let mut s = service();
        s.push_flow(FlowHandle(3));
        s.push_flow(FlowHandle(4));
        assert_eq!(s.flows(), &[FlowHandle(3), FlowHandle(4)]);
        s.clear_flows();
        assert!(s.flows().is_empty());
    }

    #[test]
    fn test_single_path_copy() {
        let mut s = service();
        s.push_flow(FlowHandle(1));
        let single = s.with_single_path(1).unwrap();
        assert_eq!(single.multipath, vec![vec!["F1", "H2", "S1"]]);
        assert!(single.flows().is_empty());
        assert_eq!(single.priority, Priority::Medium);
        assert!(s.with_single_path(2).is_none());
    }

    #[test]
    fn test_first_paths_copy() {
        let mut s = service();
        s.push_flow(FlowHandle(1));
        let first = s.with_first_paths(1);
        assert_eq!(first.multipath, vec![vec!["F1", "H1", "S1"]]);
        assert!(first.flows().is_empty());
        assert_eq!(s.with_first_paths(5).multipath.len(), 2);
    }
}
