//! Delay results of one analysis run

use crate::engine::{AnalysisFailure, FlowHandle};
use crate::topology::Service;
use crate::types::Priority;
use std::collections::BTreeMap;

/// Delay value recorded for a flow whose analysis failed
pub const FAILURE_SENTINEL: f64 = -1.0;

/// Outcome of the analysis of one flow
#[derive(Debug, Clone, PartialEq)]
pub struct FlowDelay {
    pub flow: FlowHandle,
    /// End-to-end bound in milliseconds, propagation delay included
    pub outcome: Result<f64, AnalysisFailure>,
}

impl FlowDelay {
    /// Delay in milliseconds, [`FAILURE_SENTINEL`] if the analysis failed
    pub fn delay_ms(&self) -> f64 {
        match self.outcome {
            Ok(delay) => delay,
            Err(_) => FAILURE_SENTINEL,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }

    /// Cell text for delimited exports
    pub fn format_cell(&self) -> String {
        match self.outcome {
            Ok(delay) => format!("{:.3}", delay),
            Err(_) => format!("{}", FAILURE_SENTINEL),
        }
    }
}

/// All flow delays of one service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDelays {
    pub name: String,
    pub priority: Priority,
    pub deadline_ms: f64,
    pub flows: Vec<FlowDelay>,
}

impl ServiceDelays {
    /// Largest successful bound. Failed flows do not count.
    pub fn max_delay_ms(&self) -> Option<f64> {
        self.flows
            .iter()
            .filter_map(|f| f.outcome.as_ref().ok().copied())
            .reduce(f64::max)
    }

    pub fn deadline_torn(&self) -> bool {
        self.max_delay_ms()
            .is_some_and(|delay| delay > self.deadline_ms)
    }
}

/// Per-service results of one delay calculation, keyed by service name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DelayReport {
    services: BTreeMap<String, ServiceDelays>,
    structural_failure: Option<String>,
}

impl DelayReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the flow delays of a service.
    ///
    /// Results are keyed by service name. Recording a name that is already
    /// present appends the flows to the existing entry and keeps its priority
    /// and deadline; flow combinations rely on this when the same declared
    /// service appears several times as single-path copies.
    pub fn record(&mut self, service: &Service, flows: Vec<FlowDelay>) {
        match self.services.get_mut(&service.name) {
            Some(entry) => entry.flows.extend(flows),
            None => {
                self.services.insert(
                    service.name.clone(),
                    ServiceDelays {
                        name: service.name.clone(),
                        priority: service.priority,
                        deadline_ms: service.deadline_ms,
                        flows,
                    },
                );
            }
        }
    }

    /// Mark the whole run as failed. A structurally failed run always counts
    /// as a torn deadline.
    pub fn mark_structural(&mut self, reason: impl Into<String>) {
        self.structural_failure = Some(reason.into());
    }

    pub fn structural_failure(&self) -> Option<&str> {
        self.structural_failure.as_deref()
    }

    pub fn service(&self, name: &str) -> Option<&ServiceDelays> {
        self.services.get(name)
    }

    /// Services in name order
    pub fn services(&self) -> impl Iterator<Item = &ServiceDelays> {
        self.services.values()
    }

    pub fn flow_count(&self) -> usize {
        self.services.values().map(|s| s.flows.len()).sum()
    }

    pub fn failed_flow_count(&self) -> usize {
        self.services
            .values()
            .flat_map(|s| &s.flows)
            .filter(|f| f.is_failure())
            .count()
    }

    /// Whether any service misses its deadline
    pub fn deadline_torn(&self) -> bool {
        self.structural_failure.is_some() || self.services.values().any(ServiceDelays::deadline_torn)
    }

    /// `"name:PRIORITY - name:PRIORITY"` in name order
    pub fn priority_summary(&self) -> String {
        self.services
            .values()
            .map(|s| format!("{}:{}", s.name, s.priority))
            .collect::<Vec<_>>()
            .join(" - ")
    }

    /// Service name followed by its flow delays, for every service in name order
    pub fn delay_columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(self.services.len() + self.flow_count());
        for service in self.services.values() {
            columns.push(service.name.clone());
            columns.extend(service.flows.iter().map(FlowDelay::format_cell));
        }
        columns
    }
}
