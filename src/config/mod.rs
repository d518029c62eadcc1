//! Configuration module for ncsched
//!
//! This module handles experiment configuration:
//! - [`ExperimentConfig`] - service-curve, arrival-curve and analysis choices
//! - [`scenario::ScenarioFile`] - declarative topology + services (+ optional config)
//!
//! # Files
//!
//! Both are read from and written to TOML (`.toml`) or JSON (`.json`), chosen
//! by file extension.
//!
//! # Example
//!
//! ```ignore
//! use ncsched::config::{ExperimentConfig, SchedulingPolicy};
//!
//! let mut config = ExperimentConfig::load("experiment.toml")?;
//! config.scheduling_policy = SchedulingPolicy::Wfq;
//! config.validate()?;
//! config.save("experiment-wfq.toml")?;
//! ```

pub mod scenario;

pub use scenario::{EdgeSpec, ScenarioFile, ServiceSpec};

use crate::engine::{AnalysisMethod, ArrivalBoundMethod, Multiplexing};
use crate::error::{NcError, Result};
use crate::topology::AdjacencyMode;
use crate::types::Priority;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Default maximum packet size in bytes
pub const DEFAULT_MAX_PACKET_SIZE: u32 = 255;

/// Default minimum packet size in bytes (used by WRR)
pub const DEFAULT_MIN_PACKET_SIZE: u32 = 255;

/// Default propagation delay per hop in seconds (0.5 µs)
pub const DEFAULT_PROPAGATION_DELAY: f64 = 0.5e-6;

/// Default substring marking field-device node names
pub const DEFAULT_FIELD_DEVICE_MARKER: &str = "F";

// ==================== Policy Enums ====================

/// Shape of the arrival curve built for every flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ArrivalCurveType {
    /// Token bucket with the service's bucket size as burst
    #[default]
    TokenBucket,
    /// Peak rate only, no burst
    PeakArrivalRate,
}

impl fmt::Display for ArrivalCurveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrivalCurveType::TokenBucket => f.write_str("TokenBucket"),
            ArrivalCurveType::PeakArrivalRate => f.write_str("PeakArrivalRate"),
        }
    }
}

/// Link scheduling policy between the priority classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SchedulingPolicy {
    /// No scheduler, all traffic shares one class
    None,
    /// Strict priority
    #[serde(rename = "SP")]
    Sp,
    /// Weighted fair queueing
    #[serde(rename = "WFQ")]
    Wfq,
    /// Deficit round robin
    #[default]
    #[serde(rename = "DRR")]
    Drr,
    /// Weighted round robin
    #[serde(rename = "WRR")]
    Wrr,
}

impl SchedulingPolicy {
    pub const ALL: [SchedulingPolicy; 5] = [
        SchedulingPolicy::None,
        SchedulingPolicy::Sp,
        SchedulingPolicy::Wfq,
        SchedulingPolicy::Drr,
        SchedulingPolicy::Wrr,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SchedulingPolicy::None => "None",
            SchedulingPolicy::Sp => "SP",
            SchedulingPolicy::Wfq => "WFQ",
            SchedulingPolicy::Drr => "DRR",
            SchedulingPolicy::Wrr => "WRR",
        }
    }

    /// Priority every flow is pinned to, if the policy collapses all classes
    pub fn fixed_priority(self) -> Option<Priority> {
        match self {
            SchedulingPolicy::None => Some(Priority::highest()),
            _ => None,
        }
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ==================== Experiment Config ====================

/// Complete configuration of one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Add the link delay given with each edge to the simple service curve
    pub use_given_link_delay: bool,

    /// Model packetization (changes the latency of the service curves)
    pub use_packetizer: bool,

    /// Propagation delay per hop in seconds, added onto every delay bound
    pub propagation_delay: f64,

    /// Maximum packet size in bytes
    pub max_packet_size: u32,

    /// Minimum packet size in bytes (used by WRR)
    pub min_packet_size: u32,

    /// Arrival curve shape for all flows
    pub arrival_curve: ArrivalCurveType,

    /// Multiplexing discipline of the servers.
    /// Only TFA and SFA support FIFO, the others need arbitrary multiplexing.
    pub multiplexing: Multiplexing,

    /// Arrival bounding method for cross traffic
    pub arrival_bound_method: ArrivalBoundMethod,

    /// Tandem analysis to run
    pub analysis: AnalysisMethod,

    /// Scheduling policy, defines the service curves
    pub scheduling_policy: SchedulingPolicy,

    /// Weights per priority class (WFQ and WRR), highest priority first
    pub flow_weights: Vec<u32>,

    /// Quanta per priority class (DRR), highest priority first
    pub flow_quanta: Vec<u32>,

    /// Substring that marks field-device node names
    pub field_device_marker: String,

    /// How turns between edges are derived
    pub adjacency: AdjacencyMode,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            use_given_link_delay: false,
            use_packetizer: true,
            propagation_delay: DEFAULT_PROPAGATION_DELAY,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            min_packet_size: DEFAULT_MIN_PACKET_SIZE,
            arrival_curve: ArrivalCurveType::TokenBucket,
            multiplexing: Multiplexing::Fifo,
            arrival_bound_method: ArrivalBoundMethod::AggrPbooConcatenation,
            analysis: AnalysisMethod::Sfa,
            scheduling_policy: SchedulingPolicy::Drr,
            flow_weights: vec![1; Priority::COUNT],
            flow_quanta: vec![DEFAULT_MAX_PACKET_SIZE; Priority::COUNT],
            field_device_marker: DEFAULT_FIELD_DEVICE_MARKER.to_string(),
            adjacency: AdjacencyMode::Directed,
        }
    }
}

impl ExperimentConfig {
    /// Check the configuration for values that would silently miscompute
    pub fn validate(&self) -> Result<()> {
        for (table, values) in [
            ("flow_weights", &self.flow_weights),
            ("flow_quanta", &self.flow_quanta),
        ] {
            if values.len() != Priority::COUNT {
                return Err(NcError::PriorityTable {
                    table,
                    expected: Priority::COUNT,
                    actual: values.len(),
                });
            }
        }
        if self.flow_weights.iter().all(|&w| w == 0) {
            return Err(NcError::Config("flow weights must not all be zero".to_string()));
        }
        if self.flow_quanta.contains(&0) {
            return Err(NcError::Config("flow quanta must be positive".to_string()));
        }
        if self.max_packet_size == 0 || self.min_packet_size == 0 {
            return Err(NcError::Config("packet sizes must be positive".to_string()));
        }
        if self.min_packet_size > self.max_packet_size {
            return Err(NcError::Config(format!(
                "min packet size {} exceeds max packet size {}",
                self.min_packet_size, self.max_packet_size
            )));
        }
        if !(self.propagation_delay >= 0.0 && self.propagation_delay.is_finite()) {
            return Err(NcError::Config(format!(
                "invalid propagation delay {}",
                self.propagation_delay
            )));
        }
        Ok(())
    }

    /// Load and validate an experiment config (TOML or JSON by extension)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = read_document(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config (TOML or JSON by extension)
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_document(path.as_ref(), self)
    }

    /// Column names of the configuration part of an exported result row
    pub fn column_labels() -> Vec<&'static str> {
        vec![
            "use_given_link_delay",
            "use_packetizer",
            "max_packet_size",
            "propagation_delay",
            "arrival_curve",
            "multiplexing",
            "scheduling_policy",
            "flow_weights",
            "flow_quanta",
            "arrival_bound_method",
            "analysis",
        ]
    }

    /// Configuration values in the order of [`Self::column_labels`]
    pub fn column_values(&self) -> Vec<String> {
        vec![
            self.use_given_link_delay.to_string(),
            self.use_packetizer.to_string(),
            self.max_packet_size.to_string(),
            self.propagation_delay.to_string(),
            self.arrival_curve.to_string(),
            self.multiplexing.to_string(),
            self.scheduling_policy.to_string(),
            format!("{:?}", self.flow_weights),
            format!("{:?}", self.flow_quanta),
            self.arrival_bound_method.to_string(),
            self.analysis.to_string(),
        ]
    }

    /// Write the configuration to the log
    pub fn log_summary(&self) {
        tracing::info!(
            link_delay = self.use_given_link_delay,
            packetizer = self.use_packetizer,
            max_packet_size = self.max_packet_size,
            propagation_delay = self.propagation_delay,
            arrival_curve = %self.arrival_curve,
            multiplexing = %self.multiplexing,
            policy = %self.scheduling_policy,
            weights = ?self.flow_weights,
            quanta = ?self.flow_quanta,
            arrival_bound = %self.arrival_bound_method,
            analysis = %self.analysis,
            "Experiment configuration"
        );
    }
}

// ==================== Document I/O ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Toml,
    Json,
}

fn document_format(path: &Path) -> Result<DocumentFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(DocumentFormat::Toml),
        Some("json") => Ok(DocumentFormat::Json),
        other => Err(NcError::Config(format!(
            "Unsupported file extension {:?} for {:?} (expected .toml or .json)",
            other, path
        ))),
    }
}

pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let format = document_format(path)?;
    let content = std::fs::read_to_string(path)
        .map_err(|e| NcError::Config(format!("Failed to read {:?}: {}", path, e)))?;

    match format {
        DocumentFormat::Toml => toml::from_str(&content)
            .map_err(|e| NcError::Serialization(format!("Failed to parse {:?}: {}", path, e))),
        DocumentFormat::Json => serde_json::from_str(&content)
            .map_err(|e| NcError::Serialization(format!("Failed to parse {:?}: {}", path, e))),
    }
}

pub(crate) fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let format = document_format(path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                NcError::Config(format!("Failed to create directory {:?}: {}", parent, e))
            })?;
        }
    }

    let content = match format {
        DocumentFormat::Toml => toml::to_string_pretty(value)
            .map_err(|e| NcError::Serialization(format!("Failed to serialize: {}", e)))?,
        DocumentFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| NcError::Serialization(format!("Failed to serialize: {}", e)))?,
    };

    std::fs::write(path, content)
        .map_err(|e| NcError::Config(format!("Failed to write {:?}: {}", path, e)))
}
