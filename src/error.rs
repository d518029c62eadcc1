//! Error handling for ncsched
//!
//! This module defines the crate error type and a Result alias for use
//! throughout the library. Per-flow analysis failures are not errors of this
//! kind: they are recorded in the delay report (see [`crate::engine::AnalysisFailure`]).

use crate::engine::EngineError;
use thiserror::Error;

/// Main error type for ncsched operations
#[derive(Error, Debug)]
pub enum NcError {
    /// Invalid experiment configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A per-priority table does not match the number of priority classes
    #[error("Priority table '{table}' has {actual} entries, expected {expected}")]
    PriorityTable {
        table: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Edge whose bitrate cannot carry a service curve
    #[error("Degenerate edge {from}->{to}: bitrate {bitrate} must be positive and finite")]
    DegenerateEdge {
        from: String,
        to: String,
        bitrate: f64,
    },

    /// A declared path uses a node pair with no registered edge
    #[error("Service '{service}' uses missing edge {from}->{to}")]
    MissingEdge {
        service: String,
        from: String,
        to: String,
    },

    /// Path resolution hit an edge whose servers have not been created
    #[error("Edge {from}->{to} has no server for priority {priority}; build the network first")]
    NetworkNotBuilt {
        from: String,
        to: String,
        priority: crate::types::Priority,
    },

    /// A declared path is too short to contain a single hop
    #[error("Service '{service}' declares a path with {len} node(s), at least 2 required")]
    InvalidPath { service: String, len: usize },

    /// Structural engine misuse (unknown handles, empty paths, ...)
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Errors related to Rhai scenario scripts
    #[error("Script error: {0}")]
    Script(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<NcError>,
    },
}

impl NcError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        NcError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        NcError::Script(err.to_string())
    }
}

/// Result type alias for ncsched operations
pub type Result<T> = std::result::Result<T, NcError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| NcError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| NcError::from_rhai_error(e).with_context(f()))
    }
}
