//! Rhai engine for scenario scripts

use crate::config::{EdgeSpec, ExperimentConfig, ScenarioFile, ServiceSpec};
use crate::error::{NcError, Result, ResultExt};
use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, INT};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Scenario being assembled by a running script
pub type SharedScenario = Arc<RwLock<ScenarioFile>>;

type FnResult<T> = std::result::Result<T, Box<EvalAltResult>>;

/// Script engine producing [`ScenarioFile`]s
pub struct ScenarioScript {
    engine: Engine,
    scenario: SharedScenario,
}

impl ScenarioScript {
    pub fn new() -> Self {
        let scenario: SharedScenario = Arc::new(RwLock::new(ScenarioFile::default()));
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine, scenario.clone());
        Self { engine, scenario }
    }

    /// Configure the Rhai engine with scenario functions and safety limits
    fn configure_engine(engine: &mut Engine, scenario: SharedScenario) {
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(32);
        engine.set_max_operations(1_000_000);
        engine.set_max_string_size(10_000);
        engine.set_max_array_size(10_000);
        engine.set_max_map_size(1_000);

        // ===== Topology =====

        {
            let scenario = scenario.clone();
            engine.register_fn(
                "add_edge",
                move |from: ImmutableString,
                      to: ImmutableString,
                      bitrate: Dynamic,
                      latency: Dynamic|
                      -> FnResult<()> {
                    let edge = EdgeSpec {
                        from: from.to_string(),
                        to: to.to_string(),
                        bitrate: number(&bitrate, "bitrate")?,
                        latency: number(&latency, "latency")?,
                    };
                    write(&scenario, |s| s.edges.push(edge))
                },
            );
        }
        {
            let scenario = scenario.clone();
            engine.register_fn(
                "add_service",
                move |name: ImmutableString,
                      origin_server: ImmutableString,
                      bucket_size: Dynamic,
                      bitrate: Dynamic,
                      deadline_ms: Dynamic,
                      multipath: Array,
                      priority: INT|
                      -> FnResult<()> {
                    let service = ServiceSpec {
                        name: name.to_string(),
                        origin_server: origin_server.to_string(),
                        bucket_size: number(&bucket_size, "bucket_size")?,
                        bitrate: number(&bitrate, "bitrate")?,
                        deadline_ms: number(&deadline_ms, "deadline_ms")?,
                        priority,
                        multipath: paths(multipath)?,
                    };
                    write(&scenario, |s| s.services.push(service))
                },
            );
        }

        // ===== Experiment =====

        {
            let scenario = scenario.clone();
            engine.register_fn("set_policy", move |name: ImmutableString| -> FnResult<()> {
                let policy = parse_name(&name)?;
                with_experiment(&scenario, |c| c.scheduling_policy = policy)
            });
        }
        {
            let scenario = scenario.clone();
            engine.register_fn("set_analysis", move |name: ImmutableString| -> FnResult<()> {
                let analysis = parse_name(&name)?;
                with_experiment(&scenario, |c| c.analysis = analysis)
            });
        }
        {
            let scenario = scenario.clone();
            engine.register_fn(
                "set_multiplexing",
                move |name: ImmutableString| -> FnResult<()> {
                    let multiplexing = parse_name(&name)?;
                    with_experiment(&scenario, |c| c.multiplexing = multiplexing)
                },
            );
        }
        {
            let scenario = scenario.clone();
            engine.register_fn(
                "set_arrival_bound",
                move |name: ImmutableString| -> FnResult<()> {
                    let method = parse_name(&name)?;
                    with_experiment(&scenario, |c| c.arrival_bound_method = method)
                },
            );
        }
        {
            let scenario = scenario.clone();
            engine.register_fn("set_weights", move |weights: Array| -> FnResult<()> {
                let weights = table(weights, "weights")?;
                with_experiment(&scenario, |c| c.flow_weights = weights)
            });
        }
        {
            let scenario = scenario.clone();
            engine.register_fn("set_quanta", move |quanta: Array| -> FnResult<()> {
                let quanta = table(quanta, "quanta")?;
                with_experiment(&scenario, |c| c.flow_quanta = quanta)
            });
        }
        engine.register_fn("set_packetizer", move |enabled: bool| -> FnResult<()> {
            with_experiment(&scenario, |c| c.use_packetizer = enabled)
        });
    }

    /// Run a script and return the scenario it declared
    pub fn run(&self, source: &str) -> Result<ScenarioFile> {
        {
            let mut scenario = self
                .scenario
                .write()
                .map_err(|e| NcError::Script(format!("Failed to acquire scenario lock: {}", e)))?;
            *scenario = ScenarioFile::default();
        }

        self.engine.run(source).context("Scenario script failed")?;

        let scenario = self
            .scenario
            .read()
            .map_err(|e| NcError::Script(format!("Failed to acquire scenario lock: {}", e)))?;
        if let Some(config) = &scenario.experiment {
            config.validate().context("Script produced an invalid configuration")?;
        }
        Ok(scenario.clone())
    }

    /// Read and run a script file
    pub fn run_file(&self, path: impl AsRef<Path>) -> Result<ScenarioFile> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        self.run(&source)
            .with_context(|| format!("Failed to run scenario script {:?}", path))
    }

    /// Validate a script without executing it
    pub fn validate(&self, source: &str) -> Result<()> {
        self.engine
            .compile(source)
            .map(|_| ())
            .map_err(|e| NcError::Script(format!("Validation error: {}", e)))
    }
}

impl Default for ScenarioScript {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScenarioScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioScript").finish_non_exhaustive()
    }
}

fn write(scenario: &SharedScenario, f: impl FnOnce(&mut ScenarioFile)) -> FnResult<()> {
    let mut guard = scenario
        .write()
        .map_err(|_| "scenario state is poisoned")?;
    f(&mut guard);
    Ok(())
}

fn with_experiment(
    scenario: &SharedScenario,
    f: impl FnOnce(&mut ExperimentConfig),
) -> FnResult<()> {
    write(scenario, |s| f(s.experiment.get_or_insert_with(ExperimentConfig::default)))
}

/// Accept both integer and float literals
fn number(value: &Dynamic, what: &str) -> FnResult<f64> {
    if let Ok(f) = value.as_float() {
        Ok(f)
    } else if let Ok(i) = value.as_int() {
        Ok(i as f64)
    } else {
        Err(format!("{} must be a number, got {}", what, value.type_name()).into())
    }
}

fn paths(multipath: Array) -> FnResult<Vec<Vec<String>>> {
    multipath
        .into_iter()
        .map(|path| {
            path.into_typed_array::<ImmutableString>()
                .map(|nodes| nodes.into_iter().map(|n| n.to_string()).collect::<Vec<_>>())
                .map_err(|_| -> Box<EvalAltResult> {
                    "every path must be an array of node names".into()
                })
        })
        .collect()
}

fn table(values: Array, what: &str) -> FnResult<Vec<u32>> {
    values
        .into_iter()
        .map(|v| {
            v.as_int()
                .ok()
                .and_then(|i| u32::try_from(i).ok())
                .ok_or_else(|| -> Box<EvalAltResult> {
                    format!("{} must be non-negative integers", what).into()
                })
        })
        .collect()
}

/// Parse an enum from its serialized name, e.g. `"WFQ"` or `"ARBITRARY"`
fn parse_name<T: DeserializeOwned>(name: &str) -> FnResult<T> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .map_err(|_| format!("unknown name '{}'", name).into())
}
