//! Delay calculation
//!
//! Two modes, chosen by the scheduling policy:
//!
//! - **Batch** (every policy except SP): all flows are placed in the graph at
//!   once and every flow is analyzed with the nominal multiplexing.
//! - **Strict priority**: tiers are processed from the highest priority down.
//!   For tier `k` the services of tiers `0..=k` are placed on the tier-`k`
//!   servers, so higher tiers appear as cross traffic, and only the flows of
//!   tier `k` are analyzed. The first tier uses the nominal multiplexing,
//!   every later tier forces arbitrary multiplexing. The graph is emptied
//!   after every tier.
//!
//! A failed flow is recorded with a sentinel and the run continues. A cyclic
//! dependency ends the run; the report is then marked as structurally failed.

use super::report::{DelayReport, FlowDelay};
use crate::config::{ExperimentConfig, SchedulingPolicy};
use crate::engine::{AnalysisFailure, AnalysisSettings, FlowHandle, NetworkCalculusEngine};
use crate::error::Result;
use crate::network::{add_flows, remove_all_flows};
use crate::topology::{Service, Topology};
use crate::types::Priority;

/// Run the delay calculation selected by the configured policy
pub fn calculate_delays<E: NetworkCalculusEngine>(
    engine: &mut E,
    topology: &Topology,
    services: &mut [Service],
    config: &ExperimentConfig,
) -> Result<DelayReport> {
    tracing::info!(
        "Starting {} analysis ({} policy, {} multiplexing, {} arrival bounding)",
        config.analysis,
        config.scheduling_policy,
        config.multiplexing,
        config.arrival_bound_method
    );

    let report = match config.scheduling_policy {
        SchedulingPolicy::Sp => strict_priority_delays(engine, topology, services, config)?,
        _ => batch_delays(engine, topology, services, config)?,
    };

    if let Some(reason) = report.structural_failure() {
        tracing::error!("Analysis aborted, possible cyclic dependency in network: {}", reason);
    } else {
        tracing::info!(
            "Analysis finished: {} flows, {} failed, deadline torn: {}",
            report.flow_count(),
            report.failed_flow_count(),
            report.deadline_torn()
        );
    }
    Ok(report)
}

/// Place every flow in the graph and analyze all of them.
///
/// Flows stay in the graph afterwards.
pub fn batch_delays<E: NetworkCalculusEngine>(
    engine: &mut E,
    topology: &Topology,
    services: &mut [Service],
    config: &ExperimentConfig,
) -> Result<DelayReport> {
    remove_all_flows(engine, services)?;
    add_flows(
        engine,
        topology,
        services,
        config,
        config.scheduling_policy.fixed_priority(),
        |_| true,
    )?;

    let settings = AnalysisSettings::nominal(config.arrival_bound_method, config.multiplexing);
    let mut report = DelayReport::new();
    if let Err(failure) = analyze_services(engine, services.iter(), &settings, config, &mut report)
    {
        report.mark_structural(failure.to_string());
    }
    Ok(report)
}

/// Tier-by-tier analysis for strict priority scheduling
pub fn strict_priority_delays<E: NetworkCalculusEngine>(
    engine: &mut E,
    topology: &Topology,
    services: &mut [Service],
    config: &ExperimentConfig,
) -> Result<DelayReport> {
    remove_all_flows(engine, services)?;

    let nominal = AnalysisSettings::nominal(config.arrival_bound_method, config.multiplexing);
    let mut report = DelayReport::new();

    for (step, tier) in Priority::ALL.into_iter().enumerate() {
        let added = add_flows(
            engine,
            topology,
            services,
            config,
            Some(tier),
            |s| s.priority <= tier,
        )?;
        let settings = if step == 0 {
            nominal
        } else {
            nominal.forced_arbitrary()
        };
        tracing::debug!(
            "Tier {}: {} flows in graph, enforcement {:?}",
            tier,
            added.len(),
            settings.enforcement
        );

        let outcome = analyze_services(
            engine,
            services.iter().filter(|s| s.priority == tier),
            &settings,
            config,
            &mut report,
        );
        remove_all_flows(engine, services)?;

        if let Err(failure) = outcome {
            report.mark_structural(format!("tier {}: {}", tier, failure));
            break;
        }
    }

    Ok(report)
}

/// Analyze the registered flows of `services` into `report`.
///
/// Stops at the first structural failure and returns it.
fn analyze_services<'s, E: NetworkCalculusEngine>(
    engine: &E,
    services: impl Iterator<Item = &'s Service>,
    settings: &AnalysisSettings,
    config: &ExperimentConfig,
    report: &mut DelayReport,
) -> std::result::Result<(), AnalysisFailure> {
    for service in services {
        tracing::debug!("Analyzing service '{}'", service.name);
        let mut delays = Vec::with_capacity(service.flows().len());

        for &flow in service.flows() {
            let outcome = match analyze_flow(engine, settings, flow, config) {
                Err(failure) if failure.is_structural() => return Err(failure),
                Err(failure) => {
                    tracing::warn!(
                        "{} analysis of flow {} ({}) failed: {}",
                        config.analysis,
                        flow,
                        service.name,
                        failure
                    );
                    Err(failure)
                }
                Ok(delay) => {
                    tracing::debug!("Flow {} delay bound: {:.2}ms", flow, delay);
                    Ok(delay)
                }
            };
            delays.push(FlowDelay { flow, outcome });
        }

        report.record(service, delays);
        if let Some(entry) = report.service(&service.name) {
            if entry.deadline_torn() {
                tracing::error!(
                    "Service {} deadline not met ({:.2}ms/{:.2}ms)",
                    service.name,
                    entry.max_delay_ms().unwrap_or_default(),
                    service.deadline_ms
                );
            }
        }
    }
    Ok(())
}

/// End-to-end bound of one flow in milliseconds, propagation delay included
fn analyze_flow<E: NetworkCalculusEngine>(
    engine: &E,
    settings: &AnalysisSettings,
    flow: FlowHandle,
    config: &ExperimentConfig,
) -> std::result::Result<f64, AnalysisFailure> {
    let bound = engine.analyze(settings, flow, config.analysis)?;
    let hops = engine.path_len(flow).unwrap_or_default();
    Ok((bound + config.propagation_delay * hops as f64) * 1000.0)
}
