//! Experiment runners
//!
//! Each runner produces a [`ResultMatrix`] with one row per analysis run.

use super::combos::FlowCombinations;
use super::export::ResultMatrix;
use super::grid::SweepGrid;
use crate::analysis::calculate_delays;
use crate::engine::NetworkCalculusEngine;
use crate::error::{Result, ResultExt};
use crate::network::{first_flows, remove_all_flows};
use crate::session::NcSession;
use crate::topology::Service;

/// Rebuild and analyze the network for every point of `grid`.
///
/// The session's configuration is restored afterwards, also on failure.
pub fn run_sweep<E: NetworkCalculusEngine>(
    session: &mut NcSession<E>,
    grid: SweepGrid,
) -> Result<ResultMatrix> {
    let base = session.config().clone();
    let mut matrix = ResultMatrix::new();

    let outcome = sweep_points(session, grid, &base, &mut matrix);
    let restored = session.set_config(base);
    outcome?;
    restored?;

    tracing::info!("Sweep finished with {} rows", matrix.len());
    Ok(matrix)
}

fn sweep_points<E: NetworkCalculusEngine>(
    session: &mut NcSession<E>,
    grid: SweepGrid,
    base: &crate::config::ExperimentConfig,
    matrix: &mut ResultMatrix,
) -> Result<()> {
    for point in grid {
        tracing::info!("Sweep point {}", point);
        session.set_config(point.apply(base))?;
        session
            .build_network()
            .with_context(|| format!("Failed to build network for {}", point))?;
        let report = session.delay_report()?;
        matrix.push_report(session.config(), &report);
    }
    Ok(())
}

/// Analyze with the first 1, 2, ... N declared flows in the network.
///
/// Every run goes through [`calculate_delays`], so strict priority is
/// analyzed tier by tier.
pub fn run_incremental_flows<E: NetworkCalculusEngine>(
    session: &mut NcSession<E>,
) -> Result<ResultMatrix> {
    session.build_network()?;
    let total = session.declared_flow_count();
    let mut matrix = ResultMatrix::new();

    let (engine, topology, services, config) = session.parts_mut();
    remove_all_flows(engine, services)?;

    for count in 1..=total {
        let mut selected = first_flows(services, count);
        let report = calculate_delays(engine, topology, &mut selected, config)?;
        remove_all_flows(engine, &mut selected)?;
        tracing::info!(
            "{} flows: deadline torn: {}",
            report.flow_count(),
            report.deadline_torn()
        );
        matrix.push_report(config, &report);
    }
    Ok(matrix)
}

/// Analyze every ordered `depth`-tuple of declared single-path flows
pub fn run_flow_combinations<E: NetworkCalculusEngine>(
    session: &mut NcSession<E>,
    depth: usize,
) -> Result<ResultMatrix> {
    session.build_network()?;
    let mut matrix = ResultMatrix::new();

    let (engine, topology, services, config) = session.parts_mut();
    remove_all_flows(engine, services)?;

    let combinations = FlowCombinations::for_services(services, depth);
    tracing::info!(
        "Analyzing {} combinations of depth {}",
        combinations.total(),
        depth
    );

    for combination in combinations {
        let mut selected: Vec<Service> = combination
            .iter()
            .filter_map(|f| services.get(f.service)?.with_single_path(f.path))
            .collect();
        let report = calculate_delays(engine, topology, &mut selected, config)?;
        remove_all_flows(engine, &mut selected)?;
        matrix.push_report(config, &report);
    }
    Ok(matrix)
}
