//! Flow resolution
//!
//! Declared service paths (node sequences) are mapped onto the servers of the
//! matching edges. A flow registered in the engine is always registered on
//! its service as well, and the two registrations are only ever removed
//! together.

use crate::config::{ArrivalCurveType, ExperimentConfig};
use crate::curves::ArrivalCurve;
use crate::engine::{FlowHandle, NetworkCalculusEngine, ServerHandle};
use crate::error::{NcError, Result};
use crate::topology::{Service, Topology};
use crate::types::Priority;

/// Flow-free copies of `services` holding only the first `count` declared
/// paths, in declaration order. Services whose paths are all cut off are left
/// out.
pub fn first_flows(services: &[Service], count: usize) -> Vec<Service> {
    let mut remaining = count;
    services
        .iter()
        .filter_map(|service| {
            let taken = service.multipath.len().min(remaining);
            if taken == 0 && !service.multipath.is_empty() {
                return None;
            }
            remaining -= taken;
            Some(service.with_first_paths(taken))
        })
        .collect()
}

/// Arrival curve of every flow of `service`
pub fn arrival_curve(service: &Service, kind: ArrivalCurveType) -> ArrivalCurve {
    match kind {
        ArrivalCurveType::TokenBucket => {
            ArrivalCurve::token_bucket(service.bitrate, service.bucket_size)
        }
        ArrivalCurveType::PeakArrivalRate => ArrivalCurve::peak_rate(service.bitrate),
    }
}

/// Resolve a node sequence into the servers of `priority` along it.
///
/// A path of `K` nodes resolves to exactly `K − 1` servers.
pub fn resolve_path(
    topology: &Topology,
    service: &Service,
    path: &[String],
    priority: Priority,
) -> Result<Vec<ServerHandle>> {
    if path.len() < 2 {
        return Err(NcError::InvalidPath {
            service: service.name.clone(),
            len: path.len(),
        });
    }

    path.windows(2)
        .map(|hop| {
            let (from, to) = (&hop[0], &hop[1]);
            let edge = topology
                .find_edge(from, to)
                .and_then(|id| topology.edge(id))
                .ok_or_else(|| NcError::MissingEdge {
                    service: service.name.clone(),
                    from: from.clone(),
                    to: to.clone(),
                })?;
            edge.server(priority).ok_or_else(|| NcError::NetworkNotBuilt {
                from: from.clone(),
                to: to.clone(),
                priority,
            })
        })
        .collect()
}

/// Resolve and insert the flows of every service accepted by `include`.
///
/// Each path becomes one flow, placed on the servers of the service's own
/// priority or of `fixed_priority` when given. Every path is resolved before
/// the first flow is created; if the engine rejects a flow, the flows created
/// by this call are removed again. Returns the handles in insertion order.
pub fn add_flows<E, F>(
    engine: &mut E,
    topology: &Topology,
    services: &mut [Service],
    config: &ExperimentConfig,
    fixed_priority: Option<Priority>,
    include: F,
) -> Result<Vec<FlowHandle>>
where
    E: NetworkCalculusEngine,
    F: Fn(&Service) -> bool,
{
    let mut planned: Vec<(usize, ArrivalCurve, Vec<ServerHandle>)> = Vec::new();
    for (index, service) in services.iter().enumerate() {
        if !include(service) {
            continue;
        }
        let priority = fixed_priority.unwrap_or(service.priority);
        let arrival = arrival_curve(service, config.arrival_curve);
        for path in &service.multipath {
            let servers = resolve_path(topology, service, path, priority)?;
            planned.push((index, arrival, servers));
        }
    }

    let mut added: Vec<(usize, FlowHandle)> = Vec::with_capacity(planned.len());
    for (index, arrival, servers) in planned {
        match engine.create_flow(arrival, &servers) {
            Ok(flow) => added.push((index, flow)),
            Err(err) => {
                for (_, flow) in &added {
                    if let Err(cleanup) = engine.remove_flow(*flow) {
                        tracing::warn!("Failed to roll back flow {}: {}", flow, cleanup);
                    }
                }
                return Err(err.into());
            }
        }
    }

    for &(index, flow) in &added {
        services[index].push_flow(flow);
    }
    tracing::debug!("Added {} flows", added.len());
    Ok(added.into_iter().map(|(_, flow)| flow).collect())
}

/// Remove every flow from the engine and from every service
pub fn remove_all_flows<E: NetworkCalculusEngine>(
    engine: &mut E,
    services: &mut [Service],
) -> Result<()> {
    for service in services.iter_mut() {
        service.clear_flows();
    }
    for flow in engine.flows() {
        engine.remove_flow(flow)?;
    }
    Ok(())
}

/// Remove every server from the engine and drop the handles held by the edges.
/// Flows must have been removed first.
pub fn remove_all_servers<E: NetworkCalculusEngine>(
    engine: &mut E,
    topology: &mut Topology,
) -> Result<()> {
    topology.clear_servers();
    for server in engine.servers() {
        engine.remove_server(server)?;
    }
    Ok(())
}

/// Empty the graph while keeping the declared edges and services
pub fn reset_graph<E: NetworkCalculusEngine>(
    engine: &mut E,
    topology: &mut Topology,
    services: &mut [Service],
) -> Result<()> {
    remove_all_flows(engine, services)?;
    remove_all_servers(engine, topology)?;
    tracing::debug!("Graph reset");
    Ok(())
}
