//! Server and turn construction

use crate::config::ExperimentConfig;
use crate::curves::synthesize_service_curves;
use crate::engine::NetworkCalculusEngine;
use crate::error::{NcError, Result, ResultExt};
use crate::topology::{AdjacencyMode, Topology};
use crate::types::Priority;

/// Create one server per edge and priority class.
///
/// Servers of an edge are created in ascending rank (highest priority
/// first). Returns the number of servers created.
pub fn build_servers<E: NetworkCalculusEngine>(
    engine: &mut E,
    topology: &mut Topology,
    config: &ExperimentConfig,
) -> Result<usize> {
    let ids: Vec<_> = topology.iter().map(|(id, _)| id).collect();
    let mut created = 0;

    for id in ids {
        let Some(edge) = topology.edge_mut(id) else {
            continue;
        };
        if !edge.servers().is_empty() {
            return Err(NcError::Config(format!(
                "edge {} already has servers, reset the graph before rebuilding",
                edge
            )));
        }

        let curves = synthesize_service_curves(edge, config, Priority::COUNT)
            .with_context(|| format!("Failed to synthesize service curves for {}", edge))?;

        for priority in Priority::ALL {
            let curve = curves[priority.rank()];
            let label = edge.server_label(priority);
            let server = engine.create_server(&label, curve, config.multiplexing)?;
            tracing::trace!("Created server {} '{}' with {}", server, label, curve);
            edge.push_server(server);
            created += 1;
        }
    }

    tracing::debug!("Created {} servers for {} edges", created, topology.len());
    Ok(created)
}

/// Connect the servers of adjacent edges, priority class by priority class.
///
/// Returns the number of turns requested from the engine.
pub fn create_turns<E: NetworkCalculusEngine>(
    engine: &mut E,
    topology: &Topology,
    mode: AdjacencyMode,
) -> Result<usize> {
    let mut requested = 0;

    for (id, edge) in topology.iter() {
        for next_id in topology.adjacent_edges(id, mode) {
            let Some(next) = topology.edge(next_id) else {
                continue;
            };
            // No priority hopping: class P only ever turns into class P
            for priority in Priority::ALL {
                let (Some(from), Some(to)) = (edge.server(priority), next.server(priority)) else {
                    return Err(NcError::NetworkNotBuilt {
                        from: edge.from.clone(),
                        to: edge.to.clone(),
                        priority,
                    });
                };
                engine.create_turn(from, to)?;
                requested += 1;
            }
        }
    }

    tracing::debug!("Requested {} turns ({:?} adjacency)", requested, mode);
    Ok(requested)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulingPolicy;
    use crate::engine::{MockNetworkCalculusEngine, RateLatencyEngine, ServerHandle};
    use mockall::Sequence;

    fn topology() -> Topology {
        let mut topo = Topology::new();
        topo.add_edge("F1", "H1", 200.0, 0.0);
        topo.add_edge("H1", "S1", 200.0, 0.0);
        topo
    }

    #[test]
    fn test_servers_created_in_rank_order() {
        let mut topo = Topology::new();
        topo.add_edge("H1", "S1", 200.0, 0.0);
        let config = ExperimentConfig {
            scheduling_policy: SchedulingPolicy::Sp,
            ..ExperimentConfig::default()
        };

        let mut engine = MockNetworkCalculusEngine::new();
        let mut seq = Sequence::new();
        for (i, label) in ["H1,S1:HIGH", "H1,S1:MEDIUM", "H1,S1:LOW"].into_iter().enumerate() {
            engine
                .expect_create_server()
                .withf(move |l, _, _| l == label)
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_, _, _| Ok(ServerHandle(i as u32)));
        }

        assert_eq!(build_servers(&mut engine, &mut topo, &config).unwrap(), 3);
        assert_eq!(
            topo.edges()[0].servers(),
            &[ServerHandle(0), ServerHandle(1), ServerHandle(2)]
        );
    }

    #[test]
    fn test_turns_pair_equal_priorities() {
        let mut topo = topology();
        let mut engine = RateLatencyEngine::new();
        build_servers(&mut engine, &mut topo, &ExperimentConfig::default()).unwrap();

        let turns = create_turns(&mut engine, &topo, AdjacencyMode::Directed).unwrap();
        assert_eq!(turns, Priority::COUNT);
        let first = &topo.edges()[0];
        let second = &topo.edges()[1];
        for priority in Priority::ALL {
            assert!(engine.has_turn(
                first.server(priority).unwrap(),
                second.server(priority).unwrap()
            ));
        }
        assert!(!engine.has_turn(
            first.server(Priority::High).unwrap(),
            second.server(Priority::Low).unwrap()
        ));
    }

    #[test]
    fn test_rebuild_without_reset_is_rejected() {
        let mut topo = topology();
        let mut engine = RateLatencyEngine::new();
        let config = ExperimentConfig::default();
        build_servers(&mut engine, &mut topo, &config).unwrap();
        assert!(build_servers(&mut engine, &mut topo, &config).is_err());
    }

    #[test]
    fn test_turns_need_servers() {
        let topo = topology();
        let mut engine = RateLatencyEngine::new();
        assert!(matches!(
            create_turns(&mut engine, &topo, AdjacencyMode::Directed),
            Err(NcError::NetworkNotBuilt { .. })
        ));
    }

    #[test]
    fn test_degenerate_edge_aborts_build() {
        let mut topo = topology();
        topo.add_edge("S1", "H2", 0.0, 0.0);
        let mut engine = RateLatencyEngine::new();
        let err = build_servers(&mut engine, &mut topo, &ExperimentConfig::default()).unwrap_err();
        assert!(err.to_string().contains("S1->H2"));
    }
}
