//! Service-curve synthesis per scheduling policy
//!
//! Every edge gets one rate-latency curve per priority class, returned in
//! ascending rank (index 0 belongs to the highest priority). With `C` the edge
//! bitrate, `l_max`/`l_min` the configured packet sizes and `N` the number of
//! priority classes:
//!
//! | Policy | Rate_i | Latency_i |
//! |---|---|---|
//! | None | `C` | `l_max/C` with packetizer, plus the link delay if configured |
//! | SP | `C` | `2·l_max/C`, lowest class `l_max/C` (0 without packetizer) |
//! | WFQ | `w_i/Σw · C` | `2·l_max/C` (0 without packetizer) |
//! | DRR | `Q_i/F · C` | `(Q_i(L−l_max) + (F−Q_i)(Q_i+l_max) + Q_i·l_max) / (Q_i·C)` |
//! | WRR | `q_i/(q_i+Q_i) · C` | `(Q_i + l_max)/C` |
//!
//! where `F = ΣQ_j`, `L = N·l_max`, `q_i = w_i·l_min` and
//! `Q_i = (Σw − w_i)·l_max` for WRR. DRR and WRR are always packetized.
//!
//! Links touching a field device always get the simple (`None`) curves.

use super::ServiceCurve;
use crate::config::{ExperimentConfig, SchedulingPolicy};
use crate::error::{NcError, Result};
use crate::topology::Edge;
use crate::types::is_field_device;

/// Create `n` service curves for an edge according to the configured policy
pub fn synthesize_service_curves(
    edge: &Edge,
    config: &ExperimentConfig,
    n: usize,
) -> Result<Vec<ServiceCurve>> {
    let capacity = link_capacity(edge)?;

    let marker = config.field_device_marker.as_str();
    if is_field_device(&edge.from, marker) || is_field_device(&edge.to, marker) {
        return simple_service_curves(edge, config, n);
    }

    match config.scheduling_policy {
        SchedulingPolicy::None => simple_service_curves(edge, config, n),
        SchedulingPolicy::Sp => Ok(strict_priority(capacity, config, n)),
        SchedulingPolicy::Wfq => weighted_fair_queueing(capacity, config, n),
        SchedulingPolicy::Drr => deficit_round_robin(capacity, config, n),
        SchedulingPolicy::Wrr => weighted_round_robin(capacity, config, n),
    }
}

/// Create `n` identical curves that ignore the scheduler: the whole link rate
/// and one packet transmission time as latency.
pub fn simple_service_curves(
    edge: &Edge,
    config: &ExperimentConfig,
    n: usize,
) -> Result<Vec<ServiceCurve>> {
    let capacity = link_capacity(edge)?;
    let mut latency = if config.use_packetizer {
        config.max_packet_size as f64 / capacity
    } else {
        0.0
    };
    if config.use_given_link_delay {
        latency += edge.latency;
    }
    Ok(vec![ServiceCurve::new(capacity, latency); n])
}

fn link_capacity(edge: &Edge) -> Result<f64> {
    if edge.bitrate.is_finite() && edge.bitrate > 0.0 {
        Ok(edge.bitrate)
    } else {
        Err(NcError::DegenerateEdge {
            from: edge.from.clone(),
            to: edge.to.clone(),
            bitrate: edge.bitrate,
        })
    }
}

fn check_table(table: &'static str, values: &[u32], n: usize) -> Result<()> {
    if values.len() != n {
        return Err(NcError::PriorityTable {
            table,
            expected: n,
            actual: values.len(),
        });
    }
    Ok(())
}

fn strict_priority(capacity: f64, config: &ExperimentConfig, n: usize) -> Vec<ServiceCurve> {
    // One l_max for the packetizer, one more for a lower-priority packet in service.
    // Nothing has lower priority than the last class.
    let transmission = if config.use_packetizer {
        config.max_packet_size as f64 / capacity
    } else {
        0.0
    };
    (0..n)
        .map(|rank| {
            let latency = if rank + 1 == n {
                transmission
            } else {
                2.0 * transmission
            };
            ServiceCurve::new(capacity, latency)
        })
        .collect()
}

fn weighted_fair_queueing(
    capacity: f64,
    config: &ExperimentConfig,
    n: usize,
) -> Result<Vec<ServiceCurve>> {
    check_table("flow_weights", &config.flow_weights, n)?;
    let sum_weights: f64 = config.flow_weights.iter().map(|&w| w as f64).sum();
    if sum_weights <= 0.0 {
        return Err(NcError::Config("flow weights must not sum to zero".to_string()));
    }

    // PGPS: one l_max waiting to be scheduled, one for the packetizer
    let latency = if config.use_packetizer {
        2.0 * config.max_packet_size as f64 / capacity
    } else {
        0.0
    };
    Ok(config
        .flow_weights
        .iter()
        .map(|&w| ServiceCurve::new(w as f64 / sum_weights * capacity, latency))
        .collect())
}

fn deficit_round_robin(
    capacity: f64,
    config: &ExperimentConfig,
    n: usize,
) -> Result<Vec<ServiceCurve>> {
    check_table("flow_quanta", &config.flow_quanta, n)?;
    if config.flow_quanta.contains(&0) {
        return Err(NcError::Config("DRR quanta must be positive".to_string()));
    }

    let l_max = config.max_packet_size as f64;
    let frame = l_max * n as f64;
    let total_quanta: f64 = config.flow_quanta.iter().map(|&q| q as f64).sum();

    Ok(config
        .flow_quanta
        .iter()
        .map(|&q| {
            let q = q as f64;
            let latency = (q * (frame - l_max) + (total_quanta - q) * (q + l_max) + q * l_max)
                / (q * capacity);
            ServiceCurve::new(q / total_quanta * capacity, latency)
        })
        .collect())
}

fn weighted_round_robin(
    capacity: f64,
    config: &ExperimentConfig,
    n: usize,
) -> Result<Vec<ServiceCurve>> {
    check_table("flow_weights", &config.flow_weights, n)?;
    let l_min = config.min_packet_size as f64;
    let l_max = config.max_packet_size as f64;
    let sum_weights: f64 = config.flow_weights.iter().map(|&w| w as f64).sum();

    config
        .flow_weights
        .iter()
        .map(|&w| {
            let w = w as f64;
            let own = w * l_min;
            let others = (sum_weights - w) * l_max;
            if own + others <= 0.0 {
                return Err(NcError::Config(
                    "WRR weights must not sum to zero".to_string(),
                ));
            }
            Ok(ServiceCurve::new(
                own / (own + others) * capacity,
                (others + l_max) / capacity,
            ))
        })
        .collect()
}
