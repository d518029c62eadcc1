//! Lazy cross product of the experiment dimensions

use crate::config::{ExperimentConfig, SchedulingPolicy};
use crate::engine::{AnalysisMethod, ArrivalBoundMethod, Multiplexing};
use std::fmt;

/// One combination of the swept dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SweepPoint {
    pub multiplexing: Multiplexing,
    pub analysis: AnalysisMethod,
    pub arrival_bound: ArrivalBoundMethod,
    pub policy: SchedulingPolicy,
}

impl SweepPoint {
    /// Whether the engine is expected to handle this combination
    pub fn is_supported(&self) -> bool {
        if !self.arrival_bound.is_stable() {
            return false;
        }
        if self.multiplexing == Multiplexing::Fifo {
            return self.analysis.supports_fifo() && self.arrival_bound.supports_fifo();
        }
        true
    }

    /// `base` with this point's dimensions applied
    pub fn apply(&self, base: &ExperimentConfig) -> ExperimentConfig {
        ExperimentConfig {
            multiplexing: self.multiplexing,
            analysis: self.analysis,
            arrival_bound_method: self.arrival_bound,
            scheduling_policy: self.policy,
            ..base.clone()
        }
    }
}

impl fmt::Display for SweepPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.multiplexing, self.analysis, self.arrival_bound, self.policy
        )
    }
}

/// Iterator over the supported sweep points.
///
/// Multiplexing is the outermost dimension, then analysis method, arrival
/// bounding method and scheduling policy (innermost).
#[derive(Debug, Clone)]
pub struct SweepGrid {
    multiplexing: Vec<Multiplexing>,
    analyses: Vec<AnalysisMethod>,
    arrival_bounds: Vec<ArrivalBoundMethod>,
    policies: Vec<SchedulingPolicy>,
    cursor: usize,
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self::full()
    }
}

impl SweepGrid {
    /// Every value of every dimension
    pub fn full() -> Self {
        Self::new(
            Multiplexing::ALL.to_vec(),
            AnalysisMethod::ALL.to_vec(),
            ArrivalBoundMethod::ALL.to_vec(),
            SchedulingPolicy::ALL.to_vec(),
        )
    }

    pub fn new(
        multiplexing: Vec<Multiplexing>,
        analyses: Vec<AnalysisMethod>,
        arrival_bounds: Vec<ArrivalBoundMethod>,
        policies: Vec<SchedulingPolicy>,
    ) -> Self {
        Self {
            multiplexing,
            analyses,
            arrival_bounds,
            policies,
            cursor: 0,
        }
    }

    /// Restrict the scheduling policies
    pub fn with_policies(mut self, policies: Vec<SchedulingPolicy>) -> Self {
        self.policies = policies;
        self
    }

    /// Size of the raw cross product, unsupported points included
    pub fn raw_len(&self) -> usize {
        self.multiplexing.len() * self.analyses.len() * self.arrival_bounds.len() * self.policies.len()
    }

    fn point_at(&self, index: usize) -> SweepPoint {
        let policies = self.policies.len();
        let bounds = self.arrival_bounds.len();
        let analyses = self.analyses.len();

        let policy = index % policies;
        let bound = (index / policies) % bounds;
        let analysis = (index / (policies * bounds)) % analyses;
        let multiplexing = index / (policies * bounds * analyses);

        SweepPoint {
            multiplexing: self.multiplexing[multiplexing],
            analysis: self.analyses[analysis],
            arrival_bound: self.arrival_bounds[bound],
            policy: self.policies[policy],
        }
    }
}

impl Iterator for SweepGrid {
    type Item = SweepPoint;

    fn next(&mut self) -> Option<SweepPoint> {
        while self.cursor < self.raw_len() {
            let point = self.point_at(self.cursor);
            self.cursor += 1;
            if point.is_supported() {
                return Some(point);
            }
            tracing::trace!("Skipping unsupported combination {}", point);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_full_grid_skips_unsupported() {
        let points: Vec<_> = SweepGrid::full().collect();
        // FIFO: 2 analyses × 3 arrival bounds, ARBITRARY: 4 × 6; both × 5 policies
        assert_eq!(points.len(), (2 * 3 + 4 * 6) * 5);
        assert!(points.iter().all(SweepPoint::is_supported));
        assert!(points
            .iter()
            .all(|p| p.arrival_bound != ArrivalBoundMethod::SegrTm));
        assert!(!points.iter().any(|p| p.multiplexing == Multiplexing::Fifo
            && matches!(p.analysis, AnalysisMethod::Pmoo | AnalysisMethod::Tma)));
    }

    #[test]
    fn test_dimension_order() {
        let mut grid = SweepGrid::full();
        let first = grid.next().unwrap();
        let second = grid.next().unwrap();
        assert_eq!(first.multiplexing, Multiplexing::Fifo);
        assert_eq!(first.analysis, AnalysisMethod::Tfa);
        assert_eq!(first.arrival_bound, ArrivalBoundMethod::AggrPbooPerServer);
        assert_eq!(first.policy, SchedulingPolicy::None);
        assert_eq!(second.policy, SchedulingPolicy::Sp);
        assert_eq!(second.arrival_bound, first.arrival_bound);

        let last = SweepGrid::full().last().unwrap();
        assert_eq!(last.multiplexing, Multiplexing::Arbitrary);
        assert_eq!(last.analysis, AnalysisMethod::Tma);
        assert_eq!(last.arrival_bound, ArrivalBoundMethod::SegrPmoo);
        assert_eq!(last.policy, SchedulingPolicy::Wrr);
    }

    #[test]
    fn test_apply_keeps_other_fields() {
        let base = ExperimentConfig {
            max_packet_size: 512,
            ..ExperimentConfig::default()
        };
        let point = SweepGrid::full().nth(40).unwrap();
        let config = point.apply(&base);
        assert_eq!(config.max_packet_size, 512);
        assert_eq!(config.scheduling_policy, point.policy);
        assert_eq!(config.analysis, point.analysis);
    }

    #[test]
    fn test_empty_dimension_yields_nothing() {
        let grid = SweepGrid::full().with_policies(Vec::new());
        assert_eq!(grid.count(), 0);
    }

    proptest! {
        #[test]
        fn test_grid_is_unique_and_supported(
            policies in prop::sample::subsequence(SchedulingPolicy::ALL.to_vec(), 1..=5),
        ) {
            let grid = SweepGrid::full().with_policies(policies.clone());
            let points: Vec<_> = grid.collect();
            let unique: std::collections::HashSet<_> = points.iter().copied().collect();
            prop_assert_eq!(unique.len(), points.len());
            prop_assert_eq!(points.len(), 30 * policies.len());
            for p in &points {
                prop_assert!(p.is_supported());
                prop_assert!(policies.contains(&p.policy));
            }
        }
    }
}
