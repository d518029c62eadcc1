//! Flow combinations
//!
//! Enumerates every ordered `depth`-tuple of declared single-path flows
//! (repetitions included) with an odometer over flow indices, so no call
//! stack grows with the depth.

use crate::topology::Service;

/// One declared path of one service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowRef {
    pub service: usize,
    pub path: usize,
}

/// All declared flows, in service then path order
pub fn declared_flows(services: &[Service]) -> Vec<FlowRef> {
    services
        .iter()
        .enumerate()
        .flat_map(|(service, s)| (0..s.multipath.len()).map(move |path| FlowRef { service, path }))
        .collect()
}

/// Lazy iterator over `flows^depth`
#[derive(Debug, Clone)]
pub struct FlowCombinations {
    flows: Vec<FlowRef>,
    digits: Vec<usize>,
    done: bool,
}

impl FlowCombinations {
    pub fn new(flows: Vec<FlowRef>, depth: usize) -> Self {
        let done = depth == 0 || flows.is_empty();
        Self {
            flows,
            digits: vec![0; depth],
            done,
        }
    }

    pub fn for_services(services: &[Service], depth: usize) -> Self {
        Self::new(declared_flows(services), depth)
    }

    /// Number of combinations in total
    pub fn total(&self) -> usize {
        if self.digits.is_empty() {
            return 0;
        }
        self.flows.len().saturating_pow(self.digits.len() as u32)
    }
}

impl Iterator for FlowCombinations {
    type Item = Vec<FlowRef>;

    fn next(&mut self) -> Option<Vec<FlowRef>> {
        if self.done {
            return None;
        }
        let item = self.digits.iter().map(|&d| self.flows[d]).collect();

        // Advance the last digit first, carrying to the left
        let base = self.flows.len();
        let mut position = self.digits.len();
        loop {
            if position == 0 {
                self.done = true;
                break;
            }
            position -= 1;
            self.digits[position] += 1;
            if self.digits[position] < base {
                break;
            }
            self.digits[position] = 0;
        }
        Some(item)
    }
}
