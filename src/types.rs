//! Core value types shared across ncsched
//!
//! # Main Types
//!
//! - [`Priority`] - Ranked traffic classes (rank 0 is the highest priority)
//!
//! Every per-priority array in the crate (server handles on an edge, weights,
//! quanta, service curves of an edge) is indexed by [`Priority::rank`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Traffic priority class
///
/// Variants are declared in decreasing priority order. The declaration order
/// defines the rank and therefore the order in which servers are created.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    /// Highest priority, rank 0
    #[default]
    High,
    /// Rank 1
    Medium,
    /// Lowest priority, rank 2
    Low,
}

impl Priority {
    /// Number of priority classes
    pub const COUNT: usize = 3;

    /// All priorities in ascending rank (highest priority first)
    pub const ALL: [Priority; Priority::COUNT] = [Priority::High, Priority::Medium, Priority::Low];

    /// Numeric rank, 0 = highest
    #[inline]
    pub fn rank(self) -> usize {
        self as usize
    }

    /// Symbolic name as used in server labels and exported results
    pub fn name(self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }

    /// Look up a priority by rank
    pub fn from_rank(rank: usize) -> Option<Priority> {
        Self::ALL.get(rank).copied()
    }

    /// Convert a caller-supplied index into a priority, clamping into `[0, COUNT-1]`
    pub fn from_index_clamped(index: i64) -> Priority {
        let rank = index.clamp(0, Self::COUNT as i64 - 1) as usize;
        Self::ALL[rank]
    }

    /// The highest priority class
    pub fn highest() -> Priority {
        Self::ALL[0]
    }

    /// The lowest priority class
    pub fn lowest() -> Priority {
        Self::ALL[Self::COUNT - 1]
    }

    /// Whether this is the lowest priority class
    pub fn is_lowest(self) -> bool {
        self == Self::lowest()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Whether a node name denotes a field device
///
/// Field devices are recognised by a marker substring in their name
/// (e.g. `"F"` in `"F12"`).
pub fn is_field_device(node: &str, marker: &str) -> bool {
    !marker.is_empty() && node.contains(marker)
}
