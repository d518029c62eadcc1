//! Service and arrival curves
//!
//! Only the two curve shapes used by the network model are represented:
//! rate-latency service curves and token-bucket / peak-rate arrival curves.
//! Units are bytes and seconds throughout (rates in bytes/s).

pub mod synthesizer;

pub use synthesizer::{simple_service_curves, synthesize_service_curves};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rate-latency service curve `β(t) = rate · max(0, t − latency)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServiceCurve {
    /// Guaranteed service rate (bytes/s)
    pub rate: f64,
    /// Latency before service starts (s)
    pub latency: f64,
}

impl ServiceCurve {
    pub fn new(rate: f64, latency: f64) -> Self {
        Self { rate, latency }
    }
}

impl fmt::Display for ServiceCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RL(R={:.3}, T={:.6})", self.rate, self.latency)
    }
}

/// Upper bound on the cumulative input of a flow
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArrivalCurve {
    /// `α(t) = burst + rate · t`
    TokenBucket { rate: f64, burst: f64 },
    /// `α(t) = rate · t`
    PeakRate { rate: f64 },
}

impl ArrivalCurve {
    pub fn token_bucket(rate: f64, burst: f64) -> Self {
        ArrivalCurve::TokenBucket { rate, burst }
    }

    pub fn peak_rate(rate: f64) -> Self {
        ArrivalCurve::PeakRate { rate }
    }

    /// Sustained rate (bytes/s)
    pub fn rate(&self) -> f64 {
        match *self {
            ArrivalCurve::TokenBucket { rate, .. } | ArrivalCurve::PeakRate { rate } => rate,
        }
    }

    /// Instantaneous burst (bytes), zero for peak-rate arrivals
    pub fn burst(&self) -> f64 {
        match *self {
            ArrivalCurve::TokenBucket { burst, .. } => burst,
            ArrivalCurve::PeakRate { .. } => 0.0,
        }
    }
}

impl fmt::Display for ArrivalCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrivalCurve::TokenBucket { rate, burst } => {
                write!(f, "TB(r={:.3}, b={:.3})", rate, burst)
            }
            ArrivalCurve::PeakRate { rate } => write!(f, "PR(r={:.3})", rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrival_shapes() {
        let tb = ArrivalCurve::token_bucket(50.0, 255.0);
        assert_eq!(tb.rate(), 50.0);
        assert_eq!(tb.burst(), 255.0);

        let pr = ArrivalCurve::peak_rate(50.0);
        assert_eq!(pr.burst(), 0.0);
        assert_eq!(pr.rate(), 50.0);
    }
}
