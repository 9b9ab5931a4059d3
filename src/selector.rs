//! Endpoint selection for multi-endpoint runs
//!
//! A selector is built once per run from the resolved endpoint list and the
//! spec's distribution strategy, then answers "which endpoint serves request
//! n" for every dispatched request number. Selection is pure apart from the
//! weighted strategy's random draw.

use rand::Rng;

use crate::spec::{DistributionStrategy, ResolvedEndpoint};

/// Maps 1-indexed request numbers onto endpoint indices
#[derive(Debug, Clone)]
pub enum EndpointSelector {
    /// Single-endpoint run, every request goes to index 0
    Fixed,
    /// Cycle through endpoints by request number
    RoundRobin {
        /// Endpoint count
        endpoints: usize,
    },
    /// Random draw proportional to weight
    Weighted {
        /// Cumulative weight table, one entry per endpoint
        cumulative: Vec<u64>,
        /// Sum of all weights
        total_weight: u64,
    },
    /// Contiguous blocks in list order, sized by weight
    Sequential {
        /// Cumulative request counts, one entry per endpoint
        boundaries: Vec<u64>,
    },
}

impl EndpointSelector {
    /// Build the selector for one run
    pub fn for_run(
        endpoints: &[ResolvedEndpoint],
        strategy: DistributionStrategy,
        total_requests: u64,
    ) -> Self {
        if endpoints.len() <= 1 {
            return Self::Fixed;
        }
        match strategy {
            DistributionStrategy::RoundRobin => Self::RoundRobin {
                endpoints: endpoints.len(),
            },
            DistributionStrategy::Weighted => {
                let mut cumulative = Vec::with_capacity(endpoints.len());
                let mut running = 0u64;
                for endpoint in endpoints {
                    running += u64::from(endpoint.weight);
                    cumulative.push(running);
                }
                Self::Weighted {
                    cumulative,
                    total_weight: running,
                }
            }
            DistributionStrategy::Sequential => {
                let weights: Vec<u32> = endpoints.iter().map(|e| e.weight).collect();
                let counts = partition(total_requests, &weights);
                let mut boundaries = Vec::with_capacity(counts.len());
                let mut running = 0u64;
                for count in counts {
                    running += count;
                    boundaries.push(running);
                }
                Self::Sequential { boundaries }
            }
        }
    }

    /// The endpoint index serving the given 1-indexed request number
    pub fn select(&self, request_number: u64) -> usize {
        match self {
            Self::Fixed => 0,
            Self::RoundRobin { endpoints } => {
                ((request_number - 1) % *endpoints as u64) as usize
            }
            Self::Weighted {
                cumulative,
                total_weight,
            } => {
                let draw = rand::thread_rng().gen_range(0..*total_weight);
                // First endpoint whose cumulative weight exceeds the draw;
                // zero-weight entries are never landed on.
                cumulative.partition_point(|&c| c <= draw)
            }
            Self::Sequential { boundaries } => boundaries
                .partition_point(|&boundary| boundary < request_number)
                .min(boundaries.len() - 1),
        }
    }
}

/// Split `total` into per-endpoint counts proportional to weight.
///
/// Each endpoint gets the floor of its exact share; leftover requests go to
/// the largest fractional remainders, earlier endpoints winning ties.
fn partition(total: u64, weights: &[u32]) -> Vec<u64> {
    let total_weight: u64 = weights.iter().map(|&w| u64::from(w)).sum();
    if total_weight == 0 {
        let mut counts = vec![0u64; weights.len()];
        if let Some(first) = counts.first_mut() {
            *first = total;
        }
        return counts;
    }

    let mut counts: Vec<u64> = Vec::with_capacity(weights.len());
    let mut remainders: Vec<(u128, usize)> = Vec::with_capacity(weights.len());
    for (index, &weight) in weights.iter().enumerate() {
        let product = u128::from(total) * u128::from(weight);
        counts.push((product / u128::from(total_weight)) as u64);
        remainders.push((product % u128::from(total_weight), index));
    }

    let assigned: u64 = counts.iter().sum();
    let mut leftover = total - assigned;
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for (_, index) in remainders {
        if leftover == 0 {
            break;
        }
        counts[index] += 1;
        leftover -= 1;
    }
    counts
}
