use crate::error::ConfigError;
use crate::reuse::{self, ReuseDistance};

/// Recommends the smallest cache size, in blocks, that meets a target hit
/// rate for a given trace.
///
/// Backed by reuse-distance prediction: the distances are computed once and
/// each candidate size is a single scan, instead of re-simulating the whole
/// trace per candidate. For a fully-associative LRU cache the two give the
/// same answer.
pub struct CacheSizeAdvisor {
    distances: Vec<ReuseDistance>,
}

impl CacheSizeAdvisor {
    pub fn from_trace(addresses: &[u64], block_size: u64) -> Result<Self, ConfigError> {
        Ok(Self {
            distances: reuse::compute(addresses, block_size)?,
        })
    }

    pub fn from_distances(distances: Vec<ReuseDistance>) -> Self {
        Self { distances }
    }

    /// Binary search over `[1, max_size]` for the minimal size whose
    /// predicted hit rate reaches `target_hit_rate`.
    ///
    /// Hit rate is non-decreasing in cache size, which is what makes the
    /// bisection valid. Returns `max_size` when the target is unattainable
    /// within the range - a saturation result, not an error.
    pub fn minimal_size_for_hit_rate(&self, target_hit_rate: f64, max_size: u64) -> u64 {
        if max_size == 0 {
            return 0;
        }
        let mut low = 1;
        let mut high = max_size;
        let mut best = max_size;
        while low <= high {
            let mid = low + (high - low) / 2;
            if reuse::predict_hit_rate(&self.distances, mid) >= target_hit_rate {
                best = mid;
                high = mid - 1;
            } else {
                low = mid + 1;
            }
        }
        best
    }

    pub fn distances(&self) -> &[ReuseDistance] {
        &self.distances
    }
}
