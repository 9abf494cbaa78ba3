use std::collections::{HashMap, HashSet};

use crate::error::ConfigError;

/// Distance between two consecutive references to the same block, measured
/// in distinct blocks touched in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReuseDistance {
    /// First reference to the block; no earlier access exists.
    Infinite,
    Finite(u64),
}

impl ReuseDistance {
    pub fn is_first_reference(&self) -> bool {
        matches!(self, ReuseDistance::Infinite)
    }

    /// An access hits a fully-associative LRU cache of `cache_blocks` blocks
    /// exactly when its distance is finite and strictly below that size.
    pub fn predicts_hit(&self, cache_blocks: u64) -> bool {
        matches!(self, ReuseDistance::Finite(d) if *d < cache_blocks)
    }
}

/// Fenwick (binary indexed) tree over trace positions. Tracks, as +1 marks,
/// the positions that are currently some block's most recent occurrence, so
/// "distinct blocks last seen after position P" is two prefix sums.
struct Fenwick {
    tree: Vec<i64>,
}

impl Fenwick {
    fn new(len: usize) -> Self {
        Self {
            tree: vec![0; len + 1],
        }
    }

    fn add(&mut self, position: usize, delta: i64) {
        let mut i = position + 1;
        while i < self.tree.len() {
            self.tree[i] += delta;
            i += i & i.wrapping_neg();
        }
    }

    /// Sum of marks at positions `0..=position`.
    fn prefix(&self, position: usize) -> i64 {
        let mut i = position + 1;
        let mut sum = 0;
        while i > 0 {
            sum += self.tree[i];
            i -= i & i.wrapping_neg();
        }
        sum
    }
}

fn to_blocks(addresses: &[u64], block_size: u64) -> Result<Vec<u64>, ConfigError> {
    if block_size == 0 || !block_size.is_power_of_two() {
        return Err(ConfigError::BlockSize(block_size));
    }
    Ok(addresses.iter().map(|&a| a / block_size).collect())
}

/// Computes the reuse distance of every access in one pass.
///
/// Olken's order-statistics formulation: keep each block's most recent
/// position marked in a Fenwick tree; on a repeat access at `i` with
/// previous occurrence `p`, the distance is the number of marks strictly
/// between them, then the mark moves from `p` to `i`. O(n log n) overall.
pub fn compute(addresses: &[u64], block_size: u64) -> Result<Vec<ReuseDistance>, ConfigError> {
    let blocks = to_blocks(addresses, block_size)?;
    let mut marks = Fenwick::new(blocks.len());
    let mut last_position: HashMap<u64, usize> = HashMap::new();
    let mut distances = Vec::with_capacity(blocks.len());
    for (i, &block) in blocks.iter().enumerate() {
        match last_position.insert(block, i) {
            Some(previous) => {
                let between = marks.prefix(i - 1) - marks.prefix(previous);
                distances.push(ReuseDistance::Finite(between as u64));
                marks.add(previous, -1);
            }
            None => distances.push(ReuseDistance::Infinite),
        }
        marks.add(i, 1);
    }
    Ok(distances)
}

/// Reference implementation: re-collects the distinct blocks between each
/// pair of occurrences.
///
/// O(n^2) in the worst case. Kept only as a cross-checking oracle for
/// [`compute`]; do not reach for it on large traces.
pub fn compute_naive(
    addresses: &[u64],
    block_size: u64,
) -> Result<Vec<ReuseDistance>, ConfigError> {
    let blocks = to_blocks(addresses, block_size)?;
    let mut last_position: HashMap<u64, usize> = HashMap::new();
    let mut distances = Vec::with_capacity(blocks.len());
    for (i, &block) in blocks.iter().enumerate() {
        match last_position.insert(block, i) {
            Some(previous) => {
                let between: HashSet<u64> = blocks[previous + 1..i].iter().copied().collect();
                distances.push(ReuseDistance::Finite(between.len() as u64));
            }
            None => distances.push(ReuseDistance::Infinite),
        }
    }
    Ok(distances)
}

/// Predicted hit rate of a fully-associative LRU cache holding
/// `cache_blocks` blocks. 0 for an empty trace.
pub fn predict_hit_rate(distances: &[ReuseDistance], cache_blocks: u64) -> f64 {
    if distances.is_empty() {
        return 0.0;
    }
    let hits = distances
        .iter()
        .filter(|d| d.predicts_hit(cache_blocks))
        .count();
    hits as f64 / distances.len() as f64
}

/// Miss rate for every cache size in `1..=max_cache_blocks`.
///
/// Evaluated over a distance histogram with a running cumulative hit count,
/// so the whole curve costs O(n + max) rather than one full scan per size.
/// Growing the size can only convert misses to hits, so the curve is
/// non-increasing.
pub fn predict_miss_rate_curve(
    distances: &[ReuseDistance],
    max_cache_blocks: u64,
) -> Vec<(u64, f64)> {
    if distances.is_empty() {
        return (1..=max_cache_blocks).map(|size| (size, 1.0)).collect();
    }
    let mut counts = vec![0u64; max_cache_blocks as usize];
    for distance in distances {
        if let ReuseDistance::Finite(d) = distance {
            if *d < max_cache_blocks {
                counts[*d as usize] += 1;
            }
        }
    }
    let total = distances.len() as f64;
    let mut hits = 0u64;
    let mut curve = Vec::with_capacity(max_cache_blocks as usize);
    for size in 1..=max_cache_blocks {
        hits += counts[(size - 1) as usize];
        curve.push((size, 1.0 - hits as f64 / total));
    }
    curve
}

/// Distance distribution: per-distance counts below `cap`, everything at or
/// above `cap` lumped into `overflow`, first references tallied separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceHistogram {
    pub counts: Vec<u64>,
    pub overflow: u64,
    pub first_references: u64,
    pub cap: u64,
}

pub fn histogram(distances: &[ReuseDistance], cap: u64) -> DistanceHistogram {
    let mut counts = vec![0u64; cap as usize];
    let mut overflow = 0;
    let mut first_references = 0;
    for distance in distances {
        match distance {
            ReuseDistance::Infinite => first_references += 1,
            ReuseDistance::Finite(d) if *d < cap => counts[*d as usize] += 1,
            ReuseDistance::Finite(_) => overflow += 1,
        }
    }
    DistanceHistogram {
        counts,
        overflow,
        first_references,
        cap,
    }
}
