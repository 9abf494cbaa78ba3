use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ConfigError;

/// A trait for eviction policies. Can be used to parameterise a
/// [`CacheSimulator`](crate::cache::CacheSimulator).
///
/// Each cache set owns one instance sized to its associativity; policy
/// metadata is never shared between sets.
pub trait EvictionPolicy {
    /// Records that `way` was just referenced.
    fn on_access(&mut self, way: usize);

    /// Picks the way to evict on a miss.
    ///
    /// Only FIFO's rotation and Random's generator state move here; the
    /// recency-tracking policies read their metadata without changing it.
    fn select_victim(&mut self) -> usize;

    /// Restores the just-initialised state.
    fn reset(&mut self);
}

/// Least recently used, tracked with a monotonically increasing logical
/// clock and a per-way stamp of the last access.
///
/// Ways are seeded with staggered values `0..N-1` and the clock starts at
/// `N`, so a pristine set deterministically evicts way 0 first and ties
/// always break toward the lowest way index. An all-zero initialisation
/// would leave that ordering to whichever way the scan happened to keep.
#[derive(Debug, Clone)]
pub struct LeastRecentlyUsed {
    last_access: Vec<u64>,
    clock: u64,
}

impl LeastRecentlyUsed {
    pub fn new(num_ways: usize) -> Self {
        Self {
            last_access: (0..num_ways as u64).collect(),
            clock: num_ways as u64,
        }
    }
}

impl EvictionPolicy for LeastRecentlyUsed {
    fn on_access(&mut self, way: usize) {
        self.last_access[way] = self.clock;
        self.clock += 1;
    }

    fn select_victim(&mut self) -> usize {
        // Index-order scan with a strict comparison keeps the first minimum,
        // which is what pins ties to the lowest way.
        let mut victim = 0;
        let mut min_stamp = u64::MAX;
        for (way, &stamp) in self.last_access.iter().enumerate() {
            if stamp < min_stamp {
                min_stamp = stamp;
                victim = way;
            }
        }
        victim
    }

    fn reset(&mut self) {
        for (way, stamp) in self.last_access.iter_mut().enumerate() {
            *stamp = way as u64;
        }
        self.clock = self.last_access.len() as u64;
    }
}

/// First in, first out: a circular victim pointer over the ways, independent
/// of access recency.
///
/// The pointer advances only when a victim is actually taken, so a way
/// filled on a miss automatically moves to the back of the rotation - the
/// newly loaded block is the last in line for future eviction. Hits never
/// move the pointer.
#[derive(Debug, Clone)]
pub struct FirstInFirstOut {
    next_victim: usize,
    num_ways: usize,
}

impl FirstInFirstOut {
    pub fn new(num_ways: usize) -> Self {
        Self {
            next_victim: 0,
            num_ways,
        }
    }
}

impl EvictionPolicy for FirstInFirstOut {
    fn on_access(&mut self, _way: usize) {}

    fn select_victim(&mut self) -> usize {
        let victim = self.next_victim;
        self.next_victim = (self.next_victim + 1) % self.num_ways;
        victim
    }

    fn reset(&mut self) {
        self.next_victim = 0;
    }
}

/// Uniform random replacement from a per-instance seeded generator.
///
/// Every instance owns its own generator so parallel runs stay independent
/// and a run replays identically for a given seed.
#[derive(Debug, Clone)]
pub struct RandomEviction {
    rng: StdRng,
    seed: u64,
    num_ways: usize,
}

impl RandomEviction {
    pub fn new(num_ways: usize, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
            num_ways,
        }
    }
}

impl EvictionPolicy for RandomEviction {
    fn on_access(&mut self, _way: usize) {}

    fn select_victim(&mut self) -> usize {
        self.rng.gen_range(0..self.num_ways)
    }

    fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}

/// Tree pseudo-LRU: `N-1` bits forming a complete binary tree over the `N`
/// ways, root at index 0.
///
/// A bit of 0 means the left half of the subtree holds the future victim, 1
/// means the right half. Accessing a way walks root to leaf setting each bit
/// to point away from the half just used; victim selection follows the bits
/// down and accumulates the leaf offset. Both walks are iterative over the
/// bit array and touch `log2(N)` nodes.
#[derive(Debug, Clone)]
pub struct TreePseudoLru {
    bits: Vec<bool>,
    depth: u32,
}

impl TreePseudoLru {
    /// Fails unless `num_ways` is a power of two: the bit tree must be
    /// complete.
    pub fn new(num_ways: usize) -> Result<Self, ConfigError> {
        if num_ways == 0 || !num_ways.is_power_of_two() {
            return Err(ConfigError::PseudoLruAssociativity(num_ways));
        }
        Ok(Self {
            bits: vec![false; num_ways - 1],
            depth: num_ways.trailing_zeros(),
        })
    }
}

impl EvictionPolicy for TreePseudoLru {
    fn on_access(&mut self, way: usize) {
        let mut bit = 0;
        let mut pos = way;
        for level in 0..self.depth {
            let half = 1usize << (self.depth - level - 1);
            let used_right = pos >= half;
            // Point the victim walk at the half that was not just used.
            self.bits[bit] = !used_right;
            if used_right {
                pos -= half;
            }
            bit = 2 * bit + if used_right { 2 } else { 1 };
            if bit >= self.bits.len() {
                break;
            }
        }
    }

    fn select_victim(&mut self) -> usize {
        let mut bit = 0;
        let mut victim = 0;
        for level in 0..self.depth {
            let go_right = self.bits[bit];
            if go_right {
                victim += 1usize << (self.depth - level - 1);
            }
            bit = 2 * bit + if go_right { 2 } else { 1 };
            if bit >= self.bits.len() {
                break;
            }
        }
        victim
    }

    fn reset(&mut self) {
        self.bits.fill(false);
    }
}
