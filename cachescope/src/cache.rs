use serde::{Deserialize, Serialize};

use crate::config::{CacheGeometry, PolicyConfig};
use crate::error::ConfigError;
use crate::eviction::{
    EvictionPolicy, FirstInFirstOut, LeastRecentlyUsed, RandomEviction, TreePseudoLru,
};

/// Seed used for the random eviction policy when the configuration does not
/// supply one. Runs are reproducible either way.
pub const DEFAULT_RANDOM_SEED: u64 = 0;

/// One way of storage within a set. `None` marks an invalid, never-filled
/// line. Policy metadata lives with the set's policy instance, not here.
#[derive(Debug, Clone, Copy, Default)]
pub struct Line {
    tag: Option<u64>,
}

impl Line {
    pub fn tag(&self) -> Option<u64> {
        self.tag
    }
}

/// An associativity-wide group of lines plus the policy instance that picks
/// victims for it. Owned exclusively by one simulator; policy state is never
/// shared with another set.
struct CacheSet<P: EvictionPolicy> {
    lines: Vec<Line>,
    policy: P,
}

impl<P: EvictionPolicy> CacheSet<P> {
    fn new(associativity: usize, policy: P) -> Self {
        Self {
            lines: vec![Line::default(); associativity],
            policy,
        }
    }

    /// Index-order scan for a resident tag. At most one line can match: a
    /// tag is only ever written after this scan comes up empty.
    fn lookup(&self, tag: u64) -> Option<usize> {
        self.lines.iter().position(|line| line.tag == Some(tag))
    }
}

/// What a single access did, with everything a validation record needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    Hit {
        set: u64,
        way: usize,
        tag: u64,
    },
    Miss {
        set: u64,
        way: usize,
        tag: u64,
        /// Tag displaced from the chosen way, if it held one.
        evicted: Option<u64>,
    },
}

impl AccessOutcome {
    pub fn is_hit(&self) -> bool {
        matches!(self, AccessOutcome::Hit { .. })
    }

    pub fn set(&self) -> u64 {
        match *self {
            AccessOutcome::Hit { set, .. } | AccessOutcome::Miss { set, .. } => set,
        }
    }

    pub fn way(&self) -> usize {
        match *self {
            AccessOutcome::Hit { way, .. } | AccessOutcome::Miss { way, .. } => way,
        }
    }

    pub fn tag(&self) -> u64 {
        match *self {
            AccessOutcome::Hit { tag, .. } | AccessOutcome::Miss { tag, .. } => tag,
        }
    }

    pub fn evicted(&self) -> Option<u64> {
        match *self {
            AccessOutcome::Hit { .. } => None,
            AccessOutcome::Miss { evicted, .. } => evicted,
        }
    }
}

/// Aggregate counters for a finished (or in-progress) run. Serialises to the
/// output format the CLI prints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationResult {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

/// A set-associative cache simulator, parameterised by an eviction policy.
///
/// One solid implementation which is easy to extend with more policies:
/// monomorphisation and inlining of the policy methods keep it close to what
/// specialised per-policy simulators would cost.
pub struct CacheSimulator<P: EvictionPolicy> {
    geometry: CacheGeometry,
    sets: Vec<CacheSet<P>>,
    hits: u64,
    misses: u64,
}

impl<P: EvictionPolicy> CacheSimulator<P> {
    /// Builds `num_sets` sets, calling the factory once per set so every set
    /// gets a fresh, independent policy instance.
    ///
    /// The geometry carries the construction-time validation; an invalid
    /// configuration can never reach this point.
    pub fn new<F>(geometry: CacheGeometry, mut policy_factory: F) -> Self
    where
        F: FnMut(u64) -> P,
    {
        let sets = (0..geometry.num_sets())
            .map(|set| CacheSet::new(geometry.associativity(), policy_factory(set)))
            .collect();
        Self {
            geometry,
            sets,
            hits: 0,
            misses: 0,
        }
    }

    /// Decodes an address into its `(set, tag)` pair.
    pub fn decode(&self, address: u64) -> (u64, u64) {
        let block = address / self.geometry.block_size();
        (
            block % self.geometry.num_sets(),
            block / self.geometry.num_sets(),
        )
    }

    /// Runs one access: scan the target set in way order, update the policy,
    /// and on a miss overwrite the victim line.
    pub fn access(&mut self, address: u64) -> AccessOutcome {
        let (set_index, tag) = self.decode(address);
        let set = &mut self.sets[set_index as usize];
        if let Some(way) = set.lookup(tag) {
            self.hits += 1;
            set.policy.on_access(way);
            AccessOutcome::Hit {
                set: set_index,
                way,
                tag,
            }
        } else {
            self.misses += 1;
            let way = set.policy.select_victim();
            let evicted = set.lines[way].tag.replace(tag);
            set.policy.on_access(way);
            AccessOutcome::Miss {
                set: set_index,
                way,
                tag,
                evicted,
            }
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Hits over total accesses; defined as 0 before any access rather than
    /// a division error.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn geometry(&self) -> CacheGeometry {
        self.geometry
    }

    pub fn result(&self) -> SimulationResult {
        SimulationResult {
            hits: self.hits,
            misses: self.misses,
            hit_rate: self.hit_rate(),
        }
    }

    /// Invalidates every line and restores each set's policy to its
    /// just-initialised state.
    pub fn reset(&mut self) {
        for set in &mut self.sets {
            for line in &mut set.lines {
                line.tag = None;
            }
            set.policy.reset();
        }
        self.hits = 0;
        self.misses = 0;
    }
}

/// Enum over the four policy-specialised simulators.
///
/// Trait objects would cut the boilerplate here, but the per-access virtual
/// dispatch is opaque to the compiler; branching on concrete types instead
/// lets it inline the policy methods into the access loop.
pub enum GenericSimulator {
    LeastRecentlyUsed(CacheSimulator<LeastRecentlyUsed>),
    FirstInFirstOut(CacheSimulator<FirstInFirstOut>),
    Random(CacheSimulator<RandomEviction>),
    PseudoLru(CacheSimulator<TreePseudoLru>),
}

impl From<CacheSimulator<LeastRecentlyUsed>> for GenericSimulator {
    fn from(value: CacheSimulator<LeastRecentlyUsed>) -> Self {
        Self::LeastRecentlyUsed(value)
    }
}

impl From<CacheSimulator<FirstInFirstOut>> for GenericSimulator {
    fn from(value: CacheSimulator<FirstInFirstOut>) -> Self {
        Self::FirstInFirstOut(value)
    }
}

impl From<CacheSimulator<RandomEviction>> for GenericSimulator {
    fn from(value: CacheSimulator<RandomEviction>) -> Self {
        Self::Random(value)
    }
}

impl From<CacheSimulator<TreePseudoLru>> for GenericSimulator {
    fn from(value: CacheSimulator<TreePseudoLru>) -> Self {
        Self::PseudoLru(value)
    }
}

impl GenericSimulator {
    /// Builds a simulator for a validated geometry and a policy selection.
    ///
    /// Pseudo-LRU re-checks the associativity here, so a bad pairing fails
    /// before any set is built. The random policy derives one independent
    /// stream per set from the configured seed.
    pub fn build(
        geometry: CacheGeometry,
        policy: PolicyConfig,
        seed: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let ways = geometry.associativity();
        let simulator = match policy {
            PolicyConfig::LeastRecentlyUsed => {
                CacheSimulator::new(geometry, |_| LeastRecentlyUsed::new(ways)).into()
            }
            PolicyConfig::FirstInFirstOut => {
                CacheSimulator::new(geometry, |_| FirstInFirstOut::new(ways)).into()
            }
            PolicyConfig::Random => {
                let seed = seed.unwrap_or(DEFAULT_RANDOM_SEED);
                CacheSimulator::new(geometry, |set| {
                    RandomEviction::new(ways, seed.wrapping_add(set))
                })
                .into()
            }
            PolicyConfig::PseudoLru => {
                let prototype = TreePseudoLru::new(ways)?;
                CacheSimulator::new(geometry, |_| prototype.clone()).into()
            }
        };
        Ok(simulator)
    }

    pub fn access(&mut self, address: u64) -> AccessOutcome {
        match self {
            GenericSimulator::LeastRecentlyUsed(sim) => sim.access(address),
            GenericSimulator::FirstInFirstOut(sim) => sim.access(address),
            GenericSimulator::Random(sim) => sim.access(address),
            GenericSimulator::PseudoLru(sim) => sim.access(address),
        }
    }

    pub fn hits(&self) -> u64 {
        match self {
            GenericSimulator::LeastRecentlyUsed(sim) => sim.hits(),
            GenericSimulator::FirstInFirstOut(sim) => sim.hits(),
            GenericSimulator::Random(sim) => sim.hits(),
            GenericSimulator::PseudoLru(sim) => sim.hits(),
        }
    }

    pub fn misses(&self) -> u64 {
        match self {
            GenericSimulator::LeastRecentlyUsed(sim) => sim.misses(),
            GenericSimulator::FirstInFirstOut(sim) => sim.misses(),
            GenericSimulator::Random(sim) => sim.misses(),
            GenericSimulator::PseudoLru(sim) => sim.misses(),
        }
    }

    pub fn hit_rate(&self) -> f64 {
        match self {
            GenericSimulator::LeastRecentlyUsed(sim) => sim.hit_rate(),
            GenericSimulator::FirstInFirstOut(sim) => sim.hit_rate(),
            GenericSimulator::Random(sim) => sim.hit_rate(),
            GenericSimulator::PseudoLru(sim) => sim.hit_rate(),
        }
    }

    pub fn geometry(&self) -> CacheGeometry {
        match self {
            GenericSimulator::LeastRecentlyUsed(sim) => sim.geometry(),
            GenericSimulator::FirstInFirstOut(sim) => sim.geometry(),
            GenericSimulator::Random(sim) => sim.geometry(),
            GenericSimulator::PseudoLru(sim) => sim.geometry(),
        }
    }

    pub fn result(&self) -> SimulationResult {
        match self {
            GenericSimulator::LeastRecentlyUsed(sim) => sim.result(),
            GenericSimulator::FirstInFirstOut(sim) => sim.result(),
            GenericSimulator::Random(sim) => sim.result(),
            GenericSimulator::PseudoLru(sim) => sim.result(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            GenericSimulator::LeastRecentlyUsed(sim) => sim.reset(),
            GenericSimulator::FirstInFirstOut(sim) => sim.reset(),
            GenericSimulator::Random(sim) => sim.reset(),
            GenericSimulator::PseudoLru(sim) => sim.reset(),
        }
    }
}
