use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level simulation configuration, usually parsed from JSON.
///
/// The DRAM section is carried for the external timing simulator and is
/// validated for presence only; the core consumes nothing from it beyond
/// the bank-count sanity check.
#[derive(Debug, Deserialize)]
pub struct SimConfig {
    pub l1_cache: CacheParams,
    pub dram: DramParams,
    #[serde(default = "PolicyConfig::default")]
    pub policy: PolicyConfig,
    /// Seed for the random eviction policy. Runs with the same seed replay
    /// identically; omitting it falls back to a fixed default.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// Raw L1 cache parameters as they appear in the configuration document.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CacheParams {
    pub size_kb: u64,
    pub block_size: u64,
    pub associativity: usize,
}

/// DRAM organisation and timing parameters, named as in the datasheet.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DramParams {
    pub banks: u32,
    #[serde(rename = "tRCD")]
    pub t_rcd: u32,
    #[serde(rename = "tCAS")]
    pub t_cas: u32,
    #[serde(rename = "tRP")]
    pub t_rp: u32,
    #[serde(rename = "tRAS")]
    pub t_ras: u32,
}

/// The eviction policy to build each set with - lru, fifo, random, or plru.
/// Defaults to lru.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub enum PolicyConfig {
    #[serde(alias = "lru")]
    LeastRecentlyUsed,
    #[serde(alias = "fifo")]
    FirstInFirstOut,
    #[serde(alias = "random")]
    Random,
    #[serde(alias = "plru")]
    PseudoLru,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig::LeastRecentlyUsed
    }
}

/// The validated `(num_sets, associativity, block_size)` triple every engine
/// works from.
///
/// The fields are private so a geometry can only exist once the
/// construction-time checks have passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheGeometry {
    num_sets: u64,
    associativity: usize,
    block_size: u64,
}

impl CacheGeometry {
    pub fn new(num_sets: u64, associativity: usize, block_size: u64) -> Result<Self, ConfigError> {
        if block_size == 0 || !block_size.is_power_of_two() {
            return Err(ConfigError::BlockSize(block_size));
        }
        if associativity == 0 {
            return Err(ConfigError::ZeroAssociativity);
        }
        if num_sets == 0 {
            return Err(ConfigError::ZeroSets);
        }
        Ok(Self {
            num_sets,
            associativity,
            block_size,
        })
    }

    pub fn num_sets(&self) -> u64 {
        self.num_sets
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Total number of blocks the cache can hold.
    pub fn total_blocks(&self) -> u64 {
        self.num_sets * self.associativity as u64
    }
}

impl CacheParams {
    /// Derives the geometry triple, `num_sets = size_kb*1024 / block_size /
    /// associativity`, rejecting anything that does not divide exactly.
    pub fn geometry(&self) -> Result<CacheGeometry, ConfigError> {
        if self.block_size == 0 || !self.block_size.is_power_of_two() {
            return Err(ConfigError::BlockSize(self.block_size));
        }
        if self.associativity == 0 {
            return Err(ConfigError::ZeroAssociativity);
        }
        let total_bytes = self.size_kb * 1024;
        let indivisible = ConfigError::Geometry {
            size_kb: self.size_kb,
            block_size: self.block_size,
            associativity: self.associativity,
        };
        if total_bytes % self.block_size != 0 {
            return Err(indivisible);
        }
        let blocks = total_bytes / self.block_size;
        if blocks % self.associativity as u64 != 0 {
            return Err(indivisible);
        }
        let num_sets = blocks / self.associativity as u64;
        let geometry = CacheGeometry::new(num_sets, self.associativity, self.block_size)?;
        tracing::debug!(
            num_sets = geometry.num_sets(),
            associativity = geometry.associativity(),
            block_size = geometry.block_size(),
            "derived cache geometry"
        );
        Ok(geometry)
    }
}

impl SimConfig {
    /// Validates the whole document and returns the derived cache geometry.
    pub fn geometry(&self) -> Result<CacheGeometry, ConfigError> {
        if self.dram.banks == 0 {
            return Err(ConfigError::ZeroDramBanks);
        }
        self.l1_cache.geometry()
    }
}
