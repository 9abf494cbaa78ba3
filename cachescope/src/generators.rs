use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Zipf};

use crate::error::ConfigError;
use crate::trace::{AccessKind, TraceEntry};

/// Synthetic trace generators. These are input producers for the engines;
/// only the shape of the emitted sequence matters.
///
/// Every generator owns a [`StdRng`] seeded from the caller's value, so two
/// runs with the same parameters emit identical traces and parallel runs
/// never share generator state.

fn check_ratio(read_ratio: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&read_ratio) {
        return Err(ConfigError::Generator("read ratio must be within 0.0..=1.0"));
    }
    Ok(())
}

fn kind_for(rng: &mut StdRng, read_ratio: f64) -> AccessKind {
    if rng.gen::<f64>() < read_ratio {
        AccessKind::Read
    } else {
        AccessKind::Write
    }
}

/// Strided sequential addresses `start + i*stride` with monotone timestamps.
pub fn sequential(
    start: u64,
    stride: u64,
    count: usize,
    read_ratio: f64,
    seed: u64,
) -> Result<Vec<TraceEntry>, ConfigError> {
    check_ratio(read_ratio)?;
    if stride == 0 {
        return Err(ConfigError::Generator("stride must be at least 1"));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    Ok((0..count)
        .map(|i| TraceEntry {
            address: start + i as u64 * stride,
            kind: kind_for(&mut rng, read_ratio),
            timestamp: i as u64,
        })
        .collect())
}

/// Uniformly random addresses below `address_bound`; the worst case for any
/// recency-based policy.
pub fn uniform(
    address_bound: u64,
    count: usize,
    read_ratio: f64,
    seed: u64,
) -> Result<Vec<TraceEntry>, ConfigError> {
    check_ratio(read_ratio)?;
    if address_bound == 0 {
        return Err(ConfigError::Generator("address bound must be at least 1"));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    Ok((0..count)
        .map(|i| TraceEntry {
            address: rng.gen_range(0..address_bound),
            kind: kind_for(&mut rng, read_ratio),
            timestamp: i as u64,
        })
        .collect())
}

/// Hot/cold locality: with probability `hot_ratio` the access lands in the
/// hot span at the bottom of the address range, otherwise anywhere below
/// `full_span`. Models loops over a small working set with occasional jumps.
pub fn locality(
    hot_span: u64,
    full_span: u64,
    hot_ratio: f64,
    count: usize,
    read_ratio: f64,
    seed: u64,
) -> Result<Vec<TraceEntry>, ConfigError> {
    check_ratio(read_ratio)?;
    if !(0.0..=1.0).contains(&hot_ratio) {
        return Err(ConfigError::Generator("hot ratio must be within 0.0..=1.0"));
    }
    if hot_span == 0 || full_span < hot_span {
        return Err(ConfigError::Generator(
            "hot span must be at least 1 and no larger than the full span",
        ));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    Ok((0..count)
        .map(|i| {
            let bound = if rng.gen::<f64>() < hot_ratio {
                hot_span
            } else {
                full_span
            };
            TraceEntry {
                address: rng.gen_range(0..bound),
                kind: kind_for(&mut rng, read_ratio),
                timestamp: i as u64,
            }
        })
        .collect())
}

/// Block popularity following a Zipf power law: a handful of blocks absorb
/// most of the accesses, the long tail the rest. Rank r maps to the block at
/// `(r-1) * block_size`.
pub fn zipf(
    num_blocks: u64,
    exponent: f64,
    block_size: u64,
    count: usize,
    read_ratio: f64,
    seed: u64,
) -> Result<Vec<TraceEntry>, ConfigError> {
    check_ratio(read_ratio)?;
    if block_size == 0 {
        return Err(ConfigError::Generator("block size must be at least 1"));
    }
    let distribution = Zipf::new(num_blocks, exponent)
        .map_err(|_| ConfigError::Generator("zipf needs at least one block and a positive exponent"))?;
    let mut rng = StdRng::seed_from_u64(seed);
    Ok((0..count)
        .map(|i| {
            let rank = distribution.sample(&mut rng) as u64;
            TraceEntry {
                address: (rank - 1) * block_size,
                kind: kind_for(&mut rng, read_ratio),
                timestamp: i as u64,
            }
        })
        .collect())
}
