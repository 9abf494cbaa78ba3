use std::collections::{HashMap, HashSet};

use crate::error::ConfigError;

/// Number of distinct blocks referenced anywhere in the trace.
pub fn distinct_blocks(addresses: &[u64], block_size: u64) -> Result<usize, ConfigError> {
    if block_size == 0 || !block_size.is_power_of_two() {
        return Err(ConfigError::BlockSize(block_size));
    }
    let blocks: HashSet<u64> = addresses.iter().map(|&a| a / block_size).collect();
    Ok(blocks.len())
}

/// Working-set sizes over a sliding window of `window_size` accesses.
///
/// Emits one value for the first full window and one per slide after it, so
/// a trace of `n` accesses yields `n - window_size + 1` values. A trace
/// shorter than the window collapses to a single whole-trace distinct count.
///
/// The window is a block count-map: the block leaving the window is
/// decremented (and dropped at zero), the block entering is incremented, and
/// the reported size is the number of live keys.
pub fn sliding_distinct_counts(
    addresses: &[u64],
    window_size: usize,
    block_size: u64,
) -> Result<Vec<usize>, ConfigError> {
    if window_size == 0 {
        return Err(ConfigError::ZeroWindow);
    }
    if addresses.len() < window_size {
        return Ok(vec![distinct_blocks(addresses, block_size)?]);
    }
    if block_size == 0 || !block_size.is_power_of_two() {
        return Err(ConfigError::BlockSize(block_size));
    }
    let blocks: Vec<u64> = addresses.iter().map(|&a| a / block_size).collect();

    let mut in_window: HashMap<u64, usize> = HashMap::new();
    for &block in &blocks[..window_size] {
        *in_window.entry(block).or_insert(0) += 1;
    }
    let mut sizes = Vec::with_capacity(blocks.len() - window_size + 1);
    sizes.push(in_window.len());

    for i in window_size..blocks.len() {
        let leaving = blocks[i - window_size];
        if let Some(count) = in_window.get_mut(&leaving) {
            *count -= 1;
            if *count == 0 {
                in_window.remove(&leaving);
            }
        }
        *in_window.entry(blocks[i]).or_insert(0) += 1;
        sizes.push(in_window.len());
    }
    Ok(sizes)
}
