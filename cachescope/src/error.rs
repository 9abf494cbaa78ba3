use thiserror::Error;

use crate::trace::BINARY_RECORD_BYTES;

/// Configuration problems that must stop a run before any access is
/// processed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("block size must be a positive power of two, got {0}")]
    BlockSize(u64),

    #[error("associativity must be at least 1")]
    ZeroAssociativity,

    #[error("number of sets must be at least 1")]
    ZeroSets,

    #[error("pseudo-LRU requires a power-of-two associativity, got {0}")]
    PseudoLruAssociativity(usize),

    #[error(
        "cache of {size_kb} KiB does not divide into {block_size}-byte blocks across {associativity} ways"
    )]
    Geometry {
        size_kb: u64,
        block_size: u64,
        associativity: usize,
    },

    #[error("DRAM bank count must be at least 1")]
    ZeroDramBanks,

    #[error("window size must be at least 1")]
    ZeroWindow,

    #[error("invalid generator parameters: {0}")]
    Generator(&'static str),
}

/// Failures while reading or decoding a trace.
///
/// In lenient parsing a malformed text line is skipped with a warning and
/// never surfaces as `MalformedEntry`; strict parsing promotes it to an
/// error. The binary codec is always strict.
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("malformed trace entry on line {line}: {content:?}")]
    MalformedEntry { line: usize, content: String },

    #[error("binary trace length {0} is not a multiple of the {BINARY_RECORD_BYTES}-byte record size")]
    TruncatedRecord(usize),

    #[error("unknown access type byte {value:#04x} in record {record}")]
    UnknownKind { record: usize, value: u8 },

    #[error("malformed csv trace: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
