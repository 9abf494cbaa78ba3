//! # Cachescope
//!
//! Cachescope models how a set-associative cache responds to a sequence of
//! memory accesses, and derives cache-sizing predictions from that trace
//! without re-simulating for every candidate size
//!
//! It provides a generic cache simulator which can be parameterised by an
//! eviction policy, trace-analysis engines (reuse distance, working set,
//! size recommendation) that run independently over the same address
//! sequence, and a validation harness for comparing access logs produced by
//! different implementations of the same contract
//!
//! While designed to accommodate high performance, it prioritises
//! flexibility, being easy to maintain and expand with new policies

/// Contains the binary-search cache-size recommender built on reuse distance
pub mod advisor;

/// Contains the implementation of the cache, and a utility enum for the existing policy types
pub mod cache;

/// Contains definitions for the JSON configuration format and the derived cache geometry
pub mod config;

/// Contains the error taxonomy shared across the crate
pub mod error;

/// Contains the provided eviction policies, with a trait for implementing custom policies
pub mod eviction;

/// Contains seeded synthetic trace generators
pub mod generators;

/// Contains trace file reading
pub mod io;

/// Contains the reuse-distance (stack-distance) engine and its hit-rate predictions
pub mod reuse;

/// Contains the trace representation and its text, CSV, and binary codecs
pub mod trace;

/// Contains the access-log validation harness
pub mod validate;

/// Contains the sliding-window working-set engine
pub mod working_set;

#[cfg(test)]
mod test;
