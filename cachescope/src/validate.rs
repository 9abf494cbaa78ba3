use std::fmt;
use std::fmt::Write;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cache::{GenericSimulator, SimulationResult};

/// One access as a reference model saw it: position in the trace, the
/// decoded placement, and the hit/miss outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub index: usize,
    pub address: u64,
    pub block: u64,
    pub set: u64,
    pub way: usize,
    pub tag: u64,
    pub hit: bool,
}

impl ValidationRecord {
    fn outcome(&self) -> &'static str {
        if self.hit {
            "HIT"
        } else {
            "MISS"
        }
    }
}

/// Replays a trace through a simulator and logs one record per access.
pub fn capture(simulator: &mut GenericSimulator, addresses: &[u64]) -> Vec<ValidationRecord> {
    let block_size = simulator.geometry().block_size();
    addresses
        .iter()
        .enumerate()
        .map(|(index, &address)| {
            let outcome = simulator.access(address);
            ValidationRecord {
                index,
                address,
                block: address / block_size,
                set: outcome.set(),
                way: outcome.way(),
                tag: outcome.tag(),
                hit: outcome.is_hit(),
            }
        })
        .collect()
}

/// Aggregate counters recomputed from a log, never taken on trust from the
/// producer.
pub fn summarize(records: &[ValidationRecord]) -> SimulationResult {
    let hits = records.iter().filter(|record| record.hit).count() as u64;
    let misses = records.len() as u64 - hits;
    let hit_rate = if records.is_empty() {
        0.0
    } else {
        hits as f64 / records.len() as f64
    };
    SimulationResult {
        hits,
        misses,
        hit_rate,
    }
}

/// A single point of disagreement between two logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Mismatch {
    /// The two logs disagree on the outcome at one position.
    Outcome {
        index: usize,
        address: u64,
        expected_hit: bool,
        actual_hit: bool,
    },
    /// One log has more records than the other.
    Length { expected: usize, actual: usize },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Mismatch::Outcome {
                index,
                address,
                expected_hit,
                actual_hit,
            } => write!(
                f,
                "access {index}: expected {}, got {} (address {address:#x})",
                if expected_hit { "HIT" } else { "MISS" },
                if actual_hit { "HIT" } else { "MISS" },
            ),
            Mismatch::Length { expected, actual } => write!(
                f,
                "log lengths differ: expected {expected} records, got {actual}"
            ),
        }
    }
}

/// Verdict and evidence from comparing two independently produced logs.
#[derive(Debug, Serialize)]
pub struct ComparisonReport {
    pub passed: bool,
    pub mismatches: Vec<Mismatch>,
    pub expected: SimulationResult,
    pub actual: SimulationResult,
}

/// Positional, field-by-field comparison of two access logs.
///
/// Both logs are treated as opaque artifacts: neither is re-derived from
/// the other, and the aggregates are recomputed per log. A length mismatch
/// is itself a reported mismatch, after the outcome checks over the shared
/// prefix.
pub fn compare(expected: &[ValidationRecord], actual: &[ValidationRecord]) -> ComparisonReport {
    let mut mismatches = Vec::new();
    for (index, (exp, act)) in expected.iter().zip(actual).enumerate() {
        if exp.hit != act.hit {
            mismatches.push(Mismatch::Outcome {
                index,
                address: exp.address,
                expected_hit: exp.hit,
                actual_hit: act.hit,
            });
        }
    }
    if expected.len() != actual.len() {
        mismatches.push(Mismatch::Length {
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    ComparisonReport {
        passed: mismatches.is_empty(),
        mismatches,
        expected: summarize(expected),
        actual: summarize(actual),
    }
}

const RULE_HEAVY: &str =
    "================================================================================";
const RULE_LIGHT: &str =
    "--------------------------------------------------------------------------------";

/// Renders the comparison as the plain-text validation report: verdict,
/// both aggregates, the mismatch list, and a line-per-access table.
pub fn render_report(
    expected: &[ValidationRecord],
    actual: &[ValidationRecord],
    report: &ComparisonReport,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "CACHE VALIDATION REPORT");
    let _ = writeln!(out, "{RULE_HEAVY}\n");
    if report.passed {
        let _ = writeln!(out, "VALIDATION PASSED\n");
    } else {
        let _ = writeln!(out, "VALIDATION FAILED\n");
    }
    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "  Expected hits:   {}", report.expected.hits);
    let _ = writeln!(out, "  Actual hits:     {}", report.actual.hits);
    let _ = writeln!(out, "  Expected misses: {}", report.expected.misses);
    let _ = writeln!(out, "  Actual misses:   {}", report.actual.misses);
    let _ = writeln!(out, "  Expected rate:   {:.2}%", report.expected.hit_rate * 100.0);
    let _ = writeln!(out, "  Actual rate:     {:.2}%\n", report.actual.hit_rate * 100.0);

    if report.mismatches.is_empty() {
        let _ = writeln!(out, "No mismatches found.\n");
    } else {
        let _ = writeln!(out, "Mismatches ({}):", report.mismatches.len());
        let _ = writeln!(out, "{RULE_LIGHT}");
        for (i, mismatch) in report.mismatches.iter().enumerate() {
            let _ = writeln!(out, "  {}. {mismatch}", i + 1);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "Detailed Comparison:");
    let _ = writeln!(out, "{RULE_LIGHT}");
    let _ = writeln!(out, "{:<5} {:<12} {:<12} {:<8}", "#", "Expected", "Actual", "Match");
    let _ = writeln!(out, "{RULE_LIGHT}");
    for i in 0..expected.len().max(actual.len()) {
        let exp = expected.get(i).map_or("N/A", ValidationRecord::outcome);
        let act = actual.get(i).map_or("N/A", ValidationRecord::outcome);
        let marker = if exp == act { "ok" } else { "MISMATCH" };
        let _ = writeln!(out, "{i:<5} {exp:<12} {act:<12} {marker:<8}");
    }
    let _ = writeln!(out, "{RULE_HEAVY}");
    out
}

/// Renders a captured log in the textual results format, the shape foreign
/// simulators are expected to emit: an access table plus summary lines.
pub fn render_results_log(records: &[ValidationRecord]) -> String {
    let summary = summarize(records);
    let mut out = String::new();
    let _ = writeln!(out, "CACHE ACCESS LOG");
    let _ = writeln!(out, "{RULE_HEAVY}\n");
    let _ = writeln!(out, "Access Trace:");
    let _ = writeln!(out, "{RULE_LIGHT}");
    let _ = writeln!(
        out,
        "{:<5} {:<12} {:<8} {:<5} {:<5} {:<8} {:<10}",
        "#", "Address", "Block", "Set", "Way", "Tag", "Result"
    );
    let _ = writeln!(out, "{RULE_LIGHT}");
    for record in records {
        let _ = writeln!(
            out,
            "{:<5} {:<12} {:<8} {:<5} {:<5} {:<8} {:<10}",
            record.index,
            format!("{:#x}", record.address),
            record.block,
            record.set,
            record.way,
            record.tag,
            record.outcome()
        );
    }
    let _ = writeln!(out, "{RULE_LIGHT}");
    let _ = writeln!(out, "Total Hits:   {}", summary.hits);
    let _ = writeln!(out, "Total Misses: {}", summary.misses);
    let _ = writeln!(out, "Hit Rate:     {:.2}%", summary.hit_rate * 100.0);
    let _ = writeln!(out, "{RULE_HEAVY}");
    out
}

lazy_static! {
    static ref ACCESS_ROW: Regex = Regex::new(
        r"(?m)^\s*(\d+)\s+(0[xX][0-9a-fA-F]+|\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(\d+)\s+(HIT|MISS)\s*$"
    )
    .unwrap();
    static ref TOTAL_HITS: Regex = Regex::new(r"Total Hits:\s*(\d+)").unwrap();
    static ref TOTAL_MISSES: Regex = Regex::new(r"Total Misses:\s*(\d+)").unwrap();
    static ref HIT_RATE: Regex = Regex::new(r"Hit Rate:\s*([0-9.]+)\s*(%?)").unwrap();
}

/// A foreign results log after ingestion: its access records and whatever
/// summary it claimed for itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLog {
    pub records: Vec<ValidationRecord>,
    pub summary: SimulationResult,
}

fn parse_row_address(token: &str) -> Option<u64> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        token.parse().ok()
    }
}

/// Parses an externally produced textual results log.
///
/// Rows that do not match the access-table shape (headers, rules, prose)
/// are ignored; the summary lines are picked up wherever they appear. A
/// percentage hit rate is mapped back to a ratio.
pub fn parse_results_log(text: &str) -> ParsedLog {
    let mut records = Vec::new();
    for captures in ACCESS_ROW.captures_iter(text) {
        let fields = (
            captures[1].parse::<usize>().ok(),
            parse_row_address(&captures[2]),
            captures[3].parse::<u64>().ok(),
            captures[4].parse::<u64>().ok(),
            captures[5].parse::<usize>().ok(),
            captures[6].parse::<u64>().ok(),
        );
        if let (Some(index), Some(address), Some(block), Some(set), Some(way), Some(tag)) = fields {
            records.push(ValidationRecord {
                index,
                address,
                block,
                set,
                way,
                tag,
                hit: &captures[7] == "HIT",
            });
        }
    }

    let hits = TOTAL_HITS
        .captures(text)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);
    let misses = TOTAL_MISSES
        .captures(text)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);
    let hit_rate = HIT_RATE
        .captures(text)
        .and_then(|c| {
            let value: f64 = c[1].parse().ok()?;
            Some(if &c[2] == "%" { value / 100.0 } else { value })
        })
        .unwrap_or(0.0);

    ParsedLog {
        records,
        summary: SimulationResult {
            hits,
            misses,
            hit_rate,
        },
    }
}
