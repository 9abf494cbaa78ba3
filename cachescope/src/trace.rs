use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::TraceError;

/// Bytes per record in the fixed-width binary trace encoding: a
/// little-endian u64 address, one type byte, a little-endian u64 timestamp.
pub const BINARY_RECORD_BYTES: usize = 17;

/// Whether an access reads or writes the addressed block. The core engines
/// ignore the distinction; it is carried for the trace formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessKind {
    Read,
    Write,
}

impl AccessKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessKind::Read => "READ",
            AccessKind::Write => "WRITE",
        }
    }
}

/// One trace access. The timestamp is the logical position in the sequence,
/// used for reporting only, never for hit/miss decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub address: u64,
    #[serde(rename = "access_type")]
    pub kind: AccessKind,
    pub timestamp: u64,
}

/// Projects a trace down to the address sequence the engines consume.
pub fn addresses(entries: &[TraceEntry]) -> Vec<u64> {
    entries.iter().map(|entry| entry.address).collect()
}

fn parse_address(token: &str) -> Option<u64> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        token.parse().ok()
    }
}

fn parse_line(line: &str, position: usize) -> Option<TraceEntry> {
    let mut tokens = line.split_whitespace();
    let address = parse_address(tokens.next()?)?;
    let mut kind = AccessKind::Read;
    let mut timestamp = position as u64;
    if let Some(token) = tokens.next() {
        match token {
            "READ" => kind = AccessKind::Read,
            "WRITE" => kind = AccessKind::Write,
            other => timestamp = other.parse().ok()?,
        }
        if let Some(token) = tokens.next() {
            timestamp = token.parse().ok()?;
        }
    }
    if tokens.next().is_some() {
        return None;
    }
    Some(TraceEntry {
        address,
        kind,
        timestamp,
    })
}

/// Parses a textual trace: one access per line, the address in `0x`/`0X` hex
/// or decimal, optionally followed by a `READ`/`WRITE` kind and a decimal
/// timestamp. Blank lines and lines starting with `#` are skipped.
///
/// A malformed line is skipped with a warning in lenient mode; in strict
/// mode it aborts the parse with the line number and content.
pub fn parse_text(input: &str, strict: bool) -> Result<Vec<TraceEntry>, TraceError> {
    let mut entries = Vec::new();
    for (index, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(line, entries.len()) {
            Some(entry) => entries.push(entry),
            None if strict => {
                return Err(TraceError::MalformedEntry {
                    line: index + 1,
                    content: line.to_string(),
                })
            }
            None => {
                tracing::warn!(line = index + 1, content = line, "skipping malformed trace entry");
            }
        }
    }
    Ok(entries)
}

/// Renders a trace in the textual format [`parse_text`] accepts.
pub fn render_text(entries: &[TraceEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&format!(
            "{:#x} {} {}\n",
            entry.address,
            entry.kind.as_str(),
            entry.timestamp
        ));
    }
    out
}

/// Reads the `address,access_type,timestamp` CSV interchange format.
pub fn read_csv(bytes: &[u8]) -> Result<Vec<TraceEntry>, TraceError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut entries = Vec::new();
    for record in reader.deserialize() {
        entries.push(record?);
    }
    Ok(entries)
}

/// Writes the CSV interchange format, header included.
pub fn write_csv(entries: &[TraceEntry]) -> Result<Vec<u8>, TraceError> {
    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        for entry in entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
    }
    Ok(buf)
}

/// Encodes a trace in the fixed-width binary format.
pub fn to_binary(entries: &[TraceEntry]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(entries.len() * BINARY_RECORD_BYTES);
    for entry in entries {
        bytes.extend_from_slice(&entry.address.to_le_bytes());
        bytes.push(match entry.kind {
            AccessKind::Read => 0,
            AccessKind::Write => 1,
        });
        bytes.extend_from_slice(&entry.timestamp.to_le_bytes());
    }
    bytes
}

/// Decodes the fixed-width binary format. Always strict: a length that is
/// not a whole number of records or an unknown type byte is an error.
pub fn from_binary(bytes: &[u8]) -> Result<Vec<TraceEntry>, TraceError> {
    if bytes.len() % BINARY_RECORD_BYTES != 0 {
        return Err(TraceError::TruncatedRecord(bytes.len()));
    }
    let mut entries = Vec::with_capacity(bytes.len() / BINARY_RECORD_BYTES);
    for (record, chunk) in bytes.chunks_exact(BINARY_RECORD_BYTES).enumerate() {
        let mut word = [0u8; 8];
        word.copy_from_slice(&chunk[..8]);
        let address = u64::from_le_bytes(word);
        let kind = match chunk[8] {
            0 => AccessKind::Read,
            1 => AccessKind::Write,
            value => return Err(TraceError::UnknownKind { record, value }),
        };
        word.copy_from_slice(&chunk[9..]);
        entries.push(TraceEntry {
            address,
            kind,
            timestamp: u64::from_le_bytes(word),
        });
    }
    Ok(entries)
}

/// Writes a trace to `writer` in the requested format.
pub fn write_entries<W: Write>(
    writer: &mut W,
    entries: &[TraceEntry],
    format: TraceFormat,
) -> Result<(), TraceError> {
    match format {
        TraceFormat::Text => writer.write_all(render_text(entries).as_bytes())?,
        TraceFormat::Csv => writer.write_all(&write_csv(entries)?)?,
        TraceFormat::Binary => writer.write_all(&to_binary(entries))?,
    }
    Ok(())
}

/// Reads a trace from raw file bytes in the requested format.
pub fn read_entries(
    bytes: &[u8],
    format: TraceFormat,
    strict: bool,
) -> Result<Vec<TraceEntry>, TraceError> {
    match format {
        TraceFormat::Text => parse_text(&String::from_utf8_lossy(bytes), strict),
        TraceFormat::Csv => read_csv(bytes),
        TraceFormat::Binary => from_binary(bytes),
    }
}

/// The three on-disk trace encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    Text,
    Csv,
    Binary,
}
