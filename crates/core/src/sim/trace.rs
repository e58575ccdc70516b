//! Address Trace Loader.
//!
//! Traces are plain text, one access per line:
//!
//! ```text
//! # pointer chase over a linked list
//! R 0x7f001040
//! 0x7f0031c0
//! W 2130710528
//! ```
//!
//! An optional leading `R`/`L` (read) or `W`/`S` (write) token gives the
//! access kind; reads are assumed otherwise. Addresses are hex with a `0x`
//! prefix or decimal. Anything after `#` is a comment, and blank lines are
//! skipped.

use std::fs;
use std::path::Path;

use crate::common::error::TraceError;

/// Demand access direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessKind {
    /// Load.
    #[default]
    Read,
    /// Store.
    Write,
}

/// One trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    /// Accessed address.
    pub address: u64,
    /// Access direction.
    pub kind: AccessKind,
}

/// Parses a single address token.
fn parse_address(token: &str) -> Option<u64> {
    if let Some(hex) = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        token.parse().ok()
    }
}

/// Parses the access-kind token, if `token` is one.
fn parse_kind(token: &str) -> Option<AccessKind> {
    match token {
        "R" | "r" | "L" | "l" => Some(AccessKind::Read),
        "W" | "w" | "S" | "s" => Some(AccessKind::Write),
        _ => None,
    }
}

/// Parses trace text.
///
/// # Arguments
///
/// * `text` - Whole trace contents.
///
/// # Returns
///
/// The accesses in trace order.
///
/// # Errors
///
/// Returns [`TraceError::Parse`] with the 1-based line number of the first
/// line that does not hold exactly one address.
pub fn parse_trace(text: &str) -> Result<Vec<TraceRecord>, TraceError> {
    let mut records = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let mut tokens = line.split_whitespace();
        let mut token = tokens.next().unwrap_or_default();
        let kind = match parse_kind(token) {
            Some(kind) => {
                token = tokens.next().unwrap_or_default();
                kind
            }
            None => AccessKind::Read,
        };

        let bad_line = || TraceError::Parse {
            line: idx + 1,
            text: line.to_string(),
        };
        let address = parse_address(token).ok_or_else(bad_line)?;
        if tokens.next().is_some() {
            return Err(bad_line());
        }

        records.push(TraceRecord { address, kind });
    }

    Ok(records)
}

/// Reads and parses a trace file.
///
/// # Errors
///
/// Returns [`TraceError::Io`] when the file cannot be read, otherwise the
/// errors of [`parse_trace`].
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<TraceRecord>, TraceError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| TraceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_trace(&text)
}
