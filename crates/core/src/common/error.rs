//! Error types.
//!
//! The prediction engine itself never fails: every degenerate condition it can
//! meet (untracked address, full successor set, full lookahead queue, first
//! access) is resolved by policy. Errors only arise at the edges of the crate:
//! 1. **Configuration:** Invalid parameters or malformed JSON.
//! 2. **Traces:** Unreadable files or lines that are not addresses.
//! 3. **Simulation:** Either of the above, surfaced through the simulator.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a [`Config`](crate::config::Config).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A parameter holds a value the engine cannot run with.
    #[error("invalid configuration: `{field}` {reason}")]
    Invalid {
        /// Dotted path of the offending field (e.g. `prefetcher.queue_size`).
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The JSON document could not be parsed into a configuration.
    #[error("malformed configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("could not read configuration file '{}': {source}", path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors raised while reading an address trace.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The trace file could not be read.
    #[error("could not read trace '{}': {source}", path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A line did not contain a parseable address.
    #[error("trace line {line}: cannot parse '{text}' as an address")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// The offending token.
        text: String,
    },
}

/// Errors surfaced by the trace-driven simulator.
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Trace failed to load.
    #[error(transparent)]
    Trace(#[from] TraceError),
}
