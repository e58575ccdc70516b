//! Common utilities and types shared by the engine and its host-side drivers.
//!
//! 1. **Address helpers:** Block alignment and same-block checks.
//! 2. **Error handling:** Configuration, trace and simulation error types.

/// Block address helpers.
pub mod addr;

/// Error types.
pub mod error;

pub use addr::{block_base, same_block};
pub use error::{ConfigError, SimError, TraceError};
