//! Block address helpers.
//!
//! Addresses are plain `u64` values throughout the engine. The successor table
//! treats them as opaque keys; the only structure the engine ever imposes on
//! them is block alignment, used to suppress same-block transitions and to
//! align issued prefetches.

/// Rounds `addr` down to the start of its containing block.
///
/// `block_bytes` must be a power of two. A block size of 0 or 1 leaves the
/// address untouched.
///
/// # Arguments
///
/// * `addr` - The raw address.
/// * `block_bytes` - Block size in bytes.
///
/// # Returns
///
/// The block-aligned base address.
#[inline(always)]
pub const fn block_base(addr: u64, block_bytes: u64) -> u64 {
    if block_bytes <= 1 {
        addr
    } else {
        addr & !(block_bytes - 1)
    }
}

/// Returns `true` when both addresses fall inside the same block.
#[inline(always)]
pub const fn same_block(a: u64, b: u64, block_bytes: u64) -> bool {
    block_base(a, block_bytes) == block_base(b, block_bytes)
}
