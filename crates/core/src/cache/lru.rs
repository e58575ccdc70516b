//! Least Recently Used (LRU) Replacement State.
//!
//! Keeps one usage stack per set. Index 0 is the MRU way and the last index
//! is the LRU way. Besides the usual promotion on access, a way can be
//! demoted straight to the LRU position, which is how low-priority prefetch
//! fills are installed.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `touch()`: O(W) where W is the number of ways (associativity)
//!   - `demote()`: O(W)
//!   - `victim()`: O(1)
//! - **Space Complexity:** O(S × W) where S is the number of sets

/// Per-set LRU stacks.
#[derive(Debug, Clone)]
pub struct LruStack {
    usage: Vec<Vec<usize>>,
}

impl LruStack {
    /// Creates LRU state with every set ordered way 0 (MRU) to way `ways - 1` (LRU).
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the cache.
    /// * `ways` - The associativity of the cache.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            usage: (0..sets).map(|_| (0..ways).collect()).collect(),
        }
    }

    /// Moves `way` to the MRU position of `set`.
    pub fn touch(&mut self, set: usize, way: usize) {
        let Some(stack) = self.usage.get_mut(set) else {
            return;
        };
        if let Some(pos) = stack.iter().position(|&w| w == way) {
            let _ = stack.remove(pos);
        }
        stack.insert(0, way);
    }

    /// Moves `way` to the LRU position of `set`, making it the next victim.
    pub fn demote(&mut self, set: usize, way: usize) {
        let Some(stack) = self.usage.get_mut(set) else {
            return;
        };
        if let Some(pos) = stack.iter().position(|&w| w == way) {
            let _ = stack.remove(pos);
        }
        stack.push(way);
    }

    /// Returns the LRU way of `set`.
    pub fn victim(&self, set: usize) -> usize {
        self.usage
            .get(set)
            .and_then(|stack| stack.last().copied())
            .unwrap_or(0)
    }
}
