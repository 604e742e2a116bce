//! Concurrent open-order table with record recycling and symbol interning.
//!
//! - [`intern`] - first-writer-wins symbol cache
//! - [`arena`] - generation-tagged slot arena with a bounded free list
//! - [`open_orders`] - sharded identifier → record mapping built on both
//!
//! # Locking
//!
//! The table never holds a shard lock and the arena lock at the same time.
//! A handle read from a shard may therefore be released by another caller
//! before it is dereferenced; the generation tag turns that race into a
//! clean miss instead of a read of a recycled record.

pub mod arena;
pub mod intern;
pub mod open_orders;

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::types::OrderId;

pub use arena::{OrderArena, OrderHandle};
pub use intern::SymbolCache;
pub use open_orders::OpenOrders;

/// Stable hash of an identifier, used for shard and worker routing
#[inline]
pub fn key_hash(id: OrderId) -> u64 {
    let mut hasher = FxHasher::default();
    id.hash(&mut hasher);
    hasher.finish()
}

/// Map an identifier onto one of `buckets` partitions
#[inline]
pub fn partition(id: OrderId, buckets: usize) -> usize {
    debug_assert!(buckets > 0);
    (key_hash(id) % buckets as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_is_stable_and_in_range() {
        for id in [-5, 0, 1, 2, 99, i64::MAX] {
            let p = partition(id, 7);
            assert!(p < 7);
            assert_eq!(p, partition(id, 7));
        }
        assert_eq!(partition(12345, 1), 0);
    }
}
