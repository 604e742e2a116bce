//! Open-order table keyed by client order identifier.
//!
//! A key is present exactly while an open for it has been applied and no
//! cancel naming it has followed. A second open for a live key replaces the
//! first (last open wins) and releases the old record. A cancel for an
//! unknown key does nothing.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::config::ConsumerConfig;
use crate::types::{Order, OrderId, PriceCents, Quantity};

use super::arena::{OrderArena, OrderHandle};
use super::intern::SymbolCache;
use super::partition;

/// Thread-safe open-order table.
///
/// Shareable as `Arc<OpenOrders>`. Operations on keys in different shards
/// never contend on the same map lock.
///
/// # Example
///
/// ```rust
/// use fix_flyweight::table::OpenOrders;
///
/// let orders = OpenOrders::new();
/// orders.open(1, "AAPL", 100, 12345);
/// assert!(orders.contains(1));
/// assert!(orders.cancel(1));
/// assert!(!orders.cancel(1));
/// assert!(orders.is_empty());
/// ```
#[derive(Debug)]
pub struct OpenOrders {
    shards: Box<[RwLock<FxHashMap<OrderId, OrderHandle>>]>,
    arena: Mutex<OrderArena>,
    symbols: SymbolCache,
}

impl Default for OpenOrders {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenOrders {
    /// Create a table with the default shard count and free-list bound
    pub fn new() -> Self {
        Self::with_config(&ConsumerConfig::new())
    }

    /// Create a table sized by `config`
    pub fn with_config(config: &ConsumerConfig) -> Self {
        let shards = config.table_shards().max(1);
        Self {
            shards: (0..shards)
                .map(|_| RwLock::new(FxHashMap::default()))
                .collect(),
            arena: Mutex::new(OrderArena::new(config.free_list_capacity())),
            symbols: SymbolCache::new(),
        }
    }

    #[inline]
    fn shard(&self, id: OrderId) -> &RwLock<FxHashMap<OrderId, OrderHandle>> {
        &self.shards[partition(id, self.shards.len())]
    }

    /// Record an open order. Returns `true` if it replaced a live order with the same id.
    #[inline]
    pub fn open(
        &self,
        id: OrderId,
        symbol: &str,
        quantity: Quantity,
        price_cents: PriceCents,
    ) -> bool {
        let symbol = self.symbols.intern(symbol);
        let handle = self.arena.lock().acquire(symbol, quantity, price_cents);
        let previous = self.shard(id).write().insert(id, handle);

        match previous {
            Some(old) => {
                self.arena.lock().release(old);
                true
            }
            None => false,
        }
    }

    /// Remove the order `id`. Returns `false` if it was not open.
    #[inline]
    pub fn cancel(&self, id: OrderId) -> bool {
        let removed = self.shard(id).write().remove(&id);
        match removed {
            Some(handle) => {
                self.arena.lock().release(handle);
                true
            }
            None => false,
        }
    }

    /// Copy of the open order `id`
    pub fn get(&self, id: OrderId) -> Option<Order> {
        let handle = *self.shard(id).read().get(&id)?;
        self.arena.lock().get(handle).cloned()
    }

    /// Check whether `id` is open
    pub fn contains(&self, id: OrderId) -> bool {
        self.shard(id).read().contains_key(&id)
    }

    /// Number of open orders
    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    /// True if no order is open
    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().is_empty())
    }

    /// Sorted identifiers of all open orders
    pub fn ids(&self) -> Vec<OrderId> {
        let mut ids: Vec<OrderId> = self
            .shards
            .iter()
            .flat_map(|s| s.read().keys().copied().collect::<Vec<_>>())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Records currently waiting on the free list
    pub fn free_list_len(&self) -> usize {
        self.arena.lock().free_len()
    }

    /// Live records held by the arena
    pub fn live_records(&self) -> usize {
        self.arena.lock().live()
    }

    /// The symbol cache backing this table
    pub fn symbols(&self) -> &SymbolCache {
        &self.symbols
    }

    /// Canonical symbol instance for `text`
    pub fn intern(&self, text: &str) -> Arc<str> {
        self.symbols.intern(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_then_cancel() {
        let orders = OpenOrders::new();
        assert!(!orders.open(7, "AAPL", 300, 15001));
        assert_eq!(
            orders.get(7),
            Some(Order::new(Arc::from("AAPL"), 300, 15001))
        );
        assert!(orders.cancel(7));
        assert!(orders.get(7).is_none());
        assert_eq!(orders.live_records(), 0);
        assert_eq!(orders.free_list_len(), 1);
    }

    #[test]
    fn test_last_open_wins() {
        let orders = OpenOrders::new();
        orders.open(1, "AAPL", 100, 100);
        assert!(orders.open(1, "MSFT", 200, 200));

        let order = orders.get(1).unwrap();
        assert_eq!(&*order.symbol, "MSFT");
        assert_eq!(order.quantity, 200);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders.live_records(), 1);
    }

    #[test]
    fn test_cancel_unknown_is_noop() {
        let orders = OpenOrders::new();
        orders.open(1, "AAPL", 100, 100);
        assert!(!orders.cancel(2));
        assert_eq!(orders.ids(), vec![1]);
    }

    #[test]
    fn test_records_share_interned_symbol() {
        let orders = OpenOrders::new();
        orders.open(1, "GOOGL", 100, 1);
        orders.open(2, "GOOGL", 100, 2);
        let a = orders.get(1).unwrap().symbol;
        let b = orders.get(2).unwrap().symbol;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(orders.symbols().len(), 1);
    }

    #[test]
    fn test_single_shard_table() {
        let orders = OpenOrders::with_config(&ConsumerConfig::new().with_table_shards(1));
        for id in 0..50 {
            orders.open(id, "META", 1, id);
        }
        for id in (0..50).step_by(2) {
            orders.cancel(id);
        }
        assert_eq!(orders.len(), 25);
        assert!(orders.ids().iter().all(|id| id % 2 == 1));
    }

    #[test]
    fn test_concurrent_disjoint_keys() {
        let orders = Arc::new(OpenOrders::new());
        let handles: Vec<_> = (0..4i64)
            .map(|t| {
                let orders = Arc::clone(&orders);
                std::thread::spawn(move || {
                    let base = t * 10_000;
                    for i in 0..1_000 {
                        orders.open(base + i, "AMZN", 100, i);
                    }
                    for i in (0..1_000).filter(|i| i % 3 == 0) {
                        assert!(orders.cancel(base + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        // 334 of every 1000 canceled per thread.
        assert_eq!(orders.len(), 4 * 666);
        assert_eq!(orders.live_records(), 4 * 666);
        let order = orders.get(10_001).unwrap();
        assert_eq!(order.price_cents, 1);
    }
}
