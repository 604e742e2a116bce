//! Slot arena for order records.
//!
//! Records live in a `Vec` of slots addressed by [`OrderHandle`]. Releasing
//! a handle bumps the slot's generation, so any copy of the old handle stops
//! resolving. Released records go onto a bounded free list and are
//! overwritten in place by the next acquire; once the free list is full a
//! released record is dropped and only its empty slot is kept for reuse.

use std::sync::Arc;

use crate::types::{Order, PriceCents, Quantity};

/// Generation-tagged reference to an arena slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderHandle {
    index: u32,
    generation: u32,
}

impl OrderHandle {
    /// Slot index
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation the handle was issued at
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
enum SlotState {
    Live(Order),
    /// Released, record kept for recycling
    Free(Order),
    /// Released while the free list was full
    Vacant,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    state: SlotState,
}

/// Arena of order records with a bounded free list
#[derive(Debug)]
pub struct OrderArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    vacant: Vec<u32>,
    free_capacity: usize,
    live: usize,
}

impl OrderArena {
    /// Create an arena whose free list keeps at most `free_capacity` records
    pub fn new(free_capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::with_capacity(free_capacity.min(1024)),
            vacant: Vec::new(),
            free_capacity,
            live: 0,
        }
    }

    /// Store a record, recycling a released one when available
    pub fn acquire(
        &mut self,
        symbol: Arc<str>,
        quantity: Quantity,
        price_cents: PriceCents,
    ) -> OrderHandle {
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            let state = std::mem::replace(&mut slot.state, SlotState::Vacant);
            slot.state = match state {
                SlotState::Free(mut order) => {
                    order.set(symbol, quantity, price_cents);
                    SlotState::Live(order)
                }
                _ => SlotState::Live(Order::new(symbol, quantity, price_cents)),
            };
            return OrderHandle {
                index,
                generation: slot.generation,
            };
        }

        let state = SlotState::Live(Order::new(symbol, quantity, price_cents));
        if let Some(index) = self.vacant.pop() {
            let slot = &mut self.slots[index as usize];
            slot.state = state;
            return OrderHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            state,
        });
        OrderHandle {
            index,
            generation: 0,
        }
    }

    /// Resolve a handle; stale or released handles give `None`
    #[inline]
    pub fn get(&self, handle: OrderHandle) -> Option<&Order> {
        let slot = self.slots.get(handle.index as usize)?;
        match &slot.state {
            SlotState::Live(order) if slot.generation == handle.generation => Some(order),
            _ => None,
        }
    }

    /// Return a record to the arena. Returns `false` for a stale handle.
    pub fn release(&mut self, handle: OrderHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation || !matches!(slot.state, SlotState::Live(_)) {
            return false;
        }

        slot.generation = slot.generation.wrapping_add(1);
        let state = std::mem::replace(&mut slot.state, SlotState::Vacant);
        if self.free.len() < self.free_capacity {
            if let SlotState::Live(order) = state {
                slot.state = SlotState::Free(order);
            }
            self.free.push(handle.index);
        } else {
            self.vacant.push(handle.index);
        }
        self.live -= 1;
        true
    }

    /// Number of live records
    pub fn live(&self) -> usize {
        self.live
    }

    /// Number of recycled records waiting on the free list
    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    /// Free-list bound
    pub fn free_capacity(&self) -> usize {
        self.free_capacity
    }

    /// Total slots ever allocated
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    #[test]
    fn test_acquire_and_get() {
        let mut arena = OrderArena::new(4);
        let h = arena.acquire(sym("AAPL"), 100, 12345);
        let order = arena.get(h).unwrap();
        assert_eq!(&*order.symbol, "AAPL");
        assert_eq!(order.quantity, 100);
        assert_eq!(order.price_cents, 12345);
        assert_eq!(arena.live(), 1);
    }

    #[test]
    fn test_release_invalidates_handle() {
        let mut arena = OrderArena::new(4);
        let h = arena.acquire(sym("AAPL"), 100, 1);
        assert!(arena.release(h));
        assert!(arena.get(h).is_none());
        assert!(!arena.release(h));
        assert_eq!(arena.live(), 0);
        assert_eq!(arena.free_len(), 1);
    }

    #[test]
    fn test_released_slot_is_recycled() {
        let mut arena = OrderArena::new(4);
        let old = arena.acquire(sym("AAPL"), 100, 1);
        arena.release(old);

        let new = arena.acquire(sym("MSFT"), 200, 2);
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());
        assert!(arena.get(old).is_none());
        assert_eq!(&*arena.get(new).unwrap().symbol, "MSFT");
        assert_eq!(arena.slot_count(), 1);
        assert_eq!(arena.free_len(), 0);
    }

    #[test]
    fn test_free_list_is_bounded() {
        let mut arena = OrderArena::new(2);
        let handles: Vec<_> = (0..5).map(|i| arena.acquire(sym("META"), i, 0)).collect();
        for h in handles {
            assert!(arena.release(h));
        }
        assert_eq!(arena.free_len(), 2);
        assert_eq!(arena.live(), 0);

        // Vacant slots are reused before the arena grows.
        for i in 0..5 {
            arena.acquire(sym("META"), i, 0);
        }
        assert_eq!(arena.slot_count(), 5);
    }

    #[test]
    fn test_zero_capacity_never_recycles_records() {
        let mut arena = OrderArena::new(0);
        let h = arena.acquire(sym("AMZN"), 1, 1);
        arena.release(h);
        assert_eq!(arena.free_len(), 0);
        let h2 = arena.acquire(sym("AMZN"), 2, 2);
        assert_eq!(arena.get(h2).unwrap().quantity, 2);
    }
}
