//! Order-related types.

use std::sync::Arc;

use super::{PriceCents, Quantity};

/// Order side as carried in Side (54)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// `54=1`
    Buy,
    /// `54=2`
    Sell,
}

impl Side {
    /// The wire byte for this side
    pub const fn as_fix_byte(self) -> u8 {
        match self {
            Side::Buy => b'1',
            Side::Sell => b'2',
        }
    }
}

/// An open order as held by the open-order table.
///
/// Records are recycled through the table's slot arena: once a cancel
/// releases one, its storage is handed to the next open. The symbol is the
/// interned canonical instance, so cloning a record never copies the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Interned symbol (55)
    pub symbol: Arc<str>,
    /// OrderQty (38)
    pub quantity: Quantity,
    /// Price (44) in cents
    pub price_cents: PriceCents,
}

impl Order {
    /// Create a record
    pub fn new(symbol: Arc<str>, quantity: Quantity, price_cents: PriceCents) -> Self {
        Self {
            symbol,
            quantity,
            price_cents,
        }
    }

    /// Overwrite every field in place
    pub fn set(&mut self, symbol: Arc<str>, quantity: Quantity, price_cents: PriceCents) {
        self.symbol = symbol;
        self.quantity = quantity;
        self.price_cents = price_cents;
    }
}
