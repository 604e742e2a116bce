//! Shared types for orders and FIX messages.
//!
//! - [`order`] - Order side and the pooled order record
//! - [`messages`] - FIX message kinds and the tag numbers this crate reads or writes

pub mod messages;
pub mod order;

pub use messages::MsgType;
pub use order::{Order, Side};

/// Price in integer cents (signed)
///
/// `12345` is `123.45` on the wire. Using integers instead of floating point
/// keeps decode exact and comparisons cheap.
pub type PriceCents = i64;

/// Order quantity in shares
pub type Quantity = u32;

/// Client order identifier as parsed from ClOrdID (11) / OrigClOrdID (41)
pub type OrderId = i64;

/// Nanosecond timestamp written to TransactTime (60)
pub type TimestampNs = u64;

/// FIX field terminator
pub const SOH: u8 = 0x01;
