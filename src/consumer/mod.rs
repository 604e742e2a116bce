//! Queue consumers that maintain an open-order table.
//!
//! - [`flyweight`] - zero-copy scanner on a single (optionally pinned) thread
//! - [`reference`] - full parse into an owned message, applied by sharded workers
//!
//! Both report what each message did as a [`DecodeOutcome`] and aggregate
//! outcomes into [`ConsumerStats`].

pub mod flyweight;
pub mod reference;

use std::ops::AddAssign;

use serde::Serialize;

pub use flyweight::FlyweightConsumer;
pub use reference::ReferenceConsumer;

/// What applying one message did to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeOutcome {
    /// NewOrderSingle stored
    Opened,
    /// OrderCancelRequest removed an open order
    Canceled,
    /// OrderCancelRequest named an order that is not open
    CancelMiss,
    /// No MsgType, or a MsgType this crate does not handle
    Skipped,
    /// Handled MsgType with a required field missing; nothing was changed
    Incomplete,
}

/// Per-outcome message counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumerStats {
    /// Opens applied
    pub opened: u64,
    /// Cancels that removed an order
    pub canceled: u64,
    /// Cancels for unknown orders
    pub cancel_miss: u64,
    /// Messages ignored
    pub skipped: u64,
    /// Messages missing a required field
    pub decode_miss: u64,
}

impl ConsumerStats {
    /// Count one outcome
    #[inline]
    pub fn record(&mut self, outcome: DecodeOutcome) {
        match outcome {
            DecodeOutcome::Opened => self.opened += 1,
            DecodeOutcome::Canceled => self.canceled += 1,
            DecodeOutcome::CancelMiss => self.cancel_miss += 1,
            DecodeOutcome::Skipped => self.skipped += 1,
            DecodeOutcome::Incomplete => self.decode_miss += 1,
        }
    }

    /// All messages counted
    pub fn total(&self) -> u64 {
        self.opened + self.canceled + self.cancel_miss + self.skipped + self.decode_miss
    }
}

impl AddAssign for ConsumerStats {
    fn add_assign(&mut self, rhs: Self) {
        self.opened += rhs.opened;
        self.canceled += rhs.canceled;
        self.cancel_miss += rhs.cancel_miss;
        self.skipped += rhs.skipped;
        self.decode_miss += rhs.decode_miss;
    }
}
