//! Single-pass field extraction from raw FIX bytes.
//!
//! [`FieldScanner`] walks a message once, left to right, and pulls out the
//! six fields the open-order table needs: MsgType (35), ClOrdID (11),
//! OrigClOrdID (41), Symbol (55), OrderQty (38) and Price (44). Nothing is
//! materialized: identifiers and quantity are parsed to integers as they are
//! passed, and the symbol and price are kept as spans into the caller's
//! buffer. The scan stops as soon as every field required by the already
//! seen message kind is present, so trailing fields (TransactTime, CheckSum)
//! are usually never touched.
//!
//! Malformed fields are skipped, never reported as errors. The caller gets a
//! [`Scan`] describing what was found and decides what to do with it.

use std::ops::Range;

use crate::codec::price;
use crate::types::messages::tags;
use crate::types::{MsgType, OrderId, PriceCents, Quantity, SOH};

/// Fields of a NewOrderSingle, borrowing the symbol from the scanned buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderView<'a> {
    /// ClOrdID (11)
    pub cl_ord_id: OrderId,
    /// Symbol (55)
    pub symbol: &'a str,
    /// OrderQty (38)
    pub quantity: Quantity,
    /// Price (44) in cents
    pub price_cents: PriceCents,
}

/// Result of scanning one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan<'a> {
    /// A complete NewOrderSingle
    NewOrder(NewOrderView<'a>),
    /// A complete OrderCancelRequest
    Cancel {
        /// OrigClOrdID (41): the order being canceled
        orig_cl_ord_id: OrderId,
    },
    /// No MsgType field at all (administrative or foreign content)
    NoMsgType,
    /// A MsgType this crate does not handle
    Unhandled(u8),
    /// A handled MsgType with a required field missing or unusable
    Incomplete(MsgType),
}

/// Per-message scratch. Reset, never reallocated.
#[derive(Debug, Default, Clone)]
struct ScanState {
    msg_type: Option<u8>,
    cl_ord_id: Option<OrderId>,
    orig_cl_ord_id: Option<OrderId>,
    quantity: Option<Quantity>,
    symbol: Option<Range<usize>>,
    price: Option<Range<usize>>,
}

impl ScanState {
    #[inline]
    fn reset(&mut self) {
        self.msg_type = None;
        self.cl_ord_id = None;
        self.orig_cl_ord_id = None;
        self.quantity = None;
        self.symbol = None;
        self.price = None;
    }

    /// True once nothing further in the message can change the outcome
    #[inline]
    fn is_complete(&self) -> bool {
        match self.msg_type {
            None => false,
            Some(b'D') => {
                self.cl_ord_id.is_some()
                    && self.symbol.is_some()
                    && self.quantity.is_some()
                    && self.price.is_some()
            }
            Some(b'F') => self.orig_cl_ord_id.is_some(),
            Some(_) => true,
        }
    }

    /// Record a field value. The first occurrence of a tag wins.
    #[inline]
    fn store(&mut self, tag: u32, value: Range<usize>, bytes: &[u8]) {
        let v = &bytes[value.clone()];
        match tag {
            tags::MSG_TYPE if self.msg_type.is_none() => self.msg_type = v.first().copied(),
            tags::CL_ORD_ID if self.cl_ord_id.is_none() => self.cl_ord_id = Some(parse_id(v)),
            tags::ORIG_CL_ORD_ID if self.orig_cl_ord_id.is_none() => {
                self.orig_cl_ord_id = Some(parse_id(v));
            }
            tags::ORDER_QTY if self.quantity.is_none() => {
                self.quantity = Some(parse_quantity(v));
            }
            tags::SYMBOL if self.symbol.is_none() => self.symbol = Some(value),
            tags::PRICE if self.price.is_none() => self.price = Some(value),
            _ => {}
        }
    }

    fn finish<'a>(&self, bytes: &'a [u8]) -> Scan<'a> {
        let Some(kind) = self.msg_type else {
            return Scan::NoMsgType;
        };
        match MsgType::from_fix_byte(kind) {
            Some(MsgType::NewOrderSingle) => {
                let (Some(cl_ord_id), Some(symbol), Some(quantity), Some(price)) = (
                    self.cl_ord_id,
                    self.symbol.clone(),
                    self.quantity,
                    self.price.clone(),
                ) else {
                    return Scan::Incomplete(MsgType::NewOrderSingle);
                };
                let Ok(symbol) = std::str::from_utf8(&bytes[symbol]) else {
                    return Scan::Incomplete(MsgType::NewOrderSingle);
                };
                Scan::NewOrder(NewOrderView {
                    cl_ord_id,
                    symbol,
                    quantity,
                    price_cents: price::decode(&bytes[price]),
                })
            }
            Some(MsgType::OrderCancelRequest) => match self.orig_cl_ord_id {
                Some(orig_cl_ord_id) => Scan::Cancel { orig_cl_ord_id },
                None => Scan::Incomplete(MsgType::OrderCancelRequest),
            },
            None => Scan::Unhandled(kind),
        }
    }
}

/// Reusable zero-copy scanner.
///
/// # Example
///
/// ```rust
/// use fix_flyweight::codec::scanner::{FieldScanner, Scan};
///
/// let msg = b"8=FIX.4.4\x019=5\x0135=F\x0141=7\x0110=000\x01";
/// let mut scanner = FieldScanner::new();
/// assert_eq!(scanner.scan(msg), Scan::Cancel { orig_cl_ord_id: 7 });
/// ```
#[derive(Debug, Default, Clone)]
pub struct FieldScanner {
    state: ScanState,
    examined: usize,
}

impl FieldScanner {
    /// Create a scanner
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one complete message held in `bytes`
    pub fn scan<'a>(&mut self, bytes: &'a [u8]) -> Scan<'a> {
        self.state.reset();
        let len = bytes.len();
        self.examined = len;
        let mut i = 0;

        while i < len {
            let mut tag: u32 = 0;
            let mut has_digit = false;
            let mut j = i;
            while j < len {
                let b = bytes[j];
                if b == b'=' || !b.is_ascii_digit() {
                    break;
                }
                tag = tag.wrapping_mul(10).wrapping_add(u32::from(b - b'0'));
                has_digit = true;
                j += 1;
            }

            if j >= len {
                // Trailing tag with no '='.
                break;
            }
            if bytes[j] != b'=' || !has_digit {
                i = next_field(bytes, j);
                continue;
            }

            let value_start = j + 1;
            let value_end = find_soh(bytes, value_start);
            self.state.store(tag, value_start..value_end, bytes);
            if self.state.is_complete() {
                self.examined = (value_end + 1).min(len);
                break;
            }
            i = value_end + 1;
        }

        self.state.finish(bytes)
    }

    /// Bytes of the last scanned message that were read before the scan
    /// stopped, including the terminator of the last field read
    pub fn examined(&self) -> usize {
        self.examined
    }
}

/// Index of the next SOH at or after `from`, or `bytes.len()`
#[inline]
fn find_soh(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == SOH)
        .map_or(bytes.len(), |p| from + p)
}

/// Start of the field after the one containing `from`
#[inline]
fn next_field(bytes: &[u8], from: usize) -> usize {
    find_soh(bytes, from) + 1
}

/// Optional leading '-', then digits up to the first non-digit
#[inline]
fn parse_id(v: &[u8]) -> OrderId {
    let (negative, digits) = match v.split_first() {
        Some((&b'-', rest)) => (true, rest),
        _ => (false, v),
    };
    let mut n: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            break;
        }
        n = n.wrapping_mul(10).wrapping_add(i64::from(b - b'0'));
    }
    if negative {
        n.wrapping_neg()
    } else {
        n
    }
}

/// Digits only; anything else is ignored and an empty value is 0
#[inline]
fn parse_quantity(v: &[u8]) -> Quantity {
    v.iter()
        .filter(|b| b.is_ascii_digit())
        .fold(0u32, |acc, &b| acc.wrapping_mul(10).wrapping_add(u32::from(b - b'0')))
}
