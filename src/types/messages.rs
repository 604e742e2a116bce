//! FIX 4.4 message kinds and tag numbers.
//!
//! Only the tags needed for NewOrderSingle and OrderCancelRequest are named
//! here; session-level fields (MsgSeqNum, heartbeats, resend) are never
//! produced or interpreted.

/// BeginString value written by the encoder
pub const BEGIN_STRING: &[u8] = b"FIX.4.4";

/// Tag numbers
pub mod tags {
    /// BeginString
    pub const BEGIN_STRING: u32 = 8;
    /// BodyLength
    pub const BODY_LENGTH: u32 = 9;
    /// CheckSum
    pub const CHECKSUM: u32 = 10;
    /// ClOrdID
    pub const CL_ORD_ID: u32 = 11;
    /// MsgType
    pub const MSG_TYPE: u32 = 35;
    /// OrderQty
    pub const ORDER_QTY: u32 = 38;
    /// OrdType
    pub const ORD_TYPE: u32 = 40;
    /// OrigClOrdID
    pub const ORIG_CL_ORD_ID: u32 = 41;
    /// Price
    pub const PRICE: u32 = 44;
    /// SenderCompID
    pub const SENDER_COMP_ID: u32 = 49;
    /// SendingTime
    pub const SENDING_TIME: u32 = 52;
    /// Side
    pub const SIDE: u32 = 54;
    /// Symbol
    pub const SYMBOL: u32 = 55;
    /// TargetCompID
    pub const TARGET_COMP_ID: u32 = 56;
    /// TransactTime
    pub const TRANSACT_TIME: u32 = 60;
}

/// OrdType value for a limit order
pub const ORD_TYPE_LIMIT: u8 = b'2';

/// Message kinds this crate handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgType {
    /// `35=D`
    NewOrderSingle,
    /// `35=F`
    OrderCancelRequest,
}

impl MsgType {
    /// The wire byte for this kind
    pub const fn as_fix_byte(self) -> u8 {
        match self {
            MsgType::NewOrderSingle => b'D',
            MsgType::OrderCancelRequest => b'F',
        }
    }

    /// Map a MsgType value's first byte to a handled kind
    pub const fn from_fix_byte(byte: u8) -> Option<Self> {
        match byte {
            b'D' => Some(MsgType::NewOrderSingle),
            b'F' => Some(MsgType::OrderCancelRequest),
            _ => None,
        }
    }
}
