//! FIX 4.4 message assembly with exact BodyLength and CheckSum framing.
//!
//! The body (everything from `35=` through the last business field) is
//! serialized once into a scratch buffer, its byte length becomes
//! BodyLength (9), and then header, body and trailer are written into the
//! output buffer in one final pass. CheckSum (10) is the byte sum of that
//! output modulo 256, rendered as exactly three digits.
//!
//! Session fields (MsgSeqNum and friends) are never written.

use std::io::Write;

use chrono::{DateTime, Utc};

use crate::codec::price;
use crate::error::Error;
use crate::types::messages::{tags, BEGIN_STRING, ORD_TYPE_LIMIT};
use crate::types::{MsgType, OrderId, PriceCents, Quantity, Side, TimestampNs, SOH};

/// SendingTime (52) layout: `yyyyMMdd-HH:mm:ss.SSS`
const SENDING_TIME_FORMAT: &str = "%Y%m%d-%H:%M:%S%.3f";

/// Fields of a NewOrderSingle (`35=D`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderSingle<'a> {
    /// ClOrdID (11)
    pub cl_ord_id: OrderId,
    /// Symbol (55)
    pub symbol: &'a str,
    /// Side (54)
    pub side: Side,
    /// OrderQty (38)
    pub quantity: Quantity,
    /// Price (44) in cents
    pub price_cents: PriceCents,
    /// TransactTime (60), caller-supplied nanoseconds
    pub transact_time_ns: TimestampNs,
}

/// Fields of an OrderCancelRequest (`35=F`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderCancelRequest<'a> {
    /// ClOrdID (11) of the cancel itself
    pub cl_ord_id: OrderId,
    /// OrigClOrdID (41) of the order being canceled
    pub orig_cl_ord_id: OrderId,
    /// Symbol (55)
    pub symbol: &'a str,
    /// Side (54)
    pub side: Side,
    /// TransactTime (60), caller-supplied nanoseconds
    pub transact_time_ns: TimestampNs,
}

/// Builds framed messages for one sender/target pair.
///
/// Buffers are owned by the encoder and reused; each `encode_*` call returns
/// a slice that is valid until the next call.
///
/// # Example
///
/// ```rust
/// use fix_flyweight::codec::encoder::{self, MessageEncoder, OrderCancelRequest};
/// use fix_flyweight::types::Side;
///
/// let mut enc = MessageEncoder::new("SND", "TGT").unwrap();
/// let msg = enc
///     .encode_cancel(&OrderCancelRequest {
///         cl_ord_id: 2,
///         orig_cl_ord_id: 1,
///         symbol: "AAPL",
///         side: Side::Buy,
///         transact_time_ns: 0,
///     })
///     .unwrap();
/// assert!(msg.starts_with(b"8=FIX.4.4\x019="));
/// assert!(encoder::verify_framing(msg));
/// ```
#[derive(Debug, Clone)]
pub struct MessageEncoder {
    sender_comp_id: String,
    target_comp_id: String,
    body: Vec<u8>,
    out: Vec<u8>,
}

impl MessageEncoder {
    /// Create an encoder; comp ids must be non-empty and SOH-free
    pub fn new(
        sender_comp_id: impl Into<String>,
        target_comp_id: impl Into<String>,
    ) -> Result<Self, Error> {
        let sender_comp_id = sender_comp_id.into();
        let target_comp_id = target_comp_id.into();
        check_text("SenderCompID", &sender_comp_id)?;
        check_text("TargetCompID", &target_comp_id)?;
        Ok(Self {
            sender_comp_id,
            target_comp_id,
            body: Vec::with_capacity(128),
            out: Vec::with_capacity(160),
        })
    }

    /// Encode a NewOrderSingle stamped with the current UTC time
    pub fn encode_new_order(&mut self, order: &NewOrderSingle<'_>) -> Result<&[u8], Error> {
        self.encode_new_order_at(order, Utc::now())
    }

    /// Encode a NewOrderSingle with an explicit SendingTime
    pub fn encode_new_order_at(
        &mut self,
        order: &NewOrderSingle<'_>,
        sending_time: DateTime<Utc>,
    ) -> Result<&[u8], Error> {
        check_text("Symbol", order.symbol)?;
        self.begin_body(MsgType::NewOrderSingle, sending_time)?;

        let mut num = itoa::Buffer::new();
        let body = &mut self.body;
        push_field(body, tags::CL_ORD_ID, num.format(order.cl_ord_id).as_bytes());
        push_field(body, tags::SYMBOL, order.symbol.as_bytes());
        push_field(body, tags::SIDE, &[order.side.as_fix_byte()]);
        push_field(body, tags::ORDER_QTY, num.format(order.quantity).as_bytes());
        push_field(body, tags::ORD_TYPE, &[ORD_TYPE_LIMIT]);
        push_tag(body, tags::PRICE);
        price::encode_into(order.price_cents, body);
        body.push(SOH);
        push_field(
            body,
            tags::TRANSACT_TIME,
            num.format(order.transact_time_ns).as_bytes(),
        );

        Ok(self.finish())
    }

    /// Encode an OrderCancelRequest stamped with the current UTC time
    pub fn encode_cancel(&mut self, cancel: &OrderCancelRequest<'_>) -> Result<&[u8], Error> {
        self.encode_cancel_at(cancel, Utc::now())
    }

    /// Encode an OrderCancelRequest with an explicit SendingTime
    pub fn encode_cancel_at(
        &mut self,
        cancel: &OrderCancelRequest<'_>,
        sending_time: DateTime<Utc>,
    ) -> Result<&[u8], Error> {
        check_text("Symbol", cancel.symbol)?;
        self.begin_body(MsgType::OrderCancelRequest, sending_time)?;

        let mut num = itoa::Buffer::new();
        let body = &mut self.body;
        push_field(body, tags::CL_ORD_ID, num.format(cancel.cl_ord_id).as_bytes());
        push_field(
            body,
            tags::ORIG_CL_ORD_ID,
            num.format(cancel.orig_cl_ord_id).as_bytes(),
        );
        push_field(body, tags::SYMBOL, cancel.symbol.as_bytes());
        push_field(body, tags::SIDE, &[cancel.side.as_fix_byte()]);
        push_field(
            body,
            tags::TRANSACT_TIME,
            num.format(cancel.transact_time_ns).as_bytes(),
        );

        Ok(self.finish())
    }

    /// Standard header fields that live inside the body count
    fn begin_body(&mut self, kind: MsgType, sending_time: DateTime<Utc>) -> Result<(), Error> {
        let body = &mut self.body;
        body.clear();
        push_field(body, tags::MSG_TYPE, &[kind.as_fix_byte()]);
        push_field(body, tags::SENDER_COMP_ID, self.sender_comp_id.as_bytes());
        push_field(body, tags::TARGET_COMP_ID, self.target_comp_id.as_bytes());
        push_tag(body, tags::SENDING_TIME);
        write!(body, "{}", sending_time.format(SENDING_TIME_FORMAT))?;
        body.push(SOH);
        Ok(())
    }

    /// Frame the finished body: BeginString, BodyLength, body, CheckSum
    fn finish(&mut self) -> &[u8] {
        let out = &mut self.out;
        out.clear();
        push_field(out, tags::BEGIN_STRING, BEGIN_STRING);
        let mut num = itoa::Buffer::new();
        push_field(out, tags::BODY_LENGTH, num.format(self.body.len()).as_bytes());
        out.extend_from_slice(&self.body);

        let sum = checksum(out);
        push_field(
            out,
            tags::CHECKSUM,
            &[b'0' + sum / 100, b'0' + (sum / 10) % 10, b'0' + sum % 10],
        );
        out
    }
}

/// Byte sum modulo 256
#[inline]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Check the framing of one message: `8=FIX.4.4` header, a BodyLength that
/// matches the bytes between its terminator and the `10=` tag, and a
/// CheckSum equal to the byte sum of everything before it.
pub fn verify_framing(msg: &[u8]) -> bool {
    const HEADER: &[u8] = b"8=FIX.4.4\x019=";
    let Some(rest) = msg.strip_prefix(HEADER) else {
        return false;
    };
    let Some(len_end) = rest.iter().position(|&b| b == SOH) else {
        return false;
    };
    let Some(body_len) = std::str::from_utf8(&rest[..len_end])
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
    else {
        return false;
    };

    let body_start = HEADER.len() + len_end + 1;
    let Some(trailer_start) = body_start.checked_add(body_len) else {
        return false;
    };
    // "10=" + three digits + SOH
    if msg.len().checked_sub(7) != Some(trailer_start)
        || &msg[trailer_start..trailer_start + 3] != b"10="
    {
        return false;
    }
    if msg[msg.len() - 1] != SOH {
        return false;
    }
    let digits = &msg[trailer_start + 3..trailer_start + 6];
    if !digits.iter().all(u8::is_ascii_digit) {
        return false;
    }
    let stated = digits
        .iter()
        .fold(0u32, |acc, &d| acc * 10 + u32::from(d - b'0'));
    stated == u32::from(checksum(&msg[..trailer_start]))
}

fn check_text(name: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() || value.as_bytes().contains(&SOH) {
        return Err(Error::Encode(format!("{name} must be non-empty and SOH-free")));
    }
    Ok(())
}

#[inline]
fn push_tag(out: &mut Vec<u8>, tag: u32) {
    let mut num = itoa::Buffer::new();
    out.extend_from_slice(num.format(tag).as_bytes());
    out.push(b'=');
}

#[inline]
fn push_field(out: &mut Vec<u8>, tag: u32, value: &[u8]) {
    push_tag(out, tag);
    out.extend_from_slice(value);
    out.push(SOH);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 7).unwrap()
            + chrono::Duration::milliseconds(42)
    }

    fn as_text(msg: &[u8]) -> String {
        String::from_utf8(msg.to_vec()).unwrap().replace('\u{1}', "|")
    }

    #[test]
    fn test_new_order_layout() {
        let mut enc = MessageEncoder::new("SND", "TGT").unwrap();
        let msg = enc
            .encode_new_order_at(
                &NewOrderSingle {
                    cl_ord_id: 1,
                    symbol: "AAPL",
                    side: Side::Buy,
                    quantity: 100,
                    price_cents: 12345,
                    transact_time_ns: 987,
                },
                fixed_time(),
            )
            .unwrap()
            .to_vec();

        let body = "35=D|49=SND|56=TGT|52=20240305-14:30:07.042|11=1|55=AAPL|54=1|38=100|40=2|44=123.45|60=987|";
        let text = as_text(&msg);
        assert!(text.starts_with(&format!("8=FIX.4.4|9={}|{}", body.len(), body)));
        assert!(verify_framing(&msg));
    }

    #[test]
    fn test_cancel_layout() {
        let mut enc = MessageEncoder::new("SND", "TGT").unwrap();
        let msg = enc
            .encode_cancel_at(
                &OrderCancelRequest {
                    cl_ord_id: 3,
                    orig_cl_ord_id: 1,
                    symbol: "MSFT",
                    side: Side::Sell,
                    transact_time_ns: 5,
                },
                fixed_time(),
            )
            .unwrap()
            .to_vec();

        let text = as_text(&msg);
        assert!(text.contains("|35=F|"));
        assert!(text.contains("|11=3|41=1|55=MSFT|54=2|60=5|10="));
        assert!(text.ends_with('|'));
        assert!(verify_framing(&msg));
    }

    #[test]
    fn test_checksum_matches_byte_sum() {
        let mut enc = MessageEncoder::new("S", "T").unwrap();
        let msg = enc
            .encode_new_order_at(
                &NewOrderSingle {
                    cl_ord_id: 77,
                    symbol: "GOOGL",
                    side: Side::Sell,
                    quantity: 1000,
                    price_cents: -250,
                    transact_time_ns: u64::MAX,
                },
                fixed_time(),
            )
            .unwrap()
            .to_vec();

        let pos = msg.windows(4).rposition(|w| w == b"\x0110=").unwrap() + 1;
        let expected: u32 = msg[..pos].iter().map(|&b| u32::from(b)).sum::<u32>() % 256;
        let stated: u32 = std::str::from_utf8(&msg[pos + 3..pos + 6]).unwrap().parse().unwrap();
        assert_eq!(stated, expected);
        assert!(as_text(&msg).contains("|44=-2.50|"));
    }

    #[test]
    fn test_rejects_bad_text() {
        assert!(MessageEncoder::new("", "TGT").is_err());
        let mut enc = MessageEncoder::new("SND", "TGT").unwrap();
        let err = enc.encode_cancel(&OrderCancelRequest {
            cl_ord_id: 1,
            orig_cl_ord_id: 1,
            symbol: "BAD\u{1}SYM",
            side: Side::Buy,
            transact_time_ns: 0,
        });
        assert!(matches!(err, Err(Error::Encode(_))));
    }

    #[test]
    fn test_verify_framing_detects_corruption() {
        let mut enc = MessageEncoder::new("SND", "TGT").unwrap();
        let mut msg = enc
            .encode_cancel(&OrderCancelRequest {
                cl_ord_id: 1,
                orig_cl_ord_id: 1,
                symbol: "META",
                side: Side::Buy,
                transact_time_ns: 1,
            })
            .unwrap()
            .to_vec();
        assert!(verify_framing(&msg));

        let idx = msg.iter().position(|&b| b == b'M').unwrap();
        msg[idx] = b'N';
        assert!(!verify_framing(&msg));
    }
}
