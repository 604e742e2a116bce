//! Fixed-point price conversion between FIX text and integer cents.
//!
//! Decoding is deliberately lenient: bytes other than digits, `.` and `-`
//! are skipped, extra fractional digits are truncated, and a short fraction
//! is right-padded (`.5` is 50 cents). Arithmetic wraps, so hostile input
//! can produce a nonsense value but never a panic.

use crate::types::PriceCents;

/// Decode a textual price into cents.
///
/// # Example
///
/// ```rust
/// use fix_flyweight::codec::price::decode;
///
/// assert_eq!(decode(b"123.45"), 12345);
/// assert_eq!(decode(b"-0.5"), -50);
/// assert_eq!(decode(b"7"), 700);
/// assert_eq!(decode(b"1.239"), 123);
/// ```
#[inline]
pub fn decode(bytes: &[u8]) -> PriceCents {
    let mut units: u64 = 0;
    let mut hundredths: u64 = 0;
    let mut frac_digits = 0u32;
    let mut in_frac = false;
    let mut negative = false;

    for &b in bytes {
        match b {
            b'-' => negative = true,
            b'.' => in_frac = true,
            b'0'..=b'9' => {
                let d = u64::from(b - b'0');
                if !in_frac {
                    units = units.wrapping_mul(10).wrapping_add(d);
                } else if frac_digits < 2 {
                    hundredths = hundredths * 10 + d;
                    frac_digits += 1;
                }
            }
            _ => {}
        }
    }
    while frac_digits < 2 {
        hundredths *= 10;
        frac_digits += 1;
    }

    let total = units.wrapping_mul(100).wrapping_add(hundredths) as i64;
    if negative {
        total.wrapping_neg()
    } else {
        total
    }
}

/// Append the textual form of `cents` to `out`: exactly two fractional
/// digits, a leading `-` for negative values, nothing else.
///
/// # Example
///
/// ```rust
/// use fix_flyweight::codec::price::encode_into;
///
/// let mut out = Vec::new();
/// encode_into(-5, &mut out);
/// assert_eq!(out, b"-0.05");
/// ```
#[inline]
pub fn encode_into(cents: PriceCents, out: &mut Vec<u8>) {
    let abs = cents.unsigned_abs();
    if cents < 0 {
        out.push(b'-');
    }
    let mut buf = itoa::Buffer::new();
    out.extend_from_slice(buf.format(abs / 100).as_bytes());
    let rem = (abs % 100) as u8;
    out.extend_from_slice(&[b'.', b'0' + rem / 10, b'0' + rem % 10]);
}

/// Encode `cents` into a fresh `String`
pub fn encode(cents: PriceCents) -> String {
    let mut out = Vec::with_capacity(24);
    encode_into(cents, &mut out);
    // Only ASCII digits, '-' and '.' are ever written.
    String::from_utf8(out).unwrap_or_default()
}
