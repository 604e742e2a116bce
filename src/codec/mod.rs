//! FIX 4.4 wire codec.
//!
//! # Modules
//!
//! - [`encoder`]: framed message assembly for NewOrderSingle and
//!   OrderCancelRequest
//! - [`scanner`]: zero-copy single-pass field extraction
//! - [`price`]: fixed-point price text to integer cents and back

pub mod encoder;
pub mod price;
pub mod scanner;

pub use encoder::{MessageEncoder, NewOrderSingle, OrderCancelRequest};
pub use scanner::{FieldScanner, NewOrderView, Scan};
