//! # fix-flyweight
//!
//! Zero-copy FIX 4.4 order decoding, benchmarked against a full-parse baseline.
//!
//! ## Features
//!
//! - **Wire codec** - NewOrderSingle / OrderCancelRequest encoder with exact
//!   BodyLength and CheckSum framing, and a single-pass field scanner that
//!   never materializes a message
//! - **Open-order table** - sharded map over a generation-tagged slot arena
//!   with a bounded free list and interned symbols
//! - **Workload generator** - seeded open/cancel stream where every cancel
//!   follows its open within 100 messages
//! - **Latency recording** - HdrHistogram percentiles with optional warm-up skip
//!
//! ## Quick Start
//!
//! ```rust
//! use fix_flyweight::config::{ConsumerConfig, GeneratorConfig};
//! use fix_flyweight::consumer::FlyweightConsumer;
//! use fix_flyweight::generator::WorkloadGenerator;
//!
//! # fn main() -> fix_flyweight::Result<()> {
//! let mut generator = WorkloadGenerator::new(GeneratorConfig::default().with_seed(42))?;
//! let mut messages: Vec<Vec<u8>> = Vec::new();
//! let result = generator.generate(1_000, &mut messages)?;
//!
//! let mut consumer = FlyweightConsumer::new(&ConsumerConfig::new())?;
//! for msg in &messages {
//!     consumer.process_timed(msg);
//! }
//!
//! // Every open was eventually canceled.
//! assert!(consumer.orders().is_empty());
//! assert_eq!(consumer.report().count, result.total_messages);
//! # Ok(())
//! # }
//! ```
//!
//! ## Price Representation
//!
//! Prices are signed integer cents (`12345` is `123.45` on the wire). The
//! decoder is lenient: it never fails, pads short fractions and truncates
//! long ones.
//!
//! ## Architecture
//!
//! - [`codec`] - encoder, scanner and price conversion
//! - [`table`] - open-order table, slot arena, symbol cache
//! - [`generator`] - workload generation
//! - [`consumer`] - zero-copy and full-parse consumers
//! - [`queue`] - file-backed message journal
//! - [`metrics`] - latency recorder and report file
//! - [`config`] - configuration builders
//! - [`telemetry`] - tracing setup
//! - [`error`] - error types for the crate
//!
//! ## Performance
//!
//! - No allocation per decoded message once symbols are interned
//! - Records recycled through a free list instead of reallocated
//! - `FxHashMap` for integer keys, `parking_lot` locks
//! - Consumer thread optionally pinned to one core

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod consumer;
pub mod error;
pub mod generator;
pub mod metrics;
pub mod queue;
pub mod table;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::{ConsumerConfig, GeneratorConfig, ReferenceConfig};
pub use consumer::{DecodeOutcome, FlyweightConsumer, ReferenceConsumer};
pub use error::Error;
pub use generator::{GenerationResult, WorkloadGenerator};
pub use metrics::{LatencyRecorder, LatencyReport};
pub use queue::{MessageQueue, MessageSink};
pub use table::OpenOrders;

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
