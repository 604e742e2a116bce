//! Deterministic open/cancel workload generation.
//!
//! The generator writes NewOrderSingle and OrderCancelRequest messages to a
//! [`MessageSink`] until the requested budget is spent, then cancels every
//! order still pending. Each open schedules its own cancel at most
//! [`CANCEL_WINDOW`] messages later, and no two cancels share a due index,
//! so during the budget phase every cancel lands inside that window. In the
//! last [`CANCEL_WINDOW`] messages of the budget, pending orders are
//! canceled oldest first instead of opening new ones.
//!
//! Everything except SendingTime (52), TransactTime (60) and the framing
//! fields derived from them is a pure function of the seed, the budget and
//! the comp ids.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::info;

use crate::codec::encoder::{MessageEncoder, NewOrderSingle, OrderCancelRequest};
use crate::config::GeneratorConfig;
use crate::error::Error;
use crate::queue::MessageSink;
use crate::types::{OrderId, PriceCents, Side, TimestampNs};

/// Symbols orders are drawn from, uniformly
pub const SYMBOLS: [&str; 5] = ["AAPL", "MSFT", "GOOGL", "AMZN", "META"];

/// Largest distance, in messages, between an open and its scheduled cancel
pub const CANCEL_WINDOW: u64 = 100;

/// Largest distance, in cents, between an order price and its symbol's base price
pub const PRICE_JITTER_CENTS: i64 = 10;

/// Counts describing one generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    /// Messages written, including the final flush
    pub total_messages: u64,
    /// NewOrderSingle messages
    pub nos_count: u64,
    /// OrderCancelRequest messages
    pub cancel_count: u64,
    /// Messages written before the flush of still-pending orders
    pub first_phase_messages: u64,
}

#[derive(Debug, Clone, Copy)]
struct PendingOrder {
    symbol: usize,
    side: Side,
}

/// Per-run state
struct Run<'s, S> {
    sink: &'s mut S,
    rng: StdRng,
    base_prices: [PriceCents; SYMBOLS.len()],
    /// Oldest id first
    pending: BTreeMap<OrderId, PendingOrder>,
    /// (due index, schedule order, id), earliest first
    schedule: BinaryHeap<Reverse<(u64, u64, OrderId)>>,
    claimed: FxHashSet<u64>,
    scheduled: u64,
    produced: u64,
    nos_count: u64,
    cancel_count: u64,
}

/// Workload generator
///
/// # Example
///
/// ```rust
/// use fix_flyweight::config::GeneratorConfig;
/// use fix_flyweight::generator::WorkloadGenerator;
///
/// let mut generator = WorkloadGenerator::new(GeneratorConfig::default().with_seed(7)).unwrap();
/// let mut sink: Vec<Vec<u8>> = Vec::new();
/// let result = generator.generate(500, &mut sink).unwrap();
/// assert_eq!(result.nos_count, result.cancel_count);
/// assert_eq!(result.total_messages as usize, sink.len());
/// ```
#[derive(Debug)]
pub struct WorkloadGenerator {
    config: GeneratorConfig,
    encoder: MessageEncoder,
}

impl WorkloadGenerator {
    /// Create a generator
    pub fn new(config: GeneratorConfig) -> Result<Self, Error> {
        config.validate()?;
        let encoder = MessageEncoder::new(config.sender_comp_id(), config.target_comp_id())?;
        Ok(Self { config, encoder })
    }

    /// Get the configuration
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Write a workload of at least `requested` messages to `sink`
    pub fn generate<S: MessageSink>(
        &mut self,
        requested: u64,
        sink: &mut S,
    ) -> Result<GenerationResult, Error> {
        if requested == 0 {
            return Err(Error::Config("requested message count must be > 0".into()));
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed());
        let mut base_prices = [0; SYMBOLS.len()];
        for base in &mut base_prices {
            let dollars: i64 = 100 + rng.gen_range(0..200);
            let cents: i64 = rng.gen_range(0..100);
            *base = dollars * 100 + cents;
        }

        let mut run = Run {
            sink,
            rng,
            base_prices,
            pending: BTreeMap::new(),
            schedule: BinaryHeap::new(),
            claimed: FxHashSet::default(),
            scheduled: 0,
            produced: 0,
            nos_count: 0,
            cancel_count: 0,
        };

        while run.produced < requested {
            if let Some(&Reverse((due, _, id))) = run.schedule.peek() {
                if due <= run.produced {
                    run.schedule.pop();
                    run.claimed.remove(&due);
                    // Already canceled by the end-of-budget sweep.
                    if let Some(order) = run.pending.remove(&id) {
                        run.cancel(&mut self.encoder, id, order)?;
                    }
                    continue;
                }
            }

            if requested - run.produced <= CANCEL_WINDOW {
                if let Some((id, order)) = run.pending.pop_first() {
                    run.cancel(&mut self.encoder, id, order)?;
                    continue;
                }
            }

            run.open(&mut self.encoder)?;
        }

        let first_phase_messages = run.produced;
        while let Some((id, order)) = run.pending.pop_first() {
            run.cancel(&mut self.encoder, id, order)?;
        }

        let result = GenerationResult {
            total_messages: run.produced,
            nos_count: run.nos_count,
            cancel_count: run.cancel_count,
            first_phase_messages,
        };
        info!(
            requested,
            total = result.total_messages,
            nos = result.nos_count,
            cancels = result.cancel_count,
            first_phase = result.first_phase_messages,
            "workload generated"
        );
        Ok(result)
    }
}

impl<S: MessageSink> Run<'_, S> {
    fn open(&mut self, encoder: &mut MessageEncoder) -> Result<(), Error> {
        let symbol = self.rng.gen_range(0..SYMBOLS.len());
        let side = if self.rng.gen_bool(0.5) {
            Side::Buy
        } else {
            Side::Sell
        };
        let quantity = (self.rng.gen_range(0..10u32) + 1) * 100;
        let offset = self.rng.gen_range(0..=2 * PRICE_JITTER_CENTS) - PRICE_JITTER_CENTS;

        let id = (self.nos_count + 1) as OrderId;
        let msg = encoder.encode_new_order(&NewOrderSingle {
            cl_ord_id: id,
            symbol: SYMBOLS[symbol],
            side,
            quantity,
            price_cents: self.base_prices[symbol] + offset,
            transact_time_ns: now_nanos(),
        })?;
        self.sink.append(msg)?;

        let index = self.produced;
        self.nos_count += 1;
        self.produced += 1;
        self.pending.insert(id, PendingOrder { symbol, side });

        let drawn = index + 1 + self.rng.gen_range(0..CANCEL_WINDOW);
        let due = self.claim_due(index, drawn);
        self.schedule.push(Reverse((due, self.scheduled, id)));
        self.scheduled += 1;
        Ok(())
    }

    fn cancel(
        &mut self,
        encoder: &mut MessageEncoder,
        orig_id: OrderId,
        order: PendingOrder,
    ) -> Result<(), Error> {
        let msg = encoder.encode_cancel(&OrderCancelRequest {
            cl_ord_id: (self.cancel_count + 1) as OrderId,
            orig_cl_ord_id: orig_id,
            symbol: SYMBOLS[order.symbol],
            side: order.side,
            transact_time_ns: now_nanos(),
        })?;
        self.sink.append(msg)?;
        self.cancel_count += 1;
        self.produced += 1;
        Ok(())
    }

    /// First free due index at or below `drawn`, else the first free one above it
    fn claim_due(&mut self, index: u64, drawn: u64) -> u64 {
        let due = (index + 1..=drawn)
            .rev()
            .find(|d| !self.claimed.contains(d))
            .or_else(|| (drawn + 1..).find(|d| !self.claimed.contains(d)))
            .unwrap_or(drawn);
        self.claimed.insert(due);
        due
    }
}

fn now_nanos() -> TimestampNs {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as TimestampNs)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(seed: u64, count: u64) -> (GenerationResult, Vec<Vec<u8>>) {
        let mut generator =
            WorkloadGenerator::new(GeneratorConfig::new("SND", "TGT").with_seed(seed)).unwrap();
        let mut sink = Vec::new();
        let result = generator.generate(count, &mut sink).unwrap();
        (result, sink)
    }

    #[test]
    fn test_counts_add_up() {
        let (result, sink) = run(1, 1_000);
        assert_eq!(result.nos_count + result.cancel_count, result.total_messages);
        assert_eq!(result.nos_count, result.cancel_count);
        assert!(result.total_messages >= 1_000);
        assert_eq!(result.first_phase_messages, 1_000);
        assert_eq!(sink.len() as u64, result.total_messages);
    }

    #[test]
    fn test_zero_budget_rejected() {
        let mut generator = WorkloadGenerator::new(GeneratorConfig::default()).unwrap();
        let mut sink: Vec<Vec<u8>> = Vec::new();
        assert!(matches!(
            generator.generate(0, &mut sink),
            Err(Error::Config(_))
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_tiny_budget() {
        // One open, then the flush cancels it.
        let (result, sink) = run(3, 1);
        assert_eq!(result.nos_count, 1);
        assert_eq!(result.cancel_count, 1);
        assert_eq!(result.first_phase_messages, 1);
        assert!(sink[0].windows(5).any(|w| w == b"\x0135=D"));
        assert!(sink[1].windows(5).any(|w| w == b"\x0135=F"));
    }

    #[test]
    fn test_claim_due_prefers_earlier_free_index() {
        let mut sink: Vec<Vec<u8>> = Vec::new();
        let mut run = Run {
            sink: &mut sink,
            rng: StdRng::seed_from_u64(0),
            base_prices: [0; SYMBOLS.len()],
            pending: BTreeMap::new(),
            schedule: BinaryHeap::new(),
            claimed: FxHashSet::default(),
            scheduled: 0,
            produced: 0,
            nos_count: 0,
            cancel_count: 0,
        };
        assert_eq!(run.claim_due(0, 5), 5);
        assert_eq!(run.claim_due(1, 5), 4);
        assert_eq!(run.claim_due(2, 3), 3);
        // Window (3, 4] is full, so move past it.
        assert_eq!(run.claim_due(3, 4), 6);
    }

    #[test]
    fn test_rejects_bad_comp_id() {
        assert!(WorkloadGenerator::new(GeneratorConfig::new("", "TGT")).is_err());
    }
}
