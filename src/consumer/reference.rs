//! Full-parse baseline consumer.
//!
//! Every payload is first materialized into a [`ParsedMessage`] that owns
//! each tag/value pair, the way a general-purpose FIX engine would hand it
//! over. The reader routes the parsed message by a stable hash of its key
//! (ClOrdID for opens, OrigClOrdID for cancels) to one of N sequential
//! worker tasks, so every message touching one order is applied in arrival
//! order on the same worker. Workers share one [`OpenOrders`] and one
//! [`LatencyRecorder`]; only the apply step is timed.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::codec::price;
use crate::config::ReferenceConfig;
use crate::error::Error;
use crate::metrics::{LatencyRecorder, LatencyReport};
use crate::queue::MessageQueue;
use crate::table::{partition, OpenOrders};
use crate::types::messages::tags;
use crate::types::{MsgType, OrderId, SOH};

use super::{ConsumerStats, DecodeOutcome};

/// Field-by-number access to a parsed message
pub trait FieldAccess {
    /// Value of the first occurrence of `tag`
    fn field_str(&self, tag: u32) -> Option<&str>;

    /// Value of `tag` parsed as a signed integer
    fn field_i64(&self, tag: u32) -> Option<i64> {
        self.field_str(tag)?.parse().ok()
    }

    /// First byte of MsgType (35)
    fn msg_type(&self) -> Option<u8> {
        self.field_str(tags::MSG_TYPE)?.bytes().next()
    }
}

/// A message with every field copied out of the wire buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    fields: Vec<(u32, String)>,
}

impl ParsedMessage {
    /// Parse a complete message.
    ///
    /// Returns `None` unless the message starts with BeginString (8), ends
    /// with a CheckSum (10) field and every field is a numeric tag with a
    /// UTF-8 value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fix_flyweight::consumer::reference::{FieldAccess, ParsedMessage};
    ///
    /// let msg = ParsedMessage::parse(b"8=FIX.4.4\x0135=F\x0141=12\x0110=000\x01").unwrap();
    /// assert_eq!(msg.msg_type(), Some(b'F'));
    /// assert_eq!(msg.field_i64(41), Some(12));
    /// assert!(ParsedMessage::parse(b"35=F\x0141=12\x01").is_none());
    /// ```
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let mut fields = Vec::with_capacity(16);
        for raw in bytes.split(|&b| b == SOH).filter(|f| !f.is_empty()) {
            let eq = raw.iter().position(|&b| b == b'=')?;
            let tag: u32 = std::str::from_utf8(&raw[..eq]).ok()?.parse().ok()?;
            let value = std::str::from_utf8(&raw[eq + 1..]).ok()?.to_owned();
            fields.push((tag, value));
        }

        let starts_ok = fields.first().is_some_and(|(tag, _)| *tag == tags::BEGIN_STRING);
        let ends_ok = fields.last().is_some_and(|(tag, _)| *tag == tags::CHECKSUM);
        (starts_ok && ends_ok).then_some(Self { fields })
    }

    /// All fields in wire order
    pub fn fields(&self) -> &[(u32, String)] {
        &self.fields
    }

    /// Identifier this message must be routed by, if it is a handled kind
    pub fn routing_key(&self) -> Option<OrderId> {
        match self.msg_type().and_then(MsgType::from_fix_byte)? {
            MsgType::NewOrderSingle => self.field_i64(tags::CL_ORD_ID),
            MsgType::OrderCancelRequest => self.field_i64(tags::ORIG_CL_ORD_ID),
        }
    }
}

impl FieldAccess for ParsedMessage {
    fn field_str(&self, tag: u32) -> Option<&str> {
        self.fields
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, v)| v.as_str())
    }
}

/// Apply one parsed message to `orders` through the accessor contract
pub fn apply_parsed(msg: &impl FieldAccess, orders: &OpenOrders) -> DecodeOutcome {
    let Some(kind) = msg.msg_type().and_then(MsgType::from_fix_byte) else {
        return DecodeOutcome::Skipped;
    };

    match kind {
        MsgType::NewOrderSingle => {
            let fields = (
                msg.field_i64(tags::CL_ORD_ID),
                msg.field_str(tags::SYMBOL),
                msg.field_i64(tags::ORDER_QTY)
                    .and_then(|q| u32::try_from(q).ok()),
                msg.field_str(tags::PRICE),
            );
            let (Some(id), Some(symbol), Some(quantity), Some(price)) = fields else {
                return DecodeOutcome::Incomplete;
            };
            orders.open(id, symbol, quantity, price::decode(price.as_bytes()));
            DecodeOutcome::Opened
        }
        MsgType::OrderCancelRequest => match msg.field_i64(tags::ORIG_CL_ORD_ID) {
            Some(orig) if orders.cancel(orig) => DecodeOutcome::Canceled,
            Some(_) => DecodeOutcome::CancelMiss,
            None => DecodeOutcome::Incomplete,
        },
    }
}

/// Sharded full-parse consumer. Must be started inside a tokio runtime.
#[derive(Debug)]
pub struct ReferenceConsumer {
    senders: Vec<mpsc::UnboundedSender<ParsedMessage>>,
    workers: Vec<JoinHandle<ConsumerStats>>,
    orders: Arc<OpenOrders>,
    recorder: Arc<LatencyRecorder>,
    config: ReferenceConfig,
    rejected: u64,
    unrouted: u64,
}

impl ReferenceConsumer {
    /// Spawn the worker tasks
    pub fn start(config: ReferenceConfig) -> Result<Self, Error> {
        config.validate()?;
        let table = config.table();
        let orders = Arc::new(OpenOrders::with_config(table));
        let recorder = Arc::new(LatencyRecorder::with_bounds(
            config.warmup_skip(),
            table.histogram_max_ns(),
            table.significant_digits(),
        )?);

        let mut senders = Vec::with_capacity(config.workers());
        let mut workers = Vec::with_capacity(config.workers());
        for worker in 0..config.workers() {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            workers.push(tokio::spawn(run_worker(
                worker,
                rx,
                Arc::clone(&orders),
                Arc::clone(&recorder),
            )));
        }
        info!(workers = config.workers(), "reference consumer started");

        Ok(Self {
            senders,
            workers,
            orders,
            recorder,
            config,
            rejected: 0,
            unrouted: 0,
        })
    }

    /// Parse one payload and hand it to its worker. Returns `false` if it was dropped.
    pub fn submit(&mut self, bytes: &[u8]) -> bool {
        let Some(msg) = ParsedMessage::parse(bytes) else {
            self.rejected += 1;
            debug!(len = bytes.len(), "reference parse rejected message");
            return false;
        };
        let Some(key) = msg.routing_key() else {
            self.unrouted += 1;
            return false;
        };

        let worker = partition(key, self.senders.len());
        if self.senders[worker].send(msg).is_err() {
            warn!(worker, "reference worker gone, message dropped");
            return false;
        }
        true
    }

    /// Submit every payload in `queue`. Returns the number visited.
    pub fn consume(&mut self, queue: &MessageQueue) -> Result<u64, Error> {
        let visited = queue.for_each(|bytes| {
            self.submit(bytes);
        })?;
        debug!(visited, rejected = self.rejected, "reference reader drained queue");
        Ok(visited)
    }

    /// Close every channel and wait for the workers to drain.
    ///
    /// Workers still running when the timeout elapses are left detached; the
    /// returned counters then only cover the workers that finished.
    pub async fn shutdown(self) -> ConsumerStats {
        let Self {
            senders, workers, ..
        } = self;
        drop(senders);

        let deadline = Instant::now() + self.config.shutdown_timeout();
        let mut total = ConsumerStats::default();
        for (worker, handle) in workers.into_iter().enumerate() {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(stats)) => total += stats,
                Ok(Err(e)) => warn!(worker, error = %e, "reference worker failed"),
                Err(_) => {
                    warn!(
                        worker,
                        timeout = ?self.config.shutdown_timeout(),
                        "reference workers did not drain in time, proceeding"
                    );
                    break;
                }
            }
        }
        info!(
            opened = total.opened,
            canceled = total.canceled,
            open = self.orders.len(),
            "reference consumer stopped"
        );
        total
    }

    /// The shared open-order table
    pub fn orders(&self) -> &Arc<OpenOrders> {
        &self.orders
    }

    /// The shared latency recorder
    pub fn recorder(&self) -> &Arc<LatencyRecorder> {
        &self.recorder
    }

    /// Latency summary so far
    pub fn report(&self) -> LatencyReport {
        self.recorder.report()
    }

    /// Payloads the parser rejected
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Parsed payloads with no handled MsgType or key
    pub fn unrouted(&self) -> u64 {
        self.unrouted
    }
}

async fn run_worker(
    worker: usize,
    mut rx: mpsc::UnboundedReceiver<ParsedMessage>,
    orders: Arc<OpenOrders>,
    recorder: Arc<LatencyRecorder>,
) -> ConsumerStats {
    let mut stats = ConsumerStats::default();
    while let Some(msg) = rx.recv().await {
        let outcome = recorder.record(|| apply_parsed(&msg, &orders));
        stats.record(outcome);
    }
    debug!(worker, applied = stats.total(), "reference worker drained");
    stats
}
