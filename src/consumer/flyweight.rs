//! Zero-copy consumer.
//!
//! Each payload is scanned in place by a [`FieldScanner`] and applied to the
//! consumer's own [`OpenOrders`]. Nothing on this path allocates except the
//! first sighting of a symbol and arena growth. Decode misses are counted and
//! logged at `debug`, never returned as errors.

use tracing::{debug, info};

use crate::codec::scanner::{FieldScanner, Scan};
use crate::config::ConsumerConfig;
use crate::error::Error;
use crate::metrics::{LatencyRecorder, LatencyReport};
use crate::queue::MessageQueue;
use crate::table::OpenOrders;

use super::{ConsumerStats, DecodeOutcome};

/// Scanner plus table plus latency recorder
#[derive(Debug)]
pub struct FlyweightConsumer {
    scanner: FieldScanner,
    orders: OpenOrders,
    recorder: LatencyRecorder,
    stats: ConsumerStats,
}

impl FlyweightConsumer {
    /// Create a consumer with an empty table
    pub fn new(config: &ConsumerConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            scanner: FieldScanner::new(),
            orders: OpenOrders::with_config(config),
            recorder: LatencyRecorder::from_config(config)?,
            stats: ConsumerStats::default(),
        })
    }

    /// Decode and apply one message
    ///
    /// # Example
    ///
    /// ```rust
    /// use fix_flyweight::config::ConsumerConfig;
    /// use fix_flyweight::consumer::{DecodeOutcome, FlyweightConsumer};
    ///
    /// let mut consumer = FlyweightConsumer::new(&ConsumerConfig::new()).unwrap();
    /// let open = b"8=FIX.4.4\x0135=D\x0111=1\x0155=AAPL\x0138=100\x0144=10.00\x0110=000\x01";
    /// assert_eq!(consumer.process(open), DecodeOutcome::Opened);
    /// assert!(consumer.orders().contains(1));
    /// ```
    #[inline]
    pub fn process(&mut self, bytes: &[u8]) -> DecodeOutcome {
        let outcome = apply(&mut self.scanner, &self.orders, bytes);
        self.stats.record(outcome);
        outcome
    }

    /// [`process`](Self::process), timed into the latency recorder
    #[inline]
    pub fn process_timed(&mut self, bytes: &[u8]) -> DecodeOutcome {
        let Self {
            scanner,
            orders,
            recorder,
            stats,
        } = self;
        let outcome = recorder.record(|| apply(scanner, orders, bytes));
        stats.record(outcome);
        outcome
    }

    /// Apply every payload in `queue`, timing each. Returns the number visited.
    pub fn consume(&mut self, queue: &MessageQueue) -> Result<u64, Error> {
        let visited = queue.for_each(|bytes| {
            self.process_timed(bytes);
        })?;
        info!(
            visited,
            open = self.orders.len(),
            opened = self.stats.opened,
            canceled = self.stats.canceled,
            decode_miss = self.stats.decode_miss,
            "flyweight consumer drained queue"
        );
        Ok(visited)
    }

    /// The open-order table
    pub fn orders(&self) -> &OpenOrders {
        &self.orders
    }

    /// Outcome counters so far
    pub fn stats(&self) -> ConsumerStats {
        self.stats
    }

    /// The latency recorder
    pub fn recorder(&self) -> &LatencyRecorder {
        &self.recorder
    }

    /// Latency summary so far
    pub fn report(&self) -> LatencyReport {
        self.recorder.report()
    }
}

#[inline]
fn apply(scanner: &mut FieldScanner, orders: &OpenOrders, bytes: &[u8]) -> DecodeOutcome {
    match scanner.scan(bytes) {
        Scan::NewOrder(view) => {
            orders.open(view.cl_ord_id, view.symbol, view.quantity, view.price_cents);
            DecodeOutcome::Opened
        }
        Scan::Cancel { orig_cl_ord_id } => {
            if orders.cancel(orig_cl_ord_id) {
                DecodeOutcome::Canceled
            } else {
                DecodeOutcome::CancelMiss
            }
        }
        Scan::NoMsgType | Scan::Unhandled(_) => DecodeOutcome::Skipped,
        Scan::Incomplete(kind) => {
            debug!(?kind, len = bytes.len(), "decode miss: required field absent");
            DecodeOutcome::Incomplete
        }
    }
}

/// Consume `queue` on a dedicated thread pinned to one CPU core.
///
/// The core is `config.pin_core()` if set, otherwise the first core the
/// process may run on. Failing to pin is fatal: the run aborts with
/// [`Error::Affinity`] or [`Error::NoCores`] before any message is read.
pub fn run_pinned(config: ConsumerConfig, queue: MessageQueue) -> Result<FlyweightConsumer, Error> {
    let core = match config.pin_core() {
        Some(core) => core,
        None => default_core()?,
    };

    let handle = std::thread::Builder::new()
        .name("flyweight-consumer".into())
        .spawn(move || -> Result<FlyweightConsumer, Error> {
            if !core_affinity::set_for_current(core_affinity::CoreId { id: core }) {
                return Err(Error::Affinity { core });
            }
            info!(core, "consumer thread pinned");
            let mut consumer = FlyweightConsumer::new(&config)?;
            consumer.consume(&queue)?;
            Ok(consumer)
        })?;

    handle
        .join()
        .map_err(|_| Error::Io(std::io::Error::other("flyweight consumer thread panicked")))?
}

/// First core in the process affinity mask
fn default_core() -> Result<usize, Error> {
    core_affinity::get_core_ids()
        .and_then(|ids| ids.first().map(|c| c.id))
        .ok_or(Error::NoCores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SOH;

    fn fix(fields: &[&str]) -> Vec<u8> {
        let mut out = Vec::new();
        for f in fields {
            out.extend_from_slice(f.as_bytes());
            out.push(SOH);
        }
        out
    }

    fn consumer() -> FlyweightConsumer {
        FlyweightConsumer::new(&ConsumerConfig::new()).unwrap()
    }

    #[test]
    fn test_open_and_cancel() {
        let mut c = consumer();
        let open = fix(&["8=FIX.4.4", "35=D", "11=5", "55=MSFT", "38=200", "44=310.25"]);
        let cancel = fix(&["8=FIX.4.4", "35=F", "11=1", "41=5", "55=MSFT"]);

        assert_eq!(c.process(&open), DecodeOutcome::Opened);
        let order = c.orders().get(5).unwrap();
        assert_eq!(&*order.symbol, "MSFT");
        assert_eq!(order.quantity, 200);
        assert_eq!(order.price_cents, 31025);

        assert_eq!(c.process(&cancel), DecodeOutcome::Canceled);
        assert!(c.orders().is_empty());
        assert_eq!(c.process(&cancel), DecodeOutcome::CancelMiss);
    }

    #[test]
    fn test_incomplete_leaves_table_untouched() {
        let mut c = consumer();
        let no_symbol = fix(&["35=D", "11=5", "38=200", "44=1"]);
        assert_eq!(c.process(&no_symbol), DecodeOutcome::Incomplete);
        assert!(c.orders().is_empty());
        assert_eq!(c.orders().symbols().len(), 0);
        assert_eq!(c.stats().decode_miss, 1);
    }

    #[test]
    fn test_admin_message_skipped() {
        let mut c = consumer();
        assert_eq!(c.process(&fix(&["8=FIX.4.4", "35=0"])), DecodeOutcome::Skipped);
        assert_eq!(c.process(&fix(&["8=FIX.4.4", "112=x"])), DecodeOutcome::Skipped);
        assert_eq!(c.stats().skipped, 2);
    }

    #[test]
    fn test_timed_processing_records_every_call() {
        let mut c = consumer();
        let open = fix(&["35=D", "11=1", "55=AAPL", "38=100", "44=1"]);
        for _ in 0..10 {
            c.process_timed(&open);
        }
        assert_eq!(c.report().count, 10);
        assert_eq!(c.stats().opened, 10);
        assert_eq!(c.orders().len(), 1);
    }

    #[test]
    fn test_run_pinned_defaults_to_first_core() {
        let dir = tempfile::tempdir().unwrap();
        let queue = MessageQueue::open(dir.path()).unwrap();
        let mut writer = queue.writer().unwrap();
        writer
            .append(&fix(&["35=D", "11=1", "55=AAPL", "38=100", "44=1"]))
            .unwrap();
        drop(writer);

        assert!(default_core().is_ok());
        let consumer = run_pinned(ConsumerConfig::new(), queue).unwrap();
        assert!(consumer.orders().contains(1));
        assert_eq!(consumer.report().count, 1);
    }

    #[test]
    fn test_run_pinned_to_explicit_core() {
        let dir = tempfile::tempdir().unwrap();
        let queue = MessageQueue::open(dir.path()).unwrap();
        let core = default_core().unwrap();
        let consumer = run_pinned(ConsumerConfig::new().with_pin_core(Some(core)), queue).unwrap();
        assert!(consumer.orders().is_empty());
    }

    #[test]
    fn test_run_pinned_bad_core_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let queue = MessageQueue::open(dir.path()).unwrap();
        let config = ConsumerConfig::new().with_pin_core(Some(1023));
        assert!(matches!(
            run_pinned(config, queue),
            Err(Error::Affinity { .. })
        ));
    }
}
