//! Latency recording and percentile reports.
//!
//! [`LatencyRecorder`] times a closure and feeds the elapsed nanoseconds into
//! an HdrHistogram. The first `warmup_skip` timed calls are counted but not
//! recorded. [`LatencyReport`] is the summary written to the metrics file.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{ConsumerConfig, DEFAULT_HISTOGRAM_MAX_NS, DEFAULT_SIGNIFICANT_DIGITS};
use crate::error::Error;

/// Percentile summary, all values in nanoseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LatencyReport {
    /// Recorded samples
    pub count: u64,
    /// Median
    pub p50: u64,
    /// 90th percentile
    pub p90: u64,
    /// 99th percentile
    pub p99: u64,
    /// 99.9th percentile
    pub p999: u64,
    /// Largest sample
    pub max: u64,
    /// Mean, truncated
    pub mean: u64,
}

impl LatencyReport {
    /// Plain-text form: a label line, then one `key=value` per line
    ///
    /// # Example
    ///
    /// ```rust
    /// use fix_flyweight::metrics::LatencyReport;
    ///
    /// let text = LatencyReport::default().render("Flyweight");
    /// assert!(text.starts_with("Flyweight latency (ns)\ncount=0\n"));
    /// assert!(text.ends_with("mean=0\n"));
    /// ```
    pub fn render(&self, label: &str) -> String {
        let mut out = String::with_capacity(128);
        let _ = writeln!(out, "{label} latency (ns)");
        let _ = writeln!(out, "count={}", self.count);
        let _ = writeln!(out, "p50={}", self.p50);
        let _ = writeln!(out, "p90={}", self.p90);
        let _ = writeln!(out, "p99={}", self.p99);
        let _ = writeln!(out, "p99.9={}", self.p999);
        let _ = writeln!(out, "max={}", self.max);
        let _ = writeln!(out, "mean={}", self.mean);
        out
    }
}

/// Timed-call recorder backed by an HdrHistogram
#[derive(Debug)]
pub struct LatencyRecorder {
    histogram: Mutex<Histogram<u64>>,
    calls: AtomicU64,
    warmup_skip: u64,
}

impl LatencyRecorder {
    /// Recorder tracking up to 10 s at 3 significant digits
    pub fn new(warmup_skip: u64) -> Result<Self, Error> {
        Self::with_bounds(warmup_skip, DEFAULT_HISTOGRAM_MAX_NS, DEFAULT_SIGNIFICANT_DIGITS)
    }

    /// Recorder with explicit histogram bounds
    pub fn with_bounds(warmup_skip: u64, max_ns: u64, significant_digits: u8) -> Result<Self, Error> {
        let histogram = Histogram::new_with_bounds(1, max_ns, significant_digits)?;
        Ok(Self {
            histogram: Mutex::new(histogram),
            calls: AtomicU64::new(0),
            warmup_skip,
        })
    }

    /// Recorder sized by a consumer configuration
    pub fn from_config(config: &ConsumerConfig) -> Result<Self, Error> {
        Self::with_bounds(
            config.warmup_skip(),
            config.histogram_max_ns(),
            config.significant_digits(),
        )
    }

    /// Run `work`, recording how long it took
    #[inline]
    pub fn record<T>(&self, work: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = work();
        self.record_duration(start.elapsed());
        out
    }

    /// Record an externally measured duration
    #[inline]
    pub fn record_duration(&self, elapsed: Duration) {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        if call < self.warmup_skip {
            return;
        }
        let ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.histogram.lock().saturating_record(ns);
    }

    /// Timed calls seen, including warm-up
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Warm-up calls excluded from the histogram
    pub fn warmup_skip(&self) -> u64 {
        self.warmup_skip
    }

    /// Summarize what has been recorded so far
    pub fn report(&self) -> LatencyReport {
        let h = self.histogram.lock();
        if h.is_empty() {
            return LatencyReport::default();
        }
        LatencyReport {
            count: h.len(),
            p50: h.value_at_quantile(0.50),
            p90: h.value_at_quantile(0.90),
            p99: h.value_at_quantile(0.99),
            p999: h.value_at_quantile(0.999),
            max: h.max(),
            mean: h.mean() as u64,
        }
    }

    /// Drop all samples and restart the warm-up count
    pub fn reset(&self) {
        self.histogram.lock().reset();
        self.calls.store(0, Ordering::Relaxed);
    }
}

/// Write `report` to `path`, creating parent directories.
///
/// Failures are logged and swallowed; the measured run is never affected.
pub fn write_report(path: &Path, label: &str, report: &LatencyReport) {
    match try_write_report(path, label, report) {
        Ok(()) => info!(path = %path.display(), label, count = report.count, "latency report written"),
        Err(e) => warn!(path = %path.display(), error = %e, "failed to write latency report"),
    }
}

/// Fallible form of [`write_report`]
pub fn try_write_report(path: &Path, label: &str, report: &LatencyReport) -> Result<(), Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, report.render(label))?;
    Ok(())
}
