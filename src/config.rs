//! Configuration for the generator and both consumers.
//!
//! All structs follow the same builder shape: `new()` or `default()` for the
//! documented defaults, `with_*` setters, plain getters, and a `validate()`
//! that rejects values the runtime cannot honor.

use std::time::Duration;

use crate::error::Error;

/// Default bound on recycled order records kept by the free list
pub const DEFAULT_FREE_LIST_CAPACITY: usize = 8192;

/// Default number of independently locked open-order shards
pub const DEFAULT_TABLE_SHARDS: usize = 16;

/// Largest latency the histogram tracks: 10 seconds in nanoseconds
pub const DEFAULT_HISTOGRAM_MAX_NS: u64 = 10_000_000_000;

/// HdrHistogram resolution in significant decimal digits
pub const DEFAULT_SIGNIFICANT_DIGITS: u8 = 3;

/// Timed calls discarded by the baseline consumer before recording
pub const DEFAULT_REFERENCE_WARMUP: u64 = 100;

/// Time allowed for baseline workers to drain on shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the zero-copy consumer and its open-order table
///
/// # Example
///
/// ```rust
/// use fix_flyweight::config::ConsumerConfig;
///
/// let config = ConsumerConfig::new()
///     .with_free_list_capacity(1024)
///     .with_pin_core(Some(2));
/// assert_eq!(config.free_list_capacity(), 1024);
/// ```
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    free_list_capacity: usize,
    table_shards: usize,
    warmup_skip: u64,
    pin_core: Option<usize>,
    histogram_max_ns: u64,
    significant_digits: u8,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsumerConfig {
    /// Create a configuration with the default bounds and no fixed core
    pub fn new() -> Self {
        Self {
            free_list_capacity: DEFAULT_FREE_LIST_CAPACITY,
            table_shards: DEFAULT_TABLE_SHARDS,
            warmup_skip: 0,
            pin_core: None,
            histogram_max_ns: DEFAULT_HISTOGRAM_MAX_NS,
            significant_digits: DEFAULT_SIGNIFICANT_DIGITS,
        }
    }

    /// Set how many released records the free list retains
    #[must_use]
    pub fn with_free_list_capacity(mut self, capacity: usize) -> Self {
        self.free_list_capacity = capacity;
        self
    }

    /// Set the number of open-order table shards
    #[must_use]
    pub fn with_table_shards(mut self, shards: usize) -> Self {
        self.table_shards = shards;
        self
    }

    /// Set how many timed calls are excluded from the histogram
    #[must_use]
    pub fn with_warmup_skip(mut self, warmup_skip: u64) -> Self {
        self.warmup_skip = warmup_skip;
        self
    }

    /// Pin the consuming thread to this core (`None` picks the first available)
    #[must_use]
    pub fn with_pin_core(mut self, core: Option<usize>) -> Self {
        self.pin_core = core;
        self
    }

    /// Set the histogram's highest trackable value and resolution
    #[must_use]
    pub fn with_histogram(mut self, max_ns: u64, significant_digits: u8) -> Self {
        self.histogram_max_ns = max_ns;
        self.significant_digits = significant_digits;
        self
    }

    /// Get the free-list capacity
    pub fn free_list_capacity(&self) -> usize {
        self.free_list_capacity
    }

    /// Get the table shard count
    pub fn table_shards(&self) -> usize {
        self.table_shards
    }

    /// Get the warm-up skip count
    pub fn warmup_skip(&self) -> u64 {
        self.warmup_skip
    }

    /// Get the explicitly requested core, if any
    pub fn pin_core(&self) -> Option<usize> {
        self.pin_core
    }

    /// Get the histogram's highest trackable value in nanoseconds
    pub fn histogram_max_ns(&self) -> u64 {
        self.histogram_max_ns
    }

    /// Get the histogram's significant digits
    pub fn significant_digits(&self) -> u8 {
        self.significant_digits
    }

    /// Reject settings the table or histogram cannot be built with
    pub fn validate(&self) -> Result<(), Error> {
        if self.table_shards == 0 {
            return Err(Error::Config("table_shards must be > 0".into()));
        }
        if self.significant_digits > 5 {
            return Err(Error::Config(format!(
                "significant_digits must be in 0..=5, got {}",
                self.significant_digits
            )));
        }
        if self.histogram_max_ns < 2 {
            return Err(Error::Config("histogram_max_ns must be >= 2".into()));
        }
        Ok(())
    }
}

/// Configuration for the workload generator
///
/// The generated sequence is a pure function of the seed, the requested
/// count and the two comp ids.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    sender_comp_id: String,
    target_comp_id: String,
    seed: u64,
}

impl GeneratorConfig {
    /// Create a generator configuration
    pub fn new(sender_comp_id: impl Into<String>, target_comp_id: impl Into<String>) -> Self {
        Self {
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
            seed: 0,
        }
    }

    /// Set the random seed
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Get SenderCompID (49)
    pub fn sender_comp_id(&self) -> &str {
        &self.sender_comp_id
    }

    /// Get TargetCompID (56)
    pub fn target_comp_id(&self) -> &str {
        &self.target_comp_id
    }

    /// Get the random seed
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Comp ids end up verbatim on the wire, so they must be non-empty and SOH-free
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [
            ("sender_comp_id", &self.sender_comp_id),
            ("target_comp_id", &self.target_comp_id),
        ] {
            if value.is_empty() || value.as_bytes().contains(&crate::types::SOH) {
                return Err(Error::Config(format!("{name} must be non-empty and SOH-free")));
            }
        }
        Ok(())
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::new("SENDER", "TARGET")
    }
}

/// Configuration for the sharded full-parse baseline consumer
#[derive(Debug, Clone)]
pub struct ReferenceConfig {
    workers: usize,
    warmup_skip: u64,
    shutdown_timeout: Duration,
    table: ConsumerConfig,
}

impl ReferenceConfig {
    /// Create a configuration with `workers` sequential worker tasks
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            warmup_skip: DEFAULT_REFERENCE_WARMUP,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            table: ConsumerConfig::new(),
        }
    }

    /// Set how many timed calls are excluded from the histogram
    #[must_use]
    pub fn with_warmup_skip(mut self, warmup_skip: u64) -> Self {
        self.warmup_skip = warmup_skip;
        self
    }

    /// Set how long shutdown waits for workers to drain
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Set the open-order table settings shared by all workers
    #[must_use]
    pub fn with_table(mut self, table: ConsumerConfig) -> Self {
        self.table = table;
        self
    }

    /// Get the worker count
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Get the warm-up skip count
    pub fn warmup_skip(&self) -> u64 {
        self.warmup_skip
    }

    /// Get the shutdown timeout
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Get the table settings
    pub fn table(&self) -> &ConsumerConfig {
        &self.table
    }

    /// Reject a zero worker count or an invalid table configuration
    pub fn validate(&self) -> Result<(), Error> {
        if self.workers == 0 {
            return Err(Error::Config("thread_count must be > 0".into()));
        }
        self.table.validate()
    }
}
