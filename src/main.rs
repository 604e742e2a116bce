//! Command-line front end: generate a workload, then replay it through either consumer.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;

use fix_flyweight::consumer::flyweight::run_pinned;
use fix_flyweight::metrics::{self, LatencyReport};
use fix_flyweight::{
    telemetry, ConsumerConfig, GeneratorConfig, MessageQueue, ReferenceConfig, ReferenceConsumer,
    WorkloadGenerator,
};

/// Argument that turns metrics on with the default report location
const ENABLE_METRICS: &str = "enable_metrics";

/// Report location used by `flyweight <queue> enable_metrics`
const DEFAULT_FLYWEIGHT_METRICS: &str = "metrics/flyweight.txt";

#[derive(Debug, Parser)]
#[command(name = "fix-flyweight", version, about = "FIX 4.4 decode benchmark")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write an open/cancel workload to a queue
    Generate {
        /// Queue directory
        queue_path: PathBuf,
        /// Messages in the budget phase (the flush adds more)
        count: u64,
        /// Random seed; defaults to the current time
        #[arg(long)]
        seed: Option<u64>,
        /// SenderCompID (49)
        #[arg(long, default_value = "SENDER")]
        sender: String,
        /// TargetCompID (56)
        #[arg(long, default_value = "TARGET")]
        target: String,
    },
    /// Replay a queue through the zero-copy consumer
    Flyweight {
        /// Queue directory
        queue_path: PathBuf,
        /// Report file, or `enable_metrics` for metrics/flyweight.txt
        metrics: Option<String>,
        /// Pin the consumer thread to this core instead of the first available
        #[arg(long)]
        pin_core: Option<usize>,
    },
    /// Replay a queue through the full-parse baseline
    Reference {
        /// Queue directory
        queue_path: PathBuf,
        /// Worker count
        thread_count: usize,
        /// Report file
        metrics_path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("fix-flyweight");
    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            queue_path,
            count,
            seed,
            sender,
            target,
        } => generate(&queue_path, count, seed, sender, target),
        Command::Flyweight {
            queue_path,
            metrics,
            pin_core,
        } => flyweight(queue_path, metrics, pin_core).await,
        Command::Reference {
            queue_path,
            thread_count,
            metrics_path,
        } => reference(&queue_path, thread_count, metrics_path).await,
    }
}

fn generate(
    queue_path: &Path,
    count: u64,
    seed: Option<u64>,
    sender: String,
    target: String,
) -> anyhow::Result<()> {
    if count == 0 {
        bail!("count must be > 0");
    }
    let seed = seed.unwrap_or_else(time_seed);
    info!(queue = %queue_path.display(), count, seed, "generating workload");

    let queue = MessageQueue::open(queue_path)
        .with_context(|| format!("cannot open queue at {}", queue_path.display()))?;
    let mut writer = queue.writer()?;
    let mut generator =
        WorkloadGenerator::new(GeneratorConfig::new(sender, target).with_seed(seed))?;
    let result = generator.generate(count, &mut writer)?;
    writer.flush()?;

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

async fn flyweight(
    queue_path: PathBuf,
    metrics: Option<String>,
    pin_core: Option<usize>,
) -> anyhow::Result<()> {
    let metrics_path = metrics.map(|m| {
        if m == ENABLE_METRICS {
            PathBuf::from(DEFAULT_FLYWEIGHT_METRICS)
        } else {
            PathBuf::from(m)
        }
    });
    info!(queue = %queue_path.display(), ?metrics_path, ?pin_core, "starting flyweight consumer");

    let queue = MessageQueue::open(&queue_path)
        .with_context(|| format!("cannot open queue at {}", queue_path.display()))?;
    let config = ConsumerConfig::new().with_pin_core(pin_core);
    let consumer = tokio::task::spawn_blocking(move || run_pinned(config, queue))
        .await
        .context("flyweight consumer task failed")?
        .context("flyweight consumer failed")?;

    let stats = consumer.stats();
    info!(
        opened = stats.opened,
        canceled = stats.canceled,
        cancel_miss = stats.cancel_miss,
        decode_miss = stats.decode_miss,
        open = consumer.orders().len(),
        "flyweight run complete"
    );
    finish_report("Flyweight", &consumer.report(), metrics_path.as_deref());
    Ok(())
}

async fn reference(
    queue_path: &Path,
    thread_count: usize,
    metrics_path: Option<PathBuf>,
) -> anyhow::Result<()> {
    info!(queue = %queue_path.display(), thread_count, ?metrics_path, "starting reference consumer");

    let queue = MessageQueue::open(queue_path)
        .with_context(|| format!("cannot open queue at {}", queue_path.display()))?;
    let mut consumer = ReferenceConsumer::start(ReferenceConfig::new(thread_count))?;
    consumer.consume(&queue)?;

    let recorder = std::sync::Arc::clone(consumer.recorder());
    let orders = std::sync::Arc::clone(consumer.orders());
    let stats = consumer.shutdown().await;
    info!(
        opened = stats.opened,
        canceled = stats.canceled,
        cancel_miss = stats.cancel_miss,
        decode_miss = stats.decode_miss,
        open = orders.len(),
        "reference run complete"
    );
    finish_report("Reference", &recorder.report(), metrics_path.as_deref());
    Ok(())
}

fn finish_report(label: &str, report: &LatencyReport, path: Option<&Path>) {
    info!(
        label,
        count = report.count,
        p50 = report.p50,
        p99 = report.p99,
        p999 = report.p999,
        max = report.max,
        "latency"
    );
    if let Some(path) = path {
        metrics::write_report(path, label, report);
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
