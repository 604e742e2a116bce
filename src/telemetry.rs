//! Tracing subscriber bootstrap.
//!
//! The filter comes from `RUST_LOG` and defaults to `info`. Calling
//! [`init`] more than once is harmless; only the first call installs a
//! subscriber.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global fmt subscriber
pub fn init(service_name: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .compact()
        .with_target(false)
        .with_thread_names(true)
        .with_env_filter(filter)
        .try_init();

    tracing::debug!(service = service_name, "telemetry initialized");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init("first");
        init("second");
    }
}
