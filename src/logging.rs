//! Tracing setup for applications embedding spark-weave.
//!
//! The library itself only emits `tracing` events; installing a subscriber is the
//! application's choice. `init_tracing` is the stock one.

use std::sync::Once;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const DEFAULT_FILTER: &str = "spark_weave=info";

static TRACING_INSTALLED: Once = Once::new();

/// Install a formatted subscriber filtered by `RUST_LOG` (idempotent).
///
/// Falls back to `spark_weave=info` when `RUST_LOG` is unset or invalid.
pub fn init_tracing() {
    TRACING_INSTALLED.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init();
    });
}
