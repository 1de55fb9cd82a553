//! LogTail Observability
//!
//! Provides metrics and logging setup for LogTail.
//!
//! # Features
//!
//! - Prometheus counters for tail record encode/decode and zero-copy disposal
//! - Text exposition of the registry for whatever endpoint the host exposes
//! - `tracing` subscriber initialisation
//!
//! # Usage
//!
//! ```no_run
//! use logtail_observability::{exporter, init, init_tracing};
//!
//! init();
//! init_tracing("info");
//!
//! let text = exporter::render().expect("metrics render");
//! ```

pub mod exporter;
pub mod metrics;

use tracing_subscriber::EnvFilter;

pub use metrics::{init as init_metrics, REGISTRY};

/// Initialize all observability components
pub fn init() {
    metrics::init();
}

/// Install a global fmt subscriber. `RUST_LOG` wins over `default_filter`.
/// Returns false if a subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_does_not_panic() {
        init();
    }

    #[test]
    fn test_double_init_is_safe() {
        init();
        init();
        init_metrics();
    }

    #[test]
    fn test_second_tracing_init_reports_false() {
        init_tracing("debug");
        assert!(!init_tracing("debug"));
    }
}
