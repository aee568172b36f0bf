//! Tracing setup for applications embedding the storefront.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber: `RUST_LOG` filter (default `info`) and a fmt layer.
///
/// Returns `false` when a subscriber was already installed.
pub fn init() -> bool {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
