//! Logging setup
//!
//! Pools and the registry report through `tracing` under two targets:
//! - `pool` - reset failures, destroy/release failures, leak recovery
//! - `registry` - pool replacement, lazy creation, constructor lookup failures
//!
//! Applications that already install a subscriber can skip `init_logging`;
//! the events flow into whatever subscriber is active.

use crate::infrastructure::config::LoggingConfig;
use std::path::Path;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Target used by pool events
pub const POOL_TARGET: &str = "pool";

/// Target used by registry events
pub const REGISTRY_TARGET: &str = "registry";

/// Initialize console logging and, when a directory is configured, a rolling log file
///
/// Returns the file writer's WorkerGuard, which must be kept alive for the
/// duration of the program. Installing a second global subscriber is a no-op.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = if config.json {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .json()
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .boxed()
    };

    let (file_layer, guard) = match config.directory.as_deref() {
        Some(dir) => {
            let (writer, guard) = create_appender(dir, "recycler");
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .json();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Logging system initialized");
    }

    guard
}

/// Create a daily-rolling non-blocking file appender
fn create_appender(dir: &Path, name: &str) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(Rotation::DAILY, dir, name);

    tracing_appender::non_blocking(appender)
}
