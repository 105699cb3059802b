//! Infrastructure - cold path only
//!
//! This module contains code that is not part of the pooling protocol itself:
//! - Configuration loading
//! - Logging setup
//! - Pool metrics

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::{Config, ConfigError};
pub use logging::init_logging;
pub use metrics::{PoolMetrics, PoolStats};
