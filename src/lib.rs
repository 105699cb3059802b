//! Reusable object pools with a type-keyed registry
//!
//! Amortizes the cost of expensive objects by recycling instances instead of
//! dropping them. Three layers:
//! - **core::pool**: single-type pool with a factory, retention cap and reset/destroy hooks
//! - **core::pooled**: auto-returning handles that recover objects callers forgot to return
//! - **core::registry**: process-wide map from element type to its pool
//!
//! **infrastructure** holds the cold path: configuration, logging and metrics.
//!
//! # Example
//! ```
//! use object_recycler::{ObjectPool, Pool};
//!
//! let pool = Pool::with_factory(|| Vec::<u8>::with_capacity(4096));
//! let buf = pool.get().unwrap();
//! assert!(pool.return_object(buf));
//! assert_eq!(pool.idle_len(), 1);
//! ```

pub mod core;
pub mod infrastructure;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types
pub use crate::core::{
    AutoReturnPool, ErasedPool, FnPolicy, NoopPolicy, ObjectPool, Pool, PoolPolicy, Pooled,
    PooledObject, PooledObjectWrapper, Registry, ResetStatePolicy, Resettable, TypeKey,
    DEFAULT_MAX_RETAINED,
};
pub use infrastructure::config::{Config, ConfigError, LoggingConfig, PoolsConfig};
pub use infrastructure::metrics::PoolStats;

use thiserror::Error;

/// Boxed error returned by fallible factories
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for pool and registry operations
#[derive(Error, Debug)]
pub enum PoolError {
    /// The factory failed to produce a new instance.
    #[error("failed to construct {type_name}: {source}")]
    Construction {
        type_name: &'static str,
        #[source]
        source: BoxError,
    },

    /// A pool was requested by runtime type token but nothing knows how to build one.
    #[error("no pool or constructor registered for {0}")]
    NoConstructor(&'static str),

    /// Zero-sized types carry no identity, so recycling them is meaningless.
    #[error("cannot create a default pool for zero-sized type {0}; register a factory instead")]
    ZeroSizedType(&'static str),

    /// A pool handed out an object of a different type than the one requested.
    #[error("pool for {expected} produced a different type")]
    TypeMismatch { expected: &'static str },

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The process-wide registry was already created.
    #[error("global registry already initialized")]
    AlreadyInitialized,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, PoolError>;

/// An object could not be restored to its reusable baseline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("reset failed: {0}")]
pub struct ResetError(pub String);

impl ResetError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// An object failed to release the external resources it holds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("resource release failed: {0}")]
pub struct ReleaseError(pub String);

impl ReleaseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
