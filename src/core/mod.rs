//! Core pooling types
//!
//! This module contains the pooling protocol itself:
//! - ObjectPool: the single pool interface
//! - Pool: FIFO idle set with factory, retention cap and reset/destroy hooks
//! - AutoReturnPool / Pooled: handles that find their way back when leaked
//! - Registry: process-wide map from element type to its pool

pub mod policy;
pub mod pool;
pub mod pooled;
pub mod registry;
pub mod traits;

pub use policy::{FnPolicy, NoopPolicy, PoolPolicy, ResetStatePolicy, Resettable};
pub use pool::{Pool, DEFAULT_MAX_RETAINED};
pub use pooled::{AutoReturnPool, Pooled, PooledObject, PooledObjectWrapper};
pub use registry::{ErasedPool, Registry, TypeKey};
pub use traits::ObjectPool;
