//! Pool abstraction trait
//!
//! One generic interface shared by every pool flavor. The registry erases it
//! at its boundary (see `registry::ErasedPool`); everything else stays typed.

use crate::infrastructure::metrics::PoolStats;
use crate::Result;

/// Object pool interface
///
/// # Design Notes
/// - `get` never blocks and never reports exhaustion: an empty idle set means
///   a fresh instance from the factory
/// - `return_object` reports `true` when the instance was either recycled or
///   disposed of because the pool was full, `false` when it could not be reset
/// - All operations are synchronous and bounded
pub trait ObjectPool: Send + Sync + 'static {
    /// The type handed to callers
    type Item: Send + 'static;

    /// Take an idle instance, or construct a new one
    ///
    /// # Errors
    /// Returns `PoolError::Construction` if the factory fails.
    fn get(&self) -> Result<Self::Item>;

    /// Give an instance back to the pool
    fn return_object(&self, item: Self::Item) -> bool;

    /// Check out `count` instances, constructing as needed, then return them all
    ///
    /// The idle set never grows past the retention cap; surplus instances are destroyed.
    /// Instances obtained before a factory failure are still returned.
    fn prewarm(&self, count: usize) -> Result<()> {
        let mut warmed = Vec::with_capacity(count);
        let mut outcome = Ok(());
        for _ in 0..count {
            match self.get() {
                Ok(item) => warmed.push(item),
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }
        for item in warmed {
            self.return_object(item);
        }
        outcome
    }

    /// Drain and destroy the idle set; the pool remains usable afterwards
    fn shutdown(&self);

    /// Number of idle instances
    fn idle_len(&self) -> usize;

    /// Retention cap
    fn max_retained(&self) -> usize;

    /// Change the retention cap
    ///
    /// Lowering the cap does not evict; the idle set shrinks as gets drain it.
    fn set_max_retained(&self, max: usize);

    /// Counter snapshot
    fn stats(&self) -> PoolStats;
}
