//! Generic object pool
//!
//! Recycles instances of a single type instead of dropping them.
//! The idle set is a FIFO guarded by a `parking_lot::Mutex`; factories and
//! policy hooks always run outside the lock, so they may touch the pool again.

use crate::core::policy::{NoopPolicy, PoolPolicy, ResetStatePolicy, Resettable};
use crate::core::traits::ObjectPool;
use crate::infrastructure::logging::POOL_TARGET;
use crate::infrastructure::metrics::{PoolMetrics, PoolStats};
use crate::{BoxError, PoolError, Result};
use parking_lot::Mutex;
use std::any::type_name;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Retention cap used when none is configured
pub const DEFAULT_MAX_RETAINED: usize = 100;

/// What became of a returned instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reclaimed {
    /// Reset and back in the idle set
    Recycled,
    /// Destroyed because the idle set was full
    Discarded,
    /// Destroyed because the reset hook failed
    ResetFailed,
}

impl Reclaimed {
    /// Whether the return counts as successful
    #[inline]
    pub(crate) fn accepted(self) -> bool {
        self != Reclaimed::ResetFailed
    }
}

type Factory<T> = Box<dyn Fn() -> std::result::Result<T, BoxError> + Send + Sync>;

/// Generic object pool
///
/// # Type Parameters
/// - `T`: The type of object to pool. Must be Send for thread safety.
///
/// # Example
/// ```
/// use object_recycler::{ObjectPool, Pool};
///
/// let pool = Pool::with_factory(|| String::with_capacity(256)).with_max_retained(8);
///
/// // Empty pool: the factory runs
/// let mut s = pool.get().unwrap();
/// s.push_str("hello");
///
/// // Back into the idle set (no reset hook configured, contents survive)
/// assert!(pool.return_object(s));
/// assert_eq!(pool.get().unwrap(), "hello");
/// ```
pub struct Pool<T: Send + 'static> {
    idle: Mutex<VecDeque<T>>,
    max_retained: AtomicUsize,
    factory: Factory<T>,
    policy: Box<dyn PoolPolicy<T>>,
    metrics: PoolMetrics,
}

impl<T: Send + Default + 'static> Pool<T> {
    /// Create a pool that builds instances with `T::default()`
    pub fn new() -> Self {
        Self::with_factory(T::default)
    }
}

impl<T: Send + Default + 'static> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Resettable + Default + 'static> Pool<T> {
    /// Pool whose reset hook calls [`Resettable::reset_state`]
    pub fn resettable() -> Self {
        Self::new().with_policy(ResetStatePolicy)
    }
}

impl<T: Send + Resettable + 'static> Pool<T> {
    /// Resettable pool with an explicit factory
    pub fn resettable_with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_factory(factory).with_policy(ResetStatePolicy)
    }
}

impl<T: Send + 'static> Pool<T> {
    /// Create a pool with an infallible factory
    ///
    /// # Arguments
    /// * `factory` - Function to create new objects when the idle set is empty
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_try_factory(move || Ok::<T, BoxError>(factory()))
    }

    /// Create a pool with a fallible factory
    ///
    /// Factory errors are not handled by the pool; they reach the `get` caller
    /// as `PoolError::Construction`.
    pub fn with_try_factory<F, E>(factory: F) -> Self
    where
        F: Fn() -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self {
            idle: Mutex::new(VecDeque::new()),
            max_retained: AtomicUsize::new(DEFAULT_MAX_RETAINED),
            factory: Box::new(move || factory().map_err(Into::into)),
            policy: Box::new(NoopPolicy),
            metrics: PoolMetrics::new(),
        }
    }

    /// Replace the reset/destroy hooks
    pub fn with_policy<P: PoolPolicy<T>>(mut self, policy: P) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Set the retention cap (default 100)
    pub fn with_max_retained(self, max: usize) -> Self {
        self.max_retained.store(max, Ordering::Relaxed);
        self
    }

    pub(crate) fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    /// Build a fresh instance, bypassing the idle set
    fn create(&self) -> Result<T> {
        let obj = (self.factory)().map_err(|source| PoolError::Construction {
            type_name: type_name::<T>(),
            source,
        })?;
        self.metrics.record_created();
        Ok(obj)
    }

    fn destroy(&self, obj: T) {
        self.metrics.record_destroyed();
        self.policy.destroy(obj);
    }

    /// Return `obj`, reporting whether it was recycled or destroyed
    pub(crate) fn reclaim(&self, mut obj: T) -> Reclaimed {
        let max = self.max_retained();

        // Full pool: disposing of the instance is a successful return
        let full = self.idle.lock().len() >= max;
        if full {
            self.destroy(obj);
            return Reclaimed::Discarded;
        }

        if let Err(e) = self.policy.reset(&mut obj) {
            tracing::error!(
                target: POOL_TARGET,
                pool = type_name::<T>(),
                error = %e,
                "Reset failed, destroying instance instead of recycling it"
            );
            self.metrics.record_reset_failure();
            self.destroy(obj);
            return Reclaimed::ResetFailed;
        }

        // Another thread may have filled the idle set while we were resetting
        match self.try_enqueue(obj, max) {
            Some(overflow) => {
                self.destroy(overflow);
                Reclaimed::Discarded
            }
            None => {
                self.metrics.record_returned();
                Reclaimed::Recycled
            }
        }
    }

    /// Push into the idle set unless it is full; hands the instance back when full
    fn try_enqueue(&self, obj: T, max: usize) -> Option<T> {
        let mut idle = self.idle.lock();
        if idle.len() >= max {
            Some(obj)
        } else {
            idle.push_back(obj);
            None
        }
    }
}

impl<T: Send + 'static> ObjectPool for Pool<T> {
    type Item = T;

    fn get(&self) -> Result<T> {
        let reused = self.idle.lock().pop_front();
        match reused {
            Some(obj) => {
                self.metrics.record_reused();
                Ok(obj)
            }
            None => self.create(),
        }
    }

    fn return_object(&self, obj: T) -> bool {
        self.reclaim(obj).accepted()
    }

    fn shutdown(&self) {
        let drained: Vec<T> = self.idle.lock().drain(..).collect();
        tracing::debug!(
            target: POOL_TARGET,
            pool = type_name::<T>(),
            drained = drained.len(),
            "Pool shut down"
        );
        for obj in drained {
            self.destroy(obj);
        }
    }

    #[inline]
    fn idle_len(&self) -> usize {
        self.idle.lock().len()
    }

    #[inline]
    fn max_retained(&self) -> usize {
        self.max_retained.load(Ordering::Relaxed)
    }

    fn set_max_retained(&self, max: usize) {
        self.max_retained.store(max, Ordering::Relaxed);
    }

    fn stats(&self) -> PoolStats {
        self.metrics.snapshot(self.idle_len(), self.max_retained())
    }
}

impl<T: Send + 'static> Drop for Pool<T> {
    fn drop(&mut self) {
        let drained: Vec<T> = self.idle.get_mut().drain(..).collect();
        for obj in drained {
            self.policy.destroy(obj);
        }
    }
}

impl<T: Send + 'static> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("type", &type_name::<T>())
            .field("idle", &self.idle_len())
            .field("max_retained", &self.max_retained())
            .finish()
    }
}
