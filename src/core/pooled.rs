//! Auto-returning pooled objects
//!
//! `AutoReturnPool<T>` hands out `Pooled<T>` handles bound to the pool that
//! produced them. A handle is reclaimed in one of two ways:
//!
//! - **Explicit**: `Pooled::dispose` returns the object synchronously and
//!   reports whether the pool recycled it.
//! - **End of life**: a handle dropped without `dispose` counts as a leaked
//!   reference. Its object is pushed onto the pool's lock-free deferred queue
//!   and reclaimed at the next checkpoint (`get`, `return_object`, `prewarm`,
//!   `collect_leaked`). Recovery is best-effort: nothing happens until one of
//!   those runs.
//!
//! Every handle carries a `disposed` guard, so a handle reclaims its object at
//! most once. If the owning pool is gone, the object releases its own
//! resources instead and the handle is terminally disposed.
//!
//! An object recovered from a leak goes back into the idle set like any other;
//! its next checkout wraps it in a fresh handle, armed for another recovery.

use crate::core::policy::PoolPolicy;
use crate::core::pool::{Pool, Reclaimed};
use crate::core::traits::ObjectPool;
use crate::infrastructure::logging::POOL_TARGET;
use crate::infrastructure::metrics::PoolStats;
use crate::{BoxError, ReleaseError, ResetError, Result};
use crossbeam_queue::SegQueue;
use std::any::type_name;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};

/// Element type of an [`AutoReturnPool`]
///
/// # Example
/// ```
/// use object_recycler::{AutoReturnPool, ObjectPool, PooledObject, ReleaseError, ResetError};
///
/// #[derive(Default)]
/// struct Scratch {
///     rows: Vec<u64>,
/// }
///
/// impl PooledObject for Scratch {
///     fn on_reset_state(&mut self) -> Result<(), ResetError> {
///         self.rows.clear();
///         Ok(())
///     }
/// }
///
/// let pool = AutoReturnPool::<Scratch>::new();
/// {
///     let mut scratch = pool.get().unwrap();
///     scratch.rows.push(42);
///     // Dropped without dispose(): queued for recovery
/// }
/// assert_eq!(pool.collect_leaked(), 1);
/// assert_eq!(pool.idle_len(), 1);
/// ```
pub trait PooledObject: Send + 'static {
    /// Restore a reusable baseline before the object re-enters the idle set
    fn on_reset_state(&mut self) -> std::result::Result<(), ResetError> {
        Ok(())
    }

    /// Release external resources before the object is dropped for good
    fn on_release_resources(&mut self) -> std::result::Result<(), ReleaseError> {
        Ok(())
    }
}

/// Run the release hook, logging instead of propagating failures
fn release_resources<T: PooledObject>(obj: &mut T) -> bool {
    match obj.on_release_resources() {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                target: POOL_TARGET,
                pool = type_name::<T>(),
                error = %e,
                "Releasing pooled object resources failed"
            );
            false
        }
    }
}

/// Hooks wired to the `PooledObject` callbacks
struct PooledObjectPolicy;

impl<T: PooledObject> PoolPolicy<T> for PooledObjectPolicy {
    fn reset(&self, obj: &mut T) -> std::result::Result<(), ResetError> {
        obj.on_reset_state()
    }

    fn destroy(&self, mut obj: T) {
        release_resources(&mut obj);
    }
}

/// How a reclamation was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReturnOrigin {
    /// `dispose()` in normal program flow
    Explicit,
    /// Handle dropped while still holding its object
    EndOfLife,
}

/// State shared between the pool and its outstanding handles
struct AutoReturnCore<T: PooledObject> {
    pool: Pool<T>,
    pending: SegQueue<T>,
}

impl<T: PooledObject> AutoReturnCore<T> {
    fn drain_pending(&self) -> usize {
        let mut recovered = 0;
        while let Some(obj) = self.pending.pop() {
            // Leaks discarded by a full pool are not counted as recovered
            if self.pool.reclaim(obj) == Reclaimed::Recycled {
                self.pool.metrics().record_recovered();
                recovered += 1;
            }
        }
        if recovered > 0 {
            tracing::debug!(
                target: POOL_TARGET,
                pool = type_name::<T>(),
                recovered,
                "Recovered leaked pooled objects"
            );
        }
        recovered
    }
}

impl<T: PooledObject> Drop for AutoReturnCore<T> {
    fn drop(&mut self) {
        while let Some(mut obj) = self.pending.pop() {
            release_resources(&mut obj);
        }
    }
}

/// Pool whose objects find their way back on their own
///
/// Idle-set semantics (FIFO, retention cap, reset-or-destroy) are those of
/// [`Pool`]; reset runs [`PooledObject::on_reset_state`] and destroy runs
/// [`PooledObject::on_release_resources`].
pub struct AutoReturnPool<T: PooledObject> {
    core: Arc<AutoReturnCore<T>>,
}

impl<T: PooledObject + Default> AutoReturnPool<T> {
    /// Create a pool that builds instances with `T::default()`
    pub fn new() -> Self {
        Self::from_pool(Pool::new())
    }
}

impl<T: PooledObject + Default> Default for AutoReturnPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PooledObject> AutoReturnPool<T> {
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::from_pool(Pool::with_factory(factory))
    }

    pub fn with_try_factory<F, E>(factory: F) -> Self
    where
        F: Fn() -> std::result::Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        Self::from_pool(Pool::with_try_factory(factory))
    }

    fn from_pool(pool: Pool<T>) -> Self {
        Self {
            core: Arc::new(AutoReturnCore {
                pool: pool.with_policy(PooledObjectPolicy),
                pending: SegQueue::new(),
            }),
        }
    }

    /// Set the retention cap (default 100)
    pub fn with_max_retained(self, max: usize) -> Self {
        self.core.pool.set_max_retained(max);
        self
    }

    /// Reclaim every leaked object queued so far
    ///
    /// Returns how many went back into the idle set.
    pub fn collect_leaked(&self) -> usize {
        self.core.drain_pending()
    }

    /// Leaked objects waiting for the next checkpoint
    pub fn pending_len(&self) -> usize {
        self.core.pending.len()
    }

    fn wrap(&self, obj: T) -> Pooled<T> {
        Pooled {
            object: Some(obj),
            return_to_pool: Arc::downgrade(&self.core),
            disposed: false,
        }
    }

    fn owns(&self, handle: &Pooled<T>) -> bool {
        std::ptr::eq(handle.return_to_pool.as_ptr(), Arc::as_ptr(&self.core))
    }
}

impl<T: PooledObject> ObjectPool for AutoReturnPool<T> {
    type Item = Pooled<T>;

    fn get(&self) -> Result<Pooled<T>> {
        self.core.drain_pending();
        let obj = self.core.pool.get()?;
        Ok(self.wrap(obj))
    }

    /// Equivalent to `handle.dispose()` for handles this pool produced
    ///
    /// Handles from another pool are rejected; dropping them here sends them
    /// back to their own pool.
    fn return_object(&self, handle: Pooled<T>) -> bool {
        self.core.drain_pending();
        if !self.owns(&handle) {
            return false;
        }
        handle.dispose()
    }

    fn shutdown(&self) {
        while let Some(mut obj) = self.core.pending.pop() {
            release_resources(&mut obj);
        }
        self.core.pool.shutdown();
    }

    fn idle_len(&self) -> usize {
        self.core.pool.idle_len()
    }

    fn max_retained(&self) -> usize {
        self.core.pool.max_retained()
    }

    fn set_max_retained(&self, max: usize) {
        self.core.pool.set_max_retained(max);
    }

    fn stats(&self) -> PoolStats {
        self.core.pool.stats()
    }
}

impl<T: PooledObject> fmt::Debug for AutoReturnPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoReturnPool")
            .field("type", &type_name::<T>())
            .field("idle", &self.idle_len())
            .field("pending", &self.pending_len())
            .field("max_retained", &self.max_retained())
            .finish()
    }
}

/// A checked-out object bound to the pool that produced it
///
/// Derefs to `T`. Call [`dispose`](Pooled::dispose) to hand it back; dropping
/// the handle queues the object for deferred recovery instead.
pub struct Pooled<T: PooledObject> {
    /// `None` once the handle has given its object up
    object: Option<T>,
    return_to_pool: Weak<AutoReturnCore<T>>,
    disposed: bool,
}

impl<T: PooledObject> Pooled<T> {
    /// Return the object to its pool now
    ///
    /// `false` if the pool could not recycle it (reset failed) or no longer
    /// exists; the object's resources are released in both cases.
    pub fn dispose(mut self) -> bool {
        self.handle_return(ReturnOrigin::Explicit)
    }

    /// Take the object out of pool management for good
    pub fn detach(mut self) -> T {
        self.disposed = true;
        match self.object.take() {
            Some(obj) => obj,
            // Consuming methods are the only way to empty the slot
            None => unreachable!("pooled handle without an object"),
        }
    }

    /// True once the handle is terminally disposed
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn handle_return(&mut self, origin: ReturnOrigin) -> bool {
        if self.disposed {
            return false;
        }
        let Some(mut obj) = self.object.take() else {
            return false;
        };

        match self.return_to_pool.upgrade() {
            Some(core) => match origin {
                ReturnOrigin::Explicit => {
                    let recycled = core.pool.return_object(obj);
                    self.disposed = !recycled;
                    recycled
                }
                ReturnOrigin::EndOfLife => {
                    core.pending.push(obj);
                    true
                }
            },
            None => {
                // No pool to go back to: release directly, whatever the outcome
                self.disposed = true;
                release_resources(&mut obj);
                false
            }
        }
    }
}

impl<T: PooledObject> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.object {
            Some(obj) => obj,
            None => unreachable!("pooled handle without an object"),
        }
    }
}

impl<T: PooledObject> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.object {
            Some(obj) => obj,
            None => unreachable!("pooled handle without an object"),
        }
    }
}

impl<T: PooledObject> Drop for Pooled<T> {
    fn drop(&mut self) {
        self.handle_return(ReturnOrigin::EndOfLife);
    }
}

impl<T: PooledObject + fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("object", &self.object)
            .field("disposed", &self.disposed)
            .finish()
    }
}

type ResetAction<R> = Box<dyn Fn(&mut R) -> std::result::Result<(), ResetError> + Send + Sync>;
type ReleaseAction<R> = Box<dyn Fn(&mut R) + Send + Sync>;

/// Adapts any resource into a [`PooledObject`] via optional closures
///
/// ```
/// use object_recycler::{AutoReturnPool, ObjectPool, PooledObjectWrapper};
///
/// let pool = AutoReturnPool::with_factory(|| {
///     PooledObjectWrapper::new(String::with_capacity(64)).with_reset_action(|s| {
///         s.clear();
///         Ok(())
///     })
/// });
/// let mut s = pool.get().unwrap();
/// s.resource_mut().push_str("temp");
/// assert!(s.dispose());
/// assert!(pool.get().unwrap().resource().is_empty());
/// ```
pub struct PooledObjectWrapper<R> {
    resource: R,
    reset_action: Option<ResetAction<R>>,
    release_action: Option<ReleaseAction<R>>,
}

impl<R: Send + 'static> PooledObjectWrapper<R> {
    pub fn new(resource: R) -> Self {
        Self {
            resource,
            reset_action: None,
            release_action: None,
        }
    }

    pub fn with_reset_action<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut R) -> std::result::Result<(), ResetError> + Send + Sync + 'static,
    {
        self.reset_action = Some(Box::new(f));
        self
    }

    pub fn with_release_action<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut R) + Send + Sync + 'static,
    {
        self.release_action = Some(Box::new(f));
        self
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    pub fn into_inner(self) -> R {
        self.resource
    }
}

impl<R: Send + 'static> PooledObject for PooledObjectWrapper<R> {
    fn on_reset_state(&mut self) -> std::result::Result<(), ResetError> {
        match &self.reset_action {
            Some(reset) => reset(&mut self.resource),
            None => Ok(()),
        }
    }

    fn on_release_resources(&mut self) -> std::result::Result<(), ReleaseError> {
        if let Some(release) = &self.release_action {
            release(&mut self.resource);
        }
        Ok(())
    }
}

impl<R: fmt::Debug> fmt::Debug for PooledObjectWrapper<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledObjectWrapper")
            .field("resource", &self.resource)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ProbeCounters, Tracked};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tracked_pool() -> (AutoReturnPool<Tracked>, Arc<ProbeCounters>) {
        let counters = Arc::new(ProbeCounters::default());
        let factory_counters = Arc::clone(&counters);
        let pool = AutoReturnPool::with_factory(move || Tracked::new(&factory_counters));
        (pool, counters)
    }

    #[test]
    fn test_dispose_returns_to_pool() {
        let (pool, counters) = tracked_pool();

        let mut obj = pool.get().unwrap();
        let id = obj.id;
        obj.dirty = true;
        assert!(obj.dispose());

        assert_eq!(pool.idle_len(), 1);
        assert_eq!(counters.resets(), 1);

        let again = pool.get().unwrap();
        assert_eq!(again.id, id);
        assert!(!again.dirty);
        assert!(again.dispose());
    }

    #[test]
    fn test_leaked_handle_recovered_at_checkpoint() {
        let (pool, _) = tracked_pool();

        let leaked = pool.get().unwrap();
        let id = leaked.id;
        drop(leaked);

        // Nothing happens until a checkpoint runs
        assert_eq!(pool.idle_len(), 0);
        assert_eq!(pool.pending_len(), 1);

        assert_eq!(pool.collect_leaked(), 1);
        assert_eq!(pool.idle_len(), 1);
        assert_eq!(pool.pending_len(), 0);
        assert_eq!(pool.stats().recovered, 1);

        assert_eq!(pool.get().unwrap().id, id);
    }

    #[test]
    fn test_recovered_counts_only_recycled() {
        let (pool, counters) = tracked_pool();
        let pool = pool.with_max_retained(1);

        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        drop(a);
        drop(b);

        assert_eq!(pool.collect_leaked(), 1);
        assert_eq!(pool.stats().recovered, 1);
        assert_eq!(pool.idle_len(), 1);
        assert_eq!(counters.released(), 1);
    }

    #[test]
    fn test_get_drains_leaked_objects() {
        let (pool, counters) = tracked_pool();

        let id = pool.get().unwrap().id;
        let again = pool.get().unwrap();

        assert_eq!(again.id, id);
        assert_eq!(counters.created(), 1);
    }

    #[test]
    fn test_recovered_object_is_rearmed() {
        let (pool, _) = tracked_pool();

        for _ in 0..3 {
            drop(pool.get().unwrap());
        }

        assert_eq!(pool.collect_leaked(), 1);
        assert_eq!(pool.stats().recovered, 3);
        assert_eq!(pool.stats().created, 1);
    }

    #[test]
    fn test_double_reclamation_is_noop() {
        let (pool, _) = tracked_pool();

        let mut handle = pool.get().unwrap();
        assert!(handle.handle_return(ReturnOrigin::EndOfLife));
        assert!(!handle.handle_return(ReturnOrigin::EndOfLife));
        assert!(!handle.handle_return(ReturnOrigin::Explicit));
        drop(handle);

        assert_eq!(pool.pending_len(), 1);
        assert_eq!(pool.collect_leaked(), 1);
        assert_eq!(pool.idle_len(), 1);
    }

    #[test]
    fn test_dispose_after_pool_dropped_releases() {
        let (pool, counters) = tracked_pool();

        let handle = pool.get().unwrap();
        drop(pool);

        assert!(!handle.dispose());
        assert_eq!(counters.released(), 1);
    }

    #[test]
    fn test_leak_after_pool_dropped_releases() {
        let (pool, counters) = tracked_pool();

        let mut handle = pool.get().unwrap();
        handle.fail_release = true;
        drop(pool);

        // Release failure is swallowed
        drop(handle);
        assert_eq!(counters.released(), 1);
    }

    #[test]
    fn test_disposed_guard_after_pool_dropped() {
        let (pool, counters) = tracked_pool();

        let mut handle = pool.get().unwrap();
        drop(pool);

        assert!(!handle.handle_return(ReturnOrigin::EndOfLife));
        assert!(handle.is_disposed());
        assert!(!handle.handle_return(ReturnOrigin::EndOfLife));
        drop(handle);

        assert_eq!(counters.released(), 1);
    }

    #[test]
    fn test_pending_released_when_pool_dropped() {
        let (pool, counters) = tracked_pool();

        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        drop(a);
        drop(b);
        assert_eq!(pool.pending_len(), 2);

        drop(pool);
        assert_eq!(counters.released(), 2);
    }

    #[test]
    fn test_reset_failure_releases_resources() {
        let (pool, counters) = tracked_pool();

        let mut handle = pool.get().unwrap();
        handle.fail_reset = true;

        assert!(!handle.dispose());
        assert_eq!(pool.idle_len(), 0);
        assert_eq!(counters.released(), 1);
        assert_eq!(pool.stats().reset_failures, 1);
    }

    #[test]
    fn test_capacity_releases_excess() {
        let (pool, counters) = tracked_pool();
        let pool = pool.with_max_retained(1);

        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        assert!(a.dispose());
        assert!(b.dispose());

        assert_eq!(pool.idle_len(), 1);
        assert_eq!(counters.released(), 1);
    }

    #[test]
    fn test_shutdown_releases_idle_and_pending() {
        let (pool, counters) = tracked_pool();

        let a = pool.get().unwrap();
        let b = pool.get().unwrap();
        assert!(a.dispose());
        drop(b);
        assert_eq!(pool.idle_len(), 1);
        assert_eq!(pool.pending_len(), 1);

        pool.shutdown();
        assert_eq!(pool.idle_len(), 0);
        assert_eq!(pool.pending_len(), 0);
        assert_eq!(counters.released(), 2);

        // Still usable after shutdown
        assert!(pool.get().unwrap().dispose());
        assert_eq!(pool.idle_len(), 1);
    }

    #[test]
    fn test_detach_leaves_pool() {
        let (pool, counters) = tracked_pool();

        let owned: Tracked = pool.get().unwrap().detach();
        assert_eq!(owned.id, 0);
        drop(owned);

        assert_eq!(pool.collect_leaked(), 0);
        assert_eq!(pool.idle_len(), 0);
        assert_eq!(counters.released(), 0);
    }

    #[test]
    fn test_return_object_rejects_foreign_handle() {
        let (pool_a, _) = tracked_pool();
        let (pool_b, _) = tracked_pool();

        let handle = pool_b.get().unwrap();
        assert!(!pool_a.return_object(handle));
        assert_eq!(pool_a.idle_len(), 0);
        assert_eq!(pool_b.pending_len(), 1);

        let own = pool_a.get().unwrap();
        assert!(pool_a.return_object(own));
        assert_eq!(pool_a.idle_len(), 1);
    }

    #[test]
    fn test_prewarm() {
        let (pool, counters) = tracked_pool();
        pool.prewarm(4).unwrap();

        assert_eq!(pool.idle_len(), 4);
        assert_eq!(counters.created(), 4);
        assert_eq!(pool.pending_len(), 0);
    }

    #[test]
    fn test_concurrent_leaks_and_disposals() {
        use std::thread;

        let (pool, counters) = tracked_pool();
        let pool = Arc::new(pool.with_max_retained(8));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for i in 0..200 {
                        let obj = pool.get().unwrap();
                        if (i + t) % 2 == 0 {
                            obj.dispose();
                        } else {
                            drop(obj);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        pool.collect_leaked();

        assert_eq!(pool.pending_len(), 0);
        assert!(pool.idle_len() <= 8);
        assert_eq!(counters.created(), pool.idle_len() + counters.released());
    }

    #[test]
    fn test_wrapper_actions() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let pool = AutoReturnPool::with_factory(move || {
            let counter = Arc::clone(&counter);
            PooledObjectWrapper::new(Vec::<u8>::new())
                .with_reset_action(|v| {
                    v.clear();
                    Ok(())
                })
                .with_release_action(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
        })
        .with_max_retained(0);

        let mut v = pool.get().unwrap();
        v.resource_mut().extend_from_slice(b"abc");
        assert!(v.dispose());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        fn assert_send<T: Send>() {}
        assert_send_sync::<AutoReturnPool<Tracked>>();
        assert_send::<Pooled<Tracked>>();
    }
}
