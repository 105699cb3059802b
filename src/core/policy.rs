//! Reset and destroy hooks
//!
//! A pool consults its policy at two points:
//! - `reset` when an instance comes back, to restore a reusable baseline
//! - `destroy` when an instance leaves for good (pool full, reset failed, shutdown)

use crate::ResetError;
use std::fmt;

/// Reset/destroy hooks for a pool of `T`
///
/// Both hooks default to doing nothing beyond dropping the instance.
pub trait PoolPolicy<T>: Send + Sync + 'static {
    /// Restore `obj` to a reusable baseline
    ///
    /// An error keeps `obj` out of the idle set; it is destroyed instead.
    fn reset(&self, _obj: &mut T) -> Result<(), ResetError> {
        Ok(())
    }

    /// Release whatever `obj` holds before it is dropped
    fn destroy(&self, obj: T) {
        drop(obj);
    }
}

/// Recycle instances as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPolicy;

impl<T> PoolPolicy<T> for NoopPolicy {}

/// Capability of restoring internal state for reuse
///
/// # Example
/// ```
/// use object_recycler::{ObjectPool, Pool, Resettable, ResetError};
///
/// #[derive(Default)]
/// struct Frame {
///     bytes: Vec<u8>,
/// }
///
/// impl Resettable for Frame {
///     fn reset_state(&mut self) -> Result<(), ResetError> {
///         self.bytes.clear();
///         Ok(())
///     }
/// }
///
/// let pool = Pool::<Frame>::resettable();
/// let mut frame = pool.get().unwrap();
/// frame.bytes.extend_from_slice(b"payload");
/// pool.return_object(frame);
/// assert!(pool.get().unwrap().bytes.is_empty());
/// ```
pub trait Resettable {
    fn reset_state(&mut self) -> Result<(), ResetError>;
}

impl Resettable for String {
    fn reset_state(&mut self) -> Result<(), ResetError> {
        self.clear();
        Ok(())
    }
}

impl<T> Resettable for Vec<T> {
    fn reset_state(&mut self) -> Result<(), ResetError> {
        self.clear();
        Ok(())
    }
}

/// Delegates `reset` to [`Resettable::reset_state`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetStatePolicy;

impl<T: Resettable> PoolPolicy<T> for ResetStatePolicy {
    #[inline]
    fn reset(&self, obj: &mut T) -> Result<(), ResetError> {
        obj.reset_state()
    }
}

type ResetFn<T> = Box<dyn Fn(&mut T) -> Result<(), ResetError> + Send + Sync>;
type DestroyFn<T> = Box<dyn Fn(T) + Send + Sync>;

/// Policy assembled from closures
///
/// ```
/// use object_recycler::{FnPolicy, ObjectPool, Pool};
///
/// let policy = FnPolicy::new().on_reset(|buf: &mut Vec<u8>| {
///     buf.clear();
///     Ok(())
/// });
/// let pool = Pool::with_factory(Vec::new).with_policy(policy);
/// # let _ = pool.get();
/// ```
pub struct FnPolicy<T> {
    reset: Option<ResetFn<T>>,
    destroy: Option<DestroyFn<T>>,
}

impl<T> FnPolicy<T> {
    pub fn new() -> Self {
        Self {
            reset: None,
            destroy: None,
        }
    }

    pub fn on_reset<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut T) -> Result<(), ResetError> + Send + Sync + 'static,
    {
        self.reset = Some(Box::new(f));
        self
    }

    pub fn on_destroy<F>(mut self, f: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.destroy = Some(Box::new(f));
        self
    }
}

impl<T> Default for FnPolicy<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for FnPolicy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPolicy")
            .field("reset", &self.reset.is_some())
            .field("destroy", &self.destroy.is_some())
            .finish()
    }
}

impl<T: 'static> PoolPolicy<T> for FnPolicy<T> {
    fn reset(&self, obj: &mut T) -> Result<(), ResetError> {
        match &self.reset {
            Some(reset) => reset(obj),
            None => Ok(()),
        }
    }

    fn destroy(&self, obj: T) {
        if let Some(destroy) = &self.destroy {
            destroy(obj);
        }
    }
}
