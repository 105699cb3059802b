//! Test utilities: instrumented pool elements
//!
//! Probes count every hook the pool runs on them so tests can assert
//! exactly how many instances were created, reset, destroyed or released.

use crate::core::{pool::Pool, PoolPolicy, PooledObject};
use crate::{ReleaseError, ResetError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared hook counters
#[derive(Debug, Default)]
pub struct ProbeCounters {
    created: AtomicUsize,
    resets: AtomicUsize,
    destroyed: AtomicUsize,
    released: AtomicUsize,
}

impl ProbeCounters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    fn next_id(&self) -> usize {
        self.created.fetch_add(1, Ordering::SeqCst)
    }
}

/// Plain pool element with a unique id
#[derive(Debug)]
pub struct Probe {
    pub id: usize,
    pub dirty: bool,
    pub fail_reset: bool,
}

struct ProbePolicy {
    counters: Arc<ProbeCounters>,
}

impl PoolPolicy<Probe> for ProbePolicy {
    fn reset(&self, obj: &mut Probe) -> Result<(), ResetError> {
        if obj.fail_reset {
            return Err(ResetError::new(format!("probe {} refused reset", obj.id)));
        }
        self.counters.resets.fetch_add(1, Ordering::SeqCst);
        obj.dirty = false;
        Ok(())
    }

    fn destroy(&self, _obj: Probe) {
        self.counters.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Pool of probes sharing the given counters
pub fn probe_pool_with(counters: Arc<ProbeCounters>) -> Pool<Probe> {
    let factory_counters = Arc::clone(&counters);
    Pool::with_factory(move || Probe {
        id: factory_counters.next_id(),
        dirty: false,
        fail_reset: false,
    })
    .with_policy(ProbePolicy { counters })
}

/// Pool of probes plus its counters
pub fn probe_pool() -> (Pool<Probe>, Arc<ProbeCounters>) {
    let counters = Arc::new(ProbeCounters::default());
    (probe_pool_with(Arc::clone(&counters)), counters)
}

/// Auto-returning element that records its lifecycle hooks
#[derive(Debug)]
pub struct Tracked {
    pub id: usize,
    pub dirty: bool,
    pub fail_reset: bool,
    pub fail_release: bool,
    counters: Arc<ProbeCounters>,
}

impl Tracked {
    pub fn new(counters: &Arc<ProbeCounters>) -> Self {
        Self {
            id: counters.next_id(),
            dirty: false,
            fail_reset: false,
            fail_release: false,
            counters: Arc::clone(counters),
        }
    }
}

impl PooledObject for Tracked {
    fn on_reset_state(&mut self) -> Result<(), ResetError> {
        if self.fail_reset {
            return Err(ResetError::new(format!("tracked {} refused reset", self.id)));
        }
        self.counters.resets.fetch_add(1, Ordering::SeqCst);
        self.dirty = false;
        Ok(())
    }

    fn on_release_resources(&mut self) -> Result<(), ReleaseError> {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        if self.fail_release {
            return Err(ReleaseError::new("socket already closed"));
        }
        Ok(())
    }
}

/// Zero-sized marker type
#[derive(Debug, Default)]
pub struct Marker;

/// Heap-backed element with a default constructor
#[derive(Debug, Default)]
pub struct Session {
    pub user: String,
    pub scratch: Vec<u8>,
}
