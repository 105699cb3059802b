//! Type-keyed pool registry
//!
//! Maps an element type to exactly one pool. Pools are created lazily on
//! first use, either from a constructor registered at startup (type tag →
//! pool builder) or, on the typed paths, from `T::default()`.
//!
//! The registry is the only place pools are type-erased: it stores them
//! behind [`ErasedPool`], a thin wrapper over the typed [`ObjectPool`] API.

use crate::core::pool::Pool;
use crate::core::traits::ObjectPool;
use crate::infrastructure::config::{Config, PoolsConfig};
use crate::infrastructure::logging::REGISTRY_TARGET;
use crate::infrastructure::metrics::PoolStats;
use crate::{PoolError, Result};
use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

/// Process-wide registry
static GLOBAL_REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Runtime type token
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Type-erased view of an [`ObjectPool`]
pub trait ErasedPool: Send + Sync {
    /// Element type this pool hands out
    fn item_key(&self) -> TypeKey;

    /// Concrete pool type, for diagnostics
    fn pool_type_name(&self) -> &'static str;

    fn get_any(&self) -> Result<Box<dyn Any + Send>>;

    /// Hands `obj` back untouched when it is not this pool's element type
    fn return_any(
        &self,
        obj: Box<dyn Any + Send>,
    ) -> std::result::Result<bool, Box<dyn Any + Send>>;

    fn prewarm(&self, count: usize) -> Result<()>;

    fn shutdown(&self);

    fn idle_len(&self) -> usize;

    fn max_retained(&self) -> usize;

    fn set_max_retained(&self, max: usize);

    fn stats(&self) -> PoolStats;

    /// The typed pool behind this view, for downcasting
    fn as_any(&self) -> Arc<dyn Any + Send + Sync>;
}

struct Erased<P: ObjectPool>(Arc<P>);

impl<P: ObjectPool> ErasedPool for Erased<P> {
    fn item_key(&self) -> TypeKey {
        TypeKey::of::<P::Item>()
    }

    fn pool_type_name(&self) -> &'static str {
        type_name::<P>()
    }

    fn get_any(&self) -> Result<Box<dyn Any + Send>> {
        let item = self.0.get()?;
        Ok(Box::new(item))
    }

    fn return_any(
        &self,
        obj: Box<dyn Any + Send>,
    ) -> std::result::Result<bool, Box<dyn Any + Send>> {
        let item = obj.downcast::<P::Item>()?;
        Ok(self.0.return_object(*item))
    }

    fn prewarm(&self, count: usize) -> Result<()> {
        self.0.prewarm(count)
    }

    fn shutdown(&self) {
        self.0.shutdown();
    }

    fn idle_len(&self) -> usize {
        self.0.idle_len()
    }

    fn max_retained(&self) -> usize {
        self.0.max_retained()
    }

    fn set_max_retained(&self, max: usize) {
        self.0.set_max_retained(max);
    }

    fn stats(&self) -> PoolStats {
        self.0.stats()
    }

    fn as_any(&self) -> Arc<dyn Any + Send + Sync> {
        self.0.clone()
    }
}

fn erase<P: ObjectPool>(pool: Arc<P>) -> Arc<dyn ErasedPool> {
    Arc::new(Erased(pool))
}

/// Builds a pool for one element type; receives the configured retention cap
type PoolBuilder = Arc<dyn Fn(usize) -> Arc<dyn ErasedPool> + Send + Sync>;

struct Constructor {
    key: TypeKey,
    build: PoolBuilder,
}

/// Type-keyed pool registry
///
/// # Example
/// ```
/// use object_recycler::Registry;
///
/// #[derive(Default)]
/// struct Session {
///     user: String,
/// }
///
/// let registry = Registry::new();
/// let mut session: Session = registry.get_object().unwrap();
/// session.user.push_str("alice");
/// assert!(registry.return_object(session));
///
/// let again: Session = registry.get_object().unwrap();
/// assert_eq!(again.user, "alice");
/// ```
pub struct Registry {
    pools: RwLock<HashMap<TypeId, Arc<dyn ErasedPool>>>,
    constructors: RwLock<HashMap<TypeId, Constructor>>,
    config: PoolsConfig,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(PoolsConfig::default())
    }

    /// Registry whose lazily built pools take their retention caps from `config`
    pub fn with_config(config: PoolsConfig) -> Self {
        Self {
            pools: RwLock::new(HashMap::new()),
            constructors: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// The process-wide registry, created with default settings on first use
    pub fn global() -> &'static Self {
        GLOBAL_REGISTRY.get_or_init(Self::new)
    }

    /// Create the process-wide registry with explicit settings
    ///
    /// # Errors
    /// `PoolError::AlreadyInitialized` if `global()` or `init_global` ran before.
    pub fn init_global(config: PoolsConfig) -> Result<&'static Self> {
        GLOBAL_REGISTRY
            .set(Self::with_config(config))
            .map_err(|_| PoolError::AlreadyInitialized)?;
        tracing::info!(target: REGISTRY_TARGET, "Global pool registry initialized");
        Ok(Self::global())
    }

    /// Registry configured from a TOML file; a missing file means defaults
    ///
    /// # Errors
    /// `PoolError::Config` if the file exists but cannot be read or parsed.
    pub fn from_config_file(path: impl Into<PathBuf>) -> Result<Self> {
        let config = Config::load_from(path)?;
        Ok(Self::with_config(config.pools))
    }

    pub fn config(&self) -> &PoolsConfig {
        &self.config
    }

    /// Register `T::default()` as the constructor for `T`
    ///
    /// # Errors
    /// `PoolError::ZeroSizedType` for zero-sized `T`.
    pub fn register_type<T: Default + Send + 'static>(&self) -> Result<()> {
        ensure_poolable::<T>()?;
        self.insert_constructor(TypeKey::of::<T>(), Arc::new(default_builder::<T>));
        Ok(())
    }

    /// Register an explicit factory as the constructor for `T`
    pub fn register_factory<T, F>(&self, factory: F)
    where
        T: Send + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let factory = Arc::new(factory);
        self.insert_constructor(
            TypeKey::of::<T>(),
            Arc::new(move |max: usize| {
                let factory = Arc::clone(&factory);
                erase(Arc::new(
                    Pool::with_factory(move || (*factory)()).with_max_retained(max),
                ))
            }),
        );
    }

    /// Register a builder for a fully configured pool, keyed by its element type
    ///
    /// The builder's own retention cap is kept.
    pub fn register_builder<P, F>(&self, build: F)
    where
        P: ObjectPool,
        F: Fn() -> P + Send + Sync + 'static,
    {
        self.insert_constructor(
            TypeKey::of::<P::Item>(),
            Arc::new(move |_: usize| erase(Arc::new(build()))),
        );
    }

    fn insert_constructor(&self, key: TypeKey, build: PoolBuilder) {
        self.constructors
            .write()
            .insert(key.id(), Constructor { key, build });
    }

    pub fn has_constructor(&self, key: TypeKey) -> bool {
        self.constructors.read().contains_key(&key.id())
    }

    /// Install `pool` for its element type, replacing any existing one
    ///
    /// The replaced pool is returned as-is; it is not drained.
    pub fn register_pool<P: ObjectPool>(&self, pool: Arc<P>) -> Option<Arc<dyn ErasedPool>> {
        let key = TypeKey::of::<P::Item>();
        let previous = self.pools.write().insert(key.id(), erase(pool));
        if let Some(old) = &previous {
            tracing::warn!(
                target: REGISTRY_TARGET,
                "Pool for {} exists ({}), now replacing it with {}",
                key,
                old.pool_type_name(),
                type_name::<P>()
            );
        }
        previous
    }

    pub fn contains_pool(&self, key: TypeKey) -> bool {
        self.pools.read().contains_key(&key.id())
    }

    /// Existing pool for `key`, or one built from its registered constructor
    ///
    /// # Errors
    /// `PoolError::NoConstructor` when neither exists.
    pub fn get_pool(&self, key: TypeKey) -> Result<Arc<dyn ErasedPool>> {
        self.pool_by_id(key.id()).ok_or_else(|| {
            tracing::error!(
                target: REGISTRY_TARGET,
                "No pool or constructor registered for {}",
                key
            );
            PoolError::NoConstructor(key.name())
        })
    }

    /// Existing pool for `T`, or a new one built from its constructor or `T::default()`
    pub fn pool_for<T: Default + Send + 'static>(&self) -> Result<Arc<dyn ErasedPool>> {
        let key = TypeKey::of::<T>();
        if let Some(pool) = self.pool_by_id(key.id()) {
            return Ok(pool);
        }
        ensure_poolable::<T>()?;

        // Recorded as a constructor so runtime-token lookups can rebuild it after a clean
        self.constructors
            .write()
            .entry(key.id())
            .or_insert_with(|| Constructor {
                key,
                build: Arc::new(default_builder::<T>),
            });
        self.pool_by_id(key.id())
            .ok_or(PoolError::NoConstructor(key.name()))
    }

    /// The concrete pool registered for `P::Item`, if it is a `P`
    pub fn typed_pool<P: ObjectPool>(&self) -> Option<Arc<P>> {
        let erased = self.pools.read().get(&TypeId::of::<P::Item>()).cloned()?;
        erased.as_any().downcast::<P>().ok()
    }

    fn pool_by_id(&self, id: TypeId) -> Option<Arc<dyn ErasedPool>> {
        if let Some(pool) = self.pools.read().get(&id) {
            return Some(Arc::clone(pool));
        }

        let (key, build) = {
            let constructors = self.constructors.read();
            let ctor = constructors.get(&id)?;
            (ctor.key, Arc::clone(&ctor.build))
        };
        let pool = build(self.config.max_retained_for(key.name()));
        Some(self.install_lazily(key, pool))
    }

    /// Insert a freshly built pool unless another thread beat us to it
    fn install_lazily(&self, key: TypeKey, pool: Arc<dyn ErasedPool>) -> Arc<dyn ErasedPool> {
        let mut pools = self.pools.write();
        let installed = pools.entry(key.id()).or_insert_with(|| {
            tracing::debug!(target: REGISTRY_TARGET, "Created pool for {}", key);
            pool
        });
        Arc::clone(installed)
    }

    /// Take an instance of `T` from its pool, creating the pool on first use
    pub fn get_object<T: Default + Send + 'static>(&self) -> Result<T> {
        downcast_item(self.pool_for::<T>()?.get_any()?)
    }

    /// Take an instance of `T` from a pool that is registered or has a constructor
    ///
    /// `T` need not implement `Default`, so this also serves factory-built
    /// types and `Pooled<T>` handles from an `AutoReturnPool`.
    ///
    /// # Errors
    /// `PoolError::NoConstructor` when `T` has neither a pool nor a constructor.
    pub fn get_registered<T: Send + 'static>(&self) -> Result<T> {
        downcast_item(self.get_pool(TypeKey::of::<T>())?.get_any()?)
    }

    /// Take an instance by runtime type token
    pub fn get_object_by_key(&self, key: TypeKey) -> Result<Box<dyn Any + Send>> {
        self.get_pool(key)?.get_any()
    }

    /// Return an instance of `T` to its pool, creating the pool if needed
    pub fn return_object<T: Default + Send + 'static>(&self, obj: T) -> bool {
        match self.pool_for::<T>() {
            Ok(pool) => return_to(&*pool, Box::new(obj)),
            Err(e) => {
                tracing::error!(target: REGISTRY_TARGET, error = %e, "Cannot return object");
                false
            }
        }
    }

    /// Return an instance of `T` to a pool that is registered or has a constructor
    ///
    /// `false` when there is none; the instance is dropped in that case.
    pub fn return_registered<T: Send + 'static>(&self, obj: T) -> bool {
        self.return_any(Box::new(obj))
    }

    /// Return a boxed instance, resolving its pool from the runtime type
    ///
    /// `false` when the type has neither a pool nor a registered constructor.
    pub fn return_any(&self, obj: Box<dyn Any + Send>) -> bool {
        let id = (*obj).type_id();
        match self.pool_by_id(id) {
            Some(pool) => return_to(&*pool, obj),
            None => {
                tracing::error!(
                    target: REGISTRY_TARGET,
                    type_id = ?id,
                    "No pool or constructor registered for returned object"
                );
                false
            }
        }
    }

    /// Shut down every pool, then forget them all
    ///
    /// Registered constructors are kept, so later requests rebuild fresh pools.
    pub fn shutdown_all_pools_and_clean(&self) {
        let pools = std::mem::take(&mut *self.pools.write());
        for pool in pools.values() {
            pool.shutdown();
        }
        tracing::debug!(
            target: REGISTRY_TARGET,
            pools = pools.len(),
            "All pools shut down and registry cleared"
        );
    }

    /// Number of registered pools
    pub fn len(&self) -> usize {
        self.pools.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.read().is_empty()
    }

    /// Element types that currently have a pool
    pub fn keys(&self) -> Vec<TypeKey> {
        self.pools.read().values().map(|p| p.item_key()).collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("pools", &self.keys())
            .field("constructors", &self.constructors.read().len())
            .finish()
    }
}

fn ensure_poolable<T: 'static>() -> Result<()> {
    if std::mem::size_of::<T>() == 0 {
        return Err(PoolError::ZeroSizedType(type_name::<T>()));
    }
    Ok(())
}

fn downcast_item<T: 'static>(obj: Box<dyn Any + Send>) -> Result<T> {
    obj.downcast::<T>()
        .map(|obj| *obj)
        .map_err(|_| PoolError::TypeMismatch {
            expected: type_name::<T>(),
        })
}

/// Hand `obj` to a pool looked up by the object's own type
fn return_to(pool: &dyn ErasedPool, obj: Box<dyn Any + Send>) -> bool {
    match pool.return_any(obj) {
        Ok(accepted) => accepted,
        Err(rejected) => {
            let type_id = (*rejected).type_id();
            tracing::error!(
                target: REGISTRY_TARGET,
                pool = pool.pool_type_name(),
                type_id = ?type_id,
                "Pool rejected an object of a different type"
            );
            false
        }
    }
}

fn default_builder<T: Default + Send + 'static>(max: usize) -> Arc<dyn ErasedPool> {
    erase(Arc::new(Pool::<T>::new().with_max_retained(max)))
}
