//! The container: configuration, locking and resolution.
//!
//! A [`Container`] starts Unlocked, accepting registrations, behavior
//! replacements, interceptors and option changes. The first resolution (or an
//! explicit [`Container::lock`]) locks it: locking listeners run once, the
//! configuration is frozen, and from then on every mutating call fails with
//! [`LockedOrDisposedError`]. Disposal is a separate flag that wins over the
//! lock state when errors are reported.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::consumer::ConsumerDescriptor;
use crate::diagnostics::VerificationOption;
use crate::error::{ActivationCause, ConfigurationError, DiResult, LockedOrDisposedError};
use crate::graph::{self, ProducerCache};
use crate::internal::{dispose_bag, DisposeBag, FastMap};
use crate::introspection::{TypeCatalog, TypeIntrospector};
use crate::options::ContainerOptions;
use crate::producer::Producer;
use crate::registration::{Creation, Registration, RegistrationParts};
use crate::type_ref::TypeRef;

mod config;
mod configure;
mod context;
mod lock;
mod scope;

pub(crate) use config::{Configuration, FrozenConfiguration};
pub use context::ResolverContext;
pub use lock::ContainerState;
pub use scope::Scope;

use lock::{LockOutcome, LockState};

/// Inversion-of-control container.
///
/// Cloning is cheap; clones share the same configuration, producers and
/// singletons.
///
/// # Examples
///
/// ```
/// use ioc_weave::{Arguments, Container, Lifestyle, ParameterInfo, TypeDescriptor};
/// use std::sync::Arc;
///
/// trait Repository: Send + Sync {
///     fn name(&self) -> &'static str;
/// }
///
/// #[derive(Default)]
/// struct SqlRepository;
/// impl Repository for SqlRepository {
///     fn name(&self) -> &'static str { "sql" }
/// }
///
/// struct Handler {
///     repository: Arc<dyn Repository>,
/// }
///
/// let container = Container::new();
/// container.describe(TypeDescriptor::of::<SqlRepository>().default_constructor()).unwrap();
/// container
///     .describe(TypeDescriptor::of::<Handler>().constructor(
///         vec![ParameterInfo::of::<dyn Repository>("repository")],
///         |args: &Arguments| Ok(Handler { repository: args.get::<dyn Repository>(0)? }),
///     ))
///     .unwrap();
///
/// container
///     .register::<dyn Repository, SqlRepository, _>(Lifestyle::singleton(), |r| r as Arc<dyn Repository>)
///     .unwrap();
///
/// // Handler is concrete and described, so it resolves without a registration.
/// let handler = container.get_instance::<Handler>().unwrap();
/// assert_eq!(handler.repository.name(), "sql");
/// assert!(container.is_locked());
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

pub(crate) struct ContainerInner {
    lock: LockState,
    config: RwLock<Option<Configuration>>,
    frozen: OnceCell<FrozenConfiguration>,
    catalog: Option<Arc<TypeCatalog>>,
    producers: ProducerCache,
    implicit: RwLock<FastMap<TypeRef, Arc<Registration>>>,
    disposers: Mutex<DisposeBag>,
    auto_verified: OnceCell<()>,
    next_registration_id: AtomicUsize,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// Creates a container whose types are described through
    /// [`Container::describe`].
    pub fn new() -> Self {
        let catalog = Arc::new(TypeCatalog::new());
        Self::build(Some(catalog.clone()), catalog)
    }

    /// Creates a container that queries a custom introspector for type
    /// metadata. [`Container::describe`] is unavailable on it.
    pub fn with_introspector(introspector: Arc<dyn TypeIntrospector>) -> Self {
        Self::build(None, introspector)
    }

    fn build(catalog: Option<Arc<TypeCatalog>>, introspector: Arc<dyn TypeIntrospector>) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                lock: LockState::new(),
                config: RwLock::new(Some(Configuration::new(ContainerOptions::new(introspector)))),
                frozen: OnceCell::new(),
                catalog,
                producers: ProducerCache::default(),
                implicit: RwLock::new(FastMap::default()),
                disposers: Mutex::new(DisposeBag::default()),
                auto_verified: OnceCell::new(),
                next_registration_id: AtomicUsize::new(0),
            }),
        }
    }

    pub fn state(&self) -> ContainerState {
        self.inner.lock.state()
    }

    pub fn is_locked(&self) -> bool {
        self.state() == ContainerState::Locked
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock.is_disposed()
    }

    /// Locks the container without resolving anything.
    ///
    /// Locking listeners run on the calling thread. Calling `lock` from a
    /// listener, or on a locked container, does nothing.
    pub fn lock(&self) -> DiResult<()> {
        self.inner.lock.check_not_disposed("lock")?;
        self.ensure_locked();
        Ok(())
    }

    /// Registers a callback that runs once, on the thread that locks the
    /// container, before the configuration is frozen.
    ///
    /// The callback may still register or intercept. Resolving from it fails
    /// with [`ConfigurationError::ResolveWhileLocking`].
    pub fn on_locking<F>(&self, listener: F) -> DiResult<()>
    where
        F: FnOnce(&Container) + Send + 'static,
    {
        self.inner.lock.add_listener(Box::new(listener))?;
        Ok(())
    }

    /// Resolves `S` outside of any scope.
    pub fn get_instance<S>(&self) -> DiResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.resolve_root::<S>(None)
    }

    /// Starts a scope for scoped lifestyles.
    pub fn begin_scope(&self) -> Scope {
        Scope::new(self.clone())
    }

    /// The root producer of `service`, building the graph behind it.
    pub fn get_producer(&self, service: TypeRef) -> DiResult<Arc<Producer>> {
        let frozen = self.frozen("get_producer")?;
        if frozen.options().enable_auto_verification() && self.inner.auto_verified.get().is_none() {
            self.verify_frozen(frozen, VerificationOption::VerifyAndDiagnose)?;
            let _ = self.inner.auto_verified.set(());
        }
        self.root_producer(frozen, service)
    }

    /// The producer of `service` for `consumer`, or `None` if nothing is
    /// registered for it and it can't be registered implicitly.
    ///
    /// This is what the default dependency injection behavior calls; custom
    /// behaviors can use it to delegate.
    pub fn producer_for(&self, service: TypeRef, consumer: &ConsumerDescriptor) -> DiResult<Option<Arc<Producer>>> {
        let frozen = self.frozen("producer_for")?;
        match self.registration_for(frozen, service)? {
            Some(registration) => graph::build_producer(self, frozen, service, *consumer, registration).map(Some),
            None => Ok(None),
        }
    }

    /// Explicit registrations, in registration order.
    pub fn registrations(&self) -> Vec<Arc<Registration>> {
        {
            let config = self.inner.config.read();
            if let Some(config) = config.as_ref() {
                return config.registry.iter().cloned().collect();
            }
        }
        self.inner
            .frozen
            .get()
            .map(|frozen| frozen.registry().iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of producers built so far.
    pub fn producer_count(&self) -> usize {
        self.inner.producers.len()
    }

    /// Disposes singletons in reverse creation order and marks the container
    /// disposed. Later calls do nothing.
    pub fn dispose(&self) {
        if !self.inner.lock.mark_disposed() {
            return;
        }
        let hooks = self.inner.disposers.lock().drain_reverse();
        debug!(disposed = hooks.len(), "disposing container");
        dispose_bag::run_all(hooks);
    }

    pub(crate) fn ensure_usable(&self, operation: &'static str) -> DiResult<()> {
        self.inner.lock.check_not_disposed(operation)?;
        Ok(())
    }

    pub(crate) fn resolve_root<S>(&self, scope: Option<&Scope>) -> DiResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let service = TypeRef::of::<S>();
        let producer = self.get_producer(service)?;
        let instance = producer.instance_with(&ResolverContext::new(self, scope))?;
        instance.downcast::<S>().ok_or_else(|| {
            ActivationCause::BrokenBehavior {
                behavior: "plan compiler",
                reason: format!("the producer of {} returned a {}", service, instance.type_ref()),
            }
            .into()
        })
    }

    pub(crate) fn track_disposal(&self, hook: Box<dyn FnOnce() + Send>) {
        self.inner.disposers.lock().push(hook);
    }

    pub(crate) fn producer_cache(&self) -> &ProducerCache {
        &self.inner.producers
    }

    pub(crate) fn next_registration_id(&self) -> usize {
        self.inner.next_registration_id.fetch_add(1, Ordering::Relaxed)
    }

    /// The frozen configuration, locking first if needed.
    pub(crate) fn frozen(&self, operation: &'static str) -> DiResult<&FrozenConfiguration> {
        self.inner.lock.check_not_disposed(operation)?;
        if let Some(frozen) = self.inner.frozen.get() {
            return Ok(frozen);
        }
        if self.ensure_locked() == LockOutcome::Reentrant {
            return Err(ConfigurationError::ResolveWhileLocking.into());
        }
        self.inner
            .frozen
            .get()
            .ok_or_else(|| ConfigurationError::ResolveWhileLocking.into())
    }

    pub(crate) fn root_producer(&self, frozen: &FrozenConfiguration, service: TypeRef) -> DiResult<Arc<Producer>> {
        match self.registration_for(frozen, service)? {
            Some(registration) => {
                graph::build_producer(self, frozen, service, ConsumerDescriptor::Root, registration)
            }
            None => Err(ActivationCause::UnresolvableDependency {
                service,
                reason: "it is not registered and can't be created implicitly".into(),
            }
            .into()),
        }
    }

    /// Applies `f` to the live configuration, if it may still change.
    pub(crate) fn mutate<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Configuration) -> DiResult<R>,
    ) -> DiResult<R> {
        self.inner.lock.check_mutable(operation)?;
        let mut config = self.inner.config.write();
        let config = config
            .as_mut()
            .ok_or(LockedOrDisposedError::Locked { operation })?;
        f(config)
    }

    /// Reads the options, live or frozen.
    pub(crate) fn read_options<R>(&self, f: impl FnOnce(&ContainerOptions) -> R) -> R {
        let config = self.inner.config.read();
        match (config.as_ref(), self.inner.frozen.get()) {
            (Some(config), _) => f(&config.options),
            (None, Some(frozen)) => f(frozen.options()),
            (None, None) => unreachable!("configuration is frozen before it is taken"),
        }
    }

    pub(crate) fn catalog_ref(&self) -> Option<&Arc<TypeCatalog>> {
        self.inner.catalog.as_ref()
    }

    fn ensure_locked(&self) -> LockOutcome {
        self.inner.lock.lock_with(
            |listeners| {
                debug!(listeners = listeners.len(), "locking container");
                for listener in listeners {
                    listener(self);
                }
            },
            || self.freeze(),
        )
    }

    fn freeze(&self) {
        let mut config = self.inner.config.write();
        if let Some(config) = config.take() {
            let registrations = config.registry.len();
            let interceptors = config.interceptors.len();
            let _ = self.inner.frozen.set(config.freeze());
            debug!(registrations, interceptors, "container locked");
        }
    }

    fn registration_for(&self, frozen: &FrozenConfiguration, service: TypeRef) -> DiResult<Option<Arc<Registration>>> {
        if let Some(registration) = frozen.registry().get(service) {
            return Ok(Some(registration.clone()));
        }
        let options = frozen.options();
        if !options.resolve_unregistered_concrete_types() || !options.introspector.is_concrete(service) {
            return Ok(None);
        }
        if let Some(registration) = self.inner.implicit.read().get(&service) {
            return Ok(Some(registration.clone()));
        }

        let lifestyle = options
            .behaviors
            .lifestyle_selection
            .select_lifestyle(service, options.default_lifestyle())?;
        let lifestyle = options
            .concrete_lifestyle(lifestyle, service)
            .map_err(|e| ActivationCause::LifestyleSelection {
                implementation: service,
                reason: e.to_string(),
            })?;
        let candidate = Arc::new(Registration::new(RegistrationParts {
            id: self.next_registration_id(),
            service_type: service,
            implementation_type: service,
            lifestyle,
            creation: Creation::Constructed,
            cast: None,
            implicit: true,
        }));
        let registration = self
            .inner
            .implicit
            .write()
            .entry(service)
            .or_insert(candidate)
            .clone();
        debug!(service = %service, lifestyle = %registration.lifestyle(), "implicit registration");
        Ok(Some(registration))
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        let undisposed = self.disposers.get_mut().len();
        if undisposed > 0 && !self.lock.is_disposed() {
            warn!(undisposed, "container dropped with undisposed instances; call Container::dispose() first");
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("state", &self.state())
            .field("disposed", &self.is_disposed())
            .field("producers", &self.producer_count())
            .finish()
    }
}
