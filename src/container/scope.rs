//! Scopes: the unit of caching for scoped lifestyles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::Container;
use crate::error::{DiResult, LockedOrDisposedError};
use crate::instance::Instance;
use crate::internal::{dispose_bag, DisposeBag, FastMap};
use crate::introspection::DisposalInfo;

/// Caches scoped instances for a unit of work, such as one request.
///
/// Singletons still come from the container; components with a scoped
/// lifestyle are created once per scope. Disposable scoped instances are
/// disposed, most recent first, when the scope is disposed or dropped.
///
/// ```
/// use ioc_weave::{Container, Lifestyle, TypeDescriptor};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct UnitOfWork;
///
/// let container = Container::new();
/// container.set_default_scoped_lifestyle(Lifestyle::flowing()).unwrap();
/// container.describe(TypeDescriptor::of::<UnitOfWork>().default_constructor()).unwrap();
/// container.register_concrete::<UnitOfWork>(Lifestyle::scoped()).unwrap();
///
/// let scope = container.begin_scope();
/// let a = scope.get_instance::<UnitOfWork>().unwrap();
/// let b = scope.get_instance::<UnitOfWork>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
///
/// let other = container.begin_scope();
/// assert!(!Arc::ptr_eq(&a, &other.get_instance::<UnitOfWork>().unwrap()));
/// assert!(container.get_instance::<UnitOfWork>().is_err());
/// ```
pub struct Scope {
    container: Container,
    instances: Mutex<FastMap<usize, Instance>>,
    disposers: Mutex<DisposeBag>,
    disposed: AtomicBool,
}

impl Scope {
    pub(crate) fn new(container: Container) -> Self {
        Self {
            container,
            instances: Mutex::new(FastMap::default()),
            disposers: Mutex::new(DisposeBag::default()),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn get_instance<S>(&self) -> DiResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.ensure_usable("get_instance")?;
        self.container.resolve_root::<S>(Some(self))
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Disposes every tracked scoped instance. Later calls do nothing.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let hooks = self.disposers.lock().drain_reverse();
        self.instances.lock().clear();
        debug!(disposed = hooks.len(), "disposing scope");
        dispose_bag::run_all(hooks);
    }

    pub(crate) fn ensure_usable(&self, operation: &'static str) -> DiResult<()> {
        if self.is_disposed() {
            return Err(LockedOrDisposedError::Disposed { operation }.into());
        }
        self.container.ensure_usable(operation)
    }

    /// Returns the scope's instance for a registration, creating it if needed.
    ///
    /// `create` runs without holding the scope lock so it can resolve other
    /// scoped components; if two threads race, the first stored instance wins
    /// and the other one is disposed on the spot.
    pub(crate) fn get_or_create<F>(&self, id: usize, create: F, disposal: Option<&DisposalInfo>) -> DiResult<Instance>
    where
        F: FnOnce() -> DiResult<Instance>,
    {
        if let Some(instance) = self.instances.lock().get(&id) {
            return Ok(instance.clone());
        }
        let created = create()?;
        let winner = {
            let mut instances = self.instances.lock();
            match instances.get(&id) {
                Some(existing) => Some(existing.clone()),
                None => {
                    instances.insert(id, created.clone());
                    None
                }
            }
        };
        if let Some(existing) = winner {
            if let Some(disposal) = disposal {
                debug!(instance = %created.type_ref(), "disposing scoped instance that lost a creation race");
                disposal.dispose(&created);
            }
            return Ok(existing);
        }
        if let Some(disposal) = disposal {
            let (disposal, tracked) = (disposal.clone(), created.clone());
            self.disposers
                .lock()
                .push(Box::new(move || disposal.dispose(&tracked)));
        }
        Ok(created)
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("instances", &self.instances.lock().len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
