//! Disposal trait for resource cleanup.

/// Synchronous resource disposal.
///
/// Implement this for components that need structured teardown (flushing
/// buffers, closing connections) and declare it on the type's descriptor with
/// [`DescriptorBuilder::disposable`](crate::DescriptorBuilder::disposable).
/// Singletons are disposed with the container, scoped instances with their
/// scope, most recently created first. Transient instances are never tracked,
/// which is why the verifier warns about disposable transients.
///
/// # Examples
///
/// ```
/// use ioc_weave::{Container, Dispose, Lifestyle, TypeDescriptor};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Default)]
/// struct Cache {
///     flushed: AtomicBool,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         self.flushed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let container = Container::new();
/// container.describe(TypeDescriptor::of::<Cache>().default_constructor().disposable()).unwrap();
/// container.register_concrete::<Cache>(Lifestyle::singleton()).unwrap();
///
/// let cache = container.get_instance::<Cache>().unwrap();
/// container.dispose();
/// assert!(cache.flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
