//! Resolution context handed to factories and lifestyles.

use std::sync::Arc;

use super::{Container, Scope};
use crate::error::DiResult;

/// The container and scope a resolution runs in.
///
/// Factory registrations receive one to resolve their own dependencies; those
/// resolutions stay in the same scope.
///
/// ```rust
/// use ioc_weave::{Container, Lifestyle};
/// use std::sync::Arc;
///
/// struct Config { url: &'static str }
/// struct Client { url: &'static str }
///
/// let container = Container::new();
/// container.register_instance(Arc::new(Config { url: "db://local" })).unwrap();
/// container
///     .register_factory::<Client, _>(Lifestyle::transient(), |ctx| {
///         let config = ctx.get_instance::<Config>()?;
///         Ok(Arc::new(Client { url: config.url }))
///     })
///     .unwrap();
///
/// assert_eq!(container.get_instance::<Client>().unwrap().url, "db://local");
/// ```
#[derive(Clone, Copy)]
pub struct ResolverContext<'a> {
    container: &'a Container,
    scope: Option<&'a Scope>,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(container: &'a Container, scope: Option<&'a Scope>) -> Self {
        Self { container, scope }
    }

    pub fn container(&self) -> &'a Container {
        self.container
    }

    /// The active scope, if the resolution started from one.
    pub fn scope(&self) -> Option<&'a Scope> {
        self.scope
    }

    /// Resolves `S` as a root service within the same scope.
    pub fn get_instance<S>(&self) -> DiResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.container.resolve_root::<S>(self.scope)
    }
}
