//! Interceptors wrapped around producers.
//!
//! An interceptor receives the [`InitializationContext`] of the producer and a
//! `proceed` callback that runs the rest of the chain. It may call `proceed`
//! and return, wrap or replace its result, or skip it entirely.
//!
//! Interceptors are applied in registration order, each wrapping the previous
//! one, so the interceptor registered last runs first:
//!
//! ```rust
//! use ioc_weave::{Container, Lifestyle, TypeDescriptor};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Service;
//!
//! let container = Container::new();
//! container.describe(TypeDescriptor::of::<Service>().default_constructor()).unwrap();
//! container.register_concrete::<Service>(Lifestyle::transient()).unwrap();
//!
//! let trace = Arc::new(Mutex::new(Vec::new()));
//! for name in ["first", "second"] {
//!     let trace = trace.clone();
//!     container
//!         .add_interceptor(
//!             |_| true,
//!             move |_, proceed| {
//!                 trace.lock().unwrap().push(name);
//!                 proceed()
//!             },
//!         )
//!         .unwrap();
//! }
//!
//! container.get_instance::<Service>().unwrap();
//! assert_eq!(*trace.lock().unwrap(), vec!["second", "first"]);
//! ```
//!
//! Interceptors wrap the producer, outside the lifestyle cache, so they see
//! every resolution. Initializers registered with
//! [`Container::register_initializer`](crate::Container::register_initializer)
//! run inside it and see each created instance once.

use std::fmt;
use std::sync::Arc;

use crate::consumer::ConsumerDescriptor;
use crate::container::ResolverContext;
use crate::error::{ActivationCause, DiResult};
use crate::instance::Instance;
use crate::lifestyle::{InstanceFactory, Lifestyle};
use crate::registration::Registration;
use crate::type_ref::TypeRef;

/// Decides whether an interceptor applies to a producer. Evaluated once,
/// when the producer is built.
pub type InterceptorPredicate = Arc<dyn Fn(&InitializationContext) -> bool + Send + Sync>;

/// Wraps instance creation; the second argument continues the chain.
pub type Interceptor =
    Arc<dyn Fn(&InitializationContext, &dyn Fn() -> DiResult<Instance>) -> DiResult<Instance> + Send + Sync>;

/// Runs on a freshly created instance, exposed as its service type.
pub(crate) type Initializer = Arc<dyn Fn(&Instance) -> DiResult<()> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct InitializerEntry {
    pub(crate) service_type: TypeRef,
    pub(crate) initializer: Initializer,
}

#[derive(Clone)]
pub(crate) struct InterceptorEntry {
    pub(crate) predicate: InterceptorPredicate,
    pub(crate) interceptor: Interceptor,
}

/// What an interceptor knows about the producer it wraps.
#[derive(Clone)]
pub struct InitializationContext {
    service_type: TypeRef,
    consumer: ConsumerDescriptor,
    registration: Arc<Registration>,
}

impl InitializationContext {
    pub(crate) fn new(service_type: TypeRef, consumer: ConsumerDescriptor, registration: Arc<Registration>) -> Self {
        Self { service_type, consumer, registration }
    }

    pub fn service_type(&self) -> TypeRef {
        self.service_type
    }

    pub fn implementation_type(&self) -> TypeRef {
        self.registration.implementation_type()
    }

    pub fn consumer(&self) -> &ConsumerDescriptor {
        &self.consumer
    }

    pub fn lifestyle(&self) -> &Lifestyle {
        self.registration.lifestyle()
    }

    pub fn registration(&self) -> &Arc<Registration> {
        &self.registration
    }
}

impl fmt::Debug for InitializationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitializationContext")
            .field("service_type", &self.service_type)
            .field("consumer", &self.consumer)
            .field("implementation_type", &self.implementation_type())
            .finish()
    }
}

/// Wraps `inner` with every entry whose predicate accepts `context`.
pub(crate) fn compose(
    entries: &[InterceptorEntry],
    context: InitializationContext,
    inner: InstanceFactory,
) -> InstanceFactory {
    let context = Arc::new(context);
    entries
        .iter()
        .filter(|entry| (entry.predicate)(&context))
        .fold(inner, |next, entry| {
            let interceptor = entry.interceptor.clone();
            let context = context.clone();
            let wrapped: InstanceFactory = Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<Instance> {
                interceptor(&context, &|| next(ctx))
            });
            wrapped
        })
}

/// Runs the initializers of `registration`'s service on every instance
/// `creator` makes. Applied before the lifestyle, so cached instances are
/// initialized once.
pub(crate) fn initialize(
    entries: &[InitializerEntry],
    registration: &Registration,
    creator: InstanceFactory,
) -> InstanceFactory {
    let service = registration.service_type();
    let initializers: Vec<Initializer> = entries
        .iter()
        .filter(|entry| entry.service_type == service)
        .map(|entry| entry.initializer.clone())
        .collect();
    if initializers.is_empty() {
        return creator;
    }

    let cast = registration.cast().cloned();
    Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<Instance> {
        let instance = creator(ctx)?;
        let exposed = match &cast {
            Some(cast) => cast(&instance).ok_or_else(|| ActivationCause::BrokenBehavior {
                behavior: "plan compiler",
                reason: format!("produced a {} that can't be exposed as {}", instance.type_ref(), service),
            })?,
            None => instance.clone(),
        };
        for initializer in &initializers {
            initializer(&exposed)?;
        }
        Ok(instance)
    })
}
