//! Producers: cached, intercepted instance sources for one graph position.

use std::fmt;
use std::sync::Arc;

use crate::consumer::ConsumerDescriptor;
use crate::container::{Container, ResolverContext, Scope};
use crate::error::DiResult;
use crate::instance::Instance;
use crate::lifestyle::{InstanceFactory, Lifestyle};
use crate::registration::{CompiledRegistration, Registration};
use crate::type_ref::TypeRef;

/// Cache key of a producer: the service asked for and who asks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProducerKey {
    pub service_type: TypeRef,
    pub consumer: ConsumerDescriptor,
}

impl ProducerKey {
    pub fn new(service_type: TypeRef, consumer: ConsumerDescriptor) -> Self {
        Self { service_type, consumer }
    }
}

/// Produces instances of a service for one consumer.
///
/// The container hands out one producer per [`ProducerKey`]; asking twice
/// for the same service from the same consumer returns the same `Arc`.
/// Producers of the same registration share its lifestyle cache, so a
/// singleton is the same instance whichever producer created it, while
/// interceptors are composed per producer.
pub struct Producer {
    key: ProducerKey,
    registration: Arc<Registration>,
    compiled: Arc<CompiledRegistration>,
    build: InstanceFactory,
}

impl Producer {
    pub(crate) fn new(
        key: ProducerKey,
        registration: Arc<Registration>,
        compiled: Arc<CompiledRegistration>,
        build: InstanceFactory,
    ) -> Self {
        Self { key, registration, compiled, build }
    }

    pub fn key(&self) -> &ProducerKey {
        &self.key
    }

    pub fn service_type(&self) -> TypeRef {
        self.key.service_type
    }

    pub fn consumer(&self) -> &ConsumerDescriptor {
        &self.key.consumer
    }

    pub fn registration(&self) -> &Arc<Registration> {
        &self.registration
    }

    pub fn lifestyle(&self) -> &Lifestyle {
        self.registration.lifestyle()
    }

    /// Producers of the constructor arguments and injected properties.
    pub fn dependencies(&self) -> &[Arc<Producer>] {
        &self.compiled.dependencies
    }

    /// Number of constructor parameters, for constructed registrations.
    pub fn constructor_parameter_count(&self) -> Option<usize> {
        self.compiled.parameter_count
    }

    /// Produces an instance outside of any scope.
    pub fn get_instance(&self, container: &Container) -> DiResult<Instance> {
        container.ensure_usable("get_instance")?;
        self.instance_with(&ResolverContext::new(container, None))
    }

    /// Produces an instance inside `scope`.
    pub fn get_instance_in(&self, scope: &Scope) -> DiResult<Instance> {
        scope.ensure_usable("get_instance")?;
        self.instance_with(&ResolverContext::new(scope.container(), Some(scope)))
    }

    #[inline]
    pub(crate) fn instance_with(&self, ctx: &ResolverContext<'_>) -> DiResult<Instance> {
        (self.build)(ctx)
    }
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("service_type", &self.key.service_type)
            .field("consumer", &self.key.consumer)
            .field("implementation_type", &self.registration.implementation_type())
            .field("lifestyle", self.registration.lifestyle())
            .finish()
    }
}
