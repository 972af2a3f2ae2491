//! Swappable strategies the graph builder consults.
//!
//! Each behavior answers one question while a registration is turned into a
//! build plan: which constructor to call, which producer supplies a
//! dependency, which properties to inject and which lifestyle an implicit
//! registration gets. The defaults live in [`defaults`]; replacements are
//! installed on the [`Container`](crate::Container) before the first
//! registration.
//!
//! A behavior that returns something unusable (a constructor of another type,
//! a read-only property, no producer where one was demanded) makes the build
//! fail with [`ActivationCause::BrokenBehavior`](crate::ActivationCause).

use std::sync::Arc;

use crate::consumer::ConsumerDescriptor;
use crate::container::Container;
use crate::error::DiResult;
use crate::introspection::{ConstructorInfo, PropertyInfo, TypeIntrospector};
use crate::lifestyle::Lifestyle;
use crate::producer::Producer;
use crate::type_ref::TypeRef;

pub mod defaults;

pub use defaults::{
    DefaultConstructorResolutionBehavior, DefaultDependencyInjectionBehavior,
    DefaultLifestyleSelectionBehavior, DefaultPropertySelectionBehavior,
};

/// Picks the constructor an implementation type is created through.
pub trait ConstructorResolutionBehavior: Send + Sync {
    fn select_constructor(
        &self,
        implementation: TypeRef,
        introspector: &dyn TypeIntrospector,
    ) -> DiResult<ConstructorInfo>;
}

/// Finds the producer that supplies a dependency to a consumer.
///
/// With `throw_on_failure` unset, a dependency that can't be resolved yields
/// `Ok(None)` instead of an error.
pub trait DependencyInjectionBehavior: Send + Sync {
    fn get_producer(
        &self,
        consumer: &ConsumerDescriptor,
        container: &Container,
        throw_on_failure: bool,
    ) -> DiResult<Option<Arc<Producer>>>;
}

/// Picks the properties to inject after construction.
pub trait PropertySelectionBehavior: Send + Sync {
    fn select_properties(
        &self,
        implementation: TypeRef,
        introspector: &dyn TypeIntrospector,
    ) -> Vec<PropertyInfo>;
}

/// Picks the lifestyle of registrations made without one.
pub trait LifestyleSelectionBehavior: Send + Sync {
    fn select_lifestyle(&self, implementation: TypeRef, default_lifestyle: &Lifestyle) -> DiResult<Lifestyle>;
}

/// The four behaviors a container uses.
#[derive(Clone)]
pub struct Behaviors {
    pub(crate) constructor_resolution: Arc<dyn ConstructorResolutionBehavior>,
    pub(crate) dependency_injection: Arc<dyn DependencyInjectionBehavior>,
    pub(crate) property_selection: Arc<dyn PropertySelectionBehavior>,
    pub(crate) lifestyle_selection: Arc<dyn LifestyleSelectionBehavior>,
}

impl Default for Behaviors {
    fn default() -> Self {
        Self {
            constructor_resolution: Arc::new(DefaultConstructorResolutionBehavior),
            dependency_injection: Arc::new(DefaultDependencyInjectionBehavior),
            property_selection: Arc::new(DefaultPropertySelectionBehavior),
            lifestyle_selection: Arc::new(DefaultLifestyleSelectionBehavior),
        }
    }
}
