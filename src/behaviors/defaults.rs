//! Behaviors a container starts with.

use std::sync::Arc;

use tracing::trace;

use super::{
    ConstructorResolutionBehavior, DependencyInjectionBehavior, LifestyleSelectionBehavior,
    PropertySelectionBehavior,
};
use crate::consumer::ConsumerDescriptor;
use crate::container::Container;
use crate::error::{ActivationCause, DiResult};
use crate::introspection::{ConstructorInfo, PropertyInfo, TypeIntrospector};
use crate::lifestyle::Lifestyle;
use crate::producer::Producer;
use crate::type_ref::TypeRef;

/// Requires exactly one constructor.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConstructorResolutionBehavior;

impl ConstructorResolutionBehavior for DefaultConstructorResolutionBehavior {
    fn select_constructor(
        &self,
        implementation: TypeRef,
        introspector: &dyn TypeIntrospector,
    ) -> DiResult<ConstructorInfo> {
        let mut constructors = introspector.constructors(implementation);
        if constructors.len() != 1 {
            return Err(ActivationCause::ConstructorCount {
                implementation,
                found: constructors.len(),
            }
            .into());
        }
        Ok(constructors.remove(0))
    }
}

/// Resolves dependencies through the container's registrations.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDependencyInjectionBehavior;

impl DependencyInjectionBehavior for DefaultDependencyInjectionBehavior {
    fn get_producer(
        &self,
        consumer: &ConsumerDescriptor,
        container: &Container,
        throw_on_failure: bool,
    ) -> DiResult<Option<Arc<Producer>>> {
        let Some(info) = consumer.info() else {
            return Err(ActivationCause::BrokenBehavior {
                behavior: "dependency injection",
                reason: "a dependency was requested on behalf of the root consumer".into(),
            }
            .into());
        };
        let service = info.target.target_type();
        match container.producer_for(service, consumer)? {
            Some(producer) => Ok(Some(producer)),
            None if throw_on_failure => Err(ActivationCause::UnresolvableDependency {
                service,
                reason: format!("it is required by {}", consumer),
            }
            .into()),
            None => {
                trace!(service = %service, consumer = %consumer, "optional dependency not found");
                Ok(None)
            }
        }
    }
}

/// Injects no properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPropertySelectionBehavior;

impl PropertySelectionBehavior for DefaultPropertySelectionBehavior {
    fn select_properties(&self, _: TypeRef, _: &dyn TypeIntrospector) -> Vec<PropertyInfo> {
        Vec::new()
    }
}

/// Uses the container's default lifestyle for everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLifestyleSelectionBehavior;

impl LifestyleSelectionBehavior for DefaultLifestyleSelectionBehavior {
    fn select_lifestyle(&self, _: TypeRef, default_lifestyle: &Lifestyle) -> DiResult<Lifestyle> {
        Ok(default_lifestyle.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspection::{TypeCatalog, TypeDescriptor};

    #[derive(Default)]
    struct One;
    struct Two;

    #[test]
    fn constructor_count_must_be_one() {
        let catalog = TypeCatalog::new();
        catalog.insert(TypeDescriptor::of::<One>().default_constructor());
        catalog.insert(
            TypeDescriptor::of::<Two>()
                .default_constructor_with(|| Two)
                .default_constructor_with(|| Two),
        );

        let behavior = DefaultConstructorResolutionBehavior;
        let ctor = behavior.select_constructor(TypeRef::of::<One>(), &catalog).unwrap();
        assert_eq!(ctor.declaring_type(), TypeRef::of::<One>());

        let err = behavior.select_constructor(TypeRef::of::<Two>(), &catalog).unwrap_err();
        assert_eq!(
            err.as_activation().unwrap().cause(),
            &ActivationCause::ConstructorCount { implementation: TypeRef::of::<Two>(), found: 2 }
        );

        let err = behavior.select_constructor(TypeRef::of::<u8>(), &catalog).unwrap_err();
        assert!(err.to_string().contains("but it has 0"));
    }

    #[test]
    fn default_lifestyle_is_passed_through() {
        let chosen = DefaultLifestyleSelectionBehavior
            .select_lifestyle(TypeRef::of::<One>(), &Lifestyle::singleton())
            .unwrap();
        assert_eq!(chosen, Lifestyle::singleton());
        assert!(DefaultPropertySelectionBehavior
            .select_properties(TypeRef::of::<One>(), &TypeCatalog::new())
            .is_empty());
    }
}
