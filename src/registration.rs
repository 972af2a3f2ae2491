//! Registrations: what the container knows how to produce.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::diagnostics::DiagnosticType;
use crate::error::ConfigurationError;
use crate::instance::Instance;
use crate::internal::FastMap;
use crate::lifestyle::{InstanceFactory, Lifestyle};
use crate::producer::Producer;
use crate::type_ref::TypeRef;

/// Converts an implementation instance into a service instance.
pub(crate) type CastFn = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;

/// Where the instances of a registration come from.
pub(crate) enum Creation {
    /// Built from a constructor selected by the behaviors.
    Constructed,
    /// A pre-built instance.
    Instance(Instance),
    /// A user delegate.
    Factory(InstanceFactory),
}

/// A justified opt-out of one diagnostic for one registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suppression {
    pub diagnostic: DiagnosticType,
    pub justification: String,
}

/// Maps a service type to an implementation and a lifestyle.
///
/// Registrations are created by the `register*` methods of
/// [`Container`](crate::Container), or implicitly when an unregistered concrete
/// type is resolved. Once the first producer for a registration is built, the
/// compiled instance factory is cached here so every producer of the same
/// registration shares one lifestyle cache.
pub struct Registration {
    id: usize,
    service_type: TypeRef,
    implementation_type: TypeRef,
    lifestyle: Lifestyle,
    creation: Creation,
    cast: Option<CastFn>,
    implicit: bool,
    suppressions: RwLock<Vec<Suppression>>,
    compiled: OnceCell<Arc<CompiledRegistration>>,
}

/// The lifestyle-wrapped factory and the producers it depends on.
pub(crate) struct CompiledRegistration {
    pub(crate) factory: InstanceFactory,
    pub(crate) dependencies: Vec<Arc<Producer>>,
    pub(crate) parameter_count: Option<usize>,
}

pub(crate) struct RegistrationParts {
    pub(crate) id: usize,
    pub(crate) service_type: TypeRef,
    pub(crate) implementation_type: TypeRef,
    pub(crate) lifestyle: Lifestyle,
    pub(crate) creation: Creation,
    pub(crate) cast: Option<CastFn>,
    pub(crate) implicit: bool,
}

impl Registration {
    pub(crate) fn new(parts: RegistrationParts) -> Self {
        Self {
            id: parts.id,
            service_type: parts.service_type,
            implementation_type: parts.implementation_type,
            lifestyle: parts.lifestyle,
            creation: parts.creation,
            cast: parts.cast,
            implicit: parts.implicit,
            suppressions: RwLock::new(Vec::new()),
            compiled: OnceCell::new(),
        }
    }

    /// Container-unique identifier.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn service_type(&self) -> TypeRef {
        self.service_type
    }

    pub fn implementation_type(&self) -> TypeRef {
        self.implementation_type
    }

    pub fn lifestyle(&self) -> &Lifestyle {
        &self.lifestyle
    }

    /// True for registrations the container made for an unregistered
    /// concrete type.
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    pub fn is_suppressed(&self, diagnostic: DiagnosticType) -> bool {
        self.suppressions
            .read()
            .iter()
            .any(|s| s.diagnostic == diagnostic)
    }

    pub fn suppressions(&self) -> Vec<Suppression> {
        self.suppressions.read().clone()
    }

    pub(crate) fn add_suppression(&self, suppression: Suppression) {
        let mut suppressions = self.suppressions.write();
        if !suppressions.iter().any(|s| s.diagnostic == suppression.diagnostic) {
            suppressions.push(suppression);
        }
    }

    pub(crate) fn creation(&self) -> &Creation {
        &self.creation
    }

    pub(crate) fn cast(&self) -> Option<&CastFn> {
        self.cast.as_ref()
    }

    pub(crate) fn compiled(&self) -> Option<&Arc<CompiledRegistration>> {
        self.compiled.get()
    }

    /// Stores `compiled` unless another thread got there first; returns
    /// whichever is now cached.
    pub(crate) fn publish_compiled(&self, compiled: Arc<CompiledRegistration>) -> Arc<CompiledRegistration> {
        self.compiled.get_or_init(move || compiled).clone()
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("service_type", &self.service_type)
            .field("implementation_type", &self.implementation_type)
            .field("lifestyle", &self.lifestyle)
            .field("implicit", &self.implicit)
            .finish()
    }
}

/// Explicit registrations in the order they were made.
#[derive(Default)]
pub(crate) struct Registry {
    ordered: Vec<Arc<Registration>>,
    index: FastMap<TypeRef, usize>,
}

impl Registry {
    pub(crate) fn insert(
        &mut self,
        registration: Arc<Registration>,
        allow_override: bool,
    ) -> Result<(), ConfigurationError> {
        let service = registration.service_type();
        match self.index.get(&service) {
            Some(_) if !allow_override => Err(ConfigurationError::DuplicateRegistration { service }),
            Some(&position) => {
                self.ordered[position] = registration;
                Ok(())
            }
            None => {
                self.index.insert(service, self.ordered.len());
                self.ordered.push(registration);
                Ok(())
            }
        }
    }

    #[inline]
    pub(crate) fn get(&self, service: TypeRef) -> Option<&Arc<Registration>> {
        self.index.get(&service).map(|&i| &self.ordered[i])
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<Registration>> {
        self.ordered.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.ordered.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Service;
    struct Other;

    fn registration(id: usize, service: TypeRef) -> Arc<Registration> {
        Arc::new(Registration::new(RegistrationParts {
            id,
            service_type: service,
            implementation_type: service,
            lifestyle: Lifestyle::transient(),
            creation: Creation::Constructed,
            cast: None,
            implicit: false,
        }))
    }

    #[test]
    fn duplicates_rejected_unless_overriding() {
        let mut registry = Registry::default();
        registry.insert(registration(1, TypeRef::of::<Service>()), false).unwrap();
        registry.insert(registration(2, TypeRef::of::<Other>()), false).unwrap();

        let err = registry
            .insert(registration(3, TypeRef::of::<Service>()), false)
            .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::DuplicateRegistration { service: TypeRef::of::<Service>() }
        );

        registry.insert(registration(4, TypeRef::of::<Service>()), true).unwrap();
        let ids: Vec<usize> = registry.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec![4, 2]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn suppressions_are_recorded_once() {
        let reg = registration(1, TypeRef::of::<Service>());
        assert!(!reg.is_suppressed(DiagnosticType::LifestyleMismatch));
        for _ in 0..2 {
            reg.add_suppression(Suppression {
                diagnostic: DiagnosticType::LifestyleMismatch,
                justification: "scope is owned by the caller".into(),
            });
        }
        assert!(reg.is_suppressed(DiagnosticType::LifestyleMismatch));
        assert!(!reg.is_suppressed(DiagnosticType::DisposableTransientComponent));
        assert_eq!(reg.suppressions().len(), 1);
    }
}
