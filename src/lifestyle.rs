//! Lifestyles: how long a produced instance is reused.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::trace;

use crate::container::ResolverContext;
use crate::error::{ActivationCause, DiResult};
use crate::instance::Instance;
use crate::internal::circular::InitGate;
use crate::introspection::DisposalInfo;
use crate::registration::Registration;

/// Creates one instance for a resolution; what lifestyles wrap.
pub type InstanceFactory = Arc<dyn Fn(&ResolverContext<'_>) -> DiResult<Instance> + Send + Sync>;

/// Length of [`Lifestyle::transient`].
pub const TRANSIENT_LENGTH: u32 = 1;
/// Length of the scoped lifestyles.
pub const SCOPED_LENGTH: u32 = 500;
/// Length of [`Lifestyle::singleton`].
pub const SINGLETON_LENGTH: u32 = 1000;

/// Caching policy of a user-defined lifestyle.
///
/// `apply` receives the factory that creates a fresh instance and returns the
/// factory consumers will call. `disposal` is set when the implementation
/// needs disposing; strategies that cache instances should track them.
pub trait LifestyleStrategy: Send + Sync {
    fn apply(
        &self,
        registration: &Registration,
        creator: InstanceFactory,
        disposal: Option<DisposalInfo>,
    ) -> InstanceFactory;

    /// Whether instances are cached per scope.
    fn is_scoped(&self) -> bool {
        false
    }
}

#[derive(Clone)]
enum Policy {
    Transient,
    Singleton,
    Flowing,
    ScopedPlaceholder,
    Custom(Arc<dyn LifestyleStrategy>),
}

/// Lifetime policy of a registration.
///
/// The `length` orders lifestyles by how long instances live; a component
/// should not depend on a component with a shorter lifestyle, which the
/// verifier reports as a lifestyle mismatch.
///
/// [`Lifestyle::scoped`] is a placeholder: registrations made with it get the
/// container's default scoped lifestyle.
///
/// ```rust
/// use ioc_weave::Lifestyle;
///
/// assert!(Lifestyle::transient().length() < Lifestyle::flowing().length());
/// assert!(Lifestyle::flowing().length() < Lifestyle::singleton().length());
/// assert!(Lifestyle::scoped().is_placeholder());
/// assert!(Lifestyle::flowing().is_scoped());
/// ```
#[derive(Clone)]
pub struct Lifestyle {
    name: Arc<str>,
    length: u32,
    policy: Policy,
}

impl Lifestyle {
    /// A new instance for every consumer and every resolution.
    pub fn transient() -> Self {
        Self::builtin("Transient", TRANSIENT_LENGTH, Policy::Transient)
    }

    /// One instance for the lifetime of the container.
    pub fn singleton() -> Self {
        Self::builtin("Singleton", SINGLETON_LENGTH, Policy::Singleton)
    }

    /// One instance per [`Scope`](crate::Scope), the scope being the one the
    /// resolution started from.
    pub fn flowing() -> Self {
        Self::builtin("Flowing", SCOPED_LENGTH, Policy::Flowing)
    }

    /// Stands for the container's default scoped lifestyle.
    pub fn scoped() -> Self {
        Self::builtin("Scoped", SCOPED_LENGTH, Policy::ScopedPlaceholder)
    }

    pub fn custom(name: impl Into<Arc<str>>, length: u32, strategy: Arc<dyn LifestyleStrategy>) -> Self {
        Self {
            name: name.into(),
            length,
            policy: Policy::Custom(strategy),
        }
    }

    fn builtin(name: &'static str, length: u32, policy: Policy) -> Self {
        Self {
            name: Arc::from(name),
            length,
            policy,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.policy, Policy::ScopedPlaceholder)
    }

    pub fn is_transient(&self) -> bool {
        matches!(self.policy, Policy::Transient)
    }

    pub fn is_scoped(&self) -> bool {
        match &self.policy {
            Policy::Flowing | Policy::ScopedPlaceholder => true,
            Policy::Custom(strategy) => strategy.is_scoped(),
            Policy::Transient | Policy::Singleton => false,
        }
    }

    /// Wraps `creator` with this lifestyle's caching.
    pub(crate) fn apply(
        &self,
        registration: &Registration,
        creator: InstanceFactory,
        disposal: Option<DisposalInfo>,
    ) -> InstanceFactory {
        match &self.policy {
            Policy::Transient => creator,
            Policy::Singleton => singleton(registration, creator, disposal),
            Policy::Flowing => flowing(registration, self.name.clone(), creator, disposal),
            Policy::ScopedPlaceholder => {
                let service = registration.service_type();
                Arc::new(move |_: &ResolverContext<'_>| -> DiResult<Instance> {
                    Err(ActivationCause::BrokenBehavior {
                        behavior: "lifestyle selection",
                        reason: format!(
                            "{} kept the 'Scoped' placeholder instead of a concrete scoped lifestyle",
                            service
                        ),
                    }
                    .into())
                })
            }
            Policy::Custom(strategy) => strategy.apply(registration, creator, disposal),
        }
    }
}

fn singleton(
    registration: &Registration,
    creator: InstanceFactory,
    disposal: Option<DisposalInfo>,
) -> InstanceFactory {
    let implementation = registration.implementation_type();
    let cell: OnceCell<Instance> = OnceCell::new();
    let gate = InitGate::default();
    Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<Instance> {
        if let Some(instance) = cell.get() {
            return Ok(instance.clone());
        }
        gate.check(implementation)?;
        cell.get_or_try_init(|| -> DiResult<Instance> {
            let _held = gate.hold();
            let instance = creator(ctx)?;
            if let Some(disposal) = &disposal {
                let (disposal, tracked) = (disposal.clone(), instance.clone());
                ctx.container()
                    .track_disposal(Box::new(move || disposal.dispose(&tracked)));
            }
            Ok(instance)
        })
        .cloned()
    })
}

fn flowing(
    registration: &Registration,
    lifestyle: Arc<str>,
    creator: InstanceFactory,
    disposal: Option<DisposalInfo>,
) -> InstanceFactory {
    let id = registration.id();
    let service = registration.service_type();
    Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<Instance> {
        let scope = ctx.scope().ok_or_else(|| ActivationCause::NoActiveScope {
            service,
            lifestyle: lifestyle.to_string(),
        })?;
        trace!(service = %service, "resolving scoped instance");
        scope.get_or_create(id, || creator(ctx), disposal.as_ref())
    })
}

impl PartialEq for Lifestyle {
    fn eq(&self, other: &Self) -> bool {
        let same_policy = match (&self.policy, &other.policy) {
            (Policy::Custom(a), Policy::Custom(b)) => Arc::ptr_eq(a, b),
            (a, b) => std::mem::discriminant(a) == std::mem::discriminant(b),
        };
        same_policy && self.length == other.length && self.name == other.name
    }
}

impl Eq for Lifestyle {}

impl fmt::Debug for Lifestyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lifestyle")
            .field("name", &self.name)
            .field("length", &self.length)
            .finish()
    }
}

impl fmt::Display for Lifestyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
