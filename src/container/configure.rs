//! Configuration API: registrations, behaviors, options and interceptors.
//!
//! Everything here fails with [`LockedOrDisposedError`](crate::LockedOrDisposedError)
//! once the container is locked or disposed. Options that shape every
//! registration (behaviors, the plan compiler, default lifestyles) can only be
//! changed while there are no registrations yet.

use std::sync::Arc;

use tracing::debug;

use super::{Configuration, Container, ResolverContext};
use crate::behaviors::{
    ConstructorResolutionBehavior, DependencyInjectionBehavior, LifestyleSelectionBehavior,
    PropertySelectionBehavior,
};
use crate::compiler::PlanCompiler;
use crate::diagnostics::DiagnosticType;
use crate::error::{ActivationCause, ConfigurationError, DiResult};
use crate::instance::Instance;
use crate::interception::{InitializationContext, InitializerEntry, InterceptorEntry};
use crate::internal::circular::StackGuard;
use crate::introspection::{TypeCatalog, TypeDescriptor};
use crate::lifestyle::{InstanceFactory, Lifestyle};
use crate::options::{lifestyle_by_name, ContainerOptions, ContainerSettings};
use crate::registration::{CastFn, Creation, Registration, RegistrationParts, Suppression};
use crate::type_ref::TypeRef;

impl Container {
    /// Adds or replaces the descriptor of a type in the container's catalog.
    pub fn describe(&self, descriptor: impl Into<TypeDescriptor>) -> DiResult<()> {
        let catalog = self.catalog_ref().ok_or(ConfigurationError::CustomIntrospector)?;
        self.mutate("describe", |_| {
            catalog.insert(descriptor);
            Ok(())
        })
    }

    /// The catalog behind [`Container::describe`]; `None` when a custom
    /// introspector is in use.
    pub fn catalog(&self) -> Option<&Arc<TypeCatalog>> {
        self.catalog_ref()
    }

    // Behaviors

    pub fn set_constructor_resolution_behavior(&self, behavior: Arc<dyn ConstructorResolutionBehavior>) -> DiResult<()> {
        self.replace_option("constructor_resolution_behavior", |o| {
            o.behaviors.constructor_resolution = behavior;
            Ok(())
        })
    }

    pub fn set_dependency_injection_behavior(&self, behavior: Arc<dyn DependencyInjectionBehavior>) -> DiResult<()> {
        self.replace_option("dependency_injection_behavior", |o| {
            o.behaviors.dependency_injection = behavior;
            Ok(())
        })
    }

    pub fn set_property_selection_behavior(&self, behavior: Arc<dyn PropertySelectionBehavior>) -> DiResult<()> {
        self.replace_option("property_selection_behavior", |o| {
            o.behaviors.property_selection = behavior;
            Ok(())
        })
    }

    pub fn set_lifestyle_selection_behavior(&self, behavior: Arc<dyn LifestyleSelectionBehavior>) -> DiResult<()> {
        self.replace_option("lifestyle_selection_behavior", |o| {
            o.behaviors.lifestyle_selection = behavior;
            Ok(())
        })
    }

    pub fn set_plan_compiler(&self, compiler: Arc<dyn PlanCompiler>) -> DiResult<()> {
        self.replace_option("plan_compiler", |o| {
            o.compiler = compiler;
            Ok(())
        })
    }

    pub fn constructor_resolution_behavior(&self) -> Arc<dyn ConstructorResolutionBehavior> {
        self.read_options(|o| o.behaviors.constructor_resolution.clone())
    }

    pub fn dependency_injection_behavior(&self) -> Arc<dyn DependencyInjectionBehavior> {
        self.read_options(|o| o.behaviors.dependency_injection.clone())
    }

    pub fn property_selection_behavior(&self) -> Arc<dyn PropertySelectionBehavior> {
        self.read_options(|o| o.behaviors.property_selection.clone())
    }

    pub fn lifestyle_selection_behavior(&self) -> Arc<dyn LifestyleSelectionBehavior> {
        self.read_options(|o| o.behaviors.lifestyle_selection.clone())
    }

    pub fn plan_compiler(&self) -> Arc<dyn PlanCompiler> {
        self.read_options(|o| o.compiler.clone())
    }

    // Lifestyles and flags

    pub fn set_default_lifestyle(&self, lifestyle: Lifestyle) -> DiResult<()> {
        self.replace_option("default_lifestyle", |o| {
            o.default_lifestyle = lifestyle;
            Ok(())
        })
    }

    /// Sets the lifestyle [`Lifestyle::scoped`] stands for. It must be a
    /// concrete scoped lifestyle.
    pub fn set_default_scoped_lifestyle(&self, lifestyle: Lifestyle) -> DiResult<()> {
        self.replace_option("default_scoped_lifestyle", |o| {
            o.set_default_scoped_lifestyle(lifestyle)?;
            Ok(())
        })
    }

    pub fn default_lifestyle(&self) -> Lifestyle {
        self.read_options(|o| o.default_lifestyle.clone())
    }

    pub fn default_scoped_lifestyle(&self) -> Option<Lifestyle> {
        self.read_options(|o| o.default_scoped_lifestyle.clone())
    }

    /// Whether concrete types without a registration are registered on
    /// first request. On by default.
    pub fn set_resolve_unregistered_concrete_types(&self, enabled: bool) -> DiResult<()> {
        self.mutate("resolve_unregistered_concrete_types", |config| {
            config.options.resolve_unregistered_concrete_types = enabled;
            Ok(())
        })
    }

    /// Whether the first resolution verifies the container and fails on
    /// warnings. Off by default.
    pub fn set_enable_auto_verification(&self, enabled: bool) -> DiResult<()> {
        self.mutate("enable_auto_verification", |config| {
            config.options.enable_auto_verification = enabled;
            Ok(())
        })
    }

    /// Whether registering a service twice replaces the first registration.
    /// Off by default.
    pub fn set_allow_overriding_registrations(&self, enabled: bool) -> DiResult<()> {
        self.mutate("allow_overriding_registrations", |config| {
            config.options.allow_overriding_registrations = enabled;
            Ok(())
        })
    }

    /// Stops the verifier from reporting transients whose disposal comes
    /// from `B`.
    pub fn suppress_disposable_base_type<B: ?Sized + 'static>(&self) -> DiResult<()> {
        let base = TypeRef::of::<B>();
        self.mutate("suppress_disposable_base_type", |config| {
            let types = &mut config.options.suppressed_disposable_base_types;
            if !types.contains(&base) {
                types.push(base);
            }
            Ok(())
        })
    }

    /// Returns whether `B` was suppressed.
    pub fn remove_suppressed_disposable_base_type<B: ?Sized + 'static>(&self) -> DiResult<bool> {
        let base = TypeRef::of::<B>();
        self.mutate("remove_suppressed_disposable_base_type", |config| {
            let types = &mut config.options.suppressed_disposable_base_types;
            let before = types.len();
            types.retain(|t| *t != base);
            Ok(types.len() != before)
        })
    }

    /// A snapshot of the current options.
    pub fn options(&self) -> ContainerOptions {
        self.read_options(ContainerOptions::clone)
    }

    /// Applies every field set in `settings`.
    pub fn apply_settings(&self, settings: &ContainerSettings) -> DiResult<()> {
        if let Some(name) = &settings.default_lifestyle {
            self.set_default_lifestyle(lifestyle_by_name(name)?)?;
        }
        if let Some(name) = &settings.default_scoped_lifestyle {
            self.set_default_scoped_lifestyle(lifestyle_by_name(name)?)?;
        }
        if let Some(enabled) = settings.resolve_unregistered_concrete_types {
            self.set_resolve_unregistered_concrete_types(enabled)?;
        }
        if let Some(enabled) = settings.enable_auto_verification {
            self.set_enable_auto_verification(enabled)?;
        }
        if let Some(enabled) = settings.allow_overriding_registrations {
            self.set_allow_overriding_registrations(enabled)?;
        }
        Ok(())
    }

    // Registrations

    /// Registers implementation `I` for service `S`.
    ///
    /// `I` must be described; it is created through the constructor the
    /// constructor resolution behavior selects. `cast` exposes it as `S`,
    /// typically `|i| i as Arc<dyn Trait>`.
    pub fn register<S, I, C>(&self, lifestyle: Lifestyle, cast: C) -> DiResult<Arc<Registration>>
    where
        S: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        C: Fn(Arc<I>) -> Arc<S> + Send + Sync + 'static,
    {
        self.register_constructed(TypeRef::of::<S>(), TypeRef::of::<I>(), Some(lifestyle), Some(exposing(cast)))
    }

    /// Registers `T` as its own service.
    pub fn register_concrete<T>(&self, lifestyle: Lifestyle) -> DiResult<Arc<Registration>>
    where
        T: Send + Sync + 'static,
    {
        let ty = TypeRef::of::<T>();
        self.register_constructed(ty, ty, Some(lifestyle), None)
    }

    /// Like [`Container::register`], with the lifestyle chosen by the
    /// lifestyle selection behavior.
    pub fn register_with_default_lifestyle<S, I, C>(&self, cast: C) -> DiResult<Arc<Registration>>
    where
        S: ?Sized + Send + Sync + 'static,
        I: Send + Sync + 'static,
        C: Fn(Arc<I>) -> Arc<S> + Send + Sync + 'static,
    {
        self.register_constructed(TypeRef::of::<S>(), TypeRef::of::<I>(), None, Some(exposing(cast)))
    }

    /// Registers a pre-built instance as a singleton. The container does not
    /// dispose it.
    pub fn register_instance<S>(&self, instance: Arc<S>) -> DiResult<Arc<Registration>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let service = TypeRef::of::<S>();
        let instance = Instance::new(instance);
        self.mutate("register_instance", |config| {
            self.add_registration(config, service, service, Lifestyle::singleton(), Creation::Instance(instance), None)
        })
    }

    /// Registers a delegate creating `S`.
    ///
    /// The delegate resolves its own dependencies through the context, so the
    /// verifier can't see them.
    pub fn register_factory<S, F>(&self, lifestyle: Lifestyle, factory: F) -> DiResult<Arc<Registration>>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        let service = TypeRef::of::<S>();
        let creator: InstanceFactory = Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<Instance> {
            let _frame = StackGuard::enter(service)?;
            factory(ctx).map(Instance::new)
        });
        self.mutate("register_factory", |config| {
            let lifestyle = config.options.concrete_lifestyle(lifestyle, service)?;
            self.add_registration(config, service, service, lifestyle, Creation::Factory(creator), None)
        })
    }

    /// Opts `registration` out of one diagnostic. A justification is required.
    pub fn suppress_diagnostic(
        &self,
        registration: &Registration,
        diagnostic: DiagnosticType,
        justification: &str,
    ) -> DiResult<()> {
        self.mutate("suppress_diagnostic", |_| {
            if justification.trim().is_empty() {
                return Err(ConfigurationError::MissingJustification {
                    diagnostic: diagnostic.to_string(),
                    service: registration.service_type(),
                }
                .into());
            }
            registration.add_suppression(Suppression {
                diagnostic,
                justification: justification.to_string(),
            });
            Ok(())
        })
    }

    // Interception

    /// Wraps every producer whose context satisfies `predicate`.
    ///
    /// The interceptor registered last runs first. See [`crate::interception`].
    pub fn add_interceptor<P, I>(&self, predicate: P, interceptor: I) -> DiResult<()>
    where
        P: Fn(&InitializationContext) -> bool + Send + Sync + 'static,
        I: Fn(&InitializationContext, &dyn Fn() -> DiResult<Instance>) -> DiResult<Instance> + Send + Sync + 'static,
    {
        let entry = InterceptorEntry {
            predicate: Arc::new(predicate),
            interceptor: Arc::new(interceptor),
        };
        self.mutate("add_interceptor", |config| {
            config.interceptors.push(entry);
            Ok(())
        })
    }

    /// Typed interceptor for producers of service `S`.
    pub fn intercept<S, F>(&self, interceptor: F) -> DiResult<()>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&InitializationContext, &dyn Fn() -> DiResult<Arc<S>>) -> DiResult<Arc<S>> + Send + Sync + 'static,
    {
        let service = TypeRef::of::<S>();
        self.add_interceptor(
            move |ctx| ctx.service_type() == service,
            move |ctx, proceed| {
                let typed = || -> DiResult<Arc<S>> {
                    let instance = proceed()?;
                    instance.downcast::<S>().ok_or_else(|| {
                        ActivationCause::BrokenBehavior {
                            behavior: "interception",
                            reason: format!("an inner interceptor replaced {} with a {}", service, instance.type_ref()),
                        }
                        .into()
                    })
                };
                interceptor(ctx, &typed).map(Instance::new)
            },
        )
    }

    /// Runs `initializer` once on every `S` the container creates.
    ///
    /// Initializers run before the lifestyle caches the instance: a singleton
    /// is initialized once however often it is resolved. Initializers for the
    /// same service run in registration order.
    pub fn register_initializer<S, F>(&self, initializer: F) -> DiResult<()>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&S) + Send + Sync + 'static,
    {
        let service = TypeRef::of::<S>();
        let entry = InitializerEntry {
            service_type: service,
            initializer: Arc::new(move |instance: &Instance| -> DiResult<()> {
                let typed = instance.downcast::<S>().ok_or_else(|| ActivationCause::BrokenBehavior {
                    behavior: "initialization",
                    reason: format!("expected a {} but got a {}", service, instance.type_ref()),
                })?;
                initializer(&*typed);
                Ok(())
            }),
        };
        self.mutate("register_initializer", |config| {
            config.initializers.push(entry);
            Ok(())
        })
    }

    fn replace_option(
        &self,
        setting: &'static str,
        f: impl FnOnce(&mut ContainerOptions) -> DiResult<()>,
    ) -> DiResult<()> {
        self.mutate(setting, |config| {
            if !config.registry.is_empty() {
                return Err(ConfigurationError::RegistrationsExist { setting }.into());
            }
            f(&mut config.options)
        })
    }

    fn register_constructed(
        &self,
        service: TypeRef,
        implementation: TypeRef,
        lifestyle: Option<Lifestyle>,
        cast: Option<CastFn>,
    ) -> DiResult<Arc<Registration>> {
        self.mutate("register", |config| {
            let options = &config.options;
            if !options.introspector.is_concrete(implementation) {
                let undescribed = self
                    .catalog_ref()
                    .map_or(false, |catalog| !catalog.contains(implementation));
                return Err(if undescribed {
                    ConfigurationError::UndescribedType { implementation }
                } else {
                    ConfigurationError::NotConcrete { implementation }
                }
                .into());
            }
            let lifestyle = match lifestyle {
                Some(lifestyle) => lifestyle,
                None => options
                    .behaviors
                    .lifestyle_selection
                    .select_lifestyle(implementation, options.default_lifestyle())?,
            };
            let lifestyle = options.concrete_lifestyle(lifestyle, service)?;
            self.add_registration(config, service, implementation, lifestyle, Creation::Constructed, cast)
        })
    }

    fn add_registration(
        &self,
        config: &mut Configuration,
        service: TypeRef,
        implementation: TypeRef,
        lifestyle: Lifestyle,
        creation: Creation,
        cast: Option<CastFn>,
    ) -> DiResult<Arc<Registration>> {
        let registration = Arc::new(Registration::new(RegistrationParts {
            id: self.next_registration_id(),
            service_type: service,
            implementation_type: implementation,
            lifestyle,
            creation,
            cast,
            implicit: false,
        }));
        config
            .registry
            .insert(registration.clone(), config.options.allow_overriding_registrations)?;
        debug!(
            service = %service,
            implementation = %implementation,
            lifestyle = %registration.lifestyle(),
            "registered"
        );
        Ok(registration)
    }
}

fn exposing<S, I, C>(cast: C) -> CastFn
where
    S: ?Sized + Send + Sync + 'static,
    I: Send + Sync + 'static,
    C: Fn(Arc<I>) -> Arc<S> + Send + Sync + 'static,
{
    Arc::new(move |instance: &Instance| instance.downcast::<I>().map(|i| Instance::new(cast(i))))
}
