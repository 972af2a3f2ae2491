use ioc_weave::{
    ActivationCause, Arguments, ConfigurationError, ConstructorInfo, ConstructorResolutionBehavior, ConsumerDescriptor,
    Container, DefaultDependencyInjectionBehavior, DependencyInjectionBehavior, DiError, DiResult, InjectionTarget,
    Lifestyle, LifestyleSelectionBehavior, ParameterInfo, Producer, PropertyInfo, PropertySelectionBehavior,
    TypeDescriptor, TypeIntrospector, TypeRef,
};
use std::sync::Arc;

#[derive(Default)]
struct Clock;

#[derive(Default)]
struct Mailer {
    clock: Option<Arc<Clock>>,
}

/// Injects every writable property.
struct AllWritable;

impl PropertySelectionBehavior for AllWritable {
    fn select_properties(&self, implementation: TypeRef, introspector: &dyn TypeIntrospector) -> Vec<PropertyInfo> {
        introspector
            .properties(implementation)
            .into_iter()
            .filter(PropertyInfo::is_writable)
            .collect()
    }
}

/// Injects every property, writable or not.
struct Everything;

impl PropertySelectionBehavior for Everything {
    fn select_properties(&self, implementation: TypeRef, introspector: &dyn TypeIntrospector) -> Vec<PropertyInfo> {
        introspector.properties(implementation)
    }
}

fn describe_mailer(container: &Container) {
    container.describe(TypeDescriptor::of::<Clock>().default_constructor()).unwrap();
    container
        .describe(
            TypeDescriptor::of::<Mailer>()
                .default_constructor()
                .property::<Clock, _>("clock", |mailer, clock| mailer.clock = Some(clock))
                .read_only_property::<String>("name"),
        )
        .unwrap();
}

#[test]
fn behaviors_can_be_replaced_until_the_first_registration() {
    let container = Container::new();
    container.set_property_selection_behavior(Arc::new(Everything)).unwrap();
    container.set_property_selection_behavior(Arc::new(AllWritable)).unwrap();
    describe_mailer(&container);
    container.register_concrete::<Mailer>(Lifestyle::transient()).unwrap();

    let err = container.set_property_selection_behavior(Arc::new(Everything)).unwrap_err();
    assert!(matches!(
        err,
        DiError::Configuration(ConfigurationError::RegistrationsExist { setting: "property_selection_behavior" })
    ));
    assert!(container.set_default_lifestyle(Lifestyle::singleton()).is_err());

    let mailer = container.get_instance::<Mailer>().unwrap();
    assert!(mailer.clock.is_some());
}

#[test]
fn properties_are_not_injected_by_default() {
    let container = Container::new();
    describe_mailer(&container);
    let mailer = container.get_instance::<Mailer>().unwrap();
    assert!(mailer.clock.is_none());
}

#[test]
fn selecting_a_read_only_property_is_a_broken_behavior() {
    let container = Container::new();
    container.set_property_selection_behavior(Arc::new(Everything)).unwrap();
    describe_mailer(&container);

    let err = container.get_instance::<Mailer>().err().unwrap();
    let activation = err.as_activation().unwrap();
    assert!(activation.is_broken_behavior());
    assert!(err.to_string().contains("name"));
}

/// Never finds anything, even when told to fail.
struct SwallowsFailures;

impl DependencyInjectionBehavior for SwallowsFailures {
    fn get_producer(&self, _: &ConsumerDescriptor, _: &Container, _: bool) -> DiResult<Option<Arc<Producer>>> {
        Ok(None)
    }
}

struct NeedsClock {
    _clock: Arc<Clock>,
}

#[test]
fn missing_producer_on_required_lookup_is_a_broken_behavior() {
    let container = Container::new();
    container.set_dependency_injection_behavior(Arc::new(SwallowsFailures)).unwrap();
    container.describe(TypeDescriptor::of::<Clock>().default_constructor()).unwrap();
    container
        .describe(TypeDescriptor::of::<NeedsClock>().constructor(
            vec![ParameterInfo::of::<Clock>("clock")],
            |args: &Arguments| Ok(NeedsClock { _clock: args.get::<Clock>(0)? }),
        ))
        .unwrap();

    let err = container.get_instance::<NeedsClock>().err().unwrap();
    assert!(err.as_activation().unwrap().is_broken_behavior());
}

#[test]
fn default_dependency_lookup_reports_the_consumer() {
    trait Store: Send + Sync {}

    struct Orders {
        _store: Arc<dyn Store>,
    }

    let container = Container::new();
    container
        .describe(TypeDescriptor::of::<Orders>().constructor(
            vec![ParameterInfo::of::<dyn Store>("store")],
            |args: &Arguments| Ok(Orders { _store: args.get::<dyn Store>(0)? }),
        ))
        .unwrap();

    let err = container.get_instance::<Orders>().err().unwrap();
    match err.as_activation().unwrap().cause() {
        ActivationCause::UnresolvableDependency { service, reason } => {
            assert_eq!(*service, TypeRef::of::<dyn Store>());
            assert!(reason.contains("Orders"), "{}", reason);
        }
        other => panic!("unexpected cause: {}", other),
    }
}

#[test]
fn optional_lookup_yields_none_only_for_missing_registrations() {
    trait Store: Send + Sync {}

    struct Host;

    let host = TypeRef::of::<Host>();
    let consumer_of = |target: TypeRef| ConsumerDescriptor::new(host, InjectionTarget::parameter(host, "dependency", target));

    let container = Container::new();
    container.set_resolve_unregistered_concrete_types(false).unwrap();
    container
        .describe(TypeDescriptor::of::<NeedsClock>().constructor(
            vec![ParameterInfo::of::<Clock>("clock")],
            |args: &Arguments| Ok(NeedsClock { _clock: args.get::<Clock>(0)? }),
        ))
        .unwrap();
    container.register_concrete::<NeedsClock>(Lifestyle::transient()).unwrap();

    let behavior = DefaultDependencyInjectionBehavior;
    let store = consumer_of(TypeRef::of::<dyn Store>());
    assert!(behavior.get_producer(&store, &container, false).unwrap().is_none());
    let err = behavior.get_producer(&store, &container, true).err().unwrap();
    assert!(matches!(
        err.as_activation().unwrap().cause(),
        ActivationCause::UnresolvableDependency { .. }
    ));

    // A registration that exists but can't be built is still an error.
    let broken = consumer_of(TypeRef::of::<NeedsClock>());
    let err = behavior.get_producer(&broken, &container, false).err().unwrap();
    match err.as_activation().unwrap().cause() {
        ActivationCause::UnresolvableDependency { service, .. } => assert_eq!(*service, TypeRef::of::<Clock>()),
        other => panic!("unexpected cause: {}", other),
    }
    assert_eq!(container.producer_count(), 0);
}

/// Hands back the constructor of some other type.
struct WrongConstructor;

impl ConstructorResolutionBehavior for WrongConstructor {
    fn select_constructor(&self, _: TypeRef, introspector: &dyn TypeIntrospector) -> DiResult<ConstructorInfo> {
        Ok(introspector.constructors(TypeRef::of::<Clock>()).remove(0))
    }
}

#[test]
fn foreign_constructor_is_a_broken_behavior() {
    let container = Container::new();
    container.set_constructor_resolution_behavior(Arc::new(WrongConstructor)).unwrap();
    describe_mailer(&container);
    container.register_concrete::<Mailer>(Lifestyle::transient()).unwrap();

    let err = container.get_instance::<Mailer>().err().unwrap();
    assert!(err.as_activation().unwrap().is_broken_behavior());
}

struct TwoConstructors;

#[test]
fn default_constructor_resolution_wants_exactly_one() {
    let container = Container::new();
    container
        .describe(
            TypeDescriptor::of::<TwoConstructors>()
                .default_constructor_with(|| TwoConstructors)
                .constructor(vec![ParameterInfo::of::<Clock>("clock")], |_: &Arguments| Ok(TwoConstructors)),
        )
        .unwrap();

    let err = container.get_instance::<TwoConstructors>().err().unwrap();
    assert!(matches!(
        err.as_activation().unwrap().cause(),
        ActivationCause::ConstructorCount { found: 2, .. }
    ));
}

/// Makes everything named `Clock` a singleton.
struct ClocksAreSingletons;

impl LifestyleSelectionBehavior for ClocksAreSingletons {
    fn select_lifestyle(&self, implementation: TypeRef, default: &Lifestyle) -> DiResult<Lifestyle> {
        if implementation == TypeRef::of::<Clock>() {
            Ok(Lifestyle::singleton())
        } else {
            Ok(default.clone())
        }
    }
}

#[test]
fn lifestyle_selection_applies_to_implicit_and_defaulted_registrations() {
    let container = Container::new();
    container.set_lifestyle_selection_behavior(Arc::new(ClocksAreSingletons)).unwrap();
    describe_mailer(&container);
    let registration = container
        .register_with_default_lifestyle::<Mailer, Mailer, _>(|m| m)
        .unwrap();
    assert_eq!(*registration.lifestyle(), Lifestyle::transient());

    let a = container.get_instance::<Clock>().unwrap();
    let b = container.get_instance::<Clock>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn scoped_placeholder_needs_a_default_scoped_lifestyle() {
    let container = Container::new();
    describe_mailer(&container);
    let err = container.register_concrete::<Clock>(Lifestyle::scoped()).unwrap_err();
    assert!(matches!(
        err,
        DiError::Configuration(ConfigurationError::NoDefaultScopedLifestyle { .. })
    ));

    let err = container.set_default_scoped_lifestyle(Lifestyle::scoped()).unwrap_err();
    assert!(matches!(err, DiError::Configuration(ConfigurationError::PlaceholderScopedLifestyle)));
    let err = container.set_default_scoped_lifestyle(Lifestyle::singleton()).unwrap_err();
    assert!(matches!(err, DiError::Configuration(ConfigurationError::NotScopedLifestyle { .. })));

    container.set_default_scoped_lifestyle(Lifestyle::flowing()).unwrap();
    let registration = container.register_concrete::<Clock>(Lifestyle::scoped()).unwrap();
    assert_eq!(*registration.lifestyle(), Lifestyle::flowing());
}

#[test]
fn duplicate_registrations_need_overriding_enabled() {
    let container = Container::new();
    describe_mailer(&container);
    container.register_concrete::<Clock>(Lifestyle::transient()).unwrap();
    let err = container.register_concrete::<Clock>(Lifestyle::singleton()).unwrap_err();
    assert!(matches!(err, DiError::Configuration(ConfigurationError::DuplicateRegistration { .. })));

    container.set_allow_overriding_registrations(true).unwrap();
    container.register_concrete::<Clock>(Lifestyle::singleton()).unwrap();
    let registrations = container.registrations();
    assert_eq!(registrations.len(), 1);
    assert_eq!(*registrations[0].lifestyle(), Lifestyle::singleton());
}

#[test]
fn undescribed_implementations_are_rejected() {
    struct Ghost;

    let container = Container::new();
    let err = container.register_concrete::<Ghost>(Lifestyle::transient()).unwrap_err();
    assert!(matches!(err, DiError::Configuration(ConfigurationError::UndescribedType { .. })));
}
