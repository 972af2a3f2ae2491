use ioc_weave::{
    ActivationCause, Arguments, ConsumerDescriptor, Container, DefaultDependencyInjectionBehavior, DependencyInjectionBehavior,
    DiResult, InjectionTarget, Lifestyle, ParameterInfo, Producer, TypeDescriptor, TypeRef,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Logger;

struct Reports {
    logger: Arc<Logger>,
}

struct Billing {
    logger: Arc<Logger>,
}

fn describe_graph(container: &Container) {
    container.describe(TypeDescriptor::of::<Logger>().default_constructor()).unwrap();
    container
        .describe(TypeDescriptor::of::<Reports>().constructor(
            vec![ParameterInfo::of::<Logger>("logger")],
            |args: &Arguments| Ok(Reports { logger: args.get::<Logger>(0)? }),
        ))
        .unwrap();
    container
        .describe(TypeDescriptor::of::<Billing>().constructor(
            vec![ParameterInfo::of::<Logger>("logger")],
            |args: &Arguments| Ok(Billing { logger: args.get::<Logger>(0)? }),
        ))
        .unwrap();
}

#[test]
fn root_producers_are_cached() {
    let container = Container::new();
    describe_graph(&container);
    container.register_concrete::<Logger>(Lifestyle::singleton()).unwrap();

    let a = container.get_producer(TypeRef::of::<Logger>()).unwrap();
    let b = container.get_producer(TypeRef::of::<Logger>()).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert!(a.consumer().is_root());
    assert_eq!(container.producer_count(), 1);
}

#[test]
fn each_consumer_gets_its_own_producer() {
    let container = Container::new();
    describe_graph(&container);
    container.register_concrete::<Logger>(Lifestyle::singleton()).unwrap();

    let reports = container.get_producer(TypeRef::of::<Reports>()).unwrap();
    let billing = container.get_producer(TypeRef::of::<Billing>()).unwrap();
    let for_reports = &reports.dependencies()[0];
    let for_billing = &billing.dependencies()[0];

    assert!(!Arc::ptr_eq(for_reports, for_billing));
    assert!(Arc::ptr_eq(for_reports.registration(), for_billing.registration()));
    assert_eq!(for_reports.consumer().implementation_type(), TypeRef::of::<Reports>());
    assert_eq!(for_reports.consumer().target().name(), "logger");

    // Asking again for the same consumer returns the same producer.
    let consumer = ConsumerDescriptor::new(
        TypeRef::of::<Reports>(),
        InjectionTarget::parameter(TypeRef::of::<Reports>(), "logger", TypeRef::of::<Logger>()),
    );
    let again = container.producer_for(TypeRef::of::<Logger>(), &consumer).unwrap().unwrap();
    assert!(Arc::ptr_eq(for_reports, &again));

    // Singleton identity holds across consumers.
    let r = container.get_instance::<Reports>().unwrap();
    let b = container.get_instance::<Billing>().unwrap();
    assert!(Arc::ptr_eq(&r.logger, &b.logger));
}

struct Left {
    _right: Arc<Right>,
}

struct Right {
    _left: Arc<Left>,
}

fn cyclic_container() -> Container {
    let container = Container::new();
    container
        .describe(TypeDescriptor::of::<Left>().constructor(
            vec![ParameterInfo::of::<Right>("right")],
            |args: &Arguments| Ok(Left { _right: args.get::<Right>(0)? }),
        ))
        .unwrap();
    container
        .describe(TypeDescriptor::of::<Right>().constructor(
            vec![ParameterInfo::of::<Left>("left")],
            |args: &Arguments| Ok(Right { _left: args.get::<Left>(0)? }),
        ))
        .unwrap();
    container.register_concrete::<Left>(Lifestyle::transient()).unwrap();
    container.register_concrete::<Right>(Lifestyle::transient()).unwrap();
    container
}

fn cycle_of(result: DiResult<Arc<Producer>>) -> Vec<TypeRef> {
    let err = result.unwrap_err();
    let activation = err.as_activation().expect("activation error");
    match activation.cause() {
        ActivationCause::CircularDependency { cycle } => cycle.clone(),
        other => panic!("expected a cycle, got {}", other),
    }
}

#[test]
fn cycles_are_detected_from_either_end() {
    let left = TypeRef::of::<Left>();
    let right = TypeRef::of::<Right>();

    let container = cyclic_container();
    assert_eq!(cycle_of(container.get_producer(left)), vec![left, right, left]);
    // The failed build left nothing reserved: the same error comes back.
    assert_eq!(cycle_of(container.get_producer(left)), vec![left, right, left]);

    let container = cyclic_container();
    assert_eq!(cycle_of(container.get_producer(right)), vec![right, left, right]);

    let err = container.get_instance::<Left>().err().unwrap();
    let message = err.to_string();
    assert!(message.contains("Left") && message.contains("Right"), "{}", message);
}

struct SelfFactory;

#[test]
fn factory_cycles_are_detected_at_resolution() {
    let container = Container::new();
    container
        .register_factory::<SelfFactory, _>(Lifestyle::transient(), |ctx| {
            ctx.get_instance::<SelfFactory>()?;
            Ok(Arc::new(SelfFactory))
        })
        .unwrap();

    let err = container.get_instance::<SelfFactory>().err().unwrap();
    assert!(err.as_activation().unwrap().is_circular());
}

struct SelfSingleton;

struct SelfScoped;

#[test]
fn caching_lifestyles_report_factory_cycles_instead_of_blocking() {
    let (done, outcome) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let container = Container::new();
        container.set_default_scoped_lifestyle(Lifestyle::flowing()).unwrap();
        container
            .register_factory::<SelfSingleton, _>(Lifestyle::singleton(), |ctx| {
                ctx.get_instance::<SelfSingleton>()?;
                Ok(Arc::new(SelfSingleton))
            })
            .unwrap();
        container
            .register_factory::<SelfScoped, _>(Lifestyle::scoped(), |ctx| {
                ctx.get_instance::<SelfScoped>()?;
                Ok(Arc::new(SelfScoped))
            })
            .unwrap();

        let singleton = TypeRef::of::<SelfSingleton>();
        let first = container.get_instance::<SelfSingleton>().err().unwrap();
        let second = container.get_instance::<SelfSingleton>().err().unwrap();
        let scope = container.begin_scope();
        let scoped = scope.get_instance::<SelfScoped>().err().unwrap();
        done.send((
            first.as_activation().unwrap().chain().to_vec(),
            second.as_activation().unwrap().is_circular(),
            scoped.as_activation().unwrap().is_circular(),
            singleton,
        ))
        .unwrap();
    });

    let (chain, retried_is_cycle, scoped_is_cycle, singleton) = outcome
        .recv_timeout(std::time::Duration::from_secs(10))
        .expect("resolving a self-dependent factory must not block");
    assert_eq!(chain, vec![singleton, singleton]);
    assert!(retried_is_cycle);
    assert!(scoped_is_cycle);
}

/// Fails the first lookup, then delegates to the default behavior.
struct FlakyOnce {
    failed: AtomicBool,
}

impl DependencyInjectionBehavior for FlakyOnce {
    fn get_producer(
        &self,
        consumer: &ConsumerDescriptor,
        container: &Container,
        throw_on_failure: bool,
    ) -> DiResult<Option<Arc<Producer>>> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Err(ActivationCause::Factory {
                service: consumer.target().target_type(),
                message: "transient outage".into(),
            }
            .into());
        }
        DefaultDependencyInjectionBehavior.get_producer(consumer, container, throw_on_failure)
    }
}

#[test]
fn failed_builds_can_be_retried() {
    let container = Container::new();
    container
        .set_dependency_injection_behavior(Arc::new(FlakyOnce { failed: AtomicBool::new(false) }))
        .unwrap();
    describe_graph(&container);
    container.register_concrete::<Logger>(Lifestyle::singleton()).unwrap();
    container.register_concrete::<Reports>(Lifestyle::transient()).unwrap();

    let err = container.get_instance::<Reports>().err().unwrap();
    assert!(err.to_string().contains("transient outage"));
    assert_eq!(container.producer_count(), 0);

    let reports = container.get_instance::<Reports>().unwrap();
    let logger = container.get_instance::<Logger>().unwrap();
    assert!(Arc::ptr_eq(&reports.logger, &logger));
}

#[test]
fn unregistered_abstractions_are_unresolvable() {
    trait Missing: Send + Sync {}

    let container = Container::new();
    let err = container.get_instance::<dyn Missing>().err().unwrap();
    assert!(matches!(
        err.as_activation().unwrap().cause(),
        ActivationCause::UnresolvableDependency { .. }
    ));
}

#[test]
fn implicit_registrations_can_be_disabled() {
    let container = Container::new();
    describe_graph(&container);
    container.set_resolve_unregistered_concrete_types(false).unwrap();
    assert!(container.get_instance::<Logger>().is_err());

    let container = Container::new();
    describe_graph(&container);
    let a = container.get_instance::<Logger>().unwrap();
    let b = container.get_instance::<Logger>().unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(container.registrations().is_empty());
}
