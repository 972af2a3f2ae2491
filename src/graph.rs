//! Producer cache and graph building.
//!
//! A producer is built at most once per [`ProducerKey`] and then shared. The
//! cache reserves a key while its producer is being built: meeting a key the
//! current thread has reserved means the graph loops back on itself. Another
//! thread meeting the reservation builds its own producer instead of waiting;
//! whichever finishes first is published and the other is dropped, so no
//! thread ever blocks on another thread's graph. A failed build releases its
//! reservation so a later attempt starts clean.
//!
//! Compiling a registration pushes its implementation type on the
//! construction stack, which catches cycles whose producer keys never repeat
//! because every hop has a different consumer.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::compiler::BuildPlan;
use crate::consumer::{ConsumerDescriptor, InjectionTarget};
use crate::container::{Container, FrozenConfiguration, ResolverContext};
use crate::error::{ActivationCause, DiResult};
use crate::instance::Instance;
use crate::interception::{self, InitializationContext};
use crate::internal::{circular, FastMap};
use crate::lifestyle::InstanceFactory;
use crate::options::ContainerOptions;
use crate::producer::{Producer, ProducerKey};
use crate::registration::{CastFn, CompiledRegistration, Creation, Registration};
use crate::type_ref::TypeRef;

enum Slot {
    Reserved(ThreadId),
    Ready(Arc<Producer>),
}

#[derive(Default)]
pub(crate) struct ProducerCache {
    slots: Mutex<FastMap<ProducerKey, Slot>>,
}

impl ProducerCache {
    pub(crate) fn get_or_create<F>(&self, key: ProducerKey, build: F) -> DiResult<Arc<Producer>>
    where
        F: FnOnce() -> DiResult<Arc<Producer>>,
    {
        let me = thread::current().id();
        let reserved = {
            let mut slots = self.slots.lock();
            match slots.get(&key) {
                Some(Slot::Ready(producer)) => {
                    trace!(service = %key.service_type, consumer = %key.consumer, "producer cache hit");
                    return Ok(producer.clone());
                }
                Some(Slot::Reserved(owner)) if *owner == me => {
                    let mut cycle = circular::current_chain();
                    cycle.push(key.service_type);
                    return Err(ActivationCause::CircularDependency { cycle }.into());
                }
                Some(Slot::Reserved(_)) => false,
                None => {
                    slots.insert(key, Slot::Reserved(me));
                    true
                }
            }
        };

        match build() {
            Ok(producer) => {
                let mut slots = self.slots.lock();
                if let Some(Slot::Ready(winner)) = slots.get(&key) {
                    return Ok(winner.clone());
                }
                slots.insert(key, Slot::Ready(producer.clone()));
                Ok(producer)
            }
            Err(err) => {
                if reserved {
                    let mut slots = self.slots.lock();
                    if matches!(slots.get(&key), Some(Slot::Reserved(owner)) if *owner == me) {
                        slots.remove(&key);
                    }
                }
                Err(err)
            }
        }
    }

    /// Every published producer.
    pub(crate) fn producers(&self) -> Vec<Arc<Producer>> {
        self.slots
            .lock()
            .values()
            .filter_map(|slot| match slot {
                Slot::Ready(producer) => Some(producer.clone()),
                Slot::Reserved(_) => None,
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots
            .lock()
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    #[cfg(test)]
    fn is_reserved(&self, key: &ProducerKey) -> bool {
        matches!(self.slots.lock().get(key), Some(Slot::Reserved(_)))
    }
}

/// Returns the producer of `service` for `consumer`, building it if needed.
pub(crate) fn build_producer(
    container: &Container,
    frozen: &FrozenConfiguration,
    service: TypeRef,
    consumer: ConsumerDescriptor,
    registration: Arc<Registration>,
) -> DiResult<Arc<Producer>> {
    let key = ProducerKey::new(service, consumer);
    container.producer_cache().get_or_create(key, || {
        let compiled = compile_registration(container, frozen, &registration)?;
        let context = InitializationContext::new(service, consumer, registration.clone());
        let build = interception::compose(frozen.interceptors(), context, compiled.factory.clone());
        debug!(
            service = %service,
            consumer = %consumer,
            implementation = %registration.implementation_type(),
            lifestyle = %registration.lifestyle(),
            "created producer"
        );
        Ok(Arc::new(Producer::new(key, registration.clone(), compiled, build)))
    })
}

fn compile_registration(
    container: &Container,
    frozen: &FrozenConfiguration,
    registration: &Arc<Registration>,
) -> DiResult<Arc<CompiledRegistration>> {
    if let Some(compiled) = registration.compiled() {
        return Ok(compiled.clone());
    }

    let options = frozen.options();
    let implementation = registration.implementation_type();
    let compiled = circular::with_frame(implementation, || {
        let (creator, dependencies, parameter_count, disposal) = match registration.creation() {
            Creation::Constructed => {
                let plan = assemble_plan(container, options, registration)?;
                let creator = options.compiler.compile(&plan)?;
                (
                    creator,
                    plan.dependencies(),
                    Some(plan.constructor().parameters().len()),
                    options.introspector.disposal(implementation),
                )
            }
            Creation::Instance(instance) => {
                let instance = instance.clone();
                let creator: InstanceFactory =
                    Arc::new(move |_: &ResolverContext<'_>| -> DiResult<Instance> { Ok(instance.clone()) });
                (creator, Vec::new(), None, None)
            }
            Creation::Factory(factory) => (
                factory.clone(),
                Vec::new(),
                None,
                options.introspector.disposal(implementation),
            ),
        };

        let creator = interception::initialize(frozen.initializers(), registration, creator);
        let factory = registration.lifestyle().apply(registration, creator, disposal);
        let factory = match registration.cast() {
            Some(cast) => exposed_as(factory, cast.clone(), registration.service_type()),
            None => factory,
        };
        Ok(CompiledRegistration { factory, dependencies, parameter_count })
    })?;

    Ok(registration.publish_compiled(Arc::new(compiled)))
}

fn assemble_plan(
    container: &Container,
    options: &ContainerOptions,
    registration: &Arc<Registration>,
) -> DiResult<BuildPlan> {
    let implementation = registration.implementation_type();
    let introspector = options.introspector.as_ref();
    let behaviors = &options.behaviors;

    let constructor = behaviors
        .constructor_resolution
        .select_constructor(implementation, introspector)?;
    if constructor.declaring_type() != implementation {
        return Err(ActivationCause::BrokenBehavior {
            behavior: "constructor resolution",
            reason: format!(
                "selected a constructor of {} for {}",
                constructor.declaring_type(),
                implementation
            ),
        }
        .into());
    }

    let arguments = constructor
        .parameters()
        .iter()
        .map(|parameter| {
            let target = InjectionTarget::parameter(implementation, parameter.name(), parameter.parameter_type());
            dependency(container, options, ConsumerDescriptor::new(implementation, target))
        })
        .collect::<DiResult<Vec<_>>>()?;

    let mut properties = Vec::new();
    for property in behaviors
        .property_selection
        .select_properties(implementation, introspector)
    {
        if !property.is_writable() {
            return Err(ActivationCause::BrokenBehavior {
                behavior: "property selection",
                reason: format!("selected read-only property '{}' of {}", property.name(), implementation),
            }
            .into());
        }
        let target = InjectionTarget::property(implementation, property.name(), property.property_type());
        let producer = dependency(container, options, ConsumerDescriptor::new(implementation, target))?;
        properties.push((property, producer));
    }

    Ok(BuildPlan {
        registration: registration.clone(),
        constructor,
        arguments,
        properties,
    })
}

fn dependency(
    container: &Container,
    options: &ContainerOptions,
    consumer: ConsumerDescriptor,
) -> DiResult<Arc<Producer>> {
    options
        .behaviors
        .dependency_injection
        .get_producer(&consumer, container, true)?
        .ok_or_else(|| {
            ActivationCause::BrokenBehavior {
                behavior: "dependency injection",
                reason: format!("returned no producer for {} although failures must be reported", consumer),
            }
            .into()
        })
}

fn exposed_as(inner: InstanceFactory, cast: CastFn, service: TypeRef) -> InstanceFactory {
    Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<Instance> {
        let instance = inner(ctx)?;
        cast(&instance).ok_or_else(|| {
            ActivationCause::BrokenBehavior {
                behavior: "plan compiler",
                reason: format!("produced a {} that can't be exposed as {}", instance.type_ref(), service),
            }
            .into()
        })
    })
}
