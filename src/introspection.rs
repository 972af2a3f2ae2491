//! Type metadata the engine builds object graphs from.
//!
//! Rust has no runtime reflection, so the constructors, injectable properties,
//! base types and disposal hooks of a component are declared once through a
//! [`TypeDescriptor`] and looked up through the [`TypeIntrospector`] trait.
//! [`TypeCatalog`] is the default introspector; a container can be given a
//! different one.
//!
//! ```rust
//! use ioc_weave::{Arguments, ParameterInfo, TypeCatalog, TypeDescriptor, TypeIntrospector, TypeRef};
//! use std::sync::Arc;
//!
//! struct Clock;
//! struct Service { clock: Arc<Clock> }
//!
//! let catalog = TypeCatalog::new();
//! catalog.insert(TypeDescriptor::of::<Clock>().default_constructor_with(|| Clock));
//! catalog.insert(
//!     TypeDescriptor::of::<Service>()
//!         .constructor(vec![ParameterInfo::of::<Clock>("clock")], |args: &Arguments| {
//!             Ok(Service { clock: args.get::<Clock>(0)? })
//!         }),
//! );
//!
//! let ctors = catalog.constructors(TypeRef::of::<Service>());
//! assert_eq!(ctors.len(), 1);
//! assert_eq!(ctors[0].parameters()[0].name(), "clock");
//! assert!(catalog.is_concrete(TypeRef::of::<Clock>()));
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ActivationCause, DiResult};
use crate::instance::Instance;
use crate::internal::FastMap;
use crate::traits::Dispose;
use crate::type_ref::TypeRef;

/// Reflection-like queries the engine issues against types.
///
/// Implementations must be thread-safe; the engine may call them from any
/// thread during graph construction.
pub trait TypeIntrospector: Send + Sync {
    /// Every constructor `ty` can be created through.
    fn constructors(&self, ty: TypeRef) -> Vec<ConstructorInfo>;

    /// Every property of `ty`, writable or not.
    fn properties(&self, ty: TypeRef) -> Vec<PropertyInfo>;

    /// Whether `ty` can be instantiated.
    fn is_concrete(&self, ty: TypeRef) -> bool;

    /// Whether a `ty` can be used where a `base` is expected.
    fn is_assignable_from(&self, base: TypeRef, ty: TypeRef) -> bool;

    /// How instances of `ty` are disposed, if they need to be.
    fn disposal(&self, ty: TypeRef) -> Option<DisposalInfo> {
        let _ = ty;
        None
    }
}

/// A constructor parameter: its name and the service type it asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterInfo {
    name: &'static str,
    parameter_type: TypeRef,
}

impl ParameterInfo {
    pub fn new(name: &'static str, parameter_type: TypeRef) -> Self {
        Self { name, parameter_type }
    }

    pub fn of<S: ?Sized + 'static>(name: &'static str) -> Self {
        Self::new(name, TypeRef::of::<S>())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameter_type(&self) -> TypeRef {
        self.parameter_type
    }
}

/// Resolved constructor arguments, in parameter order.
pub struct Arguments {
    values: Vec<Instance>,
    parameters: Arc<[ParameterInfo]>,
}

impl Arguments {
    pub(crate) fn new(values: Vec<Instance>, parameters: Arc<[ParameterInfo]>) -> Self {
        Self { values, parameters }
    }

    /// The argument at `position` as an `Arc<S>`.
    pub fn get<S>(&self, position: usize) -> DiResult<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.values
            .get(position)
            .and_then(Instance::downcast::<S>)
            .ok_or_else(|| {
                ActivationCause::ArgumentMismatch {
                    expected: TypeRef::of::<S>(),
                    position,
                }
                .into()
            })
    }

    pub fn raw(&self, position: usize) -> Option<&Instance> {
        self.values.get(position)
    }

    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

type SealFn = fn(Box<dyn Any + Send + Sync>) -> Option<Instance>;

/// A constructed value that properties may still be injected into.
pub struct PartialInstance {
    value: Box<dyn Any + Send + Sync>,
    type_ref: TypeRef,
    seal: SealFn,
}

fn seal_as<T: Send + Sync + 'static>(value: Box<dyn Any + Send + Sync>) -> Option<Instance> {
    value
        .downcast::<T>()
        .ok()
        .map(|boxed| Instance::new(Arc::new(*boxed)))
}

impl PartialInstance {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Box::new(value),
            type_ref: TypeRef::of::<T>(),
            seal: seal_as::<T>,
        }
    }

    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.value.downcast_mut::<T>()
    }

    /// Freezes the value into a shareable [`Instance`] of its concrete type.
    pub fn seal(self) -> Option<Instance> {
        (self.seal)(self.value)
    }
}

impl fmt::Debug for PartialInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialInstance").field("type", &self.type_ref).finish()
    }
}

type ConstructFn = dyn Fn(&Arguments) -> DiResult<PartialInstance> + Send + Sync;

/// A way to create an implementation type from resolved arguments.
#[derive(Clone)]
pub struct ConstructorInfo {
    declaring_type: TypeRef,
    parameters: Arc<[ParameterInfo]>,
    invoke: Arc<ConstructFn>,
}

impl ConstructorInfo {
    pub fn new<T, F>(parameters: Vec<ParameterInfo>, construct: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> DiResult<T> + Send + Sync + 'static,
    {
        Self {
            declaring_type: TypeRef::of::<T>(),
            parameters: parameters.into(),
            invoke: Arc::new(move |args: &Arguments| construct(args).map(PartialInstance::new)),
        }
    }

    pub fn declaring_type(&self) -> TypeRef {
        self.declaring_type
    }

    pub fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    pub fn invoke(&self, values: Vec<Instance>) -> DiResult<PartialInstance> {
        let args = Arguments::new(values, self.parameters.clone());
        (self.invoke)(&args)
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("declaring_type", &self.declaring_type)
            .field("parameters", &self.parameters)
            .finish()
    }
}

type InjectFn = dyn Fn(&mut PartialInstance, &Instance) -> DiResult<()> + Send + Sync;

/// A named member of an implementation type that can receive a dependency.
#[derive(Clone)]
pub struct PropertyInfo {
    declaring_type: TypeRef,
    name: &'static str,
    property_type: TypeRef,
    injector: Option<Arc<InjectFn>>,
}

impl PropertyInfo {
    pub fn declaring_type(&self) -> TypeRef {
        self.declaring_type
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn property_type(&self) -> TypeRef {
        self.property_type
    }

    pub fn is_writable(&self) -> bool {
        self.injector.is_some()
    }

    /// Assigns `value` to this property on `target`.
    pub fn inject(&self, target: &mut PartialInstance, value: &Instance) -> DiResult<()> {
        match &self.injector {
            Some(inject) => inject(target, value),
            None => Err(ActivationCause::BrokenBehavior {
                behavior: "property selection",
                reason: format!(
                    "property '{}' of {} is read-only",
                    self.name, self.declaring_type
                ),
            }
            .into()),
        }
    }
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInfo")
            .field("declaring_type", &self.declaring_type)
            .field("name", &self.name)
            .field("property_type", &self.property_type)
            .field("writable", &self.is_writable())
            .finish()
    }
}

type DisposeHook = dyn Fn(&Instance) + Send + Sync;

/// How an implementation type releases its resources.
///
/// `declared_by` is the type the disposal behavior comes from. It is the
/// implementation itself unless the behavior was inherited from a base type,
/// which is what disposable base type suppression matches against.
#[derive(Clone)]
pub struct DisposalInfo {
    declared_by: TypeRef,
    hook: Arc<DisposeHook>,
}

impl DisposalInfo {
    pub fn declared_by(&self) -> TypeRef {
        self.declared_by
    }

    /// Disposes `instance`; instances of other types are ignored.
    pub fn dispose(&self, instance: &Instance) {
        (self.hook)(instance)
    }
}

impl fmt::Debug for DisposalInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposalInfo")
            .field("declared_by", &self.declared_by)
            .finish()
    }
}

/// Everything the engine knows about one type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    type_ref: TypeRef,
    concrete: bool,
    constructors: Vec<ConstructorInfo>,
    properties: Vec<PropertyInfo>,
    bases: Vec<TypeRef>,
    disposal: Option<DisposalInfo>,
}

impl TypeDescriptor {
    /// Starts describing the concrete type `T`.
    pub fn of<T: Send + Sync + 'static>() -> DescriptorBuilder<T> {
        DescriptorBuilder {
            descriptor: TypeDescriptor {
                type_ref: TypeRef::of::<T>(),
                concrete: true,
                constructors: Vec::new(),
                properties: Vec::new(),
                bases: Vec::new(),
                disposal: None,
            },
            _marker: PhantomData,
        }
    }

    /// Describes an abstraction that can't be instantiated, with its own bases.
    pub fn abstraction<B: ?Sized + 'static>(bases: Vec<TypeRef>) -> Self {
        Self {
            type_ref: TypeRef::of::<B>(),
            concrete: false,
            constructors: Vec::new(),
            properties: Vec::new(),
            bases,
            disposal: None,
        }
    }

    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    pub fn is_concrete(&self) -> bool {
        self.concrete
    }

    pub fn constructors(&self) -> &[ConstructorInfo] {
        &self.constructors
    }

    pub fn properties(&self) -> &[PropertyInfo] {
        &self.properties
    }

    pub fn bases(&self) -> &[TypeRef] {
        &self.bases
    }

    pub fn disposal(&self) -> Option<&DisposalInfo> {
        self.disposal.as_ref()
    }
}

/// Builder returned by [`TypeDescriptor::of`].
pub struct DescriptorBuilder<T> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> DescriptorBuilder<T> {
    /// Adds a constructor taking the given parameters.
    pub fn constructor<F>(mut self, parameters: Vec<ParameterInfo>, construct: F) -> Self
    where
        F: Fn(&Arguments) -> DiResult<T> + Send + Sync + 'static,
    {
        self.descriptor
            .constructors
            .push(ConstructorInfo::new(parameters, construct));
        self
    }

    /// Adds a parameterless constructor.
    pub fn default_constructor_with<F>(self, construct: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructor(Vec::new(), move |_| Ok(construct()))
    }

    /// Adds a parameterless constructor using `T::default()`.
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.default_constructor_with(T::default)
    }

    /// Adds a writable property of service type `S`.
    pub fn property<S, F>(mut self, name: &'static str, assign: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<S>) + Send + Sync + 'static,
    {
        let declaring_type = self.descriptor.type_ref;
        let inject = move |target: &mut PartialInstance, value: &Instance| -> DiResult<()> {
            let value = value.downcast::<S>().ok_or_else(|| ActivationCause::ArgumentMismatch {
                expected: TypeRef::of::<S>(),
                position: 0,
            })?;
            let target = target.downcast_mut::<T>().ok_or_else(|| ActivationCause::BrokenBehavior {
                behavior: "property selection",
                reason: format!("property '{}' was injected into a value that is not a {}", name, declaring_type),
            })?;
            assign(target, value);
            Ok(())
        };
        self.descriptor.properties.push(PropertyInfo {
            declaring_type,
            name,
            property_type: TypeRef::of::<S>(),
            injector: Some(Arc::new(inject)),
        });
        self
    }

    /// Adds a property that can't be assigned.
    pub fn read_only_property<S: ?Sized + 'static>(mut self, name: &'static str) -> Self {
        self.descriptor.properties.push(PropertyInfo {
            declaring_type: self.descriptor.type_ref,
            name,
            property_type: TypeRef::of::<S>(),
            injector: None,
        });
        self
    }

    /// Records that `T` can be used where a `B` is expected.
    pub fn implements<B: ?Sized + 'static>(mut self) -> Self {
        let base = TypeRef::of::<B>();
        if !self.descriptor.bases.contains(&base) {
            self.descriptor.bases.push(base);
        }
        self
    }

    /// Instances are disposed through their own [`Dispose`] impl.
    pub fn disposable(mut self) -> Self
    where
        T: Dispose,
    {
        self.descriptor.disposal = Some(dispose_through::<T>(TypeRef::of::<T>()));
        self
    }

    /// Instances are disposed through [`Dispose`], a behavior `T` gets from
    /// its base `B`. Also records `B` as a base of `T`.
    pub fn disposable_inherited_from<B: ?Sized + 'static>(mut self) -> Self
    where
        T: Dispose,
    {
        self.descriptor.disposal = Some(dispose_through::<T>(TypeRef::of::<B>()));
        self.implements::<B>()
    }

    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}

impl<T: Send + Sync + 'static> From<DescriptorBuilder<T>> for TypeDescriptor {
    fn from(builder: DescriptorBuilder<T>) -> Self {
        builder.build()
    }
}

fn dispose_through<T: Dispose>(declared_by: TypeRef) -> DisposalInfo {
    DisposalInfo {
        declared_by,
        hook: Arc::new(|instance: &Instance| {
            if let Some(value) = instance.downcast::<T>() {
                value.dispose();
            }
        }),
    }
}

/// Thread-safe registry of [`TypeDescriptor`]s; the default introspector.
#[derive(Default)]
pub struct TypeCatalog {
    types: RwLock<FastMap<TypeRef, Arc<TypeDescriptor>>>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the descriptor of a type.
    pub fn insert(&self, descriptor: impl Into<TypeDescriptor>) {
        let descriptor = descriptor.into();
        self.types
            .write()
            .insert(descriptor.type_ref, Arc::new(descriptor));
    }

    pub fn get(&self, ty: TypeRef) -> Option<Arc<TypeDescriptor>> {
        self.types.read().get(&ty).cloned()
    }

    pub fn contains(&self, ty: TypeRef) -> bool {
        self.types.read().contains_key(&ty)
    }

    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

impl TypeIntrospector for TypeCatalog {
    fn constructors(&self, ty: TypeRef) -> Vec<ConstructorInfo> {
        self.get(ty)
            .map(|d| d.constructors.clone())
            .unwrap_or_default()
    }

    fn properties(&self, ty: TypeRef) -> Vec<PropertyInfo> {
        self.get(ty)
            .map(|d| d.properties.clone())
            .unwrap_or_default()
    }

    fn is_concrete(&self, ty: TypeRef) -> bool {
        self.get(ty).map_or(false, |d| d.concrete)
    }

    fn is_assignable_from(&self, base: TypeRef, ty: TypeRef) -> bool {
        if base == ty {
            return true;
        }
        let types = self.types.read();
        let mut seen = vec![ty];
        let mut pending: VecDeque<TypeRef> = VecDeque::from([ty]);
        while let Some(current) = pending.pop_front() {
            let Some(descriptor) = types.get(&current) else { continue };
            for &next in &descriptor.bases {
                if next == base {
                    return true;
                }
                if !seen.contains(&next) {
                    seen.push(next);
                    pending.push_back(next);
                }
            }
        }
        false
    }

    fn disposal(&self, ty: TypeRef) -> Option<DisposalInfo> {
        self.get(ty).and_then(|d| d.disposal.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    trait Resource: Send + Sync {}
    trait Handle: Resource {}

    #[derive(Default)]
    struct File {
        closed: AtomicUsize,
        label: Option<Arc<String>>,
    }

    impl Resource for File {}
    impl Handle for File {}

    impl Dispose for File {
        fn dispose(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn assignability_follows_bases_transitively() {
        let catalog = TypeCatalog::new();
        catalog.insert(TypeDescriptor::of::<File>().default_constructor().implements::<dyn Handle>());
        catalog.insert(TypeDescriptor::abstraction::<dyn Handle>(vec![TypeRef::of::<dyn Resource>()]));

        let file = TypeRef::of::<File>();
        assert!(catalog.is_assignable_from(TypeRef::of::<dyn Handle>(), file));
        assert!(catalog.is_assignable_from(TypeRef::of::<dyn Resource>(), file));
        assert!(catalog.is_assignable_from(file, file));
        assert!(!catalog.is_assignable_from(file, TypeRef::of::<dyn Resource>()));
        assert!(!catalog.is_concrete(TypeRef::of::<dyn Handle>()));
    }

    #[test]
    fn properties_inject_into_partial_instances() {
        let descriptor = TypeDescriptor::of::<File>()
            .default_constructor()
            .property::<String, _>("label", |file, label| file.label = Some(label))
            .read_only_property::<usize>("closed")
            .build();

        let mut partial = descriptor.constructors()[0].invoke(Vec::new()).unwrap();
        let label = &descriptor.properties()[0];
        assert!(label.is_writable());
        label
            .inject(&mut partial, &Instance::new(Arc::new(String::from("log"))))
            .unwrap();

        let closed = &descriptor.properties()[1];
        let err = closed.inject(&mut partial, &Instance::new(Arc::new(1usize))).unwrap_err();
        assert!(err.as_activation().unwrap().is_broken_behavior());

        let file = partial.seal().unwrap().downcast::<File>().unwrap();
        assert_eq!(file.label.as_deref().map(String::as_str), Some("log"));
    }

    #[test]
    fn inherited_disposal_names_the_base() {
        let descriptor = TypeDescriptor::of::<File>()
            .default_constructor()
            .disposable_inherited_from::<dyn Resource>()
            .build();

        let disposal = descriptor.disposal().unwrap();
        assert_eq!(disposal.declared_by(), TypeRef::of::<dyn Resource>());
        assert!(descriptor.bases().contains(&TypeRef::of::<dyn Resource>()));

        let file = Arc::new(File::default());
        disposal.dispose(&Instance::new(file.clone()));
        disposal.dispose(&Instance::new(Arc::new(7u8)));
        assert_eq!(file.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn argument_type_mismatch_is_reported() {
        let args = Arguments::new(
            vec![Instance::new(Arc::new(1u32))],
            vec![ParameterInfo::of::<u32>("n")].into(),
        );
        assert_eq!(*args.get::<u32>(0).unwrap(), 1);
        let err = args.get::<String>(0).unwrap_err();
        assert!(matches!(
            err.as_activation().unwrap().cause(),
            ActivationCause::ArgumentMismatch { position: 0, .. }
        ));
        assert!(args.get::<u32>(3).is_err());
    }
}
