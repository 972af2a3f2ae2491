//! Consumer descriptors: who asks for a dependency, and through which target.

use std::fmt;

use crate::type_ref::TypeRef;

/// Kind of member a dependency is injected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// A constructor parameter.
    Constructor,
    /// A property set after construction.
    Property,
}

/// The member receiving an injected dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InjectionTarget {
    kind: TargetKind,
    declaring_type: TypeRef,
    name: &'static str,
    target_type: TypeRef,
}

impl InjectionTarget {
    /// Target for a constructor parameter of `declaring_type`.
    pub fn parameter(declaring_type: TypeRef, name: &'static str, target_type: TypeRef) -> Self {
        Self { kind: TargetKind::Constructor, declaring_type, name, target_type }
    }

    /// Target for a property of `declaring_type`.
    pub fn property(declaring_type: TypeRef, name: &'static str, target_type: TypeRef) -> Self {
        Self { kind: TargetKind::Property, declaring_type, name, target_type }
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn declaring_type(&self) -> TypeRef {
        self.declaring_type
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type the member expects, i.e. the service type to resolve.
    pub fn target_type(&self) -> TypeRef {
        self.target_type
    }
}

/// Immutable description of the position a dependency is requested from.
///
/// Structural equality: two descriptors with the same implementation type and
/// the same target are equal, which is what lets the producer cache hand out
/// the same producer for identical positions in the graph.
///
/// [`ConsumerDescriptor::Root`] stands for "no consumer": a type resolved
/// directly from the container. It only equals itself. Asking the root for its
/// implementation type or target is a bug in the caller and panics; use
/// [`ConsumerDescriptor::info`] to branch instead.
///
/// ```rust
/// use ioc_weave::{ConsumerDescriptor, InjectionTarget, TypeRef};
///
/// struct Service;
/// struct Repo;
///
/// let target = InjectionTarget::parameter(TypeRef::of::<Service>(), "repo", TypeRef::of::<Repo>());
/// let a = ConsumerDescriptor::new(TypeRef::of::<Service>(), target);
/// let b = ConsumerDescriptor::new(TypeRef::of::<Service>(), target);
///
/// assert_eq!(a, b);
/// assert_ne!(a, ConsumerDescriptor::Root);
/// assert_eq!(ConsumerDescriptor::Root, ConsumerDescriptor::Root);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsumerDescriptor {
    /// Direct resolution; there is no consuming component.
    Root,
    /// A dependency requested by a component.
    Dependency(ConsumerInfo),
}

/// Fields of a non-root consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerInfo {
    pub implementation_type: TypeRef,
    pub target: InjectionTarget,
}

impl ConsumerDescriptor {
    pub fn new(implementation_type: TypeRef, target: InjectionTarget) -> Self {
        ConsumerDescriptor::Dependency(ConsumerInfo { implementation_type, target })
    }

    pub fn is_root(&self) -> bool {
        matches!(self, ConsumerDescriptor::Root)
    }

    /// Non-panicking access to the consumer fields.
    pub fn info(&self) -> Option<&ConsumerInfo> {
        match self {
            ConsumerDescriptor::Root => None,
            ConsumerDescriptor::Dependency(info) => Some(info),
        }
    }

    /// Implementation type of the consuming component.
    ///
    /// # Panics
    ///
    /// Panics on [`ConsumerDescriptor::Root`].
    pub fn implementation_type(&self) -> TypeRef {
        match self {
            ConsumerDescriptor::Dependency(info) => info.implementation_type,
            ConsumerDescriptor::Root => {
                panic!("the root consumer has no implementation type; check `is_root()` first")
            }
        }
    }

    /// Member the dependency is injected into.
    ///
    /// # Panics
    ///
    /// Panics on [`ConsumerDescriptor::Root`].
    pub fn target(&self) -> &InjectionTarget {
        match self {
            ConsumerDescriptor::Dependency(info) => &info.target,
            ConsumerDescriptor::Root => {
                panic!("the root consumer has no injection target; check `is_root()` first")
            }
        }
    }
}

impl fmt::Display for ConsumerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsumerDescriptor::Root => f.write_str("<root>"),
            ConsumerDescriptor::Dependency(info) => {
                let member = match info.target.kind {
                    TargetKind::Constructor => "parameter",
                    TargetKind::Property => "property",
                };
                write!(
                    f,
                    "{} ({} '{}' of type {})",
                    info.implementation_type, member, info.target.name, info.target.target_type
                )
            }
        }
    }
}
