//! Error types for the container.
//!
//! Three kinds of failure leave the engine: configuration mistakes
//! ([`ConfigurationError`]), failures to build an object graph
//! ([`ActivationError`]) and calls that arrive after the container was locked
//! or disposed ([`LockedOrDisposedError`]). Diagnostic findings are not errors
//! unless the caller asks verification to escalate them.

use std::fmt;

use thiserror::Error;

use crate::diagnostics::DiagnosticResult;
use crate::internal::circular;
use crate::type_ref::TypeRef;

/// Top-level error returned by container operations.
///
/// ```rust
/// use ioc_weave::{Container, DiError};
///
/// struct Missing;
///
/// let container = Container::new();
/// match container.get_instance::<Missing>() {
///     Err(DiError::Activation(e)) => assert!(e.to_string().contains("Missing")),
///     other => panic!("unexpected: {:?}", other.map(|_| ())),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum DiError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Activation(#[from] ActivationError),
    #[error(transparent)]
    LockedOrDisposed(#[from] LockedOrDisposedError),
    /// Verification found problems and was asked to fail on them.
    #[error("diagnostic verification reported {} warning(s): {}", .0.len(), summarize(.0))]
    Diagnostics(Vec<DiagnosticResult>),
}

fn summarize(results: &[DiagnosticResult]) -> String {
    results
        .iter()
        .map(|r| r.description.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl DiError {
    /// The activation error, if this is one.
    pub fn as_activation(&self) -> Option<&ActivationError> {
        match self {
            DiError::Activation(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, DiError::LockedOrDisposed(LockedOrDisposedError::Locked { .. }))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, DiError::LockedOrDisposed(LockedOrDisposedError::Disposed { .. }))
    }
}

/// Result type for container operations.
pub type DiResult<T> = Result<T, DiError>;

/// Invalid configuration attempted while the container was still mutable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Options that shape every registration can't change once one exists.
    #[error("'{setting}' can't be changed after the container has registrations")]
    RegistrationsExist { setting: &'static str },
    /// The generic scoped placeholder can't act as the default scoped lifestyle.
    #[error("the default scoped lifestyle must be a concrete scoped lifestyle, not the 'Scoped' placeholder")]
    PlaceholderScopedLifestyle,
    #[error("lifestyle '{lifestyle}' is not a scoped lifestyle")]
    NotScopedLifestyle { lifestyle: String },
    #[error("{service} was registered with the 'Scoped' lifestyle but no default scoped lifestyle is configured")]
    NoDefaultScopedLifestyle { service: TypeRef },
    #[error("type {service} has already been registered; enable overriding registrations to replace it")]
    DuplicateRegistration { service: TypeRef },
    #[error("no type descriptor is known for {implementation}; describe it before registering")]
    UndescribedType { implementation: TypeRef },
    #[error("{implementation} is not a concrete type and can't be constructed")]
    NotConcrete { implementation: TypeRef },
    #[error("the type catalog is not in use because a custom introspector was configured")]
    CustomIntrospector,
    #[error("a justification is required to suppress {diagnostic} on {service}")]
    MissingJustification { diagnostic: String, service: TypeRef },
    /// Resolution was requested from inside a locking listener.
    #[error("instances can't be resolved while the container is locking")]
    ResolveWhileLocking,
    #[error("unknown lifestyle name '{0}'")]
    UnknownLifestyle(String),
    #[cfg(feature = "config")]
    #[error("invalid container settings: {0}")]
    InvalidSettings(String),
}

/// A mutating or resolving call arrived too late.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockedOrDisposedError {
    #[error("'{operation}' is not allowed: the container is locked after its first use")]
    Locked { operation: &'static str },
    #[error("'{operation}' is not allowed: the container has been disposed")]
    Disposed { operation: &'static str },
}

/// Why an object graph couldn't be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationCause {
    /// Default constructor policy wants exactly one constructor.
    ConstructorCount { implementation: TypeRef, found: usize },
    UnresolvableDependency { service: TypeRef, reason: String },
    /// The full cycle, first element repeated at the end.
    CircularDependency { cycle: Vec<TypeRef> },
    LifestyleSelection { implementation: TypeRef, reason: String },
    /// A replaced behavior returned something unusable.
    BrokenBehavior { behavior: &'static str, reason: String },
    NoActiveScope { service: TypeRef, lifestyle: String },
    ArgumentMismatch { expected: TypeRef, position: usize },
    DepthExceeded(usize),
    Factory { service: TypeRef, message: String },
}

impl fmt::Display for ActivationCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationCause::ConstructorCount { implementation, found } => write!(
                f,
                "for {} to be created it should have exactly one public constructor, but it has {}",
                implementation, found
            ),
            ActivationCause::UnresolvableDependency { service, reason } => {
                write!(f, "no registration for type {} could be found: {}", service, reason)
            }
            ActivationCause::CircularDependency { cycle } => {
                let path: Vec<String> = cycle.iter().map(|t| t.to_string()).collect();
                write!(f, "circular dependency detected: {}", path.join(" -> "))
            }
            ActivationCause::LifestyleSelection { implementation, reason } => {
                write!(f, "no lifestyle could be selected for {}: {}", implementation, reason)
            }
            ActivationCause::BrokenBehavior { behavior, reason } => {
                write!(f, "the configured {} behavior is broken: {}", behavior, reason)
            }
            ActivationCause::NoActiveScope { service, lifestyle } => write!(
                f,
                "{} is registered with the '{}' lifestyle but is resolved outside a scope",
                service, lifestyle
            ),
            ActivationCause::ArgumentMismatch { expected, position } => {
                write!(f, "argument {} is not a {}", position, expected)
            }
            ActivationCause::DepthExceeded(depth) => {
                write!(f, "object graph is deeper than {} levels", depth)
            }
            ActivationCause::Factory { service, message } => {
                write!(f, "the factory for {} failed: {}", service, message)
            }
        }
    }
}

/// Failure to build a requested object graph.
///
/// `chain` lists the implementation types being assembled when the failure
/// happened, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ActivationError {
    cause: ActivationCause,
    chain: Vec<TypeRef>,
}

impl ActivationError {
    /// Creates an error, capturing the construction chain of the current thread.
    pub fn new(cause: ActivationCause) -> Self {
        let chain = match &cause {
            ActivationCause::CircularDependency { cycle } => cycle.clone(),
            _ => circular::current_chain(),
        };
        Self { cause, chain }
    }

    pub fn cause(&self) -> &ActivationCause {
        &self.cause
    }

    pub fn chain(&self) -> &[TypeRef] {
        &self.chain
    }

    pub fn is_circular(&self) -> bool {
        matches!(self.cause, ActivationCause::CircularDependency { .. })
    }

    /// True when a custom behavior, not the user's types, caused the failure.
    pub fn is_broken_behavior(&self) -> bool {
        matches!(self.cause, ActivationCause::BrokenBehavior { .. })
    }
}

impl fmt::Display for ActivationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cause)?;
        if self.chain.len() > 1 && !self.is_circular() {
            let path: Vec<String> = self.chain.iter().map(|t| t.to_string()).collect();
            write!(f, " (while building {})", path.join(" -> "))?;
        } else if let [only] = self.chain.as_slice() {
            write!(f, " (while building {})", only)?;
        }
        Ok(())
    }
}

impl From<ActivationCause> for DiError {
    fn from(cause: ActivationCause) -> Self {
        DiError::Activation(ActivationError::new(cause))
    }
}
