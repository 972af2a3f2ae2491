//! # ioc-weave
//!
//! Behavior-driven inversion-of-control engine for Rust.
//!
//! ## Features
//!
//! - **Swappable behaviors**: constructor selection, dependency lookup,
//!   property selection and lifestyle selection are all replaceable strategies
//! - **Cached producers**: each service gets one producer per consumer, built
//!   once and shared across threads without blocking on other threads' builds
//! - **Lifestyles**: transient, singleton, flowing scopes and custom strategies
//! - **Interception**: wrap instance creation, last registered runs outermost
//! - **Locking**: the first resolution freezes the configuration
//! - **Diagnostics**: lifestyle mismatches, disposable transients and
//!   over-injected constructors are reported before anything runs
//!
//! ## Quick Start
//!
//! ```rust
//! use ioc_weave::{Arguments, Container, Lifestyle, ParameterInfo, TypeDescriptor};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let container = Container::new();
//! container
//!     .register_instance(Arc::new(Database { url: "postgres://localhost".into() }))
//!     .unwrap();
//! container
//!     .describe(TypeDescriptor::of::<UserService>().constructor(
//!         vec![ParameterInfo::of::<Database>("db")],
//!         |args: &Arguments| Ok(UserService { db: args.get::<Database>(0)? }),
//!     ))
//!     .unwrap();
//! container.register_concrete::<UserService>(Lifestyle::transient()).unwrap();
//!
//! let users = container.get_instance::<UserService>().unwrap();
//! assert_eq!(users.db.url, "postgres://localhost");
//! ```
//!
//! ## Lifestyles
//!
//! - **Transient**: a new instance on every resolution
//! - **Flowing**: one instance per [`Scope`]
//! - **Singleton**: one instance per container, disposed with it
//! - **Scoped**: a placeholder for the container's default scoped lifestyle
//!
//! ## Factories
//!
//! ```rust
//! use ioc_weave::{Container, Lifestyle, ResolverContext};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! struct RequestId(usize);
//!
//! let counter = Arc::new(AtomicUsize::new(0));
//! let container = Container::new();
//! container.set_default_scoped_lifestyle(Lifestyle::flowing()).unwrap();
//! let next = counter.clone();
//! container
//!     .register_factory::<RequestId, _>(Lifestyle::scoped(), move |_: &ResolverContext<'_>| {
//!         Ok(Arc::new(RequestId(next.fetch_add(1, Ordering::SeqCst))))
//!     })
//!     .unwrap();
//!
//! let first = container.begin_scope();
//! let second = container.begin_scope();
//! let a = first.get_instance::<RequestId>().unwrap();
//! assert!(Arc::ptr_eq(&a, &first.get_instance::<RequestId>().unwrap()));
//! assert_ne!(a.0, second.get_instance::<RequestId>().unwrap().0);
//! ```

pub mod behaviors;
pub mod compiler;
pub mod consumer;
pub mod container;
pub mod diagnostics;
pub mod error;
pub mod instance;
pub mod interception;
pub mod introspection;
pub mod lifestyle;
pub mod options;
pub mod producer;
pub mod registration;
pub mod traits;
pub mod type_ref;

// Internal modules
mod graph;
mod internal;

pub use behaviors::{
    Behaviors, ConstructorResolutionBehavior, DefaultConstructorResolutionBehavior,
    DefaultDependencyInjectionBehavior, DefaultLifestyleSelectionBehavior, DefaultPropertySelectionBehavior,
    DependencyInjectionBehavior, LifestyleSelectionBehavior, PropertySelectionBehavior,
};
pub use compiler::{BuildPlan, DefaultPlanCompiler, PlanCompiler};
pub use consumer::{ConsumerDescriptor, ConsumerInfo, InjectionTarget, TargetKind};
pub use container::{Container, ContainerState, ResolverContext, Scope};
pub use diagnostics::{DiagnosticResult, DiagnosticSeverity, DiagnosticType, VerificationOption};
pub use error::{ActivationCause, ActivationError, ConfigurationError, DiError, DiResult, LockedOrDisposedError};
pub use instance::Instance;
pub use interception::{InitializationContext, Interceptor, InterceptorPredicate};
pub use introspection::{
    Arguments, ConstructorInfo, DescriptorBuilder, DisposalInfo, ParameterInfo, PartialInstance, PropertyInfo,
    TypeCatalog, TypeDescriptor, TypeIntrospector,
};
pub use lifestyle::{
    InstanceFactory, Lifestyle, LifestyleStrategy, SCOPED_LENGTH, SINGLETON_LENGTH, TRANSIENT_LENGTH,
};
pub use options::{lifestyle_by_name, ContainerOptions, ContainerSettings};
pub use producer::{Producer, ProducerKey};
pub use registration::{Registration, Suppression};
pub use traits::Dispose;
pub use type_ref::TypeRef;
