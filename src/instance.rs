//! Type-erased handle to a produced component.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::type_ref::TypeRef;

/// A produced component, erased to flow through producers and interceptors.
///
/// Holds an `Arc<S>` for the type `S` it was created with; `S` may be unsized,
/// so trait objects survive erasure. Cloning is cheap and shares the value.
///
/// ```rust
/// use ioc_weave::Instance;
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn hello(&self) -> &'static str; }
/// struct English;
/// impl Greeter for English { fn hello(&self) -> &'static str { "hello" } }
///
/// let instance = Instance::new(Arc::new(English) as Arc<dyn Greeter>);
/// let greeter = instance.downcast::<dyn Greeter>().unwrap();
/// assert_eq!(greeter.hello(), "hello");
/// assert!(instance.downcast::<English>().is_none());
/// ```
#[derive(Clone)]
pub struct Instance {
    value: Arc<dyn Any + Send + Sync>,
    type_ref: TypeRef,
    address: usize,
}

impl Instance {
    pub fn new<S>(value: Arc<S>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let address = Arc::as_ptr(&value) as *const () as usize;
        Self {
            value: Arc::new(value),
            type_ref: TypeRef::of::<S>(),
            address,
        }
    }

    /// Returns the shared value if this instance was created as an `Arc<S>`.
    pub fn downcast<S>(&self) -> Option<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.value.downcast_ref::<Arc<S>>().cloned()
    }

    pub fn is<S: ?Sized + 'static>(&self) -> bool {
        self.type_ref.is::<S>()
    }

    /// The type this instance is exposed as.
    pub fn type_ref(&self) -> TypeRef {
        self.type_ref
    }

    /// True when both handles point at the same underlying value.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        self.address == other.address
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.type_ref)
            .field("address", &format_args!("{:#x}", self.address))
            .finish()
    }
}
