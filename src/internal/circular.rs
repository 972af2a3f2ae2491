//! Thread-local construction stack used for cycle detection and error chains.

use std::cell::RefCell;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::error::{ActivationCause, ActivationError};
use crate::type_ref::TypeRef;

const MAX_DEPTH: usize = 1024;

thread_local! {
    static CONSTRUCTION_STACK: RefCell<Vec<TypeRef>> = const { RefCell::new(Vec::new()) };
}

/// Guard for one frame of the construction stack; pops on drop.
pub(crate) struct StackGuard {
    implementation: TypeRef,
}

impl StackGuard {
    /// Pushes `implementation`, failing if it's already being built on this
    /// thread (a cycle) or if the graph is unreasonably deep.
    pub(crate) fn enter(implementation: TypeRef) -> Result<Self, ActivationError> {
        CONSTRUCTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();

            if stack.contains(&implementation) {
                let cycle = cycle_through(&stack, implementation);
                drop(stack);
                return Err(ActivationError::new(ActivationCause::CircularDependency { cycle }));
            }

            if stack.len() >= MAX_DEPTH {
                let depth = stack.len();
                drop(stack);
                return Err(ActivationError::new(ActivationCause::DepthExceeded(depth)));
            }

            stack.push(implementation);
            Ok(Self { implementation })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        CONSTRUCTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let popped = stack.pop();
            debug_assert_eq!(popped, Some(self.implementation));
        });
    }
}

fn cycle_through(stack: &[TypeRef], implementation: TypeRef) -> Vec<TypeRef> {
    let start = stack.iter().position(|t| *t == implementation).unwrap_or(0);
    let mut cycle = stack[start..].to_vec();
    cycle.push(implementation);
    cycle
}

/// The error for re-entering the creation of `implementation` on this thread.
pub(crate) fn reentered(implementation: TypeRef) -> ActivationError {
    let cycle = cycle_through(&current_chain(), implementation);
    ActivationError::new(ActivationCause::CircularDependency { cycle })
}

/// Tracks which thread is running a one-shot initialization.
///
/// Blocking initializers such as `OnceCell::get_or_try_init` deadlock when
/// the initializing thread asks for the same value again; `check` turns that
/// into a cycle error before the cell is touched.
#[derive(Default)]
pub(crate) struct InitGate {
    owner: Mutex<Option<ThreadId>>,
}

impl InitGate {
    pub(crate) fn check(&self, implementation: TypeRef) -> Result<(), ActivationError> {
        if *self.owner.lock() == Some(thread::current().id()) {
            return Err(reentered(implementation));
        }
        Ok(())
    }

    /// Marks the current thread as the initializer until the guard drops.
    pub(crate) fn hold(&self) -> InitGateGuard<'_> {
        *self.owner.lock() = Some(thread::current().id());
        InitGateGuard { gate: self }
    }
}

pub(crate) struct InitGateGuard<'a> {
    gate: &'a InitGate,
}

impl Drop for InitGateGuard<'_> {
    fn drop(&mut self) {
        *self.gate.owner.lock() = None;
    }
}

/// Runs `f` with `implementation` on the construction stack.
pub(crate) fn with_frame<T, F>(implementation: TypeRef, f: F) -> Result<T, crate::DiError>
where
    F: FnOnce() -> Result<T, crate::DiError>,
{
    let _guard = StackGuard::enter(implementation)?;
    f()
}

/// Snapshot of the implementation types currently being built on this thread.
pub(crate) fn current_chain() -> Vec<TypeRef> {
    CONSTRUCTION_STACK
        .try_with(|stack| stack.try_borrow().map(|s| s.clone()).unwrap_or_default())
        .unwrap_or_default()
}
