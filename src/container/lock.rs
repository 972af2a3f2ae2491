//! Lock state machine: Unlocked, Locking, Locked, plus a disposed flag.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use super::Container;
use crate::error::LockedOrDisposedError;

/// Called once while the container locks.
pub(crate) type LockingListener = Box<dyn FnOnce(&Container) + Send>;

/// Lifecycle state of a [`Container`]. Disposal is tracked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContainerState {
    /// Configuration may change.
    Unlocked = 0,
    /// Locking listeners are running; only their thread may still configure.
    Locking = 1,
    /// Configuration is frozen.
    Locked = 2,
}

impl ContainerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ContainerState::Unlocked,
            1 => ContainerState::Locking,
            _ => ContainerState::Locked,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LockOutcome {
    /// The container was locked before the call.
    AlreadyLocked,
    /// Called from a locking listener; nothing happened.
    Reentrant,
    /// This call performed the transition.
    Locked,
}

pub(crate) struct LockState {
    state: AtomicU8,
    disposed: AtomicBool,
    locking_thread: Mutex<Option<ThreadId>>,
    gate: Mutex<()>,
    listeners: Mutex<Option<Vec<LockingListener>>>,
}

impl LockState {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(ContainerState::Unlocked as u8),
            disposed: AtomicBool::new(false),
            locking_thread: Mutex::new(None),
            gate: Mutex::new(()),
            listeners: Mutex::new(Some(Vec::new())),
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> ContainerState {
        ContainerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Sets the disposed flag; true for the first caller only.
    pub(crate) fn mark_disposed(&self) -> bool {
        !self.disposed.swap(true, Ordering::AcqRel)
    }

    fn is_locking_thread(&self) -> bool {
        *self.locking_thread.lock() == Some(thread::current().id())
    }

    pub(crate) fn check_not_disposed(&self, operation: &'static str) -> Result<(), LockedOrDisposedError> {
        if self.is_disposed() {
            return Err(LockedOrDisposedError::Disposed { operation });
        }
        Ok(())
    }

    /// Configuration may change while unlocked, and from locking listeners.
    pub(crate) fn check_mutable(&self, operation: &'static str) -> Result<(), LockedOrDisposedError> {
        self.check_not_disposed(operation)?;
        match self.state() {
            ContainerState::Unlocked => Ok(()),
            ContainerState::Locking if self.is_locking_thread() => Ok(()),
            _ => Err(LockedOrDisposedError::Locked { operation }),
        }
    }

    pub(crate) fn add_listener(&self, listener: LockingListener) -> Result<(), LockedOrDisposedError> {
        const OPERATION: &str = "on_locking";
        self.check_mutable(OPERATION)?;
        match self.listeners.lock().as_mut() {
            Some(listeners) => {
                listeners.push(listener);
                Ok(())
            }
            None => Err(LockedOrDisposedError::Locked { operation: OPERATION }),
        }
    }

    /// Runs the Unlocked to Locked transition at most once.
    ///
    /// The first caller becomes the locking thread: `notify` receives the
    /// registered listeners, then `freeze` runs and the state becomes Locked.
    /// Other threads wait on the gate until that is done. The transition
    /// completes even if a listener panics.
    pub(crate) fn lock_with<N, F>(&self, notify: N, freeze: F) -> LockOutcome
    where
        N: FnOnce(Vec<LockingListener>),
        F: FnOnce(),
    {
        match self.state() {
            ContainerState::Locked => return LockOutcome::AlreadyLocked,
            ContainerState::Locking if self.is_locking_thread() => return LockOutcome::Reentrant,
            _ => {}
        }

        let _gate = self.gate.lock();
        if self
            .state
            .compare_exchange(
                ContainerState::Unlocked as u8,
                ContainerState::Locking as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return LockOutcome::AlreadyLocked;
        }
        *self.locking_thread.lock() = Some(thread::current().id());

        let finish = FinishLocking { state: self, freeze: Some(freeze) };
        let listeners = self.listeners.lock().as_mut().map(std::mem::take).unwrap_or_default();
        notify(listeners);
        drop(finish);
        LockOutcome::Locked
    }
}

struct FinishLocking<'a, F: FnOnce()> {
    state: &'a LockState,
    freeze: Option<F>,
}

impl<F: FnOnce()> Drop for FinishLocking<'_, F> {
    fn drop(&mut self) {
        // Listeners registered while locking can no longer run.
        self.state.listeners.lock().take();
        if let Some(freeze) = self.freeze.take() {
            freeze();
        }
        self.state
            .state
            .store(ContainerState::Locked as u8, Ordering::Release);
        *self.state.locking_thread.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn transition_happens_once() {
        let lock = LockState::new();
        let frozen = Cell::new(0);
        assert_eq!(lock.state(), ContainerState::Unlocked);
        assert_eq!(lock.lock_with(|_| {}, || frozen.set(frozen.get() + 1)), LockOutcome::Locked);
        assert_eq!(lock.lock_with(|_| {}, || frozen.set(frozen.get() + 1)), LockOutcome::AlreadyLocked);
        assert_eq!(frozen.get(), 1);
        assert_eq!(lock.state(), ContainerState::Locked);
        assert_eq!(
            lock.check_mutable("register"),
            Err(LockedOrDisposedError::Locked { operation: "register" })
        );
    }

    #[test]
    fn locking_thread_may_still_mutate() {
        let lock = LockState::new();
        let outcome = lock.lock_with(
            |_| {
                assert_eq!(lock.state(), ContainerState::Locking);
                assert!(lock.check_mutable("register").is_ok());
                assert_eq!(lock.lock_with(|_| {}, || {}), LockOutcome::Reentrant);
            },
            || {},
        );
        assert_eq!(outcome, LockOutcome::Locked);
    }

    #[test]
    fn disposed_wins_over_locked() {
        let lock = LockState::new();
        lock.lock_with(|_| {}, || {});
        assert!(lock.mark_disposed());
        assert!(!lock.mark_disposed());
        assert_eq!(
            lock.check_mutable("register"),
            Err(LockedOrDisposedError::Disposed { operation: "register" })
        );
    }

    #[test]
    fn listeners_cannot_be_added_after_locking() {
        let lock = LockState::new();
        lock.lock_with(|_| {}, || {});
        assert!(lock.add_listener(Box::new(|_| {})).is_err());
    }
}
