//! Internal disposal bag for managing cleanup hooks.

/// Disposal hooks executed in LIFO order.
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<Box<dyn FnOnce() + Send>>,
}

impl DisposeBag {
    pub(crate) fn push(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.hooks.push(f);
    }

    /// Takes every hook out of the bag, most recent first.
    pub(crate) fn drain_reverse(&mut self) -> Vec<Box<dyn FnOnce() + Send>> {
        let mut hooks = std::mem::take(&mut self.hooks);
        hooks.reverse();
        hooks
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}

/// Runs hooks outside any lock so they may touch the container themselves.
pub(crate) fn run_all(hooks: Vec<Box<dyn FnOnce() + Send>>) {
    for hook in hooks {
        hook();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn runs_lifo() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut bag = DisposeBag::default();
        for i in 0..3 {
            let order = order.clone();
            bag.push(Box::new(move || order.lock().unwrap().push(i)));
        }
        assert_eq!(bag.len(), 3);
        run_all(bag.drain_reverse());
        assert_eq!(bag.len(), 0);
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }
}
