//! Mutable configuration and its frozen form.

use crate::interception::{InitializerEntry, InterceptorEntry};
use crate::options::ContainerOptions;
use crate::registration::Registry;

/// Everything that may change before the container locks.
pub(crate) struct Configuration {
    pub(crate) options: ContainerOptions,
    pub(crate) registry: Registry,
    pub(crate) interceptors: Vec<InterceptorEntry>,
    pub(crate) initializers: Vec<InitializerEntry>,
}

impl Configuration {
    pub(crate) fn new(options: ContainerOptions) -> Self {
        Self {
            options,
            registry: Registry::default(),
            interceptors: Vec::new(),
            initializers: Vec::new(),
        }
    }

    pub(crate) fn freeze(self) -> FrozenConfiguration {
        FrozenConfiguration {
            options: self.options,
            registry: self.registry,
            interceptors: self.interceptors.into_boxed_slice(),
            initializers: self.initializers.into_boxed_slice(),
        }
    }
}

/// The configuration of a locked container. Read-only by construction.
pub(crate) struct FrozenConfiguration {
    options: ContainerOptions,
    registry: Registry,
    interceptors: Box<[InterceptorEntry]>,
    initializers: Box<[InitializerEntry]>,
}

impl FrozenConfiguration {
    pub(crate) fn options(&self) -> &ContainerOptions {
        &self.options
    }

    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn interceptors(&self) -> &[InterceptorEntry] {
        &self.interceptors
    }

    pub(crate) fn initializers(&self) -> &[InitializerEntry] {
        &self.initializers
    }
}
