//! Container options and their plain-data settings form.

use std::sync::Arc;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::behaviors::Behaviors;
use crate::compiler::{DefaultPlanCompiler, PlanCompiler};
use crate::error::ConfigurationError;
use crate::introspection::TypeIntrospector;
use crate::lifestyle::Lifestyle;
use crate::type_ref::TypeRef;

/// Runtime options of a container.
///
/// Owned by the container and changed only through its checked setters;
/// once the container locks they move into its frozen configuration.
#[derive(Clone)]
pub struct ContainerOptions {
    pub(crate) behaviors: Behaviors,
    pub(crate) compiler: Arc<dyn PlanCompiler>,
    pub(crate) introspector: Arc<dyn TypeIntrospector>,
    pub(crate) default_lifestyle: Lifestyle,
    pub(crate) default_scoped_lifestyle: Option<Lifestyle>,
    pub(crate) resolve_unregistered_concrete_types: bool,
    pub(crate) enable_auto_verification: bool,
    pub(crate) allow_overriding_registrations: bool,
    pub(crate) suppressed_disposable_base_types: Vec<TypeRef>,
}

impl ContainerOptions {
    pub(crate) fn new(introspector: Arc<dyn TypeIntrospector>) -> Self {
        Self {
            behaviors: Behaviors::default(),
            compiler: Arc::new(DefaultPlanCompiler),
            introspector,
            default_lifestyle: Lifestyle::transient(),
            default_scoped_lifestyle: None,
            resolve_unregistered_concrete_types: true,
            enable_auto_verification: false,
            allow_overriding_registrations: false,
            suppressed_disposable_base_types: Vec::new(),
        }
    }

    pub fn default_lifestyle(&self) -> &Lifestyle {
        &self.default_lifestyle
    }

    pub fn default_scoped_lifestyle(&self) -> Option<&Lifestyle> {
        self.default_scoped_lifestyle.as_ref()
    }

    pub fn resolve_unregistered_concrete_types(&self) -> bool {
        self.resolve_unregistered_concrete_types
    }

    pub fn enable_auto_verification(&self) -> bool {
        self.enable_auto_verification
    }

    pub fn allow_overriding_registrations(&self) -> bool {
        self.allow_overriding_registrations
    }

    pub fn suppressed_disposable_base_types(&self) -> &[TypeRef] {
        &self.suppressed_disposable_base_types
    }

    pub(crate) fn set_default_scoped_lifestyle(&mut self, lifestyle: Lifestyle) -> Result<(), ConfigurationError> {
        if lifestyle.is_placeholder() {
            return Err(ConfigurationError::PlaceholderScopedLifestyle);
        }
        if !lifestyle.is_scoped() {
            return Err(ConfigurationError::NotScopedLifestyle {
                lifestyle: lifestyle.name().to_string(),
            });
        }
        self.default_scoped_lifestyle = Some(lifestyle);
        Ok(())
    }

    /// Replaces the scoped placeholder with the default scoped lifestyle.
    pub(crate) fn concrete_lifestyle(&self, lifestyle: Lifestyle, service: TypeRef) -> Result<Lifestyle, ConfigurationError> {
        if !lifestyle.is_placeholder() {
            return Ok(lifestyle);
        }
        self.default_scoped_lifestyle
            .clone()
            .ok_or(ConfigurationError::NoDefaultScopedLifestyle { service })
    }
}

/// Looks up a built-in lifestyle by name, ignoring case.
///
/// ```rust
/// use ioc_weave::{lifestyle_by_name, Lifestyle};
///
/// assert_eq!(lifestyle_by_name("Singleton").unwrap(), Lifestyle::singleton());
/// assert!(lifestyle_by_name("hourly").is_err());
/// ```
pub fn lifestyle_by_name(name: &str) -> Result<Lifestyle, ConfigurationError> {
    match name.to_ascii_lowercase().as_str() {
        "transient" => Ok(Lifestyle::transient()),
        "singleton" => Ok(Lifestyle::singleton()),
        "flowing" => Ok(Lifestyle::flowing()),
        "scoped" => Ok(Lifestyle::scoped()),
        _ => Err(ConfigurationError::UnknownLifestyle(name.to_string())),
    }
}

/// Plain-data container settings, applied with
/// [`Container::apply_settings`](crate::Container::apply_settings).
///
/// Unset fields leave the container's current value alone. With the `config`
/// feature the settings can be read from JSON:
///
/// ```rust
/// # #[cfg(feature = "config")]
/// # {
/// use ioc_weave::ContainerSettings;
///
/// let settings = ContainerSettings::from_json_str(
///     r#"{ "default_lifestyle": "singleton", "allow_overriding_registrations": true }"#,
/// ).unwrap();
/// assert_eq!(settings.default_lifestyle.as_deref(), Some("singleton"));
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize), serde(default))]
pub struct ContainerSettings {
    pub default_lifestyle: Option<String>,
    pub default_scoped_lifestyle: Option<String>,
    pub resolve_unregistered_concrete_types: Option<bool>,
    pub enable_auto_verification: Option<bool>,
    pub allow_overriding_registrations: Option<bool>,
}

#[cfg(feature = "config")]
impl ContainerSettings {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(json).map_err(|e| ConfigurationError::InvalidSettings(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String, ConfigurationError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigurationError::InvalidSettings(e.to_string()))
    }
}
