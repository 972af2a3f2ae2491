//! Turns build plans into instance factories.

use std::fmt;
use std::sync::Arc;

use crate::container::ResolverContext;
use crate::error::{ActivationCause, DiResult};
use crate::instance::Instance;
use crate::introspection::{ConstructorInfo, PropertyInfo};
use crate::lifestyle::InstanceFactory;
use crate::producer::Producer;
use crate::registration::Registration;
use crate::type_ref::TypeRef;

/// Everything needed to create one implementation instance: the selected
/// constructor, a producer per parameter and a producer per property.
pub struct BuildPlan {
    pub(crate) registration: Arc<Registration>,
    pub(crate) constructor: ConstructorInfo,
    pub(crate) arguments: Vec<Arc<Producer>>,
    pub(crate) properties: Vec<(PropertyInfo, Arc<Producer>)>,
}

impl BuildPlan {
    pub fn registration(&self) -> &Arc<Registration> {
        &self.registration
    }

    pub fn implementation_type(&self) -> TypeRef {
        self.registration.implementation_type()
    }

    pub fn constructor(&self) -> &ConstructorInfo {
        &self.constructor
    }

    pub fn arguments(&self) -> &[Arc<Producer>] {
        &self.arguments
    }

    pub fn properties(&self) -> &[(PropertyInfo, Arc<Producer>)] {
        &self.properties
    }

    /// Every producer the plan draws from, arguments first.
    pub fn dependencies(&self) -> Vec<Arc<Producer>> {
        self.arguments
            .iter()
            .cloned()
            .chain(self.properties.iter().map(|(_, p)| p.clone()))
            .collect()
    }
}

impl fmt::Debug for BuildPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildPlan")
            .field("implementation_type", &self.implementation_type())
            .field("constructor", &self.constructor)
            .field("arguments", &self.arguments.len())
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// Compiles a [`BuildPlan`] into a factory creating fresh instances.
///
/// The returned factory must yield an instance of the plan's implementation
/// type; lifestyles and interceptors are applied around it by the engine.
pub trait PlanCompiler: Send + Sync {
    fn compile(&self, plan: &BuildPlan) -> DiResult<InstanceFactory>;
}

/// Calls the constructor with the argument producers' instances, then
/// assigns the properties in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPlanCompiler;

impl PlanCompiler for DefaultPlanCompiler {
    fn compile(&self, plan: &BuildPlan) -> DiResult<InstanceFactory> {
        let constructor = plan.constructor.clone();
        let arguments = plan.arguments.clone();
        let properties = plan.properties.clone();
        let implementation = plan.implementation_type();

        Ok(Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<Instance> {
            let values = arguments
                .iter()
                .map(|producer| producer.instance_with(ctx))
                .collect::<DiResult<Vec<_>>>()?;
            let mut partial = constructor.invoke(values)?;
            for (property, producer) in &properties {
                let value = producer.instance_with(ctx)?;
                property.inject(&mut partial, &value)?;
            }
            partial.seal().ok_or_else(|| {
                ActivationCause::BrokenBehavior {
                    behavior: "plan compiler",
                    reason: format!("the constructor did not produce a {}", implementation),
                }
                .into()
            })
        }))
    }
}
