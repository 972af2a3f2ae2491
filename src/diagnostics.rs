//! Verification and diagnostic analysis of the registered graph.
//!
//! Verification builds a producer for every explicit registration, which
//! surfaces constructor, dependency and cycle errors without creating a
//! single instance. Analysis then walks the producers that exist and reports
//! configurations that resolve fine but behave badly at runtime.
//!
//! ```rust
//! use ioc_weave::{Arguments, Container, DiagnosticType, Lifestyle, ParameterInfo, TypeDescriptor};
//!
//! #[derive(Default)]
//! struct Clock;
//! struct Cache;
//!
//! let container = Container::new();
//! container.describe(TypeDescriptor::of::<Clock>().default_constructor()).unwrap();
//! container
//!     .describe(TypeDescriptor::of::<Cache>().constructor(
//!         vec![ParameterInfo::of::<Clock>("clock")],
//!         |args: &Arguments| { args.get::<Clock>(0)?; Ok(Cache) },
//!     ))
//!     .unwrap();
//! container.register_concrete::<Clock>(Lifestyle::transient()).unwrap();
//! container.register_concrete::<Cache>(Lifestyle::singleton()).unwrap();
//!
//! let findings = container.analyze().unwrap();
//! assert_eq!(findings.len(), 1);
//! assert_eq!(findings[0].diagnostic_type, DiagnosticType::LifestyleMismatch);
//! assert!(container.verify().is_err());
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::container::{Container, FrozenConfiguration};
use crate::error::{DiError, DiResult};
use crate::options::ContainerOptions;
use crate::producer::Producer;
use crate::type_ref::TypeRef;

/// Constructors with more parameters than this are reported.
pub const MAX_CONSTRUCTOR_PARAMETERS: usize = 7;

/// Kinds of findings the analyzer reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticType {
    /// A component depends on a component with a shorter lifestyle.
    LifestyleMismatch,
    /// A transient component needs disposing, which the container never does
    /// for transients.
    DisposableTransientComponent,
    /// A constructor takes too many dependencies.
    SingleResponsibilityViolation,
}

impl DiagnosticType {
    pub fn severity(&self) -> DiagnosticSeverity {
        match self {
            DiagnosticType::LifestyleMismatch | DiagnosticType::DisposableTransientComponent => {
                DiagnosticSeverity::Warning
            }
            DiagnosticType::SingleResponsibilityViolation => DiagnosticSeverity::Information,
        }
    }
}

impl fmt::Display for DiagnosticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticType::LifestyleMismatch => "lifestyle mismatch",
            DiagnosticType::DisposableTransientComponent => "disposable transient component",
            DiagnosticType::SingleResponsibilityViolation => "single responsibility violation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticSeverity {
    Information,
    Warning,
}

/// One finding of the analyzer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticResult {
    pub diagnostic_type: DiagnosticType,
    pub severity: DiagnosticSeverity,
    pub service_type: TypeRef,
    pub implementation_type: TypeRef,
    pub description: String,
}

impl fmt::Display for DiagnosticResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}: {}", self.severity, self.diagnostic_type, self.description)
    }
}

/// How far [`Container::verify_with`] goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationOption {
    /// Build every registration's producer graph.
    VerifyOnly,
    /// Also analyze the graph and fail on warnings.
    #[default]
    VerifyAndDiagnose,
}

impl Container {
    /// Same as `verify_with(VerificationOption::VerifyAndDiagnose)`.
    pub fn verify(&self) -> DiResult<()> {
        self.verify_with(VerificationOption::VerifyAndDiagnose)
    }

    /// Locks the container and builds the producer graph of every explicit
    /// registration. No instances are created.
    ///
    /// With [`VerificationOption::VerifyAndDiagnose`], warning findings fail
    /// with [`DiError::Diagnostics`].
    pub fn verify_with(&self, option: VerificationOption) -> DiResult<()> {
        let frozen = self.frozen("verify")?;
        self.verify_frozen(frozen, option).map(|_| ())
    }

    /// Verifies, then returns every finding, including informational ones.
    pub fn analyze(&self) -> DiResult<Vec<DiagnosticResult>> {
        let frozen = self.frozen("analyze")?;
        self.build_all(frozen)?;
        Ok(analyze(frozen.options(), &self.producer_cache().producers()))
    }

    pub(crate) fn verify_frozen(
        &self,
        frozen: &FrozenConfiguration,
        option: VerificationOption,
    ) -> DiResult<Vec<DiagnosticResult>> {
        let producers = self.build_all(frozen)?;
        debug!(registrations = producers.len(), ?option, "verified container");
        if option == VerificationOption::VerifyOnly {
            return Ok(Vec::new());
        }

        let results = analyze(frozen.options(), &self.producer_cache().producers());
        let warnings: Vec<DiagnosticResult> = results
            .iter()
            .filter(|r| r.severity == DiagnosticSeverity::Warning)
            .cloned()
            .collect();
        if !warnings.is_empty() {
            return Err(DiError::Diagnostics(warnings));
        }
        Ok(results)
    }

    fn build_all(&self, frozen: &FrozenConfiguration) -> DiResult<Vec<Arc<Producer>>> {
        frozen
            .registry()
            .iter()
            .map(|registration| self.root_producer(frozen, registration.service_type()))
            .collect()
    }
}

/// Analyzes `producers`; results are sorted by type, then service name.
pub(crate) fn analyze(options: &ContainerOptions, producers: &[Arc<Producer>]) -> Vec<DiagnosticResult> {
    let mut results = Vec::new();
    let mut seen_registrations = HashSet::new();
    let mut seen_dependencies = HashSet::new();

    for producer in producers {
        let registration = producer.registration();

        for dependency in producer.dependencies() {
            let shorter = dependency.lifestyle().length() < producer.lifestyle().length();
            if shorter
                && !registration.is_suppressed(DiagnosticType::LifestyleMismatch)
                && seen_dependencies.insert((registration.id(), dependency.registration().id()))
            {
                results.push(finding(
                    DiagnosticType::LifestyleMismatch,
                    producer,
                    format!(
                        "{} ({}) depends on {} implemented by {} ({})",
                        registration.implementation_type(),
                        producer.lifestyle(),
                        dependency.service_type(),
                        dependency.registration().implementation_type(),
                        dependency.lifestyle(),
                    ),
                ));
            }
        }

        if !seen_registrations.insert(registration.id()) {
            continue;
        }

        if registration.lifestyle().is_transient()
            && !registration.is_suppressed(DiagnosticType::DisposableTransientComponent)
        {
            let implementation = registration.implementation_type();
            if let Some(disposal) = options.introspector.disposal(implementation) {
                if !is_suppressed_base(options, implementation, disposal.declared_by()) {
                    results.push(finding(
                        DiagnosticType::DisposableTransientComponent,
                        producer,
                        format!(
                            "{} is registered as transient but is disposable (declared by {}); the container does not dispose transients",
                            implementation,
                            disposal.declared_by(),
                        ),
                    ));
                }
            }
        }

        if let Some(count) = producer.constructor_parameter_count() {
            if count > MAX_CONSTRUCTOR_PARAMETERS
                && !registration.is_suppressed(DiagnosticType::SingleResponsibilityViolation)
            {
                results.push(finding(
                    DiagnosticType::SingleResponsibilityViolation,
                    producer,
                    format!(
                        "{} has {} constructor parameters, which suggests it has too many responsibilities",
                        registration.implementation_type(),
                        count,
                    ),
                ));
            }
        }
    }

    results.sort_by(|a, b| {
        (a.diagnostic_type, a.service_type.name(), &a.description)
            .cmp(&(b.diagnostic_type, b.service_type.name(), &b.description))
    });
    results
}

/// A disposal hook inherited from a suppressed base type is not reported. A
/// type that declares its own hook is reported even if it derives from one.
fn is_suppressed_base(options: &ContainerOptions, implementation: TypeRef, declared_by: TypeRef) -> bool {
    options.suppressed_disposable_base_types().iter().any(|&base| {
        base == declared_by
            || (declared_by != implementation && options.introspector.is_assignable_from(base, declared_by))
    })
}

fn finding(diagnostic_type: DiagnosticType, producer: &Producer, description: String) -> DiagnosticResult {
    DiagnosticResult {
        diagnostic_type,
        severity: diagnostic_type.severity(),
        service_type: producer.registration().service_type(),
        implementation_type: producer.registration().implementation_type(),
        description,
    }
}
