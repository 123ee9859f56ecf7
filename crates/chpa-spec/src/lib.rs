//! Declarative descriptor for the CHPA (configurable horizontal pod autoscaler)
//!
//! Builds validated, immutable `AutoscalerSpec` values from a target workload,
//! a replica ceiling and a set of tuning overrides, and renders them into the
//! exact JSON document the controller's CRD expects.

#![deny(missing_docs)]

pub mod error;
pub mod metric;
pub mod options;
pub mod spec;

pub use error::ConfigurationError;
pub use metric::{MetricSourceType, MetricSpec, MetricTargetName};
pub use options::{Overrides, TuningKey, TuningOverride};
pub use spec::{build, AutoscalerSpec, ScaleTargetRef, SpecBuilder, Tuning};

/// Result type alias for descriptor construction
pub type Result<T> = std::result::Result<T, ConfigurationError>;

/// API group/version served by the CHPA controller
pub const CHPA_API_VERSION: &str = "autoscalers.postmates.com/v1beta1";

/// Kind of the CHPA custom resource
pub const CHPA_KIND: &str = "CHPA";

/// Fully qualified plural resource name, as accepted by `kubectl delete`
pub const CHPA_RESOURCE: &str = "chpas.autoscalers.postmates.com";

/// Cooldown applied to both scale directions unless overridden.
///
/// Shorter than the controller's 15s reconcile cycle so tests stay fast.
pub const DEFAULT_WINDOW_SECONDS: u32 = 10;
