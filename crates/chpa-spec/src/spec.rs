//! The autoscaler descriptor and its builder
//!
//! A descriptor starts from a fixed default table, receives the caller's
//! overrides, and finally the identity fields (`name`, `maxReplicas`,
//! `refName`), which overrides can never touch. The result is validated once
//! and is immutable afterwards.

use std::collections::BTreeMap;
use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;

use crate::metric::{MetricSourceType, MetricSpec, MetricTargetName};
use crate::options::{Overrides, TuningOverride};
use crate::{ConfigurationError, Result, CHPA_API_VERSION, CHPA_KIND, DEFAULT_WINDOW_SECONDS};

/// Reference to the workload the autoscaler scales
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaleTargetRef {
    /// Kind of the target, e.g. `Deployment`
    pub kind: String,
    /// Name of the target
    pub name: String,
}

/// Scaling bounds and cooldowns
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    /// Cooldown after a scale-down, in seconds
    pub downscale_forbidden_window_seconds: u32,
    /// Cooldown after a scale-up, in seconds
    pub upscale_forbidden_window_seconds: u32,
    /// Relative deviation from target that does not trigger scaling, in [0, 1)
    pub tolerance: f64,
    /// Replica floor, at least 1
    pub min_replicas: u32,
    /// Replica ceiling, at least `min_replicas`
    pub max_replicas: u32,
    /// Maximum multiplicative growth per scale-up, at least 1.0
    pub scale_up_limit_factor: f64,
    /// Absolute growth floor per scale-up, at least 1
    pub scale_up_limit_minimum: u32,
}

/// A validated CHPA descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct AutoscalerSpec {
    name: String,
    api_version: String,
    kind: String,
    label_key: String,
    label_value: String,
    target: ScaleTargetRef,
    tuning: Tuning,
    metric: MetricSpec,
}

impl AutoscalerSpec {
    /// Start building a descriptor for `ref_name` with at most `max_replicas`
    pub fn builder(
        name: impl Into<String>,
        max_replicas: u32,
        ref_name: impl Into<String>,
    ) -> SpecBuilder {
        SpecBuilder::new(name, max_replicas, ref_name)
    }

    /// Resource name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `apiVersion` of the document
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// `kind` of the document
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Label attached to the descriptor, as `(key, value)`
    pub fn label(&self) -> (&str, &str) {
        (&self.label_key, &self.label_value)
    }

    /// Label selector matching this descriptor (`key=value`)
    pub fn label_selector(&self) -> String {
        format!("{}={}", self.label_key, self.label_value)
    }

    /// Scale target
    pub fn target(&self) -> &ScaleTargetRef {
        &self.target
    }

    /// Bounds and cooldowns
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Metric descriptor
    pub fn metric(&self) -> &MetricSpec {
        &self.metric
    }

    /// Render the descriptor as the JSON document applied to the cluster.
    ///
    /// Output is deterministic: the same instance always renders the same
    /// text, with fields in wire order.
    pub fn serialize(&self) -> String {
        serde_json::to_string_pretty(&self.document())
            .expect("descriptor serialization has no failure modes")
    }

    /// Render the descriptor as a JSON value
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self.document()).expect("descriptor serialization has no failure modes")
    }

    fn document(&self) -> Document<'_> {
        Document {
            api_version: &self.api_version,
            kind: &self.kind,
            metadata: ObjectMeta {
                name: Some(self.name.clone()),
                labels: Some(BTreeMap::from([(
                    self.label_key.clone(),
                    self.label_value.clone(),
                )])),
                ..Default::default()
            },
            spec: DocumentSpec {
                downscale_forbidden_window_seconds: self.tuning.downscale_forbidden_window_seconds,
                upscale_forbidden_window_seconds: self.tuning.upscale_forbidden_window_seconds,
                tolerance: self.tuning.tolerance,
                scale_target_ref: &self.target,
                min_replicas: self.tuning.min_replicas,
                max_replicas: self.tuning.max_replicas,
                scale_up_limit_factor: self.tuning.scale_up_limit_factor,
                scale_up_limit_minimum: self.tuning.scale_up_limit_minimum,
                metrics: [&self.metric],
            },
        }
    }
}

impl fmt::Display for AutoscalerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Document<'a> {
    api_version: &'a str,
    kind: &'a str,
    metadata: ObjectMeta,
    spec: DocumentSpec<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentSpec<'a> {
    downscale_forbidden_window_seconds: u32,
    upscale_forbidden_window_seconds: u32,
    tolerance: f64,
    scale_target_ref: &'a ScaleTargetRef,
    min_replicas: u32,
    max_replicas: u32,
    scale_up_limit_factor: f64,
    scale_up_limit_minimum: u32,
    metrics: [&'a MetricSpec; 1],
}

/// Mutable default table the overrides are applied to
struct Draft {
    api_version: String,
    kind: String,
    label_key: String,
    label_value: String,
    ref_kind: String,
    tuning: Tuning,
    metric: MetricSpec,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            api_version: CHPA_API_VERSION.to_string(),
            kind: CHPA_KIND.to_string(),
            label_key: "app".to_string(),
            label_value: "chpa-test".to_string(),
            ref_kind: "Deployment".to_string(),
            tuning: Tuning {
                downscale_forbidden_window_seconds: DEFAULT_WINDOW_SECONDS,
                upscale_forbidden_window_seconds: DEFAULT_WINDOW_SECONDS,
                tolerance: 0.1,
                min_replicas: 1,
                max_replicas: 1,
                scale_up_limit_factor: 2.0,
                scale_up_limit_minimum: 4,
            },
            metric: MetricSpec {
                source_type: MetricSourceType::Resource,
                source_key: MetricSourceType::Resource,
                name: "cpu".to_string(),
                target_name: MetricTargetName::TargetAverageUtilization,
                target_value: 80,
            },
        }
    }
}

impl Draft {
    fn apply(&mut self, option: &TuningOverride) {
        match option {
            TuningOverride::LabelKey(v) => self.label_key = v.clone(),
            TuningOverride::LabelValue(v) => self.label_value = v.clone(),
            TuningOverride::ApiVersion(v) => self.api_version = v.clone(),
            TuningOverride::Kind(v) => self.kind = v.clone(),
            TuningOverride::RefKind(v) => self.ref_kind = v.clone(),
            TuningOverride::DownscaleForbiddenWindowSeconds(v) => {
                self.tuning.downscale_forbidden_window_seconds = *v
            }
            TuningOverride::UpscaleForbiddenWindowSeconds(v) => {
                self.tuning.upscale_forbidden_window_seconds = *v
            }
            TuningOverride::Tolerance(v) => self.tuning.tolerance = *v,
            TuningOverride::MinReplicas(v) => self.tuning.min_replicas = *v,
            TuningOverride::ScaleUpLimitFactor(v) => self.tuning.scale_up_limit_factor = *v,
            TuningOverride::ScaleUpLimitMinimum(v) => self.tuning.scale_up_limit_minimum = *v,
            TuningOverride::MetricSourceType(v) => self.metric.source_type = *v,
            TuningOverride::MetricSourceTypeAsKey(v) => self.metric.source_key = *v,
            TuningOverride::MetricName(v) => self.metric.name = v.clone(),
            TuningOverride::MetricTargetName(v) => self.metric.target_name = *v,
            TuningOverride::MetricTargetValue(v) => self.metric.target_value = *v,
        }
    }
}

/// Builder for [`AutoscalerSpec`]
#[derive(Debug, Clone)]
pub struct SpecBuilder {
    name: String,
    max_replicas: u32,
    ref_name: String,
    overrides: Overrides,
}

impl SpecBuilder {
    /// New builder with no overrides
    pub fn new(name: impl Into<String>, max_replicas: u32, ref_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_replicas,
            ref_name: ref_name.into(),
            overrides: Overrides::new(),
        }
    }

    /// Add one override
    pub fn with(mut self, option: TuningOverride) -> Self {
        self.overrides = self.overrides.with(option);
        self
    }

    /// Add a set of overrides
    pub fn overrides(mut self, overrides: Overrides) -> Self {
        for option in overrides.iter() {
            self.overrides = self.overrides.with(option.clone());
        }
        self
    }

    /// Merge defaults, overrides and identity fields, then validate.
    pub fn build(self) -> Result<AutoscalerSpec> {
        let mut draft = Draft::default();
        for option in self.overrides.iter() {
            draft.apply(option);
        }
        draft.tuning.max_replicas = self.max_replicas;

        let spec = AutoscalerSpec {
            name: self.name,
            api_version: draft.api_version,
            kind: draft.kind,
            label_key: draft.label_key,
            label_value: draft.label_value,
            target: ScaleTargetRef {
                kind: draft.ref_kind,
                name: self.ref_name,
            },
            tuning: draft.tuning,
            metric: draft.metric,
        };
        validate(&spec)?;
        Ok(spec)
    }
}

/// Build a descriptor from identity fields and optional overrides
pub fn build(
    name: &str,
    max_replicas: u32,
    ref_name: &str,
    overrides: Option<&Overrides>,
) -> Result<AutoscalerSpec> {
    let builder = SpecBuilder::new(name, max_replicas, ref_name);
    match overrides {
        Some(overrides) => builder.overrides(overrides.clone()).build(),
        None => builder.build(),
    }
}

fn validate(spec: &AutoscalerSpec) -> Result<()> {
    let tuning = &spec.tuning;

    if spec.name.is_empty() {
        return Err(ConfigurationError::invalid_spec("metadata.name", "must not be empty"));
    }
    if spec.target.name.is_empty() {
        return Err(ConfigurationError::invalid_spec(
            "scaleTargetRef.name",
            "must not be empty",
        ));
    }
    if tuning.min_replicas < 1 {
        return Err(ConfigurationError::invalid_spec("minReplicas", "must be at least 1"));
    }
    if tuning.max_replicas < tuning.min_replicas {
        return Err(ConfigurationError::invalid_spec(
            "maxReplicas",
            format!(
                "{} is below minReplicas {}",
                tuning.max_replicas, tuning.min_replicas
            ),
        ));
    }
    if !(0.0..1.0).contains(&tuning.tolerance) {
        return Err(ConfigurationError::invalid_spec(
            "tolerance",
            format!("{} is outside [0, 1)", tuning.tolerance),
        ));
    }
    if !tuning.scale_up_limit_factor.is_finite() || tuning.scale_up_limit_factor < 1.0 {
        return Err(ConfigurationError::invalid_spec(
            "scaleUpLimitFactor",
            format!("{} is below 1.0", tuning.scale_up_limit_factor),
        ));
    }
    if tuning.scale_up_limit_minimum < 1 {
        return Err(ConfigurationError::invalid_spec(
            "scaleUpLimitMinimum",
            "must be at least 1",
        ));
    }
    Ok(())
}
