//! Metric descriptor carried in `spec.metrics`
//!
//! The wire shape is a discriminated union: the `type` field names the metric
//! source and a sibling key (the lower-camel form of the same source) holds the
//! metric name and target. Both halves are stored separately so a descriptor
//! whose discriminator and nested key disagree can still be expressed; the
//! controller is expected to ignore such a descriptor.

use std::fmt;
use std::str::FromStr;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::ConfigurationError;

/// Source of the metric the autoscaler tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricSourceType {
    /// Per-pod resource usage (cpu, memory) as reported by the metrics API
    Resource,
    /// Custom per-pod metric
    Pods,
    /// Metric describing a single Kubernetes object
    Object,
    /// Metric from outside the cluster
    External,
}

impl MetricSourceType {
    /// All known source types
    pub const ALL: [MetricSourceType; 4] = [
        MetricSourceType::Resource,
        MetricSourceType::Pods,
        MetricSourceType::Object,
        MetricSourceType::External,
    ];

    /// Discriminator value written to the `type` field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "Resource",
            Self::Pods => "Pods",
            Self::Object => "Object",
            Self::External => "External",
        }
    }

    /// Key under which this source's payload is nested
    pub fn key(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Pods => "pods",
            Self::Object => "object",
            Self::External => "external",
        }
    }

    /// Parse the nested payload key (`resource`, `pods`, ...)
    pub fn from_key(key: &str) -> Result<Self, ConfigurationError> {
        Self::ALL
            .into_iter()
            .find(|source| source.key() == key)
            .ok_or_else(|| {
                ConfigurationError::invalid_override(
                    "metricSourceTypeAsKey",
                    format!("unknown metric source key '{}'", key),
                )
            })
    }
}

impl fmt::Display for MetricSourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricSourceType {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.as_str() == s)
            .ok_or_else(|| {
                ConfigurationError::invalid_override(
                    "metricSourceType",
                    format!("unknown metric source type '{}'", s),
                )
            })
    }
}

/// Field name carrying the target value inside the metric payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricTargetName {
    /// Target percentage of the requested resource
    TargetAverageUtilization,
    /// Target per-pod average of the raw value
    TargetAverageValue,
    /// Target value of an object or external metric
    TargetValue,
}

impl MetricTargetName {
    const ALL: [MetricTargetName; 3] = [
        MetricTargetName::TargetAverageUtilization,
        MetricTargetName::TargetAverageValue,
        MetricTargetName::TargetValue,
    ];

    /// Wire name of the target field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TargetAverageUtilization => "targetAverageUtilization",
            Self::TargetAverageValue => "targetAverageValue",
            Self::TargetValue => "targetValue",
        }
    }
}

impl fmt::Display for MetricTargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricTargetName {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|target| target.as_str() == s)
            .ok_or_else(|| {
                ConfigurationError::invalid_override(
                    "metricTargetName",
                    format!("unknown metric target name '{}'", s),
                )
            })
    }
}

/// One entry of `spec.metrics`
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSpec {
    /// Discriminator written to `type`
    pub source_type: MetricSourceType,
    /// Source whose key holds the payload
    pub source_key: MetricSourceType,
    /// Metric name, e.g. `cpu`
    pub name: String,
    /// Field carrying the target
    pub target_name: MetricTargetName,
    /// Target value
    pub target_value: u32,
}

impl MetricSpec {
    /// CPU utilisation target, the controller's most common configuration
    pub fn cpu_utilization(percent: u32) -> Self {
        Self {
            source_type: MetricSourceType::Resource,
            source_key: MetricSourceType::Resource,
            name: "cpu".to_string(),
            target_name: MetricTargetName::TargetAverageUtilization,
            target_value: percent,
        }
    }

    /// Whether the discriminator agrees with the key holding the payload
    pub fn is_consistent(&self) -> bool {
        self.source_type == self.source_key
    }
}

impl Serialize for MetricSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", self.source_type.as_str())?;
        map.serialize_entry(self.source_key.key(), &MetricPayload(self))?;
        map.end()
    }
}

struct MetricPayload<'a>(&'a MetricSpec);

impl Serialize for MetricPayload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("name", &self.0.name)?;
        map.serialize_entry(self.0.target_name.as_str(), &self.0.target_value)?;
        map.end()
    }
}
