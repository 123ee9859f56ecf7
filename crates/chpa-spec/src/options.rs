//! Tuning overrides applied on top of the default descriptor
//!
//! `TuningOverride` is the closed set of options a caller may change. Code
//! that builds overrides directly cannot name an unknown option. String-keyed
//! input (CLI flags, scenario files) goes through [`Overrides::from_pairs`],
//! which checks every key against the allow-list and reports all unknown keys
//! at once.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::metric::{MetricSourceType, MetricTargetName};
use crate::ConfigurationError;

/// Allow-listed override key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TuningKey {
    /// `labelKey`
    LabelKey,
    /// `labelValue`
    LabelValue,
    /// `apiVersion`
    ApiVersion,
    /// `kind`
    Kind,
    /// `refKind`
    RefKind,
    /// `downscaleForbiddenWindowSeconds`
    DownscaleForbiddenWindowSeconds,
    /// `upscaleForbiddenWindowSeconds`
    UpscaleForbiddenWindowSeconds,
    /// `tolerance`
    Tolerance,
    /// `minReplicas`
    MinReplicas,
    /// `scaleUpLimitFactor`
    ScaleUpLimitFactor,
    /// `scaleUpLimitMinimum`
    ScaleUpLimitMinimum,
    /// `metricSourceType`
    MetricSourceType,
    /// `metricSourceTypeAsKey`
    MetricSourceTypeAsKey,
    /// `metricName`
    MetricName,
    /// `metricTargetName`
    MetricTargetName,
    /// `metricTargetValue`
    MetricTargetValue,
}

impl TuningKey {
    /// The complete allow-list
    pub const ALL: [TuningKey; 16] = [
        TuningKey::LabelKey,
        TuningKey::LabelValue,
        TuningKey::ApiVersion,
        TuningKey::Kind,
        TuningKey::RefKind,
        TuningKey::DownscaleForbiddenWindowSeconds,
        TuningKey::UpscaleForbiddenWindowSeconds,
        TuningKey::Tolerance,
        TuningKey::MinReplicas,
        TuningKey::ScaleUpLimitFactor,
        TuningKey::ScaleUpLimitMinimum,
        TuningKey::MetricSourceType,
        TuningKey::MetricSourceTypeAsKey,
        TuningKey::MetricName,
        TuningKey::MetricTargetName,
        TuningKey::MetricTargetValue,
    ];

    /// Key as written by callers
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LabelKey => "labelKey",
            Self::LabelValue => "labelValue",
            Self::ApiVersion => "apiVersion",
            Self::Kind => "kind",
            Self::RefKind => "refKind",
            Self::DownscaleForbiddenWindowSeconds => "downscaleForbiddenWindowSeconds",
            Self::UpscaleForbiddenWindowSeconds => "upscaleForbiddenWindowSeconds",
            Self::Tolerance => "tolerance",
            Self::MinReplicas => "minReplicas",
            Self::ScaleUpLimitFactor => "scaleUpLimitFactor",
            Self::ScaleUpLimitMinimum => "scaleUpLimitMinimum",
            Self::MetricSourceType => "metricSourceType",
            Self::MetricSourceTypeAsKey => "metricSourceTypeAsKey",
            Self::MetricName => "metricName",
            Self::MetricTargetName => "metricTargetName",
            Self::MetricTargetValue => "metricTargetValue",
        }
    }

    /// Convert a JSON value into a typed override for this key
    pub fn parse_value(&self, value: &Value) -> Result<TuningOverride, ConfigurationError> {
        let key = self.as_str();
        Ok(match self {
            Self::LabelKey => TuningOverride::LabelKey(string_value(key, value)?),
            Self::LabelValue => TuningOverride::LabelValue(string_value(key, value)?),
            Self::ApiVersion => TuningOverride::ApiVersion(string_value(key, value)?),
            Self::Kind => TuningOverride::Kind(string_value(key, value)?),
            Self::RefKind => TuningOverride::RefKind(string_value(key, value)?),
            Self::DownscaleForbiddenWindowSeconds => {
                TuningOverride::DownscaleForbiddenWindowSeconds(u32_value(key, value)?)
            }
            Self::UpscaleForbiddenWindowSeconds => {
                TuningOverride::UpscaleForbiddenWindowSeconds(u32_value(key, value)?)
            }
            Self::Tolerance => TuningOverride::Tolerance(f64_value(key, value)?),
            Self::MinReplicas => TuningOverride::MinReplicas(u32_value(key, value)?),
            Self::ScaleUpLimitFactor => TuningOverride::ScaleUpLimitFactor(f64_value(key, value)?),
            Self::ScaleUpLimitMinimum => {
                TuningOverride::ScaleUpLimitMinimum(u32_value(key, value)?)
            }
            Self::MetricSourceType => {
                TuningOverride::MetricSourceType(string_value(key, value)?.parse()?)
            }
            Self::MetricSourceTypeAsKey => TuningOverride::MetricSourceTypeAsKey(
                MetricSourceType::from_key(&string_value(key, value)?)?,
            ),
            Self::MetricName => TuningOverride::MetricName(string_value(key, value)?),
            Self::MetricTargetName => {
                TuningOverride::MetricTargetName(string_value(key, value)?.parse()?)
            }
            Self::MetricTargetValue => TuningOverride::MetricTargetValue(u32_value(key, value)?),
        })
    }
}

impl fmt::Display for TuningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TuningKey {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ConfigurationError::unknown_overrides([s]))
    }
}

fn string_value(key: &str, value: &Value) -> Result<String, ConfigurationError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigurationError::invalid_override(key, format!("expected a string, got {}", value)))
}

fn u32_value(key: &str, value: &Value) -> Result<u32, ConfigurationError> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| {
            ConfigurationError::invalid_override(
                key,
                format!("expected a non-negative integer, got {}", value),
            )
        })
}

fn f64_value(key: &str, value: &Value) -> Result<f64, ConfigurationError> {
    value
        .as_f64()
        .ok_or_else(|| ConfigurationError::invalid_override(key, format!("expected a number, got {}", value)))
}

/// A single recognised tuning option with its new value
#[derive(Debug, Clone, PartialEq)]
pub enum TuningOverride {
    /// Label key attached to the descriptor
    LabelKey(String),
    /// Label value attached to the descriptor
    LabelValue(String),
    /// `apiVersion` of the descriptor
    ApiVersion(String),
    /// `kind` of the descriptor
    Kind(String),
    /// Kind of the scale target
    RefKind(String),
    /// Cooldown after a scale-down, in seconds
    DownscaleForbiddenWindowSeconds(u32),
    /// Cooldown after a scale-up, in seconds
    UpscaleForbiddenWindowSeconds(u32),
    /// Relative deviation from target that does not trigger scaling
    Tolerance(f64),
    /// Replica floor
    MinReplicas(u32),
    /// Maximum multiplicative growth per scale-up
    ScaleUpLimitFactor(f64),
    /// Absolute growth floor per scale-up
    ScaleUpLimitMinimum(u32),
    /// Metric discriminator (`type`)
    MetricSourceType(MetricSourceType),
    /// Key holding the metric payload
    MetricSourceTypeAsKey(MetricSourceType),
    /// Metric name
    MetricName(String),
    /// Field carrying the metric target
    MetricTargetName(MetricTargetName),
    /// Metric target value
    MetricTargetValue(u32),
}

impl TuningOverride {
    /// The allow-list key this override sets
    pub fn key(&self) -> TuningKey {
        match self {
            Self::LabelKey(_) => TuningKey::LabelKey,
            Self::LabelValue(_) => TuningKey::LabelValue,
            Self::ApiVersion(_) => TuningKey::ApiVersion,
            Self::Kind(_) => TuningKey::Kind,
            Self::RefKind(_) => TuningKey::RefKind,
            Self::DownscaleForbiddenWindowSeconds(_) => TuningKey::DownscaleForbiddenWindowSeconds,
            Self::UpscaleForbiddenWindowSeconds(_) => TuningKey::UpscaleForbiddenWindowSeconds,
            Self::Tolerance(_) => TuningKey::Tolerance,
            Self::MinReplicas(_) => TuningKey::MinReplicas,
            Self::ScaleUpLimitFactor(_) => TuningKey::ScaleUpLimitFactor,
            Self::ScaleUpLimitMinimum(_) => TuningKey::ScaleUpLimitMinimum,
            Self::MetricSourceType(_) => TuningKey::MetricSourceType,
            Self::MetricSourceTypeAsKey(_) => TuningKey::MetricSourceTypeAsKey,
            Self::MetricName(_) => TuningKey::MetricName,
            Self::MetricTargetName(_) => TuningKey::MetricTargetName,
            Self::MetricTargetValue(_) => TuningKey::MetricTargetValue,
        }
    }
}

/// Ordered set of overrides; a later override of the same key wins
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides(Vec<TuningOverride>);

impl Overrides {
    /// Empty override set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an override
    pub fn with(mut self, option: TuningOverride) -> Self {
        self.0.push(option);
        self
    }

    /// Parse string-keyed overrides against the allow-list.
    ///
    /// All keys are checked before any value is converted, so the error for a
    /// map with several unknown keys names every one of them.
    pub fn from_pairs<I, K>(pairs: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut known = Vec::new();
        let mut unknown = Vec::new();
        for (key, value) in pairs {
            match key.as_ref().parse::<TuningKey>() {
                Ok(tuning_key) => known.push((tuning_key, value)),
                Err(_) => unknown.push(key.as_ref().to_string()),
            }
        }
        if !unknown.is_empty() {
            return Err(ConfigurationError::unknown_overrides(unknown));
        }

        known
            .iter()
            .map(|(key, value)| key.parse_value(value))
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Parse overrides from a JSON object
    pub fn from_json(map: &serde_json::Map<String, Value>) -> Result<Self, ConfigurationError> {
        Self::from_pairs(map.iter().map(|(k, v)| (k.as_str(), v.clone())))
    }

    /// Iterate overrides in application order
    pub fn iter(&self) -> impl Iterator<Item = &TuningOverride> {
        self.0.iter()
    }

    /// Number of overrides
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no overrides are set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<TuningOverride>> for Overrides {
    fn from(options: Vec<TuningOverride>) -> Self {
        Self(options)
    }
}

impl FromIterator<TuningOverride> for Overrides {
    fn from_iter<T: IntoIterator<Item = TuningOverride>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
