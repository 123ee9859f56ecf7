//! Errors raised while building a descriptor

use thiserror::Error;

/// A descriptor could not be built from the supplied arguments.
///
/// Raised before anything is persisted or applied to a cluster.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// One or more override keys are not in the allow-list
    #[error("incorrect chpa parameters: {}", keys.join(", "))]
    UnknownOverrides {
        /// Every offending key, sorted
        keys: Vec<String>,
    },

    /// A recognised override key carried a value of the wrong shape
    #[error("invalid value for {key}: {message}")]
    InvalidOverride {
        /// The override key
        key: String,
        /// What was wrong with the value
        message: String,
    },

    /// The merged descriptor violates a structural invariant
    #[error("invalid spec field {field}: {message}")]
    InvalidSpec {
        /// Wire name of the offending field
        field: &'static str,
        /// Description of the violated invariant
        message: String,
    },
}

impl ConfigurationError {
    /// Create an unknown-overrides error, sorting and de-duplicating the keys
    pub fn unknown_overrides<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        keys.sort();
        keys.dedup();
        Self::UnknownOverrides { keys }
    }

    /// Create an invalid-override error for `key`
    pub fn invalid_override(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOverride {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an invariant violation for the wire field `field`
    pub fn invalid_spec(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            field,
            message: message.into(),
        }
    }

    /// Keys rejected by the allow-list, if this is an unknown-overrides error
    pub fn unknown_keys(&self) -> &[String] {
        match self {
            Self::UnknownOverrides { keys } => keys,
            _ => &[],
        }
    }
}
