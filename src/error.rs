//! Error types for the harness
//!
//! Configuration and command errors mean the harness or its environment is
//! broken and abort the current scenario. A convergence timeout is not an
//! error: the poller reports it as `false` and the scenario decides.

use chpa_spec::ConfigurationError;
use thiserror::Error;

/// Harness result type
pub type Result<T> = std::result::Result<T, Error>;

/// Harness errors
#[derive(Debug, Error)]
pub enum Error {
    /// The descriptor could not be built
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// An external control-tool invocation failed
    #[error("command `{command}` failed: {output}")]
    Command {
        /// The command line that was run
        command: String,
        /// Captured diagnostic output (stderr, or the spawn/timeout reason)
        output: String,
    },

    /// Harness configuration is unusable
    #[error("harness config error: {message}")]
    Config {
        /// What is wrong with the configuration
        message: String,
    },

    /// External output did not have the expected shape
    #[error("unexpected output from {source_name}: {message}")]
    Observation {
        /// What was being read, e.g. `deployment web`
        source_name: String,
        /// Description of the mismatch
        message: String,
    },

    /// One or more scenarios did not pass
    #[error("{} scenario(s) failed in {suite}: {}", failed.len(), failed.join(", "))]
    ScenariosFailed {
        /// Suite name
        suite: String,
        /// Names of the scenarios that failed or errored
        failed: Vec<String>,
    },

    /// Local filesystem failure, e.g. writing a descriptor file
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON from the control tool or a config file
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// A control tool invocation failed; `output` is its diagnostic text
    pub fn command(command: impl Into<String>, output: impl Into<String>) -> Self {
        Error::Command {
            command: command.into(),
            output: output.into(),
        }
    }

    /// Invalid or unreadable harness configuration
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// A cluster response could not be interpreted
    pub fn observation(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Observation {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from the external control tool
    pub fn is_command(&self) -> bool {
        matches!(self, Error::Command { .. })
    }
}
