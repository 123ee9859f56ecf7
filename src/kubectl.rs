//! Control tool invocation
//!
//! Every interaction with the cluster goes through [`CommandRunner`]. The real
//! implementation shells out to `kubectl`; tests substitute a mock. A call
//! either returns stdout or fails with [`Error::Command`] carrying the command
//! line and captured diagnostics. Nothing here retries.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::{Error, Result};

/// Arguments for one control tool invocation, plus optional stdin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubectlCommand {
    args: Vec<String>,
    stdin: Option<String>,
}

impl KubectlCommand {
    pub fn new<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            stdin: None,
        }
    }

    /// Feed `input` to the command's stdin (used with `apply -f -`)
    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn stdin(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    /// First argument, i.e. the verb (`apply`, `delete`, `get`, ...)
    pub fn verb(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl fmt::Display for KubectlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.args.join(" "))
    }
}

/// Executes control tool commands
///
/// This trait abstracts process execution for testability.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command and return its stdout
    async fn run(&self, command: KubectlCommand) -> Result<String>;
}

/// [`CommandRunner`] backed by a `kubectl` binary
#[derive(Debug, Clone)]
pub struct Kubectl {
    binary: String,
    kubeconfig: Option<String>,
    namespace: Option<String>,
    timeout: Duration,
}

impl Kubectl {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            kubeconfig: None,
            namespace: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            binary: config.kubectl.clone(),
            kubeconfig: config.kubeconfig.clone(),
            namespace: config.namespace.clone(),
            timeout: config.command_timeout(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn full_args(&self, command: &KubectlCommand) -> Vec<String> {
        let mut args = Vec::with_capacity(command.args.len() + 4);
        if let Some(ref kubeconfig) = self.kubeconfig {
            args.push("--kubeconfig".to_string());
            args.push(kubeconfig.clone());
        }
        if let Some(ref namespace) = self.namespace {
            args.push("-n".to_string());
            args.push(namespace.clone());
        }
        args.extend(command.args.iter().cloned());
        args
    }
}

#[async_trait]
impl CommandRunner for Kubectl {
    async fn run(&self, command: KubectlCommand) -> Result<String> {
        let args = self.full_args(&command);
        let cmdline = format!("{} {}", self.binary, args.join(" "));
        info!("Running: {}", cmdline);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::command(&cmdline, format!("failed to execute: {}", e)))?;

        if let Some(input) = command.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(input.as_bytes())
                    .await
                    .map_err(|e| Error::command(&cmdline, format!("failed to write stdin: {}", e)))?;
            }
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!("{} timed out after {:?}", cmdline, self.timeout);
                Error::command(&cmdline, format!("timed out after {:?}", self.timeout))
            })?
            .map_err(|e| Error::command(&cmdline, format!("failed to wait: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() {
            debug!("Output: {}", stdout.trim_end());
            Ok(stdout)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let diagnostic = format!("{}{}", stderr, stdout).trim().to_string();
            warn!(
                code = ?output.status.code(),
                "Error message:\n{}",
                diagnostic
            );
            Err(Error::command(cmdline, diagnostic))
        }
    }
}
