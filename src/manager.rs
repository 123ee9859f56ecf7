//! Controller process under test
//!
//! When configured, the suite starts the CHPA controller binary itself and
//! stops it at the end, dumping whatever it printed. Without a binary the
//! controller is assumed to already run in the cluster.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{Error, Result};

/// Captured output of a stopped controller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerOutput {
    pub stdout: String,
    pub stderr: String,
}

/// A running controller process, killed if dropped
///
/// Its stdout and stderr are drained in the background from the moment it
/// starts, so the process never stalls on a full pipe.
#[derive(Debug)]
pub struct ManagerProcess {
    binary: PathBuf,
    child: Child,
    stdout: Option<JoinHandle<Vec<u8>>>,
    stderr: Option<JoinHandle<Vec<u8>>>,
}

fn drain<R>(stream: Option<R>, name: &'static str) -> Option<JoinHandle<Vec<u8>>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut stream = stream?;
    Some(tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Err(e) = stream.read_to_end(&mut buf).await {
            warn!("[Manager] reading {} failed: {}", name, e);
        }
        buf
    }))
}

async fn collect(handle: Option<JoinHandle<Vec<u8>>>, cmdline: &str) -> Result<String> {
    let Some(handle) = handle else {
        return Ok(String::new());
    };
    let bytes = handle
        .await
        .map_err(|e| Error::command(cmdline, format!("output reader failed: {}", e)))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

impl ManagerProcess {
    pub fn start(binary: &Path, args: &[String]) -> Result<Self> {
        info!("[Manager] Starting {} {}", binary.display(), args.join(" "));
        let mut child = Command::new(binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::command(
                    binary.display().to_string(),
                    format!("failed to execute: {}", e),
                )
            })?;
        let stdout = drain(child.stdout.take(), "stdout");
        let stderr = drain(child.stderr.take(), "stderr");
        Ok(Self {
            binary: binary.to_path_buf(),
            child,
            stdout,
            stderr,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Kill the controller and collect its output
    pub async fn stop(mut self) -> Result<ManagerOutput> {
        let cmdline = self.binary.display().to_string();
        if let Err(e) = self.child.start_kill() {
            // already exited on its own
            warn!("[Manager] {} could not be killed: {}", cmdline, e);
        }
        self.child
            .wait()
            .await
            .map_err(|e| Error::command(&cmdline, format!("failed to wait: {}", e)))?;

        let output = ManagerOutput {
            stdout: collect(self.stdout.take(), &cmdline).await?,
            stderr: collect(self.stderr.take(), &cmdline).await?,
        };
        info!("[Manager] {} stopped", cmdline);
        if !output.stdout.is_empty() {
            info!("[Manager] stdout:\n{}", output.stdout.trim_end());
        }
        if !output.stderr.is_empty() {
            info!("[Manager] stderr:\n{}", output.stderr.trim_end());
        }
        Ok(output)
    }
}
