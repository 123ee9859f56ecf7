//! Scoped descriptor files
//!
//! `kubectl apply -f` needs a file on disk. Each [`SpecFile`] owns one
//! descriptor and writes it at most once, to a uniquely named `.json` file.
//! The file lives exactly as long as the `SpecFile`: it is removed on
//! [`SpecFile::release`] or when the value is dropped, whichever comes first,
//! so a failing assertion or an early `?` return still cleans up.

use std::cell::OnceCell;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chpa_spec::AutoscalerSpec;
use tempfile::TempPath;
use tracing::{debug, info};

use crate::config::HarnessConfig;
use crate::Result;

/// Extension of every persisted descriptor
pub const SPEC_FILE_SUFFIX: &str = ".json";

/// Creates [`SpecFile`]s in one directory
#[derive(Debug, Clone)]
pub struct FixtureStore {
    dir: PathBuf,
}

impl FixtureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            config
                .fixture_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Take ownership of a descriptor; nothing is written until
    /// [`SpecFile::persist`] is called
    pub fn scoped(&self, spec: AutoscalerSpec) -> SpecFile {
        SpecFile {
            spec,
            dir: self.dir.clone(),
            path: OnceCell::new(),
        }
    }

    /// Remove a descriptor file by path; an already absent file is not an error
    pub fn release(path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("[FixtureStore] {} already removed", path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// A descriptor bound to its (lazily created) backing file
#[derive(Debug)]
pub struct SpecFile {
    spec: AutoscalerSpec,
    dir: PathBuf,
    path: OnceCell<TempPath>,
}

impl SpecFile {
    pub fn spec(&self) -> &AutoscalerSpec {
        &self.spec
    }

    /// Path of the backing file, if it has been written
    pub fn path(&self) -> Option<&Path> {
        self.path.get().map(|p| &**p)
    }

    /// Write the descriptor and return the file path.
    ///
    /// Only the first call writes; later calls return the same path without
    /// touching the file.
    pub fn persist(&self) -> Result<&Path> {
        if let Some(path) = self.path.get() {
            return Ok(&**path);
        }

        let contents = self.spec.serialize();
        let mut file = tempfile::Builder::new()
            .prefix(&format!("{}-", self.spec.name()))
            .suffix(SPEC_FILE_SUFFIX)
            .tempfile_in(&self.dir)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;

        let path = self.path.get_or_init(|| file.into_temp_path());
        info!("[FixtureStore] Created file {}", path.display());
        debug!("{}", contents);
        Ok(&**path)
    }

    /// Remove the backing file now.
    ///
    /// A file that was never written, or was already deleted by someone else,
    /// is not an error.
    pub fn release(mut self) -> Result<()> {
        let Some(path) = self.path.take() else {
            return Ok(());
        };
        let shown = path.display().to_string();
        match path.close() {
            Ok(()) => {
                debug!("[FixtureStore] Removed {}", shown);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("[FixtureStore] {} already removed", shown);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
