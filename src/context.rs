//! Everything a suite run shares: configuration, the command runner, and the
//! controller process when the harness owns it.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cluster::{ClusterFixture, ServerVersion};
use crate::config::HarnessConfig;
use crate::fixture_store::FixtureStore;
use crate::kubectl::{CommandRunner, Kubectl};
use crate::load::LoadController;
use crate::manager::ManagerProcess;
use crate::poll::ConvergencePoller;
use crate::Result;

pub struct HarnessContext {
    config: HarnessConfig,
    cluster: ClusterFixture,
    load: LoadController,
    store: FixtureStore,
    poller: ConvergencePoller,
    manager: Option<ManagerProcess>,
}

impl HarnessContext {
    pub fn new(config: HarnessConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            cluster: ClusterFixture::new(runner.clone(), &config),
            load: LoadController::new(runner, &config),
            store: FixtureStore::from_config(&config),
            poller: ConvergencePoller::new(config.poll_interval()),
            manager: None,
            config,
        }
    }

    /// Context talking to the cluster through the configured `kubectl`
    pub fn from_config(config: HarnessConfig) -> Self {
        let runner = Arc::new(Kubectl::from_config(&config));
        Self::new(config, runner)
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn cluster(&self) -> &ClusterFixture {
        &self.cluster
    }

    pub fn load(&self) -> &LoadController {
        &self.load
    }

    pub fn store(&self) -> &FixtureStore {
        &self.store
    }

    pub fn poller(&self) -> &ConvergencePoller {
        &self.poller
    }

    pub fn manager_running(&self) -> bool {
        self.manager.is_some()
    }

    /// Verify the cluster is reachable and start the controller if the
    /// harness owns it
    pub async fn setup(&mut self) -> Result<ServerVersion> {
        let version = self.cluster.server_version().await?;
        if self.manager.is_none() {
            if let Some(ref binary) = self.config.manager_binary {
                self.manager = Some(ManagerProcess::start(binary, &self.config.manager_args)?);
            }
        }
        Ok(version)
    }

    /// Stop the controller and delete everything carrying the suite label.
    ///
    /// The purge runs even if stopping the controller failed; the first error
    /// is returned.
    pub async fn teardown(&mut self) -> Result<()> {
        let stopped = match self.manager.take() {
            Some(manager) => manager.stop().await.map(|_| ()),
            None => Ok(()),
        };
        if let Err(ref e) = stopped {
            warn!("[Suite] Failed to stop controller: {}", e);
        }

        info!("[Suite] Purging {}", self.config.label_selector());
        let purged = self
            .cluster
            .purge(&self.config.label_key, &self.config.label_value)
            .await;
        stopped.and(purged)
    }
}
