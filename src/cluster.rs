//! Workload fixture the autoscaler acts on
//!
//! Each fixture is a Deployment running a CPU-bound HTTP server plus a Service
//! in front of it, both tagged with the suite label (for bulk cleanup) and a
//! per-fixture `test=<name>` label (for traffic targeting). The harness never
//! writes the replica count; it only reads what the controller under test
//! produced.

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, ResourceRequirements, Service,
    ServicePort, ServiceSpec,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use chpa_spec::CHPA_RESOURCE;

use crate::config::HarnessConfig;
use crate::fixture_store::SpecFile;
use crate::kubectl::{CommandRunner, KubectlCommand};
use crate::{Error, Result};

/// Per-fixture label key; its value is the fixture name
pub const FIXTURE_LABEL_KEY: &str = "test";

/// A workload created for one group of scenarios
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureHandle {
    name: String,
    label_key: String,
    label_value: String,
}

impl FixtureHandle {
    pub fn new(
        name: impl Into<String>,
        label_key: impl Into<String>,
        label_value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            label_key: label_key.into(),
            label_value: label_value.into(),
        }
    }

    /// Name shared by the Deployment, the Service and the default descriptor
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label_key(&self) -> &str {
        &self.label_key
    }

    pub fn label_value(&self) -> &str {
        &self.label_value
    }

    /// Suite-wide label selector (`key=value`)
    pub fn label_selector(&self) -> String {
        format!("{}={}", self.label_key, self.label_value)
    }

    fn labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (self.label_key.clone(), self.label_value.clone()),
            (FIXTURE_LABEL_KEY.to_string(), self.name.clone()),
        ])
    }

    fn selector(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(FIXTURE_LABEL_KEY.to_string(), self.name.clone())])
    }
}

/// Snapshot of a Deployment's replica counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaStatus {
    /// `spec.replicas`, as last set by the autoscaler
    pub desired: Option<i32>,
    /// `status.replicas`; absent reads as 0
    pub observed: i32,
}

/// Kubernetes server version reported by the control tool
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerVersion {
    pub major: String,
    pub minor: String,
    #[serde(default)]
    pub git_version: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VersionOutput {
    server_version: Option<ServerVersion>,
}

/// Creates, observes and removes workload fixtures
#[derive(Clone)]
pub struct ClusterFixture {
    runner: Arc<dyn CommandRunner>,
    image: String,
    cpu_request: String,
    port: i32,
}

impl ClusterFixture {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &HarnessConfig) -> Self {
        Self {
            runner,
            image: config.workload_image.clone(),
            cpu_request: config.workload_cpu_request.clone(),
            port: config.workload_port,
        }
    }

    /// Create the Deployment and its Service.
    ///
    /// Failures are not retried; a fixture that cannot be created means the
    /// environment is unusable for this scenario.
    pub async fn setup(&self, name: &str, label_key: &str, label_value: &str) -> Result<FixtureHandle> {
        let handle = FixtureHandle::new(name, label_key, label_value);
        info!("[Fixture] Creating {} ({})", name, handle.label_selector());

        let manifest = json!({
            "apiVersion": "v1",
            "kind": "List",
            "items": [
                serde_json::to_value(self.deployment(&handle))?,
                serde_json::to_value(self.service(&handle))?,
            ],
        });
        self.runner
            .run(KubectlCommand::new(["apply", "-f", "-"]).with_stdin(manifest.to_string()))
            .await?;
        Ok(handle)
    }

    /// Delete the autoscalers applied against this fixture, then its
    /// Deployment and Service.
    ///
    /// Only named resources are deleted; other fixtures sharing the suite
    /// label are left alone. Suite-wide cleanup is [`ClusterFixture::purge`].
    pub async fn teardown(&self, handle: &FixtureHandle, autoscalers: &[String]) -> Result<()> {
        info!("[Fixture] Deleting {}", handle.name());
        if !autoscalers.is_empty() {
            let mut args = vec!["delete".to_string(), CHPA_RESOURCE.to_string()];
            args.extend(autoscalers.iter().cloned());
            args.push("--ignore-not-found".to_string());
            self.runner.run(KubectlCommand::new(args)).await?;
        }
        self.runner
            .run(KubectlCommand::new([
                "delete",
                "deployment,service",
                handle.name(),
                "--ignore-not-found",
            ]))
            .await?;
        Ok(())
    }

    /// Delete everything the harness created under `label_key=label_value`
    pub async fn purge(&self, label_key: &str, label_value: &str) -> Result<()> {
        let selector = format!("{}={}", label_key, label_value);
        info!("[Fixture] Purging resources labelled {}", selector);
        self.runner
            .run(KubectlCommand::new([
                "delete".to_string(),
                format!("service,deployment,{}", CHPA_RESOURCE),
                "-l".to_string(),
                selector,
                "--ignore-not-found".to_string(),
            ]))
            .await?;
        Ok(())
    }

    /// Apply a descriptor, writing its backing file if needed
    pub async fn apply_spec(&self, file: &SpecFile) -> Result<()> {
        let path = file.persist()?;
        info!(
            "[Fixture] Applying autoscaler {} -> {}",
            file.spec().name(),
            file.spec().target().name
        );
        self.runner
            .run(KubectlCommand::new([
                "apply".to_string(),
                "-f".to_string(),
                path.display().to_string(),
            ]))
            .await?;
        Ok(())
    }

    /// Fetch the Deployment and read its replica counts
    pub async fn replica_status(&self, name: &str) -> Result<ReplicaStatus> {
        let output = self
            .runner
            .run(KubectlCommand::new(["get", "deployment", name, "-o", "json"]))
            .await?;
        let deployment: Deployment = serde_json::from_str(&output)
            .map_err(|e| Error::observation(format!("deployment {}", name), e.to_string()))?;

        Ok(ReplicaStatus {
            desired: deployment.spec.and_then(|s| s.replicas),
            observed: deployment.status.and_then(|s| s.replicas).unwrap_or(0),
        })
    }

    /// Convergence predicate: does the Deployment currently report `expected`
    /// replicas?
    pub async fn has_replicas(&self, name: &str, expected: i32) -> Result<bool> {
        let status = self.replica_status(name).await?;
        info!(
            "[Fixture] deploy replicas: {}  (waiting {})",
            status.observed, expected
        );
        Ok(status.observed == expected)
    }

    /// Check the control tool can reach the API server
    pub async fn server_version(&self) -> Result<ServerVersion> {
        let output = self
            .runner
            .run(KubectlCommand::new(["version", "-o", "json"]))
            .await?;
        let parsed: VersionOutput = serde_json::from_str(&output)?;
        let version = parsed
            .server_version
            .ok_or_else(|| Error::observation("kubectl version", "no serverVersion reported"))?;
        info!(
            "Kubernetes Server Version: {}.{} ({})",
            version.major, version.minor, version.git_version
        );
        Ok(version)
    }

    fn deployment(&self, handle: &FixtureHandle) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(handle.name().to_string()),
                labels: Some(handle.labels()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(handle.selector()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(handle.labels()),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: handle.name().to_string(),
                            image: Some(self.image.clone()),
                            ports: Some(vec![ContainerPort {
                                container_port: self.port,
                                ..Default::default()
                            }]),
                            resources: Some(ResourceRequirements {
                                requests: Some(BTreeMap::from([(
                                    "cpu".to_string(),
                                    Quantity(self.cpu_request.clone()),
                                )])),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn service(&self, handle: &FixtureHandle) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some(handle.name().to_string()),
                labels: Some(handle.labels()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                selector: Some(handle.selector()),
                ports: Some(vec![ServicePort {
                    port: self.port,
                    target_port: Some(IntOrString::Int(self.port)),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
