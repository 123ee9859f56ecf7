//! Synthetic traffic against a fixture service
//!
//! Load runs inside the cluster as a one-replica Deployment named
//! `{target}-load` that loops `wget` against the target service. It carries
//! the suite label so a purge removes it even if a scenario never stops it.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use tracing::info;

use crate::cluster::FIXTURE_LABEL_KEY;
use crate::config::HarnessConfig;
use crate::kubectl::{CommandRunner, KubectlCommand};
use crate::Result;

/// Name of the load generator for `target`
pub fn load_name(target: &str) -> String {
    format!("{}-load", target)
}

/// Shell loop requesting `target` once per `interval`
pub fn load_script(target: &str, interval: Duration) -> String {
    format!(
        "while true; do echo 'next'; wget -q -O- {}; sleep {}; done;",
        target,
        interval.as_secs_f64()
    )
}

/// A running load generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSession {
    pub name: String,
    pub target: String,
    pub interval: Duration,
}

/// Starts and stops load generators
#[derive(Clone)]
pub struct LoadController {
    runner: Arc<dyn CommandRunner>,
    image: String,
    label_key: String,
    label_value: String,
}

impl LoadController {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &HarnessConfig) -> Self {
        Self {
            runner,
            image: config.load_image.clone(),
            label_key: config.label_key.clone(),
            label_value: config.label_value.clone(),
        }
    }

    /// Start requesting `target` every `interval`. Returns once the generator
    /// has been created, not once traffic is flowing.
    pub async fn start(&self, target: &str, interval: Duration) -> Result<LoadSession> {
        let session = LoadSession {
            name: load_name(target),
            target: target.to_string(),
            interval,
        };
        info!(
            "[Load] Starting {} against {} every {:?}",
            session.name, target, interval
        );

        let manifest = serde_json::to_string(&self.deployment(&session))?;
        self.runner
            .run(KubectlCommand::new(["apply", "-f", "-"]).with_stdin(manifest))
            .await?;
        Ok(session)
    }

    /// Stop the generator for `target`; stopping one that is not running is
    /// not an error
    pub async fn stop(&self, target: &str) -> Result<()> {
        let name = load_name(target);
        info!("[Load] Stopping {}", name);
        self.runner
            .run(KubectlCommand::new([
                "delete".to_string(),
                "deployment".to_string(),
                name,
                "--ignore-not-found".to_string(),
            ]))
            .await?;
        Ok(())
    }

    fn deployment(&self, session: &LoadSession) -> Deployment {
        let labels = BTreeMap::from([
            (self.label_key.clone(), self.label_value.clone()),
            (FIXTURE_LABEL_KEY.to_string(), session.name.clone()),
        ]);

        Deployment {
            metadata: ObjectMeta {
                name: Some(session.name.clone()),
                labels: Some(labels.clone()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(BTreeMap::from([(
                        FIXTURE_LABEL_KEY.to_string(),
                        session.name.clone(),
                    )])),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: "load".to_string(),
                            image: Some(self.image.clone()),
                            command: Some(vec![
                                "/bin/sh".to_string(),
                                "-c".to_string(),
                                load_script(&session.target, session.interval),
                            ]),
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubectl::MockCommandRunner;
    use crate::Error;
    use serde_json::Value;

    fn controller(mock: MockCommandRunner) -> LoadController {
        LoadController::new(Arc::new(mock), &HarnessConfig::default())
    }

    #[test]
    fn script_uses_fractional_seconds() {
        assert_eq!(
            load_script("web", Duration::from_millis(500)),
            "while true; do echo 'next'; wget -q -O- web; sleep 0.5; done;"
        );
        assert!(load_script("web", Duration::from_secs(1)).contains("sleep 1;"));
    }

    #[tokio::test]
    async fn start_applies_labelled_generator() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .withf(|cmd| cmd.args() == ["apply", "-f", "-"])
            .times(1)
            .returning(|cmd| {
                let deploy: Value = serde_json::from_str(cmd.stdin().unwrap()).unwrap();
                assert_eq!(deploy["metadata"]["name"], "web-load");
                assert_eq!(deploy["metadata"]["labels"]["app"], "chpa-test");
                let container = &deploy["spec"]["template"]["spec"]["containers"][0];
                assert_eq!(container["image"], "busybox");
                assert_eq!(container["command"][0], "/bin/sh");
                assert!(container["command"][2]
                    .as_str()
                    .unwrap()
                    .contains("wget -q -O- web; sleep 0.5"));
                Ok(String::new())
            });

        let session = controller(mock)
            .start("web", Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(session.name, "web-load");
        assert_eq!(session.target, "web");
    }

    #[tokio::test]
    async fn start_failure_propagates() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .returning(|_| Err(Error::command("kubectl apply -f -", "quota exceeded")));

        let err = controller(mock)
            .start("web", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_command());
    }

    #[tokio::test]
    async fn stop_deletes_generator_by_name() {
        let mut mock = MockCommandRunner::new();
        mock.expect_run()
            .withf(|cmd| {
                cmd.args() == ["delete", "deployment", "web-load", "--ignore-not-found"]
            })
            .times(1)
            .returning(|_| Ok(String::new()));

        controller(mock).stop("web").await.unwrap();
    }
}
