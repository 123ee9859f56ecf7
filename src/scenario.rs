//! Scenario sequencing and run-and-report.
//!
//! A [`Scenario`] is data: an ordered list of [`Step`]s run against one
//! fixture. [`TestOrchestrator`] creates the fixture, runs the steps, and
//! tears everything down again whatever happened, recording one of three
//! outcomes:
//!
//! - `Passed`: every expectation converged
//! - `Failed`: an expectation timed out, i.e. the controller misbehaved
//! - `Errored`: a configuration or command error, i.e. the harness or its
//!   environment is broken
//!
//! A failed expectation ends the scenario; later steps are skipped.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use chpa_spec::{Overrides, SpecBuilder};
use futures::FutureExt;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::cluster::FixtureHandle;
use crate::config::HarnessConfig;
use crate::context::HarnessContext;
use crate::fixture_store::SpecFile;
use crate::{Error, Result};

/// Which configured deadline an expectation waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// One controller cycle, no load involved
    Default,
    /// Load, cooldown windows and pod start-up
    Long,
}

impl Timeout {
    pub fn resolve(self, config: &HarnessConfig) -> Duration {
        match self {
            Timeout::Default => config.default_timeout(),
            Timeout::Long => config.long_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Build, persist and apply a descriptor targeting the fixture. Without a
    /// name the descriptor is named after the fixture.
    Apply {
        name: Option<String>,
        max_replicas: u32,
        overrides: Overrides,
    },
    /// Start a load generator against the fixture service
    StartLoad { interval: Duration },
    /// Stop the fixture's load generator
    StopLoad,
    /// Wait until the fixture reports `count` replicas
    ExpectReplicas { count: i32, timeout: Timeout },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Apply {
                name: Some(name),
                max_replicas,
                ..
            } => write!(f, "apply {} (max {})", name, max_replicas),
            Step::Apply { max_replicas, .. } => write!(f, "apply (max {})", max_replicas),
            Step::StartLoad { interval } => write!(f, "start load every {:?}", interval),
            Step::StopLoad => f.write_str("stop load"),
            Step::ExpectReplicas { count, timeout } => {
                write!(f, "expect {} replicas ({:?} timeout)", count, timeout)
            }
        }
    }
}

/// A named sequence of steps sharing one fixture
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    name: String,
    description: String,
    steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Apply a descriptor named after the fixture
    pub fn apply(self, max_replicas: u32, overrides: Overrides) -> Self {
        self.step(Step::Apply {
            name: None,
            max_replicas,
            overrides,
        })
    }

    /// Apply a descriptor with its own name, still targeting the fixture
    pub fn apply_named(self, name: impl Into<String>, max_replicas: u32, overrides: Overrides) -> Self {
        self.step(Step::Apply {
            name: Some(name.into()),
            max_replicas,
            overrides,
        })
    }

    pub fn start_load(self, interval: Duration) -> Self {
        self.step(Step::StartLoad { interval })
    }

    pub fn stop_load(self) -> Self {
        self.step(Step::StopLoad)
    }

    pub fn expect_replicas(self, count: i32, timeout: Timeout) -> Self {
        self.step(Step::ExpectReplicas { count, timeout })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Errored(String),
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed)
    }

    fn tag(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASS",
            Outcome::Failed(_) => "FAIL",
            Outcome::Errored(_) => "ERROR",
        }
    }

    fn detail(&self) -> Option<&str> {
        match self {
            Outcome::Passed => None,
            Outcome::Failed(reason) | Outcome::Errored(reason) => Some(reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub name: String,
    pub outcome: Outcome,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub suite: String,
    pub reports: Vec<ScenarioReport>,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_passed()).count()
    }

    /// Names of scenarios that failed or errored, in run order
    pub fn failed(&self) -> Vec<String> {
        self.reports
            .iter()
            .filter(|r| !r.outcome.is_passed())
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn log_summary(&self) {
        let total: Duration = self.reports.iter().map(|r| r.duration).sum();

        info!("========================================");
        info!("  {}", self.suite.to_uppercase());
        info!("========================================");
        for r in &self.reports {
            info!(
                "  {:5}  {:40} {:.1}s",
                r.outcome.tag(),
                r.name,
                r.duration.as_secs_f64()
            );
            if let Some(detail) = r.outcome.detail() {
                let truncated: String = detail.chars().take(200).collect();
                info!("        -> {}", truncated);
            }
        }
        info!("----------------------------------------");
        info!(
            "  {} passed, {} failed ({:.1}s total)",
            self.passed(),
            self.reports.len() - self.passed(),
            total.as_secs_f64()
        );
        info!("========================================");
    }

    /// `Ok` only if every scenario passed
    pub fn into_result(self) -> Result<()> {
        let failed = self.failed();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::ScenariosFailed {
                suite: self.suite,
                failed,
            })
        }
    }
}

/// Runs scenarios one after another and collects their outcomes
pub struct TestOrchestrator {
    suite: String,
    reports: Vec<ScenarioReport>,
}

impl TestOrchestrator {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            reports: Vec::new(),
        }
    }

    /// Run one scenario inside its own fixture and record the outcome
    pub async fn run(&mut self, ctx: &HarnessContext, scenario: &Scenario) -> &ScenarioReport {
        info!("[Scenario] Run {}: {}", scenario.name(), scenario.description());
        let start = Instant::now();
        let outcome = run_scenario(ctx, scenario).await;
        match &outcome {
            Outcome::Passed => info!("[Scenario] {} passed", scenario.name()),
            Outcome::Failed(reason) => error!("[Scenario] {} failed: {}", scenario.name(), reason),
            Outcome::Errored(reason) => error!("[Scenario] {} errored: {}", scenario.name(), reason),
        }

        self.reports.push(ScenarioReport {
            name: scenario.name().to_string(),
            outcome,
            duration: start.elapsed(),
        });
        &self.reports[self.reports.len() - 1]
    }

    /// Suite setup, every scenario in order, suite teardown.
    ///
    /// Scenario failures are in the report, not the `Err`; an `Err` means the
    /// suite could not be set up or cleaned up.
    pub async fn run_suite(
        mut self,
        ctx: &mut HarnessContext,
        scenarios: &[Scenario],
    ) -> Result<SuiteReport> {
        ctx.setup().await?;
        for scenario in scenarios {
            self.run(ctx, scenario).await;
        }
        let teardown = ctx.teardown().await;

        let report = self.finish();
        report.log_summary();
        teardown.map(|()| report)
    }

    pub fn finish(self) -> SuiteReport {
        SuiteReport {
            suite: self.suite,
            reports: self.reports,
        }
    }
}

async fn run_scenario(ctx: &HarnessContext, scenario: &Scenario) -> Outcome {
    let config = ctx.config();
    let name = config.fixture_name(scenario.name());
    let handle = match ctx
        .cluster()
        .setup(&name, &config.label_key, &config.label_value)
        .await
    {
        Ok(handle) => handle,
        Err(e) => return Outcome::Errored(e.to_string()),
    };

    let mut run = ScenarioRun {
        ctx,
        handle: &handle,
        files: Vec::new(),
        autoscalers: Vec::new(),
        load_active: false,
    };
    let mut outcome = match AssertUnwindSafe(run.execute(scenario.steps()))
        .catch_unwind()
        .await
    {
        Ok(Ok(None)) => Outcome::Passed,
        Ok(Ok(Some(reason))) => Outcome::Failed(reason),
        Ok(Err(e)) => Outcome::Errored(e.to_string()),
        Err(panic) => Outcome::Errored(format!("PANIC: {}", panic_message(panic.as_ref()))),
    };
    run.cleanup().await;
    let autoscalers = std::mem::take(&mut run.autoscalers);

    if let Err(e) = ctx.cluster().teardown(&handle, &autoscalers).await {
        error!("[Scenario] Teardown of {} failed: {}", handle.name(), e);
        if outcome.is_passed() {
            outcome = Outcome::Errored(format!("teardown failed: {}", e));
        }
    }
    outcome
}

/// Per-scenario state that must be cleaned up on every exit path
struct ScenarioRun<'a> {
    ctx: &'a HarnessContext,
    handle: &'a FixtureHandle,
    files: Vec<SpecFile>,
    /// Names of descriptors applied against the fixture, in first-apply order
    autoscalers: Vec<String>,
    load_active: bool,
}

impl<'a> ScenarioRun<'a> {
    /// `Ok(Some(reason))` when an expectation did not converge
    async fn execute(&mut self, steps: &[Step]) -> Result<Option<String>> {
        for (i, step) in steps.iter().enumerate() {
            info!("[Scenario] Step {}/{}: {}", i + 1, steps.len(), step);
            if let Some(reason) = self.step(step).await? {
                return Ok(Some(format!("step {} ({}): {}", i + 1, step, reason)));
            }
        }
        Ok(None)
    }

    async fn step(&mut self, step: &Step) -> Result<Option<String>> {
        let ctx = self.ctx;
        let handle: &'a FixtureHandle = self.handle;
        let target = handle.name();

        match step {
            Step::Apply {
                name,
                max_replicas,
                overrides,
            } => {
                let spec = SpecBuilder::new(name.as_deref().unwrap_or(target), *max_replicas, target)
                    .overrides(overrides.clone())
                    .build()?;
                if !self.autoscalers.iter().any(|n| n == spec.name()) {
                    self.autoscalers.push(spec.name().to_string());
                }
                let file = ctx.store().scoped(spec);
                ctx.cluster().apply_spec(&file).await?;
                self.files.push(file);
            }
            Step::StartLoad { interval } => {
                ctx.load().start(target, *interval).await?;
                self.load_active = true;
            }
            Step::StopLoad => {
                ctx.load().stop(target).await?;
                self.load_active = false;
            }
            Step::ExpectReplicas { count, timeout } => {
                let count = *count;
                let timeout = timeout.resolve(ctx.config());
                let cluster = ctx.cluster();
                let converged = ctx
                    .poller()
                    .wait_until(timeout, move || cluster.has_replicas(target, count))
                    .await?;
                if !converged {
                    return Ok(Some(format!(
                        "{} did not reach {} replicas within {:?}",
                        target, count, timeout
                    )));
                }
            }
        }
        Ok(None)
    }

    /// Stop load left running and remove descriptor files. Failures are
    /// logged; fixture teardown still follows.
    async fn cleanup(&mut self) {
        if self.load_active {
            if let Err(e) = self.ctx.load().stop(self.handle.name()).await {
                warn!("[Scenario] Failed to stop load for {}: {}", self.handle.name(), e);
            }
            self.load_active = false;
        }
        for file in self.files.drain(..) {
            if let Err(e) = file.release() {
                warn!("[Scenario] Failed to remove descriptor file: {}", e);
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubectl::{CommandRunner, KubectlCommand};
    use async_trait::async_trait;
    use chpa_spec::{MetricSourceType, TuningOverride};
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type FailWhen = Box<dyn Fn(&KubectlCommand) -> bool + Send + Sync>;

    /// Scripted stand-in for a cluster. Replica counts are served in order,
    /// the last one repeating.
    struct FakeCluster {
        replicas: Mutex<VecDeque<i32>>,
        commands: Mutex<Vec<KubectlCommand>>,
        applied: Mutex<Vec<Value>>,
        fail_when: Option<FailWhen>,
    }

    impl FakeCluster {
        fn new(replicas: &[i32]) -> Self {
            Self {
                replicas: Mutex::new(replicas.iter().copied().collect()),
                commands: Mutex::new(Vec::new()),
                applied: Mutex::new(Vec::new()),
                fail_when: None,
            }
        }

        fn failing_when(mut self, f: impl Fn(&KubectlCommand) -> bool + Send + Sync + 'static) -> Self {
            self.fail_when = Some(Box::new(f));
            self
        }

        fn command_lines(&self) -> Vec<String> {
            self.commands
                .lock()
                .unwrap()
                .iter()
                .map(|c| c.to_string())
                .collect()
        }

        fn applied(&self) -> Vec<Value> {
            self.applied.lock().unwrap().clone()
        }

        fn next_replicas(&self) -> i32 {
            let mut replicas = self.replicas.lock().unwrap();
            if replicas.len() > 1 {
                replicas.pop_front().unwrap()
            } else {
                replicas.front().copied().unwrap_or(0)
            }
        }
    }

    #[async_trait]
    impl CommandRunner for FakeCluster {
        async fn run(&self, command: KubectlCommand) -> Result<String> {
            self.commands.lock().unwrap().push(command.clone());
            if let Some(ref fail) = self.fail_when {
                if fail(&command) {
                    return Err(Error::command(command.to_string(), "scripted failure"));
                }
            }

            match command.verb() {
                Some("version") => Ok(json!({
                    "serverVersion": {"major": "1", "minor": "30", "gitVersion": "v1.30.0"}
                })
                .to_string()),
                Some("get") => Ok(json!({
                    "apiVersion": "apps/v1",
                    "kind": "Deployment",
                    "metadata": {"name": command.args()[2]},
                    "status": {"replicas": self.next_replicas()}
                })
                .to_string()),
                Some("apply") if command.stdin().is_none() => {
                    let contents = std::fs::read_to_string(&command.args()[2])?;
                    self.applied
                        .lock()
                        .unwrap()
                        .push(serde_json::from_str(&contents)?);
                    Ok(String::new())
                }
                _ => Ok(String::new()),
            }
        }
    }

    struct Harness {
        ctx: HarnessContext,
        cluster: Arc<FakeCluster>,
        dir: tempfile::TempDir,
    }

    fn harness(cluster: FakeCluster) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let config = HarnessConfig {
            fixture_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let cluster = Arc::new(cluster);
        Harness {
            ctx: HarnessContext::new(config, cluster.clone()),
            cluster,
            dir,
        }
    }

    fn min_replicas(n: u32) -> Overrides {
        Overrides::new().with(TuningOverride::MinReplicas(n))
    }

    fn files_left(h: &Harness) -> usize {
        std::fs::read_dir(h.dir.path()).unwrap().count()
    }

    // ==========================================================================
    // Story: a scenario whose expectation converges
    // ==========================================================================

    #[tokio::test(start_paused = true)]
    async fn converging_scenario_passes_and_cleans_up() {
        let h = harness(FakeCluster::new(&[1, 1, 2]));
        let scenario = Scenario::new("min", "min replicas raise the deployment")
            .apply(3, min_replicas(2))
            .expect_replicas(2, Timeout::Default);

        let mut orchestrator = TestOrchestrator::new("unit");
        let report = orchestrator.run(&h.ctx, &scenario).await;
        assert_eq!(report.outcome, Outcome::Passed);

        let applied = h.cluster.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0]["metadata"]["name"], "chpa-test-min");
        assert_eq!(applied[0]["spec"]["minReplicas"], 2);
        assert_eq!(applied[0]["spec"]["scaleTargetRef"]["name"], "chpa-test-min");

        let lines = h.cluster.command_lines();
        assert_eq!(lines[0], "apply -f -");
        assert!(lines.contains(&"delete deployment,service chpa-test-min --ignore-not-found".to_string()));
        assert_eq!(files_left(&h), 0);
    }

    // ==========================================================================
    // Story: the controller never converges
    // ==========================================================================

    #[tokio::test(start_paused = true)]
    async fn timeout_is_a_failure_not_an_error() {
        let h = harness(FakeCluster::new(&[1]));
        let scenario = Scenario::new("stuck", "never reaches two")
            .apply(3, min_replicas(2))
            .expect_replicas(2, Timeout::Default)
            .expect_replicas(3, Timeout::Default);

        let mut orchestrator = TestOrchestrator::new("unit");
        let outcome = orchestrator.run(&h.ctx, &scenario).await.outcome.clone();

        match outcome {
            Outcome::Failed(reason) => {
                assert!(reason.contains("step 2"), "{}", reason);
                assert!(reason.contains("did not reach 2 replicas"), "{}", reason);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        // teardown ran and the descriptor file is gone
        assert!(h
            .cluster
            .command_lines()
            .iter()
            .any(|l| l.starts_with("delete deployment,service chpa-test-stuck")));
        assert_eq!(files_left(&h), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn load_left_running_is_stopped() {
        let h = harness(FakeCluster::new(&[1]));
        let scenario = Scenario::new("loaded", "load never scales")
            .apply(8, Overrides::new())
            .start_load(Duration::from_millis(500))
            .expect_replicas(4, Timeout::Default)
            .stop_load();

        let mut orchestrator = TestOrchestrator::new("unit");
        orchestrator.run(&h.ctx, &scenario).await;

        let lines = h.cluster.command_lines();
        assert!(lines.contains(
            &"delete deployment chpa-test-loaded-load --ignore-not-found".to_string()
        ));
    }

    // ==========================================================================
    // Story: the harness itself breaks
    // ==========================================================================

    #[tokio::test(start_paused = true)]
    async fn apply_failure_is_an_error_and_still_tears_down() {
        let h = harness(
            FakeCluster::new(&[1])
                .failing_when(|cmd| cmd.verb() == Some("apply") && cmd.stdin().is_none()),
        );
        let scenario = Scenario::new("rejected", "server rejects the descriptor")
            .apply(3, Overrides::new())
            .expect_replicas(1, Timeout::Default);

        let mut orchestrator = TestOrchestrator::new("unit");
        let outcome = orchestrator.run(&h.ctx, &scenario).await.outcome.clone();

        match outcome {
            Outcome::Errored(reason) => assert!(reason.contains("scripted failure"), "{}", reason),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(!h
            .cluster
            .command_lines()
            .iter()
            .any(|l| l.starts_with("get deployment")));
        assert!(h
            .cluster
            .command_lines()
            .iter()
            .any(|l| l.starts_with("delete deployment,service chpa-test-rejected")));
        assert_eq!(files_left(&h), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_descriptor_is_an_error() {
        let h = harness(FakeCluster::new(&[1]));
        let scenario = Scenario::new("invalid", "max below min").apply(1, min_replicas(2));

        let mut orchestrator = TestOrchestrator::new("unit");
        let outcome = orchestrator.run(&h.ctx, &scenario).await.outcome.clone();

        assert!(matches!(outcome, Outcome::Errored(ref r) if r.contains("maxReplicas")));
        assert!(h.cluster.applied().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fixture_setup_failure_skips_steps() {
        let h = harness(FakeCluster::new(&[1]).failing_when(|cmd| cmd.stdin().is_some()));
        let scenario = Scenario::new("nofixture", "cluster refuses the workload")
            .apply(3, Overrides::new());

        let mut orchestrator = TestOrchestrator::new("unit");
        let outcome = orchestrator.run(&h.ctx, &scenario).await.outcome.clone();

        assert!(matches!(outcome, Outcome::Errored(_)));
        assert_eq!(h.cluster.command_lines(), vec!["apply -f -".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_failure_errors_a_passing_scenario() {
        let h = harness(FakeCluster::new(&[1]).failing_when(|cmd| cmd.verb() == Some("delete")));
        let scenario = Scenario::new("sticky", "nothing to wait for")
            .apply(3, Overrides::new())
            .expect_replicas(1, Timeout::Default);

        let mut orchestrator = TestOrchestrator::new("unit");
        let outcome = orchestrator.run(&h.ctx, &scenario).await.outcome.clone();

        assert!(matches!(outcome, Outcome::Errored(ref r) if r.starts_with("teardown failed")));
    }

    // ==========================================================================
    // Story: mismatched descriptor followed by a correct one
    // ==========================================================================

    #[tokio::test(start_paused = true)]
    async fn mismatched_then_correct_descriptor_are_applied_in_order() {
        let h = harness(FakeCluster::new(&[4, 1]));
        let scenario = Scenario::new("mismatch", "incorrect descriptor first")
            .apply_named(
                "incorrect",
                8,
                Overrides::new().with(TuningOverride::MetricSourceType(MetricSourceType::Pods)),
            )
            .apply(8, Overrides::new())
            .start_load(Duration::from_millis(500))
            .expect_replicas(4, Timeout::Long)
            .stop_load()
            .expect_replicas(1, Timeout::Long);

        let mut orchestrator = TestOrchestrator::new("unit");
        assert!(orchestrator.run(&h.ctx, &scenario).await.outcome.is_passed());

        let applied = h.cluster.applied();
        assert_eq!(applied.len(), 2);
        assert_eq!(applied[0]["metadata"]["name"], "incorrect");
        assert_eq!(applied[0]["spec"]["metrics"][0]["type"], "Pods");
        assert!(applied[0]["spec"]["metrics"][0]["resource"].is_object());
        assert_eq!(applied[1]["metadata"]["name"], "chpa-test-mismatch");
        assert_eq!(applied[1]["spec"]["metrics"][0]["type"], "Resource");
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_deletes_applied_autoscalers_by_name() {
        let h = harness(FakeCluster::new(&[1]));
        let scenario = Scenario::new("scoped", "two descriptors, one re-applied")
            .apply_named("incorrect", 8, Overrides::new())
            .apply(8, Overrides::new())
            .apply(8, min_replicas(1))
            .expect_replicas(1, Timeout::Default);

        let mut orchestrator = TestOrchestrator::new("unit");
        assert!(orchestrator.run(&h.ctx, &scenario).await.outcome.is_passed());

        let lines = h.cluster.command_lines();
        assert!(lines.contains(
            &"delete chpas.autoscalers.postmates.com incorrect chpa-test-scoped --ignore-not-found"
                .to_string()
        ));
        // label selectors are reserved for the suite-wide purge
        assert!(h
            .cluster
            .commands
            .lock()
            .unwrap()
            .iter()
            .all(|c| !c.args().iter().any(|a| a == "-l")));
    }

    // ==========================================================================
    // Story: whole suite
    // ==========================================================================

    #[tokio::test(start_paused = true)]
    async fn suite_reports_every_scenario_and_purges() {
        let mut h = harness(FakeCluster::new(&[2]));
        let scenarios = vec![
            Scenario::new("two", "reaches two")
                .apply(3, min_replicas(2))
                .expect_replicas(2, Timeout::Default),
            Scenario::new("three", "never reaches three")
                .apply(3, Overrides::new())
                .expect_replicas(3, Timeout::Default),
        ];

        let report = TestOrchestrator::new("unit")
            .run_suite(&mut h.ctx, &scenarios)
            .await
            .unwrap();

        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), vec!["three".to_string()]);

        let lines = h.cluster.command_lines();
        assert_eq!(lines[0], "version -o json");
        assert!(lines
            .last()
            .unwrap()
            .starts_with("delete service,deployment,chpas.autoscalers.postmates.com -l app=chpa-test"));

        match report.into_result().unwrap_err() {
            Error::ScenariosFailed { suite, failed } => {
                assert_eq!(suite, "unit");
                assert_eq!(failed, vec!["three".to_string()]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_cluster_aborts_suite_before_scenarios() {
        let mut h = harness(FakeCluster::new(&[1]).failing_when(|cmd| cmd.verb() == Some("version")));
        let scenarios = vec![Scenario::new("never", "not run").apply(3, Overrides::new())];

        let err = TestOrchestrator::new("unit")
            .run_suite(&mut h.ctx, &scenarios)
            .await
            .unwrap_err();

        assert!(err.is_command());
        assert_eq!(h.cluster.command_lines().len(), 1);
    }

    #[test]
    fn all_passed_suite_is_ok() {
        let report = SuiteReport {
            suite: "unit".to_string(),
            reports: vec![ScenarioReport {
                name: "only".to_string(),
                outcome: Outcome::Passed,
                duration: Duration::from_secs(1),
            }],
        };
        assert!(report.into_result().is_ok());
    }
}
