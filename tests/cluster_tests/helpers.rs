//! Shared setup for live-cluster tests

use std::sync::{Mutex, MutexGuard};

use chpa_e2e::config::HarnessConfig;
use chpa_e2e::context::HarnessContext;
use chpa_e2e::scenario::{Outcome, Scenario, TestOrchestrator};
use chpa_e2e::telemetry;

/// Live tests share the suite label, and suite teardown purges everything
/// carrying it, so only one may touch the cluster at a time.
static LIVE_CLUSTER: Mutex<()> = Mutex::new(());

/// Hold for the whole test. A panicking test poisons the lock; later tests
/// still run.
pub fn exclusive() -> MutexGuard<'static, ()> {
    LIVE_CLUSTER.lock().unwrap_or_else(|e| e.into_inner())
}

/// Context from `CHPA_E2E_*` variables, with the cluster checked and the
/// controller started if configured
pub async fn context() -> HarnessContext {
    telemetry::init();
    let config = HarnessConfig::from_env().expect("harness config");
    let mut ctx = HarnessContext::from_config(config);
    ctx.setup().await.expect("cluster should be reachable");
    ctx
}

/// Run one scenario as its own suite and return its outcome
pub async fn run_scenario(scenario: Scenario) -> Outcome {
    let _cluster = exclusive();
    let mut ctx = context().await;
    let mut orchestrator = TestOrchestrator::new(scenario.name());
    let outcome = orchestrator.run(&ctx, &scenario).await.outcome.clone();
    ctx.teardown().await.expect("suite teardown");
    orchestrator.finish().log_summary();
    outcome
}
