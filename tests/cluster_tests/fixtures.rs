//! Stories about fixtures and descriptors, independent of the controller

use std::time::Duration;

use chpa_e2e::Error;
use chpa_spec::SpecBuilder;

use super::helpers::{context, exclusive};

/// Story: a fresh fixture settles at one replica and disappears on teardown
#[tokio::test]
#[ignore]
async fn story_fixture_lifecycle() {
    let _cluster = exclusive();
    let mut ctx = context().await;
    let config = ctx.config().clone();
    let name = config.fixture_name("fixture-lifecycle");

    let handle = ctx
        .cluster()
        .setup(&name, &config.label_key, &config.label_value)
        .await
        .expect("fixture setup");

    let cluster = ctx.cluster();
    let target = name.as_str();
    let settled = ctx
        .poller()
        .wait_until(Duration::from_secs(120), move || cluster.has_replicas(target, 1))
        .await
        .expect("replica lookup");
    assert!(settled, "{} never reported one replica", name);

    ctx.cluster().teardown(&handle, &[]).await.expect("fixture teardown");
    let err = ctx.cluster().replica_status(&name).await.unwrap_err();
    assert!(err.is_command(), "deployment should be gone: {}", err);

    ctx.teardown().await.expect("suite teardown");
}

/// Story: the server accepts a rendered descriptor and the descriptor file is
/// removed once released
#[tokio::test]
#[ignore]
async fn story_descriptor_is_accepted_by_server() {
    let _cluster = exclusive();
    let mut ctx = context().await;
    let config = ctx.config().clone();
    let name = config.fixture_name("descriptor-apply");
    let handle = ctx
        .cluster()
        .setup(&name, &config.label_key, &config.label_value)
        .await
        .expect("fixture setup");

    let spec = SpecBuilder::new(&name, 3, &name).build().expect("valid spec");
    let file = ctx.store().scoped(spec);
    let applied = ctx.cluster().apply_spec(&file).await;
    let path = file.path().map(|p| p.to_path_buf());
    file.release().expect("release");

    ctx.cluster()
        .teardown(&handle, &[name.clone()])
        .await
        .expect("fixture teardown");
    ctx.teardown().await.expect("suite teardown");

    applied.expect("descriptor applied");
    assert!(!path.expect("descriptor was written").exists());
}

/// Story: command failures carry the tool's own diagnostics
#[tokio::test]
#[ignore]
async fn story_missing_deployment_is_command_error() {
    let _cluster = exclusive();
    let ctx = context().await;
    let err = ctx
        .cluster()
        .replica_status("chpa-test-does-not-exist")
        .await
        .unwrap_err();
    match err {
        Error::Command { output, .. } => assert!(output.contains("not found"), "{}", output),
        other => panic!("unexpected error: {}", other),
    }
}
