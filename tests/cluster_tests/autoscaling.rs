//! Stories about how the controller scales a CPU-bound deployment

use chpa_e2e::scenario::Outcome;
use chpa_e2e::scenarios;

use super::helpers::run_scenario;

/// Story: raising minReplicas scales an idle deployment without any load
#[tokio::test]
#[ignore]
async fn story_min_replicas_raises_idle_deployment() {
    let outcome = run_scenario(scenarios::min_replicas_auto_increase()).await;
    assert_eq!(outcome, Outcome::Passed);
}

/// Story: under load the deployment climbs to max in limited steps and
/// falls back to one replica when the load stops
#[tokio::test]
#[ignore]
async fn story_load_raises_to_max_in_steps() {
    let outcome = run_scenario(scenarios::raise_to_max()).await;
    assert_eq!(outcome, Outcome::Passed);
}

/// Story: a large scale-up factor reaches max in a single step
#[tokio::test]
#[ignore]
async fn story_large_factor_raises_to_max_at_once() {
    let outcome = run_scenario(scenarios::raise_to_max_fast()).await;
    assert_eq!(outcome, Outcome::Passed);
}

/// Story: a broken autoscaler targeting the same deployment does not stop a
/// correct one from scaling it
#[tokio::test]
#[ignore]
async fn story_incorrect_descriptor_does_not_block_correct_one() {
    let outcome = run_scenario(scenarios::incorrect_spec()).await;
    assert_eq!(outcome, Outcome::Passed);
}

/// Story: re-applying a fixed descriptor over a broken one makes it work
#[tokio::test]
#[ignore]
async fn story_fixed_descriptor_takes_over() {
    let outcome = run_scenario(scenarios::fix_incorrect_spec()).await;
    assert_eq!(outcome, Outcome::Passed);
}
