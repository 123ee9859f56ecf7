//! Built-in CPU autoscaling scenarios

use std::time::Duration;

use chpa_spec::{MetricSourceType, Overrides, TuningOverride};

use crate::scenario::{Scenario, Timeout};

/// Pause between requests of the load generator
pub const LOAD_INTERVAL: Duration = Duration::from_millis(500);

/// Every built-in scenario, in run order
pub fn all() -> Vec<Scenario> {
    vec![
        min_replicas_auto_increase(),
        raise_to_max(),
        raise_to_max_fast(),
        incorrect_spec(),
        fix_incorrect_spec(),
    ]
}

/// Look up a built-in scenario by name
pub fn by_name(name: &str) -> Option<Scenario> {
    all().into_iter().find(|s| s.name() == name)
}

pub fn min_replicas_auto_increase() -> Scenario {
    Scenario::new(
        "min-replicas-auto-increase",
        "raising minReplicas scales an idle deployment up",
    )
    .apply(3, Overrides::new().with(TuningOverride::MinReplicas(2)))
    .expect_replicas(2, Timeout::Default)
}

pub fn raise_to_max() -> Scenario {
    // growth is capped at scaleUpLimitMinimum (4) per step: 1 -> 4 -> 8
    Scenario::new("raise-to-max", "load scales up in limited steps, then back down")
        .apply(8, Overrides::new())
        .start_load(LOAD_INTERVAL)
        .expect_replicas(4, Timeout::Long)
        .expect_replicas(8, Timeout::Long)
        .stop_load()
        .expect_replicas(1, Timeout::Long)
}

pub fn raise_to_max_fast() -> Scenario {
    Scenario::new("raise-to-max-fast", "a large scale-up factor reaches max in one step")
        .apply(8, Overrides::new().with(TuningOverride::ScaleUpLimitFactor(10.0)))
        .start_load(LOAD_INTERVAL)
        .expect_replicas(8, Timeout::Long)
        .stop_load()
        .expect_replicas(1, Timeout::Long)
}

/// Metric type `Pods` while the payload sits under the `resource` key
fn mismatched_metric() -> Overrides {
    Overrides::new().with(TuningOverride::MetricSourceType(MetricSourceType::Pods))
}

pub fn incorrect_spec() -> Scenario {
    Scenario::new(
        "incorrect-spec",
        "a broken autoscaler does not stop a correct one from scaling",
    )
    .apply_named("incorrect", 8, mismatched_metric())
    .apply(8, Overrides::new())
    .start_load(LOAD_INTERVAL)
    .expect_replicas(4, Timeout::Long)
    .stop_load()
    .expect_replicas(1, Timeout::Long)
}

pub fn fix_incorrect_spec() -> Scenario {
    Scenario::new("fix-incorrect-spec", "re-applying a fixed autoscaler makes it work")
        .apply(8, mismatched_metric())
        .apply(8, Overrides::new())
        .start_load(LOAD_INTERVAL)
        .expect_replicas(4, Timeout::Long)
        .stop_load()
        .expect_replicas(1, Timeout::Long)
}
