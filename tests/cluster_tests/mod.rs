//! Integration tests against a live cluster
//!
//! # Test Organization
//!
//! - `fixtures`: creating, observing and removing workload fixtures, and
//!   applying descriptors, without relying on the controller
//! - `autoscaling`: one test per built-in scenario; the long ones wait on
//!   real load and cooldown windows (up to 10 minutes per expectation)
//!
//! Every test holds [`helpers::exclusive`] while it runs, so the harness's
//! parallel test threads never share the cluster.

mod autoscaling;
mod fixtures;
mod helpers;
