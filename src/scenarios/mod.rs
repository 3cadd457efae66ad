//! Scenario implementations
//!
//! ### Cluster API Operations
//! - Cluster API Endpoint: Cluster object, workload API server, apiserver cert
//!
//! ### Network Connectivity
//! - Network Policy Enforcement: deny cross-namespace ingress, then lift it

mod cleanup;
mod cluster_api;
mod network_policy;

use cluster_api::ClusterApiScenario;
use network_policy::NetworkPolicyScenario;

use anyhow::Result;
use thiserror::Error;

use crate::executor::SuiteContext;
use crate::models::ScenarioKind;
use crate::utils::poll::PollTimeout;
use crate::utils::timer::Stopwatch;

/// A condition the scenario asserts did not hold
#[derive(Error, Debug)]
#[error("{0}")]
pub struct AssertionFailure(pub String);

/// Whether `err` is a failed assertion (including a wait that timed out)
/// rather than an error that kept the scenario from reaching its assertions
pub fn is_assertion_failure(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.is::<AssertionFailure>() || cause.is::<PollTimeout>())
}

/// Run one scenario against the suite fixtures
pub async fn run_scenario(
    kind: ScenarioKind,
    ctx: &SuiteContext,
    stopwatch: &mut Stopwatch,
) -> Result<()> {
    match kind {
        ScenarioKind::ClusterApi => ClusterApiScenario::new(ctx).run(stopwatch).await,
        ScenarioKind::NetworkPolicy => NetworkPolicyScenario::new(ctx).run(stopwatch).await,
    }
}
