//! NetworkPolicy enforcement scenario
//!
//! Recreates the server namespace, starts a server pod there and a client pod
//! in another namespace, applies an ingress-denial policy to the server
//! namespace and expects client-to-server probes to fail. Deleting the policy
//! must make them succeed again.

use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::info;

use super::cleanup::{Cleanup, CleanupAction};
use super::AssertionFailure;
use crate::config::NetworkTestConfig;
use crate::executor::SuiteContext;
use crate::k8s::network_policy::deny_cross_namespace;
use crate::k8s::{
    NamespaceManager, NetworkPolicyManager, PodExecutor, PodManager, ReadyPod, TestPodConfig,
};
use crate::probe::{ExecProber, ProbeOutcome, Prober};
use crate::utils::poll::{poll_until, Attempt};
use crate::utils::timer::Stopwatch;

/// Probe result a polling phase waits for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expectation {
    Blocked,
    Reachable,
}

impl Expectation {
    fn describe(self) -> &'static str {
        match self {
            Expectation::Blocked => "probe to be blocked",
            Expectation::Reachable => "probe to succeed",
        }
    }

    /// Whether `outcome` ends a polling phase. A missing probe tool ends it
    /// too, since retrying cannot change it.
    pub fn settled_by(self, outcome: &ProbeOutcome) -> bool {
        match outcome {
            ProbeOutcome::ToolMissing { .. } => true,
            outcome => match self {
                Expectation::Blocked => outcome.is_blocked(),
                Expectation::Reachable => outcome.is_reachable(),
            },
        }
    }
}

pub struct NetworkPolicyScenario<'a, P = ExecProber> {
    ctx: &'a SuiteContext,
    config: &'a NetworkTestConfig,
    prober: P,
}

impl<'a> NetworkPolicyScenario<'a> {
    pub fn new(ctx: &'a SuiteContext) -> Self {
        let config = &ctx.config.network;
        let executor = PodExecutor::new(
            ctx.workload.clone(),
            Duration::from_secs(config.exec_timeout_secs),
        );
        Self::with_prober(ctx, ExecProber::new(executor, config.probe.clone()))
    }
}

impl<'a, P: Prober> NetworkPolicyScenario<'a, P> {
    pub fn with_prober(ctx: &'a SuiteContext, prober: P) -> Self {
        Self {
            ctx,
            config: &ctx.config.network,
            prober,
        }
    }

    /// Run the scenario, then delete what it created
    pub async fn run(&self, stopwatch: &mut Stopwatch) -> Result<()> {
        let mut cleanup = Cleanup::new();
        let result = self.execute(&mut cleanup, stopwatch).await;

        cleanup.run(&self.ctx.workload).await;
        stopwatch.lap("cleanup");

        result
    }

    async fn execute(&self, cleanup: &mut Cleanup, stopwatch: &mut Stopwatch) -> Result<()> {
        let cfg = self.config;
        let namespaces = NamespaceManager::new(self.ctx.workload.clone());
        let pods = PodManager::new(self.ctx.workload.clone());
        let policies = NetworkPolicyManager::new(self.ctx.workload.clone());

        namespaces
            .delete_and_wait(&cfg.server_namespace, cfg.namespace_cleanup.settings())
            .await
            .with_context(|| {
                format!(
                    "Failed to remove namespace {:?} left by a previous run",
                    cfg.server_namespace
                )
            })?;
        stopwatch.lap("clean-slate");

        namespaces.ensure(&cfg.server_namespace).await?;
        cleanup.defer(CleanupAction::Namespace {
            name: cfg.server_namespace.clone(),
        });
        namespaces.ensure(&cfg.client_namespace).await?;

        let server = self
            .start_pod(&pods, cleanup, &cfg.server_pod, &cfg.server_namespace, "server")
            .await?;
        let client = self
            .start_pod(&pods, cleanup, &cfg.client_pod, &cfg.client_namespace, "client")
            .await?;
        stopwatch.lap("provision");

        if cfg.verify_baseline {
            self.wait_for(Expectation::Reachable, &client, &server)
                .await
                .context("Pods cannot reach each other before any policy is applied")?;
            stopwatch.lap("baseline");
        }

        let policy = deny_cross_namespace(&cfg.policy_name, &cfg.server_namespace);
        cleanup.defer(CleanupAction::NetworkPolicy {
            name: cfg.policy_name.clone(),
            namespace: cfg.server_namespace.clone(),
        });
        policies.apply(&policy).await?;
        stopwatch.lap("apply-policy");

        self.wait_for(Expectation::Blocked, &client, &server)
            .await
            .with_context(|| {
                format!(
                    "NetworkPolicy {}/{} was not enforced",
                    cfg.server_namespace, cfg.policy_name
                )
            })?;
        stopwatch.lap("enforced");

        policies
            .delete(&cfg.policy_name, &cfg.server_namespace)
            .await?;
        stopwatch.lap("delete-policy");

        self.wait_for(Expectation::Reachable, &client, &server)
            .await
            .with_context(|| {
                format!(
                    "Connectivity was not restored after deleting NetworkPolicy {}/{}",
                    cfg.server_namespace, cfg.policy_name
                )
            })?;
        stopwatch.lap("restored");

        info!(
            "NetworkPolicy {}/{} blocked {} -> {} and lifting it restored traffic",
            cfg.server_namespace, cfg.policy_name, client, server
        );
        Ok(())
    }

    async fn start_pod(
        &self,
        pods: &PodManager,
        cleanup: &mut Cleanup,
        name: &str,
        namespace: &str,
        role: &str,
    ) -> Result<ReadyPod> {
        let config = TestPodConfig::new(name, namespace)
            .with_image(&self.config.image)
            .with_label("role", role);

        cleanup.defer(CleanupAction::Pod {
            name: name.to_string(),
            namespace: namespace.to_string(),
        });
        pods.provision(&config, self.config.pod_ready.settings())
            .await
    }

    /// Probe until the outcome matches `expect` or the enforcement deadline passes
    async fn wait_for(
        &self,
        expect: Expectation,
        client: &ReadyPod,
        server: &ReadyPod,
    ) -> Result<()> {
        let what = format!("{} from {} to {}", expect.describe(), client, server);

        let outcome = poll_until(&what, self.config.enforcement.settings(), || async {
            let outcome = self.prober.probe(client, server).await;
            if expect.settled_by(&outcome) {
                Attempt::Ready(outcome)
            } else {
                Attempt::Pending(outcome.to_string())
            }
        })
        .await
        .map_err(|e| AssertionFailure(e.to_string()))?;

        if let ProbeOutcome::ToolMissing { detail } = outcome {
            bail!(
                "Probe {} cannot run in image {}: {}",
                self.config.probe,
                self.config.image,
                detail
            );
        }
        Ok(())
    }
}
