//! Cluster API endpoint scenario
//!
//! The Cluster object exists on the management cluster, the workload API
//! server answers, and the apiserver certificate secret was generated.

use anyhow::Result;
use tracing::info;

use super::AssertionFailure;
use crate::executor::SuiteContext;
use crate::k8s::cluster::ClusterManager;
use crate::k8s::credentials::{apiserver_cert_exists, apiserver_cert_secret_name};
use crate::utils::poll::{poll_until, Attempt};
use crate::utils::timer::Stopwatch;

pub struct ClusterApiScenario<'a> {
    ctx: &'a SuiteContext,
}

impl<'a> ClusterApiScenario<'a> {
    pub fn new(ctx: &'a SuiteContext) -> Self {
        Self { ctx }
    }

    pub async fn run(&self, stopwatch: &mut Stopwatch) -> Result<()> {
        let config = &self.ctx.config;
        let name = config.cluster_name.as_str();
        let namespace = config.cluster_namespace.as_str();
        let waits = &config.cluster_api;

        let clusters = ClusterManager::new(self.ctx.management.clone());
        let what = format!("Cluster {namespace}/{name}");
        let cluster = poll_until(&what, waits.cluster_ready.settings(), || async {
            match clusters.get(name, namespace).await {
                Ok(Some(cluster)) => Attempt::Ready(cluster),
                Ok(None) => Attempt::Pending("not found".to_string()),
                Err(e) => Attempt::Pending(format!("{e:#}")),
            }
        })
        .await
        .map_err(|e| AssertionFailure(e.to_string()))?;

        info!(
            "Cluster {}/{} is {} (endpoint: {})",
            namespace,
            name,
            cluster.phase(),
            cluster.endpoint().as_deref().unwrap_or("unset")
        );
        stopwatch.lap("cluster-object");

        let workload = &self.ctx.workload;
        let version = poll_until(
            "workload API server to report its version",
            waits.apiserver.settings(),
            || async {
                match workload.apiserver_version().await {
                    Ok(info) => Attempt::Ready(info),
                    Err(e) => Attempt::Pending(format!("{e:#}")),
                }
            },
        )
        .await
        .map_err(|e| AssertionFailure(e.to_string()))?;

        info!("Workload API server {} is up", version.git_version);
        stopwatch.lap("apiserver");

        let management = &self.ctx.management;
        let cert = apiserver_cert_secret_name(name);
        poll_until(
            &format!("secret {namespace}/{cert}"),
            waits.apiserver_cert.settings(),
            || async {
                match apiserver_cert_exists(management, name, namespace).await {
                    Ok(true) => Attempt::Ready(()),
                    Ok(false) => Attempt::Pending("not found".to_string()),
                    Err(e) => Attempt::Pending(e.to_string()),
                }
            },
        )
        .await
        .map_err(|e| AssertionFailure(e.to_string()))?;

        info!("Secret {}/{} exists", namespace, cert);
        stopwatch.lap("apiserver-cert");

        Ok(())
    }
}
