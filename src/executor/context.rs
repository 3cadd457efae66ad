//! Suite fixtures
//!
//! Client handles are created once per run and handed to every scenario by
//! reference.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::SuiteConfig;
use crate::k8s::credentials;
use crate::k8s::K8sClient;

pub struct SuiteContext {
    pub config: SuiteConfig,
    /// Cluster API control plane
    pub management: K8sClient,
    /// Cluster under test, resolved from the management cluster
    pub workload: K8sClient,
}

impl SuiteContext {
    /// Connect to the management cluster and resolve the workload cluster.
    ///
    /// Any failure here aborts the suite before a scenario creates anything.
    pub async fn connect(config: SuiteConfig) -> Result<Self> {
        let management = K8sClient::from_kubeconfig(config.kubeconfig.as_deref(), "management")
            .await
            .context("Failed to create management cluster client")?;

        let workload = credentials::workload_client(
            &management,
            &config.cluster_name,
            &config.cluster_namespace,
        )
        .await
        .context("Failed to create workload cluster client")?;

        info!(
            "Suite fixtures ready for cluster {}/{}",
            config.cluster_namespace, config.cluster_name
        );

        Ok(Self {
            config,
            management,
            workload,
        })
    }
}
