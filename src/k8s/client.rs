//! Kubernetes client wrapper
//!
//! One `K8sClient` per API server: the management cluster and the workload
//! cluster each get their own.

use anyhow::{Context, Result};
use k8s_openapi::apimachinery::pkg::version::Info;
use kube::{
    api::Api,
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config,
};
use std::time::Duration;
use tracing::{debug, info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Kubernetes client wrapper
#[derive(Clone)]
pub struct K8sClient {
    client: Client,
    name: String,
}

impl K8sClient {
    /// Client for the cluster named by a kubeconfig file, or the default
    /// config chain (`KUBECONFIG`, `~/.kube/config`, in-cluster) when no path is given.
    pub async fn from_kubeconfig(path: Option<&str>, name: impl Into<String>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                debug!("Loading kubeconfig from {}", path);
                let kubeconfig = Kubeconfig::read_from(path)
                    .with_context(|| format!("Failed to read kubeconfig {path}"))?;
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .with_context(|| format!("Failed to load kubeconfig {path}"))?
            }
            None => Config::infer()
                .await
                .context("Failed to infer Kubernetes config")?,
        };

        Self::with_config(config, name)
    }

    /// Create client with custom config
    pub fn with_config(mut config: Config, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        config.connect_timeout = Some(CONNECT_TIMEOUT);
        info!("Connecting to {} cluster at {}", name, config.cluster_url);

        let client = Client::try_from(config)
            .with_context(|| format!("Failed to create Kubernetes client for {name}"))?;

        Ok(Self::from_client(client, name))
    }

    /// Wrap an existing kube client
    pub fn from_client(client: Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }

    /// Name used in logs ("management", "workload/<cluster>")
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ask the API server for its version
    pub async fn apiserver_version(&self) -> Result<Info> {
        self.client
            .apiserver_version()
            .await
            .with_context(|| format!("Failed to get {} API server version", self.name))
    }

    /// Create a namespaced API for a resource type
    pub fn namespaced_api<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = kube::core::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    /// Create a cluster-wide API for a resource type
    pub fn cluster_api<K>(&self) -> Api<K>
    where
        K: kube::Resource<Scope = kube::core::ClusterResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::all(self.client.clone())
    }
}

/// True for an API error with the given HTTP status
pub fn is_status(err: &kube::Error, code: u16) -> bool {
    matches!(err, kube::Error::Api(e) if e.code == code)
}

pub fn is_not_found(err: &kube::Error) -> bool {
    is_status(err, 404)
}

pub fn is_already_exists(err: &kube::Error) -> bool {
    is_status(err, 409)
}
