//! Cluster API `Cluster` resource
//!
//! Read-only access to `clusters.cluster.x-k8s.io` on the management cluster.

use anyhow::{Context, Result};
use kube::api::Api;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::K8sClient;

/// Cluster custom resource specification (the fields the suite reads)
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[kube(
    group = "cluster.x-k8s.io",
    version = "v1beta1",
    kind = "Cluster",
    plural = "clusters",
    namespaced,
    status = "ClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,

    /// Endpoint of the workload API server
    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_plane_endpoint: Option<ApiEndpoint>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub control_plane_ref: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure_ref: Option<serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
pub struct ApiEndpoint {
    pub host: String,
    pub port: i32,
}

impl ApiEndpoint {
    /// True once the provider filled in the endpoint
    pub fn is_set(&self) -> bool {
        !self.host.is_empty() && self.port != 0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// Provisioning phase, e.g. Pending, Provisioning, Provisioned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(default)]
    pub infrastructure_ready: bool,

    #[serde(default)]
    pub control_plane_ready: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ClusterCondition>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCondition {
    #[serde(rename = "type")]
    pub condition_type: String,

    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Cluster {
    pub fn phase(&self) -> &str {
        self.status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .unwrap_or("Unknown")
    }

    /// `host:port` of the workload API server, once assigned
    pub fn endpoint(&self) -> Option<String> {
        self.spec
            .control_plane_endpoint
            .as_ref()
            .filter(|e| e.is_set())
            .map(|e| format!("{}:{}", e.host, e.port))
    }
}

pub struct ClusterManager {
    client: K8sClient,
}

impl ClusterManager {
    pub fn new(client: K8sClient) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Cluster> {
        self.client.namespaced_api(namespace)
    }

    /// Get a Cluster; `None` when it does not exist
    pub async fn get(&self, name: &str, namespace: &str) -> Result<Option<Cluster>> {
        self.api(namespace)
            .get_opt(name)
            .await
            .with_context(|| format!("Failed to get Cluster {namespace}/{name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;

    #[test]
    fn test_cluster_resource_identity() {
        assert_eq!(Cluster::group(&()), "cluster.x-k8s.io");
        assert_eq!(Cluster::version(&()), "v1beta1");
        assert_eq!(Cluster::plural(&()), "clusters");
    }

    #[test]
    fn test_cluster_from_json() {
        let cluster: Cluster = serde_json::from_value(serde_json::json!({
            "apiVersion": "cluster.x-k8s.io/v1beta1",
            "kind": "Cluster",
            "metadata": {"name": "rke", "namespace": "bm-osp"},
            "spec": {
                "controlPlaneEndpoint": {"host": "10.0.0.1", "port": 6443},
                "infrastructureRef": {"kind": "Metal3Cluster", "name": "rke"}
            },
            "status": {
                "phase": "Provisioned",
                "controlPlaneReady": true,
                "infrastructureReady": true,
                "conditions": [{"type": "Ready", "status": "True"}]
            }
        }))
        .unwrap();

        assert_eq!(cluster.phase(), "Provisioned");
        assert_eq!(cluster.endpoint().as_deref(), Some("10.0.0.1:6443"));
        let status = cluster.status.unwrap();
        assert!(status.control_plane_ready);
        assert_eq!(status.conditions[0].condition_type, "Ready");
    }

    #[test]
    fn test_cluster_without_status() {
        let cluster = Cluster::new("rke", ClusterSpec::default());
        assert_eq!(cluster.phase(), "Unknown");
        assert!(cluster.endpoint().is_none());

        let unset = ApiEndpoint {
            host: String::new(),
            port: 0,
        };
        assert!(!unset.is_set());
    }
}
