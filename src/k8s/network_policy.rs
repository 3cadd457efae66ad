//! NetworkPolicy management
//!
//! Builds the ingress-denial policy used by the enforcement scenario and
//! creates/deletes it.

use anyhow::{Context, Result};
use k8s_openapi::api::networking::v1::{
    NetworkPolicy, NetworkPolicyIngressRule, NetworkPolicyPeer, NetworkPolicySpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::{Api, DeleteParams, PostParams};
use std::collections::BTreeMap;
use tracing::info;

use super::client::{is_already_exists, is_not_found, K8sClient};

/// Label the API server puts on every namespace, holding the namespace name
pub const NAMESPACE_NAME_LABEL: &str = "kubernetes.io/metadata.name";

/// Policy selecting every pod in `namespace` and admitting ingress only from
/// pods in that same namespace. Traffic from any other namespace is denied.
pub fn deny_cross_namespace(name: &str, namespace: &str) -> NetworkPolicy {
    let same_namespace = LabelSelector {
        match_labels: Some(BTreeMap::from([(
            NAMESPACE_NAME_LABEL.to_string(),
            namespace.to_string(),
        )])),
        ..Default::default()
    };

    NetworkPolicy {
        metadata: kube::core::ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                "app".to_string(),
                "netpol-e2e".to_string(),
            )])),
            ..Default::default()
        },
        spec: Some(NetworkPolicySpec {
            pod_selector: LabelSelector::default(),
            policy_types: Some(vec!["Ingress".to_string()]),
            ingress: Some(vec![NetworkPolicyIngressRule {
                from: Some(vec![NetworkPolicyPeer {
                    namespace_selector: Some(same_namespace),
                    ..Default::default()
                }]),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub struct NetworkPolicyManager {
    client: K8sClient,
}

impl NetworkPolicyManager {
    pub fn new(client: K8sClient) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<NetworkPolicy> {
        self.client.namespaced_api(namespace)
    }

    /// Create the policy, replacing a leftover one of the same name
    pub async fn apply(&self, policy: &NetworkPolicy) -> Result<NetworkPolicy> {
        let name = policy.metadata.name.as_deref().unwrap_or_default();
        let namespace = policy
            .metadata
            .namespace
            .as_deref()
            .context("NetworkPolicy has no namespace")?;
        let api = self.api(namespace);

        match api.create(&PostParams::default(), policy).await {
            Ok(created) => {
                info!("NetworkPolicy {}/{} created", namespace, name);
                Ok(created)
            }
            Err(e) if is_already_exists(&e) => {
                info!("NetworkPolicy {}/{} already exists, replacing", namespace, name);
                let existing = api
                    .get(name)
                    .await
                    .context("Failed to get existing NetworkPolicy")?;
                let mut replacement = policy.clone();
                replacement.metadata.resource_version = existing.metadata.resource_version;
                api.replace(name, &PostParams::default(), &replacement)
                    .await
                    .context("Failed to replace NetworkPolicy")
            }
            Err(e) => Err(e)
                .with_context(|| format!("Failed to create NetworkPolicy {namespace}/{name}")),
        }
    }

    /// Delete the policy; a missing policy is not an error
    pub async fn delete(&self, name: &str, namespace: &str) -> Result<()> {
        match self.api(namespace).delete(name, &DeleteParams::default()).await {
            Ok(_) => {
                info!("NetworkPolicy {}/{} deleted", namespace, name);
                Ok(())
            }
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to delete NetworkPolicy {namespace}/{name}")),
        }
    }
}
