//! Pod management for test execution
//!
//! Creates long-running probe pods and waits until they can be used as
//! probe endpoints.

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::{Container, Pod, PodSpec};
use kube::api::{Api, DeleteParams, PostParams};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use super::client::{is_already_exists, is_not_found, K8sClient};
use crate::utils::poll::{poll_until, Attempt, PollSettings};

const RUNNING: &str = "Running";

/// A pod that is Running and has an IP.
///
/// Only [`ReadyPod::from_pod`] constructs one, so holding a `ReadyPod` means
/// both conditions were observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadyPod {
    name: String,
    namespace: String,
    ip: String,
}

impl ReadyPod {
    /// Snapshot `pod` if it is Running with a non-empty IP
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let status = pod.status.as_ref()?;
        if status.phase.as_deref() != Some(RUNNING) {
            return None;
        }
        let ip = status.pod_ip.as_deref().filter(|ip| !ip.is_empty())?;

        Some(Self {
            name: pod.metadata.name.clone()?,
            namespace: pod.metadata.namespace.clone()?,
            ip: ip.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }
}

impl fmt::Display for ReadyPod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.namespace, self.name, self.ip)
    }
}

/// Short description of where a pod is on its way to ready
pub fn describe_pod_state(pod: &Pod) -> String {
    let status = pod.status.as_ref();
    let phase = status
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("Unknown");
    match status.and_then(|s| s.pod_ip.as_deref()).filter(|ip| !ip.is_empty()) {
        Some(ip) => format!("phase {phase}, IP {ip}"),
        None => format!("phase {phase}, no IP"),
    }
}

/// Test pod configuration
#[derive(Clone, Debug)]
pub struct TestPodConfig {
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub command: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

impl TestPodConfig {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "netpol-e2e".to_string());

        Self {
            name: name.into(),
            namespace: namespace.into(),
            image: "alpine:latest".to_string(),
            command: vec!["tail".to_string(), "-f".to_string(), "/dev/null".to_string()],
            labels,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Pod manifest for this configuration
    pub fn build(&self) -> Pod {
        Pod {
            metadata: kube::core::ObjectMeta {
                name: Some(self.name.clone()),
                namespace: Some(self.namespace.clone()),
                labels: Some(self.labels.clone()),
                ..Default::default()
            },
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: "test".to_string(),
                    image: Some(self.image.clone()),
                    command: Some(self.command.clone()),
                    ..Default::default()
                }],
                restart_policy: Some("Never".to_string()),
                termination_grace_period_seconds: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Pod manager for test operations
pub struct PodManager {
    client: K8sClient,
}

impl PodManager {
    pub fn new(client: K8sClient) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Pod> {
        self.client.namespaced_api(namespace)
    }

    /// Create a test pod. An existing pod of the same name yields `None`.
    pub async fn create_pod(&self, config: &TestPodConfig) -> Result<Option<Pod>> {
        let api = self.api(&config.namespace);
        match api.create(&PostParams::default(), &config.build()).await {
            Ok(pod) => {
                info!("Pod {}/{} created", config.namespace, config.name);
                Ok(Some(pod))
            }
            Err(e) if is_already_exists(&e) => {
                info!(
                    "Pod {}/{} already exists, skipping creation",
                    config.namespace, config.name
                );
                Ok(None)
            }
            Err(e) => Err(e).with_context(|| {
                format!("Failed to create pod {}/{}", config.namespace, config.name)
            }),
        }
    }

    /// Wait until the pod is Running and has an IP
    pub async fn wait_ready(
        &self,
        name: &str,
        namespace: &str,
        settings: PollSettings,
    ) -> Result<ReadyPod> {
        let api = self.api(namespace);
        let what = format!("pod {namespace}/{name} to be Running with an IP");

        let ready = poll_until(&what, settings, || async {
            match api.get(name).await {
                Ok(pod) => match ReadyPod::from_pod(&pod) {
                    Some(ready) => Attempt::Ready(ready),
                    None => Attempt::Pending(describe_pod_state(&pod)),
                },
                Err(e) => Attempt::Pending(e.to_string()),
            }
        })
        .await?;

        info!("Pod {} is ready", ready);
        Ok(ready)
    }

    /// Create the pod (or reuse an existing one) and wait for it to be ready
    pub async fn provision(
        &self,
        config: &TestPodConfig,
        settings: PollSettings,
    ) -> Result<ReadyPod> {
        if let Some(pod) = self.create_pod(config).await? {
            debug!("Created {}", describe_pod_state(&pod));
        }
        self.wait_ready(&config.name, &config.namespace, settings)
            .await
            .with_context(|| {
                format!(
                    "Pod {}/{} did not reach Running state or get an IP address",
                    config.namespace, config.name
                )
            })
    }

    /// Delete pod; a missing pod is not an error
    pub async fn delete_pod(&self, name: &str, namespace: &str) -> Result<()> {
        match self.api(namespace).delete(name, &DeleteParams::default()).await {
            Ok(_) => {
                info!("Pod {}/{} deleted", namespace, name);
                Ok(())
            }
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete pod {namespace}/{name}")),
        }
    }
}
