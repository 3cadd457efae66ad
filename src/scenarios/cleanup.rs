//! Deferred cleanup of scenario resources
//!
//! Resources are registered as they are created and deleted in reverse
//! order once the scenario body returns, whatever its outcome. Failures are
//! logged and otherwise ignored.

use std::fmt;
use tracing::{info, warn};

use crate::k8s::{K8sClient, NamespaceManager, NetworkPolicyManager, PodManager};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanupAction {
    Pod { name: String, namespace: String },
    NetworkPolicy { name: String, namespace: String },
    Namespace { name: String },
}

impl fmt::Display for CleanupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleanupAction::Pod { name, namespace } => write!(f, "pod {namespace}/{name}"),
            CleanupAction::NetworkPolicy { name, namespace } => {
                write!(f, "networkpolicy {namespace}/{name}")
            }
            CleanupAction::Namespace { name } => write!(f, "namespace {name}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct Cleanup {
    actions: Vec<CleanupAction>,
}

impl Cleanup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource for deletion
    pub fn defer(&mut self, action: CleanupAction) {
        if !self.actions.contains(&action) {
            self.actions.push(action);
        }
    }

    /// Actions in the order they will run
    pub fn pending(&self) -> impl Iterator<Item = &CleanupAction> {
        self.actions.iter().rev()
    }

    /// Delete everything registered, most recent first
    pub async fn run(self, client: &K8sClient) {
        if self.actions.is_empty() {
            return;
        }

        let pods = PodManager::new(client.clone());
        let policies = NetworkPolicyManager::new(client.clone());
        let namespaces = NamespaceManager::new(client.clone());

        info!("Cleaning up {} resources on {}", self.actions.len(), client.name());
        for action in self.pending() {
            let result = match action {
                CleanupAction::Pod { name, namespace } => pods.delete_pod(name, namespace).await,
                CleanupAction::NetworkPolicy { name, namespace } => {
                    policies.delete(name, namespace).await
                }
                CleanupAction::Namespace { name } => namespaces.delete(name).await.map(|_| ()),
            };

            match result {
                Ok(()) => info!("Cleaned up {}", action),
                Err(e) => warn!("Failed to clean up {}: {:#}", action, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_runs_in_reverse() {
        let mut cleanup = Cleanup::new();
        cleanup.defer(CleanupAction::Namespace {
            name: "network-test".to_string(),
        });
        cleanup.defer(CleanupAction::Pod {
            name: "server".to_string(),
            namespace: "network-test".to_string(),
        });
        cleanup.defer(CleanupAction::NetworkPolicy {
            name: "deny-cross-ns".to_string(),
            namespace: "network-test".to_string(),
        });

        let order: Vec<String> = cleanup.pending().map(|a| a.to_string()).collect();
        assert_eq!(
            order,
            vec![
                "networkpolicy network-test/deny-cross-ns",
                "pod network-test/server",
                "namespace network-test",
            ]
        );
    }

    #[test]
    fn test_cleanup_deduplicates() {
        let mut cleanup = Cleanup::new();
        let pod = CleanupAction::Pod {
            name: "client".to_string(),
            namespace: "default".to_string(),
        };
        cleanup.defer(pod.clone());
        cleanup.defer(pod);
        assert_eq!(cleanup.pending().count(), 1);
    }
}
