//! Namespace management
//!
//! Idempotent create, and delete that waits for the namespace to be gone.

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, DeleteParams, PostParams};
use tracing::info;

use super::client::{is_already_exists, is_not_found, K8sClient};
use crate::utils::poll::{poll_until, Attempt, PollSettings};

pub struct NamespaceManager {
    client: K8sClient,
}

impl NamespaceManager {
    pub fn new(client: K8sClient) -> Self {
        Self { client }
    }

    fn api(&self) -> Api<Namespace> {
        self.client.cluster_api()
    }

    /// Create the namespace unless it exists. Returns whether it was created.
    pub async fn ensure(&self, name: &str) -> Result<bool> {
        let namespace = Namespace {
            metadata: kube::core::ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        };

        match self.api().create(&PostParams::default(), &namespace).await {
            Ok(_) => {
                info!("Namespace {:?} created", name);
                Ok(true)
            }
            Err(e) if is_already_exists(&e) => {
                info!("Namespace {:?} already exists, skipping creation", name);
                Ok(false)
            }
            Err(e) => Err(e).with_context(|| format!("Failed to create namespace {name:?}")),
        }
    }

    /// Request deletion; a missing namespace is not an error.
    /// Returns whether a deletion was requested.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        match self.api().delete(name, &DeleteParams::default()).await {
            Ok(_) => {
                info!("Namespace {:?} deletion requested", name);
                Ok(true)
            }
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to delete namespace {name:?}")),
        }
    }

    /// Delete the namespace and wait until the API server no longer has it,
    /// so a following create does not hit a Terminating namespace.
    pub async fn delete_and_wait(&self, name: &str, settings: PollSettings) -> Result<()> {
        if !self.delete(name).await? {
            return Ok(());
        }

        let what = format!("namespace {name:?} to be deleted");
        poll_until(&what, settings, || async {
            match self.api().get_opt(name).await {
                Ok(None) => Attempt::Ready(()),
                Ok(Some(ns)) => Attempt::Pending(format!(
                    "phase {}",
                    ns.status
                        .and_then(|s| s.phase)
                        .unwrap_or_else(|| "Unknown".to_string())
                )),
                Err(e) => Attempt::Pending(e.to_string()),
            }
        })
        .await?;

        info!("Namespace {:?} is gone", name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::mock;
    use std::time::Duration;

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let mut created = false;
        let (client, log, _server) = mock::mock_client("workload/rke", move |_, _, body| {
            if created {
                mock::status_response(409, "AlreadyExists", "namespaces \"network-test\" already exists")
            } else {
                created = true;
                mock::echo_response(body)
            }
        });
        let namespaces = NamespaceManager::new(client);

        assert!(namespaces.ensure("network-test").await.unwrap());
        assert!(!namespaces.ensure("network-test").await.unwrap());
        assert_eq!(
            mock::requests(&log),
            vec!["POST /api/v1/namespaces", "POST /api/v1/namespaces"]
        );
    }

    #[tokio::test]
    async fn test_ensure_propagates_other_errors() {
        let (client, _log, _server) = mock::mock_client("workload/rke", |_, _, _| {
            mock::status_response(403, "Forbidden", "namespaces is forbidden")
        });

        let err = NamespaceManager::new(client)
            .ensure("network-test")
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("Failed to create namespace"));
    }

    #[tokio::test]
    async fn test_delete_missing_namespace_does_not_wait() {
        let (client, log, _server) = mock::mock_client("workload/rke", |_, _, _| {
            mock::status_response(404, "NotFound", "namespaces \"network-test\" not found")
        });

        NamespaceManager::new(client)
            .delete_and_wait("network-test", PollSettings::from_secs(1, 1))
            .await
            .unwrap();
        assert_eq!(
            mock::requests(&log),
            vec!["DELETE /api/v1/namespaces/network-test"]
        );
    }

    #[tokio::test]
    async fn test_delete_waits_until_gone() {
        let mut gets = 0;
        let (client, log, _server) = mock::mock_client("workload/rke", move |method, _, _| {
            if method == http::Method::DELETE {
                return mock::deleted_response();
            }
            gets += 1;
            if gets < 2 {
                mock::json_response(
                    200,
                    &serde_json::json!({
                        "apiVersion": "v1",
                        "kind": "Namespace",
                        "metadata": {"name": "network-test"},
                        "status": {"phase": "Terminating"},
                    }),
                )
            } else {
                mock::status_response(404, "NotFound", "namespaces \"network-test\" not found")
            }
        });

        let settings = PollSettings::new(Duration::from_secs(5), Duration::from_millis(10));
        NamespaceManager::new(client)
            .delete_and_wait("network-test", settings)
            .await
            .unwrap();
        assert_eq!(
            mock::requests(&log),
            vec![
                "DELETE /api/v1/namespaces/network-test",
                "GET /api/v1/namespaces/network-test",
                "GET /api/v1/namespaces/network-test",
            ]
        );
    }
}
