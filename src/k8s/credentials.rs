//! Workload cluster credentials
//!
//! Cluster API stores an admin kubeconfig for every workload cluster in the
//! secret `<cluster>-kubeconfig` (key `value`) on the management cluster.
//! Resolution is a single fetch and parse; callers retry if they want to.

use k8s_openapi::api::core::v1::Secret;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Config;
use thiserror::Error;
use tracing::{debug, info};

use super::client::{is_not_found, K8sClient};

/// Data key holding the kubeconfig document
pub const KUBECONFIG_SECRET_KEY: &str = "value";

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("kubeconfig secret {namespace}/{name} not found")]
    NotFound { name: String, namespace: String },

    #[error("failed to fetch kubeconfig secret {namespace}/{name}: {source}")]
    Fetch {
        name: String,
        namespace: String,
        source: kube::Error,
    },

    #[error("kubeconfig secret {name} has no {key:?} data field")]
    MissingField { name: String, key: &'static str },

    #[error("failed to parse workload kubeconfig from secret {name}: {message}")]
    Parse { name: String, message: String },
}

pub fn kubeconfig_secret_name(cluster: &str) -> String {
    format!("{cluster}-kubeconfig")
}

pub fn apiserver_cert_secret_name(cluster: &str) -> String {
    format!("{cluster}-apiserver-cert")
}

/// Decode the kubeconfig embedded in a Cluster API kubeconfig secret
pub fn kubeconfig_from_secret(secret: &Secret) -> Result<Kubeconfig, CredentialError> {
    let name = secret.metadata.name.clone().unwrap_or_default();

    let bytes = secret
        .data
        .as_ref()
        .and_then(|data| data.get(KUBECONFIG_SECRET_KEY))
        .ok_or_else(|| CredentialError::MissingField {
            name: name.clone(),
            key: KUBECONFIG_SECRET_KEY,
        })?;

    let text = std::str::from_utf8(&bytes.0).map_err(|e| CredentialError::Parse {
        name: name.clone(),
        message: format!("not UTF-8: {e}"),
    })?;

    Kubeconfig::from_yaml(text).map_err(|e| CredentialError::Parse {
        name,
        message: e.to_string(),
    })
}

/// Fetch the kubeconfig secret of `cluster` and turn it into a client config
pub async fn workload_config(
    management: &K8sClient,
    cluster: &str,
    namespace: &str,
) -> Result<Config, CredentialError> {
    let name = kubeconfig_secret_name(cluster);
    debug!("Fetching secret {}/{}", namespace, name);

    let secret = management
        .namespaced_api::<Secret>(namespace)
        .get(&name)
        .await
        .map_err(|e| {
            if is_not_found(&e) {
                CredentialError::NotFound {
                    name: name.clone(),
                    namespace: namespace.to_string(),
                }
            } else {
                CredentialError::Fetch {
                    name: name.clone(),
                    namespace: namespace.to_string(),
                    source: e,
                }
            }
        })?;

    let kubeconfig = kubeconfig_from_secret(&secret)?;

    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| CredentialError::Parse {
            name,
            message: e.to_string(),
        })
}

/// Client handle for the workload cluster `cluster`
pub async fn workload_client(
    management: &K8sClient,
    cluster: &str,
    namespace: &str,
) -> anyhow::Result<K8sClient> {
    let config = workload_config(management, cluster, namespace).await?;
    info!("Resolved workload cluster {} at {}", cluster, config.cluster_url);
    K8sClient::with_config(config, format!("workload/{cluster}"))
}

/// Whether the `<cluster>-apiserver-cert` secret exists
pub async fn apiserver_cert_exists(
    management: &K8sClient,
    cluster: &str,
    namespace: &str,
) -> Result<bool, kube::Error> {
    let name = apiserver_cert_secret_name(cluster);
    match management.namespaced_api::<Secret>(namespace).get(&name).await {
        Ok(_) => Ok(true),
        Err(e) if is_not_found(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::k8s::mock;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: rke
  cluster:
    server: https://10.0.0.1:6443
    insecure-skip-tls-verify: true
contexts:
- name: rke-admin@rke
  context:
    cluster: rke
    user: rke-admin
current-context: rke-admin@rke
users:
- name: rke-admin
  user:
    token: abc123
"#;

    fn secret(data: Option<(&str, &[u8])>) -> Secret {
        Secret {
            metadata: kube::core::ObjectMeta {
                name: Some("rke-kubeconfig".to_string()),
                namespace: Some("bm-osp".to_string()),
                ..Default::default()
            },
            data: data.map(|(key, value)| {
                BTreeMap::from([(key.to_string(), ByteString(value.to_vec()))])
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_secret_names() {
        assert_eq!(kubeconfig_secret_name("rke"), "rke-kubeconfig");
        assert_eq!(apiserver_cert_secret_name("rke"), "rke-apiserver-cert");
    }

    #[test]
    fn test_kubeconfig_from_secret() {
        let kubeconfig =
            kubeconfig_from_secret(&secret(Some(("value", KUBECONFIG.as_bytes())))).unwrap();
        assert_eq!(kubeconfig.clusters.len(), 1);
        assert_eq!(kubeconfig.clusters[0].name, "rke");
        assert_eq!(kubeconfig.current_context.as_deref(), Some("rke-admin@rke"));
    }

    #[test]
    fn test_missing_value_field() {
        let err = kubeconfig_from_secret(&secret(Some(("kubeconfig", KUBECONFIG.as_bytes()))))
            .unwrap_err();
        assert!(matches!(err, CredentialError::MissingField { key: "value", .. }));

        let err = kubeconfig_from_secret(&secret(None)).unwrap_err();
        assert!(matches!(err, CredentialError::MissingField { .. }));
    }

    #[test]
    fn test_unparseable_kubeconfig() {
        let err = kubeconfig_from_secret(&secret(Some(("value", &b"clusters: [not, a, map"[..]))))
            .unwrap_err();
        assert!(matches!(err, CredentialError::Parse { .. }));
        assert!(err.to_string().contains("rke-kubeconfig"));

        let err = kubeconfig_from_secret(&secret(Some(("value", &[0xffu8, 0xfe][..])))).unwrap_err();
        assert!(err.to_string().contains("not UTF-8"));
    }

    #[tokio::test]
    async fn test_secret_kubeconfig_builds_client_config() {
        let kubeconfig =
            kubeconfig_from_secret(&secret(Some(("value", KUBECONFIG.as_bytes())))).unwrap();
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .unwrap();

        assert_eq!(config.cluster_url.host(), Some("10.0.0.1"));
        assert_eq!(config.cluster_url.port_u16(), Some(6443));
        assert!(config.accept_invalid_certs);
    }

    #[tokio::test]
    async fn test_missing_kubeconfig_secret() {
        let (management, log, _server) = mock::mock_client("management", |_, _, _| {
            mock::status_response(404, "NotFound", "secrets \"rke-kubeconfig\" not found")
        });

        let err = workload_config(&management, "rke", "bm-osp").await.unwrap_err();
        assert!(matches!(
            err,
            CredentialError::NotFound { ref name, ref namespace }
                if name == "rke-kubeconfig" && namespace == "bm-osp"
        ));
        assert_eq!(
            mock::requests(&log),
            vec!["GET /api/v1/namespaces/bm-osp/secrets/rke-kubeconfig"]
        );
    }

    #[tokio::test]
    async fn test_kubeconfig_secret_fetch_error() {
        let (management, _log, _server) = mock::mock_client("management", |_, _, _| {
            mock::status_response(403, "Forbidden", "secrets is forbidden")
        });

        let err = workload_config(&management, "rke", "bm-osp").await.unwrap_err();
        assert!(matches!(err, CredentialError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_workload_client_from_secret() {
        let (management, _log, _server) = mock::mock_client("management", |_, _, _| {
            let data = serde_json::to_value(ByteString(KUBECONFIG.as_bytes().to_vec())).unwrap();
            mock::json_response(
                200,
                &serde_json::json!({
                    "apiVersion": "v1",
                    "kind": "Secret",
                    "metadata": {"name": "rke-kubeconfig", "namespace": "bm-osp"},
                    "data": {"value": data},
                }),
            )
        });

        let workload = workload_client(&management, "rke", "bm-osp").await.unwrap();
        assert_eq!(workload.name(), "workload/rke");
    }
}
