//! Configuration module
//!
//! Suite configuration: defaults, YAML/JSON files and `NETPOL_E2E_*`
//! environment overrides.

mod env;

pub use env::{print_env_help, EnvConfig};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::models::ScenarioKind;
use crate::probe::ProbeKind;
use crate::utils::poll::PollSettings;

/// Suite configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    /// Name of the Cluster API cluster under test
    pub cluster_name: String,

    /// Management-cluster namespace holding the Cluster object and its secrets
    pub cluster_namespace: String,

    /// Management cluster kubeconfig; falls back to `KUBECONFIG`
    pub kubeconfig: Option<String>,

    /// Scenarios to run, in order
    pub scenarios: Vec<ScenarioKind>,

    pub network: NetworkTestConfig,

    pub cluster_api: ClusterApiConfig,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            cluster_name: "rke".to_string(),
            cluster_namespace: "bm-osp".to_string(),
            kubeconfig: None,
            scenarios: ScenarioKind::all(),
            network: NetworkTestConfig::default(),
            cluster_api: ClusterApiConfig::default(),
        }
    }
}

impl SuiteConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_path(path.as_ref());
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = if is_yaml_file(&path) {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        } else {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = expand_path(path.as_ref());
        let content = if is_yaml_file(&path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        std::fs::write(&path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Apply environment overrides on top of this configuration
    pub fn apply_env(&mut self, env: &EnvConfig) -> Result<()> {
        if let Some(cluster) = &env.cluster {
            self.cluster_name = cluster.clone();
        }
        if let Some(namespace) = &env.namespace {
            self.cluster_namespace = namespace.clone();
        }
        if let Some(image) = &env.image {
            self.network.image = image.clone();
        }
        if let Some(selection) = &env.scenario {
            self.scenarios = ScenarioKind::parse_selection(selection).map_err(anyhow::Error::msg)?;
        }
        if self.kubeconfig.is_none() {
            self.kubeconfig = env.kubeconfig.clone();
        }
        Ok(())
    }

    /// Check the configuration for values the scenarios cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.cluster_name.trim().is_empty() {
            bail!("cluster_name must not be empty");
        }
        if self.cluster_namespace.trim().is_empty() {
            bail!("cluster_namespace must not be empty");
        }
        if self.network.server_namespace == self.network.client_namespace {
            bail!(
                "server and client namespaces must differ (both are {:?})",
                self.network.server_namespace
            );
        }
        if self.network.exec_timeout_secs == 0 {
            bail!("network.exec_timeout_secs must be positive");
        }

        let waits = [
            ("network.pod_ready", &self.network.pod_ready),
            ("network.enforcement", &self.network.enforcement),
            ("network.namespace_cleanup", &self.network.namespace_cleanup),
            ("cluster_api.cluster_ready", &self.cluster_api.cluster_ready),
            ("cluster_api.apiserver", &self.cluster_api.apiserver),
            ("cluster_api.apiserver_cert", &self.cluster_api.apiserver_cert),
        ];
        for (name, wait) in waits {
            wait.validate(name)?;
        }

        Ok(())
    }
}

/// Deadline and interval of one polling loop, in seconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitConfig {
    pub timeout_secs: u64,
    pub interval_secs: u64,
}

impl WaitConfig {
    pub const fn new(timeout_secs: u64, interval_secs: u64) -> Self {
        Self {
            timeout_secs,
            interval_secs,
        }
    }

    pub fn settings(&self) -> PollSettings {
        PollSettings::from_secs(self.timeout_secs, self.interval_secs)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.interval_secs == 0 {
            bail!("{name}.interval_secs must be positive");
        }
        if self.interval_secs > self.timeout_secs {
            bail!(
                "{name}.interval_secs ({}) exceeds timeout_secs ({})",
                self.interval_secs,
                self.timeout_secs
            );
        }
        Ok(())
    }
}

/// Settings of the NetworkPolicy enforcement scenario
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkTestConfig {
    /// Namespace recreated for the server pod and the policy
    pub server_namespace: String,
    pub client_namespace: String,
    pub server_pod: String,
    pub client_pod: String,
    pub policy_name: String,
    /// Image of both test pods; must ship the probe binary
    pub image: String,
    pub probe: ProbeKind,
    /// Require the probe to succeed before the policy is applied
    pub verify_baseline: bool,
    pub pod_ready: WaitConfig,
    pub enforcement: WaitConfig,
    pub namespace_cleanup: WaitConfig,
    pub exec_timeout_secs: u64,
}

impl Default for NetworkTestConfig {
    fn default() -> Self {
        Self {
            server_namespace: "network-test".to_string(),
            client_namespace: "default".to_string(),
            server_pod: "server".to_string(),
            client_pod: "client".to_string(),
            policy_name: "deny-cross-ns".to_string(),
            image: "alpine:latest".to_string(),
            probe: ProbeKind::default(),
            verify_baseline: true,
            pod_ready: WaitConfig::new(120, 5),
            enforcement: WaitConfig::new(60, 5),
            namespace_cleanup: WaitConfig::new(120, 5),
            exec_timeout_secs: 60,
        }
    }
}

/// Settings of the cluster endpoint scenario
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterApiConfig {
    pub cluster_ready: WaitConfig,
    pub apiserver: WaitConfig,
    pub apiserver_cert: WaitConfig,
}

impl Default for ClusterApiConfig {
    fn default() -> Self {
        Self {
            cluster_ready: WaitConfig::new(600, 10),
            apiserver: WaitConfig::new(300, 10),
            apiserver_cert: WaitConfig::new(600, 10),
        }
    }
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> PathBuf {
    if let Some(stripped) = path.to_str().and_then(|p| p.strip_prefix("~/")) {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = SuiteConfig::default();
        assert_eq!(config.cluster_name, "rke");
        assert_eq!(config.network.server_namespace, "network-test");
        assert_eq!(config.network.pod_ready, WaitConfig::new(120, 5));
        assert_eq!(config.network.enforcement, WaitConfig::new(60, 5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("suite.yaml");

        let mut config = SuiteConfig::default();
        config.cluster_name = "capi-quickstart".to_string();
        config.network.probe = ProbeKind::Tcp {
            port: 8080,
            timeout_secs: 3,
        };
        config.save(&path).unwrap();

        let loaded = SuiteConfig::load(&path).unwrap();
        assert_eq!(loaded.cluster_name, "capi-quickstart");
        assert_eq!(loaded.network.probe, config.network.probe);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("suite.json");
        std::fs::write(&path, r#"{"cluster_name": "edge", "network": {"image": "busybox"}}"#)
            .unwrap();

        let loaded = SuiteConfig::load(&path).unwrap();
        assert_eq!(loaded.cluster_name, "edge");
        assert_eq!(loaded.cluster_namespace, "bm-osp");
        assert_eq!(loaded.network.image, "busybox");
        assert_eq!(loaded.network.policy_name, "deny-cross-ns");
    }

    #[test]
    fn test_validate_rejects_same_namespaces() {
        let mut config = SuiteConfig::default();
        config.network.client_namespace = "network-test".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_wait() {
        let mut config = SuiteConfig::default();
        config.network.enforcement = WaitConfig::new(5, 10);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("network.enforcement"));
    }

    #[test]
    fn test_apply_env_overrides() {
        let env = EnvConfig {
            cluster: Some("prod".to_string()),
            scenario: Some("network-policy".to_string()),
            kubeconfig: Some("/tmp/mgmt.kubeconfig".to_string()),
            ..Default::default()
        };

        let mut config = SuiteConfig::default();
        config.apply_env(&env).unwrap();
        assert_eq!(config.cluster_name, "prod");
        assert_eq!(config.scenarios, vec![ScenarioKind::NetworkPolicy]);
        assert_eq!(config.kubeconfig.as_deref(), Some("/tmp/mgmt.kubeconfig"));
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(
            expand_path(Path::new("./suite.yaml")),
            PathBuf::from("./suite.yaml")
        );
    }
}
