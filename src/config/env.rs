//! Environment variable configuration
//!
//! Provides environment variable overrides for configuration.

use std::env;

/// Environment variable prefix
const ENV_PREFIX: &str = "NETPOL_E2E";

/// Environment configuration from environment variables
#[derive(Clone, Debug, Default)]
pub struct EnvConfig {
    /// Cluster name from NETPOL_E2E_CLUSTER
    pub cluster: Option<String>,
    /// Cluster namespace from NETPOL_E2E_NAMESPACE
    pub namespace: Option<String>,
    /// Test pod image from NETPOL_E2E_IMAGE
    pub image: Option<String>,
    /// Scenario selection from NETPOL_E2E_SCENARIO
    pub scenario: Option<String>,
    /// Output format from NETPOL_E2E_FORMAT
    pub format: Option<String>,
    /// Config file from NETPOL_E2E_CONFIG
    pub config_file: Option<String>,
    /// Log level from NETPOL_E2E_LOG
    pub log: Option<String>,
    /// Management kubeconfig from KUBECONFIG
    pub kubeconfig: Option<String>,
}

impl EnvConfig {
    /// Load configuration from environment variables
    pub fn load() -> Self {
        Self {
            cluster: get_env("CLUSTER"),
            namespace: get_env("NAMESPACE"),
            image: get_env("IMAGE"),
            scenario: get_env("SCENARIO"),
            format: get_env("FORMAT"),
            config_file: get_env("CONFIG"),
            log: get_env("LOG"),
            kubeconfig: env::var("KUBECONFIG").ok().filter(|v| !v.is_empty()),
        }
    }

    /// Print current environment configuration
    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_CLUSTER:    {:?}", ENV_PREFIX, self.cluster);
        println!("  {}_NAMESPACE:  {:?}", ENV_PREFIX, self.namespace);
        println!("  {}_IMAGE:      {:?}", ENV_PREFIX, self.image);
        println!("  {}_SCENARIO:   {:?}", ENV_PREFIX, self.scenario);
        println!("  {}_FORMAT:     {:?}", ENV_PREFIX, self.format);
        println!("  {}_CONFIG:     {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_LOG:        {:?}", ENV_PREFIX, self.log);
        println!("  KUBECONFIG:           {:?}", self.kubeconfig);
    }
}

/// Get environment variable with prefix; empty values count as unset
fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Print all NETPOL_E2E environment variables
pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_CLUSTER     Cluster API cluster name");
    println!("  {ENV_PREFIX}_NAMESPACE   Management namespace of the cluster and its secrets");
    println!("  {ENV_PREFIX}_IMAGE       Image for the test pods");
    println!("  {ENV_PREFIX}_SCENARIO    Scenarios to run (comma-separated ids or numbers)");
    println!("  {ENV_PREFIX}_FORMAT      Output format (table, json, json-pretty, csv, summary)");
    println!("  {ENV_PREFIX}_CONFIG      Path to configuration file");
    println!("  {ENV_PREFIX}_LOG         Log level (trace, debug, info, warn, error)");
    println!("  KUBECONFIG            Path to the management cluster kubeconfig");
    println!();
    println!("Example:");
    println!("  export KUBECONFIG=~/.kube/mgmt.yaml");
    println!("  export {ENV_PREFIX}_CLUSTER=rke");
    println!("  netpol-e2e run --scenario network-policy");
}
