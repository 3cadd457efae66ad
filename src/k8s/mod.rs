//! Kubernetes API client module
//!
//! Management and workload cluster access: credentials, namespaces, pods,
//! exec, NetworkPolicies and Cluster API objects.

mod client;
pub mod cluster;
pub mod credentials;
pub mod exec;
pub mod namespace;
pub mod network_policy;
pub mod pod;

#[cfg(test)]
pub(crate) mod mock;

pub use client::K8sClient;
pub use exec::{ExecError, ExecOutput, PodExecutor};
pub use namespace::NamespaceManager;
pub use network_policy::NetworkPolicyManager;
pub use pod::{PodManager, ReadyPod, TestPodConfig};
