//! Cluster access for scope discovery.
//!
//! Whether a kind is namespaced is read from the cluster's discovery API
//! through kube-rs, once per run, before any manifest is classified.

pub mod client;
pub mod discovery;

/// Kubernetes API resource scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
	/// Resource is namespaced (e.g., Deployment, ConfigMap).
	Namespaced,

	/// Resource is cluster-wide (e.g., Namespace, ClusterRole).
	ClusterWide,
}

impl From<kube::discovery::Scope> for ResourceScope {
	fn from(scope: kube::discovery::Scope) -> Self {
		match scope {
			kube::discovery::Scope::Namespaced => Self::Namespaced,
			kube::discovery::Scope::Cluster => Self::ClusterWide,
		}
	}
}
