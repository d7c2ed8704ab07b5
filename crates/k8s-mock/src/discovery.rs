//! Mock Kubernetes API discovery types.

use std::collections::HashMap;

/// Discovery mode for the mock server.
#[derive(Debug, Clone, Copy, Default)]
pub enum DiscoveryMode {
	/// Support aggregated discovery (APIGroupDiscoveryList).
	#[default]
	Aggregated,
	/// Return 406 for aggregated discovery, forcing fallback to legacy endpoints.
	Legacy,
}

/// Pre-configured discovery responses.
#[derive(Debug, Clone)]
pub struct MockDiscovery {
	pub core_resources: Vec<MockApiResource>,
	/// Resources keyed by group version, e.g. `apps/v1`.
	pub group_resources: HashMap<String, Vec<MockApiResource>>,
}

impl MockDiscovery {
	/// Discovery data without any resources.
	pub fn empty() -> Self {
		Self {
			core_resources: Vec::new(),
			group_resources: HashMap::new(),
		}
	}

	/// Add a resource to a group version, `v1` being the core group.
	pub fn with_resource(mut self, group_version: &str, resource: MockApiResource) -> Self {
		if group_version == "v1" {
			self.core_resources.push(resource);
		} else {
			self.group_resources
				.entry(group_version.to_string())
				.or_default()
				.push(resource);
		}
		self
	}
}

impl Default for MockDiscovery {
	fn default() -> Self {
		Self {
			core_resources: vec![
				MockApiResource::namespaced("configmaps", "ConfigMap"),
				MockApiResource::namespaced("secrets", "Secret"),
				MockApiResource::namespaced("services", "Service"),
				MockApiResource::namespaced("serviceaccounts", "ServiceAccount"),
				MockApiResource::namespaced("pods", "Pod"),
				MockApiResource::cluster_scoped("namespaces", "Namespace"),
			],
			group_resources: HashMap::from([
				(
					"apps/v1".to_string(),
					vec![
						MockApiResource::namespaced("deployments", "Deployment"),
						MockApiResource::namespaced("statefulsets", "StatefulSet"),
						MockApiResource::namespaced("daemonsets", "DaemonSet"),
					],
				),
				(
					"rbac.authorization.k8s.io/v1".to_string(),
					vec![
						MockApiResource::namespaced("roles", "Role"),
						MockApiResource::namespaced("rolebindings", "RoleBinding"),
						MockApiResource::cluster_scoped("clusterroles", "ClusterRole"),
						MockApiResource::cluster_scoped(
							"clusterrolebindings",
							"ClusterRoleBinding",
						),
					],
				),
				(
					"apiextensions.k8s.io/v1".to_string(),
					vec![MockApiResource::cluster_scoped(
						"customresourcedefinitions",
						"CustomResourceDefinition",
					)],
				),
				(
					"configmanagement.gke.io/v1".to_string(),
					vec![MockApiResource::cluster_scoped("repos", "Repo")],
				),
			]),
		}
	}
}

/// A mock API resource definition.
#[derive(Debug, Clone)]
pub struct MockApiResource {
	pub name: String,
	pub kind: String,
	pub namespaced: bool,
	pub verbs: Vec<String>,
}

const DEFAULT_VERBS: [&str; 7] = [
	"create", "delete", "get", "list", "patch", "update", "watch",
];

impl MockApiResource {
	fn new(name: &str, kind: &str, namespaced: bool) -> Self {
		Self {
			name: name.to_string(),
			kind: kind.to_string(),
			namespaced,
			verbs: DEFAULT_VERBS.iter().map(|v| (*v).to_string()).collect(),
		}
	}

	pub fn namespaced(name: &str, kind: &str) -> Self {
		Self::new(name, kind, true)
	}

	pub fn cluster_scoped(name: &str, kind: &str) -> Self {
		Self::new(name, kind, false)
	}
}
