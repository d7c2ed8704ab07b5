//! Kubernetes API resource discovery and caching.
//!
//! The cache is filled once from the cluster's discovery API and then answers
//! scope lookups for the splitting pipeline without further requests.

use std::{
	collections::{HashMap, HashSet},
	sync::Arc,
};

use k8s_manifest::scope::{DiscoveryError as ScopeLookupError, NamespaceScopeOracle};
use kube::{
	core::GroupVersionKind,
	discovery::{oneshot::pinned_kind, ApiResource},
	Client, Discovery,
};
use thiserror::Error;
use tokio::{sync::Semaphore, task::JoinSet};
use tracing::instrument;

use super::ResourceScope;

/// Errors that can occur during API resource discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
	#[error("discovery task panicked")]
	TaskPanicked(#[source] tokio::task::JoinError),

	#[error("failed to discover resource {api_version}/{kind}")]
	ResourceDiscovery {
		api_version: String,
		kind: String,
		#[source]
		source: kube::Error,
	},
}

/// Create a kube GroupVersionKind from a manifest type.
pub fn to_kube_gvk(gvk: &k8s_manifest::GroupVersionKind) -> GroupVersionKind {
	GroupVersionKind::gvk(&gvk.group, &gvk.version, &gvk.kind)
}

/// Create a GroupVersionKind from a kube ApiResource.
fn gvk_from_api_resource(ar: &ApiResource) -> GroupVersionKind {
	GroupVersionKind::gvk(&ar.group, &ar.version, &ar.kind)
}

/// Cached scope of every discovered resource type.
#[derive(Debug, Clone, Default)]
pub struct ApiResourceCache {
	resources: HashMap<GroupVersionKind, ResourceScope>,
}

impl ApiResourceCache {
	/// Maximum concurrent discovery requests for lazy fallback.
	const MAX_CONCURRENT_DISCOVERIES: usize = 8;

	/// Build the cache by querying the cluster's discovery API.
	///
	/// Uses the Aggregated Discovery API (K8s 1.26+) which requires only 2 API calls.
	/// Falls back to lazy discovery of only `required_keys` for older clusters.
	#[instrument(skip_all, fields(key_count = required_keys.len()))]
	pub async fn build(
		client: &Client,
		required_keys: HashSet<GroupVersionKind>,
	) -> Result<Self, DiscoveryError> {
		match Discovery::new(client.clone()).run_aggregated().await {
			Ok(discovery) => {
				tracing::debug!("using aggregated discovery");
				Ok(Self::from_discovery(discovery))
			}
			Err(e) => {
				tracing::debug!(error = %e, "aggregated discovery not available, using lazy discovery");
				Self::build_lazy(client, required_keys).await
			}
		}
	}

	/// Build cache from a completed Discovery.
	fn from_discovery(discovery: Discovery) -> Self {
		let mut resources = HashMap::new();

		for group in discovery.groups() {
			// All versions, not just the recommended one: manifests may pin an
			// older version of a type.
			for ver in group.versions() {
				for (ar, caps) in group.versioned_resources(ver) {
					resources.insert(gvk_from_api_resource(&ar), ResourceScope::from(caps.scope));
				}
			}
		}

		Self { resources }
	}

	/// Build cache lazily by discovering only the specified resource keys.
	///
	/// Uses bounded parallelism to discover multiple resources concurrently.
	/// Types the cluster does not serve are left out of the cache.
	#[instrument(skip_all, fields(key_count = keys.len()))]
	async fn build_lazy(
		client: &Client,
		keys: HashSet<GroupVersionKind>,
	) -> Result<Self, DiscoveryError> {
		let semaphore = Arc::new(Semaphore::new(Self::MAX_CONCURRENT_DISCOVERIES));
		let mut join_set = JoinSet::new();

		for gvk in keys {
			let client = client.clone();
			let sem = semaphore.clone();

			join_set.spawn(async move {
				// the semaphore is never closed
				let _permit = sem.acquire().await.ok();

				tracing::debug!(
					api_version = %gvk.api_version(),
					kind = %gvk.kind,
					"discovering resource"
				);

				match pinned_kind(&client, &gvk).await {
					Ok((_, capabilities)) => Ok((gvk, ResourceScope::from(capabilities.scope))),
					Err(e) => Err((gvk, e)),
				}
			});
		}

		let mut resources: HashMap<GroupVersionKind, ResourceScope> = HashMap::new();
		let mut errors = Vec::new();

		while let Some(result) = join_set.join_next().await {
			match result.map_err(DiscoveryError::TaskPanicked)? {
				Ok((gvk, scope)) => {
					resources.insert(gvk, scope);
				}
				Err((gvk, e)) => {
					tracing::warn!(
						api_version = %gvk.api_version(),
						kind = %gvk.kind,
						error = %e,
						"failed to discover resource"
					);
					errors.push((gvk, e));
				}
			}
		}

		// If all discoveries failed, the cluster is likely unreachable
		if resources.is_empty() && !errors.is_empty() {
			let (gvk, e) = errors.remove(0);
			return Err(DiscoveryError::ResourceDiscovery {
				api_version: gvk.api_version(),
				kind: gvk.kind,
				source: e,
			});
		}

		Ok(Self { resources })
	}

	/// Look up the scope of a resource type.
	pub fn lookup(&self, gvk: &GroupVersionKind) -> Option<ResourceScope> {
		self.resources.get(gvk).copied()
	}

	pub fn len(&self) -> usize {
		self.resources.len()
	}

	pub fn is_empty(&self) -> bool {
		self.resources.is_empty()
	}
}

impl NamespaceScopeOracle for ApiResourceCache {
	fn is_namespaced(&self, gvk: &k8s_manifest::GroupVersionKind) -> Result<bool, ScopeLookupError> {
		match self.lookup(&to_kube_gvk(gvk)) {
			Some(scope) => Ok(scope == ResourceScope::Namespaced),
			None => Err(ScopeLookupError::UnknownKind(gvk.clone())),
		}
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;

	use super::*;

	fn cache() -> ApiResourceCache {
		ApiResourceCache {
			resources: HashMap::from([
				(
					GroupVersionKind::gvk("", "v1", "ConfigMap"),
					ResourceScope::Namespaced,
				),
				(
					GroupVersionKind::gvk("rbac.authorization.k8s.io", "v1", "ClusterRole"),
					ResourceScope::ClusterWide,
				),
			]),
		}
	}

	#[test]
	fn test_oracle_answers_from_cache() {
		let cache = cache();
		let configmap = k8s_manifest::GroupVersionKind::gvk("", "v1", "ConfigMap");
		let role =
			k8s_manifest::GroupVersionKind::from_api_version("rbac.authorization.k8s.io/v1", "ClusterRole");
		assert!(cache.is_namespaced(&configmap).unwrap());
		assert!(!cache.is_namespaced(&role).unwrap());
	}

	#[test]
	fn test_oracle_version_must_match() {
		let gvk = k8s_manifest::GroupVersionKind::gvk("", "v2", "ConfigMap");
		assert_matches!(
			cache().is_namespaced(&gvk),
			Err(ScopeLookupError::UnknownKind(ref unknown)) if unknown == &gvk
		);
	}

	#[test]
	fn test_to_kube_gvk() {
		let gvk = to_kube_gvk(&k8s_manifest::GroupVersionKind::from_api_version("apps/v1", "Deployment"));
		assert_eq!(gvk.group, "apps");
		assert_eq!(gvk.version, "v1");
		assert_eq!(gvk.kind, "Deployment");
		assert_eq!(gvk.api_version(), "apps/v1");
	}
}
