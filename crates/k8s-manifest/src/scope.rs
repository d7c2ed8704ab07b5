//! Namespace scope resolution.
//!
//! Whether a kind is namespaced is a property of the cluster, not of the
//! manifest, so it is asked of a [`NamespaceScopeOracle`].

use std::collections::HashMap;

use thiserror::Error;
use tracing::{instrument, trace};

use crate::{
	catalog::Catalog,
	error::{Error, Result},
	gvk::{GroupKind, GroupVersionKind},
};

#[derive(Debug, Error)]
pub enum DiscoveryError {
	#[error("resource type {0} is not known to the cluster")]
	UnknownKind(GroupVersionKind),

	#[error("failed to discover resource type {gvk}")]
	Lookup {
		gvk: GroupVersionKind,
		#[source]
		source: Box<dyn std::error::Error + Send + Sync>,
	},
}

/// Answers whether instances of a resource type live in a namespace.
pub trait NamespaceScopeOracle {
	fn is_namespaced(&self, gvk: &GroupVersionKind) -> Result<bool, DiscoveryError>;
}

impl<T: NamespaceScopeOracle + ?Sized> NamespaceScopeOracle for &T {
	fn is_namespaced(&self, gvk: &GroupVersionKind) -> Result<bool, DiscoveryError> {
		(**self).is_namespaced(gvk)
	}
}

/// A fixed table of scopes keyed by group and kind.
#[derive(Debug, Clone, Default)]
pub struct ScopeTable {
	scopes: HashMap<GroupKind, bool>,
}

impl ScopeTable {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn namespaced(mut self, group: &str, kind: &str) -> Self {
		self.scopes.insert(GroupKind::new(group, kind), true);
		self
	}

	pub fn cluster_scoped(mut self, group: &str, kind: &str) -> Self {
		self.scopes.insert(GroupKind::new(group, kind), false);
		self
	}

	/// Common built-in kinds.
	pub fn builtin() -> Self {
		Self::new()
			.namespaced("", "ConfigMap")
			.namespaced("", "Secret")
			.namespaced("", "Service")
			.namespaced("", "ServiceAccount")
			.namespaced("", "Pod")
			.cluster_scoped("", "Namespace")
			.namespaced("apps", "Deployment")
			.namespaced("apps", "StatefulSet")
			.namespaced("apps", "DaemonSet")
			.namespaced("rbac.authorization.k8s.io", "Role")
			.namespaced("rbac.authorization.k8s.io", "RoleBinding")
			.cluster_scoped("rbac.authorization.k8s.io", "ClusterRole")
			.cluster_scoped("rbac.authorization.k8s.io", "ClusterRoleBinding")
			.cluster_scoped("apiextensions.k8s.io", "CustomResourceDefinition")
	}
}

impl NamespaceScopeOracle for ScopeTable {
	fn is_namespaced(&self, gvk: &GroupVersionKind) -> Result<bool, DiscoveryError> {
		self.scopes
			.get(&gvk.group_kind())
			.copied()
			.ok_or_else(|| DiscoveryError::UnknownKind(gvk.clone()))
	}
}

/// Record the scope of every resource in the catalog.
///
/// Unexpanded lists are not served types themselves, so each of their items
/// is looked up instead.
#[instrument(skip_all, fields(resources = catalog.len()))]
pub fn resolve_scopes(catalog: &mut Catalog, oracle: &dyn NamespaceScopeOracle) -> Result<()> {
	for (path, resources) in catalog.files_mut() {
		let discovery_error = |source| Error::Discovery {
			path: path.to_path_buf(),
			source,
		};
		for resource in resources {
			if resource.is_list() {
				let scopes = resource
					.document()
					.item_documents()
					.iter()
					.map(|item| oracle.is_namespaced(&item.gvk()))
					.collect::<Result<Vec<_>, _>>()
					.map_err(discovery_error)?;
				resource.set_item_namespaced(scopes);
				continue;
			}

			let gvk = resource.document().gvk();
			let namespaced = oracle.is_namespaced(&gvk).map_err(discovery_error)?;
			trace!(%gvk, namespaced, "resolved scope");
			resource.set_namespaced(namespaced);
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use std::{cell::Cell, path::Path};

	use assert_matches::assert_matches;
	use indoc::indoc;

	use super::*;
	use crate::decode::DecodeOpts;

	/// Counts lookups to check each resource is resolved exactly once.
	struct CountingOracle {
		inner: ScopeTable,
		calls: Cell<usize>,
	}

	impl NamespaceScopeOracle for CountingOracle {
		fn is_namespaced(&self, gvk: &GroupVersionKind) -> Result<bool, DiscoveryError> {
			self.calls.set(self.calls.get() + 1);
			self.inner.is_namespaced(gvk)
		}
	}

	const INPUT: &str = indoc! {"
		apiVersion: v1
		kind: ConfigMap
		metadata: {name: a, namespace: ns}
		---
		apiVersion: v1
		kind: ConfigMap
		metadata: {name: b, namespace: ns}
		---
		apiVersion: rbac.authorization.k8s.io/v1
		kind: ClusterRole
		metadata: {name: cr}
	"};

	#[test]
	fn test_resolve_sets_every_scope() {
		let mut catalog = Catalog::new();
		catalog
			.add_file(Path::new("a.yaml"), INPUT.as_bytes(), &DecodeOpts::default())
			.unwrap();
		let oracle = CountingOracle {
			inner: ScopeTable::builtin(),
			calls: Cell::new(0),
		};

		resolve_scopes(&mut catalog, &oracle).unwrap();

		assert_eq!(oracle.calls.get(), 3);
		let scopes: Vec<_> = catalog.resources().map(|r| r.namespaced()).collect();
		assert_eq!(scopes, vec![Some(true), Some(true), Some(false)]);
	}

	#[test]
	fn test_resolve_unexpanded_list_items() {
		let input = indoc! {"
			apiVersion: v1
			kind: List
			items:
			- apiVersion: rbac.authorization.k8s.io/v1
			  kind: ClusterRole
			  metadata: {name: cr}
			- apiVersion: v1
			  kind: ServiceAccount
			  metadata: {name: sa, namespace: ns}
		"};
		let mut catalog = Catalog::new();
		let opts = DecodeOpts {
			expand_lists: false,
		};
		catalog
			.add_file(Path::new("l.yaml"), input.as_bytes(), &opts)
			.unwrap();

		resolve_scopes(&mut catalog, &ScopeTable::builtin()).unwrap();

		let list = catalog.resources().next().unwrap();
		assert_eq!(list.item_namespaced(), &[false, true]);
		assert_eq!(list.namespaced(), Some(true));
	}

	#[test]
	fn test_unknown_kind_names_file() {
		let input = "apiVersion: example.com/v1\nkind: Widget\nmetadata: {name: w}\n";
		let mut catalog = Catalog::new();
		catalog
			.add_file(Path::new("w.yaml"), input.as_bytes(), &DecodeOpts::default())
			.unwrap();

		let err = resolve_scopes(&mut catalog, &ScopeTable::builtin()).unwrap_err();
		assert_matches!(
			err,
			Error::Discovery {
				ref path,
				source: DiscoveryError::UnknownKind(ref gvk),
			} if path == Path::new("w.yaml") && gvk.kind == "Widget"
		);
	}
}
