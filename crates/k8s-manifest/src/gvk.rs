//! Kubernetes type identifiers.

use std::fmt;

/// Group, version and kind of a resource type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupVersionKind {
	pub group: String,
	pub version: String,
	pub kind: String,
}

impl GroupVersionKind {
	pub fn gvk(group: &str, version: &str, kind: &str) -> Self {
		Self {
			group: group.to_string(),
			version: version.to_string(),
			kind: kind.to_string(),
		}
	}

	/// Create a GroupVersionKind from an apiVersion string and kind.
	///
	/// An apiVersion without a `/` belongs to the core (empty) group.
	pub fn from_api_version(api_version: &str, kind: &str) -> Self {
		let (group, version) = match api_version.split_once('/') {
			Some((g, v)) => (g, v),
			None => ("", api_version),
		};
		Self::gvk(group, version, kind)
	}

	/// The apiVersion string as it appears in manifests.
	pub fn api_version(&self) -> String {
		if self.group.is_empty() {
			self.version.clone()
		} else {
			format!("{}/{}", self.group, self.version)
		}
	}

	pub fn group_kind(&self) -> GroupKind {
		GroupKind {
			group: self.group.clone(),
			kind: self.kind.clone(),
		}
	}
}

impl fmt::Display for GroupVersionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.api_version(), self.kind)
	}
}

/// A resource type without its version, used for identity across API versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKind {
	pub group: String,
	pub kind: String,
}

impl GroupKind {
	pub fn new(group: &str, kind: &str) -> Self {
		Self {
			group: group.to_string(),
			kind: kind.to_string(),
		}
	}
}

impl fmt::Display for GroupKind {
	/// Formats as `Kind.group`, or just `Kind` for the core group.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.group.is_empty() {
			f.write_str(&self.kind)
		} else {
			write!(f, "{}.{}", self.kind, self.group)
		}
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case::grouped("apps/v1", "apps", "v1")]
	#[case::core("v1", "", "v1")]
	#[case::crd("configmanagement.gke.io/v1", "configmanagement.gke.io", "v1")]
	fn test_from_api_version(#[case] api_version: &str, #[case] group: &str, #[case] version: &str) {
		let gvk = GroupVersionKind::from_api_version(api_version, "Thing");
		assert_eq!(gvk.group, group);
		assert_eq!(gvk.version, version);
		assert_eq!(gvk.kind, "Thing");
		assert_eq!(gvk.api_version(), api_version);
	}

	#[test]
	fn test_group_kind_ignores_version() {
		let v1 = GroupVersionKind::gvk("apps", "v1", "Deployment");
		let beta = GroupVersionKind::gvk("apps", "v1beta1", "Deployment");
		assert_eq!(v1.group_kind(), beta.group_kind());
	}

	#[test]
	fn test_group_kind_display() {
		assert_eq!(GroupKind::new("", "ConfigMap").to_string(), "ConfigMap");
		assert_eq!(
			GroupKind::new("apps", "Deployment").to_string(),
			"Deployment.apps"
		);
	}
}
