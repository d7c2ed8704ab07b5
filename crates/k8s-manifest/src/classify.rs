//! Placement of validated resources in the output tree.

use std::{
	collections::BTreeMap,
	fmt,
	path::{Path, PathBuf},
};

use tracing::{debug, instrument};

use crate::{
	catalog::Catalog,
	resource::{Origin, Resource},
};

/// Kind of the configuration-management root resource.
pub const SYSTEM_KIND: &str = "Repo";
/// apiVersion of the configuration-management root resource.
pub const SYSTEM_API_VERSION: &str = "configmanagement.gke.io/v1";

pub const NAMESPACES_DIR: &str = "namespaces";
pub const CLUSTER_DIR: &str = "cluster";
pub const SYSTEM_DIR: &str = "system";

/// Namespace grouping of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
	Cluster,
	Namespace(String),
}

impl Bucket {
	fn from_namespace(namespace: &str) -> Self {
		if namespace.is_empty() {
			Self::Cluster
		} else {
			Self::Namespace(namespace.to_string())
		}
	}
}

impl fmt::Display for Bucket {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Cluster => write!(f, "<cluster>"),
			Self::Namespace(ns) => write!(f, "{ns}"),
		}
	}
}

/// Where a single resource is written.
#[derive(Debug, Clone)]
pub struct Placement<'a> {
	pub resource: &'a Resource,
	pub bucket: Bucket,
	/// Routed to the system directory instead of its bucket's directory.
	pub system: bool,
	pub file_name: String,
}

impl Placement<'_> {
	/// Directory relative to the output root.
	pub fn directory(&self) -> PathBuf {
		if self.system {
			return PathBuf::from(SYSTEM_DIR);
		}
		match &self.bucket {
			Bucket::Cluster => PathBuf::from(CLUSTER_DIR),
			Bucket::Namespace(ns) => Path::new(NAMESPACES_DIR).join(ns),
		}
	}

	/// File path relative to the output root.
	pub fn path(&self) -> PathBuf {
		self.directory().join(&self.file_name)
	}
}

fn is_namespace_object(resource: &Resource) -> bool {
	let document = resource.document();
	document.kind() == "Namespace" && document.api_version() == "v1"
}

/// The configuration-management root resource.
pub fn is_system_resource(resource: &Resource) -> bool {
	let document = resource.document();
	document.kind() == SYSTEM_KIND && document.api_version() == SYSTEM_API_VERSION
}

/// Bucket of a validated resource.
///
/// A `v1/Namespace` groups with the namespace it defines; an unexpanded list
/// with the namespace its items share.
pub fn bucket_for(resource: &Resource) -> Bucket {
	if is_namespace_object(resource) {
		return Bucket::from_namespace(resource.document().name());
	}
	if resource.is_list() {
		return Bucket::from_namespace(resource.list_namespace().unwrap_or_default());
	}
	Bucket::from_namespace(resource.document().namespace())
}

/// Output file name of a resource.
///
/// Lists and list items have no usable name of their own, so they are named
/// after their position in the input file.
pub fn file_name(resource: &Resource) -> String {
	let document = resource.document();
	let extension = resource.format().extension();
	if resource.is_list() || resource.origin() == Origin::ListItem {
		let stem = resource
			.source()
			.file_stem()
			.map(|stem| stem.to_string_lossy())
			.unwrap_or_default();
		return format!(
			"{}-{}-{stem}.{extension}",
			document.kind(),
			resource.index()
		);
	}
	if is_namespace_object(resource) {
		return format!("namespace.{extension}");
	}
	format!("{}-{}.{extension}", document.kind(), document.name())
}

/// Place every resource in the catalog, grouped by bucket.
#[instrument(skip_all, fields(resources = catalog.len()))]
pub fn classify(catalog: &Catalog) -> Vec<Placement<'_>> {
	let mut buckets: BTreeMap<Bucket, Vec<Placement<'_>>> = BTreeMap::new();
	for resource in catalog.resources() {
		let bucket = bucket_for(resource);
		let placement = Placement {
			resource,
			system: is_system_resource(resource),
			file_name: file_name(resource),
			bucket: bucket.clone(),
		};
		debug!(%resource, %bucket, path = %placement.path().display(), "placed resource");
		buckets.entry(bucket).or_default().push(placement);
	}
	buckets.into_values().flatten().collect()
}
