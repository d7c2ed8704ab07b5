//! Consistency checks that make partitioning resources into files safe.
//!
//! Validation runs in two passes. The local pass checks every resource against
//! its resolved scope (and normalizes stray namespaces away); only once every
//! file has passed it does the global pass look for duplicate identities, so
//! it always compares normalized namespaces.

use std::{
	collections::{BTreeSet, HashMap, HashSet},
	path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, instrument};

use crate::{catalog::Catalog, document::Document, gvk::GroupKind, resource::Resource};

#[derive(Debug, Error)]
pub enum ValidationError {
	#[error("namespaced resource {resource} in input file {path:?} is missing the metadata.namespace field")]
	MissingNamespace { path: PathBuf, resource: String },

	#[error(
		"found more than one namespace declared in resources in a single list in input file {path:?}: {namespaces:?}"
	)]
	ListNamespaceConflict {
		path: PathBuf,
		namespaces: BTreeSet<String>,
	},

	#[error("found duplicate resource {namespace}/{name} with group/kind {group_kind} in input file {path:?}")]
	Duplicate {
		path: PathBuf,
		namespace: String,
		name: String,
		group_kind: GroupKind,
	},

	#[error("resource {resource} in input file {path:?} has {field} {value:?}, which cannot be used in an output path")]
	UnsafePathComponent {
		path: PathBuf,
		resource: String,
		field: &'static str,
		value: String,
	},

	#[error("scope of resource {resource} in input file {path:?} was never resolved")]
	Unresolved { path: PathBuf, resource: String },
}

/// Validate the whole catalog: every file locally, then uniqueness across files.
#[instrument(skip_all, fields(resources = catalog.len()))]
pub fn validate(catalog: &mut Catalog) -> Result<(), ValidationError> {
	for (path, resources) in catalog.files_mut() {
		for resource in resources {
			validate_resource(path, resource)?;
		}
	}
	check_unique(catalog)
}

/// Check a document against its scope.
///
/// A namespaced document must declare a namespace. A cluster-scoped document
/// that declares one has it cleared; applying this twice changes nothing.
pub fn normalize_namespace(
	path: &Path,
	document: &mut Document,
	namespaced: bool,
) -> Result<(), ValidationError> {
	if namespaced && document.namespace().is_empty() {
		return Err(ValidationError::MissingNamespace {
			path: path.to_path_buf(),
			resource: document.describe(),
		});
	}
	if !namespaced && !document.namespace().is_empty() {
		debug!(
			resource = %document.describe(),
			"clearing namespace of cluster-scoped resource"
		);
		document.set_namespace("");
	}
	Ok(())
}

/// Kind, name and namespace end up as output path components, so none of them
/// may contain a separator or be a relative directory reference.
fn check_path_components(path: &Path, document: &Document) -> Result<(), ValidationError> {
	let fields = [
		("kind", document.kind()),
		("metadata.name", document.name()),
		("metadata.namespace", document.namespace()),
	];
	for (field, value) in fields {
		if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
			return Err(ValidationError::UnsafePathComponent {
				path: path.to_path_buf(),
				resource: document.describe(),
				field,
				value: value.to_string(),
			});
		}
	}
	Ok(())
}

/// Local validation of a single resource.
pub fn validate_resource(path: &Path, resource: &mut Resource) -> Result<(), ValidationError> {
	check_path_components(path, resource.document())?;
	if resource.is_list() {
		for item in resource.document().item_documents() {
			check_path_components(path, &item)?;
		}
		return validate_list(path, resource);
	}

	let Some(namespaced) = resource.namespaced() else {
		return Err(ValidationError::Unresolved {
			path: path.to_path_buf(),
			resource: resource.document().describe(),
		});
	};
	normalize_namespace(path, resource.document_mut(), namespaced)
}

/// Validate the items of an unexpanded List and record their shared namespace.
fn validate_list(path: &Path, resource: &mut Resource) -> Result<(), ValidationError> {
	let scopes = resource.item_namespaced().to_vec();
	let description = resource.document().describe();
	let Some(items) = resource.document_mut().items_mut() else {
		return Ok(());
	};

	let mut documents: Vec<Document> = std::mem::take(items)
		.into_iter()
		.map(Document::new)
		.collect();
	// Items without apiVersion or kind were never resolved and are left alone.
	let mut typed: Vec<&mut Document> = documents
		.iter_mut()
		.filter(|item| item.is_resource())
		.collect();
	let shared = if typed.len() == scopes.len() {
		shared_namespace(path, &mut typed, &scopes)
	} else {
		Err(ValidationError::Unresolved {
			path: path.to_path_buf(),
			resource: description,
		})
	};
	*items = documents.into_iter().map(Document::into_value).collect();

	resource.set_list_namespace(shared?);
	Ok(())
}

/// The single namespace declared by all items, or "" when none declare one.
fn shared_namespace(
	path: &Path,
	items: &mut [&mut Document],
	scopes: &[bool],
) -> Result<String, ValidationError> {
	let mut namespaces = BTreeSet::new();
	for (item, namespaced) in items.iter_mut().zip(scopes) {
		namespaces.insert(item.namespace().to_string());
		if namespaces.len() > 1 {
			return Err(ValidationError::ListNamespaceConflict {
				path: path.to_path_buf(),
				namespaces,
			});
		}
		normalize_namespace(path, item, *namespaced)?;
	}
	Ok(namespaces.into_iter().next().unwrap_or_default())
}

/// Identities seen so far, per group and kind.
#[derive(Debug, Default)]
struct SeenResources {
	by_group_kind: HashMap<GroupKind, HashSet<(String, String)>>,
}

impl SeenResources {
	fn insert(&mut self, path: &Path, document: &Document) -> Result<(), ValidationError> {
		let group_kind = document.gvk().group_kind();
		let key = (document.namespace().to_string(), document.name().to_string());
		let seen = self.by_group_kind.entry(group_kind.clone()).or_default();
		if seen.contains(&key) {
			let (namespace, name) = key;
			return Err(ValidationError::Duplicate {
				path: path.to_path_buf(),
				namespace,
				name,
				group_kind,
			});
		}
		seen.insert(key);
		Ok(())
	}
}

/// Global pass: (namespace, name) must be unique per group and kind. For
/// unexpanded lists the identities of the items are checked.
fn check_unique(catalog: &Catalog) -> Result<(), ValidationError> {
	let mut seen = SeenResources::default();
	for (path, resources) in catalog.files() {
		for resource in resources {
			if resource.is_list() {
				for item in resource.document().item_documents() {
					seen.insert(path, &item)?;
				}
			} else {
				seen.insert(path, resource.document())?;
			}
		}
	}
	Ok(())
}
