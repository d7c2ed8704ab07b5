//! All resources decoded from the input files, grouped by file.

use std::{
	collections::BTreeSet,
	fs,
	path::{Path, PathBuf},
};

use indexmap::IndexMap;
use tracing::{info, instrument, warn};

use crate::{
	decode::{decode_manifest, DecodeOpts},
	document::Document,
	error::{Error, Result},
	gvk::GroupVersionKind,
	resource::Resource,
};

/// Resources keyed by the input file they were decoded from.
///
/// Files keep the order they were added in, resources keep decode order.
#[derive(Debug, Default)]
pub struct Catalog {
	files: IndexMap<PathBuf, Vec<Resource>>,
}

impl Catalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Read and decode every input file.
	#[instrument(skip_all, fields(files = paths.len()))]
	pub fn read_files<P: AsRef<Path>>(paths: &[P], opts: &DecodeOpts) -> Result<Self> {
		let mut catalog = Self::new();
		for path in paths {
			let path = path.as_ref();
			info!(path = %path.display(), "reading input file");
			let data = fs::read(path).map_err(|source| Error::Read {
				path: path.to_path_buf(),
				source,
			})?;
			let count = catalog.add_file(path, &data, opts)?;
			info!(path = %path.display(), count, "found resources in file");
		}
		Ok(catalog)
	}

	/// Decode one file's contents and add its resources.
	///
	/// Adding the same path again replaces what it held before.
	pub fn add_file(&mut self, path: &Path, data: &[u8], opts: &DecodeOpts) -> Result<usize> {
		let resources = decode_manifest(path, data, opts)?;
		let count = resources.len();
		if self.files.insert(path.to_path_buf(), resources).is_some() {
			warn!(path = %path.display(), "input file given more than once");
		}
		Ok(count)
	}

	pub fn files(&self) -> impl Iterator<Item = (&Path, &[Resource])> {
		self.files
			.iter()
			.map(|(path, resources)| (path.as_path(), resources.as_slice()))
	}

	pub(crate) fn files_mut(&mut self) -> impl Iterator<Item = (&Path, &mut [Resource])> {
		self.files
			.iter_mut()
			.map(|(path, resources)| (path.as_path(), resources.as_mut_slice()))
	}

	pub fn resources(&self) -> impl Iterator<Item = &Resource> {
		self.files.values().flatten()
	}

	pub fn len(&self) -> usize {
		self.files.values().map(Vec::len).sum()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Every type the scope resolver will ask about, including the items of
	/// unexpanded lists.
	pub fn kinds(&self) -> BTreeSet<GroupVersionKind> {
		let mut kinds = BTreeSet::new();
		for resource in self.resources() {
			if resource.is_list() {
				kinds.extend(resource.document().item_documents().iter().map(Document::gvk));
			} else {
				kinds.insert(resource.document().gvk());
			}
		}
		kinds
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use indoc::indoc;

	use super::*;

	const CONFIGMAP: &str = indoc! {"
		apiVersion: v1
		kind: ConfigMap
		metadata:
		  name: cfg
		  namespace: ns1
	"};

	#[test]
	fn test_read_files() {
		let dir = tempfile::tempdir().unwrap();
		let a = dir.path().join("a.yaml");
		let b = dir.path().join("b.json");
		fs::write(&a, CONFIGMAP).unwrap();
		fs::write(
			&b,
			r#"{"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "web", "namespace": "ns1"}}"#,
		)
		.unwrap();

		let catalog = Catalog::read_files(&[&a, &b], &DecodeOpts::default()).unwrap();
		assert_eq!(catalog.len(), 2);
		let files: Vec<_> = catalog.files().map(|(p, r)| (p.to_path_buf(), r.len())).collect();
		assert_eq!(files, vec![(a, 1), (b, 1)]);
		assert_eq!(
			catalog.kinds().into_iter().collect::<Vec<_>>(),
			vec![
				GroupVersionKind::gvk("", "v1", "ConfigMap"),
				GroupVersionKind::gvk("apps", "v1", "Deployment"),
			]
		);
	}

	#[test]
	fn test_read_missing_file() {
		let err = Catalog::read_files(&["/nonexistent/input.yaml"], &DecodeOpts::default())
			.unwrap_err();
		assert_matches!(err, Error::Read { ref path, .. } if path == Path::new("/nonexistent/input.yaml"));
	}

	#[test]
	fn test_kinds_include_unexpanded_list_items() {
		let mut catalog = Catalog::new();
		let input = indoc! {"
			apiVersion: v1
			kind: List
			items:
			- apiVersion: rbac.authorization.k8s.io/v1
			  kind: Role
			  metadata: {name: r, namespace: ns}
			- metadata: {name: untyped}
		"};
		let opts = DecodeOpts {
			expand_lists: false,
		};
		catalog
			.add_file(Path::new("l.yaml"), input.as_bytes(), &opts)
			.unwrap();
		assert_eq!(
			catalog.kinds().into_iter().collect::<Vec<_>>(),
			vec![GroupVersionKind::gvk("rbac.authorization.k8s.io", "v1", "Role")]
		);
	}
}
