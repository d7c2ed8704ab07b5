//! The full split: read, resolve, validate, classify, write.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::{
	catalog::Catalog,
	classify::{classify, Placement},
	decode::DecodeOpts,
	error::{Error, Result},
	scope::{resolve_scopes, NamespaceScopeOracle},
	validate::validate,
	write::{DirectorySink, ManifestSink},
};

pub const DEFAULT_OUTPUT_DIR: &str = "config/";

#[derive(Debug, Clone)]
pub struct SplitOpts {
	/// Root of the output tree.
	pub output_dir: PathBuf,
	/// Replace List documents by their items.
	pub expand_lists: bool,
}

impl Default for SplitOpts {
	fn default() -> Self {
		Self {
			output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
			expand_lists: true,
		}
	}
}

impl SplitOpts {
	pub fn decode_opts(&self) -> DecodeOpts {
		DecodeOpts {
			expand_lists: self.expand_lists,
		}
	}
}

/// Write every placement's original bytes, returning the relative paths written.
#[instrument(skip_all, fields(files = placements.len()))]
pub fn write_placements<S: ManifestSink>(
	placements: &[Placement<'_>],
	sink: &mut S,
) -> Result<Vec<PathBuf>> {
	let mut written = Vec::with_capacity(placements.len());
	for placement in placements {
		let path = placement.path();
		info!(
			resource = %placement.resource,
			bucket = %placement.bucket,
			path = %path.display(),
			"writing resource"
		);
		sink.write(&path, placement.resource.raw())
			.map_err(|source| Error::Write {
				path: path.clone(),
				source,
			})?;
		written.push(path);
	}
	Ok(written)
}

/// Run every phase on an already-read catalog.
pub fn split_catalog<S: ManifestSink>(
	catalog: &mut Catalog,
	oracle: &dyn NamespaceScopeOracle,
	sink: &mut S,
) -> Result<Vec<PathBuf>> {
	resolve_scopes(catalog, oracle)?;
	validate(catalog)?;
	let placements = classify(catalog);
	write_placements(&placements, sink)
}

/// Split the input files into a directory tree below `opts.output_dir`.
#[instrument(skip_all, fields(inputs = inputs.len(), output = %opts.output_dir.display()))]
pub fn split<P: AsRef<Path>>(
	inputs: &[P],
	oracle: &dyn NamespaceScopeOracle,
	opts: &SplitOpts,
) -> Result<Vec<PathBuf>> {
	let mut catalog = Catalog::read_files(inputs, &opts.decode_opts())?;
	let mut sink = DirectorySink::new(&opts.output_dir);
	let written = split_catalog(&mut catalog, oracle, &mut sink)?;
	info!(files = written.len(), "split complete");
	Ok(written)
}

#[cfg(test)]
mod tests {
	use std::fs;

	use assert_matches::assert_matches;
	use indoc::indoc;

	use super::*;
	use crate::{scope::ScopeTable, validate::ValidationError, write::MemorySink};

	const A_YAML: &str = indoc! {"
		apiVersion: v1
		kind: ConfigMap
		metadata:
		  name: cfg
		  namespace: ns1
		---
		apiVersion: rbac.authorization.k8s.io/v1
		kind: ClusterRole
		metadata:
		  name: cr
	"};

	#[test]
	fn test_split_writes_raw_bytes() {
		let mut catalog = Catalog::new();
		catalog
			.add_file(Path::new("a.yaml"), A_YAML.as_bytes(), &DecodeOpts::default())
			.unwrap();
		let mut sink = MemorySink::default();
		let written = split_catalog(&mut catalog, &ScopeTable::builtin(), &mut sink).unwrap();

		assert_eq!(
			written,
			vec![
				PathBuf::from("cluster/ClusterRole-cr.yaml"),
				PathBuf::from("namespaces/ns1/ConfigMap-cfg.yaml"),
			]
		);
		let configmap = &sink.files[Path::new("namespaces/ns1/ConfigMap-cfg.yaml")];
		assert_eq!(
			String::from_utf8_lossy(configmap),
			"apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\n  namespace: ns1\n"
		);
	}

	#[test]
	fn test_validation_failure_writes_nothing() {
		let input = "apiVersion: v1\nkind: ConfigMap\nmetadata: {name: cfg}\n";
		let mut catalog = Catalog::new();
		catalog
			.add_file(Path::new("a.yaml"), input.as_bytes(), &DecodeOpts::default())
			.unwrap();
		let mut sink = MemorySink::default();
		let err = split_catalog(&mut catalog, &ScopeTable::builtin(), &mut sink).unwrap_err();
		assert_matches!(
			err,
			Error::Validation(ValidationError::MissingNamespace { .. })
		);
		assert!(sink.files.is_empty());
	}

	#[test]
	fn test_split_to_directory() {
		let dir = tempfile::tempdir().unwrap();
		let input = dir.path().join("a.yaml");
		fs::write(&input, A_YAML).unwrap();
		let opts = SplitOpts {
			output_dir: dir.path().join("out"),
			..Default::default()
		};

		let written = split(&[&input], &ScopeTable::builtin(), &opts).unwrap();
		assert_eq!(written.len(), 2);
		assert!(dir.path().join("out/cluster/ClusterRole-cr.yaml").is_file());
		assert!(dir
			.path()
			.join("out/namespaces/ns1/ConfigMap-cfg.yaml")
			.is_file());
	}

	#[test]
	fn test_default_opts() {
		let opts = SplitOpts::default();
		assert_eq!(opts.output_dir, Path::new("config/"));
		assert!(opts.expand_lists);
	}
}
