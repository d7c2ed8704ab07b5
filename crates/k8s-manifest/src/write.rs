//! Destinations for placed manifests.

use std::{
	collections::BTreeMap,
	fs::{self, OpenOptions},
	io::{self, BufWriter, Write},
	path::{Path, PathBuf},
};

/// Receives one file per placed resource.
///
/// Paths are relative to the sink's own root.
pub trait ManifestSink {
	fn write(&mut self, path: &Path, contents: &[u8]) -> io::Result<()>;
}

impl<T: ManifestSink + ?Sized> ManifestSink for &mut T {
	fn write(&mut self, path: &Path, contents: &[u8]) -> io::Result<()> {
		(**self).write(path, contents)
	}
}

/// Writes files below a root directory, creating directories as needed.
///
/// Existing files are overwritten; nothing is ever removed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
	root: PathBuf,
}

impl DirectorySink {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}
}

impl ManifestSink for DirectorySink {
	fn write(&mut self, path: &Path, contents: &[u8]) -> io::Result<()> {
		let path = self.root.join(path);
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)?;
		}

		let mut options = OpenOptions::new();
		options.write(true).create(true).truncate(true);
		#[cfg(unix)]
		{
			use std::os::unix::fs::OpenOptionsExt;
			options.mode(0o644);
		}
		let mut writer = BufWriter::new(options.open(&path)?);
		writer.write_all(contents)?;
		writer.flush()
	}
}

/// Keeps written files in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
	pub files: BTreeMap<PathBuf, Vec<u8>>,
}

impl ManifestSink for MemorySink {
	fn write(&mut self, path: &Path, contents: &[u8]) -> io::Result<()> {
		self.files.insert(path.to_path_buf(), contents.to_vec());
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_directory_sink_creates_parents() {
		let dir = tempfile::tempdir().unwrap();
		let mut sink = DirectorySink::new(dir.path().join("out"));
		sink.write(Path::new("namespaces/ns1/ConfigMap-cfg.yaml"), b"kind: ConfigMap\n")
			.unwrap();

		let written = dir.path().join("out/namespaces/ns1/ConfigMap-cfg.yaml");
		assert_eq!(fs::read(&written).unwrap(), b"kind: ConfigMap\n");
	}

	#[test]
	fn test_directory_sink_overwrites() {
		let dir = tempfile::tempdir().unwrap();
		let mut sink = DirectorySink::new(dir.path());
		sink.write(Path::new("cluster/a.yaml"), b"first, and longer\n")
			.unwrap();
		sink.write(Path::new("cluster/a.yaml"), b"second\n").unwrap();
		assert_eq!(fs::read(dir.path().join("cluster/a.yaml")).unwrap(), b"second\n");
	}

	#[test]
	fn test_directory_sink_keeps_other_files() {
		let dir = tempfile::tempdir().unwrap();
		fs::create_dir_all(dir.path().join("cluster")).unwrap();
		fs::write(dir.path().join("cluster/old.yaml"), "old").unwrap();

		let mut sink = DirectorySink::new(dir.path());
		sink.write(Path::new("cluster/new.yaml"), b"new").unwrap();
		assert!(dir.path().join("cluster/old.yaml").exists());
	}

	#[cfg(unix)]
	#[test]
	fn test_directory_sink_file_mode() {
		use std::os::unix::fs::PermissionsExt;

		let dir = tempfile::tempdir().unwrap();
		let mut sink = DirectorySink::new(dir.path());
		sink.write(Path::new("a.yaml"), b"a").unwrap();
		let mode = fs::metadata(dir.path().join("a.yaml"))
			.unwrap()
			.permissions()
			.mode();
		// umask can only remove bits
		assert_eq!(mode & 0o133, 0);
	}
}
