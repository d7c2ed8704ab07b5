//! Configuration file support.
//!
//! A `.manifest-splitter.yaml` file may set the same options as the command
//! line. Without an explicit `--config`, the file is searched for from the
//! working directory upward to the filesystem root.

use std::{
	fs,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

/// The name of the config file searched for
pub const CONFIG_FILE_NAME: &str = ".manifest-splitter.yaml";

/// Root configuration structure for .manifest-splitter.yaml
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SplitterConfig {
	/// Path to the kubeconfig used for discovery. Empty means inferred.
	#[serde(default)]
	pub kubeconfig: Option<PathBuf>,

	/// Root of the output tree.
	#[serde(default)]
	pub output: Option<PathBuf>,

	/// Replace List documents by their items.
	#[serde(default)]
	pub expand_lists: Option<bool>,
}

impl SplitterConfig {
	/// Load the explicitly given file, or search from `start_dir` upward.
	///
	/// Finding no file is not an error; an explicitly given file must exist.
	pub fn load(explicit: Option<&Path>, start_dir: &Path) -> Result<Self> {
		if let Some(path) = explicit {
			return Self::load_from_file(path);
		}
		Ok(Self::load_from_directory(start_dir)?.unwrap_or_default())
	}

	/// Load config by searching from the given directory upward
	pub fn load_from_directory(start_dir: &Path) -> Result<Option<Self>> {
		find_config_file(start_dir)
			.map(|path| Self::load_from_file(&path))
			.transpose()
	}

	/// Load config from a specific file path.
	///
	/// Relative paths in the file are taken relative to the file's directory.
	pub fn load_from_file(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path)
			.with_context(|| format!("failed to read config file: {}", path.display()))?;
		let config: SplitterConfig = serde_yaml_with_quirks::from_str(&content)
			.with_context(|| format!("failed to parse config file: {}", path.display()))?;
		tracing::debug!(path = %path.display(), ?config, "loaded config file");

		let base = path.parent().unwrap_or_else(|| Path::new(""));
		Ok(config.relative_to(base))
	}

	fn relative_to(self, base: &Path) -> Self {
		let anchor = |p: PathBuf| {
			if p.as_os_str().is_empty() || p.is_absolute() {
				p
			} else {
				base.join(p)
			}
		};
		Self {
			kubeconfig: self.kubeconfig.map(anchor),
			output: self.output.map(anchor),
			expand_lists: self.expand_lists,
		}
	}
}

/// Search for a config file starting from `start_dir` and walking up to the filesystem root
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
	let start = start_dir
		.canonicalize()
		.unwrap_or_else(|_| start_dir.to_path_buf());

	start
		.ancestors()
		.map(|dir| dir.join(CONFIG_FILE_NAME))
		.find(|path| path.is_file())
}
