//! The split command.

use std::{
	convert::Infallible,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Args;
use k8s_manifest::{split_catalog, Catalog, DirectorySink, SplitOpts};
use tracing::{info, instrument, Level};

use crate::{
	config::SplitterConfig,
	k8s::{
		client::ClusterConnection,
		discovery::{to_kube_gvk, ApiResourceCache},
	},
};

#[derive(Debug, Clone, Default, Args)]
pub struct SplitArgs {
	/// Manifest files to split (YAML streams or JSON)
	#[arg(required = true)]
	pub inputs: Vec<PathBuf>,

	/// Path to the kubeconfig used to discover resource scopes. Inferred when unset or empty
	#[arg(long, value_parser = parse_path)]
	pub kubeconfig: Option<PathBuf>,

	/// Root of the output directory tree [default: config/]
	#[arg(long, short = 'o')]
	pub output: Option<PathBuf>,

	/// Write the items of List resources as separate files [default: true]
	#[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
	pub expand_lists: Option<bool>,

	/// Log level (trace, debug, info, warn, error). Falls back to RUST_LOG
	#[arg(long)]
	pub log_level: Option<Level>,

	/// Configuration file. Searched for as .manifest-splitter.yaml when unset
	#[arg(long)]
	pub config: Option<PathBuf>,
}

/// Like clap's path parser, but an empty value is kept rather than rejected.
fn parse_path(value: &str) -> Result<PathBuf, Infallible> {
	Ok(PathBuf::from(value))
}

/// Effective settings after merging flags over the config file.
#[derive(Debug, Clone)]
pub struct Settings {
	/// `None` means the cluster configuration is inferred.
	pub kubeconfig: Option<PathBuf>,
	pub opts: SplitOpts,
}

impl Settings {
	/// Flags win over the config file, which wins over the defaults.
	pub fn resolve(args: &SplitArgs, file: SplitterConfig) -> Self {
		let defaults = SplitOpts::default();
		let kubeconfig = args
			.kubeconfig
			.clone()
			.or(file.kubeconfig)
			.filter(|path| !path.as_os_str().is_empty());
		Self {
			kubeconfig,
			opts: SplitOpts {
				output_dir: args
					.output
					.clone()
					.or(file.output)
					.unwrap_or(defaults.output_dir),
				expand_lists: args
					.expand_lists
					.or(file.expand_lists)
					.unwrap_or(defaults.expand_lists),
			},
		}
	}

	/// Resolve against the config file given by `--config` or found from `start_dir`.
	pub fn load(args: &SplitArgs, start_dir: &Path) -> Result<Self> {
		let file = SplitterConfig::load(args.config.as_deref(), start_dir)?;
		Ok(Self::resolve(args, file))
	}
}

/// Run the split command.
pub fn run(args: SplitArgs) -> Result<Vec<PathBuf>> {
	let cwd = std::env::current_dir().context("determining working directory")?;
	let settings = Settings::load(&args, &cwd)?;

	let runtime = tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()
		.context("creating tokio runtime")?;

	runtime.block_on(run_async(&args.inputs, settings))
}

/// Read the inputs, discover their scopes from the cluster and write the tree.
#[instrument(skip_all, fields(inputs = inputs.len(), output = %settings.opts.output_dir.display()))]
pub async fn run_async(inputs: &[PathBuf], settings: Settings) -> Result<Vec<PathBuf>> {
	let mut catalog = Catalog::read_files(inputs, &settings.opts.decode_opts())?;

	let connection = ClusterConnection::connect(settings.kubeconfig.as_deref())
		.await
		.context("connecting to cluster")?;
	let cache = discover_scopes(&connection, &catalog).await?;

	let mut sink = DirectorySink::new(&settings.opts.output_dir);
	let written = split_catalog(&mut catalog, &cache, &mut sink)?;
	info!(files = written.len(), "split complete");
	Ok(written)
}

/// Discover the scope of every type the catalog mentions.
pub async fn discover_scopes(
	connection: &ClusterConnection,
	catalog: &Catalog,
) -> Result<ApiResourceCache> {
	let keys = catalog.kinds().iter().map(to_kube_gvk).collect();
	let cache = ApiResourceCache::build(connection.client(), keys)
		.await
		.with_context(|| {
			format!(
				"discovering resource types on {}",
				connection.cluster_identifier()
			)
		})?;
	tracing::debug!(types = cache.len(), "discovered resource types");
	Ok(cache)
}
