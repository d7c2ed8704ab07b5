//! Kubernetes cluster connection management.

use std::{path::Path, time::Duration};

use k8s_openapi::apimachinery::pkg::version::Info;
use kube::{
	config::{InferConfigError, KubeConfigOptions, Kubeconfig, KubeconfigError},
	Client, Config,
};
use thiserror::Error;
use tracing::instrument;

/// Default timeout for Kubernetes API requests.
const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur when connecting to a Kubernetes cluster.
#[derive(Debug, Error)]
pub enum ConnectionError {
	#[error("failed to load kubeconfig from {path:?}")]
	ReadKubeconfig {
		path: std::path::PathBuf,
		#[source]
		source: KubeconfigError,
	},

	#[error("no cluster configuration could be inferred; pass --kubeconfig")]
	Infer(#[from] InferConfigError),

	#[error(transparent)]
	Kubeconfig(#[from] KubeconfigError),

	#[error(transparent)]
	Kube(#[from] kube::Error),
}

/// Represents a connection to a Kubernetes cluster.
#[derive(Clone)]
pub struct ClusterConnection {
	client: Client,
	server_version: Info,
	/// Human-readable identifier for the cluster (context name or API server URL).
	cluster_identifier: String,
}

impl std::fmt::Debug for ClusterConnection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClusterConnection")
			.field("cluster_identifier", &self.cluster_identifier)
			.field("server_version", &self.server_version)
			.finish_non_exhaustive()
	}
}

impl ClusterConnection {
	/// Connect using the kubeconfig at `path`, or the inferred configuration
	/// (`$KUBECONFIG`, `~/.kube/config`, then in-cluster) when none is given.
	#[instrument(skip_all, fields(kubeconfig = ?path))]
	pub async fn connect(path: Option<&Path>) -> Result<Self, ConnectionError> {
		match path {
			Some(path) => {
				let kubeconfig =
					Kubeconfig::read_from(path).map_err(|source| ConnectionError::ReadKubeconfig {
						path: path.to_path_buf(),
						source,
					})?;
				Self::from_kubeconfig(kubeconfig).await
			}
			None => {
				let config = Config::infer().await?;
				let identifier = config.cluster_url.to_string();
				Self::from_config(config, identifier).await
			}
		}
	}

	/// Connect using the current context of a provided kubeconfig.
	#[instrument(skip_all)]
	pub async fn from_kubeconfig(kubeconfig: Kubeconfig) -> Result<Self, ConnectionError> {
		let context = kubeconfig.current_context.clone();
		let config =
			Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
		let identifier = match context {
			Some(context) => format!("{}  (context:{})", config.cluster_url, context),
			None => config.cluster_url.to_string(),
		};
		Self::from_config(config, identifier).await
	}

	async fn from_config(
		mut config: Config,
		cluster_identifier: String,
	) -> Result<Self, ConnectionError> {
		config.read_timeout = Some(DEFAULT_API_TIMEOUT);
		let client = Client::try_from(config)?;

		let server_version = client.apiserver_version().await?;
		tracing::info!(
			cluster = %cluster_identifier,
			version = %server_version.git_version,
			"connected to cluster"
		);

		Ok(Self {
			client,
			server_version,
			cluster_identifier,
		})
	}

	/// Get a reference to the underlying kube client.
	pub fn client(&self) -> &Client {
		&self.client
	}

	/// Get the server version.
	pub fn server_version(&self) -> &Info {
		&self.server_version
	}

	/// Get the cluster identifier (context name or API server URL).
	pub fn cluster_identifier(&self) -> &str {
		&self.cluster_identifier
	}
}
