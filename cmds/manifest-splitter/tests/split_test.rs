//! End-to-end tests of the split command against a mock Kubernetes API server.

use std::{
	collections::BTreeMap,
	fs,
	path::{Path, PathBuf},
};

use indoc::indoc;
use k8s_manifest::SplitOpts;
use k8s_mock::{DiscoveryMode, HttpMockK8sServer, RunningHttpMockK8sServer};
use manifest_splitter::split::{run_async, Settings};
use rstest::rstest;
use tempfile::TempDir;

const A_YAML: &str = indoc! {"
	apiVersion: v1
	kind: ConfigMap
	metadata:
	  name: cfg
	  namespace: ns1
	data:
	  key: value
	---
	apiVersion: rbac.authorization.k8s.io/v1
	kind: ClusterRole
	metadata:
	  name: cr
	rules: []
"};

const B_JSON: &str = r#"{
	"apiVersion": "v1",
	"kind": "List",
	"items": [
		{"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": "one", "namespace": "ns2"}},
		{"apiVersion": "v1", "kind": "Secret", "metadata": {"name": "two", "namespace": "ns2"}},
		{"apiVersion": "apps/v1", "kind": "Deployment", "metadata": {"name": "three", "namespace": "ns2"}}
	]
}"#;

/// Workspace with input files, a kubeconfig for the mock server and an output dir.
struct Fixture {
	dir: TempDir,
	kubeconfig: PathBuf,
}

impl Fixture {
	fn new(server: &RunningHttpMockK8sServer) -> Self {
		let dir = TempDir::new().unwrap();
		let kubeconfig = dir.path().join("kubeconfig");
		// JSON is valid YAML
		fs::write(&kubeconfig, serde_json::to_string(&server.kubeconfig()).unwrap()).unwrap();
		Self { dir, kubeconfig }
	}

	fn input(&self, name: &str, content: &str) -> PathBuf {
		let path = self.dir.path().join("in").join(name);
		fs::create_dir_all(path.parent().unwrap()).unwrap();
		fs::write(&path, content).unwrap();
		path
	}

	fn output(&self) -> PathBuf {
		self.dir.path().join("out")
	}

	fn settings(&self, expand_lists: bool) -> Settings {
		Settings {
			kubeconfig: Some(self.kubeconfig.clone()),
			opts: SplitOpts {
				output_dir: self.output(),
				expand_lists,
			},
		}
	}

	async fn split(&self, inputs: &[PathBuf], expand_lists: bool) -> anyhow::Result<Vec<PathBuf>> {
		run_async(inputs, self.settings(expand_lists)).await
	}
}

async fn start(mode: DiscoveryMode) -> RunningHttpMockK8sServer {
	HttpMockK8sServer::builder()
		.discovery_mode(mode)
		.build()
		.start()
		.await
}

/// All files below `dir`, keyed by relative path.
fn read_tree(dir: &Path) -> BTreeMap<String, String> {
	let mut files = BTreeMap::new();
	for entry in walkdir::WalkDir::new(dir) {
		let entry = entry.unwrap();
		if entry.file_type().is_file() {
			let rel_path = entry
				.path()
				.strip_prefix(dir)
				.unwrap()
				.to_string_lossy()
				.to_string();
			let content = fs::read_to_string(entry.path()).unwrap();
			files.insert(rel_path, content);
		}
	}
	files
}

fn check_files(dir: &Path, expected: &[&str]) {
	let actual: Vec<_> = read_tree(dir).into_keys().collect();
	assert_eq!(actual, expected, "unexpected files in {}", dir.display());
}

#[rstest]
#[case::aggregated(DiscoveryMode::Aggregated)]
#[case::legacy(DiscoveryMode::Legacy)]
#[tokio::test]
async fn test_split_documents(#[case] mode: DiscoveryMode) {
	let server = start(mode).await;
	let fixture = Fixture::new(&server);
	let input = fixture.input("a.yaml", A_YAML);

	let written = fixture.split(&[input], true).await.unwrap();
	assert_eq!(written.len(), 2);

	check_files(
		&fixture.output(),
		&["cluster/ClusterRole-cr.yaml", "namespaces/ns1/ConfigMap-cfg.yaml"],
	);
	let tree = read_tree(&fixture.output());
	assert_eq!(
		tree["namespaces/ns1/ConfigMap-cfg.yaml"],
		indoc! {"
			apiVersion: v1
			kind: ConfigMap
			metadata:
			  name: cfg
			  namespace: ns1
			data:
			  key: value
		"}
	);
}

#[rstest]
#[case::aggregated(DiscoveryMode::Aggregated)]
#[case::legacy(DiscoveryMode::Legacy)]
#[tokio::test]
async fn test_split_expands_lists(#[case] mode: DiscoveryMode) {
	let server = start(mode).await;
	let fixture = Fixture::new(&server);
	let input = fixture.input("b.json", B_JSON);

	fixture.split(&[input], true).await.unwrap();

	check_files(
		&fixture.output(),
		&[
			"namespaces/ns2/ConfigMap-0-b.json",
			"namespaces/ns2/Deployment-2-b.json",
			"namespaces/ns2/Secret-1-b.json",
		],
	);
	let tree = read_tree(&fixture.output());
	let secret: serde_json::Value =
		serde_json::from_str(&tree["namespaces/ns2/Secret-1-b.json"]).unwrap();
	assert_eq!(secret["metadata"]["name"], "two");
}

#[tokio::test]
async fn test_split_keeps_lists_together() {
	let server = start(DiscoveryMode::Aggregated).await;
	let fixture = Fixture::new(&server);
	let input = fixture.input("b.json", B_JSON);

	fixture.split(&[input], false).await.unwrap();

	check_files(&fixture.output(), &["namespaces/ns2/List-0-b.json"]);
	assert_eq!(
		read_tree(&fixture.output())["namespaces/ns2/List-0-b.json"],
		B_JSON
	);
}

#[tokio::test]
async fn test_split_namespace_and_system_resources() {
	let server = start(DiscoveryMode::Aggregated).await;
	let fixture = Fixture::new(&server);
	let input = fixture.input(
		"setup.yaml",
		indoc! {"
			apiVersion: v1
			kind: Namespace
			metadata:
			  name: team-a
			---
			apiVersion: configmanagement.gke.io/v1
			kind: Repo
			metadata:
			  name: repo
			---
			apiVersion: v1
			kind: ServiceAccount
			metadata:
			  name: builder
			  namespace: team-a
		"},
	);

	fixture.split(&[input], true).await.unwrap();

	check_files(
		&fixture.output(),
		&[
			"namespaces/team-a/ServiceAccount-builder.yaml",
			"namespaces/team-a/namespace.yaml",
			"system/Repo-repo.yaml",
		],
	);
}

#[tokio::test]
async fn test_split_is_additive() {
	let server = start(DiscoveryMode::Aggregated).await;
	let fixture = Fixture::new(&server);
	let stale = fixture.output().join("cluster/ClusterRole-old.yaml");
	fs::create_dir_all(stale.parent().unwrap()).unwrap();
	fs::write(&stale, "kind: ClusterRole\n").unwrap();
	let input = fixture.input("a.yaml", A_YAML);

	fixture.split(&[input], true).await.unwrap();

	check_files(
		&fixture.output(),
		&[
			"cluster/ClusterRole-cr.yaml",
			"cluster/ClusterRole-old.yaml",
			"namespaces/ns1/ConfigMap-cfg.yaml",
		],
	);
}

#[tokio::test]
async fn test_split_rejects_duplicates_across_files() {
	let server = start(DiscoveryMode::Aggregated).await;
	let fixture = Fixture::new(&server);
	let deployment = indoc! {"
		apiVersion: apps/v1
		kind: Deployment
		metadata:
		  name: foo
		  namespace: ns1
	"};
	let one = fixture.input("one.yaml", deployment);
	let two = fixture.input("two.yaml", deployment);

	let err = fixture.split(&[one, two], true).await.unwrap_err();
	let message = format!("{err:#}");
	assert!(message.contains("duplicate resource ns1/foo"), "{message}");
	assert!(message.contains("two.yaml"), "{message}");
	assert!(!fixture.output().exists());
}

#[tokio::test]
async fn test_split_unknown_kind_fails() {
	let server = start(DiscoveryMode::Aggregated).await;
	let fixture = Fixture::new(&server);
	let input = fixture.input(
		"widget.yaml",
		"apiVersion: example.com/v1\nkind: Widget\nmetadata:\n  name: w\n",
	);

	let err = fixture.split(&[input], true).await.unwrap_err();
	let message = format!("{err:#}");
	assert!(message.contains("widget.yaml"), "{message}");
	assert!(message.contains("example.com/v1/Widget"), "{message}");
}

#[tokio::test]
async fn test_split_missing_namespace_fails() {
	let server = start(DiscoveryMode::Aggregated).await;
	let fixture = Fixture::new(&server);
	let input = fixture.input(
		"cm.yaml",
		"apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\n",
	);

	let err = fixture.split(&[input], true).await.unwrap_err();
	let message = format!("{err:#}");
	assert!(message.contains("missing the metadata.namespace field"), "{message}");
}
