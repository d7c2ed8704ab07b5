//! HTTP-based mock Kubernetes server using wiremock.
//!
//! Only the endpoints a discovery client needs are served: `/version`, the
//! aggregated discovery documents and the legacy `/api`, `/apis` and
//! per-group-version resource lists. Everything else is a 404.

use bon::Builder;
use kube::config::{
	AuthInfo, Cluster, Context, Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext,
};
use serde_json::{json, Value};
use tracing::debug;
use wiremock::{
	matchers::{header_regex, method, path},
	Mock, MockServer, ResponseTemplate,
};

use super::discovery::{DiscoveryMode, MockApiResource, MockDiscovery};

/// Content type a client expects back from aggregated discovery.
const AGGREGATED_DISCOVERY_CONTENT_TYPE: &str =
	"application/json;g=apidiscovery.k8s.io;v=v2;as=APIGroupDiscoveryList";

/// A mock Kubernetes server exposed over HTTP.
#[derive(Builder)]
pub struct HttpMockK8sServer {
	#[builder(default)]
	discovery_mode: DiscoveryMode,
	/// Resource types served by discovery.
	#[builder(default)]
	discovery: MockDiscovery,
}

/// A running HTTP mock server instance.
pub struct RunningHttpMockK8sServer {
	server: MockServer,
}

impl HttpMockK8sServer {
	/// Start the mock server.
	pub async fn start(self) -> RunningHttpMockK8sServer {
		let server = MockServer::start().await;
		debug!(uri = %server.uri(), mode = ?self.discovery_mode, "Started mock K8s server");

		mount_version(&server).await;
		mount_discovery(&server, &self.discovery, self.discovery_mode).await;

		RunningHttpMockK8sServer { server }
	}
}

impl RunningHttpMockK8sServer {
	/// Get the server's URI (e.g., "http://127.0.0.1:12345").
	pub fn uri(&self) -> String {
		self.server.uri()
	}

	/// Paths of every request received so far, in arrival order.
	pub async fn request_paths(&self) -> Vec<String> {
		self.server
			.received_requests()
			.await
			.unwrap_or_default()
			.iter()
			.map(|req| req.url.path().to_string())
			.collect()
	}

	/// Create a Kubeconfig pointing to this mock server.
	pub fn kubeconfig(&self) -> Kubeconfig {
		self.kubeconfig_with_context("mock-context")
	}

	/// Create a Kubeconfig pointing to this mock server with a custom context name.
	pub fn kubeconfig_with_context(&self, context_name: &str) -> Kubeconfig {
		let cluster_name = "mock-cluster";
		let user_name = "mock-user";

		Kubeconfig {
			clusters: vec![NamedCluster {
				name: cluster_name.to_string(),
				cluster: Some(Cluster {
					server: Some(self.uri()),
					insecure_skip_tls_verify: Some(true),
					..Default::default()
				}),
			}],
			contexts: vec![NamedContext {
				name: context_name.to_string(),
				context: Some(Context {
					cluster: cluster_name.to_string(),
					user: Some(user_name.to_string()),
					namespace: Some("default".to_string()),
					..Default::default()
				}),
			}],
			auth_infos: vec![NamedAuthInfo {
				name: user_name.to_string(),
				auth_info: Some(AuthInfo::default()),
			}],
			current_context: Some(context_name.to_string()),
			..Default::default()
		}
	}
}

async fn mount_version(server: &MockServer) {
	Mock::given(method("GET"))
		.and(path("/version"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"major": "1",
			"minor": "31",
			"gitVersion": "v1.31.0",
			"gitCommit": "fake",
			"gitTreeState": "clean",
			"buildDate": "2024-08-13T00:00:00Z",
			"goVersion": "go1.22.5",
			"compiler": "gc",
			"platform": "linux/amd64"
		})))
		.mount(server)
		.await;
}

fn scope(resource: &MockApiResource) -> &'static str {
	if resource.namespaced {
		"Namespaced"
	} else {
		"Cluster"
	}
}

/// One entry of an APIGroupDiscovery's version.
fn aggregated_resource(group: &str, version: &str, resource: &MockApiResource) -> Value {
	json!({
		"resource": resource.name,
		"responseKind": {
			"group": group,
			"version": version,
			"kind": resource.kind
		},
		"scope": scope(resource),
		"verbs": resource.verbs,
	})
}

fn aggregated_group(group: &str, version: &str, resources: &[MockApiResource]) -> Value {
	let resources: Vec<_> = resources
		.iter()
		.map(|r| aggregated_resource(group, version, r))
		.collect();
	json!({
		"metadata": {
			"name": group
		},
		"versions": [{
			"version": version,
			"resources": resources,
			"freshness": "Current"
		}]
	})
}

/// One entry of a legacy APIResourceList.
fn legacy_resource(resource: &MockApiResource) -> Value {
	json!({
		"name": resource.name,
		"singularName": "",
		"namespaced": resource.namespaced,
		"kind": resource.kind,
		"verbs": resource.verbs,
	})
}

fn split_group_version(gv: &str) -> (&str, &str) {
	gv.split_once('/').unwrap_or(("", gv))
}

async fn mount_aggregated(server: &MockServer, discovery: &MockDiscovery) {
	let core_body = json!({
		"kind": "APIGroupDiscoveryList",
		"apiVersion": "apidiscovery.k8s.io/v2",
		"items": [aggregated_group("", "v1", &discovery.core_resources)]
	});

	let groups: Vec<_> = discovery
		.group_resources
		.iter()
		.map(|(gv, rs)| {
			let (group, version) = split_group_version(gv);
			aggregated_group(group, version, rs)
		})
		.collect();
	let apis_body = json!({
		"kind": "APIGroupDiscoveryList",
		"apiVersion": "apidiscovery.k8s.io/v2",
		"items": groups
	});

	// set_body_json would overwrite the content type
	for (endpoint, body) in [("/api", core_body), ("/apis", apis_body)] {
		let body =
			serde_json::to_vec(&body).expect("serializing discovery JSON should never fail");
		Mock::given(method("GET"))
			.and(path(endpoint))
			.and(header_regex("accept", "apidiscovery"))
			.respond_with(
				ResponseTemplate::new(200).set_body_raw(body, AGGREGATED_DISCOVERY_CONTENT_TYPE),
			)
			.mount(server)
			.await;
	}
}

async fn reject_aggregated(server: &MockServer) {
	for endpoint in ["/api", "/apis"] {
		Mock::given(method("GET"))
			.and(path(endpoint))
			.and(header_regex("accept", "apidiscovery"))
			.respond_with(ResponseTemplate::new(406))
			.mount(server)
			.await;
	}
}

async fn mount_discovery(server: &MockServer, discovery: &MockDiscovery, mode: DiscoveryMode) {
	// Aggregated mocks are mounted first so they take priority for requests
	// that ask for the aggregated format.
	match mode {
		DiscoveryMode::Aggregated => mount_aggregated(server, discovery).await,
		DiscoveryMode::Legacy => reject_aggregated(server).await,
	}

	Mock::given(method("GET"))
		.and(path("/api"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"kind": "APIVersions",
			"versions": ["v1"],
			"serverAddressByClientCIDRs": []
		})))
		.mount(server)
		.await;

	let groups: Vec<_> = discovery
		.group_resources
		.keys()
		.map(|gv| {
			let (group, version) = split_group_version(gv);
			json!({
				"name": group,
				"versions": [{"groupVersion": gv, "version": version}],
				"preferredVersion": {"groupVersion": gv, "version": version}
			})
		})
		.collect();

	Mock::given(method("GET"))
		.and(path("/apis"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"kind": "APIGroupList",
			"apiVersion": "v1",
			"groups": groups
		})))
		.mount(server)
		.await;

	let core_resources: Vec<_> = discovery.core_resources.iter().map(legacy_resource).collect();
	Mock::given(method("GET"))
		.and(path("/api/v1"))
		.respond_with(ResponseTemplate::new(200).set_body_json(json!({
			"kind": "APIResourceList",
			"apiVersion": "v1",
			"groupVersion": "v1",
			"resources": core_resources
		})))
		.mount(server)
		.await;

	for (gv, rs) in &discovery.group_resources {
		let resources: Vec<_> = rs.iter().map(legacy_resource).collect();
		Mock::given(method("GET"))
			.and(path(format!("/apis/{}", gv)))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"kind": "APIResourceList",
				"apiVersion": "v1",
				"groupVersion": gv,
				"resources": resources
			})))
			.mount(server)
			.await;
	}
}
