//! Mock Kubernetes API server for testing.
//!
//! Serves version and discovery endpoints over HTTP, so it can be reached
//! through an ordinary kubeconfig.

pub mod discovery;
pub mod http;

pub use discovery::{DiscoveryMode, MockApiResource, MockDiscovery};
pub use http::{HttpMockK8sServer, RunningHttpMockK8sServer};
