//! Split Kubernetes manifests into a namespace-partitioned directory tree.
//!
//! Input files hold YAML streams or single JSON values. Each resource found in
//! them (List documents optionally expanded into their items) is checked
//! against its namespace scope, as reported by a [`NamespaceScopeOracle`], and
//! written to `namespaces/<ns>/`, `cluster/` or `system/` below the output
//! directory.
//!
//! The phases can be run one at a time:
//!
//! ```no_run
//! use k8s_manifest::{classify, resolve_scopes, validate, write_placements};
//! use k8s_manifest::{Catalog, DecodeOpts, DirectorySink, ScopeTable};
//!
//! # fn main() -> k8s_manifest::Result<()> {
//! let mut catalog = Catalog::read_files(&["all.yaml"], &DecodeOpts::default())?;
//! resolve_scopes(&mut catalog, &ScopeTable::builtin())?;
//! validate(&mut catalog)?;
//! let placements = classify(&catalog);
//! write_placements(&placements, &mut DirectorySink::new("config/"))?;
//! # Ok(())
//! # }
//! ```
//!
//! or all at once with [`split`].

pub mod catalog;
pub mod classify;
pub mod decode;
pub mod document;
pub mod encode;
pub mod error;
pub mod gvk;
pub mod pipeline;
pub mod resource;
pub mod scope;
pub mod validate;
pub mod write;

pub use catalog::Catalog;
pub use classify::{classify, Bucket, Placement};
pub use decode::{DecodeError, DecodeOpts, Format};
pub use document::Document;
pub use error::{Error, Result};
pub use gvk::{GroupKind, GroupVersionKind};
pub use pipeline::{split, split_catalog, write_placements, SplitOpts};
pub use resource::{Origin, Resource};
pub use scope::{resolve_scopes, DiscoveryError, NamespaceScopeOracle, ScopeTable};
pub use validate::{validate, ValidationError};
pub use write::{DirectorySink, ManifestSink, MemorySink};
