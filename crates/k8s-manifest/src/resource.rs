//! The catalog entry for a single decoded resource.

use std::path::{Path, PathBuf};

use crate::{decode::Format, document::Document};

/// Where a resource came from within its input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
	/// A document exactly as written in the input file.
	Document,
	/// An item produced by expanding a List document.
	ListItem,
}

/// A decoded resource together with everything the later phases attach to it.
///
/// Fields are written by the decoder at construction, then only by the scope
/// resolver (`namespaced`, `item_namespaced`) and the validator (`document`
/// namespace, `list_namespace`). The classifier and writer see it read-only.
#[derive(Debug, Clone)]
pub struct Resource {
	source: PathBuf,
	index: usize,
	raw: Vec<u8>,
	format: Format,
	origin: Origin,
	document: Document,
	namespaced: Option<bool>,
	item_namespaced: Vec<bool>,
	list_namespace: Option<String>,
}

impl Resource {
	pub(crate) fn new(
		source: &Path,
		index: usize,
		raw: Vec<u8>,
		format: Format,
		origin: Origin,
		document: Document,
	) -> Self {
		Self {
			source: source.to_path_buf(),
			index,
			raw,
			format,
			origin,
			document,
			namespaced: None,
			item_namespaced: Vec::new(),
			list_namespace: None,
		}
	}

	/// Input file this resource was decoded from.
	pub fn source(&self) -> &Path {
		&self.source
	}

	/// Position among the resources decoded from the same file.
	pub fn index(&self) -> usize {
		self.index
	}

	/// Bytes written to the output file.
	pub fn raw(&self) -> &[u8] {
		&self.raw
	}

	pub fn format(&self) -> Format {
		self.format
	}

	pub fn origin(&self) -> Origin {
		self.origin
	}

	pub fn document(&self) -> &Document {
		&self.document
	}

	pub(crate) fn document_mut(&mut self) -> &mut Document {
		&mut self.document
	}

	/// Unexpanded List documents keep their items inline.
	pub fn is_list(&self) -> bool {
		self.document.is_list()
	}

	/// Whether the resource type is namespaced; `None` until scopes are resolved.
	pub fn namespaced(&self) -> Option<bool> {
		self.namespaced
	}

	/// Per-item scopes of an unexpanded List, in item order.
	pub fn item_namespaced(&self) -> &[bool] {
		&self.item_namespaced
	}

	pub(crate) fn set_namespaced(&mut self, namespaced: bool) {
		self.namespaced = Some(namespaced);
	}

	pub(crate) fn set_item_namespaced(&mut self, scopes: Vec<bool>) {
		self.namespaced = Some(scopes.iter().any(|n| *n));
		self.item_namespaced = scopes;
	}

	/// The namespace shared by all items of a List; `None` until validated.
	pub fn list_namespace(&self) -> Option<&str> {
		self.list_namespace.as_deref()
	}

	pub(crate) fn set_list_namespace(&mut self, namespace: String) {
		self.list_namespace = Some(namespace);
	}
}

impl std::fmt::Display for Resource {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"{} ({}#{})",
			self.document.describe(),
			self.source.display(),
			self.index
		)
	}
}
