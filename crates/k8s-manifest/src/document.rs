//! Parsed manifest documents.
//!
//! A [`Document`] is an ordered JSON tree with accessors for the handful of
//! fields the splitting pipeline reads. Everything else is carried through
//! untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::gvk::GroupVersionKind;

/// The structural form of one manifest document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(JsonValue);

impl Document {
	pub fn new(value: JsonValue) -> Self {
		Self(value)
	}

	pub fn value(&self) -> &JsonValue {
		&self.0
	}

	pub fn into_value(self) -> JsonValue {
		self.0
	}

	fn str_field(&self, key: &str) -> &str {
		self.0.get(key).and_then(JsonValue::as_str).unwrap_or("")
	}

	fn metadata_field(&self, key: &str) -> &str {
		self.0
			.get("metadata")
			.and_then(|m| m.get(key))
			.and_then(JsonValue::as_str)
			.unwrap_or("")
	}

	pub fn api_version(&self) -> &str {
		self.str_field("apiVersion")
	}

	pub fn kind(&self) -> &str {
		self.str_field("kind")
	}

	pub fn name(&self) -> &str {
		self.metadata_field("name")
	}

	pub fn namespace(&self) -> &str {
		self.metadata_field("namespace")
	}

	/// Set `metadata.namespace`, removing the field when `namespace` is empty.
	pub fn set_namespace(&mut self, namespace: &str) {
		let JsonValue::Object(root) = &mut self.0 else {
			return;
		};
		if namespace.is_empty() {
			if let Some(JsonValue::Object(metadata)) = root.get_mut("metadata") {
				metadata.remove("namespace");
			}
			return;
		}
		let metadata = root
			.entry("metadata")
			.or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
		if !metadata.is_object() {
			*metadata = JsonValue::Object(serde_json::Map::new());
		}
		if let JsonValue::Object(metadata) = metadata {
			metadata.insert(
				"namespace".to_string(),
				JsonValue::String(namespace.to_string()),
			);
		}
	}

	/// Both `apiVersion` and `kind` are set; anything else is not a resource.
	pub fn is_resource(&self) -> bool {
		!self.api_version().is_empty() && !self.kind().is_empty()
	}

	pub fn gvk(&self) -> GroupVersionKind {
		GroupVersionKind::from_api_version(self.api_version(), self.kind())
	}

	/// Copies of the items of a List, leaving out items without apiVersion or
	/// kind.
	pub fn item_documents(&self) -> Vec<Document> {
		self.items()
			.map(|items| {
				items
					.iter()
					.cloned()
					.map(Document::new)
					.filter(Document::is_resource)
					.collect()
			})
			.unwrap_or_default()
	}

	/// A document is a List when it carries an `items` sequence.
	pub fn is_list(&self) -> bool {
		self.items().is_some()
	}

	pub fn items(&self) -> Option<&Vec<JsonValue>> {
		self.0.get("items").and_then(JsonValue::as_array)
	}

	pub(crate) fn items_mut(&mut self) -> Option<&mut Vec<JsonValue>> {
		self.0.get_mut("items").and_then(JsonValue::as_array_mut)
	}

	/// Human-readable `Kind/name` (or `Kind/namespace/name`) for messages.
	pub fn describe(&self) -> String {
		if self.namespace().is_empty() {
			format!("{}/{}", self.kind(), self.name())
		} else {
			format!("{}/{}/{}", self.kind(), self.namespace(), self.name())
		}
	}
}

impl From<JsonValue> for Document {
	fn from(value: JsonValue) -> Self {
		Self(value)
	}
}
