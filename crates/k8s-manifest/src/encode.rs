//! Re-encoding of expanded list items.

use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::decode::Format;

#[derive(Debug, Error)]
pub enum EncodeError {
	#[error("failed to serialize YAML")]
	Yaml(#[source] serde_saphyr::ser_error::Error),

	#[error("failed to serialize JSON")]
	Json(#[source] serde_json::Error),
}

/// Sort object keys recursively so re-encoded output does not depend on the
/// key order of the input.
fn sort_keys(value: &JsonValue) -> JsonValue {
	match value {
		JsonValue::Object(map) => {
			let mut entries: Vec<(&String, &JsonValue)> = map.iter().collect();
			entries.sort_by(|(a, _), (b, _)| a.cmp(b));
			JsonValue::Object(
				entries
					.into_iter()
					.map(|(k, v)| (k.clone(), sort_keys(v)))
					.collect(),
			)
		}
		JsonValue::Array(items) => JsonValue::Array(items.iter().map(sort_keys).collect()),
		other => other.clone(),
	}
}

/// Serialize a value as a block-style YAML document.
pub fn to_yaml(value: &JsonValue) -> Result<String, EncodeError> {
	let options = serde_saphyr::SerializerOptions {
		indent_step: 2,
		indent_array: Some(0),
		empty_map_as_braces: true,
		empty_array_as_brackets: true,
		quote_ambiguous_keys: true,
		quote_numeric_strings: true,
		..Default::default()
	};

	let mut output = String::new();
	serde_saphyr::to_fmt_writer_with_options(&mut output, &sort_keys(value), options)
		.map_err(EncodeError::Yaml)?;
	Ok(output)
}

/// Serialize a value as compact JSON.
pub fn to_json(value: &JsonValue) -> Result<Vec<u8>, EncodeError> {
	serde_json::to_vec(&sort_keys(value)).map_err(EncodeError::Json)
}

pub fn encode(value: &JsonValue, format: Format) -> Result<Vec<u8>, EncodeError> {
	match format {
		Format::Yaml => to_yaml(value).map(String::into_bytes),
		Format::Json => to_json(value),
	}
}
