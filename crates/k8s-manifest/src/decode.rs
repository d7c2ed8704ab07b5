//! Decoding of manifest files into resources.
//!
//! A file is sniffed once to decide between a single JSON value and a YAML
//! multi-document stream. YAML streams are split on `---` separator lines
//! before parsing so that every document keeps its original bytes, which are
//! what ends up on disk.

use std::{fmt, path::Path};

use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::{
	document::Document,
	encode::encode,
	error::{Error, Result},
	resource::{Origin, Resource},
};

/// How many leading bytes are inspected when guessing the stream format.
pub const SNIFF_LEN: usize = 4096;

const SEPARATOR: &[u8] = b"---";

/// Serialization format of an input file, and of everything written from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
	Yaml,
	Json,
}

impl Format {
	/// Guess the format from the first [`SNIFF_LEN`] bytes: a stream whose first
	/// non-whitespace byte opens a JSON object is JSON, anything else is YAML.
	pub fn sniff(data: &[u8]) -> Self {
		let prefix = &data[..data.len().min(SNIFF_LEN)];
		match prefix.iter().find(|b| !b.is_ascii_whitespace()) {
			Some(b'{') => Self::Json,
			_ => Self::Yaml,
		}
	}

	/// File extension used for output files.
	pub fn extension(self) -> &'static str {
		match self {
			Self::Yaml => "yaml",
			Self::Json => "json",
		}
	}
}

impl fmt::Display for Format {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.extension())
	}
}

#[derive(Debug, Error)]
pub enum DecodeError {
	#[error("invalid document separator on line {line}: {text:?}")]
	Separator { line: usize, text: String },

	#[error("failed to parse YAML document starting on line {line}")]
	Yaml {
		line: usize,
		#[source]
		source: serde_yaml_with_quirks::Error,
	},

	#[error("failed to parse JSON document")]
	Json(#[source] serde_json::Error),

	#[error("item {index} of a list document is not an object")]
	ListItem { index: usize },
}

/// Options controlling how documents become resources.
#[derive(Debug, Clone)]
pub struct DecodeOpts {
	/// Replace List documents by one resource per item.
	pub expand_lists: bool,
}

impl Default for DecodeOpts {
	fn default() -> Self {
		Self { expand_lists: true }
	}
}

/// One chunk of a YAML stream, between separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDocument<'a> {
	pub bytes: &'a [u8],
	/// 1-based line the chunk starts on.
	pub line: usize,
}

/// Iterator over the documents of a YAML stream.
///
/// A separator is a line starting with `---`, optionally followed by
/// whitespace or a comment. Separator lines are not part of any document and
/// empty chunks are not yielded.
pub struct YamlDocuments<'a> {
	data: &'a [u8],
	pos: usize,
	line: usize,
}

impl<'a> YamlDocuments<'a> {
	pub fn new(data: &'a [u8]) -> Self {
		Self {
			data,
			pos: 0,
			line: 0,
		}
	}
}

impl<'a> Iterator for YamlDocuments<'a> {
	type Item = Result<RawDocument<'a>, DecodeError>;

	fn next(&mut self) -> Option<Self::Item> {
		let mut start = self.pos;
		let mut start_line = self.line;

		while self.pos < self.data.len() {
			let line_start = self.pos;
			let line_end = self.data[line_start..]
				.iter()
				.position(|b| *b == b'\n')
				.map_or(self.data.len(), |i| line_start + i + 1);
			let line = &self.data[line_start..line_end];
			self.pos = line_end;
			self.line += 1;

			let Some(rest) = line.strip_prefix(SEPARATOR) else {
				continue;
			};
			if let Some(first) = rest.iter().find(|b| !b.is_ascii_whitespace()) {
				if *first != b'#' {
					self.pos = self.data.len();
					return Some(Err(DecodeError::Separator {
						line: self.line,
						text: String::from_utf8_lossy(line).trim_end().to_string(),
					}));
				}
			}
			if line_start > start {
				return Some(Ok(RawDocument {
					bytes: &self.data[start..line_start],
					line: start_line + 1,
				}));
			}
			start = self.pos;
			start_line = self.line;
		}

		(self.pos > start).then(|| {
			Ok(RawDocument {
				bytes: &self.data[start..],
				line: start_line + 1,
			})
		})
	}
}

/// Parse one YAML chunk. Chunks holding only comments or whitespace have no
/// document and yield `None`.
fn parse_yaml(doc: RawDocument<'_>) -> Result<Option<JsonValue>, DecodeError> {
	let mut documents = serde_yaml_with_quirks::Deserializer::from_reader(doc.bytes);
	let Some(document) = documents.next() else {
		return Ok(None);
	};
	JsonValue::deserialize(document)
		.map(Some)
		.map_err(|source| DecodeError::Yaml {
			line: doc.line,
			source,
		})
}

/// Split a stream into `(raw bytes, parsed value)` pairs.
fn decode_documents(data: &[u8], format: Format) -> Result<Vec<(&[u8], JsonValue)>, DecodeError> {
	match format {
		Format::Json => {
			if data.is_empty() {
				return Ok(Vec::new());
			}
			let value = serde_json::from_slice(data).map_err(DecodeError::Json)?;
			Ok(vec![(data, value)])
		}
		Format::Yaml => {
			let mut documents = Vec::new();
			for doc in YamlDocuments::new(data) {
				let doc = doc?;
				if let Some(value) = parse_yaml(doc)? {
					documents.push((doc.bytes, value));
				}
			}
			Ok(documents)
		}
	}
}

/// Decode the contents of one input file into resources.
///
/// Documents without `apiVersion` or `kind` are dropped. Indices are assigned
/// after list expansion, so list items and plain documents share one counter.
#[instrument(skip_all, fields(path = %path.display(), len = data.len()))]
pub fn decode_manifest(path: &Path, data: &[u8], opts: &DecodeOpts) -> Result<Vec<Resource>> {
	let format = Format::sniff(data);
	trace!(%format, "detected stream format");

	let documents = decode_documents(data, format).map_err(|source| Error::Decode {
		path: path.to_path_buf(),
		source,
	})?;

	let mut resources = Vec::new();
	for (raw, value) in documents {
		let document = Document::new(value);
		if !document.is_resource() {
			trace!("skipping document without apiVersion or kind");
			continue;
		}

		if opts.expand_lists && document.is_list() {
			expand_list(path, format, document, &mut resources)?;
			continue;
		}

		let index = resources.len();
		resources.push(Resource::new(
			path,
			index,
			raw.to_vec(),
			format,
			Origin::Document,
			document,
		));
	}

	Ok(resources)
}

/// Append one resource per list item, each re-encoded on its own.
fn expand_list(
	path: &Path,
	format: Format,
	mut list: Document,
	resources: &mut Vec<Resource>,
) -> Result<()> {
	let items = list.items_mut().map(std::mem::take).unwrap_or_default();
	debug!(kind = list.kind(), items = items.len(), "expanding list");

	for (position, item) in items.into_iter().enumerate() {
		if !item.is_object() {
			return Err(Error::Decode {
				path: path.to_path_buf(),
				source: DecodeError::ListItem { index: position },
			});
		}
		let item = Document::new(item);
		if !item.is_resource() {
			trace!(position, "skipping list item without apiVersion or kind");
			continue;
		}
		let raw = encode(item.value(), format).map_err(|source| Error::Encode {
			path: path.to_path_buf(),
			index: position,
			source,
		})?;
		let index = resources.len();
		resources.push(Resource::new(
			path,
			index,
			raw,
			format,
			Origin::ListItem,
			item,
		));
	}
	Ok(())
}
