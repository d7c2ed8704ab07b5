//! Errors surfaced by the splitting pipeline.
//!
//! Every error is fatal to the run. Each phase has its own error type; [`Error`]
//! wraps them together with the file they were found in.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::{decode::DecodeError, encode::EncodeError, scope::DiscoveryError, validate::ValidationError};

#[derive(Debug, Error)]
pub enum Error {
	#[error("failed to read input file {path:?}")]
	Read {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("failed to decode input file {path:?}")]
	Decode {
		path: PathBuf,
		#[source]
		source: DecodeError,
	},

	#[error("failed to encode item {index} of a list in input file {path:?}")]
	Encode {
		path: PathBuf,
		index: usize,
		#[source]
		source: EncodeError,
	},

	#[error("discovering resource scope in input file {path:?}")]
	Discovery {
		path: PathBuf,
		#[source]
		source: DiscoveryError,
	},

	#[error("validating input files")]
	Validation(#[from] ValidationError),

	#[error("failed to write output file {path:?}")]
	Write {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
