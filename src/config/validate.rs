//! Structural validation of configuration documents.

// crates.io
use serde_json::Map;
// self
use crate::_prelude::*;

/// Fields every document must carry as non-empty strings, checked in this order.
pub const REQUIRED_FIELDS: [&str; 6] =
	["hostname", "issuer", "clientId", "authorizationEndpoint", "tokenEndpoint", "redirectUri"];

/// Why a configuration document was rejected.
#[derive(Debug, ThisError)]
pub enum ValidationError {
	/// The document is not a JSON object.
	#[error("Configuration document must be a JSON object.")]
	NotAnObject,
	/// A required field is absent, not a string, or blank.
	#[error("Missing or invalid field: {field}.")]
	MissingField {
		/// Offending field name.
		field: &'static str,
	},
	/// An optional field carries the wrong JSON type.
	#[error("Field {field} must be {expected}.")]
	InvalidType {
		/// Offending field name.
		field: &'static str,
		/// Expected JSON type.
		expected: &'static str,
	},
	/// The text was not JSON.
	#[error("Configuration document is not valid JSON.")]
	Syntax {
		/// Parser failure.
		#[source]
		source: serde_json::Error,
	},
	/// The document passed the structural checks but could not be decoded.
	#[error("Configuration document could not be decoded at {}.", .source.path())]
	Decode {
		/// Decoder failure with the path of the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}

/// Checks the structure of a raw configuration document.
///
/// The first failing check wins: required fields in [`REQUIRED_FIELDS`] order, then the
/// `scopes` object, then `usePkce`, then `clientSecret`. A `null` scopes object or scope entry is
/// treated as absent.
pub fn validate(document: &JsonValue) -> Result<(), ValidationError> {
	let object = document.as_object().ok_or(ValidationError::NotAnObject)?;

	for field in REQUIRED_FIELDS {
		require_string(object, field)?;
	}

	match object.get("scopes") {
		None | Some(JsonValue::Null) => {},
		Some(JsonValue::Object(scopes)) => {
			optional_string(scopes, "imap", "scopes.imap")?;
			optional_string(scopes, "smtp", "scopes.smtp")?;
		},
		Some(_) => return Err(ValidationError::InvalidType { field: "scopes", expected: "an object" }),
	}
	match object.get("usePkce") {
		None | Some(JsonValue::Bool(_)) => {},
		Some(_) => return Err(ValidationError::InvalidType { field: "usePkce", expected: "a boolean" }),
	}

	optional_string(object, "clientSecret", "clientSecret")
}

fn require_string(object: &Map<String, JsonValue>, field: &'static str) -> Result<(), ValidationError> {
	match object.get(field) {
		Some(JsonValue::String(value)) if !value.trim().is_empty() => Ok(()),
		_ => Err(ValidationError::MissingField { field }),
	}
}

fn optional_string(
	object: &Map<String, JsonValue>,
	key: &str,
	field: &'static str,
) -> Result<(), ValidationError> {
	match object.get(key) {
		None | Some(JsonValue::Null) | Some(JsonValue::String(_)) => Ok(()),
		Some(_) => Err(ValidationError::InvalidType { field, expected: "a string" }),
	}
}
