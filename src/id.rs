//! Normalized identifiers shared by the secret backends and the registry adapter.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $normalize:path, $validate:path) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Normalizes and validates a new identifier.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let normalized = $normalize(value.as_ref());

				$validate($kind, &normalized)?;

				Ok(Self(normalized))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				Self::new(value)
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 255;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty or whitespace.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (issuer, client, hostname).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (issuer, client, hostname).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (issuer, client, hostname).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! {
	Issuer,
	"Issuer name, trimmed and lowercased. Any non-empty text is accepted.",
	"Issuer",
	fold_case,
	require_non_empty
}
def_id! {
	ClientId,
	"OAuth client identifier, trimmed but case-preserving. Any non-empty text is accepted.",
	"Client",
	trim,
	require_non_empty
}
def_id! {
	Hostname,
	"Mail server hostname, trimmed and lowercased; a single whitespace-free token.",
	"Hostname",
	fold_case,
	require_hostname
}

/// Trims surrounding whitespace and lowercases the remainder.
///
/// Both sides of every issuer or hostname comparison go through this function.
pub fn fold_case(value: &str) -> String {
	value.trim().to_lowercase()
}

fn trim(value: &str) -> String {
	value.trim().to_owned()
}

fn require_non_empty(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() { Err(IdentifierError::Empty { kind }) } else { Ok(()) }
}

fn require_hostname(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	require_non_empty(kind, view)?;

	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}
