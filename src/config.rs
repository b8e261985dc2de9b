//! Configuration data model: the wire document, its validator, and the canonical record.
//!
//! A [`ConfigDocument`] is what operators hand us (JSON from a URL, a file, or the options UI).
//! A [`Configuration`] is the normalized record the registry adapter reads back from the
//! [`ActiveView`], merged from the field store and whichever secret backend holds the secret.

pub mod validate;
pub mod view;

pub use validate::*;
pub use view::*;

// crates.io
use serde::Deserializer;
// self
use crate::{
	_prelude::*,
	id::{self, ClientId, Hostname, IdentifierError, Issuer},
	scope::ScopeList,
	secret::{ClientSecret, SecretKey},
	store::{PrefValue, field},
};

/// Mail protocol a host lookup is performed for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
	#[default]
	/// IMAP account lookups (the host's default hint).
	Imap,
	/// SMTP account lookups.
	Smtp,
}
impl Protocol {
	/// Returns a stable label suitable for cache keys and log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Protocol::Imap => "imap",
			Protocol::Smtp => "smtp",
		}
	}

	/// Returns the other protocol, used when falling back across hints.
	pub const fn other(self) -> Self {
		match self {
			Protocol::Imap => Protocol::Smtp,
			Protocol::Smtp => Protocol::Imap,
		}
	}
}
impl Display for Protocol {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Optional `scopes` object of a configuration document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopesDocument {
	/// Scopes requested for IMAP.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub imap: Option<String>,
	/// Scopes requested for SMTP.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub smtp: Option<String>,
}

/// Configuration document as it travels over the wire.
///
/// Build it through [`ConfigDocument::from_value`] or [`ConfigDocument::from_slice`] so the
/// structural checks in [`validate`] always run first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
	/// One or more mail-server hostnames, separated by commas or whitespace.
	pub hostname: String,
	/// Issuer name the host knows the provider by.
	pub issuer: String,
	/// OAuth client identifier.
	pub client_id: String,
	/// Client secret. `Some` (possibly empty) whenever the key was present in the document.
	#[serde(
		default,
		deserialize_with = "present_secret",
		skip_serializing_if = "Option::is_none"
	)]
	pub client_secret: Option<ClientSecret>,
	/// Authorization endpoint URL.
	pub authorization_endpoint: String,
	/// Token endpoint URL.
	pub token_endpoint: String,
	/// Redirect URI registered with the provider.
	pub redirect_uri: String,
	/// Whether the host should use PKCE.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub use_pkce: Option<bool>,
	/// Per-protocol scopes.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub scopes: Option<ScopesDocument>,
}
impl ConfigDocument {
	/// Validates a raw JSON value and decodes it into a document.
	pub fn from_value(value: &JsonValue) -> Result<Self, ValidationError> {
		validate(value)?;

		serde_path_to_error::deserialize(value.clone())
			.map_err(|source| ValidationError::Decode { source })
	}

	/// Parses JSON text, validates it, and decodes it into a document.
	pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
		let value: JsonValue =
			serde_json::from_slice(bytes).map_err(|source| ValidationError::Syntax { source })?;

		Self::from_value(&value)
	}

	/// Non-secret fields carried by this document, flattened to their persisted keys.
	///
	/// Optional fields are only listed when present, so a non-force apply never touches them.
	pub fn persisted_fields(&self) -> Vec<(&'static str, PrefValue)> {
		let mut fields = vec![
			(field::HOSTNAME, PrefValue::from(self.hostname.as_str())),
			(field::ISSUER, PrefValue::from(self.issuer.as_str())),
			(field::CLIENT_ID, PrefValue::from(self.client_id.as_str())),
			(field::AUTHORIZATION_ENDPOINT, PrefValue::from(self.authorization_endpoint.as_str())),
			(field::TOKEN_ENDPOINT, PrefValue::from(self.token_endpoint.as_str())),
			(field::REDIRECT_URI, PrefValue::from(self.redirect_uri.as_str())),
		];

		if let Some(use_pkce) = self.use_pkce {
			fields.push((field::USE_PKCE, PrefValue::Bool(use_pkce)));
		}
		if let Some(scopes) = &self.scopes {
			if let Some(imap) = &scopes.imap {
				fields.push((field::SCOPES_IMAP, PrefValue::from(imap.as_str())));
			}
			if let Some(smtp) = &scopes.smtp {
				fields.push((field::SCOPES_SMTP, PrefValue::from(smtp.as_str())));
			}
		}

		fields
	}
}

/// Scope strings per protocol; empty when not configured.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Scopes {
	/// Scopes requested for IMAP.
	pub imap: String,
	/// Scopes requested for SMTP.
	pub smtp: String,
}
impl Scopes {
	/// Scopes for `protocol`, falling back to the IMAP scopes when the protocol has none.
	pub fn for_protocol(&self, protocol: Protocol) -> &str {
		let scopes = match protocol {
			Protocol::Imap => &self.imap,
			Protocol::Smtp => &self.smtp,
		};

		if scopes.trim().is_empty() { &self.imap } else { scopes }
	}

	/// Union of both scope strings in first-seen order.
	pub fn merged(&self) -> ScopeList {
		ScopeList::merge([self.imap.as_str(), self.smtp.as_str()])
	}
}

/// Canonical configuration record read back from the stores.
///
/// Fields may be empty while the operator has not supplied a complete document yet; see
/// [`Configuration::is_ready`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Configuration {
	/// Matchable hostnames (trimmed, lowercased, first-seen order).
	pub hostnames: Vec<String>,
	/// Issuer name (trimmed, lowercased).
	pub issuer: String,
	/// OAuth client identifier.
	pub client_id: String,
	/// Client secret from whichever backend currently holds it.
	pub client_secret: Option<ClientSecret>,
	/// Authorization endpoint URL.
	pub authorization_endpoint: String,
	/// Token endpoint URL.
	pub token_endpoint: String,
	/// Redirect URI.
	pub redirect_uri: String,
	/// Whether the host should use PKCE.
	pub use_pkce: bool,
	/// Per-protocol scopes.
	pub scopes: Scopes,
}
impl Configuration {
	/// Builds the record a document would produce once applied, including its secret.
	pub fn from_document(document: &ConfigDocument) -> Self {
		let scopes = document.scopes.clone().unwrap_or_default();

		Self {
			hostnames: parse_hostnames(&document.hostname),
			issuer: id::fold_case(&document.issuer),
			client_id: document.client_id.clone(),
			client_secret: document.client_secret.clone().filter(|secret| !secret.is_blank()),
			authorization_endpoint: document.authorization_endpoint.clone(),
			token_endpoint: document.token_endpoint.clone(),
			redirect_uri: document.redirect_uri.clone(),
			use_pkce: document.use_pkce.unwrap_or(false),
			scopes: Scopes {
				imap: scopes.imap.unwrap_or_default(),
				smtp: scopes.smtp.unwrap_or_default(),
			},
		}
	}

	/// A configuration is ready once every field the host needs is non-empty.
	pub fn is_ready(&self) -> bool {
		!self.hostnames.is_empty()
			&& !self.issuer.is_empty()
			&& !self.client_id.trim().is_empty()
			&& !self.authorization_endpoint.trim().is_empty()
			&& !self.token_endpoint.trim().is_empty()
			&& !self.redirect_uri.trim().is_empty()
	}

	/// Case- and whitespace-insensitive hostname match.
	pub fn matches_hostname(&self, hostname: &str) -> bool {
		let requested = id::fold_case(hostname);

		self.hostnames.iter().any(|candidate| *candidate == requested)
	}

	/// Case- and whitespace-insensitive issuer match.
	pub fn matches_issuer(&self, issuer: &str) -> bool {
		!self.issuer.is_empty() && id::fold_case(issuer) == self.issuer
	}

	/// Key under which this configuration's secret is stored.
	pub fn secret_key(&self) -> Result<SecretKey, IdentifierError> {
		Ok(SecretKey { issuer: Issuer::new(&self.issuer)?, client_id: ClientId::new(&self.client_id)? })
	}
}

/// Splits a hostname field on commas and whitespace, normalizing and deduplicating entries.
pub fn parse_hostnames(raw: &str) -> Vec<String> {
	let mut hostnames: Vec<String> = Vec::new();

	for candidate in raw.split(|c: char| c == ',' || c.is_whitespace()) {
		let Ok(hostname) = Hostname::new(candidate) else {
			continue;
		};
		let hostname = String::from(hostname);

		if !hostnames.contains(&hostname) {
			hostnames.push(hostname);
		}
	}

	hostnames
}

fn present_secret<'de, D>(deserializer: D) -> Result<Option<ClientSecret>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = <Option<String>>::deserialize(deserializer)?;

	Ok(Some(ClientSecret::new(value.unwrap_or_default())))
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	fn sample() -> JsonValue {
		json!({
			"hostname": " Mail.Example.com, imap.example.com mail.example.com",
			"issuer": "Example",
			"clientId": "abc",
			"authorizationEndpoint": "https://example.com/auth",
			"tokenEndpoint": "https://example.com/token",
			"redirectUri": "https://example.com/redirect",
			"usePkce": true,
			"scopes": { "imap": "mail.imap", "smtp": "mail.smtp" },
			"clientSecret": "s3cr3t"
		})
	}

	#[test]
	fn document_decodes_and_normalizes_into_configuration() {
		let document =
			ConfigDocument::from_value(&sample()).expect("Sample document should be valid.");
		let config = Configuration::from_document(&document);

		assert_eq!(config.hostnames, vec!["mail.example.com", "imap.example.com"]);
		assert_eq!(config.issuer, "example");
		assert!(config.use_pkce);
		assert!(config.is_ready());
		assert!(config.matches_hostname("  IMAP.example.COM "));
		assert!(config.matches_issuer("EXAMPLE"));
		assert_eq!(
			config.client_secret.as_ref().map(ClientSecret::expose),
			Some("s3cr3t"),
		);
	}

	#[test]
	fn null_or_empty_secret_counts_as_present() {
		let mut value = sample();

		value["clientSecret"] = JsonValue::Null;

		let document = ConfigDocument::from_value(&value).expect("Null secret should be valid.");

		assert_eq!(document.client_secret.as_ref().map(ClientSecret::expose), Some(""));
		assert!(Configuration::from_document(&document).client_secret.is_none());

		if let Some(object) = value.as_object_mut() {
			object.remove("clientSecret");
		}

		let document = ConfigDocument::from_value(&value).expect("Absent secret should be valid.");

		assert!(document.client_secret.is_none());
	}

	#[test]
	fn persisted_fields_flatten_scopes_and_skip_absent_options() {
		let document =
			ConfigDocument::from_value(&sample()).expect("Sample document should be valid.");
		let keys = document.persisted_fields().into_iter().map(|(key, _)| key).collect::<Vec<_>>();

		assert!(keys.contains(&field::SCOPES_IMAP));
		assert!(keys.contains(&field::SCOPES_SMTP));
		assert!(!keys.contains(&field::CLIENT_SECRET));

		let mut value = sample();

		if let Some(object) = value.as_object_mut() {
			object.remove("usePkce");
			object.remove("scopes");
		}

		let document = ConfigDocument::from_value(&value).expect("Minimal document should be valid.");

		assert_eq!(document.persisted_fields().len(), 6);
	}

	#[test]
	fn scopes_fall_back_to_imap() {
		let scopes = Scopes { imap: "a b".into(), smtp: String::new() };

		assert_eq!(scopes.for_protocol(Protocol::Smtp), "a b");
		assert_eq!(scopes.merged().normalized(), "a b");
	}

	#[test]
	fn readiness_requires_every_host_field() {
		let document =
			ConfigDocument::from_value(&sample()).expect("Sample document should be valid.");
		let mut config = Configuration::from_document(&document);

		config.redirect_uri.clear();

		assert!(!config.is_ready());
		assert!(!Configuration::default().is_ready());
	}
}
