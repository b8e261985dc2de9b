//! Preference storage contracts and the namespaced configuration field store.

pub mod file;
pub mod memory;

pub use file::FilePreferences;
pub use memory::MemoryPreferences;

// self
use crate::_prelude::*;

/// Namespace prefix applied to every configuration field.
pub const DEFAULT_NAMESPACE: &str = "extensions.oauth2_override.";

/// Persisted configuration field names, relative to the store namespace.
pub mod field {
	/// Comma- or whitespace-separated hostnames.
	pub const HOSTNAME: &str = "hostname";
	/// Issuer name.
	pub const ISSUER: &str = "issuer";
	/// OAuth client identifier.
	pub const CLIENT_ID: &str = "clientId";
	/// Client secret slot used by the persisted secret backend.
	pub const CLIENT_SECRET: &str = "clientSecret";
	/// Issuer owning the persisted client secret.
	pub const CLIENT_SECRET_ISSUER: &str = "clientSecret.issuer";
	/// Client identifier owning the persisted client secret.
	pub const CLIENT_SECRET_CLIENT_ID: &str = "clientSecret.clientId";
	/// Authorization endpoint URL.
	pub const AUTHORIZATION_ENDPOINT: &str = "authorizationEndpoint";
	/// Token endpoint URL.
	pub const TOKEN_ENDPOINT: &str = "tokenEndpoint";
	/// Redirect URI.
	pub const REDIRECT_URI: &str = "redirectUri";
	/// PKCE flag.
	pub const USE_PKCE: &str = "usePkce";
	/// IMAP scopes.
	pub const SCOPES_IMAP: &str = "scopes.imap";
	/// SMTP scopes.
	pub const SCOPES_SMTP: &str = "scopes.smtp";
	/// Issuer most recently registered with the host directory.
	pub const REGISTERED_ISSUER: &str = "_registeredIssuer";
}

/// Typed preference value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
	/// Boolean preference.
	Bool(bool),
	/// String preference.
	String(String),
}
impl PrefValue {
	const fn type_name(&self) -> &'static str {
		match self {
			PrefValue::Bool(_) => "bool",
			PrefValue::String(_) => "string",
		}
	}
}
impl From<&str> for PrefValue {
	fn from(value: &str) -> Self {
		Self::String(value.to_owned())
	}
}
impl From<String> for PrefValue {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}
impl From<bool> for PrefValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

/// Error type produced by preference stores and secret backends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// A key holds a value of a different type than requested.
	#[error("Preference `{key}` is not a {expected}.")]
	TypeMismatch {
		/// Fully qualified preference key.
		key: String,
		/// Requested type.
		expected: String,
	},
	/// The requested backend is not present in this environment.
	#[error("Secret backend `{backend}` is unavailable.")]
	BackendUnavailable {
		/// Backend label.
		backend: String,
	},
}

/// Synchronous key/value preference storage owned by the host.
pub trait PreferenceStore
where
	Self: Send + Sync,
{
	/// Reads the raw value stored under `key`.
	fn get(&self, key: &str) -> Result<Option<PrefValue>, StoreError>;

	/// Writes `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: PrefValue) -> Result<(), StoreError>;

	/// Removes `key`. Missing keys are not an error.
	fn clear(&self, key: &str) -> Result<(), StoreError>;

	/// Returns true if `key` holds a value of any type.
	fn has_key(&self, key: &str) -> Result<bool, StoreError> {
		Ok(self.get(key)?.is_some())
	}

	/// Reads a string value.
	fn get_string(&self, key: &str) -> Result<Option<String>, StoreError> {
		match self.get(key)? {
			Some(PrefValue::String(value)) => Ok(Some(value)),
			Some(other) => Err(type_mismatch(key, "string", &other)),
			None => Ok(None),
		}
	}

	/// Reads a boolean value.
	fn get_bool(&self, key: &str) -> Result<Option<bool>, StoreError> {
		match self.get(key)? {
			Some(PrefValue::Bool(value)) => Ok(Some(value)),
			Some(other) => Err(type_mismatch(key, "bool", &other)),
			None => Ok(None),
		}
	}

	/// Writes a string value.
	fn set_string(&self, key: &str, value: &str) -> Result<(), StoreError> {
		self.set(key, PrefValue::from(value))
	}

	/// Writes a boolean value.
	fn set_bool(&self, key: &str, value: bool) -> Result<(), StoreError> {
		self.set(key, PrefValue::Bool(value))
	}
}

/// Namespaced view over a [`PreferenceStore`] holding the configuration fields.
///
/// Reads never fail: a missing key, a type mismatch, or a backend failure all yield the
/// field's default, and the failure is logged.
#[derive(Clone)]
pub struct ConfigStore {
	prefs: Arc<dyn PreferenceStore>,
	namespace: String,
}
impl ConfigStore {
	/// Wraps `prefs`, prefixing every field with `namespace`.
	pub fn new(prefs: Arc<dyn PreferenceStore>, namespace: impl Into<String>) -> Self {
		Self { prefs, namespace: namespace.into() }
	}

	/// Wraps `prefs` under [`DEFAULT_NAMESPACE`].
	pub fn with_default_namespace(prefs: Arc<dyn PreferenceStore>) -> Self {
		Self::new(prefs, DEFAULT_NAMESPACE)
	}

	/// Fully qualified key for `field`.
	pub fn key(&self, field: &str) -> String {
		format!("{}{field}", self.namespace)
	}

	/// Underlying preference store.
	pub fn preferences(&self) -> &Arc<dyn PreferenceStore> {
		&self.prefs
	}

	/// Writes `value` to `field`.
	///
	/// Without `force`, an existing value is kept. Returns whether the field was written.
	pub fn write(&self, field: &str, value: PrefValue, force: bool) -> Result<bool, StoreError> {
		let key = self.key(field);

		if !force && self.prefs.has_key(&key)? {
			return Ok(false);
		}

		self.prefs.set(&key, value)?;

		Ok(true)
	}

	/// Reads the raw value of `field`, surfacing backend failures.
	pub fn read_raw(&self, field: &str) -> Result<Option<PrefValue>, StoreError> {
		self.prefs.get(&self.key(field))
	}

	/// Puts back a value captured by [`ConfigStore::read_raw`], clearing the field for `None`.
	pub fn restore(&self, field: &str, value: Option<PrefValue>) -> Result<(), StoreError> {
		match value {
			Some(value) => self.prefs.set(&self.key(field), value),
			None => self.clear(field),
		}
	}

	/// Reads a string field, defaulting to the empty string.
	pub fn read_string(&self, field: &str) -> String {
		let key = self.key(field);

		match self.prefs.get_string(&key) {
			Ok(value) => value.unwrap_or_default(),
			Err(e) => {
				tracing::warn!(key = %key, error = %e, "Preference read failed; using default.");

				String::new()
			},
		}
	}

	/// Reads a boolean field, defaulting to `false`.
	pub fn read_bool(&self, field: &str) -> bool {
		let key = self.key(field);

		match self.prefs.get_bool(&key) {
			Ok(value) => value.unwrap_or(false),
			Err(e) => {
				tracing::warn!(key = %key, error = %e, "Preference read failed; using default.");

				false
			},
		}
	}

	/// Removes `field`.
	pub fn clear(&self, field: &str) -> Result<(), StoreError> {
		self.prefs.clear(&self.key(field))
	}

	/// Issuer most recently registered with the host directory, if any.
	pub fn registered_issuer(&self) -> Option<String> {
		Some(self.read_string(field::REGISTERED_ISSUER)).filter(|issuer| !issuer.is_empty())
	}

	/// Records `issuer` as currently registered.
	pub fn set_registered_issuer(&self, issuer: &str) -> Result<(), StoreError> {
		self.prefs.set_string(&self.key(field::REGISTERED_ISSUER), issuer)
	}

	/// Forgets the registered issuer.
	pub fn clear_registered_issuer(&self) -> Result<(), StoreError> {
		self.clear(field::REGISTERED_ISSUER)
	}
}
impl Debug for ConfigStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConfigStore").field("namespace", &self.namespace).finish_non_exhaustive()
	}
}

fn type_mismatch(key: &str, expected: &str, found: &PrefValue) -> StoreError {
	tracing::debug!(key, expected, found = found.type_name(), "Preference type mismatch.");

	StoreError::TypeMismatch { key: key.to_owned(), expected: expected.to_owned() }
}
