// self
use crate::{
	_prelude::*,
	apply::ConfigApplier,
	bootstrap::Bootstrap,
	config::ActiveView,
	error::ConfigError,
	http::{self, FetchLimits, ReqwestHttpClient},
	registry::{ProviderDirectory, RegistryAdapter},
	remote::{BundledDocument, RemoteConfigLoader},
	secret::{CredentialVault, SecretBackends, VaultSecretStore, vault::DEFAULT_REALM},
	store::{ConfigStore, DEFAULT_NAMESPACE, PreferenceStore},
};

/// Builder for [`Bootstrap`].
///
/// Preferences and the host directory are required. Operator settings default to the same
/// preference store, and the HTTP client defaults to one that never follows redirects.
pub struct BootstrapBuilder {
	preferences: Option<Arc<dyn PreferenceStore>>,
	settings: Option<Arc<dyn PreferenceStore>>,
	directory: Option<Arc<dyn ProviderDirectory>>,
	vault: Option<Arc<dyn CredentialVault>>,
	namespace: String,
	realm: String,
	limits: FetchLimits,
	http: Option<ReqwestHttpClient>,
	cache_capacity: Option<usize>,
	packaged_url: Option<String>,
	bundled: Option<BundledDocument>,
}
impl BootstrapBuilder {
	/// Preference store holding the configuration fields.
	pub fn preferences(mut self, preferences: Arc<dyn PreferenceStore>) -> Self {
		self.preferences = Some(preferences);

		self
	}

	/// Store holding the operator settings (`configUrl`, `storeSecret`).
	pub fn settings(mut self, settings: Arc<dyn PreferenceStore>) -> Self {
		self.settings = Some(settings);

		self
	}

	/// Host provider directory.
	pub fn directory(mut self, directory: Arc<dyn ProviderDirectory>) -> Self {
		self.directory = Some(directory);

		self
	}

	/// Host credential vault. Without one, the vault secret mode is unavailable.
	pub fn vault(mut self, vault: Arc<dyn CredentialVault>) -> Self {
		self.vault = Some(vault);

		self
	}

	/// Prefix applied to every configuration field.
	pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = namespace.into();

		self
	}

	/// Realm vault entries are filed under.
	pub fn realm(mut self, realm: impl Into<String>) -> Self {
		self.realm = realm.into();

		self
	}

	/// Limits applied to every fetch.
	pub fn fetch_limits(mut self, limits: FetchLimits) -> Self {
		self.limits = limits;

		self
	}

	/// HTTP client used for fetches.
	pub fn http_client(mut self, http: ReqwestHttpClient) -> Self {
		self.http = Some(http);

		self
	}

	/// Upper bound for each lookup cache.
	pub fn cache_capacity(mut self, capacity: usize) -> Self {
		self.cache_capacity = Some(capacity);

		self
	}

	/// Configuration URL shipped with the packaging. Ignored unless it is HTTPS.
	pub fn packaged_url(mut self, url: impl Into<String>) -> Self {
		self.packaged_url = Some(url.into());

		self
	}

	/// Last-resort document shipped with the packaging.
	pub fn bundled(mut self, document: BundledDocument) -> Self {
		self.bundled = Some(document);

		self
	}

	/// Wires the pipeline and inspects the host directory.
	pub fn build(self) -> Result<Bootstrap, ConfigError> {
		let preferences =
			self.preferences.ok_or(ConfigError::MissingComponent { component: "preferences" })?;
		let directory =
			self.directory.ok_or(ConfigError::MissingComponent { component: "directory" })?;
		let settings = self.settings.unwrap_or_else(|| preferences.clone());
		let http = match self.http {
			Some(http) => http,
			None => ReqwestHttpClient::hardened()?,
		};
		let packaged_url = self.packaged_url.filter(|url| {
			let usable = http::is_https(url);

			if !usable {
				tracing::warn!(origin = %http::loggable_origin(url), "Packaged configuration URL is not HTTPS; ignoring it.");
			}

			usable
		});
		let store = ConfigStore::new(preferences, self.namespace);
		let secrets = Arc::new(SecretBackends::new(
			store.clone(),
			VaultSecretStore::with_realm(self.vault, self.realm),
		));
		let view = ActiveView::new(store.clone(), secrets);
		let registry =
			RegistryAdapter::detect(directory.as_ref(), store, view.clone(), self.cache_capacity)?;

		Ok(Bootstrap {
			settings,
			applier: ConfigApplier::new(view),
			loader: RemoteConfigLoader::new(http, self.limits),
			registry,
			packaged_url,
			bundled: self.bundled,
			sequence: AsyncMutex::new(()),
		})
	}
}
impl Default for BootstrapBuilder {
	fn default() -> Self {
		Self {
			preferences: None,
			settings: None,
			directory: None,
			vault: None,
			namespace: DEFAULT_NAMESPACE.into(),
			realm: DEFAULT_REALM.into(),
			limits: FetchLimits::default(),
			http: None,
			cache_capacity: None,
			packaged_url: None,
			bundled: None,
		}
	}
}
impl Debug for BootstrapBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BootstrapBuilder")
			.field("namespace", &self.namespace)
			.field("realm", &self.realm)
			.field("limits", &self.limits)
			.field("cache_capacity", &self.cache_capacity)
			.finish_non_exhaustive()
	}
}
