//! Process-level sequencing: resolve a document, apply it, and synchronize the host.
//!
//! Every external stimulus (startup, a changed source URL, an options-page save, a runtime
//! message, teardown) is funneled through [`Bootstrap`], which runs them one at a time.

/// Builder wiring the pipeline around host collaborators.
pub mod builder;

pub use builder::BootstrapBuilder;

// self
use crate::{
	_prelude::*,
	apply::{ApplyOptions, ConfigApplier},
	http,
	registry::{HostLookup, RegistryAdapter},
	remote::{self, BundledDocument, RemoteConfigLoader, SourceChain, SourceKind},
	secret::SecretMode,
	store::PreferenceStore,
};

/// Settings key holding the operator's configuration URL.
pub const CONFIG_URL_KEY: &str = "configUrl";
/// Settings key holding the operator's secret mode.
pub const SECRET_MODE_KEY: &str = "storeSecret";

/// Result of [`Bootstrap::run`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BootstrapReport {
	/// Source whose document was applied, if any worked.
	pub source: Option<SourceKind>,
	/// Whether the host now serves the configured provider.
	pub registered: bool,
	/// When the run finished.
	pub completed_at: OffsetDateTime,
}

/// Result of [`Bootstrap::on_source_changed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceChange {
	/// The new value is empty or not HTTPS; nothing was fetched.
	Ignored,
	/// The document was fetched and applied.
	Applied {
		/// Whether the host now serves the configured provider.
		registered: bool,
	},
}

/// Runtime message understood by [`Bootstrap::handle_message`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuntimeMessage {
	/// Fetch a document for the options page without applying it.
	#[serde(rename = "fetchConfig")]
	FetchConfig {
		/// Document URL.
		url: String,
	},
}

/// Reply to [`RuntimeMessage::FetchConfig`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FetchConfigResponse {
	/// Whether the fetch succeeded.
	pub ok: bool,
	/// Fetched document.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub json: Option<JsonValue>,
	/// Failure description.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}
impl FetchConfigResponse {
	fn success(json: JsonValue) -> Self {
		Self { ok: true, json: Some(json), error: None }
	}

	fn failure(error: impl Display) -> Self {
		Self { ok: false, json: None, error: Some(error.to_string()) }
	}
}

/// Owns the configuration pipeline for the lifetime of the process.
pub struct Bootstrap {
	settings: Arc<dyn PreferenceStore>,
	applier: ConfigApplier,
	loader: RemoteConfigLoader,
	registry: RegistryAdapter,
	packaged_url: Option<String>,
	bundled: Option<BundledDocument>,
	sequence: AsyncMutex<()>,
}
impl Bootstrap {
	/// Starts a builder.
	pub fn builder() -> BootstrapBuilder {
		BootstrapBuilder::default()
	}

	/// Applier used for every document.
	pub fn applier(&self) -> &ConfigApplier {
		&self.applier
	}

	/// Loader used for every fetch.
	pub fn loader(&self) -> &RemoteConfigLoader {
		&self.loader
	}

	/// Registry adapter selected for the host.
	pub fn registry(&self) -> &RegistryAdapter {
		&self.registry
	}

	/// Lookup pair the host must call through, when the accessor strategy is active.
	pub fn lookup(&self) -> Option<Arc<dyn HostLookup>> {
		self.registry.lookup()
	}

	/// Secret mode chosen by the operator, defaulting to [`SecretMode::Persisted`].
	pub fn secret_mode(&self) -> SecretMode {
		match self.settings.get_string(SECRET_MODE_KEY) {
			Ok(Some(raw)) => raw.parse().unwrap_or_else(|e| {
				tracing::warn!(error = %e, "Unknown secret mode setting; using the default.");

				SecretMode::default()
			}),
			Ok(None) => SecretMode::default(),
			Err(e) => {
				tracing::warn!(error = %e, "Failed to read the secret mode setting.");

				SecretMode::default()
			},
		}
	}

	/// Configuration URL chosen by the operator.
	pub fn override_url(&self) -> Option<String> {
		match self.settings.get_string(CONFIG_URL_KEY) {
			Ok(url) => url.map(|url| url.trim().to_owned()).filter(|url| !url.is_empty()),
			Err(e) => {
				tracing::warn!(error = %e, "Failed to read the configuration URL setting.");

				None
			},
		}
	}

	/// Resolves the source chain, applies the winner, and synchronizes the host.
	///
	/// Sources fetched over HTTPS apply with the operator's secret mode; the bundled document
	/// always applies with [`SecretMode::Persisted`]. The host is synchronized even when no
	/// source worked, so previously stored configuration keeps being served.
	pub async fn run(&self) -> BootstrapReport {
		let _sequence = self.sequence.lock().await;
		let chain = SourceChain {
			override_url: self.override_url(),
			packaged_url: self.packaged_url.clone(),
			bundled: self.bundled.clone(),
		};
		let source = match self.loader.resolve(&chain).await {
			Ok(resolved) => {
				let mode = match resolved.source {
					SourceKind::Bundled => SecretMode::Persisted,
					SourceKind::Override | SourceKind::Packaged => self.secret_mode(),
				};

				match self.applier.apply_document(&resolved.document, ApplyOptions::forced(mode)).await {
					Ok(_) => Some(resolved.source),
					Err(e) => {
						tracing::warn!(source = resolved.source.as_str(), error = %e, "Failed to apply resolved configuration.");

						None
					},
				}
			},
			Err(e) => {
				tracing::warn!(error = %e, "No configuration source could be applied.");

				None
			},
		};
		let registered = self.synchronize().await;

		BootstrapReport { source, registered, completed_at: OffsetDateTime::now_utc() }
	}

	/// Reacts to the operator changing the configuration URL.
	pub async fn on_source_changed(&self, new_url: Option<&str>) -> Result<SourceChange> {
		let Some(url) = new_url.map(str::trim).filter(|url| http::is_https(url)) else {
			tracing::debug!("Configuration URL cleared or not HTTPS; ignoring change.");

			return Ok(SourceChange::Ignored);
		};
		let _sequence = self.sequence.lock().await;
		let document = self.loader.fetch_document(url).await?;

		self.applier.apply_document(&document, ApplyOptions::forced(self.secret_mode())).await?;

		Ok(SourceChange::Applied { registered: self.synchronize().await })
	}

	/// Applies a document submitted by the options UI and synchronizes the host.
	pub async fn apply_document(&self, document: &JsonValue, options: ApplyOptions) -> Result<bool> {
		let _sequence = self.sequence.lock().await;

		self.applier.apply(document, options).await?;

		Ok(self.synchronize().await)
	}

	/// Applies a JSON document read from `path` and synchronizes the host.
	pub async fn apply_profile_file(&self, path: &Path, options: ApplyOptions) -> Result<bool> {
		let _sequence = self.sequence.lock().await;
		let document = remote::read_local_document(path)?;

		self.applier.apply_document(&document, options).await?;

		Ok(self.synchronize().await)
	}

	/// Answers a runtime message; `None` for messages this crate does not handle.
	pub async fn handle_message(&self, message: &JsonValue) -> Option<FetchConfigResponse> {
		let message = match serde_json::from_value::<RuntimeMessage>(message.clone()) {
			Ok(message) => message,
			Err(e) => {
				tracing::debug!(error = %e, "Ignoring unrecognized runtime message.");

				return None;
			},
		};
		let _sequence = self.sequence.lock().await;

		match message {
			RuntimeMessage::FetchConfig { url } => Some(match self.loader.fetch(&url).await {
				Ok(json) => FetchConfigResponse::success(json),
				Err(e) => FetchConfigResponse::failure(e),
			}),
		}
	}

	/// Deletes the stored client secret everywhere and re-synchronizes the host.
	pub async fn reset_secret(&self) -> bool {
		let _sequence = self.sequence.lock().await;

		self.applier.reset_secret().await;

		self.synchronize().await
	}

	/// Removes this crate's registrations from the host.
	pub async fn shutdown(&self) {
		let _sequence = self.sequence.lock().await;

		self.registry.shutdown().await;
	}

	async fn synchronize(&self) -> bool {
		let config = self.applier.view().current().await;

		self.registry.synchronize(&config).await
	}
}
impl Debug for Bootstrap {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Bootstrap")
			.field("registry", &self.registry)
			.field("packaged_url", &self.packaged_url.as_deref().map(http::loggable_origin))
			.field("bundled", &self.bundled.is_some())
			.finish_non_exhaustive()
	}
}
