//! Configuration source chain: operator URL, packaging URL, then the bundled document.

// std
use std::fs;
// self
use crate::{
	_prelude::*,
	config::ConfigDocument,
	error::{ConfigError, NetworkError},
	http::{self, FetchLimits, ReqwestHttpClient},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
};

/// Largest local configuration file accepted (128 KiB).
pub const MAX_FILE_BYTES: u64 = 128 * 1024;

/// Which source produced the applied document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
	/// URL configured by the operator.
	Override,
	/// URL shipped with the packaging.
	Packaged,
	/// Document shipped with the packaging.
	Bundled,
}
impl SourceKind {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			SourceKind::Override => "override",
			SourceKind::Packaged => "packaged",
			SourceKind::Bundled => "bundled",
		}
	}
}
impl Display for SourceKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Last-resort document shipped with the packaging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BundledDocument {
	/// JSON text compiled into the host.
	Inline(String),
	/// JSON file on disk, capped at [`MAX_FILE_BYTES`].
	File(PathBuf),
}
impl BundledDocument {
	/// Reads and validates the document.
	pub fn load(&self) -> Result<ConfigDocument> {
		match self {
			BundledDocument::Inline(text) => Ok(ConfigDocument::from_slice(text.as_bytes())?),
			BundledDocument::File(path) => read_local_document(path),
		}
	}
}

/// Sources tried by [`RemoteConfigLoader::resolve`], in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceChain {
	/// Operator-configured URL.
	pub override_url: Option<String>,
	/// Packaging default URL.
	pub packaged_url: Option<String>,
	/// Bundled fallback document.
	pub bundled: Option<BundledDocument>,
}

/// Document produced by the first working source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedDocument {
	/// Source that won.
	pub source: SourceKind,
	/// Validated document.
	pub document: ConfigDocument,
}

/// Fetches configuration documents over HTTPS within fixed limits.
#[derive(Clone, Debug)]
pub struct RemoteConfigLoader {
	http: ReqwestHttpClient,
	limits: FetchLimits,
}
impl RemoteConfigLoader {
	/// Creates a loader over `http` enforcing `limits`.
	///
	/// `http` must not follow redirects; see [`ReqwestHttpClient::with_client`].
	pub fn new(http: ReqwestHttpClient, limits: FetchLimits) -> Self {
		Self { http, limits }
	}

	/// Limits enforced on every fetch.
	pub fn limits(&self) -> &FetchLimits {
		&self.limits
	}

	/// Fetches `url` and parses its body as JSON, without validating the document.
	pub async fn fetch(&self, url: &str) -> Result<JsonValue, NetworkError> {
		const KIND: OperationKind = OperationKind::Fetch;

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let span = OperationSpan::new(KIND, "fetch");
		let result = span.instrument(self.http.fetch_json(url, &self.limits)).await;

		match &result {
			Ok(_) => {
				tracing::debug!(origin = %http::loggable_origin(url), "Fetched configuration.");
				obs::record_operation_outcome(KIND, OperationOutcome::Success);
			},
			Err(e) => {
				tracing::debug!(origin = %http::loggable_origin(url), error = %e, "Configuration fetch failed.");
				obs::record_operation_outcome(KIND, OperationOutcome::Failure);
			},
		}

		result
	}

	/// Fetches `url` and validates the body as a configuration document.
	pub async fn fetch_document(&self, url: &str) -> Result<ConfigDocument> {
		let value = self.fetch(url).await?;

		Ok(ConfigDocument::from_value(&value)?)
	}

	/// Walks `chain` and returns the first document that fetches and validates.
	pub async fn resolve(&self, chain: &SourceChain) -> Result<ResolvedDocument> {
		const KIND: OperationKind = OperationKind::Resolve;

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let span = OperationSpan::new(KIND, "resolve");
		let result = span.instrument(self.resolve_inner(chain)).await;

		obs::record_operation_outcome(KIND, OperationOutcome::from_success(result.is_ok()));

		result
	}

	async fn resolve_inner(&self, chain: &SourceChain) -> Result<ResolvedDocument> {
		let mut attempted = 0;
		let urls = [
			(SourceKind::Override, chain.override_url.as_deref()),
			(SourceKind::Packaged, chain.packaged_url.as_deref()),
		];

		for (source, url) in urls {
			let Some(url) = url.map(str::trim).filter(|url| !url.is_empty()) else {
				continue;
			};

			attempted += 1;

			match self.fetch_document(url).await {
				Ok(document) => {
					tracing::info!(source = source.as_str(), origin = %http::loggable_origin(url), "Configuration source resolved.");

					return Ok(ResolvedDocument { source, document });
				},
				Err(e) => {
					tracing::warn!(source = source.as_str(), origin = %http::loggable_origin(url), error = %e, "Configuration source failed; falling through.");
				},
			}
		}

		if let Some(bundled) = &chain.bundled {
			attempted += 1;

			match bundled.load() {
				Ok(document) => {
					tracing::info!(source = SourceKind::Bundled.as_str(), "Configuration source resolved.");

					return Ok(ResolvedDocument { source: SourceKind::Bundled, document });
				},
				Err(e) => {
					tracing::warn!(source = SourceKind::Bundled.as_str(), error = %e, "Bundled configuration is unusable.");
				},
			}
		}

		Err(ConfigError::SourcesExhausted { attempted }.into())
	}
}

/// Reads and validates a JSON configuration file of at most [`MAX_FILE_BYTES`].
pub fn read_local_document(path: &Path) -> Result<ConfigDocument> {
	let read_error = |source: std::io::Error| ConfigError::ReadFile { path: path.to_path_buf(), source };
	let metadata = fs::metadata(path).map_err(read_error)?;

	if metadata.len() > MAX_FILE_BYTES {
		return Err(ConfigError::FileTooLarge { path: path.to_path_buf(), limit: MAX_FILE_BYTES }
			.into());
	}

	let bytes = fs::read(path).map_err(read_error)?;

	Ok(ConfigDocument::from_slice(&bytes)?)
}
