//! Crate-level error types shared across stores, the applier, the registry, and the loader.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure (preferences, secret backends).
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Configuration document failed structural validation.
	#[error(transparent)]
	Validation(#[from] crate::config::ValidationError),
	/// Fetching a remote document failed.
	#[error(transparent)]
	Network(#[from] NetworkError),
	/// Host provider directory rejected a registration.
	#[error(transparent)]
	Registry(#[from] RegistryError),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Local configuration and wiring failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Every configuration source in the chain failed.
	#[error("No configuration source produced a usable document ({attempted} attempted).")]
	SourcesExhausted {
		/// Number of sources that were tried.
		attempted: usize,
	},
	/// A local configuration file could not be read.
	#[error("Failed to read configuration file {path}.")]
	ReadFile {
		/// Offending path.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// A local configuration file exceeded the permitted size.
	#[error("Configuration file {path} exceeds {limit} bytes.")]
	FileTooLarge {
		/// Offending path.
		path: PathBuf,
		/// Maximum accepted size in bytes.
		limit: u64,
	},
	/// A builder was finished without a required collaborator.
	#[error("Missing required component: {component}.")]
	MissingComponent {
		/// Name of the missing collaborator.
		component: &'static str,
	},
	/// The host exposes neither registration nor lookup capability.
	#[error("Host provider directory exposes no supported capability.")]
	UnsupportedHost,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Remote fetch failures. Callers fall through to the next source or surface them to the UI.
#[derive(Debug, ThisError)]
pub enum NetworkError {
	/// URL could not be parsed.
	#[error("Configuration URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Only HTTPS URLs are fetched.
	#[error("Configuration URL must use HTTPS (got `{scheme}`).")]
	InsecureUrl {
		/// Scheme that was rejected.
		scheme: String,
	},
	/// Request exceeded the configured deadline and was cancelled.
	#[error("Request timed out after {timeout}.")]
	Timeout {
		/// Deadline that was exceeded.
		timeout: Duration,
	},
	/// Response body exceeded the byte cap.
	#[error("Configuration body exceeds {limit} bytes.")]
	TooLarge {
		/// Maximum accepted body size in bytes.
		limit: usize,
	},
	/// Server answered with a non-2xx status.
	#[error("HTTP {status}{}", snippet_suffix(.snippet))]
	Status {
		/// HTTP status code.
		status: u16,
		/// Leading part of the response body, for diagnostics.
		snippet: String,
	},
	/// Body was not a JSON document.
	#[error("Configuration body is not valid JSON.")]
	Json {
		/// Structured parsing failure.
		#[source]
		source: serde_json::Error,
	},
	/// Underlying HTTP client reported a transport failure.
	#[error("Network error occurred while fetching configuration.")]
	Transport {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl NetworkError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Transport { source: Box::new(src) }
	}
}

/// Host directory failures raised by registration strategies.
#[derive(Debug, ThisError)]
pub enum RegistryError {
	/// The host refused to register the provider.
	#[error("Host rejected registration of issuer `{issuer}`: {message}.")]
	Register {
		/// Issuer that failed to register.
		issuer: String,
		/// Host-supplied reason.
		message: String,
	},
	/// The host refused to unregister the provider.
	#[error("Host rejected unregistration of issuer `{issuer}`: {message}.")]
	Unregister {
		/// Issuer that failed to unregister.
		issuer: String,
		/// Host-supplied reason.
		message: String,
	},
	/// A delegated host lookup failed.
	#[error("Host lookup failed: {message}.")]
	Lookup {
		/// Host-supplied reason.
		message: String,
	},
}

fn snippet_suffix(snippet: &str) -> String {
	if snippet.is_empty() { String::new() } else { format!(": {snippet}") }
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_error_converts_into_crate_error_with_source() {
		let store_error = StoreError::Backend { message: "disk unreachable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("disk unreachable"));

		let source = StdError::source(&error)
			.expect("Crate error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn status_error_includes_snippet_only_when_present() {
		let with_body = NetworkError::Status { status: 404, snippet: "not here".into() };
		let without_body = NetworkError::Status { status: 500, snippet: String::new() };

		assert_eq!(with_body.to_string(), "HTTP 404: not here");
		assert_eq!(without_body.to_string(), "HTTP 500");
	}
}
