//! Host provider-directory integration.
//!
//! Hosts expose their directory in one of two shapes. A host with a register/unregister pair is
//! driven by [`ExplicitRegistration`]; a host that only resolves providers through lookups is
//! served by [`AccessorOverride`], which the host calls through instead of its own lookups.
//! [`RegistryAdapter::detect`] inspects the capabilities once and picks the strategy.

/// Lookup-override strategy.
pub mod accessor;
/// Register/unregister strategy.
pub mod explicit;
/// Registration counters.
pub mod metrics;

pub use accessor::AccessorOverride;
pub use explicit::ExplicitRegistration;
pub use metrics::RegistrationMetrics;

// self
use crate::{
	_prelude::*,
	config::{ActiveView, Configuration, Protocol},
	error::{ConfigError, RegistryError},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	secret::ClientSecret,
	store::ConfigStore,
};

/// Boxed future returned by host directory operations.
pub type HostFuture<'a, T> = BoxFuture<'a, Result<T, RegistryError>>;

/// Hostname lookup result handed to the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderHostnameInfo {
	/// Issuer serving the hostname.
	pub issuer: String,
	/// Every scope configured for the provider, space-delimited.
	pub all_scopes: String,
	/// Scopes required for the requested protocol, space-delimited.
	pub required_scopes: String,
}

/// Issuer lookup result handed to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderCredentials {
	/// Provider display name (the issuer).
	pub name: String,
	/// OAuth client identifier.
	pub client_id: String,
	/// Client secret; `None` rather than empty.
	pub client_secret: Option<ClientSecret>,
	/// Authorization endpoint URL.
	pub authorization_endpoint: String,
	/// Token endpoint URL.
	pub token_endpoint: String,
	/// Redirect URI.
	pub redirection_endpoint: String,
	/// Whether the host should use PKCE.
	pub use_pkce: bool,
}
impl ProviderCredentials {
	/// Credentials for `config`, without its secret.
	pub fn from_config(config: &Configuration) -> Self {
		Self {
			name: config.issuer.clone(),
			client_id: config.client_id.clone(),
			client_secret: None,
			authorization_endpoint: config.authorization_endpoint.clone(),
			token_endpoint: config.token_endpoint.clone(),
			redirection_endpoint: config.redirect_uri.clone(),
			use_pkce: config.use_pkce,
		}
	}
}

/// Full provider record submitted to hosts with an explicit registrar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderRegistration {
	/// Issuer the provider is registered under.
	pub issuer: String,
	/// OAuth client identifier.
	pub client_id: String,
	/// Client secret, if one is configured.
	pub client_secret: Option<ClientSecret>,
	/// Authorization endpoint URL.
	pub authorization_endpoint: String,
	/// Token endpoint URL.
	pub token_endpoint: String,
	/// Redirect URI.
	pub redirect_uri: String,
	/// Whether the host should use PKCE.
	pub use_pkce: bool,
	/// Hostnames the provider serves.
	pub hostnames: Vec<String>,
	/// Merged scope string for every protocol.
	pub scopes: String,
}
impl ProviderRegistration {
	/// Builds the registration record for `config`.
	pub fn from_config(config: &Configuration) -> Self {
		Self {
			issuer: config.issuer.clone(),
			client_id: config.client_id.clone(),
			client_secret: config.client_secret.clone(),
			authorization_endpoint: config.authorization_endpoint.clone(),
			token_endpoint: config.token_endpoint.clone(),
			redirect_uri: config.redirect_uri.clone(),
			use_pkce: config.use_pkce,
			hostnames: config.hostnames.clone(),
			scopes: config.scopes.merged().normalized(),
		}
	}
}

/// Lookup pair exposed by hosts that resolve providers on demand.
pub trait HostLookup
where
	Self: Send + Sync,
{
	/// Resolves the provider serving `hostname` for the given protocol hint.
	fn lookup_by_hostname<'a>(
		&'a self,
		hostname: &'a str,
		protocol: Option<Protocol>,
	) -> HostFuture<'a, Option<ProviderHostnameInfo>>;

	/// Resolves the credentials registered for `issuer`.
	fn lookup_by_issuer<'a>(
		&'a self,
		issuer: &'a str,
		protocol: Option<Protocol>,
	) -> HostFuture<'a, Option<ProviderCredentials>>;
}

/// Register/unregister pair exposed by hosts with a mutable provider directory.
pub trait HostRegistrar
where
	Self: Send + Sync,
{
	/// Adds (or replaces) a provider.
	fn register<'a>(&'a self, registration: &'a ProviderRegistration) -> HostFuture<'a, ()>;

	/// Removes the provider registered under `issuer`.
	fn unregister<'a>(&'a self, issuer: &'a str) -> HostFuture<'a, ()>;
}

/// Capability detection over the host's provider directory.
pub trait ProviderDirectory
where
	Self: Send + Sync,
{
	/// Register/unregister capability, when the host has it.
	fn registrar(&self) -> Option<Arc<dyn HostRegistrar>>;

	/// Original lookup pair, when the host has it.
	fn lookup(&self) -> Option<Arc<dyn HostLookup>>;
}

/// Strategy selected for the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyKind {
	/// Lookups are served through [`AccessorOverride`].
	AccessorOverride,
	/// Providers are pushed through [`ExplicitRegistration`].
	ExplicitRegistration,
}
impl StrategyKind {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StrategyKind::AccessorOverride => "accessor_override",
			StrategyKind::ExplicitRegistration => "explicit_registration",
		}
	}
}
impl Display for StrategyKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Reconciles the active configuration with the host directory.
pub trait RegistryStrategy
where
	Self: Send + Sync,
{
	/// Strategy label.
	fn kind(&self) -> StrategyKind;

	/// Makes the host reflect `config`. Returns whether the provider is now served.
	fn synchronize<'a>(&'a self, config: &'a Configuration) -> BoxFuture<'a, bool>;

	/// Undoes whatever [`RegistryStrategy::synchronize`] left in the host directory.
	fn shutdown(&self) -> BoxFuture<'_, ()> {
		Box::pin(async {})
	}
}

/// Owns the strategy chosen for the host.
pub struct RegistryAdapter {
	strategy: Arc<dyn RegistryStrategy>,
	accessor: Option<Arc<AccessorOverride>>,
	metrics: Arc<RegistrationMetrics>,
}
impl RegistryAdapter {
	/// Inspects `directory` (registrar first, lookup pair second) and builds the matching strategy.
	pub fn detect(
		directory: &dyn ProviderDirectory,
		store: ConfigStore,
		view: ActiveView,
		cache_capacity: Option<usize>,
	) -> Result<Self, ConfigError> {
		let metrics = Arc::new(RegistrationMetrics::default());

		if let Some(registrar) = directory.registrar() {
			tracing::info!(strategy = StrategyKind::ExplicitRegistration.as_str(), "Host directory detected.");

			let strategy = Arc::new(ExplicitRegistration::new(registrar, store, metrics.clone()));

			return Ok(Self { strategy, accessor: None, metrics });
		}
		if let Some(original) = directory.lookup() {
			tracing::info!(strategy = StrategyKind::AccessorOverride.as_str(), "Host directory detected.");

			let accessor = Arc::new(AccessorOverride::new(original, view, cache_capacity));

			return Ok(Self { strategy: accessor.clone(), accessor: Some(accessor), metrics });
		}

		Err(ConfigError::UnsupportedHost)
	}

	/// Strategy in use.
	pub fn kind(&self) -> StrategyKind {
		self.strategy.kind()
	}

	/// Lookup pair the host must call through, when the accessor strategy is active.
	pub fn lookup(&self) -> Option<Arc<dyn HostLookup>> {
		self.accessor.clone().map(|accessor| accessor as Arc<dyn HostLookup>)
	}

	/// Registration counters for the explicit strategy.
	pub fn metrics(&self) -> &RegistrationMetrics {
		&self.metrics
	}

	/// Pushes `config` to the host.
	pub async fn synchronize(&self, config: &Configuration) -> bool {
		const KIND: OperationKind = OperationKind::Synchronize;

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let span = OperationSpan::new(KIND, "synchronize");
		let served = span.instrument(self.strategy.synchronize(config)).await;

		obs::record_operation_outcome(KIND, OperationOutcome::from_success(served));

		served
	}

	/// Removes this crate's registrations from the host.
	pub async fn shutdown(&self) {
		const KIND: OperationKind = OperationKind::Shutdown;

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let span = OperationSpan::new(KIND, "shutdown");

		span.instrument(self.strategy.shutdown()).await;
		obs::record_operation_outcome(KIND, OperationOutcome::Success);
	}
}
impl Debug for RegistryAdapter {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RegistryAdapter")
			.field("strategy", &self.strategy.kind())
			.field("metrics", &self.metrics)
			.finish()
	}
}
