//! Lookup-override strategy for hosts without a mutable provider directory.

// self
use crate::{
	_prelude::*,
	cache::{CacheLookup, SignatureCache, compute_signature},
	config::{ActiveView, Configuration, Protocol},
	id,
	registry::{
		HostFuture, HostLookup, ProviderCredentials, ProviderHostnameInfo, RegistryStrategy,
		StrategyKind,
	},
};

/// Serves lookups for the configured provider and delegates everything else to the host.
///
/// Results are memoized per configuration signature. Issuer entries are cached without the
/// secret, which is attached from the active view on every lookup.
pub struct AccessorOverride {
	original: Arc<dyn HostLookup>,
	view: ActiveView,
	hosts: SignatureCache<ProviderHostnameInfo>,
	issuers: SignatureCache<ProviderCredentials>,
}
impl AccessorOverride {
	/// Wraps the host's original lookup pair.
	pub fn new(
		original: Arc<dyn HostLookup>,
		view: ActiveView,
		cache_capacity: Option<usize>,
	) -> Self {
		let (hosts, issuers) = match cache_capacity {
			Some(capacity) =>
				(SignatureCache::with_capacity(capacity), SignatureCache::with_capacity(capacity)),
			None => (SignatureCache::new(), SignatureCache::new()),
		};

		Self { original, view, hosts, issuers }
	}

	/// Number of memoized hostname and issuer entries.
	pub fn cached_entries(&self) -> usize {
		self.hosts.len() + self.issuers.len()
	}

	fn hostname_info(config: &Configuration, protocol: Protocol) -> ProviderHostnameInfo {
		ProviderHostnameInfo {
			issuer: config.issuer.clone(),
			all_scopes: config.scopes.merged().normalized(),
			required_scopes: config.scopes.for_protocol(protocol).to_owned(),
		}
	}

	async fn delegate_hostname(
		&self,
		hostname: &str,
		protocol: Protocol,
	) -> Option<ProviderHostnameInfo> {
		match self.original.lookup_by_hostname(hostname, Some(protocol)).await {
			Ok(info) => return info,
			Err(e) => {
				tracing::debug!(protocol = protocol.as_str(), error = %e, "Host lookup failed; retrying with the other protocol.");
			},
		}

		match self.original.lookup_by_hostname(hostname, Some(protocol.other())).await {
			Ok(info) => info,
			Err(e) => {
				tracing::warn!(error = %e, "Host lookup failed for both protocols.");

				None
			},
		}
	}
}
impl HostLookup for AccessorOverride {
	fn lookup_by_hostname<'a>(
		&'a self,
		hostname: &'a str,
		protocol: Option<Protocol>,
	) -> HostFuture<'a, Option<ProviderHostnameInfo>> {
		Box::pin(async move {
			let protocol = protocol.unwrap_or_default();
			let config = self.view.current().await;

			if !config.is_ready() || !config.matches_hostname(hostname) {
				return Ok(self.delegate_hostname(hostname, protocol).await);
			}

			let signature = compute_signature(&config);
			let query = format!("{}|{protocol}", id::fold_case(hostname));
			let (info, lookup) = self.hosts.get_or_insert_with(&signature, query, || {
				Self::hostname_info(&config, protocol)
			});

			if lookup == CacheLookup::Miss {
				tracing::debug!(issuer = %info.issuer, protocol = protocol.as_str(), "Injected provider for hostname.");
			}

			Ok(Some(info))
		})
	}

	fn lookup_by_issuer<'a>(
		&'a self,
		issuer: &'a str,
		protocol: Option<Protocol>,
	) -> HostFuture<'a, Option<ProviderCredentials>> {
		Box::pin(async move {
			let config = self.view.current().await;

			if !config.is_ready() || !config.matches_issuer(issuer) {
				return self.original.lookup_by_issuer(issuer, protocol).await;
			}

			let signature = compute_signature(&config);
			let (mut credentials, lookup) = self
				.issuers
				.get_or_insert_with(&signature, config.issuer.clone(), || {
					ProviderCredentials::from_config(&config)
				});

			if lookup == CacheLookup::Miss {
				tracing::debug!(issuer = %config.issuer, "Injected provider credentials for issuer.");
			}

			credentials.client_secret = config.client_secret.clone();

			Ok(Some(credentials))
		})
	}
}
impl RegistryStrategy for AccessorOverride {
	fn kind(&self) -> StrategyKind {
		StrategyKind::AccessorOverride
	}

	fn synchronize<'a>(&'a self, config: &'a Configuration) -> BoxFuture<'a, bool> {
		Box::pin(async move {
			let ready = config.is_ready();

			if ready {
				tracing::info!(issuer = %config.issuer, "Lookups for the configured provider are overridden.");
			} else {
				tracing::info!("Configuration incomplete; host lookups pass through.");
			}

			ready
		})
	}
}
impl Debug for AccessorOverride {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessorOverride")
			.field("cached_entries", &self.cached_entries())
			.finish_non_exhaustive()
	}
}
