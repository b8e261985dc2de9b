//! Explicit register/unregister strategy.

// self
use crate::{
	_prelude::*,
	config::Configuration,
	registry::{
		HostRegistrar, ProviderRegistration, RegistrationMetrics, RegistryStrategy, StrategyKind,
	},
	store::ConfigStore,
};

/// Pushes the configured provider into a host directory that supports registration.
///
/// The issuer last registered is kept in the `_registeredIssuer` field so a later run (or a
/// different issuer) can remove it before registering again.
pub struct ExplicitRegistration {
	registrar: Arc<dyn HostRegistrar>,
	store: ConfigStore,
	metrics: Arc<RegistrationMetrics>,
}
impl ExplicitRegistration {
	/// Wires the strategy over the host registrar.
	pub fn new(
		registrar: Arc<dyn HostRegistrar>,
		store: ConfigStore,
		metrics: Arc<RegistrationMetrics>,
	) -> Self {
		Self { registrar, store, metrics }
	}

	async fn unregister_quietly(&self, issuer: &str) -> bool {
		match self.registrar.unregister(issuer).await {
			Ok(()) => true,
			Err(e) => {
				tracing::warn!(issuer, error = %e, "Host unregistration failed.");

				false
			},
		}
	}

	async fn register_with_retry(&self, registration: &ProviderRegistration) -> bool {
		let Err(e) = self.registrar.register(registration).await else {
			return true;
		};

		tracing::warn!(issuer = %registration.issuer, error = %e, "Host registration failed; retrying once.");
		self.metrics.record_retry();
		self.unregister_quietly(&registration.issuer).await;

		match self.registrar.register(registration).await {
			Ok(()) => true,
			Err(e) => {
				tracing::warn!(issuer = %registration.issuer, error = %e, "Host registration failed after retry.");

				false
			},
		}
	}
}
impl RegistryStrategy for ExplicitRegistration {
	fn kind(&self) -> StrategyKind {
		StrategyKind::ExplicitRegistration
	}

	fn synchronize<'a>(&'a self, config: &'a Configuration) -> BoxFuture<'a, bool> {
		Box::pin(async move {
			if !config.is_ready() {
				tracing::info!("Configuration incomplete; nothing registered.");

				return false;
			}

			let registration = ProviderRegistration::from_config(config);

			if let Some(previous) = self.store.registered_issuer() {
				self.unregister_quietly(&previous).await;
			}

			self.metrics.record_attempt();

			if !self.register_with_retry(&registration).await {
				self.metrics.record_failure();

				return false;
			}

			if let Err(e) = self.store.set_registered_issuer(&registration.issuer) {
				tracing::warn!(issuer = %registration.issuer, error = %e, "Failed to record registered issuer.");
			}

			self.metrics.record_success();
			tracing::info!(issuer = %registration.issuer, "Provider registered with host.");

			true
		})
	}

	fn shutdown(&self) -> BoxFuture<'_, ()> {
		Box::pin(async move {
			let Some(issuer) = self.store.registered_issuer() else {
				return;
			};

			if !self.unregister_quietly(&issuer).await {
				return;
			}
			if let Err(e) = self.store.clear_registered_issuer() {
				tracing::warn!(issuer = %issuer, error = %e, "Failed to clear registered issuer.");
			}

			tracing::info!(issuer = %issuer, "Provider unregistered from host.");
		})
	}
}
impl Debug for ExplicitRegistration {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ExplicitRegistration")
			.field("store", &self.store)
			.field("metrics", &self.metrics)
			.finish_non_exhaustive()
	}
}
