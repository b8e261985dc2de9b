//! Writes validated configuration documents to the field store and the secret backends.

// self
use crate::{
	_prelude::*,
	config::{ActiveView, ConfigDocument},
	obs::{self, OperationKind, OperationOutcome, OperationSpan},
	secret::{ClientSecret, SecretKey, SecretMode, SecretStore},
	store::{PrefValue, StoreError, field},
};

/// How a document is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApplyOptions {
	/// Overwrite fields that already hold a value.
	pub force: bool,
	/// Backend that receives the client secret.
	pub secret_mode: SecretMode,
}
impl ApplyOptions {
	/// Overwriting apply with the secret sent to `secret_mode`.
	pub fn forced(secret_mode: SecretMode) -> Self {
		Self { force: true, secret_mode }
	}
}

/// What happened to the client secret during an apply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SecretOutcome {
	/// The document carried no `clientSecret` key.
	#[default]
	Untouched,
	/// The secret was stored in the given backend and cleared from the others.
	Stored(SecretMode),
	/// The document carried an empty secret; every backend was cleared.
	Cleared(SecretMode),
	/// The backend rejected the secret; the other backends were still cleared.
	Failed(SecretMode),
}

/// Summary of a successful apply.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
	/// Fields that were written.
	pub written: Vec<&'static str>,
	/// Fields left untouched because they already held a value.
	pub skipped: Vec<&'static str>,
	/// Secret handling result.
	pub secret: SecretOutcome,
}

/// Applies configuration documents.
#[derive(Clone, Debug)]
pub struct ConfigApplier {
	view: ActiveView,
}
impl ConfigApplier {
	/// Creates an applier writing through `view`'s stores.
	pub fn new(view: ActiveView) -> Self {
		Self { view }
	}

	/// View the applier writes through.
	pub fn view(&self) -> &ActiveView {
		&self.view
	}

	/// Validates `raw` and applies it. Nothing is written when validation fails.
	pub async fn apply(&self, raw: &JsonValue, options: ApplyOptions) -> Result<ApplyReport> {
		let document = ConfigDocument::from_value(raw).inspect_err(|e| {
			tracing::warn!(error = %e, "Rejected configuration document.");
			obs::record_operation_outcome(OperationKind::Apply, OperationOutcome::Failure);
		})?;

		self.apply_document(&document, options).await
	}

	/// Applies an already validated document.
	pub async fn apply_document(
		&self,
		document: &ConfigDocument,
		options: ApplyOptions,
	) -> Result<ApplyReport> {
		const KIND: OperationKind = OperationKind::Apply;

		obs::record_operation_outcome(KIND, OperationOutcome::Attempt);

		let span = OperationSpan::new(KIND, "apply_document");
		let result = span.instrument(self.apply_locked(document, options)).await;

		obs::record_operation_outcome(KIND, OperationOutcome::from_success(result.is_ok()));

		result
	}

	/// Deletes the secret of the stored issuer and client from every backend.
	pub async fn reset_secret(&self) {
		let _epoch = self.view.lock_epoch().await;
		let secrets = self.view.secrets();

		match self.stored_key() {
			Some(key) => secrets.delete_all(&key).await,
			None => {
				if let Err(e) = secrets.persisted().clear() {
					tracing::warn!(error = %e, "Failed to clear persisted client secret.");
				}

				secrets.ephemeral().clear_all();
			},
		}

		tracing::info!("Client secret reset.");
	}

	/// Asks the vault for the stored secret so the host can prompt for its primary password.
	///
	/// Returns whether a vault is present and a key is configured.
	pub async fn unlock_secret(&self) -> bool {
		let Some(key) = self.stored_key() else {
			return false;
		};
		let vault = self.view.secrets().vault();

		if !vault.is_available() {
			return false;
		}

		vault.load(&key).await;

		true
	}

	async fn apply_locked(
		&self,
		document: &ConfigDocument,
		options: ApplyOptions,
	) -> Result<ApplyReport> {
		let _epoch = self.view.lock_epoch().await;
		let store = self.view.store();
		let fields = document.persisted_fields();
		let previous = fields
			.iter()
			.map(|(field, _)| store.read_raw(field).map(|value| (*field, value)))
			.collect::<Result<Vec<_>, StoreError>>()?;
		let mut report = ApplyReport::default();

		for (field, value) in fields {
			match store.write(field, value, options.force) {
				Ok(true) => report.written.push(field),
				Ok(false) => report.skipped.push(field),
				Err(e) => {
					tracing::warn!(field, error = %e, "Field write failed; rolling back the apply.");

					self.roll_back(previous, &report.written, field);

					return Err(e.into());
				},
			}
		}

		if let Some(secret) = &document.client_secret {
			report.secret = self.store_secret(secret, options.secret_mode).await;
		}

		tracing::info!(
			written = report.written.len(),
			skipped = report.skipped.len(),
			secret = ?report.secret,
			"Configuration applied."
		);

		Ok(report)
	}

	fn roll_back(
		&self,
		previous: Vec<(&'static str, Option<PrefValue>)>,
		written: &[&'static str],
		failed: &'static str,
	) {
		let store = self.view.store();

		for (field, value) in previous.into_iter().rev() {
			if field != failed && !written.contains(&field) {
				continue;
			}
			if let Err(e) = store.restore(field, value) {
				tracing::error!(field, error = %e, "Failed to restore field during rollback.");
			}
		}
	}

	// Keyed by the stored issuer and client so a non-forced apply files the secret under the
	// configuration that is actually active.
	async fn store_secret(&self, secret: &ClientSecret, mode: SecretMode) -> SecretOutcome {
		let Some(key) = self.stored_key() else {
			tracing::warn!("Stored issuer or client identifier is invalid; skipping the secret.");

			return SecretOutcome::Failed(mode);
		};
		let secret = Some(secret).filter(|secret| !secret.is_blank());

		match self.view.secrets().save_exclusive(mode, &key, secret).await {
			Ok(()) if secret.is_some() => SecretOutcome::Stored(mode),
			Ok(()) => SecretOutcome::Cleared(mode),
			Err(e) => {
				tracing::warn!(mode = mode.as_str(), error = %e, "Failed to store client secret.");

				SecretOutcome::Failed(mode)
			},
		}
	}

	fn stored_key(&self) -> Option<SecretKey> {
		let store = self.view.store();

		SecretKey::new(store.read_string(field::ISSUER), store.read_string(field::CLIENT_ID)).ok()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicBool, Ordering};
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::{
		config::ValidationError,
		error::Error,
		secret::{MemoryVault, SecretBackends, VaultSecretStore},
		store::{ConfigStore, MemoryPreferences, PreferenceStore},
	};

	// Fails writes to the token endpoint once armed.
	#[derive(Default)]
	struct FailingPreferences {
		inner: MemoryPreferences,
		armed: AtomicBool,
	}
	impl PreferenceStore for FailingPreferences {
		fn get(&self, key: &str) -> Result<Option<PrefValue>, StoreError> {
			self.inner.get(key)
		}

		fn set(&self, key: &str, value: PrefValue) -> Result<(), StoreError> {
			if self.armed.load(Ordering::Relaxed) && key.ends_with(field::TOKEN_ENDPOINT) {
				return Err(StoreError::Backend { message: "disk full".into() });
			}

			self.inner.set(key, value)
		}

		fn clear(&self, key: &str) -> Result<(), StoreError> {
			self.inner.clear(key)
		}
	}

	fn document() -> JsonValue {
		json!({
			"hostname": "mail.example.com",
			"issuer": "Example",
			"clientId": "abc",
			"clientSecret": "s3cr3t",
			"authorizationEndpoint": "https://example.com/auth",
			"tokenEndpoint": "https://example.com/token",
			"redirectUri": "https://example.com/redirect",
			"usePkce": true,
			"scopes": { "imap": "mail.imap" }
		})
	}

	fn applier(vault: bool) -> (ConfigApplier, Arc<MemoryPreferences>) {
		let prefs = Arc::new(MemoryPreferences::default());
		let store = ConfigStore::with_default_namespace(prefs.clone());
		let vault = vault.then(|| Arc::new(MemoryVault::default()) as Arc<dyn crate::secret::CredentialVault>);
		let secrets = Arc::new(SecretBackends::new(store.clone(), VaultSecretStore::new(vault)));

		(ConfigApplier::new(ActiveView::new(store, secrets)), prefs)
	}

	#[tokio::test]
	async fn invalid_documents_write_nothing() {
		let (applier, prefs) = applier(false);
		let mut raw = document();

		raw["tokenEndpoint"] = json!("");

		let error = applier
			.apply(&raw, ApplyOptions::forced(SecretMode::Persisted))
			.await
			.expect_err("Blank token endpoint should be rejected.");

		assert!(matches!(
			error,
			Error::Validation(ValidationError::MissingField { field: "tokenEndpoint" })
		));
		assert!(prefs.is_empty());
	}

	#[tokio::test]
	async fn non_force_keeps_fields_but_always_writes_secret() {
		let (applier, _) = applier(false);

		applier
			.apply(&document(), ApplyOptions::forced(SecretMode::Persisted))
			.await
			.expect("First apply should succeed.");

		let mut raw = document();

		raw["issuer"] = json!("Changed");
		raw["clientSecret"] = json!("rotated");

		let report = applier
			.apply(&raw, ApplyOptions { force: false, secret_mode: SecretMode::Ephemeral })
			.await
			.expect("Second apply should succeed.");

		assert!(report.written.is_empty());
		assert!(report.skipped.contains(&field::ISSUER));
		assert_eq!(report.secret, SecretOutcome::Stored(SecretMode::Ephemeral));

		let config = applier.view().current().await;

		assert_eq!(config.issuer, "example");
		assert_eq!(config.client_secret, Some(ClientSecret::new("rotated")));

		raw["clientSecret"] = json!("persisted");

		let report = applier
			.apply(&raw, ApplyOptions { force: false, secret_mode: SecretMode::Persisted })
			.await
			.expect("Third apply should succeed.");
		let store = applier.view().store();

		assert_eq!(report.secret, SecretOutcome::Stored(SecretMode::Persisted));
		assert_eq!(store.read_string(field::CLIENT_SECRET_ISSUER), "example");
		assert_eq!(store.read_string(field::CLIENT_SECRET_CLIENT_ID), "abc");
		assert_eq!(
			applier.view().current().await.client_secret,
			Some(ClientSecret::new("persisted"))
		);
	}

	#[tokio::test]
	async fn failed_field_write_restores_the_previous_configuration() {
		let prefs = Arc::new(FailingPreferences::default());
		let store = ConfigStore::with_default_namespace(prefs.clone());
		let secrets = Arc::new(SecretBackends::new(store.clone(), VaultSecretStore::new(None)));
		let applier = ConfigApplier::new(ActiveView::new(store, secrets));

		applier
			.apply(&document(), ApplyOptions::forced(SecretMode::Persisted))
			.await
			.expect("First apply should succeed.");

		let before = applier.view().current().await;
		let mut raw = document();

		raw["issuer"] = json!("Other");
		raw["hostname"] = json!("mail.other.org");
		raw["clientSecret"] = json!("other-secret");
		prefs.armed.store(true, Ordering::Relaxed);

		let error = applier
			.apply(&raw, ApplyOptions::forced(SecretMode::Persisted))
			.await
			.expect_err("Token endpoint write should fail.");

		assert!(matches!(error, Error::Storage(StoreError::Backend { .. })));
		assert_eq!(applier.view().current().await, before);

		let fresh = Arc::new(FailingPreferences::default());
		let store = ConfigStore::with_default_namespace(fresh.clone());
		let secrets = Arc::new(SecretBackends::new(store.clone(), VaultSecretStore::new(None)));
		let applier = ConfigApplier::new(ActiveView::new(store, secrets));

		fresh.armed.store(true, Ordering::Relaxed);

		assert!(applier.apply(&document(), ApplyOptions::forced(SecretMode::Persisted)).await.is_err());
		assert!(fresh.inner.is_empty());
	}

	#[tokio::test]
	async fn unavailable_vault_is_reported_not_fatal() {
		let (applier, _) = applier(false);
		let report = applier
			.apply(&document(), ApplyOptions::forced(SecretMode::Vault))
			.await
			.expect("Apply should succeed without a vault.");

		assert_eq!(report.secret, SecretOutcome::Failed(SecretMode::Vault));
		assert!(applier.view().current().await.is_ready());
		assert_eq!(applier.view().current().await.client_secret, None);
	}

	#[tokio::test]
	async fn reset_and_unlock_use_the_stored_key() {
		let (applier, prefs) = applier(true);

		assert!(!applier.unlock_secret().await);

		applier
			.apply(&document(), ApplyOptions::forced(SecretMode::Vault))
			.await
			.expect("Apply should succeed.");

		assert!(!prefs.has_key("extensions.oauth2_override.clientSecret").expect("Preference lookup should work."));
		assert!(applier.unlock_secret().await);

		applier.reset_secret().await;

		assert_eq!(applier.view().current().await.client_secret, None);
	}
}
