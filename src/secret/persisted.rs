//! Preference-field secret backend.

// self
use crate::{
	_prelude::*,
	secret::{ClientSecret, SecretFuture, SecretKey, SecretMode, SecretStore},
	store::{ConfigStore, PrefValue, StoreError, field},
};

/// Stores the secret in the `clientSecret` configuration field.
///
/// The slot holds one secret at a time. The owning issuer and client identifier are recorded
/// next to it, and the secret is only handed out for that exact key.
#[derive(Clone, Debug)]
pub struct PersistedSecretStore {
	store: ConfigStore,
}
impl PersistedSecretStore {
	/// Wraps the configuration store.
	pub fn new(store: ConfigStore) -> Self {
		Self { store }
	}

	/// Clears the slot regardless of which key owns it.
	pub fn clear(&self) -> Result<(), StoreError> {
		self.store.clear(field::CLIENT_SECRET)?;
		self.store.clear(field::CLIENT_SECRET_ISSUER)?;
		self.store.clear(field::CLIENT_SECRET_CLIENT_ID)
	}

	fn owner(&self) -> Option<(String, String)> {
		let issuer = self.store.read_string(field::CLIENT_SECRET_ISSUER);
		let client_id = self.store.read_string(field::CLIENT_SECRET_CLIENT_ID);

		(!issuer.is_empty() && !client_id.is_empty()).then_some((issuer, client_id))
	}

	fn owned_by(&self, key: &SecretKey) -> bool {
		self.owner().is_some_and(|(issuer, client_id)| {
			issuer == key.issuer.as_ref() && client_id == key.client_id.as_ref()
		})
	}

	fn write(&self, key: &SecretKey, secret: &ClientSecret) -> Result<(), StoreError> {
		// The secret goes in last so a half-finished write never pairs it with a stale owner.
		self.store.clear(field::CLIENT_SECRET)?;
		self.store.write(field::CLIENT_SECRET_ISSUER, PrefValue::from(key.issuer.as_ref()), true)?;
		self.store.write(
			field::CLIENT_SECRET_CLIENT_ID,
			PrefValue::from(key.client_id.as_ref()),
			true,
		)?;
		self.store.write(field::CLIENT_SECRET, PrefValue::from(secret.expose()), true)?;

		Ok(())
	}
}
impl SecretStore for PersistedSecretStore {
	fn mode(&self) -> SecretMode {
		SecretMode::Persisted
	}

	fn save<'a>(
		&'a self,
		key: &'a SecretKey,
		secret: Option<&'a ClientSecret>,
	) -> SecretFuture<'a, Result<(), StoreError>> {
		Box::pin(async move {
			match secret.filter(|secret| !secret.is_blank()) {
				Some(secret) => self.write(key, secret),
				None if self.owner().is_none() || self.owned_by(key) => self.clear(),
				None => Ok(()),
			}
		})
	}

	fn load<'a>(&'a self, key: &'a SecretKey) -> SecretFuture<'a, Option<ClientSecret>> {
		Box::pin(async move {
			if !self.owned_by(key) {
				return None;
			}

			Some(ClientSecret::new(self.store.read_string(field::CLIENT_SECRET)))
				.filter(|secret| !secret.is_blank())
		})
	}

	fn delete<'a>(&'a self, key: &'a SecretKey) -> SecretFuture<'a, ()> {
		Box::pin(async move {
			// Another key's secret stays; an unowned slot is cleared.
			if self.owner().is_some() && !self.owned_by(key) {
				return;
			}
			if let Err(e) = self.clear() {
				tracing::warn!(error = %e, "Failed to clear persisted client secret.");
			}
		})
	}
}
