//! Read side of the configuration: the record the registry adapter sees.

// self
use crate::{
	_prelude::*,
	config::{Configuration, Scopes, parse_hostnames},
	id,
	secret::SecretBackends,
	store::{ConfigStore, field},
};

/// Reassembles the active [`Configuration`] from the field store and the secret backends.
///
/// Reads and applies share one async lock, so a reader never observes a half-written document.
#[derive(Clone, Debug)]
pub struct ActiveView {
	store: ConfigStore,
	secrets: Arc<SecretBackends>,
	epoch: Arc<AsyncMutex<()>>,
}
impl ActiveView {
	/// Builds a view over the provided stores.
	pub fn new(store: ConfigStore, secrets: Arc<SecretBackends>) -> Self {
		Self { store, secrets, epoch: Arc::new(AsyncMutex::new(())) }
	}

	/// Field store backing this view.
	pub fn store(&self) -> &ConfigStore {
		&self.store
	}

	/// Secret backends backing this view.
	pub fn secrets(&self) -> &SecretBackends {
		&self.secrets
	}

	/// Reads the current configuration.
	pub async fn current(&self) -> Configuration {
		let _epoch = self.epoch.lock().await;

		self.read_unlocked().await
	}

	pub(crate) async fn lock_epoch(&self) -> async_lock::MutexGuard<'_, ()> {
		self.epoch.lock().await
	}

	async fn read_unlocked(&self) -> Configuration {
		let mut config = Configuration {
			hostnames: parse_hostnames(&self.store.read_string(field::HOSTNAME)),
			issuer: id::fold_case(&self.store.read_string(field::ISSUER)),
			client_id: self.store.read_string(field::CLIENT_ID),
			client_secret: None,
			authorization_endpoint: self.store.read_string(field::AUTHORIZATION_ENDPOINT),
			token_endpoint: self.store.read_string(field::TOKEN_ENDPOINT),
			redirect_uri: self.store.read_string(field::REDIRECT_URI),
			use_pkce: self.store.read_bool(field::USE_PKCE),
			scopes: Scopes {
				imap: self.store.read_string(field::SCOPES_IMAP),
				smtp: self.store.read_string(field::SCOPES_SMTP),
			},
		};

		if let Ok(key) = config.secret_key() {
			config.client_secret = self.secrets.resolve(&key).await;
		}

		config
	}
}
