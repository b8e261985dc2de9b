//! Host credential-vault secret backend.

// self
use crate::{
	_prelude::*,
	secret::{ClientSecret, SecretFuture, SecretKey, SecretMode, SecretStore},
	store::StoreError,
};

/// Realm under which client secrets are filed in the host vault.
pub const DEFAULT_REALM: &str = "oauth2-override:client-secret";

/// One credential entry as the host vault stores it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VaultCredential {
	/// Entry username; the OAuth client identifier.
	pub username: String,
	/// Entry password; the client secret.
	pub secret: ClientSecret,
}

/// Credential vault exposed by the host, addressed by origin and realm.
pub trait CredentialVault
where
	Self: Send + Sync,
{
	/// Lists every credential filed under `origin` and `realm`.
	fn find(&self, origin: &str, realm: &str) -> Result<Vec<VaultCredential>, StoreError>;

	/// Files a new credential.
	fn add(&self, origin: &str, realm: &str, credential: VaultCredential) -> Result<(), StoreError>;

	/// Removes the credential filed for `username`.
	fn remove(&self, origin: &str, realm: &str, username: &str) -> Result<(), StoreError>;
}

/// In-process [`CredentialVault`] for tests and hosts without a system keyring.
#[derive(Debug, Default)]
pub struct MemoryVault(RwLock<HashMap<(String, String), Vec<VaultCredential>>>);
impl MemoryVault {
	/// Total number of filed credentials.
	pub fn len(&self) -> usize {
		self.0.read().values().map(Vec::len).sum()
	}

	/// Returns true when the vault holds no credentials.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
impl CredentialVault for MemoryVault {
	fn find(&self, origin: &str, realm: &str) -> Result<Vec<VaultCredential>, StoreError> {
		Ok(self
			.0
			.read()
			.get(&(origin.to_owned(), realm.to_owned()))
			.cloned()
			.unwrap_or_default())
	}

	fn add(&self, origin: &str, realm: &str, credential: VaultCredential) -> Result<(), StoreError> {
		let mut guard = self.0.write();
		let entries = guard.entry((origin.to_owned(), realm.to_owned())).or_default();

		if entries.iter().any(|entry| entry.username == credential.username) {
			return Err(StoreError::Backend {
				message: format!("A credential for {} already exists at {origin}", credential.username),
			});
		}

		entries.push(credential);

		Ok(())
	}

	fn remove(&self, origin: &str, realm: &str, username: &str) -> Result<(), StoreError> {
		let mut guard = self.0.write();
		let key = (origin.to_owned(), realm.to_owned());

		if let Some(entries) = guard.get_mut(&key) {
			entries.retain(|entry| entry.username != username);

			if entries.is_empty() {
				guard.remove(&key);
			}
		}

		Ok(())
	}
}

/// Secret backend delegating to the host's [`CredentialVault`].
///
/// Entries are filed under origin `oauth://{issuer}` with the client identifier as username.
/// Hosts without a vault get [`StoreError::BackendUnavailable`] on save and absence on load.
#[derive(Clone)]
pub struct VaultSecretStore {
	vault: Option<Arc<dyn CredentialVault>>,
	realm: String,
}
impl VaultSecretStore {
	/// Wraps an optional host vault using [`DEFAULT_REALM`].
	pub fn new(vault: Option<Arc<dyn CredentialVault>>) -> Self {
		Self::with_realm(vault, DEFAULT_REALM)
	}

	/// Wraps an optional host vault filing entries under `realm`.
	pub fn with_realm(vault: Option<Arc<dyn CredentialVault>>, realm: impl Into<String>) -> Self {
		Self { vault, realm: realm.into() }
	}

	/// Returns true when the host provides a vault.
	pub fn is_available(&self) -> bool {
		self.vault.is_some()
	}

	/// Origin the entries for `key` are filed under.
	pub fn origin(key: &SecretKey) -> String {
		format!("oauth://{}", key.issuer)
	}

	fn require(&self) -> Result<&Arc<dyn CredentialVault>, StoreError> {
		self.vault.as_ref().ok_or_else(|| StoreError::BackendUnavailable {
			backend: SecretMode::Vault.as_str().to_owned(),
		})
	}

	fn remove_existing(
		&self,
		vault: &dyn CredentialVault,
		origin: &str,
		key: &SecretKey,
	) -> Result<(), StoreError> {
		for entry in vault.find(origin, &self.realm)? {
			if entry.username == key.client_id.as_ref() {
				vault.remove(origin, &self.realm, &entry.username)?;
			}
		}

		Ok(())
	}
}
impl Debug for VaultSecretStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("VaultSecretStore")
			.field("available", &self.is_available())
			.field("realm", &self.realm)
			.finish()
	}
}
impl SecretStore for VaultSecretStore {
	fn mode(&self) -> SecretMode {
		SecretMode::Vault
	}

	fn save<'a>(
		&'a self,
		key: &'a SecretKey,
		secret: Option<&'a ClientSecret>,
	) -> SecretFuture<'a, Result<(), StoreError>> {
		Box::pin(async move {
			let vault = self.require()?;
			let origin = Self::origin(key);

			if let Err(e) = self.remove_existing(vault.as_ref(), &origin, key) {
				tracing::warn!(origin = %origin, error = %e, "Failed to remove previous vault entry.");
			}

			match secret.filter(|secret| !secret.is_blank()) {
				Some(secret) => vault.add(
					&origin,
					&self.realm,
					VaultCredential { username: key.client_id.to_string(), secret: secret.clone() },
				),
				None => Ok(()),
			}
		})
	}

	fn load<'a>(&'a self, key: &'a SecretKey) -> SecretFuture<'a, Option<ClientSecret>> {
		Box::pin(async move {
			let vault = self.vault.as_ref()?;
			let origin = Self::origin(key);

			match vault.find(&origin, &self.realm) {
				Ok(entries) => entries
					.into_iter()
					.find(|entry| entry.username == key.client_id.as_ref())
					.map(|entry| entry.secret)
					.filter(|secret| !secret.is_blank()),
				Err(e) => {
					tracing::warn!(origin = %origin, error = %e, "Vault lookup failed.");

					None
				},
			}
		})
	}

	fn delete<'a>(&'a self, key: &'a SecretKey) -> SecretFuture<'a, ()> {
		Box::pin(async move {
			let Some(vault) = self.vault.as_ref() else {
				return;
			};
			let origin = Self::origin(key);

			if let Err(e) = self.remove_existing(vault.as_ref(), &origin, key) {
				tracing::warn!(origin = %origin, error = %e, "Failed to delete vault entry.");
			}
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn key() -> SecretKey {
		SecretKey::new("Example", "abc").expect("Secret key fixture should be valid.")
	}

	#[tokio::test]
	async fn entries_are_filed_under_issuer_origin() {
		let vault = Arc::new(MemoryVault::default());
		let store = VaultSecretStore::new(Some(vault.clone()));
		let key = key();

		store.save(&key, Some(&ClientSecret::new("one"))).await.expect("First save should work.");
		store.save(&key, Some(&ClientSecret::new("two"))).await.expect("Second save should work.");

		let entries =
			vault.find("oauth://example", DEFAULT_REALM).expect("Vault find should succeed.");

		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].username, "abc");
		assert_eq!(store.load(&key).await, Some(ClientSecret::new("two")));

		store.delete(&key).await;

		assert!(vault.is_empty());
	}

	#[tokio::test]
	async fn missing_vault_is_unavailable() {
		let store = VaultSecretStore::new(None);
		let key = key();
		let result = store.save(&key, Some(&ClientSecret::new("s3cr3t"))).await;

		assert_eq!(result, Err(StoreError::BackendUnavailable { backend: "login".into() }));
		assert_eq!(store.load(&key).await, None);

		store.delete(&key).await;
	}
}
