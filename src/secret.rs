//! Client secret storage with interchangeable backends.
//!
//! Exactly one backend holds a given secret at a time: [`SecretBackends::save_exclusive`] writes
//! to the selected backend and then clears the other two.

pub mod ephemeral;
pub mod persisted;
pub mod vault;

pub use ephemeral::EphemeralSecretStore;
pub use persisted::PersistedSecretStore;
pub use vault::{CredentialVault, MemoryVault, VaultCredential, VaultSecretStore};

// self
use crate::{
	_prelude::*,
	id::{ClientId, IdentifierError, Issuer},
	store::{ConfigStore, StoreError},
};

/// Boxed future returned by [`SecretStore`] operations.
pub type SecretFuture<'a, T> = BoxFuture<'a, T>;

/// Redacted client secret wrapper keeping sensitive material out of logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientSecret(String);
impl ClientSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner secret. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Empty or whitespace-only secrets mean "no secret".
	pub fn is_blank(&self) -> bool {
		self.0.trim().is_empty()
	}
}
impl AsRef<str> for ClientSecret {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for ClientSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ClientSecret").field(&"<redacted>").finish()
	}
}
impl Display for ClientSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Where a client secret is kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecretMode {
	/// Plain preference field that survives restarts.
	#[default]
	#[serde(rename = "prefs", alias = "persisted")]
	Persisted,
	/// Process memory only; lost on restart.
	#[serde(rename = "memory", alias = "ephemeral")]
	Ephemeral,
	/// Host credential vault.
	#[serde(rename = "login", alias = "vault")]
	Vault,
}
impl SecretMode {
	/// Every mode, in resolution order.
	pub const ALL: [SecretMode; 3] = [SecretMode::Persisted, SecretMode::Ephemeral, SecretMode::Vault];

	/// Returns the settings label for this mode.
	pub const fn as_str(self) -> &'static str {
		match self {
			SecretMode::Persisted => "prefs",
			SecretMode::Ephemeral => "memory",
			SecretMode::Vault => "login",
		}
	}
}
impl Display for SecretMode {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
impl FromStr for SecretMode {
	type Err = SecretModeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"prefs" | "persisted" => Ok(Self::Persisted),
			"memory" | "ephemeral" => Ok(Self::Ephemeral),
			"login" | "vault" => Ok(Self::Vault),
			_ => Err(SecretModeError { value: s.to_owned() }),
		}
	}
}

/// Error returned when a secret mode label is not recognized.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Unknown secret mode `{value}`.")]
pub struct SecretModeError {
	/// Rejected label.
	pub value: String,
}

/// Identifies a stored secret by normalized issuer and client identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretKey {
	/// Issuer the secret belongs to.
	pub issuer: Issuer,
	/// Client identifier the secret belongs to.
	pub client_id: ClientId,
}
impl SecretKey {
	/// Builds a key, normalizing both components.
	pub fn new(issuer: impl AsRef<str>, client_id: impl AsRef<str>) -> Result<Self, IdentifierError> {
		Ok(Self { issuer: Issuer::new(issuer)?, client_id: ClientId::new(client_id)? })
	}
}

/// Storage contract shared by every secret backend.
///
/// Saving `None` or a blank secret deletes the entry. Load failures are logged by the backend
/// and reported as absence.
pub trait SecretStore
where
	Self: Send + Sync,
{
	/// Mode this backend implements.
	fn mode(&self) -> SecretMode;

	/// Stores (or clears) the secret for `key`.
	fn save<'a>(
		&'a self,
		key: &'a SecretKey,
		secret: Option<&'a ClientSecret>,
	) -> SecretFuture<'a, Result<(), StoreError>>;

	/// Loads the secret for `key`.
	fn load<'a>(&'a self, key: &'a SecretKey) -> SecretFuture<'a, Option<ClientSecret>>;

	/// Deletes the secret for `key`. Failures are logged.
	fn delete<'a>(&'a self, key: &'a SecretKey) -> SecretFuture<'a, ()>;
}

/// The three secret backends, addressed by [`SecretMode`].
#[derive(Clone, Debug)]
pub struct SecretBackends {
	persisted: Arc<PersistedSecretStore>,
	ephemeral: Arc<EphemeralSecretStore>,
	vault: Arc<VaultSecretStore>,
}
impl SecretBackends {
	/// Wires the backends over `store` and an optional host vault.
	pub fn new(store: ConfigStore, vault: VaultSecretStore) -> Self {
		Self {
			persisted: Arc::new(PersistedSecretStore::new(store)),
			ephemeral: Arc::new(EphemeralSecretStore::default()),
			vault: Arc::new(vault),
		}
	}

	/// Backend implementing `mode`.
	pub fn backend(&self, mode: SecretMode) -> &dyn SecretStore {
		match mode {
			SecretMode::Persisted => self.persisted.as_ref(),
			SecretMode::Ephemeral => self.ephemeral.as_ref(),
			SecretMode::Vault => self.vault.as_ref(),
		}
	}

	/// Persisted backend.
	pub fn persisted(&self) -> &PersistedSecretStore {
		&self.persisted
	}

	/// Ephemeral backend.
	pub fn ephemeral(&self) -> &EphemeralSecretStore {
		&self.ephemeral
	}

	/// Vault backend.
	pub fn vault(&self) -> &VaultSecretStore {
		&self.vault
	}

	/// Saves to the `target` backend, then clears `key` from the other two.
	///
	/// The other backends are cleared even when the target save fails; the target's result is
	/// returned.
	pub async fn save_exclusive(
		&self,
		target: SecretMode,
		key: &SecretKey,
		secret: Option<&ClientSecret>,
	) -> Result<(), StoreError> {
		let result = self.backend(target).save(key, secret).await;

		for mode in SecretMode::ALL.into_iter().filter(|mode| *mode != target) {
			self.backend(mode).delete(key).await;
		}

		result
	}

	/// Looks up a secret in resolution order: persisted, ephemeral, then vault.
	pub async fn resolve(&self, key: &SecretKey) -> Option<ClientSecret> {
		for mode in SecretMode::ALL {
			if let Some(secret) = self.backend(mode).load(key).await {
				return Some(secret);
			}
		}

		None
	}

	/// Deletes `key` from every backend.
	pub async fn delete_all(&self, key: &SecretKey) {
		for mode in SecretMode::ALL {
			self.backend(mode).delete(key).await;
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::MemoryPreferences;

	fn backends(vault: Option<Arc<dyn CredentialVault>>) -> SecretBackends {
		let store = ConfigStore::with_default_namespace(Arc::new(MemoryPreferences::default()));

		SecretBackends::new(store, VaultSecretStore::new(vault))
	}

	fn key() -> SecretKey {
		SecretKey::new("Example", "abc").expect("Secret key fixture should be valid.")
	}

	#[test]
	fn secret_formatters_redact() {
		let secret = ClientSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "ClientSecret(\"<redacted>\")");
		assert_eq!(format!("{secret}"), "<redacted>");
	}

	#[test]
	fn secret_modes_parse_both_label_styles() {
		assert_eq!("login".parse::<SecretMode>(), Ok(SecretMode::Vault));
		assert_eq!(" Ephemeral ".parse::<SecretMode>(), Ok(SecretMode::Ephemeral));
		assert_eq!("prefs".parse::<SecretMode>(), Ok(SecretMode::Persisted));
		assert!("keychain".parse::<SecretMode>().is_err());

		let mode: SecretMode =
			serde_json::from_str("\"vault\"").expect("Alias should deserialize.");

		assert_eq!(mode, SecretMode::Vault);
		assert_eq!(
			serde_json::to_string(&SecretMode::Ephemeral).expect("Mode should serialize."),
			"\"memory\"",
		);
	}

	#[tokio::test]
	async fn save_exclusive_leaves_exactly_one_holder() {
		let backends = backends(Some(Arc::new(MemoryVault::default())));
		let key = key();
		let secret = ClientSecret::new("s3cr3t");

		for target in SecretMode::ALL {
			backends
				.save_exclusive(target, &key, Some(&secret))
				.await
				.expect("Saving to an available backend should succeed.");

			for mode in SecretMode::ALL {
				let held = backends.backend(mode).load(&key).await;

				assert_eq!(held.is_some(), mode == target, "Backend {mode} after saving to {target}.");
			}
		}
	}

	#[tokio::test]
	async fn vault_failure_still_clears_other_backends() {
		let backends = backends(None);
		let key = key();
		let secret = ClientSecret::new("s3cr3t");

		backends
			.save_exclusive(SecretMode::Persisted, &key, Some(&secret))
			.await
			.expect("Persisted save should succeed.");

		let result = backends.save_exclusive(SecretMode::Vault, &key, Some(&secret)).await;

		assert!(matches!(result, Err(StoreError::BackendUnavailable { .. })));
		assert_eq!(backends.resolve(&key).await, None);
	}

	#[tokio::test]
	async fn resolve_prefers_persisted_then_ephemeral() {
		let backends = backends(Some(Arc::new(MemoryVault::default())));
		let key = key();

		backends
			.backend(SecretMode::Vault)
			.save(&key, Some(&ClientSecret::new("from-vault")))
			.await
			.expect("Vault save should succeed.");
		backends
			.backend(SecretMode::Ephemeral)
			.save(&key, Some(&ClientSecret::new("from-memory")))
			.await
			.expect("Ephemeral save should succeed.");

		assert_eq!(backends.resolve(&key).await, Some(ClientSecret::new("from-memory")));

		backends.delete_all(&key).await;

		assert_eq!(backends.resolve(&key).await, None);
	}
}
