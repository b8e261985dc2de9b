//! Process-memory secret backend.

// self
use crate::{
	_prelude::*,
	secret::{ClientSecret, SecretFuture, SecretKey, SecretMode, SecretStore},
	store::StoreError,
};

/// Keeps secrets in memory only; everything is lost when the process exits.
#[derive(Debug, Default)]
pub struct EphemeralSecretStore(RwLock<HashMap<SecretKey, ClientSecret>>);
impl EphemeralSecretStore {
	/// Forgets every held secret.
	pub fn clear_all(&self) {
		self.0.write().clear();
	}

	/// Number of held secrets.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true when no secret is held.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl SecretStore for EphemeralSecretStore {
	fn mode(&self) -> SecretMode {
		SecretMode::Ephemeral
	}

	fn save<'a>(
		&'a self,
		key: &'a SecretKey,
		secret: Option<&'a ClientSecret>,
	) -> SecretFuture<'a, Result<(), StoreError>> {
		Box::pin(async move {
			let mut guard = self.0.write();

			match secret.filter(|secret| !secret.is_blank()) {
				Some(secret) => guard.insert(key.clone(), secret.clone()),
				None => guard.remove(key),
			};

			Ok(())
		})
	}

	fn load<'a>(&'a self, key: &'a SecretKey) -> SecretFuture<'a, Option<ClientSecret>> {
		Box::pin(async move { self.0.read().get(key).cloned() })
	}

	fn delete<'a>(&'a self, key: &'a SecretKey) -> SecretFuture<'a, ()> {
		Box::pin(async move {
			self.0.write().remove(key);
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn blank_save_deletes_entry() {
		let store = EphemeralSecretStore::default();
		let key = SecretKey::new("example", "abc").expect("Secret key fixture should be valid.");

		store.save(&key, Some(&ClientSecret::new("s3cr3t"))).await.expect("Save should succeed.");

		assert_eq!(store.len(), 1);

		store.save(&key, Some(&ClientSecret::new("  "))).await.expect("Save should succeed.");

		assert!(store.is_empty());
		assert_eq!(store.load(&key).await, None);
	}
}
