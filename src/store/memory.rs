//! Thread-safe in-memory [`PreferenceStore`] for tests and hosts without durable preferences.

// self
use crate::{
	_prelude::*,
	store::{PrefValue, PreferenceStore, StoreError},
};

type PrefMap = Arc<RwLock<HashMap<String, PrefValue>>>;

/// Preference store that keeps values in-process. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryPreferences(PrefMap);
impl MemoryPreferences {
	/// Seeds a store with the provided entries.
	pub fn with_entries<I, K>(entries: I) -> Self
	where
		I: IntoIterator<Item = (K, PrefValue)>,
		K: Into<String>,
	{
		let map = entries.into_iter().map(|(key, value)| (key.into(), value)).collect();

		Self(Arc::new(RwLock::new(map)))
	}

	/// Number of stored keys.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl PreferenceStore for MemoryPreferences {
	fn get(&self, key: &str) -> Result<Option<PrefValue>, StoreError> {
		Ok(self.0.read().get(key).cloned())
	}

	fn set(&self, key: &str, value: PrefValue) -> Result<(), StoreError> {
		self.0.write().insert(key.to_owned(), value);

		Ok(())
	}

	fn clear(&self, key: &str) -> Result<(), StoreError> {
		self.0.write().remove(key);

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn clones_share_state() {
		let prefs = MemoryPreferences::default();
		let clone = prefs.clone();

		prefs.set_string("a", "1").expect("Write should succeed.");

		assert_eq!(clone.get_string("a").expect("Read should succeed.").as_deref(), Some("1"));

		clone.clear("a").expect("Clear should succeed.");
		clone.clear("missing").expect("Clearing a missing key should succeed.");

		assert!(prefs.is_empty());
	}

	#[test]
	fn seeded_entries_are_visible() {
		let prefs = MemoryPreferences::with_entries([("flag", PrefValue::Bool(true))]);

		assert_eq!(prefs.get_bool("flag").expect("Read should succeed."), Some(true));
		assert_eq!(prefs.len(), 1);
	}
}
