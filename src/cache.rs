//! Configuration signatures and the lookup cache keyed by them.
//!
//! A signature is a stable digest of every field that shapes what the host sees. When the
//! operator changes any of them, the signature changes and previously cached entries stop
//! matching without explicit invalidation.

// crates.io
use base64::{Engine, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, config::Configuration};

/// Digest of the fields of a [`Configuration`] that affect host lookups.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigSignature(String);
impl ConfigSignature {
	/// Encoded digest.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for ConfigSignature {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Whether a cache lookup found an existing entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheLookup {
	/// The entry was already cached.
	Hit,
	/// The entry was built and inserted by this lookup.
	Miss,
}

/// Computes the signature of `config`.
///
/// Covers hostnames, issuer, client id, both endpoints, the redirect URI, the PKCE flag, and both
/// scope strings. The client secret is deliberately excluded. Each field is length-prefixed
/// before hashing so no two distinct field tuples share an input.
pub fn compute_signature(config: &Configuration) -> ConfigSignature {
	let hostnames = config.hostnames.join(",");
	let use_pkce = if config.use_pkce { "true" } else { "false" };
	let fields: [&str; 9] = [
		&hostnames,
		&config.issuer,
		&config.client_id,
		&config.authorization_endpoint,
		&config.token_endpoint,
		&config.redirect_uri,
		use_pkce,
		&config.scopes.imap,
		&config.scopes.smtp,
	];
	let mut hasher = Sha256::new();

	for field in fields {
		hasher.update(field.len().to_string().as_bytes());
		hasher.update(b":");
		hasher.update(field.as_bytes());
		hasher.update(b"|");
	}

	ConfigSignature(STANDARD_NO_PAD.encode(hasher.finalize()))
}

type CacheKey = (ConfigSignature, String);

/// Memoizes derived lookup results per `(signature, query)`.
///
/// Without a capacity the cache grows with the number of distinct queries. With one, reaching it
/// drops every entry whose signature differs from the incoming one, and then the whole map if it
/// is still full.
#[derive(Debug)]
pub struct SignatureCache<V> {
	entries: Mutex<HashMap<CacheKey, V>>,
	capacity: Option<usize>,
}
impl<V> SignatureCache<V>
where
	V: Clone,
{
	/// Creates an unbounded cache.
	pub fn new() -> Self {
		Self { entries: Mutex::new(HashMap::new()), capacity: None }
	}

	/// Creates a cache holding at most `capacity` entries.
	pub fn with_capacity(capacity: usize) -> Self {
		Self { entries: Mutex::new(HashMap::new()), capacity: Some(capacity.max(1)) }
	}

	/// Returns the cached value, if any.
	pub fn get(&self, signature: &ConfigSignature, query: &str) -> Option<V> {
		self.entries.lock().get(&(signature.clone(), query.to_owned())).cloned()
	}

	/// Stores `value` under `(signature, query)`.
	pub fn put(&self, signature: &ConfigSignature, query: impl Into<String>, value: V) {
		let mut entries = self.entries.lock();

		self.make_room(&mut entries, signature);
		entries.insert((signature.clone(), query.into()), value);
	}

	/// Returns the cached value or builds, stores, and returns a new one.
	pub fn get_or_insert_with<F>(
		&self,
		signature: &ConfigSignature,
		query: impl Into<String>,
		build: F,
	) -> (V, CacheLookup)
	where
		F: FnOnce() -> V,
	{
		let key = (signature.clone(), query.into());
		let mut entries = self.entries.lock();

		if let Some(value) = entries.get(&key) {
			return (value.clone(), CacheLookup::Hit);
		}

		let value = build();

		self.make_room(&mut entries, signature);
		entries.insert(key, value.clone());

		(value, CacheLookup::Miss)
	}

	/// Number of cached entries.
	pub fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Returns true when nothing is cached.
	pub fn is_empty(&self) -> bool {
		self.entries.lock().is_empty()
	}

	/// Drops every entry.
	pub fn clear(&self) {
		self.entries.lock().clear();
	}

	fn make_room(&self, entries: &mut HashMap<CacheKey, V>, incoming: &ConfigSignature) {
		let Some(capacity) = self.capacity else {
			return;
		};

		if entries.len() < capacity {
			return;
		}

		entries.retain(|(signature, _), _| signature == incoming);

		if entries.len() >= capacity {
			entries.clear();
		}
	}
}
impl<V> Default for SignatureCache<V>
where
	V: Clone,
{
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::config::{ConfigDocument, Scopes};

	fn config() -> Configuration {
		Configuration {
			hostnames: vec!["mail.example.com".into()],
			issuer: "example".into(),
			client_id: "abc".into(),
			client_secret: None,
			authorization_endpoint: "https://example.com/auth".into(),
			token_endpoint: "https://example.com/token".into(),
			redirect_uri: "https://example.com/redirect".into(),
			use_pkce: true,
			scopes: Scopes { imap: "a".into(), smtp: "b".into() },
		}
	}

	#[test]
	fn every_covered_field_changes_the_signature() {
		let base = compute_signature(&config());
		let mutations: [fn(&mut Configuration); 9] = [
			|c| c.hostnames.push("smtp.example.com".into()),
			|c| c.issuer.push('x'),
			|c| c.client_id.push('x'),
			|c| c.authorization_endpoint.push('x'),
			|c| c.token_endpoint.push('x'),
			|c| c.redirect_uri.push('x'),
			|c| c.use_pkce = false,
			|c| c.scopes.imap.push('x'),
			|c| c.scopes.smtp.push('x'),
		];

		for mutate in mutations {
			let mut changed = config();

			mutate(&mut changed);

			assert_ne!(compute_signature(&changed), base);
		}
	}

	#[test]
	fn secret_and_document_field_order_do_not_affect_the_signature() {
		let mut with_secret = config();

		with_secret.client_secret = Some(crate::secret::ClientSecret::new("s3cr3t"));

		assert_eq!(compute_signature(&with_secret), compute_signature(&config()));

		let first = json!({
			"hostname": "mail.example.com", "issuer": "example", "clientId": "abc",
			"authorizationEndpoint": "https://a", "tokenEndpoint": "https://t",
			"redirectUri": "https://r"
		});
		let second = json!({
			"redirectUri": "https://r", "tokenEndpoint": "https://t",
			"authorizationEndpoint": "https://a", "clientId": "abc", "issuer": "example",
			"hostname": "mail.example.com"
		});
		let first = ConfigDocument::from_value(&first).expect("First document should be valid.");
		let second = ConfigDocument::from_value(&second).expect("Second document should be valid.");

		assert_eq!(
			compute_signature(&Configuration::from_document(&first)),
			compute_signature(&Configuration::from_document(&second)),
		);
	}

	#[test]
	fn adjacent_fields_cannot_collide() {
		let mut left = config();
		let mut right = config();

		left.issuer = "ab".into();
		left.client_id = "c".into();
		right.issuer = "a".into();
		right.client_id = "bc".into();

		assert_ne!(compute_signature(&left), compute_signature(&right));
	}

	#[test]
	fn get_or_insert_builds_once() {
		let cache = SignatureCache::new();
		let signature = compute_signature(&config());
		let (first, lookup) = cache.get_or_insert_with(&signature, "mail.example.com", || 1);

		assert_eq!((first, lookup), (1, CacheLookup::Miss));

		let (second, lookup) = cache.get_or_insert_with(&signature, "mail.example.com", || 2);

		assert_eq!((second, lookup), (1, CacheLookup::Hit));
		assert_eq!(cache.get(&signature, "mail.example.com"), Some(1));
	}

	#[test]
	fn capacity_evicts_stale_signatures_first() {
		let cache = SignatureCache::with_capacity(2);
		let old = compute_signature(&config());
		let mut changed = config();

		changed.issuer = "other".into();

		let new = compute_signature(&changed);

		cache.put(&old, "a", 1);
		cache.put(&old, "b", 2);
		cache.put(&new, "a", 3);

		assert_eq!(cache.len(), 1);
		assert_eq!(cache.get(&old, "a"), None);
		assert_eq!(cache.get(&new, "a"), Some(3));
	}
}
