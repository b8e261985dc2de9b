//! Shared fixtures for integration tests.

#![allow(dead_code)]

// std
use std::{
	net::SocketAddr,
	sync::{Arc, atomic::AtomicUsize},
};
// crates.io
use parking_lot::Mutex;
use serde_json::{Value as JsonValue, json};
// self
use oauth2_override::{
	config::Protocol,
	error::RegistryError,
	http::ReqwestHttpClient,
	registry::{
		HostFuture, HostLookup, HostRegistrar, ProviderCredentials, ProviderDirectory,
		ProviderHostnameInfo, ProviderRegistration,
	},
	reqwest::{Client, redirect::Policy},
};

/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
/// `httpmock` during tests.
pub fn test_reqwest_http_client() -> ReqwestHttpClient {
	let client = Client::builder()
		.danger_accept_invalid_certs(true)
		.danger_accept_invalid_hostnames(true)
		.redirect(Policy::none())
		.build()
		.expect("Failed to build insecure Reqwest client for tests.");

	ReqwestHttpClient::with_client(client)
}

/// HTTPS URL for `path` on the mock server.
pub fn https_url(address: &SocketAddr, path: &str) -> String {
	format!("https://{address}{path}")
}

/// Complete configuration document for `issuer`.
pub fn document(issuer: &str) -> JsonValue {
	json!({
		"hostname": "mail.example.com, smtp.example.com",
		"issuer": issuer,
		"clientId": "abc",
		"authorizationEndpoint": "https://login.example.com/authorize",
		"tokenEndpoint": "https://login.example.com/token",
		"redirectUri": "https://localhost/redirect",
		"usePkce": true,
		"scopes": { "imap": "mail.imap offline_access", "smtp": "mail.smtp offline_access" }
	})
}

/// Host call observed by [`RecordingHost`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostCall {
	Register(String),
	Unregister(String),
	HostnameLookup(String, Option<Protocol>),
	IssuerLookup(String),
}

/// Host directory double that records every call and answers lookups with "unknown".
#[derive(Default)]
pub struct RecordingHost {
	pub calls: Mutex<Vec<HostCall>>,
	pub registrations: Mutex<Vec<ProviderRegistration>>,
	pub rejections_left: AtomicUsize,
}
impl RecordingHost {
	pub fn calls(&self) -> Vec<HostCall> {
		self.calls.lock().clone()
	}

	pub fn count(&self, predicate: impl Fn(&HostCall) -> bool) -> usize {
		self.calls.lock().iter().filter(|call| predicate(call)).count()
	}
}
impl HostRegistrar for RecordingHost {
	fn register<'a>(&'a self, registration: &'a ProviderRegistration) -> HostFuture<'a, ()> {
		Box::pin(async move {
			self.calls.lock().push(HostCall::Register(registration.issuer.clone()));

			let rejected = self
				.rejections_left
				.fetch_update(
					std::sync::atomic::Ordering::Relaxed,
					std::sync::atomic::Ordering::Relaxed,
					|left| left.checked_sub(1),
				)
				.is_ok();

			if rejected {
				return Err(RegistryError::Register {
					issuer: registration.issuer.clone(),
					message: "rejected by test host".into(),
				});
			}

			self.registrations.lock().push(registration.clone());

			Ok(())
		})
	}

	fn unregister<'a>(&'a self, issuer: &'a str) -> HostFuture<'a, ()> {
		Box::pin(async move {
			self.calls.lock().push(HostCall::Unregister(issuer.to_owned()));

			Ok(())
		})
	}
}
impl HostLookup for RecordingHost {
	fn lookup_by_hostname<'a>(
		&'a self,
		hostname: &'a str,
		protocol: Option<Protocol>,
	) -> HostFuture<'a, Option<ProviderHostnameInfo>> {
		Box::pin(async move {
			self.calls.lock().push(HostCall::HostnameLookup(hostname.to_owned(), protocol));

			Ok(None)
		})
	}

	fn lookup_by_issuer<'a>(
		&'a self,
		issuer: &'a str,
		_protocol: Option<Protocol>,
	) -> HostFuture<'a, Option<ProviderCredentials>> {
		Box::pin(async move {
			self.calls.lock().push(HostCall::IssuerLookup(issuer.to_owned()));

			Ok(None)
		})
	}
}

/// Directory exposing only the register/unregister pair.
pub struct RegistrarDirectory(pub Arc<RecordingHost>);
impl ProviderDirectory for RegistrarDirectory {
	fn registrar(&self) -> Option<Arc<dyn HostRegistrar>> {
		Some(self.0.clone())
	}

	fn lookup(&self) -> Option<Arc<dyn HostLookup>> {
		None
	}
}

/// Directory exposing only the lookup pair.
pub struct LookupDirectory(pub Arc<RecordingHost>);
impl ProviderDirectory for LookupDirectory {
	fn registrar(&self) -> Option<Arc<dyn HostRegistrar>> {
		None
	}

	fn lookup(&self) -> Option<Arc<dyn HostLookup>> {
		Some(self.0.clone())
	}
}
