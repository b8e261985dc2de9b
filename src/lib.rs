//! Override a mail client's OAuth 2.0 provider directory with operator-supplied issuers,
//! vault-backed client secrets, and bounded remote configuration.
//!
//! The crate supplies provider metadata only: endpoints, client credentials, and scopes. The host
//! keeps running the OAuth dance itself. Configuration flows one way:
//!
//! [`bootstrap::Bootstrap`] → [`apply::ConfigApplier`] → [`store::ConfigStore`] /
//! [`secret::SecretBackends`] → [`registry::RegistryAdapter`] → host directory.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod apply;
pub mod bootstrap;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod id;
pub mod obs;
pub mod registry;
pub mod remote;
pub mod scope;
pub mod secret;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{HashMap, HashSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		path::{Path, PathBuf},
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value as JsonValue;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::Result;

	/// Boxed, `Send` future used by every async contract in the crate.
	pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a + Send>>;
}

pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
