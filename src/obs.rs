//! Observability helpers for configuration operations.
//!
//! Every operation runs inside a span named `oauth2_override.operation` carrying the
//! `operation` and `stage` fields.
//!
//! # Feature Flags
//!
//! - Enable `metrics` to increment the `oauth2_override_operation_total` counter for every
//!   attempt/success/failure, labeled by `operation` + `outcome`, and the
//!   `oauth2_override_registration_total` counter labeled by registration `event`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
	/// Writing a validated document to the stores.
	Apply,
	/// Fetching a document over HTTPS.
	Fetch,
	/// Walking the configuration source chain.
	Resolve,
	/// Pushing the active configuration to the host directory.
	Synchronize,
	/// Undoing host registrations on teardown.
	Shutdown,
}
impl OperationKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationKind::Apply => "apply",
			OperationKind::Fetch => "fetch",
			OperationKind::Resolve => "resolve",
			OperationKind::Synchronize => "synchronize",
			OperationKind::Shutdown => "shutdown",
		}
	}
}
impl Display for OperationKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}

	/// Maps a boolean result onto success or failure.
	pub const fn from_success(success: bool) -> Self {
		if success { OperationOutcome::Success } else { OperationOutcome::Failure }
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
