// self
use crate::obs::{OperationKind, OperationOutcome};

/// Host registration events counted by the explicit strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegistrationEvent {
	/// A registration reached the host.
	Attempt,
	/// A rejected registration was tried a second time.
	Retry,
	/// The host accepted the registration.
	Success,
	/// The host rejected the registration twice.
	Failure,
}
impl RegistrationEvent {
	/// Returns a stable label suitable for metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RegistrationEvent::Attempt => "attempt",
			RegistrationEvent::Retry => "retry",
			RegistrationEvent::Success => "success",
			RegistrationEvent::Failure => "failure",
		}
	}
}

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(kind: OperationKind, outcome: OperationOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"oauth2_override_operation_total",
			"operation" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records a host registration event. Issuers are never used as labels.
pub fn record_registration_event(event: RegistrationEvent) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("oauth2_override_registration_total", "event" => event.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = event;
	}
}
