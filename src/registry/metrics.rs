// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::{self, RegistrationEvent};

/// Thread-safe counters for host registrations.
///
/// Every increment is mirrored to the `oauth2_override_registration_total` counter when the
/// `metrics` feature is enabled.
#[derive(Debug, Default)]
pub struct RegistrationMetrics {
	attempts: AtomicU64,
	retries: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl RegistrationMetrics {
	/// Returns the total number of synchronizations that reached the registrar.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of second attempts after a rejected registration.
	pub fn retries(&self) -> u64 {
		self.retries.load(Ordering::Relaxed)
	}

	/// Returns the number of successful registrations.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of registrations that failed after the retry.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
		obs::record_registration_event(RegistrationEvent::Attempt);
	}

	pub(crate) fn record_retry(&self) {
		self.retries.fetch_add(1, Ordering::Relaxed);
		obs::record_registration_event(RegistrationEvent::Retry);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
		obs::record_registration_event(RegistrationEvent::Success);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
		obs::record_registration_event(RegistrationEvent::Failure);
	}
}
