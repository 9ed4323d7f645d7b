// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::_prelude::*;

/// Lock-free operation counters kept by every [`MembershipService`](super::MembershipService).
#[derive(Debug, Default)]
pub struct ServiceMetrics {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
	rollbacks: AtomicU64,
	evictions: AtomicU64,
}
impl ServiceMetrics {
	/// Operations entered, whatever their outcome.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Operations whose state change and settlement both went through.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Operations that returned an error, rollbacks included.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	/// Operations undone after their state had been committed.
	pub fn rollbacks(&self) -> u64 {
		self.rollbacks.load(Ordering::Relaxed)
	}

	/// Memberships removed by admission sweeps or erases.
	pub fn evictions(&self) -> u64 {
		self.evictions.load(Ordering::Relaxed)
	}

	/// Reads every counter at once.
	///
	/// Counters are loaded one after another, so a snapshot taken while operations are in flight
	/// may be off by the operations that finished in between.
	pub fn snapshot(&self) -> MetricsSnapshot {
		MetricsSnapshot {
			attempts: self.attempts(),
			successes: self.successes(),
			failures: self.failures(),
			rollbacks: self.rollbacks(),
			evictions: self.evictions(),
		}
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rollback(&self) {
		self.rollbacks.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_evictions(&self, count: u64) {
		if count > 0 {
			self.evictions.fetch_add(count, Ordering::Relaxed);
		}
	}
}

/// Plain copy of [`ServiceMetrics`], suitable for reporting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
	/// See [`ServiceMetrics::attempts`].
	pub attempts: u64,
	/// See [`ServiceMetrics::successes`].
	pub successes: u64,
	/// See [`ServiceMetrics::failures`].
	pub failures: u64,
	/// See [`ServiceMetrics::rollbacks`].
	pub rollbacks: u64,
	/// See [`ServiceMetrics::evictions`].
	pub evictions: u64,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn snapshot_reflects_recorded_counts() {
		let metrics = ServiceMetrics::default();

		metrics.record_attempt();
		metrics.record_attempt();
		metrics.record_success();
		metrics.record_failure();
		metrics.record_rollback();
		metrics.record_evictions(0);
		metrics.record_evictions(3);

		assert_eq!(
			metrics.snapshot(),
			MetricsSnapshot { attempts: 2, successes: 1, failures: 1, rollbacks: 1, evictions: 3 }
		);
	}
}
