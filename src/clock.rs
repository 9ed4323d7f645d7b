//! Time sources consulted by the service for every state transition.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::_prelude::*;

/// Source of the current instant.
pub trait Clock: Send + Sync {
	/// Returns the instant treated as "now".
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock in UTC.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually driven clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock(Mutex<OffsetDateTime>);
impl ManualClock {
	/// Creates a clock frozen at `instant`.
	pub fn new(instant: OffsetDateTime) -> Self {
		Self(Mutex::new(instant))
	}

	/// Moves the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}

	/// Moves the clock by `delta`, saturating at the representable range.
	pub fn advance(&self, delta: Duration) {
		let mut now = self.0.lock();

		*now = now.checked_add(delta).unwrap_or_else(|| {
			if delta.is_negative() {
				PrimitiveDateTime::MIN.assume_utc()
			} else {
				PrimitiveDateTime::MAX.assume_utc()
			}
		});
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn manual_clock_moves_only_when_told() {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));

		assert_eq!(clock.now(), macros::datetime!(2025-01-01 00:00 UTC));

		clock.advance(Duration::hours(2));

		assert_eq!(clock.now(), macros::datetime!(2025-01-01 02:00 UTC));

		clock.set(macros::datetime!(2024-06-01 00:00 UTC));

		assert_eq!(clock.now(), macros::datetime!(2024-06-01 00:00 UTC));
	}

	#[test]
	fn manual_clock_saturates_instead_of_overflowing() {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));

		clock.advance(Duration::MAX);

		assert_eq!(clock.now(), PrimitiveDateTime::MAX.assume_utc());

		clock.advance(Duration::days(1));

		assert_eq!(clock.now(), PrimitiveDateTime::MAX.assume_utc());

		clock.advance(Duration::MIN);

		assert_eq!(clock.now(), PrimitiveDateTime::MIN.assume_utc());
	}
}
