//! Membership records and their time-based lifecycle.

// crates.io
use time::PrimitiveDateTime;
// self
use crate::{
	_prelude::*,
	member::{HolderId, MembershipId, PaymentUnit},
};

/// Lifecycle status of a membership at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MembershipStatus {
	/// The grace window has not started yet.
	Active,
	/// The holder may renew; the slot is not yet reclaimable by erase.
	GracePeriod,
	/// The grace window has elapsed; the slot may be erased or evicted.
	Expired,
}

/// One reserved slice of the shared rate-limit budget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
	/// Stable handle, never reused.
	pub id: MembershipId,
	/// Party that registered or last renewed the slot.
	pub holder: HolderId,
	/// Share of the budget consumed by this slot.
	pub rate_limit: u64,
	/// Unit the fee was collected in.
	pub unit: PaymentUnit,
	/// Fee collected for the slot; credited back to the holder on eviction.
	pub amount: u128,
	/// Instant at which the grace window opens.
	pub grace_start: OffsetDateTime,
	/// Grace window length captured when the slot was created or last renewed.
	pub grace_duration: Duration,
}
impl Membership {
	/// Last instant of the grace window.
	///
	/// Saturates at the largest representable instant instead of overflowing.
	pub fn grace_end(&self) -> OffsetDateTime {
		self.grace_start
			.checked_add(self.grace_duration)
			.unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc())
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> MembershipStatus {
		if instant < self.grace_start {
			return MembershipStatus::Active;
		}
		if instant > self.grace_end() {
			return MembershipStatus::Expired;
		}

		MembershipStatus::GracePeriod
	}

	/// Returns `true` while the holder may renew (both window bounds inclusive).
	pub fn is_in_grace_period_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), MembershipStatus::GracePeriod)
	}

	/// Returns `true` once the grace window has strictly elapsed.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), MembershipStatus::Expired)
	}

	/// Returns `true` when an admission sweep may reclaim the slot.
	///
	/// The sweep treats the closing instant of the grace window as reclaimable, one tick before
	/// [`Membership::is_expired_at`] turns true.
	pub fn is_evictable_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.grace_end()
	}
}
