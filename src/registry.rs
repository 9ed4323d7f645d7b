//! Capacity-bounded membership registry: admission with FIFO eviction, renewal, and erase.
//!
//! [`Registry`] keeps active memberships in a [`MembershipList`] ordered by (re)admission
//! recency together with the running `total_reserved` counter. Admission sweeps the oldest entries
//! while the pool is full, but only as far as the first entry that is still inside its grace window.
//! Every removal credits the removed slot's fee to the [`BalanceLedger`] before the node is dropped.
//!
//! Each operation validates everything up front and only then mutates, so a rejected call leaves
//! both the registry and the ledger untouched.

pub mod config;
pub mod event;
pub mod integrity;
pub mod list;

pub use config::*;
pub use event::*;
pub use integrity::*;
pub use list::{Iter, IterRev, MembershipList, Node};

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	ledger::BalanceLedger,
	member::{HolderId, Membership, MembershipId, MembershipStatus, PaymentUnit},
};

/// Fee collected for an admission, retained on the membership for credit-back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
	/// Unit the fee is denominated in.
	pub unit: PaymentUnit,
	/// Total amount collected.
	pub amount: u128,
}

/// Successful admission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Admission {
	/// Handle of the new membership.
	pub id: MembershipId,
	/// Evictions performed to make room, followed by the registration notice.
	pub events: Vec<RegistryEvent>,
}

/// Ordered set of active memberships plus aggregate counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registry {
	config: RegistryConfig,
	list: MembershipList,
	last_id: u64,
	total_reserved: u64,
}
impl Registry {
	/// Creates an empty registry after validating the configuration.
	pub fn new(config: RegistryConfig) -> Result<Self, ConfigError> {
		config.validate()?;

		Ok(Self { config, list: MembershipList::default(), last_id: 0, total_reserved: 0 })
	}

	/// Admits a new membership for `holder`, evicting expired entries from the head if needed.
	pub fn admit(
		&mut self,
		ledger: &mut BalanceLedger,
		holder: HolderId,
		rate_limit: u64,
		fee: Fee,
		now: OffsetDateTime,
	) -> Result<Admission> {
		if !self.config.accepts(rate_limit) {
			return Err(Error::InvalidRateLimit {
				rate_limit,
				min: self.config.min_rate_limit,
				max: self.config.max_rate_limit,
			});
		}

		let victims = self.plan_evictions(rate_limit, now)?;
		let id = MembershipId::after(self.last_id).ok_or(Error::Overflow { what: "membership id" })?;
		let grace_start = self.next_grace_start(now)?;

		ledger.ensure_creditable(
			self.list
				.iter()
				.take(victims)
				.map(|membership| (&membership.holder, &membership.unit, membership.amount)),
		)?;

		let mut events = Vec::with_capacity(victims + 1);

		for _ in 0..victims {
			if let Some(evicted) = self.list.pop_front() {
				events.push(self.reclaim(ledger, evicted, EvictionCause::Admission)?);
			}
		}

		self.last_id = id.get();
		self.total_reserved += rate_limit;
		self.list.push_back(Membership {
			id,
			holder: holder.clone(),
			rate_limit,
			unit: fee.unit,
			amount: fee.amount,
			grace_start,
			grace_duration: self.config.grace_period,
		});
		events.push(RegistryEvent::MembershipRegistered {
			id,
			holder,
			rate_limit,
			expires_at: grace_start,
		});

		Ok(Admission { id, events })
	}

	/// Renews every listed membership held by `caller` that is inside its grace window.
	///
	/// Renewed memberships move to the newest position. They share one expiry, so they are
	/// re-linked in id order whatever order the batch lists them in.
	pub fn renew(
		&mut self,
		caller: &HolderId,
		ids: &[MembershipId],
		now: OffsetDateTime,
	) -> Result<Vec<RegistryEvent>> {
		ensure_unique(ids)?;

		for id in ids {
			let membership = self.require(*id)?;

			if !membership.is_in_grace_period_at(now) {
				return Err(Error::NotInGracePeriod { id: *id });
			}
			if membership.holder != *caller {
				return Err(Error::NotHolder { id: *id });
			}
		}

		let grace_start = self.next_grace_start(now)?;
		let grace_duration = self.config.grace_period;
		let mut ordered = ids.to_vec();
		let mut events = Vec::with_capacity(ids.len());

		ordered.sort_unstable();

		for id in &ordered {
			let moved = self.list.move_to_back(*id, |membership| {
				membership.grace_start = grace_start;
				membership.grace_duration = grace_duration;
			});

			if moved {
				events.push(RegistryEvent::MembershipExtended { id: *id, expires_at: grace_start });
			}
		}

		Ok(events)
	}

	/// Removes every listed membership whose grace window has strictly elapsed.
	///
	/// Anyone may call this; fees are always credited to the holder of each membership.
	pub fn erase(
		&mut self,
		ledger: &mut BalanceLedger,
		ids: &[MembershipId],
		now: OffsetDateTime,
	) -> Result<Vec<RegistryEvent>> {
		ensure_unique(ids)?;

		for id in ids {
			if !self.require(*id)?.is_expired_at(now) {
				return Err(Error::NotExpired { id: *id });
			}
		}

		ledger.ensure_creditable(
			ids.iter()
				.filter_map(|id| self.list.get(*id))
				.map(|membership| (&membership.holder, &membership.unit, membership.amount)),
		)?;

		let mut events = Vec::with_capacity(ids.len());

		for id in ids {
			if let Some(erased) = self.list.remove(*id) {
				events.push(self.reclaim(ledger, erased, EvictionCause::Erase)?);
			}
		}

		Ok(events)
	}

	/// Configuration the registry was built with.
	pub fn config(&self) -> &RegistryConfig {
		&self.config
	}

	/// Sum of the rate limits of all active memberships.
	pub fn total_reserved(&self) -> u64 {
		self.total_reserved
	}

	/// Capacity not reserved by any active membership.
	pub fn available_capacity(&self) -> u64 {
		self.config.capacity.saturating_sub(self.total_reserved)
	}

	/// Number of active memberships.
	pub fn active_count(&self) -> usize {
		self.list.len()
	}

	/// Last id handed out, or `0` if none was.
	pub fn last_id(&self) -> u64 {
		self.last_id
	}

	/// Looks up an active membership.
	pub fn membership(&self, id: MembershipId) -> Option<&Membership> {
		self.list.get(id)
	}

	/// Least recently (re)admitted active membership.
	pub fn oldest_membership(&self) -> Option<&Membership> {
		self.list.front()
	}

	/// Active memberships from oldest to newest.
	pub fn memberships(&self) -> Iter<'_> {
		self.list.iter()
	}

	/// Active memberships held by `holder`, oldest first.
	pub fn memberships_of<'a>(
		&'a self,
		holder: &'a HolderId,
	) -> impl Iterator<Item = &'a Membership> + 'a {
		self.list.iter().filter(move |membership| membership.holder == *holder)
	}

	/// Underlying ordered list.
	pub fn list(&self) -> &MembershipList {
		&self.list
	}

	/// Lifecycle status of a membership.
	pub fn status_of(&self, id: MembershipId, now: OffsetDateTime) -> Result<MembershipStatus> {
		Ok(self.require(id)?.status_at(now))
	}

	/// Returns `true` if the membership's grace window has strictly elapsed.
	pub fn is_expired(&self, id: MembershipId, now: OffsetDateTime) -> Result<bool> {
		Ok(self.require(id)?.is_expired_at(now))
	}

	/// Returns `true` if the membership is inside its (inclusive) grace window.
	pub fn is_in_grace_period(&self, id: MembershipId, now: OffsetDateTime) -> Result<bool> {
		Ok(self.require(id)?.is_in_grace_period_at(now))
	}

	/// Nominal expiry of a membership: the instant its grace window opens.
	pub fn expiration_of(&self, id: MembershipId) -> Result<OffsetDateTime> {
		Ok(self.require(id)?.grace_start)
	}

	/// Verifies the structural and accounting invariants.
	pub fn audit(&self) -> Result<(), IntegrityError> {
		self.list.audit()?;

		let actual = self.list.iter().map(|membership| u128::from(membership.rate_limit)).sum();

		if u128::from(self.total_reserved) != actual {
			return Err(IntegrityError::TotalMismatch { recorded: self.total_reserved, actual });
		}
		if self.total_reserved > self.config.capacity {
			return Err(IntegrityError::OverCapacity {
				total: self.total_reserved,
				capacity: self.config.capacity,
			});
		}
		if let Some(id) =
			self.list.iter().map(|membership| membership.id).find(|id| id.get() > self.last_id)
		{
			return Err(IntegrityError::UnassignedId { id, last_id: self.last_id });
		}

		Ok(())
	}

	/// Counts how many head entries must be evicted to fit `rate_limit`.
	fn plan_evictions(&self, rate_limit: u64, now: OffsetDateTime) -> Result<usize> {
		let needed = rate_limit.saturating_sub(self.available_capacity());
		let mut freed = 0_u64;
		let mut victims = 0;

		for membership in self.list.iter() {
			if freed >= needed || !membership.is_evictable_at(now) {
				break;
			}

			freed += membership.rate_limit;
			victims += 1;
		}

		if freed < needed {
			return Err(Error::CapacityExceeded {
				requested: rate_limit,
				available: self.available_capacity() + freed,
			});
		}

		Ok(victims)
	}

	fn reclaim(
		&mut self,
		ledger: &mut BalanceLedger,
		membership: Membership,
		cause: EvictionCause,
	) -> Result<RegistryEvent> {
		self.total_reserved -= membership.rate_limit;
		ledger.credit(&membership.holder, &membership.unit, membership.amount)?;

		Ok(RegistryEvent::MembershipEvicted { id: membership.id, holder: membership.holder, cause })
	}

	fn next_grace_start(&self, now: OffsetDateTime) -> Result<OffsetDateTime> {
		now.checked_add(self.config.expiration_term).ok_or(Error::Overflow { what: "grace start" })
	}

	fn require(&self, id: MembershipId) -> Result<&Membership> {
		self.list.get(id).ok_or(Error::MembershipNotFound { id })
	}
}

/// Registry together with the ledger its removal paths credit.
///
/// This is the unit that gets snapshotted, persisted, and restored as a whole.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
	/// Membership registry.
	pub registry: Registry,
	/// Balances owed to holders of removed memberships.
	pub ledger: BalanceLedger,
}
impl RegistryState {
	/// Creates an empty state for the provided configuration.
	pub fn new(config: RegistryConfig) -> Result<Self, ConfigError> {
		Ok(Self { registry: Registry::new(config)?, ledger: BalanceLedger::default() })
	}

	/// Validates the configuration and the registry invariants of a restored state.
	pub fn validate(&self) -> Result<()> {
		self.registry.config.validate()?;
		self.registry.audit()?;

		Ok(())
	}
}

fn ensure_unique(ids: &[MembershipId]) -> Result<()> {
	let mut seen = BTreeSet::new();

	match ids.iter().find(|id| !seen.insert(**id)) {
		Some(id) => Err(Error::DuplicateMembership { id: *id }),
		None => Ok(()),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	const T0: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

	fn config() -> RegistryConfig {
		RegistryConfig::builder()
			.capacity(100)
			.rate_limit_bounds(1, 50)
			.expiration_term(Duration::days(10))
			.grace_period(Duration::days(2))
			.build()
			.expect("Test config should validate.")
	}

	fn holder(name: &str) -> HolderId {
		HolderId::new(name).expect("Holder fixture should be valid.")
	}

	fn fee(amount: u128) -> Fee {
		Fee { unit: PaymentUnit::Native, amount }
	}

	fn admit(
		registry: &mut Registry,
		ledger: &mut BalanceLedger,
		name: &str,
		rate_limit: u64,
		now: OffsetDateTime,
	) -> MembershipId {
		registry
			.admit(ledger, holder(name), rate_limit, fee(u128::from(rate_limit) * 10), now)
			.expect("Admission fixture should succeed.")
			.id
	}

	#[test]
	fn admission_assigns_monotonic_ids_and_reserves_capacity() {
		let mut registry = Registry::new(config()).expect("Registry should build.");
		let mut ledger = BalanceLedger::default();
		let a = admit(&mut registry, &mut ledger, "alice", 30, T0);
		let b = admit(&mut registry, &mut ledger, "bob", 20, T0);

		assert_eq!((a.get(), b.get()), (1, 2));
		assert_eq!(registry.total_reserved(), 50);
		assert_eq!(registry.available_capacity(), 50);
		assert_eq!(registry.oldest_membership().map(|m| m.id), Some(a));
		assert_eq!(registry.expiration_of(b).ok(), Some(T0 + Duration::days(10)));
		registry.audit().expect("Registry should pass the audit.");
	}

	#[test]
	fn admission_rejects_out_of_bounds_rate_limits() {
		let mut registry = Registry::new(config()).expect("Registry should build.");
		let mut ledger = BalanceLedger::default();

		for rate_limit in [0, 51] {
			let err = registry
				.admit(&mut ledger, holder("alice"), rate_limit, fee(1), T0)
				.expect_err("Out-of-bounds admission should fail.");

			assert!(matches!(err, Error::InvalidRateLimit { min: 1, max: 50, .. }));
		}

		assert_eq!(registry.active_count(), 0);
		assert_eq!(registry.last_id(), 0);
	}

	#[test]
	fn sweep_stops_at_first_live_entry_without_side_effects() {
		let mut registry = Registry::new(config()).expect("Registry should build.");
		let mut ledger = BalanceLedger::default();

		admit(&mut registry, &mut ledger, "alice", 10, T0);
		admit(&mut registry, &mut ledger, "bob", 40, T0 + Duration::days(5));
		admit(&mut registry, &mut ledger, "carol", 40, T0 + Duration::days(5));

		let before = registry.clone();
		// Alice is reclaimable, Bob is not: 10 free + 10 reclaimable < 30.
		let err = registry
			.admit(&mut ledger, holder("dave"), 30, fee(1), T0 + Duration::days(12))
			.expect_err("Blocked sweep should fail the admission.");

		assert!(matches!(err, Error::CapacityExceeded { requested: 30, available: 20 }));
		assert_eq!(registry, before);
		assert!(ledger.is_empty());

		let admission = registry
			.admit(&mut ledger, holder("dave"), 20, fee(1), T0 + Duration::days(12))
			.expect("Admission that fits after one eviction should succeed.");

		assert_eq!(admission.events.len(), 2);
		assert!(matches!(
			&admission.events[0],
			RegistryEvent::MembershipEvicted { id, cause: EvictionCause::Admission, .. }
				if id.get() == 1
		));
		assert_eq!(ledger.balance_of(&holder("alice"), &PaymentUnit::Native), 100);
		assert_eq!(registry.total_reserved(), 100);
		registry.audit().expect("Registry should pass the audit.");
	}

	#[test]
	fn sweep_evicts_only_as_much_as_needed() {
		let mut registry = Registry::new(config()).expect("Registry should build.");
		let mut ledger = BalanceLedger::default();

		for name in ["a", "b", "c", "d"] {
			admit(&mut registry, &mut ledger, name, 25, T0);
		}

		let admission = registry
			.admit(&mut ledger, holder("e"), 30, fee(1), T0 + Duration::days(12))
			.expect("Admission should evict two expired entries.");

		assert_eq!(admission.events.len(), 3);
		assert_eq!(registry.active_count(), 3);
		assert_eq!(registry.total_reserved(), 80);
		assert_eq!(
			registry.memberships().map(|m| m.id.get()).collect::<Vec<_>>(),
			vec![3, 4, 5]
		);
	}

	#[test]
	fn renewal_requires_grace_window_and_holder() {
		let mut registry = Registry::new(config()).expect("Registry should build.");
		let mut ledger = BalanceLedger::default();
		let a = admit(&mut registry, &mut ledger, "alice", 10, T0);
		let b = admit(&mut registry, &mut ledger, "bob", 10, T0);

		assert!(matches!(
			registry.renew(&holder("alice"), &[a], T0 + Duration::days(9)),
			Err(Error::NotInGracePeriod { .. })
		));
		assert!(matches!(
			registry.renew(&holder("bob"), &[a], T0 + Duration::days(10)),
			Err(Error::NotHolder { .. })
		));
		assert!(matches!(
			registry.renew(&holder("alice"), &[a, a], T0 + Duration::days(10)),
			Err(Error::DuplicateMembership { .. })
		));

		let now = T0 + Duration::days(12);
		let events = registry.renew(&holder("alice"), &[a], now).expect("Renewal should succeed.");

		assert_eq!(
			events,
			vec![RegistryEvent::MembershipExtended { id: a, expires_at: now + Duration::days(10) }]
		);
		assert_eq!(registry.list().tail(), Some(a));
		assert_eq!(registry.oldest_membership().map(|m| m.id), Some(b));
		assert_eq!(registry.total_reserved(), 20);
		registry.audit().expect("Registry should pass the audit.");
	}

	#[test]
	fn renewal_batch_is_all_or_nothing() {
		let mut registry = Registry::new(config()).expect("Registry should build.");
		let mut ledger = BalanceLedger::default();
		let a = admit(&mut registry, &mut ledger, "alice", 10, T0);
		let b = admit(&mut registry, &mut ledger, "alice", 10, T0 + Duration::days(5));
		let before = registry.clone();

		assert!(matches!(
			registry.renew(&holder("alice"), &[a, b], T0 + Duration::days(11)),
			Err(Error::NotInGracePeriod { id }) if id == b
		));
		assert_eq!(registry, before);
	}

	#[test]
	fn renewal_captures_current_grace_period() {
		let mut registry = Registry::new(config()).expect("Registry should build.");
		let mut ledger = BalanceLedger::default();
		let a = admit(&mut registry, &mut ledger, "alice", 10, T0);

		registry.config.grace_period = Duration::days(3);

		assert_eq!(
			registry.membership(a).map(|m| m.grace_duration),
			Some(Duration::days(2)),
			"Issued memberships keep the grace period captured at admission."
		);

		registry
			.renew(&holder("alice"), &[a], T0 + Duration::days(10))
			.expect("Renewal should succeed.");

		assert_eq!(registry.membership(a).map(|m| m.grace_duration), Some(Duration::days(3)));
	}

	#[test]
	fn erase_requires_strict_expiry_and_credits_holder_once() {
		let mut registry = Registry::new(config()).expect("Registry should build.");
		let mut ledger = BalanceLedger::default();
		let a = admit(&mut registry, &mut ledger, "alice", 10, T0);
		let b = admit(&mut registry, &mut ledger, "bob", 20, T0);
		let c = admit(&mut registry, &mut ledger, "carol", 30, T0);
		let grace_end = T0 + Duration::days(12);

		assert!(matches!(
			registry.erase(&mut ledger, &[b], grace_end),
			Err(Error::NotExpired { .. })
		));

		let events = registry
			.erase(&mut ledger, &[b], grace_end + Duration::SECOND)
			.expect("Interior erase should succeed.");

		assert!(matches!(
			&events[..],
			[RegistryEvent::MembershipEvicted { cause: EvictionCause::Erase, .. }]
		));
		assert_eq!(ledger.balance_of(&holder("bob"), &PaymentUnit::Native), 200);
		assert_eq!(registry.total_reserved(), 40);
		assert_eq!(
			registry.memberships().map(|m| m.id).collect::<Vec<_>>(),
			vec![a, c]
		);
		assert!(matches!(
			registry.erase(&mut ledger, &[b], grace_end + Duration::SECOND),
			Err(Error::MembershipNotFound { .. })
		));
		assert_eq!(ledger.balance_of(&holder("bob"), &PaymentUnit::Native), 200);
		registry.audit().expect("Registry should pass the audit.");
	}

	#[test]
	fn audit_reports_total_mismatch() {
		let mut registry = Registry::new(config()).expect("Registry should build.");
		let mut ledger = BalanceLedger::default();

		admit(&mut registry, &mut ledger, "alice", 10, T0);
		registry.total_reserved = 11;

		assert_eq!(
			registry.audit(),
			Err(IntegrityError::TotalMismatch { recorded: 11, actual: 10 })
		);

		registry.total_reserved = 10;
		registry.last_id = 0;

		assert!(matches!(registry.audit(), Err(IntegrityError::UnassignedId { .. })));
	}

	#[test]
	fn renewal_batch_relinks_in_id_order() {
		let mut registry = Registry::new(config()).expect("Registry should build.");
		let mut ledger = BalanceLedger::default();
		let a = admit(&mut registry, &mut ledger, "alice", 10, T0);
		let b = admit(&mut registry, &mut ledger, "alice", 10, T0);
		let c = admit(&mut registry, &mut ledger, "bob", 10, T0);
		let window = T0 + Duration::days(11);
		let events =
			registry.renew(&holder("alice"), &[b, a], window).expect("Renewal should pass.");

		assert_eq!(registry.memberships().map(|m| m.id).collect::<Vec<_>>(), vec![c, a, b]);
		assert!(matches!(
			events.as_slice(),
			[
				RegistryEvent::MembershipExtended { id: first, .. },
				RegistryEvent::MembershipExtended { id: second, .. },
			] if *first == a && *second == b
		));
		registry.audit().expect("Renewed registry should pass the audit.");
	}

	#[test]
	fn holder_queries_follow_list_order() {
		let mut registry = Registry::new(config()).expect("Registry should build.");
		let mut ledger = BalanceLedger::default();
		let a = admit(&mut registry, &mut ledger, "alice", 10, T0);
		let b = admit(&mut registry, &mut ledger, "bob", 10, T0);
		let c = admit(&mut registry, &mut ledger, "alice", 10, T0 + Duration::days(1));
		let alice = holder("alice");

		assert_eq!(registry.memberships_of(&alice).map(|m| m.id).collect::<Vec<_>>(), vec![a, c]);

		registry
			.renew(&alice, &[a], T0 + Duration::days(11))
			.expect("Renewal inside the window should pass.");

		assert_eq!(registry.memberships_of(&alice).map(|m| m.id).collect::<Vec<_>>(), vec![c, a]);
		assert_eq!(registry.memberships_of(&holder("carol")).count(), 0);
		assert!(registry.list().contains(b));
		assert!(!registry.list().contains(MembershipId::new(9).expect("Id fixture is non-zero.")));
	}

	#[test]
	fn status_tracks_the_grace_window() {
		let mut registry = Registry::new(config()).expect("Registry should build.");
		let mut ledger = BalanceLedger::default();
		let id = admit(&mut registry, &mut ledger, "alice", 10, T0);
		let status = |now| registry.status_of(id, now).expect("Membership should exist.");

		assert_eq!(status(T0), MembershipStatus::Active);
		assert_eq!(status(T0 + Duration::days(10)), MembershipStatus::GracePeriod);
		assert_eq!(status(T0 + Duration::days(12)), MembershipStatus::GracePeriod);
		assert_eq!(
			status(T0 + Duration::days(12) + Duration::nanoseconds(1)),
			MembershipStatus::Expired
		);

		let unknown = MembershipId::new(42).expect("Id fixture is non-zero.");

		assert!(matches!(
			registry.status_of(unknown, T0),
			Err(Error::MembershipNotFound { id }) if id == unknown
		));
		assert!(matches!(registry.is_expired(unknown, T0), Err(Error::MembershipNotFound { .. })));
		assert!(matches!(registry.expiration_of(unknown), Err(Error::MembershipNotFound { .. })));
	}
}
