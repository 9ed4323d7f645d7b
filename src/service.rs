//! Transactional facade over the registry, the ledger, pricing, and value transfer.
//!
//! [`MembershipService`] is the only entry point that touches value. Every public operation runs
//! through the same pipeline:
//!
//! 1. Enter a re-entrant call gate, so operations from different threads never interleave while an
//!    external capability may still call back into the service on the same thread.
//! 2. Apply the registry transition to a working copy of the committed state.
//! 3. Commit the working copy (and persist it when a store is attached) *before* any value moves.
//! 4. Settle with the [`ValueTransfer`] capability. If settlement fails, the pre-call state is
//!    restored.
//! 5. Publish the events of the call once nothing can roll it back anymore.
//!
//! While a settlement is pending, a capability that calls back into the service can read the
//! committed state, but any state-changing call fails with
//! [`Error::SettlementInProgress`](crate::error::Error::SettlementInProgress). A nested call could
//! otherwise move value that a rollback of the outer call would not take back.
//!
//! Queries from other threads go through the same gate, so they never observe a state whose
//! settlement is still pending.

mod metrics;

pub use metrics::{MetricsSnapshot, ServiceMetrics};

// std
use std::{cell::Cell, num::NonZeroU32};
// self
use crate::{
	_prelude::*,
	clock::{Clock, SystemClock},
	member::{HolderId, Membership, MembershipId, PaymentUnit},
	obs::{self, Operation, OperationSpan, Outcome},
	pricing::{FeeFormula, PriceOracle},
	registry::{Fee, RegistryConfig, RegistryEvent, RegistryState},
	store::{RegistrySnapshot, RegistryStore, StoreError},
	transfer::{self, ValueTransfer},
};

/// Receiver for events of committed operations.
pub trait EventSink: Send + Sync {
	/// Handles one event.
	fn publish(&self, event: &RegistryEvent);
}

/// In-memory [`EventSink`] that keeps every published event.
#[derive(Debug, Default)]
pub struct EventLog(Mutex<Vec<RegistryEvent>>);
impl EventLog {
	/// Returns a copy of the recorded events.
	pub fn events(&self) -> Vec<RegistryEvent> {
		self.0.lock().clone()
	}

	/// Removes and returns the recorded events.
	pub fn drain(&self) -> Vec<RegistryEvent> {
		std::mem::take(&mut *self.0.lock())
	}
}
impl EventSink for EventLog {
	fn publish(&self, event: &RegistryEvent) {
		self.0.lock().push(event.clone());
	}
}

/// Parameters of an admission request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationRequest {
	/// Share of the budget to reserve.
	pub rate_limit: u64,
	/// Number of instances the fee is charged for; one membership is created regardless.
	pub instances: NonZeroU32,
	/// Native currency attached to the call.
	pub attached_native: u128,
}
impl RegistrationRequest {
	/// Creates a single-instance request without attached native value.
	pub fn new(rate_limit: u64) -> Self {
		Self { rate_limit, instances: NonZeroU32::MIN, attached_native: 0 }
	}

	/// Overrides the instance count used for pricing.
	pub fn with_instances(mut self, instances: NonZeroU32) -> Self {
		self.instances = instances;

		self
	}

	/// Attaches native currency to the call.
	pub fn with_native(mut self, amount: u128) -> Self {
		self.attached_native = amount;

		self
	}
}

/// Value movement performed after a transition is committed.
#[derive(Clone, Debug)]
enum Settlement {
	None,
	Collect { from: HolderId, unit: PaymentUnit, amount: u128 },
	Payout { to: HolderId, unit: PaymentUnit, amount: u128 },
}

/// Result of applying a transition to the working copy.
struct Staged<T> {
	value: T,
	events: Vec<RegistryEvent>,
	settlement: Settlement,
}
impl<T> Staged<T> {
	fn new(value: T, events: Vec<RegistryEvent>) -> Self {
		Self { value, events, settlement: Settlement::None }
	}

	fn settle(mut self, settlement: Settlement) -> Self {
		self.settlement = settlement;

		self
	}
}

#[derive(Clone, Debug)]
struct Committed {
	state: RegistryState,
	revision: u64,
}

/// Clears the settling flag of the call gate when dropped.
struct Settling<'a>(&'a Cell<bool>);
impl<'a> Settling<'a> {
	fn enter(flag: &'a Cell<bool>) -> Self {
		flag.set(true);

		Self(flag)
	}
}
impl Drop for Settling<'_> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

/// Serialized, all-or-nothing entry point to a membership registry.
pub struct MembershipService {
	committed: Mutex<Committed>,
	/// Serializes calls; the flag is set while a value transfer is pending.
	gate: ReentrantMutex<Cell<bool>>,
	oracle: Arc<dyn PriceOracle>,
	transfer: Arc<dyn ValueTransfer>,
	clock: Arc<dyn Clock>,
	fee_formula: FeeFormula,
	store: Option<Arc<dyn RegistryStore>>,
	sink: Option<Arc<dyn EventSink>>,
	metrics: ServiceMetrics,
}
impl MembershipService {
	/// Creates a service over an empty registry.
	pub fn new(
		config: RegistryConfig,
		oracle: Arc<dyn PriceOracle>,
		transfer: Arc<dyn ValueTransfer>,
	) -> Result<Self> {
		let state = RegistryState::new(config)?;

		Ok(Self::from_committed(Committed { state, revision: 0 }, oracle, transfer))
	}

	/// Rebuilds a service from the latest snapshot in `store`, or starts empty with `config`.
	///
	/// A restored snapshot keeps the configuration it was saved with; `config` only applies when
	/// the store is empty. Restored state is audited before use.
	pub fn open(
		store: Arc<dyn RegistryStore>,
		config: RegistryConfig,
		oracle: Arc<dyn PriceOracle>,
		transfer: Arc<dyn ValueTransfer>,
	) -> Result<Self> {
		let committed = match store.load()? {
			Some(snapshot) => {
				snapshot.state.validate()?;

				Committed { state: snapshot.state, revision: snapshot.revision }
			},
			None => Committed { state: RegistryState::new(config)?, revision: 0 },
		};

		Ok(Self::from_committed(committed, oracle, transfer).with_store(store))
	}

	fn from_committed(
		committed: Committed,
		oracle: Arc<dyn PriceOracle>,
		transfer: Arc<dyn ValueTransfer>,
	) -> Self {
		Self {
			committed: Mutex::new(committed),
			gate: ReentrantMutex::new(Cell::new(false)),
			oracle,
			transfer,
			clock: Arc::new(SystemClock),
			fee_formula: FeeFormula::default(),
			store: None,
			sink: None,
			metrics: Default::default(),
		}
	}

	/// Replaces the time source.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.clock = clock;

		self
	}

	/// Replaces the fee formula.
	pub fn with_fee_formula(mut self, formula: FeeFormula) -> Self {
		self.fee_formula = formula;

		self
	}

	/// Persists every committed state to `store`.
	pub fn with_store(mut self, store: Arc<dyn RegistryStore>) -> Self {
		self.store = Some(store);

		self
	}

	/// Publishes events of committed operations to `sink`.
	pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
		self.sink = Some(sink);

		self
	}

	/// Admits a new membership for `caller`, collecting the fee after the state is committed.
	///
	/// Bounds and capacity are checked before the attached payment, so a request that could never
	/// be admitted reports why rather than how it should have paid.
	pub fn register(
		&self,
		caller: &HolderId,
		request: RegistrationRequest,
	) -> Result<MembershipId> {
		self.transact(Operation::Register, |state, now| {
			let quote = self.oracle.price(request.rate_limit)?;
			let amount =
				self.fee_formula.total(quote.amount, request.rate_limit, request.instances.get())?;
			let admission = state.registry.admit(
				&mut state.ledger,
				caller.clone(),
				request.rate_limit,
				Fee { unit: quote.unit.clone(), amount },
				now,
			)?;

			transfer::validate_payment(&quote.unit, amount, request.attached_native)?;

			let settlement = if amount == 0 {
				Settlement::None
			} else {
				Settlement::Collect { from: caller.clone(), unit: quote.unit, amount }
			};

			Ok(Staged::new(admission.id, admission.events).settle(settlement))
		})
	}

	/// Renews memberships held by `caller` that are inside their grace window.
	pub fn extend(&self, caller: &HolderId, ids: &[MembershipId]) -> Result<()> {
		self.transact(Operation::Extend, |state, now| {
			let events = state.registry.renew(caller, ids, now)?;

			Ok(Staged::new((), events))
		})
	}

	/// Removes expired memberships, crediting each holder; callable by anyone.
	pub fn erase(&self, ids: &[MembershipId]) -> Result<()> {
		self.transact(Operation::Erase, |state, now| {
			let events = state.registry.erase(&mut state.ledger, ids, now)?;

			Ok(Staged::new((), events))
		})
	}

	/// Pays out everything owed to `caller` in `unit`.
	pub fn withdraw(&self, caller: &HolderId, unit: &PaymentUnit) -> Result<u128> {
		self.transact(Operation::Withdraw, |state, _| {
			let amount = state.ledger.take(caller, unit)?;
			let event =
				RegistryEvent::BalanceWithdrawn { holder: caller.clone(), unit: unit.clone(), amount };
			let settlement = Settlement::Payout { to: caller.clone(), unit: unit.clone(), amount };

			Ok(Staged::new(amount, vec![event]).settle(settlement))
		})
	}

	/// Returns `true` if the membership's grace window has strictly elapsed.
	pub fn is_expired(&self, id: MembershipId) -> Result<bool> {
		self.read(|committed| committed.state.registry.is_expired(id, self.clock.now()))
	}

	/// Returns `true` if the membership may be renewed right now.
	pub fn is_in_grace_period(&self, id: MembershipId) -> Result<bool> {
		self.read(|committed| committed.state.registry.is_in_grace_period(id, self.clock.now()))
	}

	/// Nominal expiry of a membership.
	pub fn expiration_of(&self, id: MembershipId) -> Result<OffsetDateTime> {
		self.read(|committed| committed.state.registry.expiration_of(id))
	}

	/// Least recently (re)admitted membership.
	pub fn oldest_membership(&self) -> Option<Membership> {
		self.read(|committed| committed.state.registry.oldest_membership().cloned())
	}

	/// Looks up an active membership.
	pub fn membership(&self, id: MembershipId) -> Option<Membership> {
		self.read(|committed| committed.state.registry.membership(id).cloned())
	}

	/// Active memberships from oldest to newest.
	pub fn memberships(&self) -> Vec<Membership> {
		self.read(|committed| committed.state.registry.memberships().cloned().collect())
	}

	/// Number of active memberships.
	pub fn active_count(&self) -> usize {
		self.read(|committed| committed.state.registry.active_count())
	}

	/// Sum of the rate limits of all active memberships.
	pub fn total_reserved(&self) -> u64 {
		self.read(|committed| committed.state.registry.total_reserved())
	}

	/// Amount owed to `holder` in `unit`.
	pub fn balance_of(&self, holder: &HolderId, unit: &PaymentUnit) -> u128 {
		self.read(|committed| committed.state.ledger.balance_of(holder, unit))
	}

	/// Configuration of the underlying registry.
	pub fn config(&self) -> RegistryConfig {
		self.read(|committed| committed.state.registry.config().clone())
	}

	/// Number of operations committed so far.
	pub fn revision(&self) -> u64 {
		self.read(|committed| committed.revision)
	}

	/// Copy of the committed state.
	pub fn snapshot(&self) -> RegistrySnapshot {
		self.read(|committed| RegistrySnapshot {
			revision: committed.revision,
			taken_at: self.clock.now(),
			state: committed.state.clone(),
		})
	}

	/// Operation counters.
	pub fn metrics(&self) -> &ServiceMetrics {
		&self.metrics
	}

	/// Reads the committed state once no settlement of another thread is pending.
	fn read<R>(&self, f: impl FnOnce(&Committed) -> R) -> R {
		let _call = self.gate.lock();

		f(&self.committed.lock())
	}

	fn transact<T>(
		&self,
		operation: Operation,
		apply: impl FnOnce(&mut RegistryState, OffsetDateTime) -> Result<Staged<T>>,
	) -> Result<T> {
		let _span = OperationSpan::new(operation, "transact").entered();

		obs::record_operation_outcome(operation, Outcome::Attempt);
		self.metrics.record_attempt();

		let result = self.run(operation, apply);

		match &result {
			Ok(_) => {
				obs::record_operation_outcome(operation, Outcome::Success);
				self.metrics.record_success();
			},
			Err(_) => {
				obs::record_operation_outcome(operation, Outcome::Failure);
				self.metrics.record_failure();
			},
		}

		result
	}

	fn run<T>(
		&self,
		operation: Operation,
		apply: impl FnOnce(&mut RegistryState, OffsetDateTime) -> Result<Staged<T>>,
	) -> Result<T> {
		let call = self.gate.lock();

		if call.get() {
			return Err(Error::SettlementInProgress { operation: operation.as_str() });
		}

		let now = self.clock.now();
		let mut working = self.committed.lock().state.clone();
		let staged = apply(&mut working, now)?;
		let checkpoint = self.commit(working, now)?;
		let settled = {
			let _settling = Settling::enter(&call);

			self.settle(&staged.settlement)
		};

		if let Err(e) = settled {
			self.rollback(operation, checkpoint, now, &e);

			return Err(e);
		}

		self.publish(&staged.events);

		Ok(staged.value)
	}

	/// Installs `working` as the committed state and returns what it replaced.
	fn commit(&self, working: RegistryState, now: OffsetDateTime) -> Result<Committed> {
		let mut committed = self.committed.lock();
		let revision = committed.revision + 1;
		let checkpoint =
			std::mem::replace(&mut *committed, Committed { state: working, revision });

		if let Err(e) = self.persist(&committed, now) {
			*committed = checkpoint;

			return Err(e.into());
		}

		Ok(checkpoint)
	}

	fn rollback(
		&self,
		operation: Operation,
		checkpoint: Committed,
		now: OffsetDateTime,
		reason: &Error,
	) {
		obs::log_rollback(operation, reason);
		self.metrics.record_rollback();

		let mut committed = self.committed.lock();

		*committed = checkpoint;

		// The transfer error is what the caller needs to see; a failed re-save only leaves the
		// store one revision ahead, and `open` audits whatever it loads.
		if let Err(e) = self.persist(&committed, now) {
			obs::log_rollback(operation, &e);
		}
	}

	fn persist(&self, committed: &Committed, now: OffsetDateTime) -> Result<(), StoreError> {
		match &self.store {
			Some(store) => store.save(&RegistrySnapshot {
				revision: committed.revision,
				taken_at: now,
				state: committed.state.clone(),
			}),
			None => Ok(()),
		}
	}

	fn settle(&self, settlement: &Settlement) -> Result<()> {
		match settlement {
			Settlement::None => Ok(()),
			Settlement::Collect { from, unit, amount } =>
				self.transfer.transfer_in(from, unit, *amount).map_err(Error::from),
			Settlement::Payout { to, unit, amount } =>
				self.transfer.transfer_out(to, unit, *amount).map_err(Error::from),
		}
	}

	fn publish(&self, events: &[RegistryEvent]) {
		let evictions = events
			.iter()
			.filter(|event| matches!(event, RegistryEvent::MembershipEvicted { .. }))
			.count();

		self.metrics.record_evictions(evictions as u64);
		obs::record_total_reserved(self.total_reserved());

		for event in events {
			obs::log_event(event);
			obs::record_event_metric(event);

			if let Some(sink) = &self.sink {
				sink.publish(event);
			}
		}
	}
}
impl Debug for MembershipService {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		self.read(|committed| {
			f.debug_struct("MembershipService")
				.field("revision", &committed.revision)
				.field("active_count", &committed.state.registry.active_count())
				.field("total_reserved", &committed.state.registry.total_reserved())
				.field("fee_formula", &self.fee_formula)
				.field("store_attached", &self.store.is_some())
				.finish()
		})
	}
}
