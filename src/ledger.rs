//! Withdrawable balances owed to holders whose memberships were evicted or erased.
//!
//! The ledger is written only by the removal paths of the registry and drained only by
//! withdrawal. Draining zeroes the entry before any payout is attempted, so a payout that re-enters
//! the service observes an empty balance.

// self
use crate::{
	_prelude::*,
	member::{HolderId, PaymentUnit},
};

/// Per-(holder, unit) amounts owed but not yet paid out.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceLedger(BTreeMap<HolderId, BTreeMap<PaymentUnit, u128>>);
impl BalanceLedger {
	/// Amount owed to `holder` in `unit`.
	pub fn balance_of(&self, holder: &HolderId, unit: &PaymentUnit) -> u128 {
		self.0.get(holder).and_then(|units| units.get(unit)).copied().unwrap_or_default()
	}

	/// Every non-zero balance owed to `holder`.
	pub fn balances_of<'a>(
		&'a self,
		holder: &HolderId,
	) -> impl Iterator<Item = (&'a PaymentUnit, u128)> + 'a {
		self.0.get(holder).into_iter().flat_map(|units| units.iter().map(|(u, a)| (u, *a)))
	}

	/// Sum owed across all holders in `unit`.
	pub fn total_owed(&self, unit: &PaymentUnit) -> u128 {
		self.0.values().filter_map(|units| units.get(unit)).sum()
	}

	/// Returns `true` when nothing is owed to anyone.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Adds `amount` to the balance owed to `holder`.
	pub(crate) fn credit(
		&mut self,
		holder: &HolderId,
		unit: &PaymentUnit,
		amount: u128,
	) -> Result<()> {
		if amount == 0 {
			return Ok(());
		}

		let units = self.0.entry(holder.clone()).or_default();
		let balance = units.entry(unit.clone()).or_default();

		*balance = balance.checked_add(amount).ok_or(Error::Overflow { what: "ledger balance" })?;

		Ok(())
	}

	/// Checks that a batch of credits would not overflow any balance.
	pub(crate) fn ensure_creditable<'a>(
		&self,
		credits: impl IntoIterator<Item = (&'a HolderId, &'a PaymentUnit, u128)>,
	) -> Result<()> {
		let mut pending = BTreeMap::<(&HolderId, &PaymentUnit), u128>::new();

		for (holder, unit, amount) in credits {
			let sum = pending.entry((holder, unit)).or_insert_with(|| self.balance_of(holder, unit));

			*sum = sum.checked_add(amount).ok_or(Error::Overflow { what: "ledger balance" })?;
		}

		Ok(())
	}

	/// Zeroes and returns the balance owed to `holder`.
	pub(crate) fn take(&mut self, holder: &HolderId, unit: &PaymentUnit) -> Result<u128> {
		let amount = self
			.0
			.get_mut(holder)
			.and_then(|units| units.remove(unit))
			.filter(|amount| *amount > 0)
			.ok_or_else(|| Error::InsufficientBalance { unit: unit.clone() })?;

		if self.0.get(holder).is_some_and(BTreeMap::is_empty) {
			self.0.remove(holder);
		}

		Ok(amount)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn holder(name: &str) -> HolderId {
		HolderId::new(name).expect("Holder fixture should be valid.")
	}

	#[test]
	fn credits_accumulate_per_holder_and_unit() {
		let mut ledger = BalanceLedger::default();
		let alice = holder("alice");
		let usdc = PaymentUnit::token("usdc").expect("Token unit fixture should be valid.");

		ledger.credit(&alice, &PaymentUnit::Native, 10).expect("Credit should succeed.");
		ledger.credit(&alice, &PaymentUnit::Native, 5).expect("Credit should succeed.");
		ledger.credit(&alice, &usdc, 7).expect("Credit should succeed.");
		ledger.credit(&holder("bob"), &usdc, 3).expect("Credit should succeed.");

		assert_eq!(ledger.balance_of(&alice, &PaymentUnit::Native), 15);
		assert_eq!(ledger.balance_of(&alice, &usdc), 7);
		assert_eq!(ledger.total_owed(&usdc), 10);
		assert_eq!(ledger.balances_of(&alice).count(), 2);
	}

	#[test]
	fn take_zeroes_the_entry_once() {
		let mut ledger = BalanceLedger::default();
		let alice = holder("alice");

		ledger.credit(&alice, &PaymentUnit::Native, 42).expect("Credit should succeed.");

		assert_eq!(ledger.take(&alice, &PaymentUnit::Native).expect("First take pays out."), 42);
		assert_eq!(ledger.balance_of(&alice, &PaymentUnit::Native), 0);
		assert!(ledger.is_empty());
		assert!(matches!(
			ledger.take(&alice, &PaymentUnit::Native),
			Err(Error::InsufficientBalance { unit: PaymentUnit::Native })
		));
	}

	#[test]
	fn zero_credits_leave_no_entry() {
		let mut ledger = BalanceLedger::default();

		ledger.credit(&holder("alice"), &PaymentUnit::Native, 0).expect("Credit should succeed.");

		assert!(ledger.is_empty());
	}

	#[test]
	fn overflowing_credit_is_rejected() {
		let mut ledger = BalanceLedger::default();
		let alice = holder("alice");

		ledger.credit(&alice, &PaymentUnit::Native, u128::MAX).expect("Credit should succeed.");

		assert!(matches!(
			ledger.credit(&alice, &PaymentUnit::Native, 1),
			Err(Error::Overflow { what: "ledger balance" })
		));
		assert_eq!(ledger.balance_of(&alice, &PaymentUnit::Native), u128::MAX);
	}
}
