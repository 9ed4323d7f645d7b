//! Value transfer contracts used to collect fees and pay out withdrawals.
//!
//! The registry never moves value. The service validates the payment form, hands the actual movement
//! to a [`ValueTransfer`] implementation, and maps any failure to
//! [`Error::FailedTransfer`](crate::error::Error::FailedTransfer).

// std
use std::sync::atomic::{AtomicBool, Ordering};
// self
use crate::{
	_prelude::*,
	member::{HolderId, PaymentUnit},
};

/// Failure reported by a [`ValueTransfer`] implementation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum TransferError {
	/// The paying side does not hold enough value.
	#[error("Insufficient funds: {requested} {unit} requested but only {available} available.")]
	InsufficientFunds {
		/// Unit being moved.
		unit: PaymentUnit,
		/// Amount requested.
		requested: u128,
		/// Amount available.
		available: u128,
	},
	/// The backend refused the transfer.
	#[error("Transfer rejected: {message}.")]
	Rejected {
		/// Human-readable error payload.
		message: String,
	},
}

/// Capability that moves value between holders and the registry's custody.
///
/// Implementations may call back into the service that invoked them; the service finishes all
/// of its own state changes before calling either method.
pub trait ValueTransfer: Send + Sync {
	/// Pulls `amount` of `unit` from `from` into custody.
	fn transfer_in(
		&self,
		from: &HolderId,
		unit: &PaymentUnit,
		amount: u128,
	) -> Result<(), TransferError>;

	/// Pays `amount` of `unit` out of custody to `to`.
	fn transfer_out(
		&self,
		to: &HolderId,
		unit: &PaymentUnit,
		amount: u128,
	) -> Result<(), TransferError>;
}

/// Checks that the native amount attached to a call matches the fee's unit.
///
/// Native fees require exactly the fee to be attached; token fees forbid any native value.
pub fn validate_payment(unit: &PaymentUnit, fee: u128, attached_native: u128) -> Result<()> {
	match unit {
		PaymentUnit::Native if attached_native != fee =>
			Err(Error::IncorrectAmount { expected: fee, supplied: attached_native }),
		PaymentUnit::Token(_) if attached_native != 0 => Err(Error::OnlyTokensAccepted),
		_ => Ok(()),
	}
}

#[derive(Debug, Default)]
struct Book {
	accounts: BTreeMap<(HolderId, PaymentUnit), u128>,
	custody: BTreeMap<PaymentUnit, u128>,
}

/// Thread-safe in-process treasury for local development and tests.
#[derive(Debug, Default)]
pub struct MemoryTreasury {
	book: Mutex<Book>,
	reject_payouts: AtomicBool,
}
impl MemoryTreasury {
	/// Credits `holder` with spendable funds.
	pub fn fund(&self, holder: &HolderId, unit: &PaymentUnit, amount: u128) {
		let mut book = self.book.lock();
		let account = book.accounts.entry((holder.clone(), unit.clone())).or_default();

		*account = account.saturating_add(amount);
	}

	/// Spendable funds held by `holder`.
	pub fn balance_of(&self, holder: &HolderId, unit: &PaymentUnit) -> u128 {
		self.book.lock().accounts.get(&(holder.clone(), unit.clone())).copied().unwrap_or_default()
	}

	/// Value currently held in custody.
	pub fn custody_of(&self, unit: &PaymentUnit) -> u128 {
		self.book.lock().custody.get(unit).copied().unwrap_or_default()
	}

	/// Makes every subsequent payout fail (or succeed again).
	pub fn reject_payouts(&self, reject: bool) {
		self.reject_payouts.store(reject, Ordering::SeqCst);
	}

	fn debit(slot: &mut u128, unit: &PaymentUnit, amount: u128) -> Result<(), TransferError> {
		let available = *slot;

		*slot = available.checked_sub(amount).ok_or_else(|| TransferError::InsufficientFunds {
			unit: unit.clone(),
			requested: amount,
			available,
		})?;

		Ok(())
	}
}
impl ValueTransfer for MemoryTreasury {
	fn transfer_in(
		&self,
		from: &HolderId,
		unit: &PaymentUnit,
		amount: u128,
	) -> Result<(), TransferError> {
		let mut book = self.book.lock();
		let account = book.accounts.entry((from.clone(), unit.clone())).or_default();

		Self::debit(account, unit, amount)?;

		let custody = book.custody.entry(unit.clone()).or_default();

		*custody = custody.saturating_add(amount);

		Ok(())
	}

	fn transfer_out(
		&self,
		to: &HolderId,
		unit: &PaymentUnit,
		amount: u128,
	) -> Result<(), TransferError> {
		if self.reject_payouts.load(Ordering::SeqCst) {
			return Err(TransferError::Rejected { message: "payouts are disabled".into() });
		}

		let mut book = self.book.lock();
		let custody = book.custody.entry(unit.clone()).or_default();

		Self::debit(custody, unit, amount)?;

		let account = book.accounts.entry((to.clone(), unit.clone())).or_default();

		*account = account.saturating_add(amount);

		Ok(())
	}
}
