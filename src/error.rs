//! Registry-level error types shared across the core, the ledger, stores, and the service facade.

// self
use crate::{_prelude::*, member::MembershipId, member::PaymentUnit};

/// Registry-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Canonical registry error exposed by public APIs.
///
/// Every variant rejects the whole call; no operation leaves partial effects behind.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// A persisted snapshot violates the registry invariants.
	#[error(transparent)]
	Integrity(#[from] crate::registry::IntegrityError),

	/// Requested rate limit lies outside the per-membership bounds.
	#[error("Rate limit {rate_limit} is outside the allowed range [{min}, {max}].")]
	InvalidRateLimit {
		/// Requested rate limit.
		rate_limit: u64,
		/// Configured per-membership minimum.
		min: u64,
		/// Configured per-membership maximum.
		max: u64,
	},
	/// The pool is full and the oldest membership cannot be reclaimed yet.
	#[error("Capacity exceeded: {requested} requested but only {available} can be freed.")]
	CapacityExceeded {
		/// Requested rate limit.
		requested: u64,
		/// Capacity that is free or reclaimable right now.
		available: u64,
	},
	/// Renewal attempted outside the grace window.
	#[error("Membership {id} is not in its grace period.")]
	NotInGracePeriod {
		/// Membership the caller tried to renew.
		id: MembershipId,
	},
	/// Renewal attempted by someone other than the holder.
	#[error("Caller does not hold membership {id}.")]
	NotHolder {
		/// Membership the caller tried to renew.
		id: MembershipId,
	},
	/// Erase attempted before the grace window elapsed.
	#[error("Membership {id} has not expired.")]
	NotExpired {
		/// Membership the caller tried to erase.
		id: MembershipId,
	},
	/// The membership does not exist (never issued, evicted, or erased).
	#[error("Membership {id} does not exist.")]
	MembershipNotFound {
		/// Requested membership.
		id: MembershipId,
	},
	/// A batch named the same membership more than once.
	#[error("Membership {id} appears more than once in the batch.")]
	DuplicateMembership {
		/// Repeated membership.
		id: MembershipId,
	},
	/// Nothing is owed to the caller in the requested unit.
	#[error("No withdrawable balance in {unit}.")]
	InsufficientBalance {
		/// Unit the caller tried to withdraw.
		unit: PaymentUnit,
	},
	/// The value transfer capability reported failure.
	#[error("Value transfer failed.")]
	FailedTransfer {
		/// Failure reported by the transfer capability.
		#[source]
		source: crate::transfer::TransferError,
	},
	/// A state-changing call arrived from inside a pending value transfer.
	#[error("Cannot {operation} while a value transfer is still settling.")]
	SettlementInProgress {
		/// Operation that was refused.
		operation: &'static str,
	},
	/// Attached native amount does not match the fee.
	#[error("Incorrect native amount: expected {expected}, supplied {supplied}.")]
	IncorrectAmount {
		/// Fee demanded by the oracle.
		expected: u128,
		/// Native amount attached to the call.
		supplied: u128,
	},
	/// Native currency was attached to a fee denominated in a token.
	#[error("Only tokens are accepted for this fee.")]
	OnlyTokensAccepted,
	/// An amount, counter, or timestamp left its representable range.
	#[error("Arithmetic overflow while computing {what}.")]
	Overflow {
		/// Quantity that overflowed.
		what: &'static str,
	},
}
impl From<crate::transfer::TransferError> for Error {
	fn from(source: crate::transfer::TransferError) -> Self {
		Self::FailedTransfer { source }
	}
}

/// Configuration and validation failures raised while building a registry.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Per-membership minimum must be positive.
	#[error("The per-membership minimum rate limit must be positive.")]
	ZeroMinimum,
	/// Per-membership bounds are inverted.
	#[error("The per-membership minimum {min} exceeds the maximum {max}.")]
	InvertedBounds {
		/// Configured minimum.
		min: u64,
		/// Configured maximum.
		max: u64,
	},
	/// A single membership could never fit the pool.
	#[error("The per-membership maximum {max} exceeds the total capacity {capacity}.")]
	MaximumExceedsCapacity {
		/// Configured maximum.
		max: u64,
		/// Configured capacity.
		capacity: u64,
	},
	/// Durations must not be negative.
	#[error("The {field} duration must not be negative.")]
	NegativeDuration {
		/// Offending field.
		field: &'static str,
	},
	/// The configuration document could not be parsed.
	#[error("Configuration document is malformed.")]
	Parse(#[from] serde_json::Error),
}
