//! Notices emitted by registry state transitions.

// self
use crate::{
	_prelude::*,
	member::{HolderId, MembershipId, PaymentUnit},
};

/// Why a membership left the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvictionCause {
	/// Reclaimed by the sweep inside another party's admission.
	Admission,
	/// Cleared by an explicit erase.
	Erase,
}
impl EvictionCause {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			EvictionCause::Admission => "admission",
			EvictionCause::Erase => "erase",
		}
	}
}

/// State transition notice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
	/// A membership was admitted.
	MembershipRegistered {
		/// New membership.
		id: MembershipId,
		/// Registering party.
		holder: HolderId,
		/// Reserved share of the budget.
		rate_limit: u64,
		/// Nominal expiry (start of the grace window).
		expires_at: OffsetDateTime,
	},
	/// An expired membership was removed and its fee credited to the holder.
	MembershipEvicted {
		/// Removed membership.
		id: MembershipId,
		/// Holder credited with the fee.
		holder: HolderId,
		/// Removal path.
		cause: EvictionCause,
	},
	/// A membership was renewed and moved to the newest position.
	MembershipExtended {
		/// Renewed membership.
		id: MembershipId,
		/// New nominal expiry (start of the next grace window).
		expires_at: OffsetDateTime,
	},
	/// A holder withdrew their credited balance.
	BalanceWithdrawn {
		/// Withdrawing holder.
		holder: HolderId,
		/// Unit paid out.
		unit: PaymentUnit,
		/// Amount paid out.
		amount: u128,
	},
}
impl RegistryEvent {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn kind(&self) -> &'static str {
		match self {
			RegistryEvent::MembershipRegistered { .. } => "registered",
			RegistryEvent::MembershipEvicted { .. } => "evicted",
			RegistryEvent::MembershipExtended { .. } => "extended",
			RegistryEvent::BalanceWithdrawn { .. } => "withdrawn",
		}
	}
}
