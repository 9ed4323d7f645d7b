//! Structural invariants checked when a registry is rebuilt from persisted state.

// self
use crate::{_prelude::*, member::MembershipId};

/// Invariant violations detected by [`Registry::audit`](crate::registry::Registry::audit).
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum IntegrityError {
	/// A node is stored under a key that differs from its membership id.
	#[error("Node stored under {key} carries membership {id}.")]
	MismatchedKey {
		/// Arena key.
		key: MembershipId,
		/// Membership id inside the node.
		id: MembershipId,
	},
	/// A link points at a handle that is not in the arena.
	#[error("Link points at missing membership {id}.")]
	DanglingLink {
		/// Missing handle.
		id: MembershipId,
	},
	/// A node's `prev` link disagrees with the forward traversal.
	#[error("Membership {id} has an inconsistent back link.")]
	BrokenBackLink {
		/// Offending node.
		id: MembershipId,
	},
	/// The forward traversal revisited a node.
	#[error("Membership {id} was visited twice.")]
	Cycle {
		/// Revisited node.
		id: MembershipId,
	},
	/// The recorded tail is not where the forward traversal ends.
	#[error("Recorded tail {recorded:?} differs from traversal end {actual:?}.")]
	TailMismatch {
		/// Tail stored in the list.
		recorded: Option<MembershipId>,
		/// Last node reached from the head.
		actual: Option<MembershipId>,
	},
	/// Some nodes are not reachable from the head.
	#[error("Only {reachable} of {stored} memberships are reachable from the head.")]
	Unreachable {
		/// Nodes reached from the head.
		reachable: usize,
		/// Nodes stored in the arena.
		stored: usize,
	},
	/// The reserved total disagrees with the linked memberships.
	#[error("Recorded total {recorded} differs from the linked sum {actual}.")]
	TotalMismatch {
		/// Stored counter.
		recorded: u64,
		/// Sum over linked memberships.
		actual: u128,
	},
	/// The reserved total exceeds the configured capacity.
	#[error("Reserved total {total} exceeds capacity {capacity}.")]
	OverCapacity {
		/// Stored counter.
		total: u64,
		/// Configured capacity.
		capacity: u64,
	},
	/// A membership id lies beyond the last assigned id.
	#[error("Membership {id} was never assigned (last assigned id is {last_id}).")]
	UnassignedId {
		/// Offending id.
		id: MembershipId,
		/// Last assigned id.
		last_id: u64,
	},
}
