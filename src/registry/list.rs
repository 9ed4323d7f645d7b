//! Arena-backed doubly linked list ordering memberships by (re)admission recency.
//!
//! Nodes live in a map keyed by [`MembershipId`]; links are handles rather than references, so the
//! whole structure serializes as plain data and removes interior entries without shifting.

// self
use crate::{
	_prelude::*,
	member::{Membership, MembershipId},
	registry::IntegrityError,
};

/// Arena slot holding a membership and its positional links.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
	/// Membership stored in the slot.
	pub membership: Membership,
	/// Older neighbor, if any.
	pub prev: Option<MembershipId>,
	/// Newer neighbor, if any.
	pub next: Option<MembershipId>,
}

/// FIFO of memberships with handle-based links; `head` is the oldest entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipList {
	nodes: BTreeMap<MembershipId, Node>,
	head: Option<MembershipId>,
	tail: Option<MembershipId>,
}
impl MembershipList {
	/// Number of linked memberships.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Returns `true` when no membership is linked.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Handle of the oldest membership.
	pub fn head(&self) -> Option<MembershipId> {
		self.head
	}

	/// Handle of the newest membership.
	pub fn tail(&self) -> Option<MembershipId> {
		self.tail
	}

	/// Oldest membership.
	pub fn front(&self) -> Option<&Membership> {
		self.head.and_then(|id| self.get(id))
	}

	/// Looks up a membership by handle.
	pub fn get(&self, id: MembershipId) -> Option<&Membership> {
		self.nodes.get(&id).map(|node| &node.membership)
	}

	/// Looks up a membership together with its links.
	pub fn node(&self, id: MembershipId) -> Option<&Node> {
		self.nodes.get(&id)
	}

	/// Returns `true` if the handle is linked.
	pub fn contains(&self, id: MembershipId) -> bool {
		self.nodes.contains_key(&id)
	}

	/// Iterates from the oldest to the newest membership.
	pub fn iter(&self) -> Iter<'_> {
		Iter { list: self, cursor: self.head, remaining: self.nodes.len() }
	}

	/// Iterates from the newest to the oldest membership.
	pub fn iter_rev(&self) -> IterRev<'_> {
		IterRev { list: self, cursor: self.tail, remaining: self.nodes.len() }
	}

	/// Links a membership after the current tail.
	pub(crate) fn push_back(&mut self, membership: Membership) {
		let id = membership.id;

		self.attach_back(id, Node { membership, prev: None, next: None });
	}

	/// Unlinks and returns a membership, repairing its neighbors and the endpoints.
	pub(crate) fn remove(&mut self, id: MembershipId) -> Option<Membership> {
		self.detach(id).map(|node| node.membership)
	}

	/// Unlinks the oldest membership.
	pub(crate) fn pop_front(&mut self) -> Option<Membership> {
		self.head.and_then(|id| self.remove(id))
	}

	/// Moves a membership to the tail, applying `update` to it on the way.
	///
	/// Returns `false` if the handle is not linked.
	pub(crate) fn move_to_back(
		&mut self,
		id: MembershipId,
		update: impl FnOnce(&mut Membership),
	) -> bool {
		match self.detach(id) {
			Some(mut node) => {
				update(&mut node.membership);
				self.attach_back(id, node);

				true
			},
			None => false,
		}
	}

	/// Verifies that the links form a single acyclic chain covering every node.
	pub(crate) fn audit(&self) -> Result<(), IntegrityError> {
		for (key, node) in &self.nodes {
			if *key != node.membership.id {
				return Err(IntegrityError::MismatchedKey { key: *key, id: node.membership.id });
			}
		}

		let mut visited = BTreeSet::new();
		let mut expected_prev = None;
		let mut cursor = self.head;

		while let Some(id) = cursor {
			let node = self.nodes.get(&id).ok_or(IntegrityError::DanglingLink { id })?;

			if node.prev != expected_prev {
				return Err(IntegrityError::BrokenBackLink { id });
			}
			if !visited.insert(id) {
				return Err(IntegrityError::Cycle { id });
			}

			expected_prev = Some(id);
			cursor = node.next;
		}

		if expected_prev != self.tail {
			return Err(IntegrityError::TailMismatch { recorded: self.tail, actual: expected_prev });
		}
		if visited.len() != self.nodes.len() {
			return Err(IntegrityError::Unreachable {
				reachable: visited.len(),
				stored: self.nodes.len(),
			});
		}

		Ok(())
	}

	fn attach_back(&mut self, id: MembershipId, mut node: Node) {
		node.prev = self.tail;
		node.next = None;

		match self.tail.and_then(|tail| self.nodes.get_mut(&tail)) {
			Some(tail) => tail.next = Some(id),
			None => self.head = Some(id),
		}

		self.tail = Some(id);
		self.nodes.insert(id, node);
	}

	fn detach(&mut self, id: MembershipId) -> Option<Node> {
		let node = self.nodes.remove(&id)?;

		match node.prev.and_then(|prev| self.nodes.get_mut(&prev)) {
			Some(prev) => prev.next = node.next,
			None => self.head = node.next,
		}
		match node.next.and_then(|next| self.nodes.get_mut(&next)) {
			Some(next) => next.prev = node.prev,
			None => self.tail = node.prev,
		}

		Some(node)
	}
}

/// Oldest-to-newest iterator returned by [`MembershipList::iter`].
#[derive(Clone, Debug)]
pub struct Iter<'a> {
	list: &'a MembershipList,
	cursor: Option<MembershipId>,
	remaining: usize,
}
impl<'a> Iterator for Iter<'a> {
	type Item = &'a Membership;

	fn next(&mut self) -> Option<Self::Item> {
		// Bounded by the node count so a corrupted chain cannot loop forever.
		if self.remaining == 0 {
			return None;
		}

		let node = self.list.nodes.get(&self.cursor?)?;

		self.remaining -= 1;
		self.cursor = node.next;

		Some(&node.membership)
	}
}

/// Newest-to-oldest iterator returned by [`MembershipList::iter_rev`].
#[derive(Clone, Debug)]
pub struct IterRev<'a> {
	list: &'a MembershipList,
	cursor: Option<MembershipId>,
	remaining: usize,
}
impl<'a> Iterator for IterRev<'a> {
	type Item = &'a Membership;

	fn next(&mut self) -> Option<Self::Item> {
		if self.remaining == 0 {
			return None;
		}

		let node = self.list.nodes.get(&self.cursor?)?;

		self.remaining -= 1;
		self.cursor = node.prev;

		Some(&node.membership)
	}
}
