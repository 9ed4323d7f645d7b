//! Optional observability helpers for registry operations.
//!
//! # Feature Flags
//!
//! - Enable `tracing` (on by default) to run every service operation inside a span named
//!   `membership_registry.operation` with the `operation` and `stage` fields, and to log each
//!   registry event as a structured `info` record.
//! - Enable `metrics` to increment `membership_registry_operation_total` for every
//!   attempt/success/failure (labeled by `operation` + `outcome`), increment
//!   `membership_registry_event_total` per event (labeled by `event`), and publish the
//!   `membership_registry_total_reserved` gauge.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Public operations observed by the service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Admission of a new membership.
	Register,
	/// Renewal of memberships in their grace window.
	Extend,
	/// Permissionless cleanup of expired memberships.
	Erase,
	/// Payout of a credited balance.
	Withdraw,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::Register => "register",
			Operation::Extend => "extend",
			Operation::Erase => "erase",
			Operation::Withdraw => "withdraw",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Entry to a service operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
