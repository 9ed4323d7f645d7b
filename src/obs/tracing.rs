// self
use crate::{_prelude::*, obs::Operation, registry::RegistryEvent};

/// A span builder used by service operations.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(operation: Operation, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"membership_registry.operation",
				operation = operation.as_str(),
				stage
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (operation, stage);

			Self {}
		}
	}

	/// Enters the span for the rest of the operation.
	pub fn entered(self) -> OperationSpanGuard {
		#[cfg(feature = "tracing")]
		{
			OperationSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			OperationSpanGuard {}
		}
	}
}

/// RAII guard returned by [`OperationSpan::entered`].
pub struct OperationSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for OperationSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OperationSpanGuard(..)")
	}
}

/// Logs a committed registry event (when tracing is enabled).
pub fn log_event(event: &RegistryEvent) {
	#[cfg(feature = "tracing")]
	{
		match event {
			RegistryEvent::MembershipRegistered { id, holder, rate_limit, expires_at } => {
				tracing::info!(%id, %holder, rate_limit, %expires_at, "membership registered");
			},
			RegistryEvent::MembershipEvicted { id, holder, cause } => {
				tracing::info!(%id, %holder, cause = cause.as_str(), "membership evicted");
			},
			RegistryEvent::MembershipExtended { id, expires_at } => {
				tracing::info!(%id, %expires_at, "membership extended");
			},
			RegistryEvent::BalanceWithdrawn { holder, unit, amount } => {
				tracing::info!(%holder, %unit, amount = %amount, "balance withdrawn");
			},
		}
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = event;
	}
}

/// Logs that an operation was rolled back (when tracing is enabled).
pub fn log_rollback(operation: Operation, reason: &dyn StdError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(operation = operation.as_str(), error = %reason, "operation rolled back");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, reason);
	}
}
