// self
use crate::{
	obs::{Operation, Outcome},
	registry::RegistryEvent,
};

/// Records an operation outcome via the global metrics recorder (when enabled).
pub fn record_operation_outcome(operation: Operation, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"membership_registry_operation_total",
			"operation" => operation.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (operation, outcome);
	}
}

/// Counts a registry event via the global metrics recorder (when enabled).
pub fn record_event_metric(event: &RegistryEvent) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("membership_registry_event_total", "event" => event.kind()).increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = event;
	}
}

/// Publishes the reserved total via the global metrics recorder (when enabled).
pub fn record_total_reserved(total: u64) {
	#[cfg(feature = "metrics")]
	{
		metrics::gauge!("membership_registry_total_reserved").set(total as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = total;
	}
}
