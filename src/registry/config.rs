//! Registry configuration constants and their validating builder.

// self
use crate::{_prelude::*, error::ConfigError};

/// Immutable limits consumed by the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
	/// Ceiling on the sum of all active rate limits.
	pub capacity: u64,
	/// Smallest rate limit a single membership may reserve.
	pub min_rate_limit: u64,
	/// Largest rate limit a single membership may reserve.
	pub max_rate_limit: u64,
	/// Time from admission (or renewal) until the grace window opens.
	pub expiration_term: Duration,
	/// Grace window length stamped onto new and renewed memberships.
	pub grace_period: Duration,
}
impl RegistryConfig {
	/// Default pool capacity.
	pub const DEFAULT_CAPACITY: u64 = 160_000;
	/// Default per-membership minimum.
	pub const DEFAULT_MIN_RATE_LIMIT: u64 = 20;
	/// Default per-membership maximum.
	pub const DEFAULT_MAX_RATE_LIMIT: u64 = 600;
	/// Default expiration term.
	pub const DEFAULT_EXPIRATION_TERM: Duration = Duration::days(180);
	/// Default grace period.
	pub const DEFAULT_GRACE_PERIOD: Duration = Duration::days(30);

	/// Returns a builder seeded with the default constants.
	pub fn builder() -> RegistryConfigBuilder {
		RegistryConfigBuilder::default()
	}

	/// Parses a JSON configuration document and validates it.
	pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
		let config: Self = serde_json::from_str(document)?;

		config.validate()?;

		Ok(config)
	}

	/// Validates invariants for the configuration.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.min_rate_limit == 0 {
			return Err(ConfigError::ZeroMinimum);
		}
		if self.min_rate_limit > self.max_rate_limit {
			return Err(ConfigError::InvertedBounds {
				min: self.min_rate_limit,
				max: self.max_rate_limit,
			});
		}
		if self.max_rate_limit > self.capacity {
			return Err(ConfigError::MaximumExceedsCapacity {
				max: self.max_rate_limit,
				capacity: self.capacity,
			});
		}
		if self.expiration_term.is_negative() {
			return Err(ConfigError::NegativeDuration { field: "expiration_term" });
		}
		if self.grace_period.is_negative() {
			return Err(ConfigError::NegativeDuration { field: "grace_period" });
		}

		Ok(())
	}

	/// Returns `true` if `rate_limit` lies within the per-membership bounds.
	pub fn accepts(&self, rate_limit: u64) -> bool {
		(self.min_rate_limit..=self.max_rate_limit).contains(&rate_limit)
	}
}
impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			capacity: Self::DEFAULT_CAPACITY,
			min_rate_limit: Self::DEFAULT_MIN_RATE_LIMIT,
			max_rate_limit: Self::DEFAULT_MAX_RATE_LIMIT,
			expiration_term: Self::DEFAULT_EXPIRATION_TERM,
			grace_period: Self::DEFAULT_GRACE_PERIOD,
		}
	}
}

/// Builder for [`RegistryConfig`] values.
#[derive(Clone, Debug, Default)]
pub struct RegistryConfigBuilder {
	config: RegistryConfig,
}
impl RegistryConfigBuilder {
	/// Sets the pool capacity.
	pub fn capacity(mut self, capacity: u64) -> Self {
		self.config.capacity = capacity;

		self
	}

	/// Sets the inclusive per-membership bounds.
	pub fn rate_limit_bounds(mut self, min: u64, max: u64) -> Self {
		self.config.min_rate_limit = min;
		self.config.max_rate_limit = max;

		self
	}

	/// Sets the expiration term.
	pub fn expiration_term(mut self, term: Duration) -> Self {
		self.config.expiration_term = term;

		self
	}

	/// Sets the grace period.
	pub fn grace_period(mut self, period: Duration) -> Self {
		self.config.grace_period = period;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<RegistryConfig, ConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_are_valid() {
		let config = RegistryConfig::builder().build().expect("Default config should validate.");

		assert_eq!(config, RegistryConfig::default());
		assert!(config.accepts(20));
		assert!(config.accepts(600));
		assert!(!config.accepts(19));
		assert!(!config.accepts(601));
	}

	#[test]
	fn builder_rejects_inconsistent_limits() {
		assert!(matches!(
			RegistryConfig::builder().rate_limit_bounds(0, 10).build(),
			Err(ConfigError::ZeroMinimum)
		));
		assert!(matches!(
			RegistryConfig::builder().rate_limit_bounds(10, 5).build(),
			Err(ConfigError::InvertedBounds { min: 10, max: 5 })
		));
		assert!(matches!(
			RegistryConfig::builder().capacity(100).rate_limit_bounds(1, 101).build(),
			Err(ConfigError::MaximumExceedsCapacity { max: 101, capacity: 100 })
		));
		assert!(matches!(
			RegistryConfig::builder().grace_period(Duration::seconds(-1)).build(),
			Err(ConfigError::NegativeDuration { field: "grace_period" })
		));
	}

	#[test]
	fn json_documents_are_validated() {
		let config = RegistryConfig::builder()
			.capacity(100)
			.rate_limit_bounds(1, 50)
			.expiration_term(Duration::days(1))
			.grace_period(Duration::hours(6))
			.build()
			.expect("Scenario config should validate.");
		let document = serde_json::to_string(&config).expect("Config should serialize.");

		assert_eq!(
			RegistryConfig::from_json_str(&document).expect("Config should load from JSON."),
			config
		);

		let broken = document.replace("\"capacity\":100", "\"capacity\":10");

		assert!(matches!(
			RegistryConfig::from_json_str(&broken),
			Err(ConfigError::MaximumExceedsCapacity { .. })
		));
		assert!(matches!(RegistryConfig::from_json_str("{"), Err(ConfigError::Parse(_))));
	}
}
