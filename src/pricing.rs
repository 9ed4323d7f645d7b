//! Pricing hooks that quote the fee for a requested rate-limit allotment.
//!
//! The registry never prices anything itself: the service asks a [`PriceOracle`] for a quote and
//! turns it into the total fee with a [`FeeFormula`].

// self
use crate::{_prelude::*, member::PaymentUnit};

/// Quote returned by a [`PriceOracle`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
	/// Unit the fee must be paid in.
	pub unit: PaymentUnit,
	/// Quoted amount.
	pub amount: u128,
}

/// Capability that prices a rate-limit allotment.
///
/// Implementors are required to be `Send + Sync` so a single oracle can back a shared service.
pub trait PriceOracle: Send + Sync {
	/// Quotes the fee for reserving `rate_limit`.
	fn price(&self, rate_limit: u64) -> Result<Price>;
}

/// Oracle charging a fixed amount per unit of rate limit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearPriceOracle {
	unit: PaymentUnit,
	price_per_message: u128,
}
impl LinearPriceOracle {
	/// Creates an oracle quoting `price_per_message` per unit of rate limit.
	pub fn new(unit: PaymentUnit, price_per_message: u128) -> Self {
		Self { unit, price_per_message }
	}
}
impl PriceOracle for LinearPriceOracle {
	fn price(&self, rate_limit: u64) -> Result<Price> {
		let amount = self
			.price_per_message
			.checked_mul(u128::from(rate_limit))
			.ok_or(Error::Overflow { what: "price quote" })?;

		Ok(Price { unit: self.unit.clone(), amount })
	}
}
impl Display for LinearPriceOracle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "linear({} {} per message)", self.price_per_message, self.unit)
	}
}

/// Oracle quoting the same amount for every allotment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlatPriceOracle(pub Price);
impl PriceOracle for FlatPriceOracle {
	fn price(&self, _rate_limit: u64) -> Result<Price> {
		Ok(self.0.clone())
	}
}

/// How a quote, the requested rate limit, and the instance count combine into the total fee.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeFormula {
	/// The quote already prices the whole allotment: `quote * instances`.
	#[default]
	QuotedTotal,
	/// The quote is scaled by the rate limit once more: `quote * rate_limit * instances`.
	ScaledByRateLimit,
}
impl FeeFormula {
	/// Computes the total fee.
	pub fn total(self, quote: u128, rate_limit: u64, instances: u32) -> Result<u128> {
		let per_instance = match self {
			FeeFormula::QuotedTotal => Some(quote),
			FeeFormula::ScaledByRateLimit => quote.checked_mul(u128::from(rate_limit)),
		};

		per_instance
			.and_then(|amount| amount.checked_mul(u128::from(instances)))
			.ok_or(Error::Overflow { what: "total fee" })
	}
}
