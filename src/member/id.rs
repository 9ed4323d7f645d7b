//! Strongly typed identifiers enforced across the registry domain.

// std
use std::{borrow::Borrow, num::NonZeroU64, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;
const NATIVE_UNIT_LABEL: &str = "native";
const TOKEN_UNIT_PREFIX: &str = "token:";

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty or whitespace.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (holder, token).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (holder, token).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (holder, token).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// Membership identifier `0` is reserved for "no membership".
	#[error("Membership identifier 0 is reserved.")]
	ReservedMembershipId,
	/// Payment unit label is neither `native` nor `token:<id>`.
	#[error("Payment unit `{value}` is not recognized.")]
	UnknownPaymentUnit {
		/// Label that failed to parse.
		value: String,
	},
}

def_id! { HolderId, "Identity of the party that registered or last renewed a membership.", "Holder" }
def_id! { TokenId, "Identifier of a fungible token accepted as payment.", "Token" }

/// Handle of a membership inside the registry arena.
///
/// Handles are assigned from `1` upward and never reused; the reserved value `0` cannot be
/// represented, so a missing neighbor is expressed as `Option<MembershipId>`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct MembershipId(NonZeroU64);
impl MembershipId {
	/// Creates a handle, rejecting the reserved `0` value.
	pub fn new(value: u64) -> Result<Self, IdentifierError> {
		NonZeroU64::new(value).map(Self).ok_or(IdentifierError::ReservedMembershipId)
	}

	/// Returns the raw integer value.
	pub const fn get(self) -> u64 {
		self.0.get()
	}

	/// Returns the handle assigned after `last`, where `0` means nothing was assigned yet.
	pub fn after(last: u64) -> Option<Self> {
		last.checked_add(1).and_then(NonZeroU64::new).map(Self)
	}
}
impl From<MembershipId> for u64 {
	fn from(value: MembershipId) -> Self {
		value.get()
	}
}
impl TryFrom<u64> for MembershipId {
	type Error = IdentifierError;

	fn try_from(value: u64) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}
impl Debug for MembershipId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "Membership({})", self.0)
	}
}
impl Display for MembershipId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}", self.0)
	}
}

/// Unit a fee is denominated in: the native currency or a specific token.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaymentUnit {
	/// Native currency attached directly to the call.
	Native,
	/// Token pulled from the payer through the transfer capability.
	Token(TokenId),
}
impl PaymentUnit {
	/// Convenience constructor for token units.
	pub fn token(id: impl AsRef<str>) -> Result<Self, IdentifierError> {
		TokenId::new(id).map(Self::Token)
	}

	/// Returns `true` for the native currency.
	pub fn is_native(&self) -> bool {
		matches!(self, Self::Native)
	}
}
impl From<PaymentUnit> for String {
	fn from(value: PaymentUnit) -> Self {
		value.to_string()
	}
}
impl TryFrom<String> for PaymentUnit {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}
impl FromStr for PaymentUnit {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s == NATIVE_UNIT_LABEL {
			return Ok(Self::Native);
		}

		match s.strip_prefix(TOKEN_UNIT_PREFIX) {
			Some(token) => Self::token(token),
			None => Err(IdentifierError::UnknownPaymentUnit { value: s.to_owned() }),
		}
	}
}
impl Debug for PaymentUnit {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Native => f.write_str("Unit(native)"),
			Self::Token(token) => write!(f, "Unit(token:{token})"),
		}
	}
}
impl Display for PaymentUnit {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Native => f.write_str(NATIVE_UNIT_LABEL),
			Self::Token(token) => write!(f, "{TOKEN_UNIT_PREFIX}{token}"),
		}
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}
