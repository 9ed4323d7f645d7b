//! Capacity-bounded membership registry.
//!
//! Time-boxed rate-limit reservations are admitted, renewed, evicted, and erased against a fixed
//! budget, and a withdrawal ledger guarantees evicted holders never lose funds.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod clock;
pub mod error;
pub mod ledger;
pub mod member;
pub mod obs;
pub mod pricing;
pub mod registry;
pub mod service;
pub mod store;
pub mod transfer;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, BTreeSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, ReentrantMutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

#[cfg(test)] use {color_eyre as _, rand as _};
