//! Membership domain: identifiers, payment units, and the membership record.

pub mod id;
pub mod record;

pub use id::*;
pub use record::*;
