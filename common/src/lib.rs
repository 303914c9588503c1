//! Spotrate Common Types
//!
//! Shared types used across the spotrate crates: currency identifiers and
//! their normalization, ordered currency pairs, and the clock abstraction
//! that TTL bookkeeping reads time from.

pub mod currency;
pub mod error;
pub mod time;

pub use currency::*;
pub use error::*;
pub use time::*;
