//! Tally Types
//!
//! This crate defines the value types and the error taxonomy shared across the
//! Tally workspace (currently `tally-calculator` and `tally-cli`). Keeping them
//! here lets the CLI speak the calculator's language without a circular
//! dependency.

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod error;
mod types;

pub use error::{TallyError, TallyResult};
pub use types::{Cents, SplitKey, Weight};
