//! The calculator crate for Tally.
//!
//! This crate provides the proportional cent allocator and the manufacturing
//! split built on top of it. Everything here is pure: no I/O, no shared state,
//! safe to call from any number of threads.

#![deny(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod allocator;
pub mod manufacturing;

pub use allocator::{Allocation, AllocationLine, AllocationRequest, allocate};
pub use manufacturing::{
    BillLine, ComponentInput, DescriptionFormat, ManufacturingSplit, ManufacturingSplitInput,
    SplitLimits,
};
pub use tally_types::{Cents, SplitKey, TallyError, TallyResult, Weight};
