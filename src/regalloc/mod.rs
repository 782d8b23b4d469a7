//! Live-interval extraction, constraint derivation and linear-scan
//! allocation (spec.md §4.5–§4.6).

pub mod allocator;
pub mod constraints;
pub mod interval;
pub mod register_set;

pub use allocator::{allocate, Allocation};
pub use constraints::derive_constraints;
pub use interval::{extract_intervals, LiveInterval};
pub use register_set::RegisterSet;
