//! Small helpers shared by the kiln crates.

pub mod by_ptr;
