//! Small helpers shared across the crate.
pub mod uom_macros;
