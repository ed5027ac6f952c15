//! **seqlens** evaluates sequential optical systems (lenses) by ray tracing
//! and paraxial matrix analysis.
//!
//! Given an ordered prescription of refracting surfaces and the media between
//! them, the crate answers: where does a given ray go
//! ([`Design::trace_ray_through_system`]), where does the system focus
//! ([`Design::trace_marginal_ray_to_image_distance`],
//! [`Design::autofocus`]) and what is its equivalent optical power
//! ([`Design::meyer_arendt_system_matrix`]).
//!
//! The crate deliberately exposes plain functions over numeric and vector
//! types only. Surface editing, visualization and file handling are the
//! business of external callers; the sequential tracer's per-segment callback
//! is the sole extension point a visualizer needs.
//!
//! All computation is synchronous and single-threaded. Every analysis
//! operation takes a design by shared reference; only [`Design::autofocus`]
//! mutates a design (a single thickness field), so the single-writer rule —
//! never edit a surface list while a trace or scan runs over it — falls out
//! of the borrow checker.
#![allow(clippy::module_name_repetitions)]

pub mod design;
pub mod document;
pub mod error;
pub mod material;
pub mod refractive_index;
pub mod surface;
pub mod utils;

pub use design::Design;
pub use material::MaterialCatalog;
