//! Starfield backdrop: a fixed buffer of coloured points around the origin.
//!
//! Points are rejection sampled inside the cube of half-width
//! `max_range / 2`, discarding anything closer than `min_radius` to the
//! origin. The result is a cube with a spherical hole, not a spherical shell;
//! the corners are denser than a true shell would be and that is the
//! intended look.
//!
//! # Invariants
//! - `len()` equals the configured count.
//! - Every point satisfies `|p| >= min_radius` and `|p.axis| <= max_range / 2`.
//! - The buffer never changes after generation.

mod field;
mod palette;

pub use field::{Star, StarField, StarFieldConfig, StarFieldError};
pub use palette::Palette;
