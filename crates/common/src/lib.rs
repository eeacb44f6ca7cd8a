//! Shared math types for the starfolio scene.
//!
//! # Invariants
//! - All types are plain values; nothing here owns scene state.
//! - Angles are radians, colours are linear floats in `[0, 1]`.

mod bounds;
mod color;
mod ray;
mod types;

pub use bounds::Aabb;
pub use color::Rgb;
pub use ray::Ray;
pub use types::{NodeId, Transform};
