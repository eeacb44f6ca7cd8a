//! Model animation: keyframe clips and the driver that plays them.
//!
//! # Invariants
//! - A model gets at most one binding, created when it is attached.
//! - Binding cursors only grow, and only by sanitized frame deltas.
//! - Looping is decided by the clip, never by the driver.

mod clip;
mod driver;

pub use clip::{AnimationClip, LoopMode, Track, TrackValues};
pub use driver::{AnimationBinding, AnimationDriver, MAX_FRAME_DELTA, sanitize_delta, select_clip};
