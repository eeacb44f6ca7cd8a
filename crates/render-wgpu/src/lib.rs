//! wgpu render backend for the portfolio scene.
//!
//! Draws the starfield as instanced camera-facing billboards and every
//! visible drawable as a lit, optionally textured mesh.
//!
//! # Invariants
//! - The renderer never mutates the scene; GPU resources are a cache keyed
//!   by node id and texture key.
//! - The returned frame target is presented by the caller, after overlays.

mod gpu;
mod pack;
mod shaders;

pub use gpu::{FrameTarget, GpuError, WgpuRenderer};
