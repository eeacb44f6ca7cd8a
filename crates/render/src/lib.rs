//! Rendering adapter: camera, orbit controls, viewport binding and the
//! renderer-agnostic interface.
//!
//! # Invariants
//! - Renderers read the scene, they never mutate it.
//! - Projection always matches the last bound viewport aspect.

mod camera;
mod controls;
mod frame;
mod renderer;
mod viewport;

pub use camera::PerspectiveCamera;
pub use controls::OrbitControls;
pub use frame::{DrawItem, PointLight, SceneLights, collect_draws, collect_lights};
pub use renderer::{DebugTextRenderer, FrameView, Renderer};
pub use viewport::{SurfaceSize, ViewportBinder};
