//! The portfolio session: configuration, the session clock, procedural
//! motion, the explicit session context and the frame loop that drives it.
//!
//! # Invariants
//! - The [`Session`] is the only owner of scene, camera and input state.
//! - [`Session::update`] is the only per-frame mutation path and needs no GPU.
//! - Procedural motion is a pure function of elapsed time.

mod clock;
mod config;
mod frame;
mod motion;
mod session;

pub use clock::{FrameClock, FrameTime};
pub use config::{
    ConfigError, GroupConfig, LightingConfig, ModelConfig, MotionConfig, OrbitingLightConfig, PortfolioConfig,
    TextureConfig,
};
pub use frame::{FrameLoop, ShutdownReport};
pub use motion::{Motion, MotionPlan};
pub use session::{FrameInput, FrameReport, Session, SessionError};
