//! Asset pipeline: the loader seam, a glTF loader, textures, model
//! normalization and the load coordinator.
//!
//! Loads never block the frame thread. A loader hands back a boxed future;
//! the [`LoadCoordinator`] polls all of them without waiting and applies
//! each completion to the scene as it arrives, in whatever order that is.
//!
//! # Layout
//! Model paths and texture paths are relative to the loader's root
//! directory. Textures are stored by key in a [`TextureRegistry`] so
//! materials can refer to them before they arrive.

mod coordinator;
mod gltf_loader;
mod loader;
mod model;
mod normalize;

pub use coordinator::{AttachContext, LoadCoordinator, LoadOutcome, ModelRequest, TextureRequest};
pub use gltf_loader::GltfLoader;
pub use loader::{AssetError, AssetLoader, LoadFuture, MemoryLoader};
pub use model::{ColorSpace, LoadedModel, Texture, TextureFilter, TextureOptions, TextureRegistry};
pub use normalize::{MaterialPreset, NormalizeSpec, Normalization, ScalePolicy, normalize};
