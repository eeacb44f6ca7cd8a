//! Scene graph: the node arena every other crate reads and writes.
//!
//! # Invariants
//! - A node's parent is set once, when it is added or grafted.
//! - Node ids are stable for the lifetime of the tree; nodes are never removed.
//! - Traversal is typed: visitors receive groups, drawables and lights
//!   through separate callbacks.

pub mod node;
pub mod scene;
pub mod tree;
pub mod visit;

pub use node::{Drawable, Light, Material, Mesh, NodeKind, SceneNode};
pub use scene::{Scene, SceneEvent};
pub use tree::{NodeTree, SceneError};
pub use visit::{BoundsVisitor, NodeVisitor};
