//! Input: window events reduced to actions, pointer state, and hit testing
//! of the pointer ray against the interactive model.
//!
//! # Invariants
//! - Pointer events only update [`PointerState`]; hit testing happens once
//!   per frame in [`HitTester::evaluate`].
//! - A click navigates only while hovering, and at most once per click.

pub mod action;
mod picking;
mod pointer;

pub use action::Action;
pub use picking::{Hit, HitTester, HoverTransition, Navigator, pick};
pub use pointer::PointerState;
