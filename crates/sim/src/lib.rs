//! Simulation: a 2D rigid-body world advanced in fixed timesteps.
//!
//! # Invariants
//! - Every `step` advances the world by exactly the configured timestep,
//!   regardless of how long the real frame took.
//! - Given the same sequence of operations, two worlds reach identical states.

pub mod world;

pub use world::{BodyState, Shape, ShapeKind, SimWorld};
