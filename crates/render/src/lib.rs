//! Debug drawing: turns the simulation world into colored line segments.
//!
//! # Invariants
//! - Renderers never mutate the world or the camera.
//! - Geometry is produced in world space; mapping to the screen is the
//!   camera's job.

mod draw;
mod renderer;

pub use draw::{Color, DebugDraw, Line};
pub use renderer::{DebugTextRenderer, Renderer};
