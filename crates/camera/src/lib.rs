//! 2D camera for the workshop harness.
//!
//! Maps pointer coordinates from the window into the simulation's world
//! space and back, and produces the orthographic projection the renderer
//! draws with.
//!
//! # Invariants
//! - `screen_to_world` and `world_to_screen` are exact inverses for the same view.
//! - The vertical world extent depends only on zoom, never on the window's shape.
//! - A zero-sized viewport, non-positive zoom or a view too large for `f64` is
//!   reported as an error, never as NaN.

mod camera;

pub use camera::{Camera, CameraError, ViewState};
