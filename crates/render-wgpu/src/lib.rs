//! wgpu render backend for the workshop harness.
//!
//! Uploads the frame's debug-draw lines and draws them with the camera's
//! orthographic projection.
//!
//! # Invariants
//! - Renderer never mutates world or camera state.
//! - A degenerate camera clears the frame and draws nothing.

mod gpu;
mod shaders;

pub use gpu::WgpuRenderer;
