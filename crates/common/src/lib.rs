//! Shared configuration for the workshop harness.
//!
//! Every tunable constant of the camera, the frame pacer and the simulation
//! lives here with its default, so binaries can load it from YAML and
//! override it from the command line.

pub mod config;

pub use config::{CameraConfig, ConfigError, PacerConfig, SimConfig, WindowConfig, WorkshopConfig};
