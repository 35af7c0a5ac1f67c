//! Input: window events are translated into [`Action`]s by the app, and
//! actions are applied here to the camera and the world.
//!
//! # Invariants
//! - Actions never touch the frame pacer.
//! - A pointer action on a degenerate viewport is dropped, not guessed at.

pub mod action;

pub use action::{Action, ActionOutcome, apply_action};
