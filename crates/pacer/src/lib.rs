//! Frame pacing for a fixed-rate real-time loop.
//!
//! The pacer sleeps away whatever is left of the target period after each
//! iteration's work, and feeds the measured error back through a low-pass
//! filter so that systematic sleep overshoot is corrected over time.
//!
//! # Invariants
//! - The duration handed to [`Clock::sleep`] is always positive; a frame that
//!   overran its budget simply does not sleep.
//! - Pacing never fails.
//! - One pacer is owned by one loop thread.

mod clock;
mod pacer;
mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use pacer::{FramePacer, PaceReport};
pub use stats::FrameStats;
