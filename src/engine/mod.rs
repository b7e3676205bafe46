//! The detection scheduler.
//!
//! Owns the camera session and the two classifier timers, feeds tick results
//! through the hysteresis counters and reports the resolved verdict to the
//! registered listeners.

mod builder;
mod lifecycle;
mod scheduler;
mod ticks;
mod types;


pub use builder::DetectionEngineBuilder;
pub use scheduler::DetectionEngine;
pub use types::{EngineState, EngineStatus, VerdictListener};
