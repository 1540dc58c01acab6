#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Motion core for a stepper-driven camera slider (hardware-agnostic).
//!
//! All hardware interaction goes through `slider_traits::StepDirDriver`, so
//! the same controller runs against real GPIO or the simulator.
//!
//! ## Architecture
//!
//! - **Easing**: linear and CSS-style cubic-Bezier curves (`easing` module)
//! - **Profile**: validated keyframe trajectories (`profile` module)
//! - **Planner**: fixed-interval sampling into (time, position) pairs
//! - **Controller**: FIFO command queue in front of a single worker thread
//!   that owns the driver and paces pulses against per-segment deadlines
//! - **Presets**: atomic JSON persistence of named profiles
//!
//! Cancellation is cooperative: `stop()` raises an atomic flag the worker
//! observes before every pulse, and drains the queue. Nothing signals a
//! sleeping thread; pulse periods bound the latency.

pub mod controller;
pub mod easing;
pub mod error;
pub mod mocks;
pub mod planner;
pub mod presets;
pub mod profile;
pub mod status;
pub mod worker;

mod hw_err;
mod state;

pub use controller::SliderController;
pub use easing::{CubicBezier, Ease, linear};
pub use error::{ProfileError, Result, SliderError};
pub use planner::{Plan, sample_profile};
pub use presets::PresetStore;
pub use profile::{Keyframe, MotionProfile};
pub use status::{SliderStatus, StatusSnapshot};
pub use worker::Command;
