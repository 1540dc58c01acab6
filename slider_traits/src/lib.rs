#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Traits that define the hardware and time abstractions used by the system.
//!
//! - `StepDirDriver` models a step/direction/enable motor driver with two
//!   limit-switch inputs. One pulse per (micro)step; the caller paces
//!   inter-pulse intervals.
//! - `clock` offers a `MonotonicClock` for deterministic timing and testability.
//!
//! Other crates depend only on these traits, enabling simulation and multiple
//! hardware backends while keeping `slider_core` hardware-agnostic.
pub mod clock;

pub use clock::{Clock, MonotonicClock, VirtualClock};

/// Capability interface for a step/dir/enable stepper driver with two endstops.
///
/// Contract:
/// - `pulse_step` emits one rising/falling pulse whose high time is at least
///   `pulse_us` microseconds; it must be a no-op before a successful `setup`.
/// - `enable(false)` free-wheels the motor and is safe to call at any time.
/// - Endstop reads return the logical "pressed" state with any configured
///   polarity inversion already applied.
pub trait StepDirDriver {
    fn setup(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn enable(&mut self, enabled: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn set_dir(&mut self, positive: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn pulse_step(&mut self, pulse_us: u32)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn read_min_endstop(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
    fn read_max_endstop(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
    fn cleanup(&mut self);
}

// Allow boxed trait objects (Box<dyn StepDirDriver>) to be used where a generic
// D: StepDirDriver is expected.
impl<T: ?Sized + StepDirDriver> StepDirDriver for Box<T> {
    fn setup(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).setup()
    }
    fn enable(&mut self, enabled: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).enable(enabled)
    }
    fn set_dir(&mut self, positive: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_dir(positive)
    }
    fn pulse_step(
        &mut self,
        pulse_us: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).pulse_step(pulse_us)
    }
    fn read_min_endstop(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_min_endstop()
    }
    fn read_max_endstop(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_max_endstop()
    }
    fn cleanup(&mut self) {
        (**self).cleanup()
    }
}
