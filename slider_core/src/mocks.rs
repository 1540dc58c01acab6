//! Test and helper mocks for slider_core.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use slider_traits::StepDirDriver;

/// Observable driver state shared between a `RecordingDriver` and the test
/// that scripted it. Pulses are split by direction so homing tests can assert
/// which way the carriage moved.
#[derive(Debug, Default)]
pub struct DriverProbe {
    pulses_pos: AtomicU64,
    pulses_neg: AtomicU64,
    enabled: AtomicBool,
    dir_positive: AtomicBool,
    min_pressed: AtomicBool,
    max_pressed: AtomicBool,
}

impl DriverProbe {
    pub fn pulses(&self) -> u64 {
        self.pulses_pos.load(Ordering::Acquire) + self.pulses_neg.load(Ordering::Acquire)
    }
    pub fn pulses_positive(&self) -> u64 {
        self.pulses_pos.load(Ordering::Acquire)
    }
    pub fn pulses_negative(&self) -> u64 {
        self.pulses_neg.load(Ordering::Acquire)
    }
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
    pub fn press_min(&self, pressed: bool) {
        self.min_pressed.store(pressed, Ordering::Release);
    }
    pub fn press_max(&self, pressed: bool) {
        self.max_pressed.store(pressed, Ordering::Release);
    }
}

/// Driver that records everything and never sleeps; controller tests run at
/// full speed against it.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    probe: Arc<DriverProbe>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self) -> Arc<DriverProbe> {
        self.probe.clone()
    }
}

impl StepDirDriver for RecordingDriver {
    fn setup(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
    fn enable(&mut self, enabled: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.probe.enabled.store(enabled, Ordering::Release);
        Ok(())
    }
    fn set_dir(&mut self, positive: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.probe.dir_positive.store(positive, Ordering::Release);
        Ok(())
    }
    fn pulse_step(
        &mut self,
        _pulse_us: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.probe.dir_positive.load(Ordering::Acquire) {
            self.probe.pulses_pos.fetch_add(1, Ordering::AcqRel);
        } else {
            self.probe.pulses_neg.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }
    fn read_min_endstop(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.probe.min_pressed.load(Ordering::Acquire))
    }
    fn read_max_endstop(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.probe.max_pressed.load(Ordering::Acquire))
    }
    fn cleanup(&mut self) {
        self.probe.enabled.store(false, Ordering::Release);
    }
}

/// Driver whose first `enable(true)` fails; exercises the worker's
/// runtime-fault path while still letting later commands succeed.
#[derive(Debug, Default)]
pub struct FailingDriver {
    tripped: bool,
}

impl StepDirDriver for FailingDriver {
    fn setup(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
    fn enable(&mut self, enabled: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if enabled && !self.tripped {
            self.tripped = true;
            return Err(Box::new(std::io::Error::other("enable line stuck")));
        }
        Ok(())
    }
    fn set_dir(&mut self, _positive: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
    fn pulse_step(
        &mut self,
        _pulse_us: u32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
    fn read_min_endstop(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(false)
    }
    fn read_max_endstop(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(false)
    }
    fn cleanup(&mut self) {}
}
