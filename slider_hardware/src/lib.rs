//! Step/dir driver backends for the slider.
//!
//! `SimDriver` is always available and is what CI and developer machines run
//! on. `GpioDriver` (feature `hardware`, Linux only) drives real pins through
//! rppal. `init_driver` tries hardware first and silently falls back to the
//! simulator, so the service comes up the same way everywhere.
pub mod error;

pub use error::{HwError, Result};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use slider_config::SliderConfig;
use slider_traits::StepDirDriver;

/// Shared view into a `SimDriver`, for tests and the self-check command.
///
/// The worker owns the driver exclusively, so endstop state is exposed through
/// atomics that test code can flip while a command is executing.
#[derive(Debug, Clone, Default)]
pub struct SimHandle {
    min_pressed: Arc<AtomicBool>,
    max_pressed: Arc<AtomicBool>,
    pulses: Arc<AtomicU64>,
    enabled: Arc<AtomicBool>,
}

impl SimHandle {
    pub fn press_min(&self, pressed: bool) {
        self.min_pressed.store(pressed, Ordering::Release);
    }
    pub fn press_max(&self, pressed: bool) {
        self.max_pressed.store(pressed, Ordering::Release);
    }
    pub fn pulses(&self) -> u64 {
        self.pulses.load(Ordering::Acquire)
    }
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }
}

/// Simulator that honours the driver contract without touching GPIO.
/// Endstops read unpressed unless mutated through the handle.
#[derive(Debug, Default)]
pub struct SimDriver {
    handle: SimHandle,
    dir_positive: bool,
    ready: bool,
}

impl SimDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }
}

impl StepDirDriver for SimDriver {
    fn setup(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.ready = true;
        tracing::info!("simulator driver ready");
        Ok(())
    }

    fn enable(
        &mut self,
        enabled: bool,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.handle.enabled.store(enabled, Ordering::Release);
        tracing::debug!(enabled, "driver enable (sim)");
        Ok(())
    }

    fn set_dir(
        &mut self,
        positive: bool,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.dir_positive = positive;
        Ok(())
    }

    fn pulse_step(
        &mut self,
        pulse_us: u32,
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.ready || !self.handle.enabled.load(Ordering::Acquire) {
            return Ok(());
        }
        self.handle.pulses.fetch_add(1, Ordering::AcqRel);
        std::thread::sleep(std::time::Duration::from_micros(u64::from(pulse_us)));
        Ok(())
    }

    fn read_min_endstop(
        &mut self,
    ) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.handle.min_pressed.load(Ordering::Acquire))
    }

    fn read_max_endstop(
        &mut self,
    ) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.handle.max_pressed.load(Ordering::Acquire))
    }

    fn cleanup(&mut self) {
        self.handle.enabled.store(false, Ordering::Release);
        tracing::debug!("simulator driver cleanup");
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
mod gpio {
    use super::*;
    use rppal::gpio::{Gpio, InputPin, OutputPin};
    use std::time::{Duration, Instant};

    struct GpioIo {
        step: OutputPin,
        dir: OutputPin,
        enable: OutputPin,
        min_endstop: InputPin,
        max_endstop: InputPin,
    }

    /// rppal-backed driver: BCM numbering, active-low enable, pulled-up
    /// endstop inputs. All trait methods are no-ops until `setup` succeeds.
    pub struct GpioDriver {
        cfg: SliderConfig,
        io: Option<GpioIo>,
    }

    impl GpioDriver {
        pub fn new(cfg: &SliderConfig) -> Self {
            Self {
                cfg: cfg.clone(),
                io: None,
            }
        }

        fn pressed(&self, raw_low: bool) -> bool {
            if self.cfg.invert_endstops {
                !raw_low
            } else {
                raw_low
            }
        }
    }

    fn gpio_err(e: rppal::gpio::Error) -> Box<dyn std::error::Error + Send + Sync> {
        Box::new(HwError::Gpio(e.to_string()))
    }

    impl StepDirDriver for GpioDriver {
        fn setup(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            let gpio = Gpio::new().map_err(
                |e| -> Box<dyn std::error::Error + Send + Sync> {
                    Box::new(HwError::Unavailable(e.to_string()))
                },
            )?;
            let pins = self.cfg.pins;
            let step = gpio.get(pins.step).map_err(gpio_err)?.into_output_low();
            let dir = gpio.get(pins.dir).map_err(gpio_err)?.into_output_low();
            // Active-low enable: start disabled.
            let enable = gpio.get(pins.enable).map_err(gpio_err)?.into_output_high();
            let min_endstop = gpio
                .get(pins.min_endstop)
                .map_err(gpio_err)?
                .into_input_pullup();
            let max_endstop = gpio
                .get(pins.max_endstop)
                .map_err(gpio_err)?
                .into_input_pullup();
            self.io = Some(GpioIo {
                step,
                dir,
                enable,
                min_endstop,
                max_endstop,
            });
            Ok(())
        }

        fn enable(
            &mut self,
            enabled: bool,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            if let Some(io) = self.io.as_mut() {
                if enabled {
                    io.enable.set_low();
                } else {
                    io.enable.set_high();
                }
            }
            Ok(())
        }

        fn set_dir(
            &mut self,
            positive: bool,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            if let Some(io) = self.io.as_mut() {
                if positive {
                    io.dir.set_high();
                } else {
                    io.dir.set_low();
                }
            }
            Ok(())
        }

        fn pulse_step(
            &mut self,
            pulse_us: u32,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            if let Some(io) = self.io.as_mut() {
                io.step.set_high();
                // Busy-wait the high half: at 4 us, a sleep would oversleep by
                // orders of magnitude.
                let high = Duration::from_micros(u64::from(pulse_us));
                let t0 = Instant::now();
                while t0.elapsed() < high {
                    std::hint::spin_loop();
                }
                io.step.set_low();
            }
            Ok(())
        }

        fn read_min_endstop(
            &mut self,
        ) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
            match self.io.as_ref() {
                Some(io) => Ok(self.pressed(io.min_endstop.is_low())),
                None => Ok(false),
            }
        }

        fn read_max_endstop(
            &mut self,
        ) -> std::result::Result<bool, Box<dyn std::error::Error + Send + Sync>> {
            match self.io.as_ref() {
                Some(io) => Ok(self.pressed(io.max_endstop.is_low())),
                None => Ok(false),
            }
        }

        fn cleanup(&mut self) {
            if let Some(io) = self.io.as_mut() {
                io.enable.set_high();
                io.step.set_low();
                io.dir.set_low();
            }
            self.io = None;
        }
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub use gpio::GpioDriver;

/// Select a driver at runtime: hardware first, simulator on any init failure.
/// The fallback is logged but otherwise invisible to callers.
pub fn init_driver(cfg: &SliderConfig) -> Box<dyn StepDirDriver + Send> {
    #[cfg(all(feature = "hardware", target_os = "linux"))]
    {
        let mut drv = GpioDriver::new(cfg);
        match drv.setup() {
            Ok(()) => {
                tracing::info!("using rppal GPIO driver");
                return Box::new(drv);
            }
            Err(e) => tracing::info!(error = %e, "GPIO init failed, falling back to simulator"),
        }
    }
    #[cfg(not(all(feature = "hardware", target_os = "linux")))]
    let _ = cfg;

    let mut sim = SimDriver::new();
    if let Err(e) = sim.setup() {
        tracing::warn!(error = %e, "simulator setup");
    }
    Box::new(sim)
}
