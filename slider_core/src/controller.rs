//! Public controller: enqueue-only command surface, atomic status snapshots,
//! and lifecycle of the single motion worker.
//!
//! Safety: each controller spawns exactly one worker thread that is shut down
//! when the controller is dropped, preventing thread leaks. The slider is one
//! physical resource, so commands never execute concurrently.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel as xch;
use eyre::WrapErr;

use slider_config::SliderConfig;
use slider_traits::{Clock, MonotonicClock, StepDirDriver};

use crate::error::{Result, SliderError};
use crate::presets::PresetStore;
use crate::profile::MotionProfile;
use crate::state::SharedState;
use crate::status::StatusSnapshot;
use crate::worker::{Command, Worker};

pub struct SliderController {
    cfg: SliderConfig,
    shared: Arc<SharedState>,
    cancel: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    tx: Option<xch::Sender<Command>>,
    /// Second receiver handle onto the same queue; `stop()` drains it so
    /// pending commands never execute after a stop.
    drain_rx: xch::Receiver<Command>,
    presets: PresetStore,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl SliderController {
    /// Construct with the default driver selection: hardware first, simulator
    /// fallback (see `slider_hardware::init_driver`).
    pub fn new(cfg: SliderConfig) -> Result<Self> {
        let driver = slider_hardware::init_driver(&cfg);
        Self::with_driver(cfg, driver)
    }

    /// Construct around an externally built driver.
    pub fn with_driver(
        cfg: SliderConfig,
        driver: impl StepDirDriver + Send + 'static,
    ) -> Result<Self> {
        Self::with_driver_and_clock(cfg, driver, Arc::new(MonotonicClock::new()))
    }

    /// Construct with an explicit clock. Tests pass a
    /// `slider_traits::VirtualClock` so motion sleeps advance virtual time and
    /// the worker runs a whole profile in microseconds of wall time.
    pub fn with_driver_and_clock(
        cfg: SliderConfig,
        mut driver: impl StepDirDriver + Send + 'static,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Self> {
        cfg.validate().wrap_err("slider config")?;
        // Motor free-wheels until the first command.
        driver
            .enable(false)
            .map_err(|e| SliderError::Hardware(e.to_string()))
            .wrap_err("initial driver disable")?;

        let shared = Arc::new(SharedState::new());
        let cancel = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, rx) = xch::unbounded();
        let drain_rx = rx.clone();
        let presets = PresetStore::open(cfg.storage.preset_file.clone())?;

        let worker = Worker {
            cfg: cfg.clone(),
            driver,
            shared: shared.clone(),
            cancel: cancel.clone(),
            shutdown: shutdown.clone(),
            rx,
            clock,
            steps_per_mm: cfg.steps_per_mm(),
        };
        let handle = std::thread::Builder::new()
            .name("slider-motion".to_string())
            .spawn(move || worker.run())
            .wrap_err("spawn motion worker")?;

        Ok(Self {
            cfg,
            shared,
            cancel,
            shutdown,
            tx: Some(tx),
            drain_rx,
            presets,
            worker: Some(handle),
        })
    }

    pub fn config(&self) -> &SliderConfig {
        &self.cfg
    }

    pub fn presets(&self) -> &PresetStore {
        &self.presets
    }

    fn enqueue(&self, cmd: Command) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(SliderError::Shutdown)?;
        tx.send(cmd)
            .map_err(|_| SliderError::Shutdown)
            .wrap_err("queue command")
    }

    pub fn enqueue_home(&self) -> Result<()> {
        self.enqueue(Command::Home)
    }

    pub fn enqueue_jog(&self, distance_mm: f64, speed_mm_s: f64) -> Result<()> {
        self.enqueue(Command::Jog {
            distance_mm,
            speed_mm_s,
        })
    }

    pub fn enqueue_run_profile(&self, profile: MotionProfile) -> Result<()> {
        self.enqueue(Command::RunProfile(profile))
    }

    pub fn enqueue_prime(&self, profile: MotionProfile) -> Result<()> {
        self.enqueue(Command::Prime(profile))
    }

    /// Request cancellation of the current command and drop everything
    /// pending. Does not preempt an in-flight sleep; the worker observes the
    /// flag at its next pre-pulse check, so latency is bounded by one pulse
    /// period. The last error, if any, is left for status queries.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Release);
        while self.drain_rx.try_recv().is_ok() {}
    }

    pub fn status(&self) -> StatusSnapshot {
        self.shared.snapshot()
    }
}

impl Drop for SliderController {
    fn drop(&mut self) {
        // Stop whatever is running, close the queue, and wait for the worker
        // to disable the driver and exit. The shutdown flag keeps any command
        // still sitting in the queue from starting.
        self.shutdown.store(true, Ordering::Release);
        self.cancel.store(true, Ordering::Release);
        drop(self.tx.take());
        while self.drain_rx.try_recv().is_ok() {}
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("motion worker joined"),
                Err(e) => tracing::warn!(?e, "motion worker panicked during shutdown"),
            }
        }
    }
}
