//! The motion worker: one long-lived thread consuming commands serially and
//! driving the step/dir capability one pulse at a time.
//!
//! Pacing is deadline-relative: every planner segment owns an absolute
//! wall-clock deadline, so host oversleep shortens later pulse intervals
//! instead of stretching the run. A segment that cannot keep up drops steps
//! at its boundary; the final snap puts the carriage on the planner's last
//! position regardless.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::Receiver;
use eyre::WrapErr;

use slider_config::SliderConfig;
use slider_traits::{Clock, StepDirDriver};

use crate::error::Result;
use crate::hw_err::map_driver_error;
use crate::planner::sample_profile;
use crate::profile::MotionProfile;
use crate::state::SharedState;
use crate::status::SliderStatus;

/// Planner sampling interval for profile runs.
const RUN_SAMPLE_DT_S: f64 = 0.02;
/// Absolute cap on the step rate, independent of configuration.
const MAX_STEP_RATE_HZ: f64 = 20_000.0;
/// Homing: fraction of max speed for the initial endstop seek.
const HOME_SEEK_SPEED_FRACTION: f64 = 0.25;
/// Homing: seek overshoot allowance past nominal travel.
const HOME_SEEK_MARGIN_MM: f64 = 10.0;
/// Homing: back-off distance and speed after the first touch.
const HOME_BACKOFF_MM: f64 = 5.0;
const HOME_BACKOFF_SPEED_MM_S: f64 = 30.0;
/// Homing: slow re-approach speed and distance ceiling.
const HOME_REAPPROACH_SPEED_MM_S: f64 = 15.0;
const HOME_REAPPROACH_MM: f64 = 10.0;
/// Priming: speed ceiling and already-there tolerance.
const PRIME_SPEED_MM_S: f64 = 50.0;
const PRIME_TOLERANCE_MM: f64 = 0.5;

/// Commands executed by the worker, strictly in submission order.
#[derive(Debug, Clone)]
pub enum Command {
    Home,
    Jog { distance_mm: f64, speed_mm_s: f64 },
    RunProfile(MotionProfile),
    Prime(MotionProfile),
}

pub(crate) struct Worker<D> {
    pub(crate) cfg: SliderConfig,
    pub(crate) driver: D,
    pub(crate) shared: Arc<SharedState>,
    pub(crate) cancel: Arc<AtomicBool>,
    /// Set once at teardown; unlike `cancel` it is never cleared.
    pub(crate) shutdown: Arc<AtomicBool>,
    pub(crate) rx: Receiver<Command>,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) steps_per_mm: f64,
}

impl<D: StepDirDriver> Worker<D> {
    /// Main loop: blocks on the queue, clears cancellation and the previous
    /// error at the top of each command, and keeps accepting commands after a
    /// runtime fault. Exits when every sender is gone.
    pub(crate) fn run(mut self) {
        while let Ok(cmd) = self.rx.recv() {
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }
            self.cancel.store(false, Ordering::Release);
            self.shared.set_error(None);
            let res = match cmd {
                Command::Home => self.do_home(),
                Command::Jog {
                    distance_mm,
                    speed_mm_s,
                } => self.do_jog(distance_mm, speed_mm_s),
                Command::RunProfile(profile) => self.do_run_profile(&profile),
                Command::Prime(profile) => self.do_prime(&profile),
            };
            if let Err(e) = res {
                tracing::error!(error = %e, "command failed");
                self.shared.set_error(Some(format!("{e:#}")));
                self.shared.set_status(SliderStatus::Error);
                self.disable_best_effort();
            }
        }
        self.disable_best_effort();
        self.driver.cleanup();
        tracing::debug!("motion worker exiting");
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire) || self.shutdown.load(Ordering::Acquire)
    }

    fn disable_best_effort(&mut self) {
        if let Err(e) = self.driver.enable(false) {
            tracing::warn!(error = %e, "driver disable failed");
        }
    }

    fn enable(&mut self) -> Result<()> {
        self.driver
            .enable(true)
            .map_err(|e| eyre::Report::new(map_driver_error(&*e)))
            .wrap_err("enable driver")
    }

    fn set_dir(&mut self, positive: bool) -> Result<()> {
        self.driver
            .set_dir(positive)
            .map_err(|e| eyre::Report::new(map_driver_error(&*e)))
            .wrap_err("set direction")
    }

    fn pulse(&mut self) -> Result<()> {
        self.driver
            .pulse_step(self.cfg.step_pulse_us)
            .map_err(|e| eyre::Report::new(map_driver_error(&*e)))
            .wrap_err("step pulse")
    }

    /// Endstop guarding the current direction of travel.
    fn endstop_hit(&mut self, dir_positive: bool) -> Result<bool> {
        let read = if dir_positive {
            self.driver.read_max_endstop()
        } else {
            self.driver.read_min_endstop()
        };
        read.map_err(|e| eyre::Report::new(map_driver_error(&*e)))
            .wrap_err("read endstop")
    }

    /// One step's worth of position tracking, clamped to the axis.
    fn advance_pos(&mut self, dir_positive: bool) {
        let step_mm = 1.0 / self.steps_per_mm;
        let delta = if dir_positive { step_mm } else { -step_mm };
        let pos = (self.shared.pos_mm() + delta).clamp(0.0, self.cfg.travel_mm);
        self.shared.set_pos_mm(pos);
    }

    /// Floor on the inter-pulse period from both pulse halves and the
    /// absolute step-rate cap. Speed limits are applied at the call sites.
    fn pulse_floor_s(&self) -> f64 {
        (f64::from(self.cfg.step_pulse_us) * 2.0 / 1e6).max(1.0 / MAX_STEP_RATE_HZ)
    }

    // ── Command primitives ───────────────────────────────────────────────

    fn do_home(&mut self) -> Result<()> {
        self.shared.set_status(SliderStatus::Homing);
        self.enable()?;
        tracing::info!("homing: seeking min endstop");
        self.seek_endstop(
            true,
            self.cfg.max_speed_mm_s * HOME_SEEK_SPEED_FRACTION,
            self.cfg.travel_mm + HOME_SEEK_MARGIN_MM,
        )?;
        if self.cancelled() {
            self.disable_best_effort();
            self.shared.set_status(SliderStatus::Idle);
            return Ok(());
        }
        self.relative_move(HOME_BACKOFF_MM, HOME_BACKOFF_SPEED_MM_S)?;
        self.seek_endstop(true, HOME_REAPPROACH_SPEED_MM_S, HOME_REAPPROACH_MM)?;
        self.shared.set_pos_mm(0.0);
        self.shared.set_homed(true);
        self.disable_best_effort();
        self.shared.set_status(SliderStatus::Idle);
        tracing::info!("homing complete, pos=0");
        Ok(())
    }

    fn do_jog(&mut self, distance_mm: f64, speed_mm_s: f64) -> Result<()> {
        self.shared.set_status(SliderStatus::Jogging);
        self.enable()?;
        let speed = speed_mm_s.clamp(1.0, self.cfg.max_speed_mm_s);
        self.relative_move(distance_mm, speed)?;
        self.disable_best_effort();
        self.shared.set_status(SliderStatus::Idle);
        Ok(())
    }

    /// Move to the profile's starting position, auto-homing first if the axis
    /// has no reference yet.
    fn do_prime(&mut self, profile: &MotionProfile) -> Result<()> {
        self.shared.set_status(SliderStatus::Priming);
        if !self.shared.homed() {
            self.do_home()?;
            if self.cancelled() {
                self.shared.set_status(SliderStatus::Stopped);
                return Ok(());
            }
            self.shared.set_status(SliderStatus::Priming);
        }
        let target = profile.start_pos_mm().clamp(0.0, self.cfg.travel_mm);
        if (self.shared.pos_mm() - target).abs() <= PRIME_TOLERANCE_MM {
            self.shared.set_status(SliderStatus::Idle);
            return Ok(());
        }
        let speed = PRIME_SPEED_MM_S.min(self.cfg.max_speed_mm_s);
        self.enable()?;
        let res = self.move_to_position(target, speed);
        self.disable_best_effort();
        res?;
        self.shared.set_status(SliderStatus::Idle);
        Ok(())
    }

    fn do_run_profile(&mut self, profile: &MotionProfile) -> Result<()> {
        self.shared.set_status(SliderStatus::Running);
        self.enable()?;
        let plan = sample_profile(profile, RUN_SAMPLE_DT_S);
        let total_t = plan.total_seconds().max(1e-6);
        let travel = self.cfg.travel_mm;
        let pulse_floor = self.pulse_floor_s();
        let speed_floor = 1.0 / (self.cfg.max_speed_mm_s * self.steps_per_mm);

        let start = self.clock.now();
        for i in 0..plan.len().saturating_sub(1) {
            if self.cancelled() {
                break;
            }
            let (t0, t1) = (plan.times[i], plan.times[i + 1]);
            let (p0, p1) = (plan.positions_mm[i], plan.positions_mm[i + 1]);
            let dt = (t1 - t0).max(1e-4);
            let dp_mm = p1.clamp(0.0, travel) - p0.clamp(0.0, travel);
            let steps = (dp_mm.abs() * self.steps_per_mm).round() as u64;

            // Absolute deadline for this segment, relative to profile start.
            let seg_deadline = start + Duration::from_secs_f64(t1);

            let dir_positive = dp_mm > 0.0;
            self.set_dir(dir_positive)?;

            let raw_period = if steps > 0 { dt / steps as f64 } else { dt };
            let period = raw_period.max(pulse_floor).max(speed_floor);
            let period_d = Duration::from_secs_f64(period);

            let mut stepped = 0u64;
            while stepped < steps {
                if self.cancelled() {
                    break;
                }
                if self.endstop_hit(dir_positive)? {
                    if dir_positive {
                        tracing::warn!("max endstop hit during profile; stopping segment");
                    } else {
                        tracing::warn!("min endstop hit during profile; stopping segment");
                    }
                    break;
                }
                // Out of segment time: drop the remaining steps rather than
                // sliding the rest of the profile.
                if self.clock.now() >= seg_deadline {
                    break;
                }
                self.pulse()?;
                self.advance_pos(dir_positive);
                stepped += 1;
                let now = self.clock.now();
                if now < seg_deadline {
                    let remaining = seg_deadline - now;
                    self.clock.sleep(remaining.min(period_d));
                }
            }

            // Finished early (zero steps or rate-limited): wait out the
            // remainder so the timeline stays aligned.
            let now = self.clock.now();
            if now < seg_deadline && !self.cancelled() {
                self.clock.sleep(seg_deadline - now);
            }
            self.shared.set_progress(t1 / total_t);
        }

        // Snap to the planner's final position to erase accumulated slop.
        self.shared
            .set_pos_mm(plan.end_position_mm().clamp(0.0, travel));
        self.disable_best_effort();
        if self.cancelled() {
            self.shared.set_status(SliderStatus::Stopped);
        } else {
            self.shared.set_status(SliderStatus::Idle);
            self.shared.set_progress(1.0);
        }
        Ok(())
    }

    // ── Low-level movement helpers ───────────────────────────────────────

    fn move_to_position(&mut self, target_pos_mm: f64, speed_mm_s: f64) -> Result<()> {
        let delta_mm = target_pos_mm - self.shared.pos_mm();
        if delta_mm.abs() < 0.001 {
            return Ok(());
        }
        self.relative_move(delta_mm, speed_mm_s)
    }

    fn relative_move(&mut self, distance_mm: f64, speed_mm_s: f64) -> Result<()> {
        let pos = self.shared.pos_mm();
        let target = (pos + distance_mm).clamp(0.0, self.cfg.travel_mm);
        let distance_mm = target - pos;
        if distance_mm.abs() < 1e-6 {
            return Ok(());
        }
        let steps_total = (distance_mm.abs() * self.steps_per_mm).round() as u64;
        let dir_positive = distance_mm > 0.0;
        self.set_dir(dir_positive)?;

        let speed = speed_mm_s.clamp(1.0, self.cfg.max_speed_mm_s);
        let period = (1.0 / (speed * self.steps_per_mm)).max(self.pulse_floor_s());
        let period_d = Duration::from_secs_f64(period);

        for _ in 0..steps_total {
            if self.cancelled() {
                break;
            }
            if self.endstop_hit(dir_positive)? {
                if dir_positive {
                    tracing::warn!("max endstop hit during move; stopping");
                } else {
                    tracing::warn!("min endstop hit during move; stopping");
                }
                break;
            }
            self.pulse()?;
            self.advance_pos(dir_positive);
            self.clock.sleep(period_d);
        }
        Ok(())
    }

    /// Drive toward one endstop until it reads pressed, cancellation, or the
    /// step ceiling derived from `max_travel_mm`.
    fn seek_endstop(
        &mut self,
        toward_min: bool,
        speed_mm_s: f64,
        max_travel_mm: f64,
    ) -> Result<()> {
        let dir_positive = !toward_min;
        self.set_dir(dir_positive)?;

        let steps_limit = (max_travel_mm.abs() * self.steps_per_mm).round() as u64;
        let steps_per_s = (speed_mm_s * self.steps_per_mm).max(1.0);
        let period = (1.0 / steps_per_s).max(self.pulse_floor_s());
        let period_d = Duration::from_secs_f64(period);

        for _ in 0..steps_limit {
            if self.cancelled() {
                break;
            }
            if self.endstop_hit(dir_positive)? {
                break;
            }
            self.pulse()?;
            self.advance_pos(dir_positive);
            self.clock.sleep(period_d);
        }
        Ok(())
    }
}
