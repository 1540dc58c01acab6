//! End-to-end controller behavior against the recording driver: homing into a
//! pressed endstop, mid-run cancellation, prime no-ops, and fault recovery.
//!
//! Most tests run on a `VirtualClock`, so the worker's pacing sleeps advance
//! virtual time and whole profiles finish in microseconds of wall time. The
//! cancellation and teardown tests stay on the real clock: they need a run
//! that is genuinely in flight when stop() lands.

use std::sync::Arc;
use std::time::{Duration, Instant};

use slider_config::SliderConfig;
use slider_core::mocks::{FailingDriver, RecordingDriver};
use slider_core::{
    Ease, Keyframe, MotionProfile, SliderController, SliderStatus, StatusSnapshot, sample_profile,
};
use slider_traits::{StepDirDriver, VirtualClock};

/// Coarse mechanics (25 steps/mm) and a short axis keep test moves fast.
fn test_cfg(dir: &std::path::Path) -> SliderConfig {
    let mut cfg = SliderConfig::default();
    cfg.microstep = 1;
    cfg.travel_mm = 50.0;
    cfg.max_speed_mm_s = 200.0;
    cfg.storage.preset_file = dir.join("presets.json");
    cfg
}

/// Controller whose worker paces against a `VirtualClock`.
fn virtual_controller(
    cfg: SliderConfig,
    driver: impl StepDirDriver + Send + 'static,
) -> SliderController {
    SliderController::with_driver_and_clock(cfg, driver, Arc::new(VirtualClock::new()))
        .expect("controller")
}

fn kf(t: f64, pos_mm: f64) -> Keyframe {
    Keyframe {
        t,
        pos_mm,
        ease: Ease::Linear,
    }
}

fn profile(length_mm: f64, keyframes: Vec<Keyframe>) -> MotionProfile {
    MotionProfile {
        length_mm,
        keyframes,
        max_speed_mm_s: 120.0,
        max_accel_mm_s2: 300.0,
    }
    .validated()
    .expect("valid test profile")
}

fn wait_for(
    ctl: &SliderController,
    timeout: Duration,
    what: &str,
    pred: impl Fn(&StatusSnapshot) -> bool,
) -> StatusSnapshot {
    let deadline = Instant::now() + timeout;
    loop {
        let snap = ctl.status();
        if pred(&snap) {
            return snap;
        }
        assert!(
            Instant::now() < deadline,
            "timed out waiting for {what}; last status {snap:?}"
        );
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn home_with_pressed_min_endstop_finishes_without_seeking() {
    let dir = tempfile::tempdir().unwrap();
    let driver = RecordingDriver::new();
    let probe = driver.probe();
    probe.press_min(true);

    let ctl = virtual_controller(test_cfg(dir.path()), driver);
    ctl.enqueue_home().unwrap();
    let snap = wait_for(&ctl, Duration::from_secs(2), "homed", |s| s.homed);

    assert_eq!(snap.pos_mm, 0.0);
    assert!(snap.homed);
    wait_for(&ctl, Duration::from_secs(2), "idle", |s| {
        s.status == SliderStatus::Idle
    });
    // Seek and re-approach saw the pressed switch before the first pulse; the
    // only motion is the 5 mm back-off away from it.
    assert_eq!(probe.pulses_negative(), 0);
    assert_eq!(probe.pulses_positive(), 125);
    assert!(!probe.enabled(), "driver left enabled after homing");
}

#[test]
fn stop_cancels_a_running_profile_and_drains_the_queue() {
    let dir = tempfile::tempdir().unwrap();
    let driver = RecordingDriver::new();
    let probe = driver.probe();

    let ctl = SliderController::with_driver(test_cfg(dir.path()), driver).unwrap();
    // 10 s linear sweep; positions clamp to the 50 mm axis inside the run.
    ctl.enqueue_run_profile(profile(1000.0, vec![kf(0.0, 0.0), kf(10.0, 100.0)]))
        .unwrap();
    // A pending command that must never execute once stop() drains the queue.
    ctl.enqueue_home().unwrap();

    wait_for(&ctl, Duration::from_secs(2), "running", |s| {
        s.status == SliderStatus::Running
    });
    std::thread::sleep(Duration::from_millis(500));
    ctl.stop();

    let snap = wait_for(&ctl, Duration::from_millis(500), "stopped", |s| {
        s.status == SliderStatus::Stopped
    });
    assert!(snap.progress < 1.0);
    assert!(!probe.enabled(), "driver must be disabled on cancellation");

    // The drained home command never runs.
    std::thread::sleep(Duration::from_millis(100));
    let snap = ctl.status();
    assert!(!snap.homed);
    assert_eq!(snap.status, SliderStatus::Stopped);
}

#[test]
fn prime_at_start_position_is_a_no_op_and_keeps_homed() {
    let dir = tempfile::tempdir().unwrap();
    let driver = RecordingDriver::new();
    let probe = driver.probe();
    probe.press_min(true);

    let ctl = virtual_controller(test_cfg(dir.path()), driver);
    ctl.enqueue_home().unwrap();
    wait_for(&ctl, Duration::from_secs(2), "homed", |s| {
        s.homed && s.status == SliderStatus::Idle
    });
    let pulses_after_home = probe.pulses();

    // First keyframe within the 0.5 mm tolerance of the homed position.
    ctl.enqueue_prime(profile(100.0, vec![kf(0.0, 0.3), kf(1.0, 40.0)]))
        .unwrap();
    std::thread::sleep(Duration::from_millis(50));
    let snap = wait_for(&ctl, Duration::from_secs(2), "idle after prime", |s| {
        s.status == SliderStatus::Idle
    });

    assert_eq!(probe.pulses(), pulses_after_home, "prime must not move");
    assert!(snap.homed, "prime must not re-home a homed axis");
}

#[test]
fn prime_moves_to_the_start_of_an_offset_profile() {
    let dir = tempfile::tempdir().unwrap();
    let driver = RecordingDriver::new();
    let probe = driver.probe();
    probe.press_min(true);

    let ctl = virtual_controller(test_cfg(dir.path()), driver);
    ctl.enqueue_home().unwrap();
    wait_for(&ctl, Duration::from_secs(2), "homed", |s| {
        s.homed && s.status == SliderStatus::Idle
    });

    ctl.enqueue_prime(profile(100.0, vec![kf(0.0, 10.0), kf(1.0, 40.0)]))
        .unwrap();
    let snap = wait_for(&ctl, Duration::from_secs(2), "primed", |s| {
        s.status == SliderStatus::Idle && (s.pos_mm - 10.0).abs() < 0.1
    });
    assert!(snap.homed);
    assert!(!probe.enabled());
}

#[test]
fn completed_run_lands_exactly_on_the_planned_end_position() {
    let dir = tempfile::tempdir().unwrap();
    let driver = RecordingDriver::new();

    let cfg = test_cfg(dir.path());
    // Long enough that a wall-clock run would be felt; the virtual clock
    // makes it immediate.
    let prof = profile(50.0, vec![kf(0.0, 0.0), kf(8.0, 42.0)]);
    let plan_end = sample_profile(&prof, 0.02).end_position_mm();

    let ctl = virtual_controller(cfg, driver);
    ctl.enqueue_run_profile(prof).unwrap();
    let snap = wait_for(&ctl, Duration::from_secs(2), "run complete", |s| {
        s.status == SliderStatus::Idle && s.progress >= 1.0
    });

    assert!((snap.pos_mm - plan_end).abs() < 1e-9);
    assert_eq!(snap.progress, 1.0);
    assert_eq!(snap.error, None);
}

#[test]
fn max_endstop_terminates_a_positive_move_early() {
    let dir = tempfile::tempdir().unwrap();
    let driver = RecordingDriver::new();
    let probe = driver.probe();
    probe.press_max(true);

    let ctl = virtual_controller(test_cfg(dir.path()), driver);
    ctl.enqueue_jog(20.0, 100.0).unwrap();
    std::thread::sleep(Duration::from_millis(50));
    let snap = wait_for(&ctl, Duration::from_secs(2), "idle after jog", |s| {
        s.status == SliderStatus::Idle
    });

    // Treated as normal early termination, not an error.
    assert_eq!(probe.pulses(), 0);
    assert_eq!(snap.error, None);
}

#[test]
fn runtime_fault_sets_error_status_and_the_next_command_clears_it() {
    let dir = tempfile::tempdir().unwrap();
    let ctl = virtual_controller(test_cfg(dir.path()), FailingDriver::default());

    ctl.enqueue_home().unwrap();
    let snap = wait_for(&ctl, Duration::from_secs(2), "error status", |s| {
        s.status == SliderStatus::Error
    });
    let msg = snap.error.expect("fault message recorded");
    assert!(msg.contains("enable"), "unexpected error text: {msg}");

    // The worker survives the fault and the next command clears the error.
    ctl.enqueue_jog(0.0, 10.0).unwrap();
    let snap = wait_for(&ctl, Duration::from_secs(2), "recovered", |s| {
        s.status == SliderStatus::Idle
    });
    assert_eq!(snap.error, None);
}

#[test]
fn dropping_the_controller_interrupts_a_long_run() {
    let dir = tempfile::tempdir().unwrap();
    let driver = RecordingDriver::new();
    let probe = driver.probe();

    let t0 = Instant::now();
    {
        let ctl = SliderController::with_driver(test_cfg(dir.path()), driver).unwrap();
        ctl.enqueue_run_profile(profile(1000.0, vec![kf(0.0, 0.0), kf(30.0, 100.0)]))
            .unwrap();
        wait_for(&ctl, Duration::from_secs(2), "running", |s| {
            s.status == SliderStatus::Running
        });
    }
    assert!(
        t0.elapsed() < Duration::from_secs(5),
        "teardown should not wait out the profile"
    );
    assert!(!probe.enabled(), "teardown must disable the driver");
}
