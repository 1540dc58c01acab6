#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! CLI entrypoint for the slider service.
//!
//! Responsibilities:
//! - Parse config/flags, apply SLIDER_* env overrides, validate
//! - Initialize tracing and manage log sinks
//! - `serve` exposes the HTTP API; one-shot subcommands enqueue a single
//!   motion command and poll status until the worker settles
//! - Optional RT elevation via libc on supported OSes

mod cli;
mod rt;
mod server;
mod tracing_setup;

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use eyre::WrapErr;

use slider_config::SliderConfig;
use slider_core::{MotionProfile, SliderController, SliderStatus, StatusSnapshot};
use slider_traits::StepDirDriver;

use cli::{Cli, Commands};
use tracing_setup::init_tracing;

/// Grace period for one-shot commands whose status transition is too quick to
/// observe (e.g. a prime that is already at its target).
const SETTLE_GRACE: Duration = Duration::from_secs(2);

fn main() -> eyre::Result<()> {
    let _ = color_eyre::install();
    real_main()
}

fn real_main() -> eyre::Result<()> {
    let cli = Cli::parse();

    let cfg = slider_config::load(cli.config.as_deref())?;
    cfg.validate().wrap_err("invalid configuration")?;

    init_tracing(cli.json, &cli.log_level, cfg.logging.file.as_deref());

    match cli.cmd {
        Commands::Serve { bind, rt, rt_prio } => {
            rt::setup_rt_once(rt, rt_prio);
            serve_cmd(cfg, &bind)
        }
        Commands::Home => one_shot(cfg, cli.json, |ctl| ctl.enqueue_home()),
        Commands::Jog {
            distance_mm,
            speed_mm_s,
        } => one_shot(cfg, cli.json, move |ctl| {
            ctl.enqueue_jog(distance_mm, speed_mm_s)
        }),
        Commands::Run {
            profile,
            prime,
            rt,
            rt_prio,
        } => {
            // Validate before any hardware is touched; a malformed profile
            // must never reach the worker.
            let text = std::fs::read_to_string(&profile)
                .wrap_err_with(|| format!("read profile {profile:?}"))?;
            let parsed = MotionProfile::from_json(&text)
                .wrap_err_with(|| format!("invalid profile {profile:?}"))?;
            rt::setup_rt_once(rt, rt_prio);
            one_shot(cfg, cli.json, move |ctl| {
                if prime {
                    ctl.enqueue_prime(parsed.clone())?;
                }
                ctl.enqueue_run_profile(parsed)
            })
        }
        Commands::SelfCheck => self_check(&cfg),
    }
}

fn serve_cmd(cfg: SliderConfig, bind: &str) -> eyre::Result<()> {
    let ctl = Arc::new(SliderController::new(cfg)?);
    tracing::info!(
        travel_mm = ctl.config().travel_mm,
        steps_per_mm = ctl.config().steps_per_mm(),
        "controller ready"
    );
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("build tokio runtime")?;
    runtime.block_on(server::serve(ctl.clone(), bind))?;
    // Stop any in-flight motion before the controller tears down.
    ctl.stop();
    Ok(())
}

/// Enqueue one command and poll until the worker returns to a terminal state.
fn one_shot(
    cfg: SliderConfig,
    json: bool,
    enqueue: impl FnOnce(&SliderController) -> slider_core::Result<()>,
) -> eyre::Result<()> {
    let ctl = Arc::new(SliderController::new(cfg)?);

    let ctl_for_signal = Arc::clone(&ctl);
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nstop requested, cancelling current motion...");
        ctl_for_signal.stop();
    }) {
        tracing::warn!(error = %e, "failed to install signal handler");
    }

    enqueue(&ctl)?;

    let started = Instant::now();
    let mut seen_active = false;
    let snap = loop {
        let snap = ctl.status();
        let terminal = matches!(
            snap.status,
            SliderStatus::Idle | SliderStatus::Stopped | SliderStatus::Error
        );
        if !terminal {
            seen_active = true;
        }
        if terminal && (seen_active || started.elapsed() > SETTLE_GRACE) {
            break snap;
        }
        std::thread::sleep(Duration::from_millis(20));
    };

    report(&snap, json)?;
    if snap.status == SliderStatus::Error {
        eyre::bail!(
            "command failed: {}",
            snap.error.unwrap_or_else(|| "unknown fault".to_string())
        );
    }
    Ok(())
}

fn report(snap: &StatusSnapshot, json: bool) -> eyre::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string(snap).wrap_err("serialize status")?
        );
    } else {
        println!(
            "status: {}  pos: {:.3} mm  homed: {}  progress: {:.3}",
            snap.status, snap.pos_mm, snap.homed, snap.progress
        );
    }
    Ok(())
}

/// Drive the selected backend through its paces without moving anything far:
/// enable, a short pulse burst, endstop reads, disable.
fn self_check(cfg: &SliderConfig) -> eyre::Result<()> {
    let mut drv = slider_hardware::init_driver(cfg);

    drv.enable(true)
        .map_err(|e| eyre::eyre!("enable driver: {e}"))?;
    drv.set_dir(true)
        .map_err(|e| eyre::eyre!("set direction: {e}"))?;
    for _ in 0..4 {
        drv.pulse_step(cfg.step_pulse_us)
            .map_err(|e| eyre::eyre!("step pulse: {e}"))?;
    }
    let min = drv
        .read_min_endstop()
        .map_err(|e| eyre::eyre!("read min endstop: {e}"))?;
    let max = drv
        .read_max_endstop()
        .map_err(|e| eyre::eyre!("read max endstop: {e}"))?;
    drv.enable(false)
        .map_err(|e| eyre::eyre!("disable driver: {e}"))?;
    drv.cleanup();

    println!("driver ok: pulse burst and endstop reads completed");
    println!("  min endstop pressed: {min}");
    println!("  max endstop pressed: {max}");
    Ok(())
}
