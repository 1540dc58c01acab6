//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "slider", version, about = "Camera slider motion service")]
pub struct Cli {
    /// Path to config TOML; built-in defaults plus SLIDER_* env when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API until interrupted
    Serve {
        /// Bind address for the API
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        /// Enable real-time scheduling (Linux, build feature `rt`)
        #[arg(long, action = ArgAction::SetTrue)]
        rt: bool,
        /// SCHED_FIFO priority when --rt is enabled; clamped to the system range
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
    },
    /// Home the axis against the min endstop and zero the position
    Home,
    /// Relative move at a clamped speed
    Jog {
        /// Signed distance; clamped to the axis
        #[arg(long, allow_hyphen_values = true)]
        distance_mm: f64,
        /// Requested speed; clamped to [1, max_speed_mm_s]
        #[arg(long, default_value_t = 50.0)]
        speed_mm_s: f64,
    },
    /// Execute a motion profile from a JSON file
    Run {
        /// Profile JSON (same schema as the HTTP API)
        #[arg(long, value_name = "FILE")]
        profile: PathBuf,
        /// Move to the profile's start position first
        #[arg(long, action = ArgAction::SetTrue)]
        prime: bool,
        /// Enable real-time scheduling (Linux, build feature `rt`)
        #[arg(long, action = ArgAction::SetTrue)]
        rt: bool,
        /// SCHED_FIFO priority when --rt is enabled
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
    },
    /// Exercise the selected driver backend (hardware or simulator)
    SelfCheck,
}
