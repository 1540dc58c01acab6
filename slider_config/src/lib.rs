#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the slider service.
//!
//! - `SliderConfig` is deserialized from TOML, then environment overrides
//!   (`SLIDER_*`) are applied on top, then `validate()` is called.
//! - Mechanical constants are immutable after load; the derived
//!   `steps_per_mm()` couples motor resolution to the lead screw pitch.
use serde::Deserialize;

/// BCM-numbered GPIO pin assignments.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Pins {
    pub step: u8,
    pub dir: u8,
    pub enable: u8,
    pub min_endstop: u8,
    pub max_endstop: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            step: 18,
            dir: 23,
            enable: 24,
            min_endstop: 17,
            max_endstop: 27,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    /// Path to a log file (JSON lines); stderr only when absent.
    pub file: Option<String>,
    /// Default log level when RUST_LOG / --log-level are not set.
    pub level: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Storage {
    /// Preset store location; created empty on first run.
    pub preset_file: std::path::PathBuf,
}

impl Default for Storage {
    fn default() -> Self {
        Self {
            preset_file: std::path::PathBuf::from("presets.json"),
        }
    }
}

/// Mechanics, motion limits, wiring, and pulse timing for one slider axis.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SliderConfig {
    /// Full steps per motor revolution (1.8 deg motor = 200).
    pub steps_per_rev: u32,
    /// Microstep factor configured on the driver IC (DRV8825 typical: 16).
    pub microstep: u32,
    /// Linear travel per screw revolution (TR8x8 lead screw = 8.0).
    pub lead_mm_per_rev: f64,
    /// Usable axis length.
    pub travel_mm: f64,

    // Motion limits (conservative defaults)
    pub max_speed_mm_s: f64,
    pub max_accel_mm_s2: f64,

    pub pins: Pins,

    /// Minimum step pulse high time. DRV8825 minimum is 1.9 us; 4 us leaves margin.
    pub step_pulse_us: u32,

    /// Set when the endstop wiring reads inverted.
    pub invert_endstops: bool,

    pub logging: Logging,
    pub storage: Storage,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            steps_per_rev: 200,
            microstep: 16,
            lead_mm_per_rev: 8.0,
            travel_mm: 1200.0,
            max_speed_mm_s: 120.0,
            max_accel_mm_s2: 300.0,
            pins: Pins::default(),
            step_pulse_us: 4,
            invert_endstops: false,
            logging: Logging::default(),
            storage: Storage::default(),
        }
    }
}

impl SliderConfig {
    /// Step resolution along the axis: steps_per_rev * microstep / lead_mm_per_rev.
    pub fn steps_per_mm(&self) -> f64 {
        f64::from(self.steps_per_rev) * f64::from(self.microstep) / self.lead_mm_per_rev
    }

    /// Apply `SLIDER_*` environment overrides on top of the loaded values.
    pub fn apply_env_overrides(&mut self) -> eyre::Result<()> {
        env_f64("SLIDER_TRAVEL_MM", &mut self.travel_mm)?;
        env_f64("SLIDER_MAX_SPEED", &mut self.max_speed_mm_s)?;
        env_f64("SLIDER_MAX_ACCEL", &mut self.max_accel_mm_s2)?;
        env_u8("SLIDER_STEP_PIN", &mut self.pins.step)?;
        env_u8("SLIDER_DIR_PIN", &mut self.pins.dir)?;
        env_u8("SLIDER_ENABLE_PIN", &mut self.pins.enable)?;
        env_u8("SLIDER_MIN_PIN", &mut self.pins.min_endstop)?;
        env_u8("SLIDER_MAX_PIN", &mut self.pins.max_endstop)?;
        if let Ok(raw) = std::env::var("SLIDER_INVERT_ENDSTOPS") {
            self.invert_endstops = matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> eyre::Result<()> {
        if self.steps_per_rev == 0 {
            eyre::bail!("steps_per_rev must be > 0");
        }
        if self.microstep == 0 {
            eyre::bail!("microstep must be > 0");
        }
        if !(self.lead_mm_per_rev.is_finite() && self.lead_mm_per_rev > 0.0) {
            eyre::bail!("lead_mm_per_rev must be > 0");
        }
        if !(self.travel_mm.is_finite() && self.travel_mm > 0.0) {
            eyre::bail!("travel_mm must be > 0");
        }
        if !(self.max_speed_mm_s.is_finite() && self.max_speed_mm_s > 0.0) {
            eyre::bail!("max_speed_mm_s must be > 0");
        }
        if !(self.max_accel_mm_s2.is_finite() && self.max_accel_mm_s2 > 0.0) {
            eyre::bail!("max_accel_mm_s2 must be > 0");
        }
        if self.step_pulse_us == 0 {
            eyre::bail!("step_pulse_us must be >= 1");
        }
        if !(self.steps_per_mm().is_finite() && self.steps_per_mm() > 0.0) {
            eyre::bail!("derived steps_per_mm must be > 0");
        }
        Ok(())
    }
}

pub fn load_toml(s: &str) -> Result<SliderConfig, toml::de::Error> {
    toml::from_str::<SliderConfig>(s)
}

/// Load from an optional TOML file, then apply environment overrides.
/// Callers validate the result before use.
pub fn load(path: Option<&std::path::Path>) -> eyre::Result<SliderConfig> {
    let mut cfg = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .map_err(|e| eyre::eyre!("read config {:?}: {e}", p))?;
            load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {e}", p))?
        }
        None => SliderConfig::default(),
    };
    cfg.apply_env_overrides()?;
    Ok(cfg)
}

fn env_f64(var: &str, slot: &mut f64) -> eyre::Result<()> {
    if let Ok(raw) = std::env::var(var) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| eyre::eyre!("{var}={raw:?}: {e}"))?;
    }
    Ok(())
}

fn env_u8(var: &str, slot: &mut u8) -> eyre::Result<()> {
    if let Ok(raw) = std::env::var(var) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|e| eyre::eyre!("{var}={raw:?}: {e}"))?;
    }
    Ok(())
}
