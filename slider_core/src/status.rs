//! Controller status reported to callers.

use serde::Serialize;

/// Lifecycle of the worker; only the worker writes transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SliderStatus {
    Idle,
    Homing,
    Jogging,
    Priming,
    Running,
    Stopped,
    Error,
}

impl SliderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SliderStatus::Idle => "idle",
            SliderStatus::Homing => "homing",
            SliderStatus::Jogging => "jogging",
            SliderStatus::Priming => "priming",
            SliderStatus::Running => "running",
            SliderStatus::Stopped => "stopped",
            SliderStatus::Error => "error",
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            SliderStatus::Idle => 0,
            SliderStatus::Homing => 1,
            SliderStatus::Jogging => 2,
            SliderStatus::Priming => 3,
            SliderStatus::Running => 4,
            SliderStatus::Stopped => 5,
            SliderStatus::Error => 6,
        }
    }

    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            1 => SliderStatus::Homing,
            2 => SliderStatus::Jogging,
            3 => SliderStatus::Priming,
            4 => SliderStatus::Running,
            5 => SliderStatus::Stopped,
            6 => SliderStatus::Error,
            _ => SliderStatus::Idle,
        }
    }
}

impl core::fmt::Display for SliderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the controller, safe to serialize straight to the
/// status endpoint. Positions and progress are rounded to 0.001.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub status: SliderStatus,
    pub pos_mm: f64,
    pub homed: bool,
    pub progress: f64,
    pub error: Option<String>,
}
