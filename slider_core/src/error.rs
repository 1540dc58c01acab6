//! Domain errors for the motion core, plus the profile-validation error the
//! API boundary maps to a 4xx response.
use thiserror::Error;

/// Rejections raised while validating a `MotionProfile` at construction.
/// These never reach the worker.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("length_mm must be > 0")]
    NonPositiveLength,
    #[error("max_speed_mm_s must be > 0")]
    NonPositiveSpeed,
    #[error("max_accel_mm_s2 must be > 0")]
    NonPositiveAccel,
    #[error("at least two keyframes required")]
    TooFewKeyframes,
    #[error("keyframe times must be strictly increasing")]
    NonIncreasingTimes,
    #[error("keyframe time must be >= 0")]
    NegativeTime,
    #[error("keyframe position outside [0, length_mm]")]
    PositionOutOfRange,
    #[error("profile json: {0}")]
    Json(String),
}

#[derive(Debug, Error, Clone)]
pub enum SliderError {
    #[error("invalid profile: {0}")]
    Profile(#[from] ProfileError),
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("preset store: {0}")]
    Preset(String),
    #[error("controller is shut down")]
    Shutdown,
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
