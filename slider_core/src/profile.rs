//! Trajectory description: keyframes with per-segment easing, validated at
//! construction so the worker only ever sees well-formed profiles.

use serde::{Deserialize, Serialize};

use crate::easing::Ease;
use crate::error::ProfileError;

/// One (time, position) anchor. The easing applies on arrival, i.e. it shapes
/// the segment ending at this keyframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Keyframe {
    /// Seconds from profile start.
    pub t: f64,
    /// Position along the slider.
    pub pos_mm: f64,
    #[serde(default)]
    pub ease: Ease,
}

fn default_max_speed() -> f64 {
    120.0
}

fn default_max_accel() -> f64 {
    300.0
}

/// A validated trajectory: ordered keyframes plus global motion limits.
///
/// Obtain one through [`MotionProfile::validated`] or [`MotionProfile::from_json`];
/// raw deserialization alone does not establish the invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotionProfile {
    pub length_mm: f64,
    pub keyframes: Vec<Keyframe>,
    #[serde(default = "default_max_speed")]
    pub max_speed_mm_s: f64,
    #[serde(default = "default_max_accel")]
    pub max_accel_mm_s2: f64,
}

impl MotionProfile {
    /// Sort keyframes by time (stable) and check every construction invariant.
    pub fn validated(mut self) -> Result<Self, ProfileError> {
        if !(self.length_mm.is_finite() && self.length_mm > 0.0) {
            return Err(ProfileError::NonPositiveLength);
        }
        if !(self.max_speed_mm_s.is_finite() && self.max_speed_mm_s > 0.0) {
            return Err(ProfileError::NonPositiveSpeed);
        }
        if !(self.max_accel_mm_s2.is_finite() && self.max_accel_mm_s2 > 0.0) {
            return Err(ProfileError::NonPositiveAccel);
        }
        if self.keyframes.len() < 2 {
            return Err(ProfileError::TooFewKeyframes);
        }
        self.keyframes
            .sort_by(|a, b| a.t.partial_cmp(&b.t).unwrap_or(std::cmp::Ordering::Equal));
        let mut last_t = -1.0_f64;
        for kf in &self.keyframes {
            if !(kf.t.is_finite() && kf.t >= 0.0) {
                return Err(ProfileError::NegativeTime);
            }
            if kf.t <= last_t {
                return Err(ProfileError::NonIncreasingTimes);
            }
            if !(kf.pos_mm.is_finite() && (0.0..=self.length_mm).contains(&kf.pos_mm)) {
                return Err(ProfileError::PositionOutOfRange);
            }
            last_t = kf.t;
        }
        Ok(self)
    }

    /// Parse and validate a profile from its JSON wire form. Unknown fields
    /// are rejected.
    pub fn from_json(s: &str) -> Result<Self, ProfileError> {
        let raw: MotionProfile =
            serde_json::from_str(s).map_err(|e| ProfileError::Json(e.to_string()))?;
        raw.validated()
    }

    /// Position of the first keyframe (valid profiles are non-empty).
    pub fn start_pos_mm(&self) -> f64 {
        self.keyframes.first().map(|k| k.pos_mm).unwrap_or(0.0)
    }

    /// Time of the final keyframe.
    pub fn total_seconds(&self) -> f64 {
        self.keyframes.last().map(|k| k.t).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kf(t: f64, pos_mm: f64) -> Keyframe {
        Keyframe {
            t,
            pos_mm,
            ease: Ease::Linear,
        }
    }

    fn sweep() -> MotionProfile {
        MotionProfile {
            length_mm: 1000.0,
            keyframes: vec![kf(0.0, 0.0), kf(2.0, 100.0)],
            max_speed_mm_s: 120.0,
            max_accel_mm_s2: 300.0,
        }
    }

    #[test]
    fn valid_profile_passes_and_sorts() {
        let p = MotionProfile {
            keyframes: vec![kf(2.0, 100.0), kf(0.0, 0.0)],
            ..sweep()
        }
        .validated()
        .expect("valid");
        assert_eq!(p.keyframes[0].t, 0.0);
        assert_eq!(p.start_pos_mm(), 0.0);
        assert_eq!(p.total_seconds(), 2.0);
    }

    #[test]
    fn duplicate_times_are_rejected() {
        let p = MotionProfile {
            keyframes: vec![kf(0.0, 0.0), kf(1.0, 10.0), kf(1.0, 20.0)],
            ..sweep()
        };
        assert_eq!(p.validated(), Err(ProfileError::NonIncreasingTimes));
    }

    #[test]
    fn single_keyframe_is_rejected() {
        let p = MotionProfile {
            keyframes: vec![kf(0.0, 0.0)],
            ..sweep()
        };
        assert_eq!(p.validated(), Err(ProfileError::TooFewKeyframes));
    }

    #[test]
    fn out_of_range_position_is_rejected() {
        for bad in [-0.1, 1000.1] {
            let p = MotionProfile {
                keyframes: vec![kf(0.0, 0.0), kf(1.0, bad)],
                ..sweep()
            };
            assert_eq!(p.validated(), Err(ProfileError::PositionOutOfRange));
        }
    }

    #[test]
    fn limits_must_be_positive() {
        assert_eq!(
            MotionProfile {
                length_mm: 0.0,
                ..sweep()
            }
            .validated(),
            Err(ProfileError::NonPositiveLength)
        );
        assert_eq!(
            MotionProfile {
                max_speed_mm_s: 0.0,
                ..sweep()
            }
            .validated(),
            Err(ProfileError::NonPositiveSpeed)
        );
    }

    #[test]
    fn json_round_trip_preserves_the_profile() {
        let p = MotionProfile {
            keyframes: vec![
                kf(0.0, 0.0),
                Keyframe {
                    t: 1.0,
                    pos_mm: 60.0,
                    ease: Ease::CubicBezier {
                        p: [0.42, 0.0, 0.58, 1.0],
                    },
                },
                kf(2.0, 100.0),
            ],
            ..sweep()
        }
        .validated()
        .expect("valid");
        let text = serde_json::to_string(&p).expect("serialize");
        let back = MotionProfile::from_json(&text).expect("parse back");
        assert_eq!(back, p);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = MotionProfile::from_json(
            r#"{"length_mm":100,"keyframes":[{"t":0,"pos_mm":0},{"t":1,"pos_mm":10}],"color":"red"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProfileError::Json(_)));
        assert!(MotionProfile::from_json(
            r#"{"length_mm":100,"keyframes":[{"t":0,"pos_mm":0,"speed":5},{"t":1,"pos_mm":10}]}"#,
        )
        .is_err());
    }

    #[test]
    fn missing_limits_take_documented_defaults() {
        let p = MotionProfile::from_json(
            r#"{"length_mm":100,"keyframes":[{"t":0,"pos_mm":0},{"t":1,"pos_mm":10}]}"#,
        )
        .expect("valid");
        assert_eq!(p.max_speed_mm_s, 120.0);
        assert_eq!(p.max_accel_mm_s2, 300.0);
        assert_eq!(p.keyframes[0].ease, Ease::Linear);
    }
}
