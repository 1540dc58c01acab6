//! Easing curves mapping normalised time u in [0,1] to normalised progress.
//!
//! `CubicBezier` follows the CSS convention: endpoints fixed at (0,0)/(1,1),
//! the curve parameterised by x, solved numerically per sample.

use serde::{Deserialize, Serialize};

const NEWTON_ITERS: usize = 6;
const DERIV_EPS: f64 = 1e-6;
// Residual after Newton that triggers the bisection fallback, and the
// tighter residual bisection runs down to.
const RESIDUAL_COARSE: f64 = 1e-4;
const RESIDUAL_FINE: f64 = 1e-5;
const BISECT_ITERS: usize = 12;

/// Easing attached to a keyframe; describes the interpolation from the
/// previous keyframe to this one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EaseRepr", into = "EaseRepr")]
pub enum Ease {
    #[default]
    Linear,
    /// Control points `[x1, y1, x2, y2]`.
    CubicBezier { p: [f64; 4] },
}

/// Wire form: `{"type":"linear"}` or `{"type":"cubic-bezier","p":[x1,y1,x2,y2]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct EaseRepr {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    p: Option<Vec<f64>>,
}

impl TryFrom<EaseRepr> for Ease {
    type Error = String;
    fn try_from(r: EaseRepr) -> Result<Self, Self::Error> {
        match r.kind.as_str() {
            "linear" => Ok(Ease::Linear),
            "cubic-bezier" => {
                let p = r
                    .p
                    .ok_or_else(|| "cubic-bezier requires p=[x1,y1,x2,y2]".to_string())?;
                let p: [f64; 4] = p
                    .try_into()
                    .map_err(|_| "cubic-bezier requires exactly four control values".to_string())?;
                Ok(Ease::CubicBezier { p })
            }
            other => Err(format!("unknown ease type {other:?}")),
        }
    }
}

impl From<Ease> for EaseRepr {
    fn from(e: Ease) -> Self {
        match e {
            Ease::Linear => EaseRepr {
                kind: "linear".to_string(),
                p: None,
            },
            Ease::CubicBezier { p } => EaseRepr {
                kind: "cubic-bezier".to_string(),
                p: Some(p.to_vec()),
            },
        }
    }
}

impl Ease {
    /// Sample progress for `u`; input is clamped to [0,1].
    pub fn sample(&self, u: f64) -> f64 {
        match *self {
            Ease::Linear => linear(u),
            Ease::CubicBezier { p: [x1, y1, x2, y2] } => {
                CubicBezier::new(x1, y1, x2, y2).sample(u)
            }
        }
    }
}

pub fn linear(u: f64) -> f64 {
    if u <= 0.0 {
        0.0
    } else if u >= 1.0 {
        1.0
    } else {
        u
    }
}

/// Cubic Bezier easing with implicit endpoints (0,0) and (1,1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    p1x: f64,
    p1y: f64,
    p2x: f64,
    p2y: f64,
}

impl CubicBezier {
    pub fn new(p1x: f64, p1y: f64, p2x: f64, p2y: f64) -> Self {
        Self { p1x, p1y, p2x, p2y }
    }

    fn bx(&self, t: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * t * self.p1x + 3.0 * mt * t * t * self.p2x + t * t * t
    }

    fn by(&self, t: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * t * self.p1y + 3.0 * mt * t * t * self.p2y + t * t * t
    }

    fn dbx(&self, t: f64) -> f64 {
        let mt = 1.0 - t;
        3.0 * mt * mt * self.p1x + 6.0 * mt * t * (self.p2x - self.p1x)
            + 3.0 * t * t * (1.0 - self.p2x)
    }

    /// Return y for a given u in [0,1], solving Bx(t) = u, then evaluating By(t).
    ///
    /// Newton-Raphson from t0 = u with a derivative guard, falling back to
    /// bisection when the residual stays above `RESIDUAL_COARSE`. Near-flat
    /// x regions would otherwise let Newton diverge.
    pub fn sample(&self, u: f64) -> f64 {
        if u <= 0.0 {
            return 0.0;
        }
        if u >= 1.0 {
            return 1.0;
        }

        let mut t = u;
        for _ in 0..NEWTON_ITERS {
            let x = self.bx(t);
            let d = self.dbx(t);
            if d.abs() < DERIV_EPS {
                break;
            }
            t -= (x - u) / d;
            if t < 0.0 {
                t = 0.0;
                break;
            }
            if t > 1.0 {
                t = 1.0;
                break;
            }
        }

        if (self.bx(t) - u).abs() > RESIDUAL_COARSE {
            let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
            t = u;
            for _ in 0..BISECT_ITERS {
                let x = self.bx(t);
                if x < u {
                    lo = t;
                } else {
                    hi = t;
                }
                t = 0.5 * (lo + hi);
                if (x - u).abs() <= RESIDUAL_FINE {
                    break;
                }
            }
        }

        self.by(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_is_clamped_identity() {
        assert_eq!(linear(-0.5), 0.0);
        assert_eq!(linear(0.0), 0.0);
        assert_eq!(linear(0.25), 0.25);
        assert_eq!(linear(1.0), 1.0);
        assert_eq!(linear(7.0), 1.0);
    }

    #[test]
    fn bezier_endpoints_are_exact() {
        let cb = CubicBezier::new(0.42, 0.0, 0.58, 1.0);
        assert_eq!(cb.sample(0.0), 0.0);
        assert_eq!(cb.sample(1.0), 1.0);
        assert_eq!(cb.sample(-1.0), 0.0);
        assert_eq!(cb.sample(2.0), 1.0);
    }

    #[test]
    fn symmetric_ease_in_out_hits_the_midpoint() {
        // cubic-bezier(0.42, 0, 0.58, 1): x(0.5) = 0.5, so Newton converges
        // in place and y(0.5) = 0.5 exactly.
        let cb = CubicBezier::new(0.42, 0.0, 0.58, 1.0);
        assert!((cb.sample(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn monotone_for_well_formed_control_points() {
        for cb in [
            CubicBezier::new(0.42, 0.0, 0.58, 1.0),
            CubicBezier::new(0.25, 0.1, 0.25, 1.0),
            CubicBezier::new(0.0, 0.0, 1.0, 1.0),
        ] {
            let mut prev = 0.0;
            for i in 0..=100 {
                let y = cb.sample(f64::from(i) / 100.0);
                assert!(
                    y + 1e-9 >= prev,
                    "{cb:?} not monotone at i={i}: {y} < {prev}"
                );
                prev = y;
            }
        }
    }

    #[test]
    fn flat_x_start_falls_back_to_bisection() {
        // x1 = x2 = 0 gives Bx(t) = t^3 with a vanishing derivative at 0;
        // Newton stalls and bisection must take over. t = u^(1/3).
        let cb = CubicBezier::new(0.0, 0.0, 0.0, 1.0);
        let u = 0.008;
        let t = 0.2;
        let expected = cb.by(t);
        assert!((cb.sample(u) - expected).abs() < 1e-3);
    }

    #[test]
    fn ease_enum_dispatches() {
        assert_eq!(Ease::Linear.sample(0.3), 0.3);
        let e = Ease::CubicBezier {
            p: [0.42, 0.0, 0.58, 1.0],
        };
        assert!((e.sample(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn ease_serde_uses_css_style_tags() {
        let lin: Ease = serde_json::from_str(r#"{"type":"linear"}"#).unwrap();
        assert_eq!(lin, Ease::Linear);
        let cb: Ease =
            serde_json::from_str(r#"{"type":"cubic-bezier","p":[0.42,0.0,0.58,1.0]}"#).unwrap();
        assert_eq!(
            cb,
            Ease::CubicBezier {
                p: [0.42, 0.0, 0.58, 1.0]
            }
        );
        // three control values are not a bezier
        assert!(serde_json::from_str::<Ease>(r#"{"type":"cubic-bezier","p":[1,2,3]}"#).is_err());
        assert!(serde_json::from_str::<Ease>(r#"{"type":"cubic-bezier"}"#).is_err());
        assert!(serde_json::from_str::<Ease>(r#"{"type":"bounce"}"#).is_err());
        assert!(serde_json::from_str::<Ease>(r#"{"type":"linear","extra":1}"#).is_err());

        let round: Ease = serde_json::from_str(&serde_json::to_string(&cb).unwrap()).unwrap();
        assert_eq!(round, cb);
    }
}
