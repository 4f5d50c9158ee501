//! Easing curves

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    Linear,
    Power2In,
    Power2Out,
    Power2InOut,
    /// Overshoots by the given strength before settling
    BackOut(f64),
    /// Jumps in `n` discrete steps
    Steps(u32),
}

impl Ease {
    /// Map linear progress `t` in [0, 1] onto the curve
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match *self {
            Ease::Linear => t,
            Ease::Power2In => t * t,
            Ease::Power2Out => {
                let inv = 1.0 - t;
                1.0 - inv * inv
            }
            Ease::Power2InOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let inv = -2.0 * t + 2.0;
                    1.0 - inv * inv / 2.0
                }
            }
            Ease::BackOut(s) => {
                let u = t - 1.0;
                1.0 + (s + 1.0) * u * u * u + s * u * u
            }
            Ease::Steps(n) => {
                if n == 0 || t >= 1.0 {
                    t
                } else {
                    (t * n as f64).floor() / n as f64
                }
            }
        }
    }
}
