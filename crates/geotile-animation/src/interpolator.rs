//! Easing curves mapping linear progress to eased progress.

use serde::{Deserialize, Serialize};

/// Time interpolators for rig animations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInterpolator {
    /// Constant speed, no acceleration.
    Linear,
    /// Slow start, fast end.
    EaseIn,
    /// Fast start, slow end.
    #[default]
    Decelerate,
    /// Slow start, fast middle, slow end.
    EaseInOut,
}

impl TimeInterpolator {
    /// Map a linear progress value (0.0..=1.0) to an eased value.
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            TimeInterpolator::Linear => t,
            TimeInterpolator::EaseIn => t * t,
            TimeInterpolator::Decelerate => 1.0 - (1.0 - t) * (1.0 - t),
            TimeInterpolator::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}
