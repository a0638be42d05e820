//! Keyframed curves.
//!
//! Used for fall damage: the curve maps fall distance to a percentage of max
//! health.

use serde::{Deserialize, Serialize};

/// One point on a [`DamageCurve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Input value.
    pub time: f32,
    /// Output value.
    pub value: f32,
}

impl Keyframe {
    /// Creates a keyframe.
    #[must_use]
    pub const fn new(time: f32, value: f32) -> Self {
        Self { time, value }
    }
}

/// Piecewise-linear curve, clamped to its first and last keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageCurve {
    keys: Vec<Keyframe>,
}

impl Default for DamageCurve {
    fn default() -> Self {
        Self::new(vec![
            Keyframe::new(4.0, 5.0),
            Keyframe::new(10.0, 25.0),
            Keyframe::new(20.0, 60.0),
            Keyframe::new(30.0, 100.0),
        ])
    }
}

impl DamageCurve {
    /// Creates a curve. Keys are sorted by input.
    #[must_use]
    pub fn new(mut keys: Vec<Keyframe>) -> Self {
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keys }
    }

    /// Curve that is always `value`.
    #[must_use]
    pub fn constant(value: f32) -> Self {
        Self::new(vec![Keyframe::new(0.0, value)])
    }

    /// Keyframes in input order.
    #[must_use]
    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    /// Evaluate the curve at `x`. An empty curve is zero everywhere.
    #[must_use]
    pub fn evaluate(&self, x: f32) -> f32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0.0;
        };
        if x <= first.time {
            return first.value;
        }
        if x >= last.time {
            return last.value;
        }

        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if x <= b.time {
                let span = b.time - a.time;
                if span <= f32::EPSILON {
                    return b.value;
                }
                let t = (x - a.time) / span;
                return a.value + (b.value - a.value) * t;
            }
        }
        last.value
    }
}
