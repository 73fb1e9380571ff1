#![forbid(unsafe_code)]

//! Easing curves applied while a timeline settles.
//!
//! Scrubbing is always linear: the cursor sits exactly where the caller puts
//! it. Easing only shapes the settle playback from the release point to the
//! resting point.
//!
//! # Invariants
//!
//! 1. Every curve maps 0.0 to 0.0 and 1.0 to 1.0.
//! 2. Input is clamped to [0.0, 1.0] before evaluation.
//! 3. `CubicBezier` control x-coordinates are clamped to [0.0, 1.0] so the
//!    curve stays a function of time.

/// Easing function for settle playback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Easing {
    /// Linear interpolation.
    #[default]
    Linear,
    /// Cubic ease-out (decelerating).
    EaseOut,
    /// Cubic ease-in (accelerating).
    EaseIn,
    /// Cubic S-curve.
    EaseInOut,
    /// CSS-style `cubic-bezier(x1, y1, x2, y2)`.
    CubicBezier { x1: f64, y1: f64, x2: f64, y2: f64 },
}

/// Newton iterations before falling back to bisection.
const NEWTON_ITERATIONS: usize = 8;
/// Bisection iterations; 2^-32 is far below a frame's precision.
const BISECTION_ITERATIONS: usize = 32;
const SOLVE_EPSILON: f64 = 1e-7;

impl Easing {
    /// The sheet settle curve: a quick start that glides into place.
    pub const SHEET: Self = Self::CubicBezier {
        x1: 0.32,
        y1: 0.72,
        x2: 0.0,
        y2: 1.0,
    };

    /// Apply the easing function to a progress value (0.0 to 1.0).
    #[must_use]
    pub fn apply(self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match self {
            Self::Linear => t,
            Self::EaseOut => {
                let inv = 1.0 - t;
                1.0 - inv * inv * inv
            }
            Self::EaseIn => t * t * t,
            Self::EaseInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let inv = -2.0 * t + 2.0;
                    1.0 - inv * inv * inv / 2.0
                }
            }
            Self::CubicBezier { x1, y1, x2, y2 } => {
                if t <= 0.0 || t >= 1.0 {
                    return t;
                }
                let (x1, x2) = (x1.clamp(0.0, 1.0), x2.clamp(0.0, 1.0));
                let param = solve_bezier_param(t, x1, x2);
                bezier(param, y1, y2)
            }
        }
    }

    /// Check if this easing can produce values outside 0.0-1.0.
    #[must_use]
    pub fn can_overshoot(self) -> bool {
        match self {
            Self::CubicBezier { y1, y2, .. } => !(0.0..=1.0).contains(&y1) || !(0.0..=1.0).contains(&y2),
            Self::Linear | Self::EaseOut | Self::EaseIn | Self::EaseInOut => false,
        }
    }
}

/// One coordinate of a cubic bezier with endpoints fixed at 0 and 1.
fn bezier(t: f64, a1: f64, a2: f64) -> f64 {
    let inv = 1.0 - t;
    3.0 * inv * inv * t * a1 + 3.0 * inv * t * t * a2 + t * t * t
}

fn bezier_slope(t: f64, a1: f64, a2: f64) -> f64 {
    let inv = 1.0 - t;
    3.0 * inv * inv * a1 + 6.0 * inv * t * (a2 - a1) + 3.0 * t * t * (1.0 - a2)
}

/// Find the curve parameter whose x-coordinate equals `x`.
fn solve_bezier_param(x: f64, x1: f64, x2: f64) -> f64 {
    let mut t = x;
    for _ in 0..NEWTON_ITERATIONS {
        let err = bezier(t, x1, x2) - x;
        if err.abs() < SOLVE_EPSILON {
            return t;
        }
        let slope = bezier_slope(t, x1, x2);
        if slope.abs() < SOLVE_EPSILON {
            break;
        }
        t = (t - err / slope).clamp(0.0, 1.0);
    }

    // x(t) is monotonic for clamped control points, so bisection converges.
    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    t = x;
    for _ in 0..BISECTION_ITERATIONS {
        let value = bezier(t, x1, x2);
        if (value - x).abs() < SOLVE_EPSILON {
            break;
        }
        if value < x {
            lo = t;
        } else {
            hi = t;
        }
        t = (lo + hi) / 2.0;
    }
    t
}
