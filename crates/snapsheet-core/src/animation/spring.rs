#![forbid(unsafe_code)]

//! Rubber-band resistance curve.
//!
//! When a sheet whose dismissal is blocked is dragged below its lowest
//! resting point, the sheet should still move a little but resist the
//! finger. [`spring_step`] maps the raw overshoot (as a fraction of the
//! sheet height) to a much smaller visual displacement.
//!
//! The curve is a critically-damped spring response:
//!
//!   f(t) = (1 - e^(-b·t)) - a·(e^(-b·t) - e^(-c·t))
//!
//! # Invariants
//!
//! 1. `spring_step(0.0) == 0.0` exactly.
//! 2. Strictly increasing on [0.0, 1.0].
//! 3. `spring_step(1.0)` is roughly 0.035, so a full-height overshoot moves
//!    the sheet by a few percent.
//!
//! # Failure Modes
//!
//! - Input outside [0.0, 1.0] is clamped; NaN is treated as 0.0.

/// Amplitude of the fast term.
const SPRING_A: f64 = 0.002_552_75;
/// Slow decay rate.
const SPRING_B: f64 = 0.038_096_8;
/// Fast decay rate.
const SPRING_C: f64 = 14.961_9;

/// Resisted displacement for a raw overshoot fraction.
#[must_use]
pub fn spring_step(progress: f64) -> f64 {
    let t = if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    };
    let slow = (-SPRING_B * t).exp();
    let fast = (-SPRING_C * t).exp();
    // Rounding can dip a hair below zero for vanishing inputs.
    ((1.0 - slow) - SPRING_A * (slow - fast)).max(0.0)
}
