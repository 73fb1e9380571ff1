#![forbid(unsafe_code)]

//! Breakpoint table: the fractional heights a sheet may rest at.
//!
//! A breakpoint is a fraction of the panel height that is visible: `0.0` is
//! fully hidden (dismissed), `1.0` is fully expanded. The backdrop
//! breakpoint marks the height above which the backdrop becomes interactive.
//!
//! # Invariants
//!
//! 1. The table is non-empty, finite, within [0.0, 1.0], and strictly
//!    ascending.
//! 2. The backdrop breakpoint is finite and within [0.0, 1.0].
//! 3. `closest` returns the earliest breakpoint on an exact tie.
//!
//! # Failure Modes
//!
//! - Malformed input is rejected at construction with [`BreakpointError`];
//!   a constructed table never needs runtime recovery.

use snapsheet_core::animation::{Keyframe, Opacity};
use thiserror::Error;

/// Why a breakpoint table was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BreakpointError {
    #[error("breakpoint table is empty")]
    Empty,

    #[error("breakpoint at index {index} is not finite")]
    NotFinite { index: usize },

    #[error("breakpoint {value} at index {index} is outside [0, 1]")]
    OutOfRange { index: usize, value: f64 },

    #[error("breakpoints must be strictly ascending: {previous} then {value} at index {index}")]
    NotAscending { index: usize, previous: f64, value: f64 },

    #[error("backdrop breakpoint {value} must be a finite number in [0, 1]")]
    InvalidBackdrop { value: f64 },
}

/// Validated, ordered sheet breakpoints plus the backdrop threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakpointTable {
    breakpoints: Vec<f64>,
    backdrop: f64,
}

impl BreakpointTable {
    /// Validate and build a table.
    pub fn new(breakpoints: Vec<f64>, backdrop_breakpoint: f64) -> Result<Self, BreakpointError> {
        if breakpoints.is_empty() {
            return Err(BreakpointError::Empty);
        }
        for (index, &value) in breakpoints.iter().enumerate() {
            if !value.is_finite() {
                return Err(BreakpointError::NotFinite { index });
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(BreakpointError::OutOfRange { index, value });
            }
            if index > 0 {
                let previous = breakpoints[index - 1];
                if value <= previous {
                    return Err(BreakpointError::NotAscending {
                        index,
                        previous,
                        value,
                    });
                }
            }
        }
        if !backdrop_breakpoint.is_finite() || !(0.0..=1.0).contains(&backdrop_breakpoint) {
            return Err(BreakpointError::InvalidBackdrop {
                value: backdrop_breakpoint,
            });
        }
        Ok(Self {
            breakpoints,
            backdrop: backdrop_breakpoint,
        })
    }

    /// The breakpoints, ascending.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.breakpoints
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.breakpoints.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.breakpoints.is_empty()
    }

    /// Lowest breakpoint.
    #[must_use]
    pub fn minimum(&self) -> f64 {
        self.breakpoints[0]
    }

    /// Highest breakpoint.
    #[must_use]
    pub fn maximum(&self) -> f64 {
        self.breakpoints[self.breakpoints.len() - 1]
    }

    /// The breakpoint immediately above the minimum.
    #[must_use]
    pub fn second(&self) -> Option<f64> {
        self.breakpoints.get(1).copied()
    }

    /// Whether `value` is exactly one of the breakpoints.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.breakpoints.contains(&value)
    }

    /// Breakpoints that keep the sheet open, ascending.
    pub fn open_breakpoints(&self) -> impl Iterator<Item = f64> + '_ {
        self.breakpoints.iter().copied().filter(|&b| b != 0.0)
    }

    /// The breakpoint nearest to `value`; the earliest wins ties.
    #[must_use]
    pub fn closest(&self, value: f64) -> f64 {
        let mut best = self.breakpoints[0];
        let mut best_distance = (best - value).abs();
        for &candidate in &self.breakpoints[1..] {
            let distance = (candidate - value).abs();
            if distance < best_distance {
                best = candidate;
                best_distance = distance;
            }
        }
        best
    }

    /// Height above which the backdrop becomes interactive.
    #[inline]
    #[must_use]
    pub fn backdrop_breakpoint(&self) -> f64 {
        self.backdrop
    }

    /// Backdrop opacity multiplier for a sheet showing `x` of its height.
    ///
    /// Linear from 0 at the backdrop breakpoint to 1 at full expansion.
    #[must_use]
    pub fn backdrop_value(&self, x: f64) -> f64 {
        if self.backdrop >= 1.0 {
            return 0.0;
        }
        let slope = 1.0 / (1.0 - self.backdrop);
        (slope * x - self.backdrop * slope).max(0.0)
    }

    /// Resting keyframes for the panel translation track.
    #[must_use]
    pub fn wrapper_keyframes() -> Vec<Keyframe> {
        vec![Keyframe::translate_y(0.0, 0.0), Keyframe::translate_y(1.0, 100.0)]
    }

    /// Resting keyframes for the backdrop opacity track.
    #[must_use]
    pub fn backdrop_keyframes(&self) -> Vec<Keyframe> {
        if self.backdrop == 0.0 {
            vec![
                Keyframe::opacity(0.0, Opacity::Themed(1.0)),
                Keyframe::opacity(1.0, Opacity::Fixed(0.01)),
            ]
        } else {
            vec![
                Keyframe::opacity(0.0, Opacity::Themed(1.0)),
                Keyframe::opacity(1.0 - self.backdrop, Opacity::Fixed(0.0)),
                Keyframe::opacity(1.0, Opacity::Fixed(0.0)),
            ]
        }
    }
}
