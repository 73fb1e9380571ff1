#![forbid(unsafe_code)]

//! Scrubbable animation primitives.
//!
//! A sheet is animated by moving a single progress cursor in `[0.0, 1.0]`
//! across a set of named keyframe tracks. While the user drags, the cursor is
//! stepped directly ("scrubbing"); on release, the engine plays the cursor to
//! one end over a duration ("settling") and then fires its finish callbacks.
//!
//! [`ProgressAnimation`] is the contract the sheet controller drives.
//! [`ProgressTimeline`] is the in-crate implementation.

use std::time::Duration;

pub mod easing;
pub mod keyframes;
pub mod spring;
pub mod timeline;

pub use easing::Easing;
pub use keyframes::{Keyframe, KeyframeTrack, Opacity, Property};
pub use spring::spring_step;
pub use timeline::{PlaybackState, ProgressTimeline};

/// Which end of the timeline a settling playback heads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayTo {
    /// Play back toward progress 0.0.
    Start,
    /// Play forward toward progress 1.0.
    #[default]
    End,
}

impl PlayTo {
    /// Progress value at this end of the timeline.
    #[inline]
    #[must_use]
    pub fn progress(self) -> f64 {
        match self {
            Self::Start => 0.0,
            Self::End => 1.0,
        }
    }
}

/// Callback invoked when a settling playback completes.
pub enum FinishCallback {
    /// Fires on the next completion, then is dropped.
    Once(Box<dyn FnOnce()>),
    /// Fires on every completion until the timeline is dropped.
    Every(Box<dyn FnMut()>),
}

impl FinishCallback {
    /// Wrap a closure as a one-time callback.
    pub fn once(f: impl FnOnce() + 'static) -> Self {
        Self::Once(Box::new(f))
    }

    /// Wrap a closure as a persistent callback.
    pub fn every(f: impl FnMut() + 'static) -> Self {
        Self::Every(Box::new(f))
    }

    /// Whether this callback is dropped after its first invocation.
    #[must_use]
    pub fn is_one_time(&self) -> bool {
        matches!(self, Self::Once(_))
    }
}

impl std::fmt::Debug for FinishCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Once(_) => f.write_str("FinishCallback::Once(..)"),
            Self::Every(_) => f.write_str("FinishCallback::Every(..)"),
        }
    }
}

/// A keyframe animation whose progress can be scrubbed explicitly.
///
/// All methods take `&self`: implementations are shared handles, so the
/// controller and the frame loop that ticks the engine can hold the same
/// animation. Implementations must not hold interior borrows while running
/// finish callbacks, since callbacks re-enter the animation.
pub trait ProgressAnimation {
    /// Whether a child track with this id exists.
    fn has_track(&self, id: &str) -> bool;

    /// Replace the keyframes of a child track.
    ///
    /// Returns `false` (and does nothing) when the track does not exist.
    fn set_keyframes(&self, id: &str, keyframes: Vec<Keyframe>) -> bool;

    /// Enter scrubbing mode with the cursor at `start`.
    ///
    /// `force_linear` disables easing while scrubbing; the next
    /// `progress_end` restores it.
    fn progress_start(&self, force_linear: bool, start: f64);

    /// Move the cursor to `step` without animating.
    fn progress_step(&self, step: f64);

    /// Leave scrubbing mode by playing from `step` to `play_to` over `duration`.
    fn progress_end(&self, play_to: PlayTo, step: f64, duration: Duration);

    /// Opacity of a child track at the current cursor, with `Themed`
    /// keyframes resolved against `themed`.
    ///
    /// `None` when the track is missing or the engine cannot sample.
    fn sample_opacity(&self, _id: &str, _themed: f64) -> Option<f64> {
        None
    }

    /// Register a callback for the end of the next (or every) settle.
    fn on_finish(&self, callback: FinishCallback);
}
