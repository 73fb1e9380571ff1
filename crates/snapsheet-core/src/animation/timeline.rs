#![forbid(unsafe_code)]

//! ProgressTimeline: a scrubbable multi-track keyframe animation.
//!
//! A [`ProgressTimeline`] owns a set of named child [`KeyframeTrack`]s that
//! all share one progress cursor. The cursor is either stepped directly by
//! the caller (scrubbing) or played to one end by [`tick`](ProgressTimeline::tick)
//! after [`progress_end`](ProgressAnimation::progress_end) (settling). When a
//! settle reaches its end, finish callbacks run.
//!
//! The timeline is a cheap-clone handle: cloning shares the same tracks,
//! cursor, and callbacks. The frame loop ticks one clone while a controller
//! drives another.
//!
//! # Usage
//!
//! ```ignore
//! use std::time::Duration;
//! use snapsheet_core::animation::{Keyframe, PlayTo, ProgressAnimation, ProgressTimeline};
//!
//! let timeline = ProgressTimeline::new()
//!     .with_track("wrapper", vec![Keyframe::translate_y(0.0, 0.0), Keyframe::translate_y(1.0, 100.0)]);
//!
//! timeline.progress_start(true, 0.5);
//! timeline.progress_step(0.6);
//! timeline.progress_end(PlayTo::End, 0.6, Duration::from_millis(500));
//! while !timeline.tick(Duration::from_millis(16)) {}
//! ```
//!
//! # Invariants
//!
//! 1. `progress()` is always within [0.0, 1.0].
//! 2. `tick()` only moves the cursor in `Settling` state.
//! 3. A settle completes exactly once; a zero-duration settle completes on
//!    the next `tick()` regardless of `dt`.
//! 4. Settles always use the timeline easing; `force_linear` from
//!    `progress_start` lasts only until `progress_end`.
//! 5. `Once` callbacks fire at most once; `Every` callbacks fire on each
//!    completion.
//! 6. No interior borrow is held while callbacks run, so callbacks may call
//!    any timeline method (including registering new callbacks, which then
//!    wait for the next completion).
//!
//! # Failure Modes
//!
//! - Unknown track ids: `set_keyframes` returns `false`, sampling returns `None`.
//! - Non-finite progress inputs are treated as 0.0.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use super::{Easing, FinishCallback, Keyframe, KeyframeTrack, PlayTo, ProgressAnimation};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Playback state of the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Never started.
    #[default]
    Idle,
    /// Cursor is driven directly by the caller.
    Scrubbing,
    /// Cursor is playing toward an end.
    Settling,
    /// Reached the end of a settle.
    Finished,
}

/// A named child track.
#[derive(Debug, Clone)]
struct ChildTrack {
    id: String,
    keyframes: KeyframeTrack,
}

/// An in-progress settle playback.
#[derive(Debug, Clone, Copy)]
struct Settle {
    from: f64,
    to: f64,
    elapsed: Duration,
    duration: Duration,
}

struct TimelineInner {
    tracks: Vec<ChildTrack>,
    progress: f64,
    force_linear: bool,
    easing: Easing,
    state: PlaybackState,
    settle: Option<Settle>,
    callbacks: Vec<FinishCallback>,
}

/// Scrubbable keyframe timeline with named child tracks.
#[derive(Clone)]
pub struct ProgressTimeline {
    inner: Rc<RefCell<TimelineInner>>,
}

impl std::fmt::Debug for ProgressTimeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ProgressTimeline")
            .field("track_count", &inner.tracks.len())
            .field("progress", &inner.progress)
            .field("state", &inner.state)
            .field("callback_count", &inner.callbacks.len())
            .finish()
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl ProgressTimeline {
    /// Create a timeline with no tracks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(TimelineInner {
                tracks: Vec::new(),
                progress: 0.0,
                force_linear: false,
                easing: Easing::Linear,
                state: PlaybackState::Idle,
                settle: None,
                callbacks: Vec::new(),
            })),
        }
    }

    /// Add a child track (builder pattern).
    #[must_use]
    pub fn with_track(self, id: &str, keyframes: Vec<Keyframe>) -> Self {
        self.add_track(id, keyframes);
        self
    }

    /// Set the settle easing (builder pattern).
    #[must_use]
    pub fn with_easing(self, easing: Easing) -> Self {
        self.inner.borrow_mut().easing = easing;
        self
    }

    /// Add a child track, replacing any existing track with the same id.
    pub fn add_track(&self, id: &str, keyframes: Vec<Keyframe>) {
        let mut inner = self.inner.borrow_mut();
        let keyframes = KeyframeTrack::new(keyframes);
        if let Some(track) = inner.tracks.iter_mut().find(|t| t.id == id) {
            track.keyframes = keyframes;
        } else {
            inner.tracks.push(ChildTrack {
                id: id.to_string(),
                keyframes,
            });
        }
    }
}

impl Default for ProgressTimeline {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl ProgressTimeline {
    /// Current cursor position in [0.0, 1.0].
    #[inline]
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.inner.borrow().progress
    }

    /// Current playback state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.inner.borrow().state
    }

    /// Whether a settle is in flight.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == PlaybackState::Settling
    }

    /// Settle easing.
    #[must_use]
    pub fn easing(&self) -> Easing {
        self.inner.borrow().easing
    }

    /// Ids of all child tracks, in insertion order.
    #[must_use]
    pub fn track_ids(&self) -> Vec<String> {
        self.inner.borrow().tracks.iter().map(|t| t.id.clone()).collect()
    }

    /// A copy of a child track's keyframes.
    #[must_use]
    pub fn keyframes(&self, id: &str) -> Option<KeyframeTrack> {
        self.inner
            .borrow()
            .tracks
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.keyframes.clone())
    }

    /// Translation (percent) of a child track at the current cursor.
    #[must_use]
    pub fn sample_translate_y(&self, id: &str) -> Option<f64> {
        let inner = self.inner.borrow();
        let progress = inner.progress;
        inner
            .tracks
            .iter()
            .find(|t| t.id == id)
            .and_then(|t| t.keyframes.sample_translate_y(progress))
    }

    /// Absolute opacity of a child track at the current cursor.
    #[must_use]
    pub fn sample_opacity(&self, id: &str, themed: f64) -> Option<f64> {
        let inner = self.inner.borrow();
        let progress = inner.progress;
        inner
            .tracks
            .iter()
            .find(|t| t.id == id)
            .and_then(|t| t.keyframes.sample_opacity(progress, themed))
    }

    /// Number of registered finish callbacks.
    #[must_use]
    pub fn finish_callback_count(&self) -> usize {
        self.inner.borrow().callbacks.len()
    }
}

// ---------------------------------------------------------------------------
// Frame driving
// ---------------------------------------------------------------------------

impl ProgressTimeline {
    /// Advance a settle by `dt`.
    ///
    /// Returns `true` if the settle completed during this tick, after all
    /// finish callbacks have run.
    pub fn tick(&self, dt: Duration) -> bool {
        let completed = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != PlaybackState::Settling {
                return false;
            }
            let Some(mut settle) = inner.settle else {
                inner.state = PlaybackState::Finished;
                return false;
            };

            settle.elapsed = settle.elapsed.saturating_add(dt);
            let t = if settle.duration.is_zero() {
                1.0
            } else {
                (settle.elapsed.as_secs_f64() / settle.duration.as_secs_f64()).min(1.0)
            };
            let eased = if inner.force_linear {
                t
            } else {
                inner.easing.apply(t)
            };
            inner.progress = sanitize(settle.from + (settle.to - settle.from) * eased);

            if t >= 1.0 {
                inner.progress = settle.to;
                inner.state = PlaybackState::Finished;
                inner.settle = None;
                true
            } else {
                inner.settle = Some(settle);
                false
            }
        };

        if completed {
            #[cfg(feature = "tracing")]
            tracing::trace!(progress = self.progress(), "timeline settle finished");
            self.run_finish_callbacks();
        }
        completed
    }

    fn run_finish_callbacks(&self) {
        // Take the callbacks out so none of them observes a held borrow.
        let callbacks = std::mem::take(&mut self.inner.borrow_mut().callbacks);
        let mut kept = Vec::with_capacity(callbacks.len());
        for callback in callbacks {
            match callback {
                FinishCallback::Once(f) => f(),
                FinishCallback::Every(mut f) => {
                    f();
                    kept.push(FinishCallback::Every(f));
                }
            }
        }
        let mut inner = self.inner.borrow_mut();
        // Callbacks registered while running wait for the next completion.
        kept.append(&mut inner.callbacks);
        inner.callbacks = kept;
    }
}

// ---------------------------------------------------------------------------
// ProgressAnimation implementation
// ---------------------------------------------------------------------------

impl ProgressAnimation for ProgressTimeline {
    fn has_track(&self, id: &str) -> bool {
        self.inner.borrow().tracks.iter().any(|t| t.id == id)
    }

    fn set_keyframes(&self, id: &str, keyframes: Vec<Keyframe>) -> bool {
        let mut inner = self.inner.borrow_mut();
        match inner.tracks.iter_mut().find(|t| t.id == id) {
            Some(track) => {
                track.keyframes = KeyframeTrack::new(keyframes);
                true
            }
            None => false,
        }
    }

    fn progress_start(&self, force_linear: bool, start: f64) {
        let mut inner = self.inner.borrow_mut();
        inner.force_linear = force_linear;
        inner.progress = sanitize(start);
        inner.settle = None;
        inner.state = PlaybackState::Scrubbing;
    }

    fn progress_step(&self, step: f64) {
        let mut inner = self.inner.borrow_mut();
        inner.progress = sanitize(step);
        if matches!(inner.state, PlaybackState::Idle | PlaybackState::Finished) {
            inner.state = PlaybackState::Scrubbing;
        }
    }

    fn progress_end(&self, play_to: PlayTo, step: f64, duration: Duration) {
        let mut inner = self.inner.borrow_mut();
        let from = sanitize(step);
        // Forced linear easing only applies to scrubbing.
        inner.force_linear = false;
        inner.progress = from;
        inner.settle = Some(Settle {
            from,
            to: play_to.progress(),
            elapsed: Duration::ZERO,
            duration,
        });
        inner.state = PlaybackState::Settling;
        #[cfg(feature = "tracing")]
        tracing::trace!(from, ?play_to, ?duration, "timeline settle started");
    }

    fn on_finish(&self, callback: FinishCallback) {
        self.inner.borrow_mut().callbacks.push(callback);
    }

    fn sample_opacity(&self, id: &str, themed: f64) -> Option<f64> {
        ProgressTimeline::sample_opacity(self, id, themed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const MS_100: Duration = Duration::from_millis(100);
    const MS_250: Duration = Duration::from_millis(250);
    const MS_500: Duration = Duration::from_millis(500);

    fn wrapper_frames() -> Vec<Keyframe> {
        vec![
            Keyframe::translate_y(0.0, 0.0),
            Keyframe::translate_y(1.0, 100.0),
        ]
    }

    fn timeline() -> ProgressTimeline {
        ProgressTimeline::new().with_track("wrapper", wrapper_frames())
    }

    #[test]
    fn new_timeline_is_idle() {
        let tl = ProgressTimeline::new();
        assert_eq!(tl.state(), PlaybackState::Idle);
        assert_eq!(tl.progress(), 0.0);
        assert!(tl.track_ids().is_empty());
    }

    #[test]
    fn set_keyframes_requires_existing_track() {
        let tl = timeline();
        assert!(tl.has_track("wrapper"));
        assert!(!tl.has_track("backdrop"));
        assert!(!tl.set_keyframes("backdrop", wrapper_frames()));
        assert!(tl.set_keyframes("wrapper", vec![Keyframe::translate_y(0.0, 50.0)]));
        assert_eq!(tl.sample_translate_y("wrapper"), Some(50.0));
    }

    #[test]
    fn add_track_replaces_same_id() {
        let tl = timeline();
        tl.add_track("wrapper", vec![Keyframe::translate_y(0.0, 10.0)]);
        assert_eq!(tl.track_ids(), vec!["wrapper".to_string()]);
        assert_eq!(tl.sample_translate_y("wrapper"), Some(10.0));
    }

    #[test]
    fn scrubbing_moves_samples() {
        let tl = timeline();
        tl.progress_start(true, 0.5);
        assert_eq!(tl.state(), PlaybackState::Scrubbing);
        assert_eq!(tl.sample_translate_y("wrapper"), Some(50.0));
        tl.progress_step(0.75);
        assert_eq!(tl.sample_translate_y("wrapper"), Some(75.0));
    }

    #[test]
    fn progress_is_sanitized() {
        let tl = timeline();
        tl.progress_start(true, 4.0);
        assert_eq!(tl.progress(), 1.0);
        tl.progress_step(-1.0);
        assert_eq!(tl.progress(), 0.0);
        tl.progress_step(f64::INFINITY);
        assert_eq!(tl.progress(), 0.0);
    }

    #[test]
    fn tick_outside_settle_is_noop() {
        let tl = timeline();
        tl.progress_start(true, 0.3);
        assert!(!tl.tick(MS_500));
        assert_eq!(tl.progress(), 0.3);
    }

    #[test]
    fn linear_settle_reaches_end() {
        let tl = timeline();
        tl.progress_start(true, 0.0);
        tl.progress_end(PlayTo::End, 0.0, MS_500);
        assert!(tl.is_running());

        assert!(!tl.tick(MS_250));
        assert!((tl.progress() - 0.5).abs() < 1e-9);

        assert!(tl.tick(MS_250));
        assert_eq!(tl.progress(), 1.0);
        assert_eq!(tl.state(), PlaybackState::Finished);
    }

    #[test]
    fn settle_drops_forced_linear() {
        let tl = timeline().with_easing(Easing::EaseOut);
        tl.progress_start(true, 0.0);
        tl.progress_step(0.0);
        tl.progress_end(PlayTo::End, 0.0, MS_500);
        tl.tick(MS_250);
        assert!((tl.progress() - Easing::EaseOut.apply(0.5)).abs() < 1e-9);
        assert!(tl.progress() > 0.5);
    }

    #[test]
    fn settle_to_start() {
        let tl = timeline();
        tl.progress_start(true, 0.8);
        tl.progress_end(PlayTo::Start, 0.8, MS_100);
        assert!(tl.tick(MS_100));
        assert_eq!(tl.progress(), 0.0);
    }

    #[test]
    fn eased_settle_uses_easing() {
        let tl = timeline().with_easing(Easing::EaseOut);
        tl.progress_start(false, 0.0);
        tl.progress_end(PlayTo::End, 0.0, MS_500);
        tl.tick(MS_250);
        // ease-out is ahead of linear at the midpoint
        assert!(tl.progress() > 0.5);
    }

    #[test]
    fn zero_duration_completes_on_next_tick() {
        let tl = timeline();
        tl.progress_end(PlayTo::End, 0.2, Duration::ZERO);
        assert_eq!(tl.progress(), 0.2);
        assert!(tl.tick(Duration::ZERO));
        assert_eq!(tl.progress(), 1.0);
    }

    #[test]
    fn once_callback_fires_once() {
        let tl = timeline();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        tl.on_finish(FinishCallback::once(move || c.set(c.get() + 1)));

        tl.progress_end(PlayTo::End, 0.0, Duration::ZERO);
        tl.tick(Duration::ZERO);
        tl.progress_end(PlayTo::End, 0.0, Duration::ZERO);
        tl.tick(Duration::ZERO);

        assert_eq!(count.get(), 1);
        assert_eq!(tl.finish_callback_count(), 0);
    }

    #[test]
    fn every_callback_persists() {
        let tl = timeline();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        tl.on_finish(FinishCallback::every(move || c.set(c.get() + 1)));

        for _ in 0..3 {
            tl.progress_end(PlayTo::End, 0.0, Duration::ZERO);
            tl.tick(Duration::ZERO);
        }
        assert_eq!(count.get(), 3);
        assert_eq!(tl.finish_callback_count(), 1);
    }

    #[test]
    fn callback_can_reenter_timeline() {
        let tl = timeline();
        let handle = tl.clone();
        tl.on_finish(FinishCallback::once(move || {
            handle.set_keyframes("wrapper", vec![Keyframe::translate_y(0.0, 0.0), Keyframe::translate_y(1.0, 100.0)]);
            handle.progress_start(true, 0.25);
            handle.on_finish(FinishCallback::once(|| {}));
        }));

        tl.progress_end(PlayTo::End, 0.0, Duration::ZERO);
        assert!(tl.tick(Duration::ZERO));
        assert_eq!(tl.state(), PlaybackState::Scrubbing);
        assert_eq!(tl.progress(), 0.25);
        // The callback registered during the run waits for the next settle.
        assert_eq!(tl.finish_callback_count(), 1);
    }

    #[test]
    fn restarting_settle_fires_callbacks_once() {
        let tl = timeline();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        tl.on_finish(FinishCallback::once(move || c.set(c.get() + 1)));

        tl.progress_end(PlayTo::End, 0.0, MS_500);
        tl.tick(MS_100);
        tl.progress_end(PlayTo::End, 0.5, MS_100);
        assert!(tl.tick(MS_100));
        assert!(!tl.tick(MS_100));
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn clones_share_state() {
        let a = timeline();
        let b = a.clone();
        a.progress_start(true, 0.4);
        assert_eq!(b.progress(), 0.4);
    }

    #[test]
    fn debug_format() {
        let dbg = format!("{:?}", timeline());
        assert!(dbg.contains("ProgressTimeline"));
        assert!(dbg.contains("track_count"));
    }
}
