#![forbid(unsafe_code)]

//! Vertical drag recognition: turns raw pointer samples into pan callbacks.
//!
//! [`DragRecognizer`] tracks a single pointer. Once the pointer has travelled
//! far enough vertically, it asks a [`GestureHandler`] whether a pan may
//! begin, and from then on forwards every sample until the pointer is
//! released.
//!
//! # State Machine
//!
//! ```text
//! (none) --pointer_down--> Pending --threshold, can_start--> Panning
//!    ^                        |                                 |
//!    +---- horizontal / refused / pointer_up -------------------+-- pointer_up (on_end)
//! ```
//!
//! # Invariants
//!
//! 1. `on_start` never fires before `|dy|` reaches the threshold.
//! 2. `can_start` is consulted at most once per pointer.
//! 3. A pointer that leaves the threshold horizontally never starts a pan.
//! 4. Every `on_start` is followed by exactly one `on_end`, unless the gate
//!    is disabled mid-pan.
//! 5. Velocities are in px/ms, smoothed over samples less than the velocity
//!    window apart.
//!
//! # Failure Modes
//!
//! - While the [`GestureGate`] is disabled, new pointers are ignored and an
//!   active pan is dropped without `on_end`. The gate owner is expected to
//!   have already handled the release that led it to disable recognition.
//! - Samples with identical or out-of-order timestamps leave velocity
//!   unchanged.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Thresholds for drag recognition.
#[derive(Debug, Clone, PartialEq)]
pub struct GestureConfig {
    /// Vertical distance (px) before a pan starts (default: 10).
    pub threshold: f64,
    /// Samples further apart than this do not update velocity (default: 100ms).
    pub velocity_window: Duration,
    /// Weight of the newest instantaneous velocity (default: 0.7).
    pub velocity_smoothing: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            threshold: 10.0,
            velocity_window: Duration::from_millis(100),
            velocity_smoothing: 0.7,
        }
    }
}

impl GestureConfig {
    /// Set the start threshold (builder pattern).
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.max(0.0);
        self
    }
}

// ---------------------------------------------------------------------------
// Gesture detail
// ---------------------------------------------------------------------------

/// Where the pointer went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragOrigin {
    /// On the sheet chrome (handle, header, padding).
    #[default]
    Surface,
    /// Inside content that can scroll on its own.
    ScrollableContent,
}

/// Snapshot of a pointer's travel, passed to every handler callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureDetail {
    pub start_x: f64,
    pub start_y: f64,
    pub current_x: f64,
    pub current_y: f64,
    /// `current_x - start_x`.
    pub delta_x: f64,
    /// `current_y - start_y`; positive is downward.
    pub delta_y: f64,
    /// Smoothed horizontal velocity in px/ms.
    pub velocity_x: f64,
    /// Smoothed vertical velocity in px/ms; positive is downward.
    pub velocity_y: f64,
    pub start_time: Instant,
    pub current_time: Instant,
    pub origin: DragOrigin,
}

impl GestureDetail {
    /// A detail for a pointer that just went down at `(x, y)`.
    #[must_use]
    pub fn new(x: f64, y: f64, origin: DragOrigin, now: Instant) -> Self {
        Self {
            start_x: x,
            start_y: y,
            current_x: x,
            current_y: y,
            delta_x: 0.0,
            delta_y: 0.0,
            velocity_x: 0.0,
            velocity_y: 0.0,
            start_time: now,
            current_time: now,
            origin,
        }
    }

    /// Detail with an explicit vertical travel and velocity.
    ///
    /// Convenient for driving a handler without a recognizer.
    #[must_use]
    pub fn vertical(delta_y: f64, velocity_y: f64) -> Self {
        let now = Instant::now();
        let mut detail = Self::new(0.0, 0.0, DragOrigin::Surface, now);
        detail.current_y = delta_y;
        detail.delta_y = delta_y;
        detail.velocity_y = velocity_y;
        detail
    }

    /// Set the origin (builder pattern).
    #[must_use]
    pub fn with_origin(mut self, origin: DragOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Time since the pointer went down.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.current_time.saturating_duration_since(self.start_time)
    }

    fn record(&mut self, x: f64, y: f64, now: Instant, config: &GestureConfig) {
        let dt_ms = now.saturating_duration_since(self.current_time).as_secs_f64() * 1000.0;
        let (prev_x, prev_y) = (self.current_x, self.current_y);
        self.current_x = x;
        self.current_y = y;
        self.current_time = self.current_time.max(now);

        let window_ms = config.velocity_window.as_secs_f64() * 1000.0;
        if dt_ms > 0.0 && dt_ms < window_ms {
            let s = config.velocity_smoothing.clamp(0.0, 1.0);
            self.velocity_x = (x - prev_x) / dt_ms * s + self.velocity_x * (1.0 - s);
            self.velocity_y = (y - prev_y) / dt_ms * s + self.velocity_y * (1.0 - s);
        }
        self.delta_x = x - self.start_x;
        self.delta_y = y - self.start_y;
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Receiver of pan lifecycle callbacks.
///
/// Methods take `&self`: handlers are typically shared handles with interior
/// state.
pub trait GestureHandler {
    /// Whether a pan may begin. Asked once, when the threshold is crossed.
    fn can_start(&self, _detail: &GestureDetail) -> bool {
        true
    }

    /// The pan began.
    fn on_start(&self, detail: &GestureDetail);

    /// The pointer moved during a pan.
    fn on_move(&self, detail: &GestureDetail);

    /// The pointer was released (or the pan cancelled).
    fn on_end(&self, detail: &GestureDetail);
}

impl<H: GestureHandler + ?Sized> GestureHandler for Rc<H> {
    fn can_start(&self, detail: &GestureDetail) -> bool {
        (**self).can_start(detail)
    }

    fn on_start(&self, detail: &GestureDetail) {
        (**self).on_start(detail);
    }

    fn on_move(&self, detail: &GestureDetail) {
        (**self).on_move(detail);
    }

    fn on_end(&self, detail: &GestureDetail) {
        (**self).on_end(detail);
    }
}

/// A switch that turns gesture recognition on or off.
pub trait GestureSwitch {
    fn enable(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
}

/// Shared enable flag for a [`DragRecognizer`].
///
/// Clones share the same flag: hand one to the sheet controller and keep the
/// recognizer's own.
#[derive(Debug, Clone)]
pub struct GestureGate(Rc<Cell<bool>>);

impl GestureGate {
    /// A gate that starts enabled.
    #[must_use]
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(true)))
    }
}

impl Default for GestureGate {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureSwitch for GestureGate {
    fn enable(&self, enabled: bool) {
        #[cfg(feature = "tracing")]
        tracing::trace!(enabled, "gesture gate");
        self.0.set(enabled);
    }

    fn is_enabled(&self) -> bool {
        self.0.get()
    }
}

// ---------------------------------------------------------------------------
// DragRecognizer
// ---------------------------------------------------------------------------

/// Tracks a pointer that is down.
#[derive(Debug, Clone)]
struct PointerTracker {
    detail: GestureDetail,
    panning: bool,
}

/// Single-pointer vertical pan recognizer.
///
/// Feed it pointer samples; it calls the supplied [`GestureHandler`].
pub struct DragRecognizer {
    config: GestureConfig,
    gate: GestureGate,
    pointer: Option<PointerTracker>,
}

impl std::fmt::Debug for DragRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DragRecognizer")
            .field("enabled", &self.gate.is_enabled())
            .field("tracking", &self.pointer.is_some())
            .field("panning", &self.is_panning())
            .finish()
    }
}

impl Default for DragRecognizer {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl DragRecognizer {
    /// Create a recognizer with its own enabled gate.
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            gate: GestureGate::new(),
            pointer: None,
        }
    }

    /// The recognizer's enable gate.
    #[must_use]
    pub fn gate(&self) -> GestureGate {
        self.gate.clone()
    }

    /// Get the current configuration.
    #[must_use]
    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Whether a pointer is down and has started a pan.
    #[must_use]
    pub fn is_panning(&self) -> bool {
        self.pointer.as_ref().is_some_and(|p| p.panning)
    }

    /// Whether a pointer is down (panning or not).
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.pointer.is_some()
    }

    /// A pointer went down. Returns `false` if recognition is disabled.
    pub fn pointer_down(&mut self, x: f64, y: f64, origin: DragOrigin, now: Instant) -> bool {
        if !self.gate.is_enabled() {
            self.pointer = None;
            return false;
        }
        self.pointer = Some(PointerTracker {
            detail: GestureDetail::new(x, y, origin, now),
            panning: false,
        });
        true
    }

    /// The pointer moved. Returns `true` if the handler received a callback.
    pub fn pointer_move<H: GestureHandler + ?Sized>(&mut self, x: f64, y: f64, now: Instant, handler: &H) -> bool {
        if !self.gate.is_enabled() {
            self.pointer = None;
            return false;
        }
        let Some(tracker) = self.pointer.as_mut() else {
            return false;
        };
        tracker.detail.record(x, y, now, &self.config);

        if tracker.panning {
            handler.on_move(&tracker.detail);
            return true;
        }

        let dx = tracker.detail.delta_x.abs();
        let dy = tracker.detail.delta_y.abs();
        let threshold = self.config.threshold;
        if dx < threshold && dy < threshold {
            return false;
        }
        if dy < threshold || dy < dx {
            #[cfg(feature = "tracing")]
            tracing::trace!(dx, dy, "drag abandoned: horizontal");
            self.pointer = None;
            return false;
        }
        if !handler.can_start(&tracker.detail) {
            #[cfg(feature = "tracing")]
            tracing::trace!("drag refused by handler");
            self.pointer = None;
            return false;
        }
        tracker.panning = true;
        #[cfg(feature = "tracing")]
        tracing::trace!(dy = tracker.detail.delta_y, "drag started");
        handler.on_start(&tracker.detail);
        true
    }

    /// The pointer was released. Returns `true` if a pan ended.
    pub fn pointer_up<H: GestureHandler + ?Sized>(&mut self, x: f64, y: f64, now: Instant, handler: &H) -> bool {
        let Some(mut tracker) = self.pointer.take() else {
            return false;
        };
        if !tracker.panning || !self.gate.is_enabled() {
            return false;
        }
        tracker.detail.record(x, y, now, &self.config);
        #[cfg(feature = "tracing")]
        tracing::trace!(
            dy = tracker.detail.delta_y,
            vy = tracker.detail.velocity_y,
            "drag ended"
        );
        handler.on_end(&tracker.detail);
        true
    }

    /// Cancel the current pointer. An active pan ends at its last sample.
    pub fn cancel<H: GestureHandler + ?Sized>(&mut self, handler: &H) -> bool {
        match self.pointer.take() {
            Some(tracker) if tracker.panning && self.gate.is_enabled() => {
                handler.on_end(&tracker.detail);
                true
            }
            _ => false,
        }
    }

    /// Forget the current pointer without any callback.
    pub fn reset(&mut self) {
        self.pointer = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<&'static str>>,
        last: Cell<Option<GestureDetail>>,
        refuse: Cell<bool>,
        can_start_calls: Cell<u32>,
    }

    impl Recorder {
        fn events(&self) -> Vec<&'static str> {
            self.events.borrow().clone()
        }
    }

    impl GestureHandler for Recorder {
        fn can_start(&self, _detail: &GestureDetail) -> bool {
            self.can_start_calls.set(self.can_start_calls.get() + 1);
            !self.refuse.get()
        }

        fn on_start(&self, detail: &GestureDetail) {
            self.events.borrow_mut().push("start");
            self.last.set(Some(*detail));
        }

        fn on_move(&self, detail: &GestureDetail) {
            self.events.borrow_mut().push("move");
            self.last.set(Some(*detail));
        }

        fn on_end(&self, detail: &GestureDetail) {
            self.events.borrow_mut().push("end");
            self.last.set(Some(*detail));
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn no_start_below_threshold() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0);
        assert!(!rec.pointer_move(0.0, 9.0, t0 + ms(10), &h));
        assert!(h.events().is_empty());
        assert!(!rec.is_panning());
    }

    #[test]
    fn start_at_threshold() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0);
        assert!(rec.pointer_move(0.0, 10.0, t0 + ms(10), &h));
        assert_eq!(h.events(), vec!["start"]);
        assert!(rec.is_panning());
    }

    #[test]
    fn upward_drag_starts() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        rec.pointer_down(0.0, 100.0, DragOrigin::Surface, t0);
        rec.pointer_move(2.0, 80.0, t0 + ms(10), &h);
        assert_eq!(h.events(), vec!["start"]);
        assert_eq!(h.last.get().map(|d| d.delta_y), Some(-20.0));
    }

    #[test]
    fn full_lifecycle() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0);
        rec.pointer_move(0.0, 12.0, t0 + ms(10), &h);
        rec.pointer_move(0.0, 30.0, t0 + ms(20), &h);
        assert!(rec.pointer_up(0.0, 40.0, t0 + ms(30), &h));
        assert_eq!(h.events(), vec!["start", "move", "end"]);
        assert!(!rec.is_tracking());
        assert_eq!(h.last.get().map(|d| d.delta_y), Some(40.0));
    }

    #[test]
    fn horizontal_pan_is_abandoned() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0);
        assert!(!rec.pointer_move(15.0, 3.0, t0 + ms(10), &h));
        assert!(!rec.is_tracking());
        // Later vertical travel does not revive the pointer.
        assert!(!rec.pointer_move(15.0, 60.0, t0 + ms(20), &h));
        assert!(h.events().is_empty());
        assert_eq!(h.can_start_calls.get(), 0);
    }

    #[test]
    fn diagonal_favoring_vertical_starts() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0);
        assert!(rec.pointer_move(10.0, 11.0, t0 + ms(10), &h));
        assert_eq!(h.events(), vec!["start"]);
    }

    #[test]
    fn refused_start_abandons_pointer() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        h.refuse.set(true);
        rec.pointer_down(0.0, 0.0, DragOrigin::ScrollableContent, t0);
        rec.pointer_move(0.0, 20.0, t0 + ms(10), &h);
        rec.pointer_move(0.0, 40.0, t0 + ms(20), &h);
        assert!(!rec.pointer_up(0.0, 40.0, t0 + ms(30), &h));
        assert_eq!(h.can_start_calls.get(), 1);
        assert!(h.events().is_empty());
    }

    #[test]
    fn origin_is_reported() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        rec.pointer_down(0.0, 0.0, DragOrigin::ScrollableContent, t0);
        rec.pointer_move(0.0, 20.0, t0 + ms(10), &h);
        assert_eq!(h.last.get().map(|d| d.origin), Some(DragOrigin::ScrollableContent));
    }

    #[test]
    fn release_without_pan_is_silent() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0);
        assert!(!rec.pointer_up(0.0, 5.0, t0 + ms(10), &h));
        assert!(h.events().is_empty());
    }

    #[test]
    fn disabled_gate_ignores_pointer_down() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        rec.gate().enable(false);
        assert!(!rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0));
        assert!(!rec.pointer_move(0.0, 50.0, t0 + ms(10), &h));
        assert!(h.events().is_empty());
    }

    #[test]
    fn disabling_mid_pan_drops_without_end() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        let gate = rec.gate();
        rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0);
        rec.pointer_move(0.0, 20.0, t0 + ms(10), &h);
        gate.enable(false);
        assert!(!rec.pointer_move(0.0, 30.0, t0 + ms(20), &h));
        assert!(!rec.pointer_up(0.0, 30.0, t0 + ms(30), &h));
        assert_eq!(h.events(), vec!["start"]);
        assert!(!rec.is_tracking());
    }

    #[test]
    fn gate_clones_share_flag() {
        let gate = GestureGate::new();
        let other = gate.clone();
        other.enable(false);
        assert!(!gate.is_enabled());
        gate.enable(true);
        assert!(other.is_enabled());
    }

    #[test]
    fn velocity_is_smoothed_px_per_ms() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0);
        // 20 px in 10 ms = 2 px/ms instant; smoothed 0.7 * 2 = 1.4.
        rec.pointer_move(0.0, 20.0, t0 + ms(10), &h);
        let v1 = h.last.get().map(|d| d.velocity_y).unwrap();
        assert!((v1 - 1.4).abs() < 1e-9, "v1={v1}");
        // another 2 px/ms: 0.7 * 2 + 0.3 * 1.4 = 1.82
        rec.pointer_move(0.0, 40.0, t0 + ms(20), &h);
        let v2 = h.last.get().map(|d| d.velocity_y).unwrap();
        assert!((v2 - 1.82).abs() < 1e-9, "v2={v2}");
    }

    #[test]
    fn stale_samples_keep_velocity() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0);
        rec.pointer_move(0.0, 20.0, t0 + ms(10), &h);
        // 150 ms gap is outside the window.
        rec.pointer_move(0.0, 200.0, t0 + ms(160), &h);
        let v = h.last.get().map(|d| d.velocity_y).unwrap();
        assert!((v - 1.4).abs() < 1e-9);
        // Same timestamp: no update either.
        rec.pointer_move(0.0, 300.0, t0 + ms(160), &h);
        let v = h.last.get().map(|d| d.velocity_y).unwrap();
        assert!((v - 1.4).abs() < 1e-9);
    }

    #[test]
    fn cancel_ends_active_pan() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0);
        rec.pointer_move(0.0, 20.0, t0 + ms(10), &h);
        assert!(rec.cancel(&h));
        assert_eq!(h.events(), vec!["start", "end"]);
        assert!(!rec.cancel(&h));
    }

    #[test]
    fn reset_is_silent() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Recorder::default();
        rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0);
        rec.pointer_move(0.0, 20.0, t0 + ms(10), &h);
        rec.reset();
        assert!(!rec.is_tracking());
        assert_eq!(h.events(), vec!["start"]);
    }

    #[test]
    fn custom_threshold() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::new(GestureConfig::default().with_threshold(30.0));
        let h = Recorder::default();
        rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0);
        assert!(!rec.pointer_move(0.0, 20.0, t0 + ms(10), &h));
        assert!(rec.pointer_move(0.0, 30.0, t0 + ms(20), &h));
    }

    #[test]
    fn rc_handler_forwards() {
        let t0 = Instant::now();
        let mut rec = DragRecognizer::default();
        let h = Rc::new(Recorder::default());
        rec.pointer_down(0.0, 0.0, DragOrigin::Surface, t0);
        rec.pointer_move(0.0, 20.0, t0 + ms(10), &h);
        rec.pointer_up(0.0, 20.0, t0 + ms(20), &h);
        assert_eq!(h.events(), vec!["start", "end"]);
    }

    #[test]
    fn debug_format() {
        let rec = DragRecognizer::default();
        let dbg = format!("{rec:?}");
        assert!(dbg.contains("DragRecognizer"));
        assert!(dbg.contains("enabled"));
    }
}
