#![forbid(unsafe_code)]

//! Sheet controller: drag tracking, snap resolution, and breakpoint
//! transitions for a bottom sheet.
//!
//! # State Machine
//!
//! ```text
//! Idle --on_start--> Tracking --on_end--> Settling --finish--> Idle
//!   |                                        |
//!   +------ move_sheet_to_breakpoint --------+--finish (target 0)--> Dismissed
//! ```
//!
//! # Invariants
//!
//! 1. At most one transition is in flight. Gesture recognition is disabled
//!    from the start of a transition until it settles, and re-enabled exactly
//!    once per transition.
//! 2. While settling, `current_breakpoint()` reports the sentinel `0.0`.
//! 3. A transition requested with `can_dismiss` toward breakpoint 0 is
//!    vetoed: the sheet returns to where it was and the host confirmation
//!    flow runs instead of `on_dismiss`.
//! 4. `on_dismiss` fires before the completion of the dismissing transition
//!    resolves; `on_breakpoint_change` fires before any other completion
//!    resolves.
//! 5. No interior borrow is held while collaborators or callbacks run.
//!
//! # Failure Modes
//!
//! - Missing animation tracks: transitions settle synchronously with no
//!   animation and a `warn` log.
//! - A non-positive panel height freezes the drag at the current breakpoint
//!   and projects no release distance.
//! - Transition requests while another is settling return the in-flight
//!   completion and log a `warn`. This includes requests made from
//!   `on_breakpoint_change`, which runs before that completion resolves.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use snapsheet_core::animation::{
    FinishCallback, Keyframe, Opacity, PlayTo, ProgressAnimation, ProgressTimeline, spring_step,
};
use snapsheet_core::gesture::{DragOrigin, GestureDetail, GestureHandler, GestureSwitch};
use thiserror::Error;
use tracing::{debug, warn};

use super::breakpoints::BreakpointTable;
use super::completion::Completion;
use super::config::{ConfigError, SheetConfig};
use super::host::{NoopHost, PageHeight, SheetHost};

/// Child track id of the panel translation.
pub const WRAPPER_TRACK: &str = "wrapperAnimation";
/// Child track id of the backdrop opacity.
pub const BACKDROP_TRACK: &str = "backdropAnimation";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle phase of a sheet controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetPhase {
    /// Resting at a breakpoint.
    #[default]
    Idle,
    /// A drag is in progress.
    Tracking,
    /// Animating to a breakpoint.
    Settling,
    /// Settled at breakpoint 0; the sheet is gone.
    Dismissed,
}

/// A breakpoint transition request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveToBreakpoint {
    /// Breakpoint to move to.
    pub breakpoint: f64,
    /// Progress the sheet is at now (`1 - visible height`).
    pub breakpoint_offset: f64,
    /// Veto a move to breakpoint 0.
    pub can_dismiss: bool,
    /// Animate the move; otherwise it completes on the next frame.
    pub animated: bool,
}

/// Errors from building or driving a sheet controller.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("invalid sheet configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("sheet controller needs {0}")]
    MissingCollaborator(&'static str),

    #[error("breakpoint {0} is not one of the sheet's breakpoints")]
    UnknownBreakpoint(f64),

    #[error("the sheet has been dismissed")]
    Dismissed,
}

#[derive(Debug, Clone, Copy)]
struct SheetState {
    current_breakpoint: f64,
    offset: f64,
    can_dismiss_blocks_gesture: bool,
    phase: SheetPhase,
}

struct Shared {
    config: SheetConfig,
    table: BreakpointTable,
    animation: Box<dyn ProgressAnimation>,
    host: Box<dyn SheetHost>,
    gesture: Box<dyn GestureSwitch>,
    on_dismiss: Option<Box<dyn Fn()>>,
    on_breakpoint_change: Option<Box<dyn Fn(f64)>>,
    current_breakpoint_source: Option<Box<dyn Fn() -> f64>>,
    panel_height: Cell<f64>,
    state: Cell<SheetState>,
    in_flight: RefCell<Option<Completion>>,
}

/// Drag-to-snap controller for one sheet presentation.
///
/// Cheap to clone; clones drive the same sheet.
#[derive(Clone)]
pub struct SheetController {
    shared: Rc<Shared>,
}

impl std::fmt::Debug for SheetController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.get();
        f.debug_struct("SheetController")
            .field("breakpoints", &self.shared.table.as_slice())
            .field("current_breakpoint", &state.current_breakpoint)
            .field("offset", &state.offset)
            .field("phase", &state.phase)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`SheetController`].
pub struct SheetControllerBuilder {
    config: SheetConfig,
    animation: Option<Box<dyn ProgressAnimation>>,
    host: Box<dyn SheetHost>,
    gesture: Option<Box<dyn GestureSwitch>>,
    panel_height: f64,
    on_dismiss: Option<Box<dyn Fn()>>,
    on_breakpoint_change: Option<Box<dyn Fn(f64)>>,
    current_breakpoint_source: Option<Box<dyn Fn() -> f64>>,
}

impl std::fmt::Debug for SheetControllerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetControllerBuilder")
            .field("config", &self.config)
            .field("has_animation", &self.animation.is_some())
            .field("has_gesture", &self.gesture.is_some())
            .field("panel_height", &self.panel_height)
            .finish()
    }
}

impl SheetControllerBuilder {
    /// The two-track animation the sheet scrubs. Required.
    #[must_use]
    pub fn animation(mut self, animation: impl ProgressAnimation + 'static) -> Self {
        self.animation = Some(Box::new(animation));
        self
    }

    /// Host side effects. Defaults to [`NoopHost`].
    #[must_use]
    pub fn host(mut self, host: impl SheetHost + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    /// Switch for the recognizer feeding this controller. Required.
    #[must_use]
    pub fn gesture(mut self, gesture: impl GestureSwitch + 'static) -> Self {
        self.gesture = Some(Box::new(gesture));
        self
    }

    /// Measured panel height in pixels.
    #[must_use]
    pub fn panel_height(mut self, px: f64) -> Self {
        self.panel_height = px;
        self
    }

    /// Called once when the sheet commits to dismissal.
    #[must_use]
    pub fn on_dismiss(mut self, f: impl Fn() + 'static) -> Self {
        self.on_dismiss = Some(Box::new(f));
        self
    }

    /// Called after every settled move to an open breakpoint.
    #[must_use]
    pub fn on_breakpoint_change(mut self, f: impl Fn(f64) + 'static) -> Self {
        self.on_breakpoint_change = Some(Box::new(f));
        self
    }

    /// Host query for the breakpoint, polled when each gesture may start.
    #[must_use]
    pub fn current_breakpoint_source(mut self, f: impl Fn() -> f64 + 'static) -> Self {
        self.current_breakpoint_source = Some(Box::new(f));
        self
    }

    /// Validate, build, and arm the controller.
    pub fn build(self) -> Result<SheetController, SheetError> {
        self.config.validate()?;
        let table = self.config.breakpoint_table().map_err(ConfigError::from)?;
        let animation = self.animation.ok_or(SheetError::MissingCollaborator("an animation"))?;
        let gesture = self.gesture.ok_or(SheetError::MissingCollaborator("a gesture switch"))?;

        let initial = self.config.initial_breakpoint;
        let controller = SheetController {
            shared: Rc::new(Shared {
                config: self.config,
                table,
                animation,
                host: self.host,
                gesture,
                on_dismiss: self.on_dismiss,
                on_breakpoint_change: self.on_breakpoint_change,
                current_breakpoint_source: self.current_breakpoint_source,
                panel_height: Cell::new(self.panel_height),
                state: Cell::new(SheetState {
                    current_breakpoint: initial,
                    offset: 0.0,
                    can_dismiss_blocks_gesture: false,
                    phase: SheetPhase::Idle,
                }),
                in_flight: RefCell::new(None),
            }),
        };
        controller.arm();
        Ok(controller)
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl SheetController {
    /// Start building a controller for `config`.
    #[must_use]
    pub fn builder(config: SheetConfig) -> SheetControllerBuilder {
        SheetControllerBuilder {
            config,
            animation: None,
            host: Box::new(NoopHost),
            gesture: None,
            panel_height: 0.0,
            on_dismiss: None,
            on_breakpoint_change: None,
            current_breakpoint_source: None,
        }
    }

    /// A timeline carrying both sheet tracks, eased per `config`.
    ///
    /// The tracks are re-keyframed when a controller is built on it.
    #[must_use]
    pub fn timeline(config: &SheetConfig) -> ProgressTimeline {
        ProgressTimeline::new()
            .with_easing(config.easing)
            .with_track(WRAPPER_TRACK, BreakpointTable::wrapper_keyframes())
            .with_track(BACKDROP_TRACK, Vec::new())
    }

    /// Apply resting keyframes and host state for the initial breakpoint.
    fn arm(&self) {
        let shared = &self.shared;
        let current = self.current_breakpoint();
        if self.has_tracks() {
            self.apply_resting_keyframes();
            shared.animation.progress_start(true, 1.0 - current);
            shared
                .host
                .set_backdrop_interactive(current > shared.table.backdrop_breakpoint());
        } else {
            warn!(
                wrapper = WRAPPER_TRACK,
                backdrop = BACKDROP_TRACK,
                "sheet animation is missing its tracks; transitions will not animate"
            );
        }
        if shared.config.expand_to_scroll && current != shared.table.maximum() {
            shared.host.set_content_scroll(false);
        }
        if !shared.config.inherit_safe_area {
            shared.host.set_page_height(self.page_height(1.0 - current));
        }
        debug!(
            breakpoint = current,
            breakpoints = ?shared.table.as_slice(),
            "sheet controller armed"
        );
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

impl SheetController {
    /// Last settled breakpoint; `0.0` while a transition is in flight.
    #[must_use]
    pub fn current_breakpoint(&self) -> f64 {
        self.shared.state.get().current_breakpoint
    }

    /// Progress pushed to the animation by the last drag sample.
    #[must_use]
    pub fn offset(&self) -> f64 {
        self.shared.state.get().offset
    }

    #[must_use]
    pub fn phase(&self) -> SheetPhase {
        self.shared.state.get().phase
    }

    /// Whether the current drag resists dismissal.
    #[must_use]
    pub fn can_dismiss_blocks_gesture(&self) -> bool {
        self.shared.state.get().can_dismiss_blocks_gesture
    }

    #[must_use]
    pub fn breakpoints(&self) -> &BreakpointTable {
        &self.shared.table
    }

    #[must_use]
    pub fn config(&self) -> &SheetConfig {
        &self.shared.config
    }

    #[must_use]
    pub fn panel_height(&self) -> f64 {
        self.shared.panel_height.get()
    }

    /// Update the measured panel height, e.g. after a resize.
    pub fn set_panel_height(&self, px: f64) {
        self.shared.panel_height.set(px);
    }

    /// Current backdrop opacity, with the themed keyframes resolved against
    /// `config.backdrop_opacity`.
    ///
    /// `None` when the animation has no backdrop track or cannot sample it.
    #[must_use]
    pub fn backdrop_opacity(&self) -> Option<f64> {
        self.shared
            .animation
            .sample_opacity(BACKDROP_TRACK, self.shared.config.backdrop_opacity)
    }

    fn update(&self, f: impl FnOnce(&mut SheetState)) {
        let mut state = self.shared.state.get();
        f(&mut state);
        self.shared.state.set(state);
    }

    fn has_tracks(&self) -> bool {
        let animation = &self.shared.animation;
        animation.has_track(WRAPPER_TRACK) && animation.has_track(BACKDROP_TRACK)
    }

    fn apply_resting_keyframes(&self) {
        let animation = &self.shared.animation;
        animation.set_keyframes(WRAPPER_TRACK, BreakpointTable::wrapper_keyframes());
        animation.set_keyframes(BACKDROP_TRACK, self.shared.table.backdrop_keyframes());
    }

    fn page_height(&self, step: f64) -> PageHeight {
        PageHeight::for_step(step, self.shared.config.page_inset_px)
    }

    fn blocks_dismiss(&self) -> bool {
        self.shared
            .host
            .can_dismiss()
            .blocks_gesture(self.shared.table.minimum())
    }
}

// ---------------------------------------------------------------------------
// Gesture lifecycle
// ---------------------------------------------------------------------------

impl SheetController {
    /// Whether a drag may begin.
    pub fn can_start(&self, detail: &GestureDetail) -> bool {
        if matches!(self.phase(), SheetPhase::Settling | SheetPhase::Dismissed) {
            return false;
        }
        if let Some(source) = &self.shared.current_breakpoint_source {
            let breakpoint = source();
            self.update(|s| s.current_breakpoint = breakpoint);
        }
        // Fully expanded content scrolls instead of dragging the sheet.
        !(self.shared.config.expand_to_scroll
            && self.current_breakpoint() == self.shared.table.maximum()
            && detail.origin == DragOrigin::ScrollableContent)
    }

    /// A drag began.
    pub fn on_start(&self, _detail: &GestureDetail) {
        let shared = &self.shared;
        let blocks = self.blocks_dismiss();
        let current = self.current_breakpoint();
        self.update(|s| {
            s.can_dismiss_blocks_gesture = blocks;
            s.offset = 1.0 - current;
            s.phase = SheetPhase::Tracking;
        });

        shared.host.set_content_scroll(false);
        if !shared.config.inherit_safe_area {
            shared.host.clear_page_height();
        }
        shared.host.schedule_focus();
        shared.animation.progress_start(true, 1.0 - current);
        debug!(breakpoint = current, can_dismiss_blocks = blocks, "sheet drag started");
    }

    /// The drag moved.
    pub fn on_move(&self, detail: &GestureDetail) {
        let shared = &self.shared;
        let state = shared.state.get();
        if state.phase != SheetPhase::Tracking {
            return;
        }
        let config = &shared.config;
        let height = self.panel_height();

        let initial_step = 1.0 - state.current_breakpoint;
        let step = if height > 0.0 {
            initial_step + detail.delta_y / height
        } else {
            initial_step
        };

        // Past the breakpoint right above 0, a blocked dismissal resists.
        let resist_from = shared
            .table
            .second()
            .map(|b| 1.0 - b)
            .filter(|&edge| step >= edge && state.can_dismiss_blocks_gesture);
        let (max_step, processed) = match resist_from {
            Some(edge) => {
                let max_step = config.blocked_max_step;
                let pull = (step - edge) / (max_step - edge);
                (max_step, edge + spring_step(pull))
            }
            None => (config.free_max_step, step),
        };

        let offset = processed.max(config.min_step).min(max_step);
        self.update(|s| s.offset = offset);
        shared.animation.progress_step(offset);

        if !config.inherit_safe_area {
            shared.host.set_page_height(self.page_height(processed));
        }
    }

    /// The drag was released: snap to the projected breakpoint.
    pub fn on_end(&self, detail: &GestureDetail) {
        let state = self.shared.state.get();
        if state.phase != SheetPhase::Tracking {
            return;
        }
        let height = self.panel_height();
        let threshold = if height > 0.0 {
            (detail.delta_y + detail.velocity_y * self.shared.config.flick_projection_ms) / height
        } else {
            0.0
        };
        let diff = state.current_breakpoint - threshold;
        let target = self.shared.table.closest(diff);
        debug!(
            delta_y = detail.delta_y,
            velocity_y = detail.velocity_y,
            projected = diff,
            snap_to = target,
            "sheet drag released"
        );

        self.move_sheet_to_breakpoint(MoveToBreakpoint {
            breakpoint: target,
            breakpoint_offset: state.offset,
            can_dismiss: state.can_dismiss_blocks_gesture,
            animated: true,
        });
    }
}

impl GestureHandler for SheetController {
    fn can_start(&self, detail: &GestureDetail) -> bool {
        SheetController::can_start(self, detail)
    }

    fn on_start(&self, detail: &GestureDetail) {
        SheetController::on_start(self, detail);
    }

    fn on_move(&self, detail: &GestureDetail) {
        SheetController::on_move(self, detail);
    }

    fn on_end(&self, detail: &GestureDetail) {
        SheetController::on_end(self, detail);
    }
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

impl SheetController {
    /// Animate from `breakpoint_offset` to a breakpoint.
    ///
    /// The returned completion resolves once the sheet has settled and every
    /// side effect (including `on_breakpoint_change`) has run.
    pub fn move_sheet_to_breakpoint(&self, request: MoveToBreakpoint) -> Completion {
        let shared = &self.shared;
        let state = shared.state.get();
        match state.phase {
            SheetPhase::Dismissed => {
                warn!(breakpoint = request.breakpoint, "ignoring transition on a dismissed sheet");
                return Completion::resolved();
            }
            SheetPhase::Settling => {
                warn!(
                    breakpoint = request.breakpoint,
                    "sheet transition already in flight; returning its completion"
                );
                return shared.in_flight.borrow().clone().unwrap_or_else(Completion::resolved);
            }
            SheetPhase::Idle | SheetPhase::Tracking => {}
        }

        let _span = tracing::debug_span!(
            "sheet.transition",
            breakpoint = request.breakpoint,
            offset = request.breakpoint_offset,
            can_dismiss = request.can_dismiss,
            animated = request.animated
        )
        .entered();

        let vetoed = request.can_dismiss && request.breakpoint == 0.0;
        let snap_to = if vetoed {
            state.current_breakpoint
        } else {
            request.breakpoint
        };
        let remain_open = snap_to != 0.0;

        self.update(|s| {
            s.current_breakpoint = 0.0;
            s.phase = SheetPhase::Settling;
        });

        let animate = self.has_tracks();
        if animate {
            let table = &shared.table;
            let offset = request.breakpoint_offset;
            shared.animation.set_keyframes(
                WRAPPER_TRACK,
                vec![
                    Keyframe::translate_y(0.0, offset * 100.0),
                    Keyframe::translate_y(1.0, (1.0 - snap_to) * 100.0),
                ],
            );
            shared.animation.set_keyframes(
                BACKDROP_TRACK,
                vec![
                    Keyframe::opacity(0.0, Opacity::Themed(table.backdrop_value(1.0 - offset))),
                    Keyframe::opacity(1.0, Opacity::Themed(table.backdrop_value(snap_to))),
                ],
            );
            shared.animation.progress_step(0.0);
        }

        shared.gesture.enable(false);

        if vetoed {
            debug!(breakpoint = snap_to, "dismissal vetoed; asking host to confirm");
            shared.host.confirm_dismiss();
        } else if !remain_open {
            debug!("sheet dismissing");
            if let Some(on_dismiss) = &shared.on_dismiss {
                on_dismiss();
            }
        }

        // Stays in flight until the settle has run, so requests made from
        // `on_breakpoint_change` join this completion.
        let completion = Completion::pending();
        *shared.in_flight.borrow_mut() = Some(completion.clone());
        if animate {
            let controller: Weak<Shared> = Rc::downgrade(&self.shared);
            let done = completion.clone();
            shared.animation.on_finish(FinishCallback::once(move || {
                if let Some(shared) = controller.upgrade() {
                    let sheet = SheetController { shared };
                    sheet.settle(snap_to, remain_open, true);
                    sheet.clear_in_flight(&done);
                }
                done.resolve();
            }));
            let duration = if request.animated {
                shared.config.settle_duration()
            } else {
                Duration::ZERO
            };
            shared.animation.progress_end(PlayTo::End, 0.0, duration);
        } else {
            warn!(
                breakpoint = snap_to,
                "sheet animation is missing its tracks; settling without animation"
            );
            self.settle(snap_to, remain_open, false);
            self.clear_in_flight(&completion);
            completion.resolve();
        }
        completion
    }

    fn clear_in_flight(&self, completion: &Completion) {
        self.shared
            .in_flight
            .borrow_mut()
            .take_if(|c| c.ptr_eq(completion));
    }

    /// Finish a transition at `snap_to`.
    fn settle(&self, snap_to: f64, remain_open: bool, animated: bool) {
        let shared = &self.shared;
        if remain_open {
            if animated {
                self.apply_resting_keyframes();
                shared.animation.progress_start(true, 1.0 - snap_to);
            }
            self.update(|s| s.current_breakpoint = snap_to);
            if let Some(on_change) = &shared.on_breakpoint_change {
                on_change(snap_to);
            }

            let config = &shared.config;
            if snap_to == shared.table.maximum() || !config.expand_to_scroll || !config.inherit_safe_area {
                shared.host.set_content_scroll(true);
            }
            if !config.inherit_safe_area {
                shared.host.set_page_height(self.page_height(1.0 - snap_to));
            }
            shared
                .host
                .set_backdrop_interactive(snap_to > shared.table.backdrop_breakpoint());
            self.update(|s| s.phase = SheetPhase::Idle);
            debug!(breakpoint = snap_to, "sheet settled");
        } else {
            self.update(|s| s.phase = SheetPhase::Dismissed);
            debug!("sheet dismissed");
        }

        shared.gesture.enable(true);
    }
}

// ---------------------------------------------------------------------------
// Programmatic breakpoint changes
// ---------------------------------------------------------------------------

impl SheetController {
    /// Move the sheet to one of its breakpoints.
    ///
    /// Resolves immediately when already there.
    pub fn set_current_breakpoint(&self, breakpoint: f64) -> Result<Completion, SheetError> {
        if self.phase() == SheetPhase::Dismissed {
            return Err(SheetError::Dismissed);
        }
        if !self.shared.table.contains(breakpoint) {
            warn!(
                breakpoint,
                breakpoints = ?self.shared.table.as_slice(),
                "attempted to set an unknown sheet breakpoint"
            );
            return Err(SheetError::UnknownBreakpoint(breakpoint));
        }
        let current = self.current_breakpoint();
        // While settling `current` is the sentinel, not a resting position.
        if breakpoint == current && self.phase() != SheetPhase::Settling {
            return Ok(Completion::resolved());
        }
        Ok(self.move_sheet_to_breakpoint(MoveToBreakpoint {
            breakpoint,
            breakpoint_offset: 1.0 - current,
            can_dismiss: self.blocks_dismiss(),
            animated: self.shared.config.animated,
        }))
    }

    /// Move to the next open breakpoint, wrapping from the highest to the
    /// lowest.
    ///
    /// Returns `Ok(None)` when the table has no open breakpoint.
    pub fn cycle_to_next_breakpoint(&self) -> Result<Option<Completion>, SheetError> {
        let open: Vec<f64> = self.shared.table.open_breakpoints().collect();
        if open.is_empty() {
            warn!("sheet has no open breakpoints to cycle through");
            return Ok(None);
        }
        let current = self.current_breakpoint();
        let next = match open.iter().position(|&b| b == current) {
            Some(index) => open[(index + 1) % open.len()],
            None => open[0],
        };
        self.set_current_breakpoint(next).map(Some)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
