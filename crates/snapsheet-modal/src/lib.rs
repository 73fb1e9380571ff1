#![forbid(unsafe_code)]

//! Drag-to-snap bottom sheet controller for snapsheet.
//!
//! A sheet is a panel anchored to the bottom of the viewport that rests at
//! one of several fractional heights (breakpoints) and can be dragged out of
//! view to dismiss it. [`SheetController`] keeps the drag, a two-track
//! progress animation, and the breakpoint state machine in step, and hands
//! every other side effect to a [`SheetHost`].
//!
//! # Example
//!
//! ```ignore
//! use snapsheet_core::gesture::{DragOrigin, DragRecognizer};
//! use snapsheet_modal::{SheetConfig, SheetController};
//!
//! let config = SheetConfig::new(vec![0.0, 0.5, 1.0]).with_initial_breakpoint(0.5);
//! let timeline = SheetController::timeline(&config);
//! let mut recognizer = DragRecognizer::new(config.gesture_config());
//! let sheet = SheetController::builder(config)
//!     .animation(timeline.clone())
//!     .gesture(recognizer.gate())
//!     .panel_height(800.0)
//!     .on_dismiss(|| println!("dismissed"))
//!     .build()?;
//!
//! recognizer.pointer_down(0.0, 400.0, DragOrigin::Surface, now);
//! recognizer.pointer_move(0.0, 200.0, now + frame, &sheet);
//! recognizer.pointer_up(0.0, 200.0, now + frame * 2, &sheet);
//! while !timeline.tick(frame) {}
//! ```

pub mod sheet;

pub use sheet::{
    BACKDROP_TRACK, BreakpointError, BreakpointTable, CanDismiss, Completion, ConfigError,
    MoveToBreakpoint, NoopHost, PageHeight, SheetConfig, SheetController, SheetControllerBuilder,
    SheetError, SheetHost, SheetPhase, WRAPPER_TRACK,
};
