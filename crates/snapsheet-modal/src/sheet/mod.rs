#![forbid(unsafe_code)]

//! Sheet modal: breakpoints, dismiss gating, host side effects, and the
//! drag-to-snap controller.

pub mod breakpoints;
pub mod completion;
pub mod config;
pub mod controller;
pub mod dismiss;
pub mod host;

pub use breakpoints::{BreakpointError, BreakpointTable};
pub use completion::Completion;
pub use config::{ConfigError, SheetConfig};
pub use controller::{
    BACKDROP_TRACK, MoveToBreakpoint, SheetController, SheetControllerBuilder, SheetError, SheetPhase,
    WRAPPER_TRACK,
};
pub use dismiss::CanDismiss;
pub use host::{NoopHost, PageHeight, SheetHost};
