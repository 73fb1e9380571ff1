// Forbid unsafe in production; deny (with targeted allows) in tests.
#![cfg_attr(not(test), forbid(unsafe_code))]
#![cfg_attr(test, deny(unsafe_code))]

//! Core: scrubbable animation timelines and vertical drag recognition.
//!
//! # Role in snapsheet
//! `snapsheet-core` is the primitive layer. It owns the keyframe timeline
//! engine that a sheet scrubs while the user drags, the easing curves used
//! when the sheet settles, the spring resistance curve applied when a
//! dismissal is being resisted, and a single-pointer drag recognizer that
//! turns raw pointer samples into start/move/end callbacks.
//!
//! # Primary responsibilities
//! - **ProgressTimeline**: named keyframe tracks driven by an explicit
//!   progress cursor, with frame-driven settling and finish callbacks.
//! - **Easing**: curves applied while a timeline settles.
//! - **spring_step**: the rubber-band resistance curve.
//! - **DragRecognizer**: threshold-gated vertical pan detection with
//!   smoothed velocity and an enable gate.
//!
//! # How it fits in the system
//! `snapsheet-modal` consumes these primitives through the
//! [`animation::ProgressAnimation`] and [`gesture::GestureSwitch`] traits,
//! so a host can substitute its own engine or recognizer.

pub mod animation;
pub mod gesture;
