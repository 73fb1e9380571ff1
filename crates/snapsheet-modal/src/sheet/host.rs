#![forbid(unsafe_code)]

//! Side effects a sheet asks of its host.
//!
//! The controller never touches the view tree directly. Everything visible
//! besides the two animated tracks goes through [`SheetHost`]: the dismiss
//! permission, content scroll locking, the page container height, backdrop
//! hit-testing, and focus.
//!
//! All methods are best effort and default to no-ops, so a host only
//! implements what it has.

use std::fmt;
use std::rc::Rc;

use super::dismiss::CanDismiss;

/// Height override for the page container behind a sheet.
///
/// Renders as `calc(100vh - P% - Ipx)`, where `P` is how far the sheet is
/// pushed down (as a percentage of its height) and `I` the fixed inset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageHeight {
    /// `step × 100`.
    pub offset_percent: f64,
    /// Fixed inset in pixels.
    pub inset_px: f64,
}

impl PageHeight {
    /// Height for a progress `step` (0 = fully expanded, 1 = hidden).
    #[must_use]
    pub fn for_step(step: f64, inset_px: f64) -> Self {
        Self {
            offset_percent: step * 100.0,
            inset_px,
        }
    }
}

impl fmt::Display for PageHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "calc(100vh - {}% - {}px)", self.offset_percent, self.inset_px)
    }
}

/// Host-side collaborator for a sheet controller.
pub trait SheetHost {
    /// Current dismiss permission, read at the start of every gesture.
    fn can_dismiss(&self) -> CanDismiss {
        CanDismiss::Unset
    }

    /// A dismissal was vetoed; run the host's confirmation flow.
    fn confirm_dismiss(&self) {}

    /// Allow or forbid the sheet content to scroll on its own.
    fn set_content_scroll(&self, _enabled: bool) {}

    /// Override the page container height.
    fn set_page_height(&self, _height: PageHeight) {}

    /// Remove the page container height override.
    fn clear_page_height(&self) {}

    /// Whether the backdrop intercepts pointer events.
    fn set_backdrop_interactive(&self, _interactive: bool) {}

    /// Move focus to the sheet root on the next frame.
    fn schedule_focus(&self) {}
}

/// A host with no side effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHost;

impl SheetHost for NoopHost {}

impl<H: SheetHost + ?Sized> SheetHost for Rc<H> {
    fn can_dismiss(&self) -> CanDismiss {
        (**self).can_dismiss()
    }

    fn confirm_dismiss(&self) {
        (**self).confirm_dismiss();
    }

    fn set_content_scroll(&self, enabled: bool) {
        (**self).set_content_scroll(enabled);
    }

    fn set_page_height(&self, height: PageHeight) {
        (**self).set_page_height(height);
    }

    fn clear_page_height(&self) {
        (**self).clear_page_height();
    }

    fn set_backdrop_interactive(&self, interactive: bool) {
        (**self).set_backdrop_interactive(interactive);
    }

    fn schedule_focus(&self) {
        (**self).schedule_focus();
    }
}
