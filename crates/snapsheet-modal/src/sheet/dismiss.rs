#![forbid(unsafe_code)]

//! Host dismiss permission.

/// Whether the host lets the sheet be dismissed.
///
/// `Unset` is distinct from `Allowed`: a host that never configured the
/// permission is treated the same as one that always allows dismissal, but
/// the difference is kept so callers can tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanDismiss {
    /// No permission was configured.
    #[default]
    Unset,
    /// Dismissal is always allowed.
    Allowed,
    /// Dismissal needs confirmation (a guard function, a prompt, or a flat
    /// refusal). The host decides at confirmation time.
    Blocked,
}

impl CanDismiss {
    /// Whether a drag toward dismissal should be resisted.
    ///
    /// Only sheets whose lowest breakpoint is 0 can be dragged out, so
    /// anything else never blocks.
    #[must_use]
    pub fn blocks_gesture(self, minimum_breakpoint: f64) -> bool {
        minimum_breakpoint == 0.0 && self == Self::Blocked
    }
}

impl From<bool> for CanDismiss {
    fn from(allowed: bool) -> Self {
        if allowed { Self::Allowed } else { Self::Blocked }
    }
}
