#![forbid(unsafe_code)]

//! Sheet configuration.
//!
//! [`SheetConfig`] carries everything a sheet controller needs besides its
//! collaborators: the breakpoint table, scroll and safe-area behavior, and
//! the tuning constants of the drag and settle. With the `config` feature it
//! can be loaded from TOML or JSON.
//!
//! # Loading
//!
//! ```toml
//! # sheet.toml
//! breakpoints = [0.0, 0.25, 0.5, 0.75, 1.0]
//! initial_breakpoint = 0.5
//! backdrop_breakpoint = 0.25
//! settle_duration_ms = 350
//! ```
//!
//! ```rust,ignore
//! let config = SheetConfig::from_toml_file("sheet.toml")?;
//! let config = SheetConfig::from_json_str(json)?;
//! ```
//!
//! # Defaults
//!
//! Every tuning field defaults to the values sheets have always used: a
//! 350 ms flick projection, a 500 ms settle, a 0.95 cap while dismissal is
//! resisted, a 10 px drag threshold and page inset, and a 0.4 backdrop.

#[cfg(feature = "config")]
use std::path::Path;
use std::time::Duration;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use snapsheet_core::animation::Easing;
use snapsheet_core::gesture::GestureConfig;
use thiserror::Error;

use super::breakpoints::{BreakpointError, BreakpointTable};

/// Configuration for one sheet presentation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct SheetConfig {
    /// Resting heights, strictly ascending in [0, 1].
    pub breakpoints: Vec<f64>,
    /// Breakpoint the sheet opens at. Must be one of `breakpoints`.
    pub initial_breakpoint: f64,
    /// Above this height the backdrop becomes interactive.
    pub backdrop_breakpoint: f64,
    /// Content only scrolls once the sheet is fully expanded; below that,
    /// dragging the content drags the sheet.
    pub expand_to_scroll: bool,
    /// The page container inherits its height from safe-area sizing. When
    /// false, the controller sizes it to the visible part of the sheet.
    pub inherit_safe_area: bool,
    /// Animate programmatic breakpoint changes.
    pub animated: bool,
    /// How far ahead a release velocity is projected (ms).
    pub flick_projection_ms: f64,
    /// Settle animation length (ms).
    pub settle_duration_ms: u64,
    /// Progress cap while a dismissal is being resisted.
    pub blocked_max_step: f64,
    /// Progress cap otherwise.
    pub free_max_step: f64,
    /// Progress floor.
    pub min_step: f64,
    /// Vertical travel (px) before a drag starts.
    pub drag_threshold_px: f64,
    /// Fixed inset subtracted from the page container height (px).
    pub page_inset_px: f64,
    /// Maximum backdrop opacity.
    pub backdrop_opacity: f64,
    /// Settle curve.
    pub easing: Easing,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            breakpoints: vec![0.0, 0.5, 1.0],
            initial_breakpoint: 0.5,
            backdrop_breakpoint: 0.0,
            expand_to_scroll: true,
            inherit_safe_area: true,
            animated: true,
            flick_projection_ms: 350.0,
            settle_duration_ms: 500,
            blocked_max_step: 0.95,
            free_max_step: 0.9999,
            min_step: 0.0001,
            drag_threshold_px: 10.0,
            page_inset_px: 10.0,
            backdrop_opacity: 0.4,
            easing: Easing::SHEET,
        }
    }
}

impl SheetConfig {
    /// Default tuning with the given breakpoints, opening at the highest one.
    #[must_use]
    pub fn new(breakpoints: Vec<f64>) -> Self {
        let initial_breakpoint = breakpoints.last().copied().unwrap_or(0.0);
        Self {
            breakpoints,
            initial_breakpoint,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_initial_breakpoint(mut self, breakpoint: f64) -> Self {
        self.initial_breakpoint = breakpoint;
        self
    }

    #[must_use]
    pub fn with_backdrop_breakpoint(mut self, breakpoint: f64) -> Self {
        self.backdrop_breakpoint = breakpoint;
        self
    }

    #[must_use]
    pub fn with_expand_to_scroll(mut self, enabled: bool) -> Self {
        self.expand_to_scroll = enabled;
        self
    }

    #[must_use]
    pub fn with_inherit_safe_area(mut self, enabled: bool) -> Self {
        self.inherit_safe_area = enabled;
        self
    }

    #[must_use]
    pub fn with_animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    #[must_use]
    pub fn with_settle_duration(mut self, duration: Duration) -> Self {
        self.settle_duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_backdrop_opacity(mut self, opacity: f64) -> Self {
        self.backdrop_opacity = opacity;
        self
    }

    #[must_use]
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Settle animation length.
    #[must_use]
    pub fn settle_duration(&self) -> Duration {
        Duration::from_millis(self.settle_duration_ms)
    }

    /// Drag recognizer settings matching this sheet.
    #[must_use]
    pub fn gesture_config(&self) -> GestureConfig {
        GestureConfig::default().with_threshold(self.drag_threshold_px)
    }

    /// Build the validated breakpoint table.
    pub fn breakpoint_table(&self) -> Result<BreakpointTable, BreakpointError> {
        BreakpointTable::new(self.breakpoints.clone(), self.backdrop_breakpoint)
    }

    /// Check every field.
    ///
    /// Breakpoint table problems are reported first and on their own; the
    /// remaining checks are collected into one [`ConfigError::Validation`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let table = self.breakpoint_table()?;
        if !table.contains(self.initial_breakpoint) {
            return Err(ConfigError::UnknownInitialBreakpoint(self.initial_breakpoint));
        }

        let mut errors = Vec::new();
        let unit_open = |v: f64| v.is_finite() && v > 0.0 && v <= 1.0;

        if !unit_open(self.min_step) {
            errors.push(format!("min_step must be in (0, 1], got {}", self.min_step));
        }
        if !unit_open(self.free_max_step) {
            errors.push(format!("free_max_step must be in (0, 1], got {}", self.free_max_step));
        }
        if !unit_open(self.blocked_max_step) {
            errors.push(format!(
                "blocked_max_step must be in (0, 1], got {}",
                self.blocked_max_step
            ));
        }
        if self.min_step >= self.blocked_max_step || self.min_step >= self.free_max_step {
            errors.push(format!(
                "min_step ({}) must be below both max steps",
                self.min_step
            ));
        }
        if self.blocked_max_step > self.free_max_step {
            errors.push(format!(
                "blocked_max_step ({}) must not exceed free_max_step ({})",
                self.blocked_max_step, self.free_max_step
            ));
        }
        if !self.flick_projection_ms.is_finite() || self.flick_projection_ms < 0.0 {
            errors.push(format!(
                "flick_projection_ms must be >= 0, got {}",
                self.flick_projection_ms
            ));
        }
        if !self.drag_threshold_px.is_finite() || self.drag_threshold_px < 0.0 {
            errors.push(format!(
                "drag_threshold_px must be >= 0, got {}",
                self.drag_threshold_px
            ));
        }
        if !self.page_inset_px.is_finite() {
            errors.push(format!("page_inset_px must be finite, got {}", self.page_inset_px));
        }
        if !(0.0..=1.0).contains(&self.backdrop_opacity) {
            errors.push(format!(
                "backdrop_opacity must be in [0, 1], got {}",
                self.backdrop_opacity
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

#[cfg(feature = "config")]
impl SheetConfig {
    /// Load and validate from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load and validate from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading or validating a sheet configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "config")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "config")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Breakpoints(#[from] BreakpointError),

    #[error("initial breakpoint {0} is not one of the breakpoints")]
    UnknownInitialBreakpoint(f64),

    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_messages(config: &SheetConfig) -> Vec<String> {
        match config.validate() {
            Err(ConfigError::Validation(errors)) => errors,
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn default_validates_clean() {
        SheetConfig::default().validate().unwrap();
    }

    #[test]
    fn new_opens_at_highest_breakpoint() {
        let config = SheetConfig::new(vec![0.0, 0.25, 0.75]);
        assert_eq!(config.initial_breakpoint, 0.75);
        config.validate().unwrap();
    }

    #[test]
    fn default_constants() {
        let config = SheetConfig::default();
        assert_eq!(config.settle_duration(), Duration::from_millis(500));
        assert_eq!(config.flick_projection_ms, 350.0);
        assert_eq!(config.blocked_max_step, 0.95);
        assert_eq!(config.free_max_step, 0.9999);
        assert_eq!(config.min_step, 0.0001);
        assert_eq!(config.gesture_config().threshold, 10.0);
        assert_eq!(config.easing, Easing::SHEET);
    }

    #[test]
    fn rejects_bad_breakpoints() {
        let config = SheetConfig::new(vec![0.5, 0.25]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Breakpoints(BreakpointError::NotAscending { .. }))
        ));
        let config = SheetConfig::new(vec![]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Breakpoints(BreakpointError::Empty))
        ));
    }

    #[test]
    fn rejects_bad_backdrop() {
        let config = SheetConfig::default().with_backdrop_breakpoint(1.5);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Breakpoints(BreakpointError::InvalidBackdrop { .. }))
        ));
    }

    #[test]
    fn rejects_unknown_initial_breakpoint() {
        let config = SheetConfig::default().with_initial_breakpoint(0.3);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownInitialBreakpoint(v) if v == 0.3));
        assert_eq!(err.to_string(), "initial breakpoint 0.3 is not one of the breakpoints");
    }

    #[test]
    fn collects_step_problems() {
        let config = SheetConfig {
            min_step: 0.0,
            blocked_max_step: 1.2,
            ..SheetConfig::default()
        };
        let errors = validation_messages(&config);
        assert!(errors.iter().any(|e| e.contains("min_step must be in")));
        assert!(errors.iter().any(|e| e.contains("blocked_max_step must be in")));
        assert!(errors.iter().any(|e| e.contains("must not exceed free_max_step")));
    }

    #[test]
    fn rejects_negative_tuning() {
        let config = SheetConfig {
            flick_projection_ms: -1.0,
            drag_threshold_px: f64::NAN,
            backdrop_opacity: 2.0,
            ..SheetConfig::default()
        };
        let errors = validation_messages(&config);
        assert_eq!(errors.len(), 3, "{errors:?}");
    }

    #[test]
    fn validation_error_display_joins() {
        let err = ConfigError::Validation(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "validation errors: a; b");
    }

    #[test]
    fn settle_duration_setter() {
        let config = SheetConfig::default().with_settle_duration(Duration::from_millis(250));
        assert_eq!(config.settle_duration_ms, 250);
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_partial_uses_defaults() {
        let config = SheetConfig::from_toml_str(
            r#"
            breakpoints = [0.0, 0.25, 0.5, 0.75, 1.0]
            initial_breakpoint = 0.25
            backdrop_breakpoint = 0.5
            inherit_safe_area = false
            "#,
        )
        .unwrap();
        assert_eq!(config.breakpoints.len(), 5);
        assert_eq!(config.initial_breakpoint, 0.25);
        assert!(!config.inherit_safe_area);
        assert_eq!(config.settle_duration_ms, 500);
        assert_eq!(config.easing, Easing::SHEET);
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_easing_variants() {
        let config = SheetConfig::from_toml_str(r#"easing = "ease-out""#).unwrap();
        assert_eq!(config.easing, Easing::EaseOut);
    }

    #[cfg(feature = "config")]
    #[test]
    fn toml_rejects_invalid_values() {
        let err = SheetConfig::from_toml_str("breakpoints = [1.0, 0.0]").unwrap_err();
        assert!(matches!(err, ConfigError::Breakpoints(_)));
        let err = SheetConfig::from_toml_str("breakpoints = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_round_trip() {
        let original = SheetConfig::new(vec![0.0, 0.4, 1.0]).with_backdrop_breakpoint(0.4);
        let json = serde_json::to_string(&original).unwrap();
        assert_eq!(SheetConfig::from_json_str(&json).unwrap(), original);
    }

    #[cfg(feature = "config")]
    #[test]
    fn json_parse_error() {
        let err = SheetConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[cfg(feature = "config")]
    #[test]
    fn file_loading() {
        let dir = std::env::temp_dir().join(format!("snapsheet-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("sheet.toml");
        std::fs::write(&path, "initial_breakpoint = 1.0\n").unwrap();
        let config = SheetConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.initial_breakpoint, 1.0);

        let missing = SheetConfig::from_json_file(dir.join("missing.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
