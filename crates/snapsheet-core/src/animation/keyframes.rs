#![forbid(unsafe_code)]

//! Keyframes and keyframe tracks.
//!
//! A [`KeyframeTrack`] is an ordered list of [`Keyframe`]s, each pinning an
//! animated [`Property`] at an offset in `[0.0, 1.0]`. Sampling a track at a
//! progress value linearly interpolates between the neighbouring keyframes
//! of the requested property kind.
//!
//! # Invariants
//!
//! 1. Keyframes are kept sorted by offset; equal offsets keep insertion order.
//! 2. Offsets are clamped to [0.0, 1.0] on insertion.
//! 3. Sampling before the first keyframe returns the first value; sampling
//!    after the last returns the last value.
//!
//! # Failure Modes
//!
//! - A track with no keyframes of the requested kind samples to `None`.
//! - Non-finite offsets are treated as 0.0.

/// Backdrop-style opacity value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Opacity {
    /// An absolute opacity.
    Fixed(f64),
    /// A multiple of the themed maximum opacity.
    Themed(f64),
}

impl Opacity {
    /// Resolve to an absolute opacity in `[0.0, 1.0]`.
    #[must_use]
    pub fn resolve(self, themed: f64) -> f64 {
        let value = match self {
            Self::Fixed(v) => v,
            Self::Themed(multiplier) => themed * multiplier,
        };
        if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, 1.0)
        }
    }
}

/// An animated property value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Property {
    /// Vertical translation as a percentage of the element's own height.
    TranslateY(f64),
    /// Opacity.
    Opacity(Opacity),
}

/// A property pinned at a timeline offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    /// Position on the timeline, in `[0.0, 1.0]`.
    pub offset: f64,
    /// Value at that position.
    pub property: Property,
}

impl Keyframe {
    /// Create a keyframe.
    #[must_use]
    pub fn new(offset: f64, property: Property) -> Self {
        Self { offset, property }
    }

    /// `translateY(percent%)` at `offset`.
    #[must_use]
    pub fn translate_y(offset: f64, percent: f64) -> Self {
        Self::new(offset, Property::TranslateY(percent))
    }

    /// Opacity at `offset`.
    #[must_use]
    pub fn opacity(offset: f64, opacity: Opacity) -> Self {
        Self::new(offset, Property::Opacity(opacity))
    }
}

/// An ordered set of keyframes for one child animation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyframeTrack {
    frames: Vec<Keyframe>,
}

impl KeyframeTrack {
    /// Build a track, sorting frames by offset.
    #[must_use]
    pub fn new(frames: impl IntoIterator<Item = Keyframe>) -> Self {
        let mut track = Self::default();
        for frame in frames {
            track.push(frame);
        }
        track
    }

    /// Insert a keyframe maintaining sort order by offset.
    pub fn push(&mut self, mut frame: Keyframe) {
        frame.offset = if frame.offset.is_finite() {
            frame.offset.clamp(0.0, 1.0)
        } else {
            0.0
        };
        // Stable: frames at the same offset keep insertion order.
        let pos = self.frames.partition_point(|f| f.offset <= frame.offset);
        self.frames.insert(pos, frame);
    }

    /// The keyframes, sorted by offset.
    #[inline]
    #[must_use]
    pub fn frames(&self) -> &[Keyframe] {
        &self.frames
    }

    /// Whether the track has no keyframes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Sample the translation (percent) at `progress`.
    #[must_use]
    pub fn sample_translate_y(&self, progress: f64) -> Option<f64> {
        self.sample_with(progress, |p| match p {
            Property::TranslateY(v) => Some(v),
            Property::Opacity(_) => None,
        })
    }

    /// Sample the absolute opacity at `progress`.
    #[must_use]
    pub fn sample_opacity(&self, progress: f64, themed: f64) -> Option<f64> {
        self.sample_with(progress, |p| match p {
            Property::Opacity(o) => Some(o.resolve(themed)),
            Property::TranslateY(_) => None,
        })
    }

    fn sample_with(&self, progress: f64, value_of: impl Fn(Property) -> Option<f64>) -> Option<f64> {
        let points: Vec<(f64, f64)> = self
            .frames
            .iter()
            .filter_map(|f| value_of(f.property).map(|v| (f.offset, v)))
            .collect();
        let (first, last) = (points.first()?, points.last()?);
        let p = if progress.is_nan() { 0.0 } else { progress };

        if p <= first.0 {
            return Some(first.1);
        }
        if p >= last.0 {
            return Some(last.1);
        }

        let upper = points.partition_point(|&(offset, _)| offset <= p);
        let (o0, v0) = points[upper - 1];
        let (o1, v1) = points[upper];
        let span = o1 - o0;
        if span <= f64::EPSILON {
            return Some(v1);
        }
        Some(v0 + (v1 - v0) * ((p - o0) / span))
    }
}

impl FromIterator<Keyframe> for KeyframeTrack {
    fn from_iter<I: IntoIterator<Item = Keyframe>>(iter: I) -> Self {
        Self::new(iter)
    }
}
