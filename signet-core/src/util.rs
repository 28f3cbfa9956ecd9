//! Utility types, used throughout the crate.
//! Geometry lives here so that pages, selectors and the compositor all agree on what a rectangle is.

/// A position in some surface's coordinate space. +X right, +Y down.
pub type Point = [f32; 2];

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RectError {
    #[error("rectangle bound is not finite")]
    NotFinite,
    #[error("rectangle minimum exceeds its maximum")]
    Inverted,
}

/// An axis-aligned rectangle.
///
/// Invariant: `min[0] <= max[0]` and `min[1] <= max[1]`. Every constructor upholds this, so
/// consumers never have to care which corner a drag started from.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct Rect {
    min: Point,
    max: Point,
}
impl Rect {
    /// Build the rectangle spanned by two arbitrary corners.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: [a[0].min(b[0]), a[1].min(b[1])],
            max: [a[0].max(b[0]), a[1].max(b[1])],
        }
    }
    /// Build a rectangle from already-normalized bounds, as read back from storage.
    /// Unlike [`Self::from_corners`], this does not silently swap inverted bounds.
    pub fn try_new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Result<Self, RectError> {
        if ![x_min, y_min, x_max, y_max].iter().all(|v| v.is_finite()) {
            return Err(RectError::NotFinite);
        }
        if x_min > x_max || y_min > y_max {
            return Err(RectError::Inverted);
        }
        Ok(Self {
            min: [x_min, y_min],
            max: [x_max, y_max],
        })
    }
    #[must_use]
    pub fn min(&self) -> Point {
        self.min
    }
    #[must_use]
    pub fn max(&self) -> Point {
        self.max
    }
    #[must_use]
    pub fn width(&self) -> f32 {
        self.max[0] - self.min[0]
    }
    #[must_use]
    pub fn height(&self) -> f32 {
        self.max[1] - self.min[1]
    }
    /// True if the rectangle covers no area at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }
    /// `[x_min, y_min, x_max, y_max]`
    #[must_use]
    pub fn bounds(&self) -> [f32; 4] {
        [self.min[0], self.min[1], self.max[0], self.max[1]]
    }
    /// Clip to `bounds`. A rectangle entirely outside of it collapses onto its nearest edge.
    #[must_use = "returns a new rect and does not modify `self`"]
    pub fn clamped(self, bounds: Rect) -> Self {
        let clamp = |p: Point| {
            [
                p[0].clamp(bounds.min[0], bounds.max[0]),
                p[1].clamp(bounds.min[1], bounds.max[1]),
            ]
        };
        Self {
            min: clamp(self.min),
            max: clamp(self.max),
        }
    }
    /// Uniformly scale about the origin. Non-positive factors are not meaningful here.
    #[must_use = "returns a new rect and does not modify `self`"]
    pub fn scaled(self, factor: f32) -> Self {
        Self::from_corners(self.min.map(|v| v * factor), self.max.map(|v| v * factor))
    }
}
