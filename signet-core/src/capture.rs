//! # Mark capture
//!
//! Records free-hand strokes on a fixed-size canvas and turns them into a [`MarkImage`]: the ink,
//! cropped to its bounding box, on a fully transparent background.
//!
//! The pen is hard-edged. A pixel is either untouched (transparent) or fully covered with the pen
//! color, so the cropped mark never carries fringe from a background color.

use image::{imageops, Rgba, RgbaImage};
use smallvec::SmallVec;

use crate::{input::PointerEvent, util::Point};

/// Pointer travel, in display units of Manhattan distance, below which a new point is treated as jitter.
pub const MOVEMENT_THRESHOLD: f32 = 3.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureSettings {
    /// Size of the capture canvas, in pixels. Ink outside of it is clipped.
    pub canvas_size: [u32; 2],
    /// Pen diameter, in pixels.
    pub pen_width: f32,
    pub pen_color: Rgba<u8>,
    pub movement_threshold: f32,
}
impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            canvas_size: [600, 200],
            pen_width: 3.0,
            pen_color: Rgba([0, 0, 0, 255]),
            movement_threshold: MOVEMENT_THRESHOLD,
        }
    }
}

/// Points recorded during one continuous drag.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Stroke {
    // Most signature strokes are short.
    points: SmallVec<[Point; 32]>,
}
impl Stroke {
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }
    #[must_use]
    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }
}

/// Rendered ink of one capture session. May be empty, in which case it places nothing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkImage {
    image: RgbaImage,
}
impl MarkImage {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
    /// Use an existing image as a mark, such as one saved from an earlier session.
    #[must_use]
    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }
    #[must_use]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
    /// True if there is nothing visible to place.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0
            || self.image.height() == 0
            || self.image.pixels().all(|pixel| pixel.0[3] == 0)
    }
}

/// Inclusive pixel bounds `[x_min, y_min, x_max, y_max]`.
type PixelBounds = [u32; 4];

pub struct MarkCapture {
    settings: CaptureSettings,
    strokes: Vec<Stroke>,
    in_progress: Option<Stroke>,
    canvas: RgbaImage,
    ink_bounds: Option<PixelBounds>,
}
impl MarkCapture {
    #[must_use]
    pub fn new(settings: CaptureSettings) -> Self {
        let [width, height] = settings.canvas_size;
        Self {
            settings,
            strokes: Vec::new(),
            in_progress: None,
            canvas: RgbaImage::new(width, height),
            ink_bounds: None,
        }
    }
    /// Finished strokes. A stroke that never moved past the threshold left no ink and isn't kept.
    #[must_use]
    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }
    /// The capture canvas with all ink so far.
    #[must_use]
    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }
    /// Pen down. Starts a new stroke, finishing any stroke left open.
    pub fn press(&mut self, point: Point) {
        self.release();
        let mut stroke = Stroke::default();
        stroke.points.push(point);
        self.in_progress = Some(stroke);
    }
    /// Pen moved. Extends the open stroke, unless the movement is within the jitter threshold.
    pub fn drag(&mut self, point: Point) {
        let Some(last) = self.in_progress.as_ref().and_then(Stroke::last) else {
            return;
        };
        let travel = (point[0] - last[0]).abs() + (point[1] - last[1]).abs();
        if travel <= self.settings.movement_threshold {
            return;
        }
        self.draw_segment(last, point);
        if let Some(stroke) = self.in_progress.as_mut() {
            stroke.points.push(point);
        }
    }
    /// Pen up. Ends the open stroke.
    pub fn release(&mut self) {
        if let Some(stroke) = self.in_progress.take() {
            if stroke.points.len() > 1 {
                self.strokes.push(stroke);
            }
        }
    }
    pub fn process(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Press(pos) => self.press(pos),
            PointerEvent::Move(pos) => self.drag(pos),
            PointerEvent::Release(_) => self.release(),
        }
    }
    /// Wipe all strokes and ink. The session stays open.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.in_progress = None;
        self.ink_bounds = None;
        for pixel in self.canvas.pixels_mut() {
            *pixel = Rgba([0; 4]);
        }
    }
    /// Crop the ink into a mark. Zero strokes gives an empty mark.
    #[must_use]
    pub fn confirm(&self) -> MarkImage {
        let Some([x_min, y_min, x_max, y_max]) = self.ink_bounds else {
            return MarkImage::empty();
        };
        let cropped = imageops::crop_imm(
            &self.canvas,
            x_min,
            y_min,
            x_max - x_min + 1,
            y_max - y_min + 1,
        )
        .to_image();
        MarkImage::from_image(cropped)
    }
    /// Ink every pixel whose center lies within half a pen width of segment `a`-`b`.
    fn draw_segment(&mut self, a: Point, b: Point) {
        let (width, height) = self.canvas.dimensions();
        if width == 0 || height == 0 {
            return;
        }
        let radius = self.settings.pen_width / 2.0;
        let clamp = |v: f32, len: u32| v.max(0.0).min((len - 1) as f32) as u32;
        let x_range = clamp((a[0].min(b[0]) - radius).floor(), width)
            ..=clamp((a[0].max(b[0]) + radius).ceil(), width);
        let y_range = clamp((a[1].min(b[1]) - radius).floor(), height)
            ..=clamp((a[1].max(b[1]) + radius).ceil(), height);

        for y in y_range {
            for x in x_range.clone() {
                let center = [x as f32 + 0.5, y as f32 + 0.5];
                if distance_to_segment(center, a, b) <= radius {
                    self.canvas.put_pixel(x, y, self.settings.pen_color);
                    self.ink_bounds = Some(match self.ink_bounds {
                        None => [x, y, x, y],
                        Some([x0, y0, x1, y1]) => [x0.min(x), y0.min(y), x1.max(x), y1.max(y)],
                    });
                }
            }
        }
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let ab = [b[0] - a[0], b[1] - a[1]];
    let ap = [p[0] - a[0], p[1] - a[1]];
    let len_sq = ab[0] * ab[0] + ab[1] * ab[1];
    let t = if len_sq > 0.0 {
        ((ap[0] * ab[0] + ap[1] * ab[1]) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = [a[0] + ab[0] * t, a[1] + ab[1] * t];
    (p[0] - closest[0]).hypot(p[1] - closest[1])
}
