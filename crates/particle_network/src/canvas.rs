//! The drawing surface that a particle network is rendered on to.

use glam::Vec2;

use crate::config::Colour;

/// Anything that particles and their connections can be drawn on.
///
/// Coordinates are in the surface's own units with `[0, 0]` in the top-left. Colours are always
/// opaque, transparency is passed separately as `alpha`, from 0.0 to 1.0.
pub trait Canvas {
    /// Resize the surface to match the current size of whatever contains it.
    fn fit_to_container(&mut self);

    /// The current width and height of the surface.
    fn size(&self) -> Vec2;

    /// Blank the whole surface.
    fn clear(&mut self);

    /// Draw a filled circle.
    fn fill_circle(&mut self, centre: Vec2, radius: f32, colour: Colour, alpha: f32);

    /// Draw a straight line.
    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, colour: Colour, alpha: f32);
}

/// A single call made on a [`RecordingCanvas`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum DrawCall {
    /// The surface was cleared.
    Clear,
    /// A circle was filled.
    Circle {
        /// Centre of the circle
        centre: Vec2,
        /// Radius of the circle
        radius: f32,
        /// Fill colour
        colour: Colour,
        /// Transparency
        alpha: f32,
    },
    /// A line was stroked.
    Line {
        /// Start of the line
        from: Vec2,
        /// End of the line
        to: Vec2,
        /// Stroke width
        width: f32,
        /// Stroke colour
        colour: Colour,
        /// Transparency
        alpha: f32,
    },
}

/// A canvas that remembers what was drawn on it rather than drawing anything. Handy for headless
/// runs and for testing.
#[derive(Debug, Default, Clone)]
pub struct RecordingCanvas {
    /// The size that [`Canvas::fit_to_container`] will adopt.
    container: Vec2,
    /// The current size of the surface.
    size: Vec2,
    /// Every call made, oldest first.
    calls: Vec<DrawCall>,
}

impl RecordingCanvas {
    /// Instantiate inside a container of the given size. The surface itself starts out empty,
    /// just like a freshly created HTML canvas that hasn't been sized yet.
    #[must_use]
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            container: Vec2::new(width, height),
            size: Vec2::ZERO,
            calls: Vec::new(),
        }
    }

    /// Change the size of the container, as when a window is resized.
    pub const fn set_container(&mut self, width: f32, height: f32) {
        self.container = Vec2::new(width, height);
    }

    /// All the recorded calls, oldest first.
    #[must_use]
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Remove and return all the recorded calls.
    pub fn take_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    /// How many lines have been stroked.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Line { .. }))
            .count()
    }

    /// How many circles have been filled.
    #[must_use]
    pub fn circle_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Circle { .. }))
            .count()
    }
}

impl Canvas for RecordingCanvas {
    fn fit_to_container(&mut self) {
        self.size = self.container;
    }

    fn size(&self) -> Vec2 {
        self.size
    }

    fn clear(&mut self) {
        self.calls.push(DrawCall::Clear);
    }

    fn fill_circle(&mut self, centre: Vec2, radius: f32, colour: Colour, alpha: f32) {
        self.calls.push(DrawCall::Circle {
            centre,
            radius,
            colour,
            alpha,
        });
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, colour: Colour, alpha: f32) {
        self.calls.push(DrawCall::Line {
            from,
            to,
            width,
            colour,
            alpha,
        });
    }
}
