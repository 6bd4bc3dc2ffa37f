//! A particle network canvas that renders to the terminal.
//!
//! Drawing happens on a buffer of RGBA "pixels", 2 per terminal cell, one above the other. When a
//! frame is finished the buffer is converted to a Termwiz surface using the UTF-8 half blocks
//! "▀" and "▄", with the upper pixel as the foreground colour and the lower pixel as the
//! background colour.
//!
//! The particle network works in its own units, which are usually much smaller than a terminal
//! pixel. `pixel_density` is how many of those units fit into a single pixel.

use glam::Vec2;
use palette::blend::Compose as _;
use particle_network::{Canvas, Colour};
use termwiz::surface::Change as TermwizChange;
use termwiz::surface::Position as TermwizPosition;

/// Pixels fainter than this are treated as not having been drawn on at all.
const TRANSPARENT: f32 = 0.01;

/// The longest line, in pixels, that will be stroked.
const MAX_LINE_LENGTH: f32 = 4096.0;

/// The thickest line, in pixels, that will be stroked.
const MAX_LINE_WIDTH: f32 = 64.0;

/// An RGB colour with transparency, every component from 0.0 to 1.0.
pub(crate) type Pixel = palette::Srgba<f32>;

/// An opaque RGB colour, every component from 0.0 to 1.0.
pub(crate) type Opaque = palette::Srgb<f32>;

/// A [`Canvas`] that is rendered as half-block pixels in the user's terminal.
#[derive(Debug, Clone)]
pub(crate) struct TerminalCanvas {
    /// The terminal's columns and rows that the canvas should fill.
    container: (u16, u16),
    /// Width of the pixel buffer
    width: usize,
    /// Height of the pixel buffer, twice the number of rows.
    height: usize,
    /// How many canvas units fit into a single pixel.
    pixel_density: f32,
    /// The colour painted behind everything. When `None` the terminal's own background shows
    /// through.
    backdrop: Option<Opaque>,
    /// Every pixel, row by row.
    pixels: Vec<Pixel>,
}

impl TerminalCanvas {
    /// Instantiate inside a terminal of the given size. Like any other canvas, it is empty until
    /// it is fitted to its container.
    pub fn new(cols: u16, rows: u16, pixel_density: f32) -> Self {
        let mut canvas = Self {
            container: (cols, rows),
            width: 0,
            height: 0,
            pixel_density: 1.0,
            backdrop: None,
            pixels: Vec::new(),
        };
        canvas.set_pixel_density(pixel_density);
        canvas
    }

    /// The user's terminal has changed size.
    pub const fn set_container(&mut self, cols: u16, rows: u16) {
        self.container = (cols, rows);
    }

    /// Change how many canvas units fit into a pixel. Only takes effect for positive values.
    pub fn set_pixel_density(&mut self, pixel_density: f32) {
        if pixel_density.is_finite() && pixel_density > 0.0 {
            self.pixel_density = pixel_density;
        } else {
            tracing::warn!("Ignoring invalid pixel density: {pixel_density}");
        }
    }

    /// Set the colour behind everything, or `None` to use the terminal's own background.
    pub fn set_backdrop(&mut self, maybe_colour: Option<Colour>) {
        self.backdrop = maybe_colour.map(|colour| {
            let (red, green, blue) = colour.components();
            Opaque::new(red, green, blue)
        });
    }

    /// The size of the pixel buffer.
    pub const fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// The pixel at the given pixel coordinates.
    pub fn pixel(&self, x: usize, y: usize) -> Option<Pixel> {
        if x >= self.width {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// Source-over blend a colour on to a single pixel.
    fn blend(&mut self, x: usize, y: usize, colour: Colour, alpha: f32) {
        if x >= self.width || alpha.is_nan() || alpha <= 0.0 {
            return;
        }
        let Some(pixel) = self.pixels.get_mut(y * self.width + x) else {
            return;
        };

        let (red, green, blue) = colour.components();
        let source = Pixel::new(red, green, blue, alpha.clamp(0.0, 1.0));
        *pixel = source.over(*pixel);
    }

    /// Blend the same colour on to every given pixel, but only once each.
    fn blend_all(&mut self, mut coords: Vec<(usize, usize)>, colour: Colour, alpha: f32) {
        coords.sort_unstable();
        coords.dedup();
        for (x, y) in coords {
            self.blend(x, y, colour, alpha);
        }
    }

    /// Convert a position on the canvas to the coordinates of the pixel it lands in.
    fn to_pixel_coords(&self, point: Vec2) -> Option<(usize, usize)> {
        let scaled = point / self.pixel_density;
        Some((
            Self::to_index(scaled.x, self.width)?,
            Self::to_index(scaled.y, self.height)?,
        ))
    }

    /// Safely convert a pixel-space float to an index.
    fn to_index(value: f32, limit: usize) -> Option<usize> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }

        #[expect(
            clippy::as_conversions,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            reason = "We've already checked that it's finite and positive, and floats saturate"
        )]
        let index = value.floor() as usize;
        (index < limit).then_some(index)
    }

    /// Convert a buffer dimension to a float.
    #[expect(
        clippy::as_conversions,
        clippy::cast_precision_loss,
        reason = "Terminals are never big enough to lose precision"
    )]
    const fn as_float(value: usize) -> f32 {
        value as f32
    }

    /// What colour, if any, a pixel should actually be shown as in the terminal.
    fn flatten(&self, maybe_pixel: Option<Pixel>) -> Option<Opaque> {
        let pixel = match maybe_pixel {
            Some(pixel) if pixel.alpha >= TRANSPARENT => pixel,
            _ => return self.backdrop,
        };

        let base = self.backdrop.unwrap_or_else(|| Opaque::new(0.0, 0.0, 0.0));
        Some(pixel.over(Pixel::from(base)).color)
    }

    /// Make a Termwiz colour attribute
    const fn make_colour_attribute(colour: Opaque) -> termwiz::color::ColorAttribute {
        termwiz::color::ColorAttribute::TrueColorWithDefaultFallback(termwiz::color::SrgbaTuple(
            colour.red,
            colour.green,
            colour.blue,
            1.0,
        ))
    }

    /// Make a Termwiz foreground colour
    const fn make_fg_colour(colour: Opaque) -> TermwizChange {
        TermwizChange::Attribute(termwiz::cell::AttributeChange::Foreground(
            Self::make_colour_attribute(colour),
        ))
    }

    /// Make a Termwiz background colour, or the terminal's default background.
    const fn make_bg_colour(maybe_colour: Option<Opaque>) -> TermwizChange {
        let attribute = match maybe_colour {
            Some(colour) => Self::make_colour_attribute(colour),
            None => termwiz::color::ColorAttribute::Default,
        };
        TermwizChange::Attribute(termwiz::cell::AttributeChange::Background(attribute))
    }

    /// Render the pixel buffer as a terminal surface.
    ///
    /// Any pair of colours is rendered with the upper half block. The one exception is a cell
    /// that only has a lower pixel: it's impossible to do that with an upper half block *whilst
    /// retaining the ANSI-coded default background colour*, so the lower half block is used.
    pub fn to_termwiz(&self) -> termwiz::surface::Surface {
        let cols = self.width;
        let rows = self.height / 2;
        let mut surface = termwiz::surface::Surface::new(cols, rows);

        for row in 0..rows {
            for col in 0..cols {
                let upper = self.flatten(self.pixel(col, row * 2));
                let lower = self.flatten(self.pixel(col, row * 2 + 1));

                let (character, foreground, background) = match (upper, lower) {
                    (None, None) => continue,
                    (Some(top), bottom) => ("▀", top, bottom),
                    (None, Some(bottom)) => ("▄", bottom, None),
                };

                surface.add_changes(vec![
                    TermwizChange::CursorPosition {
                        x: TermwizPosition::Absolute(col),
                        y: TermwizPosition::Absolute(row),
                    },
                    Self::make_fg_colour(foreground),
                    Self::make_bg_colour(background),
                ]);
                surface.add_change(character);
            }
        }

        surface
    }
}

impl Canvas for TerminalCanvas {
    fn fit_to_container(&mut self) {
        let (cols, rows) = self.container;
        self.width = cols.into();
        self.height = usize::from(rows) * 2;
        self.pixels = vec![Pixel::new(0.0, 0.0, 0.0, 0.0); self.width * self.height];
    }

    fn size(&self) -> Vec2 {
        Vec2::new(Self::as_float(self.width), Self::as_float(self.height)) * self.pixel_density
    }

    fn clear(&mut self) {
        self.pixels.fill(Pixel::new(0.0, 0.0, 0.0, 0.0));
    }

    fn fill_circle(&mut self, centre: Vec2, radius: f32, colour: Colour, alpha: f32) {
        let mut coords = Vec::new();
        // Particles are often smaller than a pixel, but they should always be seen.
        if let Some(containing) = self.to_pixel_coords(centre) {
            coords.push(containing);
        }

        let scaled_centre = centre / self.pixel_density;
        let scaled_radius = radius.max(0.0) / self.pixel_density;
        let limit = Vec2::new(Self::as_float(self.width), Self::as_float(self.height));
        let from = (scaled_centre - scaled_radius).max(Vec2::ZERO).floor();
        let to = (scaled_centre + scaled_radius).min(limit);

        let mut y = from.y;
        while y <= to.y {
            let mut x = from.x;
            while x <= to.x {
                let pixel_centre = Vec2::new(x + 0.5, y + 0.5);
                if pixel_centre.distance(scaled_centre) <= scaled_radius {
                    if let (Some(col), Some(row)) = (
                        Self::to_index(x, self.width),
                        Self::to_index(y, self.height),
                    ) {
                        coords.push((col, row));
                    }
                }
                x += 1.0;
            }
            y += 1.0;
        }

        self.blend_all(coords, colour, alpha);
    }

    fn stroke_line(&mut self, from: Vec2, to: Vec2, width: f32, colour: Colour, alpha: f32) {
        let start = from / self.pixel_density;
        let end = to / self.pixel_density;
        let delta = end - start;
        let length = delta.abs().max_element().clamp(1.0, MAX_LINE_LENGTH);
        let brush = (width / self.pixel_density).round().clamp(1.0, MAX_LINE_WIDTH);
        let spread = ((brush - 1.0) / 2.0).floor();

        let mut coords = Vec::new();
        let mut step = 0.0;
        while step <= length {
            let point = delta.mul_add(Vec2::splat(step / length), start);
            let mut offset_y = -spread;
            while offset_y < brush - spread {
                let mut offset_x = -spread;
                while offset_x < brush - spread {
                    if let (Some(col), Some(row)) = (
                        Self::to_index(point.x + offset_x, self.width),
                        Self::to_index(point.y + offset_y, self.height),
                    ) {
                        coords.push((col, row));
                    }
                    offset_x += 1.0;
                }
                offset_y += 1.0;
            }
            step += 1.0;
        }

        self.blend_all(coords, colour, alpha);
    }
}

#[cfg(test)]
#[expect(
    clippy::indexing_slicing,
    clippy::shadow_unrelated,
    reason = "Tests aren't so strict"
)]
mod test {
    use super::*;

    const WHITE: Colour = Colour::new(255, 255, 255);
    const RED: Colour = Colour::new(255, 0, 0);

    fn fitted(cols: u16, rows: u16, density: f32) -> TerminalCanvas {
        let mut canvas = TerminalCanvas::new(cols, rows, density);
        canvas.fit_to_container();
        canvas
    }

    fn drawn(canvas: &TerminalCanvas) -> Vec<(usize, usize)> {
        let (width, height) = canvas.dimensions();
        let mut coords = Vec::new();
        for y in 0..height {
            for x in 0..width {
                if canvas.pixel(x, y).is_some_and(|pixel| pixel.alpha > 0.0) {
                    coords.push((x, y));
                }
            }
        }
        coords
    }

    fn colour_attribute(colour: Colour) -> termwiz::color::ColorAttribute {
        let (red, green, blue) = colour.components();
        TerminalCanvas::make_colour_attribute(Opaque::new(red, green, blue))
    }

    #[test]
    fn empty_until_fitted() {
        let mut canvas = TerminalCanvas::new(10, 5, 6.0);
        assert_eq!(canvas.size(), Vec2::ZERO);

        canvas.fit_to_container();
        assert_eq!(canvas.dimensions(), (10, 10));
        assert_eq!(canvas.size(), Vec2::new(60.0, 60.0));

        canvas.set_container(20, 1);
        assert_eq!(canvas.dimensions(), (10, 10));
        canvas.fit_to_container();
        assert_eq!(canvas.size(), Vec2::new(120.0, 12.0));
    }

    #[test]
    fn bad_pixel_densities_are_ignored() {
        let mut canvas = fitted(2, 1, 0.0);
        assert_eq!(canvas.size(), Vec2::new(2.0, 2.0));
        canvas.set_pixel_density(f32::NAN);
        canvas.set_pixel_density(-3.0);
        assert_eq!(canvas.size(), Vec2::new(2.0, 2.0));
        canvas.set_pixel_density(2.0);
        assert_eq!(canvas.size(), Vec2::new(4.0, 4.0));
    }

    #[test]
    fn tiny_circles_still_get_a_pixel() {
        let mut canvas = fitted(5, 2, 6.0);
        canvas.fill_circle(Vec2::new(15.0, 9.0), 0.5, WHITE, 1.0);
        assert_eq!(drawn(&canvas), vec![(2, 1)]);
    }

    #[test]
    fn circles_cover_their_area() {
        let mut canvas = fitted(10, 5, 1.0);
        canvas.fill_circle(Vec2::new(5.0, 5.0), 2.0, WHITE, 1.0);
        let coords = drawn(&canvas);
        assert!(coords.contains(&(5, 5)));
        assert!(coords.contains(&(4, 4)));
        assert!(coords.contains(&(3, 5)));
        assert!(!coords.contains(&(2, 5)));
        assert!(!coords.contains(&(7, 7)));
    }

    #[test]
    fn horizontal_lines() {
        let mut canvas = fitted(10, 2, 2.0);
        canvas.stroke_line(Vec2::new(1.0, 3.0), Vec2::new(9.0, 3.0), 1.0, WHITE, 1.0);
        assert_eq!(
            drawn(&canvas),
            vec![(0, 1), (1, 1), (2, 1), (3, 1), (4, 1)]
        );
    }

    #[test]
    fn thick_lines() {
        let mut canvas = fitted(10, 5, 1.0);
        canvas.stroke_line(Vec2::new(2.0, 5.0), Vec2::new(6.0, 5.0), 3.0, WHITE, 1.0);
        let coords = drawn(&canvas);
        assert_eq!(coords.len(), 7 * 3);
        assert!(coords.contains(&(1, 4)));
        assert!(coords.contains(&(7, 6)));
        assert!(!coords.contains(&(4, 7)));
    }

    #[test]
    fn absurdly_thick_lines_are_capped() {
        let mut canvas = fitted(200, 100, 1.0);
        canvas.stroke_line(Vec2::new(100.0, 100.0), Vec2::new(101.0, 100.0), 1e5, WHITE, 1.0);
        let coords = drawn(&canvas);
        assert_eq!(coords.len(), 65 * 64);
        assert!(coords.contains(&(69, 69)));
        assert!(!coords.contains(&(68, 100)));
    }

    #[test]
    fn lines_blend_each_pixel_once() {
        let mut canvas = fitted(4, 1, 0.25);
        canvas.stroke_line(Vec2::new(0.1, 0.1), Vec2::new(0.2, 0.1), 0.25, WHITE, 0.5);
        let pixel = canvas.pixel(0, 0).unwrap();
        assert!((pixel.alpha - 0.5).abs() < 0.0001);
    }

    #[test]
    fn source_over_blending() {
        let mut canvas = fitted(1, 1, 1.0);
        canvas.fill_circle(Vec2::new(0.5, 0.5), 0.1, WHITE, 0.5);
        canvas.fill_circle(Vec2::new(0.5, 0.5), 0.1, WHITE, 0.5);
        let pixel = canvas.pixel(0, 0).unwrap();
        assert!((pixel.alpha - 0.75).abs() < 0.0001);
        assert!((pixel.red - 1.0).abs() < 0.0001);

        canvas.fill_circle(Vec2::new(0.5, 0.5), 0.1, RED, 1.0);
        let pixel = canvas.pixel(0, 0).unwrap();
        assert!((pixel.alpha - 1.0).abs() < 0.0001);
        assert!(pixel.green.abs() < 0.0001);
    }

    #[test]
    fn drawing_off_the_canvas_is_ignored() {
        let mut canvas = fitted(2, 1, 1.0);
        canvas.fill_circle(Vec2::new(-10.0, -10.0), 1.0, WHITE, 1.0);
        canvas.fill_circle(Vec2::new(100.0, 1.0), 1.0, WHITE, 1.0);
        canvas.stroke_line(Vec2::new(5.0, 5.0), Vec2::new(50.0, 50.0), 1.0, WHITE, 1.0);
        canvas.fill_circle(Vec2::new(f32::NAN, 1.0), 1.0, WHITE, 1.0);
        assert!(drawn(&canvas).is_empty());

        let mut unfitted = TerminalCanvas::new(0, 0, 1.0);
        unfitted.fit_to_container();
        unfitted.fill_circle(Vec2::ZERO, 5.0, WHITE, 1.0);
        unfitted.stroke_line(Vec2::ZERO, Vec2::ONE, 1.0, WHITE, 1.0);
        assert!(drawn(&unfitted).is_empty());
    }

    #[test]
    fn clearing() {
        let mut canvas = fitted(3, 3, 1.0);
        canvas.fill_circle(Vec2::new(1.5, 1.5), 1.0, WHITE, 1.0);
        canvas.clear();
        assert!(drawn(&canvas).is_empty());
        assert_eq!(canvas.dimensions(), (3, 6));
    }

    #[test]
    fn upper_pixels_use_the_upper_half_block() {
        let mut canvas = fitted(2, 1, 1.0);
        canvas.fill_circle(Vec2::new(0.5, 0.5), 0.1, WHITE, 1.0);
        let mut surface = canvas.to_termwiz();
        let cells = surface.screen_cells();

        assert_eq!(cells[0][0].str(), "▀");
        assert_eq!(cells[0][0].attrs().foreground(), colour_attribute(WHITE));
        assert_eq!(
            cells[0][0].attrs().background(),
            termwiz::color::ColorAttribute::Default
        );
        assert_eq!(cells[0][1].str(), " ");
    }

    #[test]
    fn lone_lower_pixels_use_the_lower_half_block() {
        let mut canvas = fitted(1, 1, 1.0);
        canvas.fill_circle(Vec2::new(0.5, 1.5), 0.1, WHITE, 1.0);
        let mut surface = canvas.to_termwiz();
        let cells = surface.screen_cells();

        assert_eq!(cells[0][0].str(), "▄");
        assert_eq!(cells[0][0].attrs().foreground(), colour_attribute(WHITE));
        assert_eq!(
            cells[0][0].attrs().background(),
            termwiz::color::ColorAttribute::Default
        );
    }

    #[test]
    fn full_cells_use_both_colours() {
        let mut canvas = fitted(1, 1, 1.0);
        canvas.fill_circle(Vec2::new(0.5, 1.5), 0.1, WHITE, 1.0);
        canvas.fill_circle(Vec2::new(0.5, 0.5), 0.1, RED, 1.0);
        let mut surface = canvas.to_termwiz();
        let cells = surface.screen_cells();

        assert_eq!(cells[0][0].str(), "▀");
        assert_eq!(cells[0][0].attrs().foreground(), colour_attribute(RED));
        assert_eq!(cells[0][0].attrs().background(), colour_attribute(WHITE));
    }

    #[test]
    fn backdrops_fill_every_cell() {
        let backdrop = Colour::new(248, 250, 252);
        let mut canvas = fitted(2, 2, 1.0);
        canvas.set_backdrop(Some(backdrop));
        canvas.fill_circle(Vec2::new(0.5, 0.5), 0.1, RED, 1.0);
        let mut surface = canvas.to_termwiz();
        let cells = surface.screen_cells();

        assert_eq!(cells[0][0].attrs().foreground(), colour_attribute(RED));
        assert_eq!(cells[0][0].attrs().background(), colour_attribute(backdrop));
        assert_eq!(cells[1][1].str(), "▀");
        assert_eq!(cells[1][1].attrs().foreground(), colour_attribute(backdrop));
        assert_eq!(cells[1][1].attrs().background(), colour_attribute(backdrop));
    }

    #[test]
    fn transparency_is_flattened_against_the_backdrop() {
        let mut canvas = fitted(1, 1, 1.0);
        canvas.set_backdrop(Some(Colour::new(0, 0, 0)));
        canvas.fill_circle(Vec2::new(0.5, 0.5), 0.1, WHITE, 0.5);
        let flattened = canvas.flatten(canvas.pixel(0, 0)).unwrap();
        assert!((flattened.red - 0.5).abs() < 0.0001);
        assert!((flattened.blue - 0.5).abs() < 0.0001);
    }
}
