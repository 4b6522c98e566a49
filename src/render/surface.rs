//! Raster surface - owned RGBA framebuffer with a logical/physical split
//!
//! The surface keeps two sizes: a *logical* size (layout units, what the
//! host measures panels in) and a *physical* size (actual pixels, logical
//! size times the device pixel ratio). All drawing is done in logical
//! coordinates; the surface scales them by the ratio when rasterizing so
//! output stays sharp on high-density displays.
//!
//! ## Invariant
//!
//! After every mutation (construction, resize, rescale):
//! `physical == round(logical * scale_factor)` and every draw call maps
//! logical coordinates through the same factor.

use std::sync::{Arc, Mutex};

/// An RGBA color, 8 bits per channel.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Opaque color from RGB components.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Color from RGBA components.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Same color with a different alpha.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }
}

/// Smallest accepted device pixel ratio.
const MIN_SCALE: f32 = 0.25;
/// Largest accepted device pixel ratio.
const MAX_SCALE: f32 = 8.0;
/// Upper bound on logical extent, to keep physical allocations sane.
const MAX_LOGICAL: f32 = 16384.0;

/// Clamp a device pixel ratio to a usable range.
///
/// Non-finite, zero, or negative input falls back to 1.0 (the contract
/// when the host cannot report a ratio).
pub fn normalized_scale(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value.clamp(MIN_SCALE, MAX_SCALE)
    } else {
        1.0
    }
}

/// Clamp a logical extent to `[0, MAX_LOGICAL]`, mapping garbage to 0.
fn normalized_extent(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value.min(MAX_LOGICAL)
    } else {
        0.0
    }
}

/// A surface shared between the renderer (which draws) and the host
/// shell (which presents the pixels).
pub type SharedSurface = Arc<Mutex<Surface>>;

/// Owned RGBA8 framebuffer, drawn in logical coordinates.
pub struct Surface {
    logical_w: f32,
    logical_h: f32,
    scale: f32,
    phys_w: u32,
    phys_h: u32,
    pixels: Vec<u8>,
}

impl Surface {
    /// Create a surface with the given logical size and device pixel
    /// ratio. The physical buffer is allocated immediately.
    pub fn new(logical_w: f32, logical_h: f32, scale_factor: f32) -> Self {
        let mut surface = Self {
            logical_w: 0.0,
            logical_h: 0.0,
            scale: normalized_scale(scale_factor),
            phys_w: 0,
            phys_h: 0,
            pixels: Vec::new(),
        };
        surface.set_logical_size(logical_w, logical_h);
        surface
    }

    /// Wrap a new surface in the shared handle used across the crate.
    pub fn shared(logical_w: f32, logical_h: f32, scale_factor: f32) -> SharedSurface {
        Arc::new(Mutex::new(Self::new(logical_w, logical_h, scale_factor)))
    }

    /// Logical size in layout units.
    pub fn logical_size(&self) -> (f32, f32) {
        (self.logical_w, self.logical_h)
    }

    /// Physical size in pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        (self.phys_w, self.phys_h)
    }

    /// Current device pixel ratio.
    pub fn scale_factor(&self) -> f32 {
        self.scale
    }

    /// Raw RGBA bytes, row-major, `physical_width * physical_height * 4`.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Change the logical size and recompute the physical buffer.
    ///
    /// No-op when the sanitized size matches the current one, so hosts
    /// can call this every layout pass without churn.
    pub fn set_logical_size(&mut self, logical_w: f32, logical_h: f32) {
        let w = normalized_extent(logical_w);
        let h = normalized_extent(logical_h);
        if w == self.logical_w && h == self.logical_h && !self.pixels.is_empty() {
            return;
        }
        self.logical_w = w;
        self.logical_h = h;
        self.reallocate();
    }

    /// Change the device pixel ratio and recompute the physical buffer.
    pub fn rescale(&mut self, scale_factor: f32) {
        let scale = normalized_scale(scale_factor);
        if scale == self.scale && !self.pixels.is_empty() {
            return;
        }
        self.scale = scale;
        self.reallocate();
    }

    fn reallocate(&mut self) {
        self.phys_w = (self.logical_w * self.scale).round() as u32;
        self.phys_h = (self.logical_h * self.scale).round() as u32;
        let len = self.phys_w as usize * self.phys_h as usize * 4;
        self.pixels.clear();
        self.pixels.resize(len, 0);
    }

    /// Paint every pixel with `color`. Full overwrite, no blending:
    /// this is what guarantees the previous frame never ghosts through.
    pub fn fill(&mut self, color: Color) {
        for px in self.pixels.chunks_exact_mut(4) {
            px[0] = color.r;
            px[1] = color.g;
            px[2] = color.b;
            px[3] = color.a;
        }
    }

    /// Read one physical pixel, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.phys_w || y >= self.phys_h {
            return None;
        }
        let idx = (y as usize * self.phys_w as usize + x as usize) * 4;
        Some(Color::rgba(
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ))
    }

    /// Write one physical pixel, blending src-over when the color is
    /// translucent. Out-of-bounds coordinates are clipped silently.
    fn blend_pixel(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x >= i64::from(self.phys_w) || y >= i64::from(self.phys_h) {
            return;
        }
        let idx = (y as usize * self.phys_w as usize + x as usize) * 4;
        if color.a == 255 {
            self.pixels[idx] = color.r;
            self.pixels[idx + 1] = color.g;
            self.pixels[idx + 2] = color.b;
            self.pixels[idx + 3] = 255;
            return;
        }
        if color.a == 0 {
            return;
        }
        let a = u32::from(color.a);
        let na = 255 - a;
        let blend = |src: u8, dst: u8| -> u8 {
            ((u32::from(src) * a + u32::from(dst) * na + 127) / 255) as u8
        };
        self.pixels[idx] = blend(color.r, self.pixels[idx]);
        self.pixels[idx + 1] = blend(color.g, self.pixels[idx + 1]);
        self.pixels[idx + 2] = blend(color.b, self.pixels[idx + 2]);
        let dst_a = u32::from(self.pixels[idx + 3]);
        self.pixels[idx + 3] = (a + (dst_a * na + 127) / 255).min(255) as u8;
    }

    /// Stroke a line between two logical points.
    ///
    /// Coordinates are scaled by the device pixel ratio and rasterized
    /// with Bresenham's algorithm; `width` is a logical thickness that
    /// scales the same way. Endpoints are inclusive. Segments partially
    /// or fully outside the surface are clipped per pixel.
    pub fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), color: Color, width: f32) {
        if self.phys_w == 0 || self.phys_h == 0 {
            return;
        }
        let scale = self.scale;
        let to_phys = |v: f32| -> i64 { (v * scale).round() as i64 };

        let mut x0 = to_phys(from.0);
        let mut y0 = to_phys(from.1);
        let x1 = to_phys(to.0);
        let y1 = to_phys(to.1);

        let thickness = ((width * scale).round() as i64).max(1);
        // Square stamp offsets around the line pixel; a 2px stamp leans
        // down-right like most integer rasterizers.
        let lo = -((thickness - 1) / 2);
        let hi = thickness / 2;

        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            for oy in lo..=hi {
                for ox in lo..=hi {
                    self.blend_pixel(x0 + ox, y0 + oy, color);
                }
            }
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_size_tracks_logical_times_scale() {
        let surface = Surface::new(100.0, 50.0, 2.0);
        assert_eq!(surface.physical_size(), (200, 100));
        assert_eq!(surface.logical_size(), (100.0, 50.0));
        assert_eq!(surface.scale_factor(), 2.0);
    }

    #[test]
    fn resize_and_rescale_keep_invariant() {
        let mut surface = Surface::new(10.0, 10.0, 1.0);

        surface.set_logical_size(64.0, 32.0);
        assert_eq!(surface.physical_size(), (64, 32));

        surface.rescale(1.5);
        assert_eq!(surface.physical_size(), (96, 48));
        assert_eq!(surface.pixels().len(), 96 * 48 * 4);
    }

    #[test]
    fn garbage_scale_falls_back_to_one() {
        assert_eq!(normalized_scale(f32::NAN), 1.0);
        assert_eq!(normalized_scale(0.0), 1.0);
        assert_eq!(normalized_scale(-2.0), 1.0);
        assert_eq!(normalized_scale(100.0), MAX_SCALE);

        let surface = Surface::new(10.0, 10.0, f32::INFINITY);
        assert_eq!(surface.scale_factor(), 1.0);
    }

    #[test]
    fn garbage_logical_size_collapses_to_zero() {
        let surface = Surface::new(f32::NAN, -5.0, 1.0);
        assert_eq!(surface.logical_size(), (0.0, 0.0));
        assert_eq!(surface.physical_size(), (0, 0));
        assert!(surface.pixels().is_empty());
    }

    #[test]
    fn fill_overwrites_every_pixel() {
        let mut surface = Surface::new(4.0, 4.0, 1.0);
        surface.fill(Color::rgb(10, 20, 30));
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(surface.pixel(x, y), Some(Color::rgb(10, 20, 30)));
            }
        }
    }

    #[test]
    fn stroke_line_horizontal_is_inclusive() {
        let mut surface = Surface::new(8.0, 4.0, 1.0);
        surface.fill(Color::rgb(0, 0, 0));
        surface.stroke_line((1.0, 2.0), (6.0, 2.0), Color::rgb(255, 0, 0), 1.0);

        for x in 1..=6 {
            assert_eq!(surface.pixel(x, 2), Some(Color::rgb(255, 0, 0)));
        }
        assert_eq!(surface.pixel(0, 2), Some(Color::rgb(0, 0, 0)));
        assert_eq!(surface.pixel(7, 2), Some(Color::rgb(0, 0, 0)));
    }

    #[test]
    fn stroke_line_scales_with_ratio() {
        let mut surface = Surface::new(8.0, 8.0, 2.0);
        surface.fill(Color::rgb(0, 0, 0));
        // A point at logical (2, 2) lands at physical (4, 4).
        surface.stroke_line((2.0, 2.0), (2.0, 2.0), Color::rgb(0, 255, 0), 0.5);
        assert_eq!(surface.pixel(4, 4), Some(Color::rgb(0, 255, 0)));
        assert_eq!(surface.pixel(2, 2), Some(Color::rgb(0, 0, 0)));
    }

    #[test]
    fn stroke_line_clips_out_of_bounds() {
        let mut surface = Surface::new(4.0, 4.0, 1.0);
        surface.stroke_line((-10.0, -10.0), (10.0, 10.0), Color::rgb(1, 2, 3), 1.0);
        // Diagonal passes through the buffer without panicking.
        assert_eq!(surface.pixel(1, 1), Some(Color::rgb(1, 2, 3)));
    }

    #[test]
    fn zero_sized_surface_ignores_strokes() {
        let mut surface = Surface::new(0.0, 0.0, 1.0);
        surface.stroke_line((0.0, 0.0), (5.0, 5.0), Color::rgb(9, 9, 9), 2.0);
        assert!(surface.pixels().is_empty());
    }

    #[test]
    fn translucent_stroke_blends_over_background() {
        let mut surface = Surface::new(2.0, 2.0, 1.0);
        surface.fill(Color::rgb(0, 0, 0));
        surface.stroke_line((0.0, 0.0), (0.0, 0.0), Color::rgba(255, 255, 255, 128), 1.0);

        let px = surface.pixel(0, 0).unwrap();
        // Roughly half-mixed toward white.
        assert!(px.r > 120 && px.r < 136, "got {px:?}");
        assert_eq!(px.a, 255);
    }

    #[test]
    fn opaque_stroke_replaces_pixel() {
        let mut surface = Surface::new(2.0, 2.0, 1.0);
        surface.fill(Color::rgb(50, 50, 50));
        surface.stroke_line((1.0, 1.0), (1.0, 1.0), Color::rgb(200, 100, 0), 1.0);
        assert_eq!(surface.pixel(1, 1), Some(Color::rgb(200, 100, 0)));
    }

    #[test]
    fn wide_stroke_stamps_neighbors() {
        let mut surface = Surface::new(8.0, 8.0, 1.0);
        surface.fill(Color::rgb(0, 0, 0));
        surface.stroke_line((4.0, 4.0), (4.0, 4.0), Color::rgb(255, 255, 255), 2.0);

        // 2px stamp covers the pixel and its down-right neighbors.
        assert_eq!(surface.pixel(4, 4), Some(Color::rgb(255, 255, 255)));
        assert_eq!(surface.pixel(5, 4), Some(Color::rgb(255, 255, 255)));
        assert_eq!(surface.pixel(4, 5), Some(Color::rgb(255, 255, 255)));
        assert_eq!(surface.pixel(5, 5), Some(Color::rgb(255, 255, 255)));
        assert_eq!(surface.pixel(3, 3), Some(Color::rgb(0, 0, 0)));
    }

    #[test]
    fn resize_to_same_size_is_noop() {
        let mut surface = Surface::new(10.0, 10.0, 1.0);
        surface.fill(Color::rgb(7, 7, 7));
        surface.set_logical_size(10.0, 10.0);
        // Buffer contents survive a no-op resize.
        assert_eq!(surface.pixel(5, 5), Some(Color::rgb(7, 7, 7)));
    }
}
