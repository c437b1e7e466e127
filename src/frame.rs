//! In-memory frame buffers with double buffering.
//!
//! # Architecture
//!
//! - [`Frame`]: Implements `DrawTarget`, one `Rgb888` per panel pixel
//! - [`FrameBuffers`]: Front/back pair; drawing always goes to the back
//!   buffer, and [`FrameBuffers::swap`] is the only way roles change
//!
//! The panel is only ever handed the front buffer, after a swap, so it never
//! observes a partially drawn frame.

use std::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

use departure_board_common::colors::BLACK;

// =============================================================================
// Frame
// =============================================================================

/// Fixed-size pixel buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<Rgb888>,
}

impl Frame {
    /// Create a black frame.
    pub fn new(size: Size) -> Self {
        Self {
            width: size.width,
            height: size.height,
            pixels: vec![BLACK; size.width as usize * size.height as usize],
        }
    }

    /// Fill every pixel with `color`.
    pub fn clear_buffer(
        &mut self,
        color: Rgb888,
    ) {
        self.pixels.fill(color);
    }

    /// Color at `point`, or `None` outside the frame.
    pub fn pixel(
        &self,
        point: Point,
    ) -> Option<Rgb888> {
        self.index(point.x, point.y).map(|idx| self.pixels[idx])
    }

    /// All pixels, row-major.
    #[inline]
    pub fn pixels(&self) -> &[Rgb888] { &self.pixels }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Rgb888]> { self.pixels.chunks(self.width.max(1) as usize) }

    /// Whether every pixel is black.
    pub fn is_blank(&self) -> bool { self.pixels.iter().all(|&p| p == BLACK) }

    /// Number of pixels that are not black.
    pub fn lit_pixels(&self) -> usize { self.pixels.iter().filter(|&&p| p != BLACK).count() }

    #[inline]
    fn index(
        &self,
        x: i32,
        y: i32,
    ) -> Option<usize> {
        if x >= 0 && (x as u32) < self.width && y >= 0 && (y as u32) < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }
}

impl OriginDimensions for Frame {
    fn size(&self) -> Size { Size::new(self.width, self.height) }
}

impl DrawTarget for Frame {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(
        &mut self,
        pixels: I,
    ) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some(idx) = self.index(point.x, point.y) {
                self.pixels[idx] = color;
            }
        }
        Ok(())
    }

    fn fill_solid(
        &mut self,
        area: &Rectangle,
        color: Self::Color,
    ) -> Result<(), Self::Error> {
        let drawable_area = area.intersection(&self.bounding_box());
        if drawable_area.size == Size::zero() {
            return Ok(());
        }

        let x_start = drawable_area.top_left.x as usize;
        let x_end = x_start + drawable_area.size.width as usize;
        for y in drawable_area.rows() {
            let row_start = y as usize * self.width as usize;
            self.pixels[row_start + x_start..row_start + x_end].fill(color);
        }
        Ok(())
    }

    fn clear(
        &mut self,
        color: Self::Color,
    ) -> Result<(), Self::Error> {
        self.clear_buffer(color);
        Ok(())
    }
}

// =============================================================================
// Double Buffer
// =============================================================================

/// Front/back frame pair.
///
/// Tracks which buffer is being drawn to. After drawing completes, call
/// [`swap`](Self::swap) to publish it as the front buffer.
#[derive(Debug)]
pub struct FrameBuffers {
    frames: [Frame; 2],
    /// Index of the buffer currently being drawn to (0 or 1).
    back_idx: usize,
}

impl FrameBuffers {
    /// Create two black frames of `size`.
    pub fn new(size: Size) -> Self {
        Self {
            frames: [Frame::new(size), Frame::new(size)],
            back_idx: 0,
        }
    }

    /// The buffer to draw into.
    #[inline]
    pub fn back_mut(&mut self) -> &mut Frame { &mut self.frames[self.back_idx] }

    /// The buffer currently on display.
    #[inline]
    pub fn front(&self) -> &Frame { &self.frames[1 - self.back_idx] }

    /// Exchange front and back.
    ///
    /// Returns the index of the new back buffer (the next one to draw into).
    #[inline]
    pub fn swap(&mut self) -> usize {
        self.back_idx = 1 - self.back_idx;
        self.back_idx
    }

    /// Current back buffer index.
    #[inline]
    pub const fn back_idx(&self) -> usize { self.back_idx }

    /// Frame size.
    pub fn size(&self) -> Size { self.frames[0].size() }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use embedded_graphics::primitives::PrimitiveStyle;

    use super::*;
    use departure_board_common::colors::{GREEN, RED};

    #[test]
    fn test_new_frame_is_blank() {
        let frame = Frame::new(Size::new(64, 32));
        assert_eq!(frame.pixels().len(), 64 * 32);
        assert!(frame.is_blank());
        assert_eq!(frame.rows().count(), 32);
    }

    #[test]
    fn test_largest_configured_panel_fits() {
        use crate::config::MAX_PANEL_DIMENSION;

        let frame = Frame::new(Size::new(MAX_PANEL_DIMENSION, MAX_PANEL_DIMENSION));
        assert_eq!(frame.pixels().len(), 1024 * 1024);
    }

    #[test]
    fn test_draw_iter_clips_out_of_bounds() {
        let mut frame = Frame::new(Size::new(4, 4));
        frame
            .draw_iter([
                Pixel(Point::new(1, 2), RED),
                Pixel(Point::new(-1, 0), RED),
                Pixel(Point::new(4, 0), RED),
                Pixel(Point::new(0, 9), RED),
            ])
            .ok();
        assert_eq!(frame.pixel(Point::new(1, 2)), Some(RED));
        assert_eq!(frame.lit_pixels(), 1, "off-panel pixels must be dropped");
        assert_eq!(frame.pixel(Point::new(-1, 0)), None);
    }

    #[test]
    fn test_fill_solid_clips_to_frame() {
        let mut frame = Frame::new(Size::new(8, 8));
        Rectangle::new(Point::new(6, 6), Size::new(10, 10))
            .into_styled(PrimitiveStyle::with_fill(GREEN))
            .draw(&mut frame)
            .ok();
        assert_eq!(frame.lit_pixels(), 4);
        assert_eq!(frame.pixel(Point::new(7, 7)), Some(GREEN));
    }

    #[test]
    fn test_clear_resets_every_pixel() {
        let mut frame = Frame::new(Size::new(8, 8));
        frame.clear(RED).ok();
        assert_eq!(frame.lit_pixels(), 64);
        frame.clear(BLACK).ok();
        assert!(frame.is_blank());
    }

    #[test]
    fn test_swap_exchanges_roles() {
        let mut buffers = FrameBuffers::new(Size::new(4, 4));
        assert_eq!(buffers.back_idx(), 0);

        buffers.back_mut().clear(RED).ok();
        assert!(buffers.front().is_blank(), "drawing must not touch the front buffer");

        assert_eq!(buffers.swap(), 1);
        assert_eq!(buffers.front().lit_pixels(), 16, "drawn frame is now displayed");
        assert!(buffers.back_mut().is_blank());

        assert_eq!(buffers.swap(), 0);
    }
}
