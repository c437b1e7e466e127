//! Wall clock overlay.
//!
//! Draws `HH:MM:SS` at a fixed position on every composed frame. The scheduler
//! recomposes at least every 250 ms, so the clock stays current during long
//! holds and while text scrolls underneath it.

use core::fmt::Write;

use chrono::{Local, NaiveTime, Timelike};
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use heapless::String;

use departure_board_common::colors::WHITE;

/// `HH:MM:SS`
pub type ClockText = String<8>;

/// Source of the displayed time.
pub type TimeSource = fn() -> NaiveTime;

/// Local wall-clock time.
pub fn local_time() -> NaiveTime { Local::now().time() }

/// Format as zero-padded 24-hour `HH:MM:SS`.
pub fn format_time(time: NaiveTime) -> ClockText {
    let mut text = ClockText::new();
    // 8 bytes always fit
    let _ = write!(text, "{:02}:{:02}:{:02}", time.hour(), time.minute(), time.second());
    text
}

/// Clock drawn on top of every frame.
#[derive(Clone, Copy, Debug)]
pub struct ClockOverlay {
    position: Point,
    style: MonoTextStyle<'static, Rgb888>,
    time_source: TimeSource,
}

impl ClockOverlay {
    /// Clock at `position` (alphabetic baseline) in `font`, reading local time.
    pub fn new(
        position: Point,
        font: &'static MonoFont<'static>,
    ) -> Self {
        Self {
            position,
            style: MonoTextStyle::new(font, WHITE),
            time_source: local_time,
        }
    }

    /// Replace the time source.
    pub fn with_time_source(
        mut self,
        time_source: TimeSource,
    ) -> Self {
        self.time_source = time_source;
        self
    }

    /// Draw the current time.
    pub fn render<D: DrawTarget<Color = Rgb888>>(
        &self,
        target: &mut D,
    ) {
        self.render_at(target, (self.time_source)());
    }

    /// Draw `time`.
    pub fn render_at<D: DrawTarget<Color = Rgb888>>(
        &self,
        target: &mut D,
        time: NaiveTime,
    ) {
        let text = format_time(time);
        Text::with_baseline(&text, self.position, self.style, Baseline::Alphabetic)
            .draw(target)
            .ok();
    }

    pub const fn position(&self) -> Point { self.position }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use embedded_graphics::mono_font::ascii::FONT_5X8;

    use super::*;
    use crate::frame::Frame;

    fn noon() -> NaiveTime { NaiveTime::from_hms_opt(12, 0, 0).unwrap() }

    #[test]
    fn test_format_is_zero_padded() {
        let t = NaiveTime::from_hms_opt(7, 5, 9).unwrap();
        assert_eq!(format_time(t).as_str(), "07:05:09");
        let t = NaiveTime::from_hms_opt(23, 59, 59).unwrap();
        assert_eq!(format_time(t).as_str(), "23:59:59");
    }

    #[test]
    fn test_leap_second_still_fits() {
        let t = NaiveTime::from_hms_milli_opt(23, 59, 59, 1500).unwrap();
        assert_eq!(format_time(t).len(), 8);
    }

    #[test]
    fn test_renders_above_baseline_only() {
        let clock = ClockOverlay::new(Point::new(12, 8), &FONT_5X8).with_time_source(noon);
        let mut frame = Frame::new(Size::new(64, 32));
        clock.render(&mut frame);

        assert!(frame.lit_pixels() > 0, "clock must draw something");
        for (y, row) in frame.rows().enumerate() {
            if y > 9 {
                assert!(row.iter().all(|&p| p == Rgb888::BLACK), "row {y} should be untouched");
            }
        }
        // 8 glyphs of 5px starting at x=12
        for row in frame.rows() {
            assert!(row[..12].iter().all(|&p| p == Rgb888::BLACK));
            assert!(row[52..].iter().all(|&p| p == Rgb888::BLACK));
        }
    }

    #[test]
    fn test_different_times_draw_differently() {
        let clock = ClockOverlay::new(Point::new(12, 8), &FONT_5X8);
        let mut a = Frame::new(Size::new(64, 32));
        let mut b = Frame::new(Size::new(64, 32));
        clock.render_at(&mut a, noon());
        clock.render_at(&mut b, NaiveTime::from_hms_opt(12, 0, 1).unwrap());
        assert_ne!(a, b);
    }
}
