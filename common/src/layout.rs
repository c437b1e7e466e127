//! Static-or-scroll layout decision for the top line.
//!
//! The top line of a service (time and destination) is often wider than a
//! 64px panel. The layout engine measures it with the active font and picks:
//!
//! - [`RenderPlan::Static`]: the text fits (`width <= panel_width`), so it is
//!   drawn at a fixed x position for a fixed duration.
//! - [`RenderPlan::Scroll`]: the text enters just beyond the right edge and
//!   moves left by a fixed step per frame until it has fully left the panel.
//!
//! The bottom line never scrolls; it is always drawn left-anchored.
//!
//! # Scroll Trajectory
//!
//! ```text
//! start_x = panel_width            exit = -text_width
//!   x: 64, 63, 62, ... , -text_width + 1     (step = 1)
//! ```
//!
//! The cursor strictly decreases (step is at least 1), so the animation
//! always terminates after `ceil((start_x + text_width) / step)` frames.

use core::time::Duration;

use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::Point;
use embedded_graphics::text::Baseline;
use embedded_graphics::text::renderer::TextRenderer;

use crate::config::{PANEL_WIDTH, SCROLL_FRAME_DELAY, SCROLL_START_X, SCROLL_STEP, STATIC_DISPLAY_DURATION, TEXT_X};

// =============================================================================
// Settings
// =============================================================================

/// Geometry and pacing the layout engine needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayoutSettings {
    /// Panel width in pixels.
    pub panel_width: u32,
    /// X position for static text.
    pub text_x: i32,
    /// How long static text holds.
    pub static_duration: Duration,
    /// X position where scrolling text enters.
    pub scroll_start_x: i32,
    /// Pixels per scroll frame. Zero is treated as one.
    pub scroll_step: u32,
    /// Delay between scroll frames.
    pub scroll_frame_delay: Duration,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            panel_width: PANEL_WIDTH,
            text_x: TEXT_X,
            static_duration: STATIC_DISPLAY_DURATION,
            scroll_start_x: SCROLL_START_X,
            scroll_step: SCROLL_STEP,
            scroll_frame_delay: SCROLL_FRAME_DELAY,
        }
    }
}

// =============================================================================
// Render Plan
// =============================================================================

/// How the top line of a message is put on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderPlan {
    /// Draw at `x` and hold for `duration`.
    Static { x: i32, duration: Duration },
    /// Animate across the panel.
    Scroll(ScrollState),
}

impl RenderPlan {
    /// Whether this plan scrolls.
    #[inline]
    pub const fn is_scroll(&self) -> bool { matches!(self, Self::Scroll(_)) }
}

/// Transient scroll cursor for one message.
///
/// Iterating yields every x position to draw, starting at the entry position
/// and ending at the last position before the exit offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScrollState {
    x: i32,
    exit: i32,
    step: u32,
    frame_delay: Duration,
}

impl ScrollState {
    /// Create a cursor for text `text_width` pixels wide entering at `start_x`.
    pub fn new(
        start_x: i32,
        text_width: u32,
        step: u32,
        frame_delay: Duration,
    ) -> Self {
        Self {
            x: start_x,
            exit: -(text_width.min(i32::MAX as u32) as i32),
            step: step.max(1),
            frame_delay,
        }
    }

    /// Current x offset.
    #[inline]
    pub const fn x(&self) -> i32 { self.x }

    /// Offset at which the text has fully left the panel.
    #[inline]
    pub const fn exit_offset(&self) -> i32 { self.exit }

    /// Pixels moved per frame.
    #[inline]
    pub const fn step(&self) -> u32 { self.step }

    /// Delay between frames.
    #[inline]
    pub const fn frame_delay(&self) -> Duration { self.frame_delay }

    /// Whether the cursor has reached the exit offset.
    #[inline]
    pub const fn is_finished(&self) -> bool { self.x <= self.exit }

    /// Number of frames left to draw.
    pub fn remaining_steps(&self) -> u32 {
        if self.is_finished() {
            return 0;
        }
        let distance = (i64::from(self.x) - i64::from(self.exit)) as u64;
        distance.div_ceil(u64::from(self.step)).min(u64::from(u32::MAX)) as u32
    }
}

impl Iterator for ScrollState {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        if self.is_finished() {
            return None;
        }
        let current = self.x;
        self.x = self.x.saturating_sub(self.step.min(i32::MAX as u32) as i32);
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining_steps() as usize;
        (n, Some(n))
    }
}

// =============================================================================
// Measurement and Decision
// =============================================================================

/// Pixel width of `text` rendered in `font` (the pen advance).
pub fn measure_text_width<'a>(
    font: &'a MonoFont<'a>,
    text: &str,
) -> u32 {
    let style = MonoTextStyle::new(font, Rgb888::WHITE);
    let metrics = style.measure_string(text, Point::zero(), Baseline::Alphabetic);
    metrics.next_position.x.max(0) as u32
}

/// Decide the plan for text that measures `text_width` pixels.
///
/// Text exactly as wide as the panel is static.
pub fn plan_for_width(
    text_width: u32,
    settings: &LayoutSettings,
) -> RenderPlan {
    if text_width <= settings.panel_width {
        RenderPlan::Static {
            x: settings.text_x,
            duration: settings.static_duration,
        }
    } else {
        RenderPlan::Scroll(ScrollState::new(
            settings.scroll_start_x,
            text_width,
            settings.scroll_step,
            settings.scroll_frame_delay,
        ))
    }
}

/// Measure `text` in `font` and decide its plan.
pub fn plan_layout<'a>(
    text: &str,
    font: &'a MonoFont<'a>,
    settings: &LayoutSettings,
) -> RenderPlan {
    plan_for_width(measure_text_width(font, text), settings)
}

// =============================================================================
// Unit Tests
// =============================================================================
