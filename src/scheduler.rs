//! Frame scheduler: composition, buffer swaps and pacing.
//!
//! The scheduler is the only owner of the frame buffers. Everything else hands
//! it descriptions ([`TextLine`]s and [`RenderPlan`]s) and it turns those into
//! presented frames at the right rate.
//!
//! # Composition
//!
//! ```text
//! clear back buffer -> draw text lines -> draw clock -> swap -> present front
//! ```
//!
//! # Pacing
//!
//! | Plan | Recomposed every | Until |
//! |------|------------------|-------|
//! | `Static` | clock refresh (250 ms) | display duration elapses |
//! | `Scroll` | scroll frame delay (50 ms) | cursor reaches the exit offset, then a short pause |
//!
//! Every wait is a `select!` between a timer and the shutdown token, so a
//! shutdown request interrupts holds and scrolls between two frames.

use std::future::Future;
use std::time::Duration;

use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use log::debug;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use departure_board_common::colors::BLACK;
use departure_board_common::layout::{LayoutSettings, RenderPlan, ScrollState, measure_text_width, plan_for_width};

use crate::clock::ClockOverlay;
use crate::config::BoardConfig;
use crate::error::PanelError;
use crate::frame::FrameBuffers;
use crate::panel::Panel;

// =============================================================================
// Descriptions
// =============================================================================

/// One run of text to draw, positioned by its alphabetic baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextLine<'a> {
    pub text: &'a str,
    pub x: i32,
    pub baseline: i32,
    pub color: Rgb888,
}

impl<'a> TextLine<'a> {
    pub const fn new(
        text: &'a str,
        x: i32,
        baseline: i32,
        color: Rgb888,
    ) -> Self {
        Self {
            text,
            x,
            baseline,
            color,
        }
    }

    /// Same line moved to `x`.
    #[inline]
    pub const fn at(
        self,
        x: i32,
    ) -> Self {
        Self { x, ..self }
    }
}

/// How a timed display ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    /// Ran for its full duration.
    Completed,
    /// Interrupted by shutdown.
    Cancelled,
}

impl Pacing {
    #[inline]
    pub const fn is_cancelled(self) -> bool { matches!(self, Self::Cancelled) }
}

// =============================================================================
// Settings
// =============================================================================

/// Fonts, geometry and timing the scheduler draws with.
#[derive(Clone, Copy, Debug)]
pub struct SchedulerSettings {
    pub font: &'static MonoFont<'static>,
    pub clock: Option<ClockOverlay>,
    pub layout: LayoutSettings,
    pub top_baseline: i32,
    pub bottom_baseline: i32,
    pub clock_refresh: Duration,
    pub scroll_end_pause: Duration,
}

impl SchedulerSettings {
    /// Board settings: train font, clock overlay and configured timing.
    pub fn from_config(config: &BoardConfig) -> Self {
        Self {
            font: config.layout.train_font.font(),
            clock: Some(ClockOverlay::new(config.clock_position(), config.layout.clock_font.font())),
            layout: config.layout_settings(),
            top_baseline: config.layout.top_baseline,
            bottom_baseline: config.layout.bottom_baseline,
            clock_refresh: config.timing.clock_refresh(),
            scroll_end_pause: config.timing.scroll_end_pause(),
        }
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Owns the double buffer and the panel.
pub struct FrameScheduler<P: Panel> {
    panel: P,
    buffers: FrameBuffers,
    settings: SchedulerSettings,
    frames_presented: u64,
}

impl<P: Panel> FrameScheduler<P> {
    pub fn new(
        panel: P,
        settings: SchedulerSettings,
    ) -> Self {
        let buffers = FrameBuffers::new(panel.size());
        Self {
            panel,
            buffers,
            settings,
            frames_presented: 0,
        }
    }

    pub fn settings(&self) -> &SchedulerSettings { &self.settings }

    pub fn panel(&self) -> &P { &self.panel }

    pub const fn frames_presented(&self) -> u64 { self.frames_presented }

    /// Left-anchored top line.
    pub fn top_line<'a>(
        &self,
        text: &'a str,
        color: Rgb888,
    ) -> TextLine<'a> {
        TextLine::new(text, self.settings.layout.text_x, self.settings.top_baseline, color)
    }

    /// Left-anchored bottom line.
    pub fn bottom_line<'a>(
        &self,
        text: &'a str,
        color: Rgb888,
    ) -> TextLine<'a> {
        TextLine::new(text, self.settings.layout.text_x, self.settings.bottom_baseline, color)
    }

    /// Layout decision for `text` in the scheduler's font.
    pub fn plan(
        &self,
        text: &str,
    ) -> RenderPlan {
        let width = measure_text_width(self.settings.font, text);
        let plan = plan_for_width(width, &self.settings.layout);
        debug!("layout: {:?} is {}px, {}", text, width, if plan.is_scroll() { "scroll" } else { "static" });
        plan
    }

    /// Clear the back buffer, draw `lines` then the clock, swap and present.
    ///
    /// Returns the index of the new back buffer.
    pub fn compose_and_swap(
        &mut self,
        lines: &[TextLine<'_>],
    ) -> Result<usize, PanelError> {
        let frame = self.buffers.back_mut();
        frame.clear_buffer(BLACK);
        for line in lines {
            let style = MonoTextStyle::new(self.settings.font, line.color);
            Text::with_baseline(line.text, Point::new(line.x, line.baseline), style, Baseline::Alphabetic)
                .draw(frame)
                .ok();
        }
        if let Some(clock) = &self.settings.clock {
            clock.render(frame);
        }

        let back_idx = self.buffers.swap();
        self.panel.present(self.buffers.front())?;
        self.frames_presented += 1;
        Ok(back_idx)
    }

    /// Show `lines` for `duration`, recomposing at the clock refresh rate.
    pub async fn hold(
        &mut self,
        lines: &[TextLine<'_>],
        duration: Duration,
        cancel: &CancellationToken,
    ) -> Result<Pacing, PanelError> {
        self.hold_until(lines, time::sleep(duration), cancel).await
    }

    /// Show `lines` until `until` resolves, recomposing at the clock refresh rate.
    pub async fn hold_until<F: Future>(
        &mut self,
        lines: &[TextLine<'_>],
        until: F,
        cancel: &CancellationToken,
    ) -> Result<Pacing, PanelError> {
        let mut ticker = time::interval(self.settings.clock_refresh);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(until);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(Pacing::Cancelled),
                _ = &mut until => return Ok(Pacing::Completed),
                _ = ticker.tick() => {
                    self.compose_and_swap(lines)?;
                }
            }
        }
    }

    /// Move `moving` along `cursor`, drawing `fixed` lines unchanged each frame.
    pub async fn scroll(
        &mut self,
        moving: TextLine<'_>,
        fixed: &[TextLine<'_>],
        cursor: ScrollState,
        cancel: &CancellationToken,
    ) -> Result<Pacing, PanelError> {
        let frame_delay = cursor.frame_delay();
        let mut lines = Vec::with_capacity(fixed.len() + 1);
        lines.push(moving);
        lines.extend_from_slice(fixed);

        for x in cursor {
            lines[0] = moving.at(x);
            self.compose_and_swap(&lines)?;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(Pacing::Cancelled),
                _ = time::sleep(frame_delay) => {}
            }
        }
        Ok(Pacing::Completed)
    }

    /// Show a two-line message, scrolling the top line if it does not fit.
    ///
    /// Scrolling is followed by the end pause with only the bottom line shown.
    pub async fn show_message(
        &mut self,
        top: &str,
        bottom: &str,
        color: Rgb888,
        cancel: &CancellationToken,
    ) -> Result<Pacing, PanelError> {
        let top_line = self.top_line(top, color);
        let bottom_line = self.bottom_line(bottom, color);

        match self.plan(top) {
            RenderPlan::Static { x, duration } => self.hold(&[top_line.at(x), bottom_line], duration, cancel).await,
            RenderPlan::Scroll(cursor) => {
                if self.scroll(top_line, &[bottom_line], cursor, cancel).await?.is_cancelled() {
                    return Ok(Pacing::Cancelled);
                }
                let pause = self.settings.scroll_end_pause;
                self.hold(&[bottom_line], pause, cancel).await
            }
        }
    }

    /// Blank both buffers and the panel.
    pub fn blank(&mut self) -> Result<(), PanelError> {
        self.buffers.back_mut().clear_buffer(BLACK);
        self.buffers.swap();
        self.buffers.back_mut().clear_buffer(BLACK);
        self.panel.clear()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
