//! Marquee mode: scroll one message endlessly.
//!
//! Used to check a freshly wired panel. The message enters at the right edge,
//! leaves at the left and immediately re-enters. No clock is drawn.

use std::time::Duration;

use embedded_graphics::mono_font::ascii::FONT_7X13;
use log::info;
use tokio_util::sync::CancellationToken;

use departure_board_common::colors::MARQUEE_YELLOW;
use departure_board_common::layout::{ScrollState, measure_text_width};

use crate::config::BoardConfig;
use crate::error::PanelError;
use crate::panel::Panel;
use crate::scheduler::{FrameScheduler, Pacing, SchedulerSettings, TextLine};

/// Baseline for the 7x13 font, roughly centered on a 32px panel.
pub const MARQUEE_BASELINE: i32 = 18;

/// Delay between marquee frames.
pub const MARQUEE_FRAME_DELAY: Duration = Duration::from_millis(30);

/// Endless scroller for a single line of text.
pub struct Marquee<P: Panel> {
    scheduler: FrameScheduler<P>,
    text: String,
}

impl<P: Panel> Marquee<P> {
    pub fn new(
        panel: P,
        text: impl Into<String>,
        config: &BoardConfig,
    ) -> Self {
        let mut layout = config.layout_settings();
        layout.scroll_frame_delay = MARQUEE_FRAME_DELAY;
        let settings = SchedulerSettings {
            font: &FONT_7X13,
            clock: None,
            layout,
            ..SchedulerSettings::from_config(config)
        };
        Self {
            scheduler: FrameScheduler::new(panel, settings),
            text: text.into(),
        }
    }

    pub fn scheduler(&self) -> &FrameScheduler<P> { &self.scheduler }

    /// Scroll the message across once.
    pub async fn pass(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Pacing, PanelError> {
        let settings = self.scheduler.settings();
        let width = measure_text_width(settings.font, &self.text);
        let cursor = ScrollState::new(
            settings.layout.scroll_start_x,
            width,
            settings.layout.scroll_step,
            settings.layout.scroll_frame_delay,
        );
        let line = TextLine::new(&self.text, cursor.x(), MARQUEE_BASELINE, MARQUEE_YELLOW);
        self.scheduler.scroll(line, &[], cursor, cancel).await
    }

    /// Repeat passes until `cancel` fires, then clear the panel.
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(), PanelError> {
        info!("marquee: {:?}", self.text);
        let result = loop {
            match self.pass(cancel).await {
                Ok(Pacing::Completed) => {}
                Ok(Pacing::Cancelled) => break Ok(()),
                Err(err) => break Err(err),
            }
        };
        let cleared = self.scheduler.blank();
        result.and(cleared)
    }
}
