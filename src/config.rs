//! Runtime configuration.
//!
//! [`BoardConfig`] is built once at startup and handed to each component's
//! constructor; nothing reads settings from globals afterwards.
//!
//! # Sources (later wins)
//!
//! 1. Compile-time defaults from [`departure_board_common::config`]
//! 2. Optional TOML file (`--config board.toml`), partial files allowed
//! 3. Command line overrides applied in `main.rs`
//!
//! # Example
//!
//! ```toml
//! services_shown = 3
//!
//! [source]
//! station = "EUS"
//!
//! [panel]
//! brightness = 80
//!
//! [layout]
//! dest_max_chars = 12
//! train_font = "5x8"
//!
//! [timing]
//! static_display_ms = 4000
//! ```

use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use departure_board_common::config as defaults;
use departure_board_common::layout::LayoutSettings;
use embedded_graphics::mono_font::MonoFont;
use embedded_graphics::mono_font::ascii::{FONT_4X6, FONT_5X8, FONT_6X10, FONT_7X13};
use embedded_graphics::prelude::{Point, Size};
use serde::Deserialize;

use crate::error::ConfigError;

/// Huxley2 is a JSON proxy in front of the National Rail Darwin feed.
pub const DEFAULT_BASE_URL: &str = "https://huxley2.azurewebsites.net";

/// Default station CRS code (Newton, South Lanarkshire).
pub const DEFAULT_STATION: &str = "NTN";

/// Largest accepted panel width or height, in pixels.
pub const MAX_PANEL_DIMENSION: u32 = 1024;

// =============================================================================
// Top-level Configuration
// =============================================================================

/// Complete board configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// Services shown per cycle, independent of how many the source returns.
    pub services_shown: usize,
    pub source: SourceConfig,
    pub panel: PanelConfig,
    pub layout: LayoutConfig,
    pub timing: TimingConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            services_shown: defaults::SERVICES_SHOWN,
            source: SourceConfig::default(),
            panel: PanelConfig::default(),
            layout: LayoutConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

/// Departure board data source.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    pub base_url: String,
    /// Three-letter station code.
    pub station: String,
    /// Rows requested from the source.
    pub rows: u32,
    pub timeout_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            station: DEFAULT_STATION.to_string(),
            rows: defaults::ROWS_REQUESTED,
            timeout_ms: millis(defaults::FETCH_TIMEOUT),
        }
    }
}

/// Display device.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PanelConfig {
    pub width: u32,
    pub height: u32,
    /// Brightness in percent (0-100).
    pub brightness: u8,
    pub backend: PanelBackend,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            width: defaults::PANEL_WIDTH,
            height: defaults::PANEL_HEIGHT,
            brightness: defaults::PANEL_BRIGHTNESS,
            backend: PanelBackend::default(),
        }
    }
}

/// Which display device backend to drive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PanelBackend {
    /// Render into the terminal with half-block characters.
    #[default]
    Terminal,
    /// Desktop window (requires the `simulator` feature).
    Simulator,
}

/// Text positions and fonts.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutConfig {
    pub top_baseline: i32,
    pub bottom_baseline: i32,
    pub text_x: i32,
    pub clock_x: i32,
    pub clock_y: i32,
    pub dest_max_chars: usize,
    /// Pixels per scroll frame.
    pub scroll_step: u32,
    pub train_font: FontChoice,
    pub clock_font: FontChoice,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            top_baseline: defaults::TOP_BASELINE,
            bottom_baseline: defaults::BOTTOM_BASELINE,
            text_x: defaults::TEXT_X,
            clock_x: defaults::CLOCK_POSITION.x,
            clock_y: defaults::CLOCK_POSITION.y,
            dest_max_chars: defaults::DEST_MAX_CHARS,
            scroll_step: defaults::SCROLL_STEP,
            train_font: FontChoice::Font4x6,
            clock_font: FontChoice::Font5x8,
        }
    }
}

/// Built-in bitmap fonts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum FontChoice {
    #[serde(rename = "4x6")]
    Font4x6,
    #[serde(rename = "5x8")]
    Font5x8,
    #[serde(rename = "6x10")]
    Font6x10,
    #[serde(rename = "7x13")]
    Font7x13,
}

impl FontChoice {
    /// The font this choice selects.
    pub fn font(self) -> &'static MonoFont<'static> {
        match self {
            Self::Font4x6 => &FONT_4X6,
            Self::Font5x8 => &FONT_5X8,
            Self::Font6x10 => &FONT_6X10,
            Self::Font7x13 => &FONT_7X13,
        }
    }
}

/// Durations, all in milliseconds.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub static_display_ms: u64,
    pub clock_refresh_ms: u64,
    pub scroll_frame_delay_ms: u64,
    pub scroll_end_pause_ms: u64,
    pub error_hold_ms: u64,
    pub empty_hold_ms: u64,
    pub refresh_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            static_display_ms: millis(defaults::STATIC_DISPLAY_DURATION),
            clock_refresh_ms: millis(defaults::CLOCK_REFRESH_INTERVAL),
            scroll_frame_delay_ms: millis(defaults::SCROLL_FRAME_DELAY),
            scroll_end_pause_ms: millis(defaults::SCROLL_END_PAUSE),
            error_hold_ms: millis(defaults::ERROR_HOLD),
            empty_hold_ms: millis(defaults::EMPTY_HOLD),
            refresh_interval_ms: millis(defaults::REFRESH_INTERVAL),
        }
    }
}

impl TimingConfig {
    pub fn static_display(&self) -> Duration { Duration::from_millis(self.static_display_ms) }

    pub fn clock_refresh(&self) -> Duration { Duration::from_millis(self.clock_refresh_ms) }

    pub fn scroll_frame_delay(&self) -> Duration { Duration::from_millis(self.scroll_frame_delay_ms) }

    pub fn scroll_end_pause(&self) -> Duration { Duration::from_millis(self.scroll_end_pause_ms) }

    pub fn error_hold(&self) -> Duration { Duration::from_millis(self.error_hold_ms) }

    pub fn empty_hold(&self) -> Duration { Duration::from_millis(self.empty_hold_ms) }

    pub fn refresh_interval(&self) -> Duration { Duration::from_millis(self.refresh_interval_ms) }
}

fn millis(d: Duration) -> u64 { d.as_millis() as u64 }

// =============================================================================
// Loading and Validation
// =============================================================================

impl BoardConfig {
    /// Load defaults, overlaid with the TOML file at `path` if given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse a (possibly partial) TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> { toml::from_str(text) }

    /// Reject settings the board cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg.to_string())) };

        if self.services_shown == 0 {
            return invalid("services_shown must be at least 1");
        }
        if self.source.station.trim().is_empty() {
            return invalid("source.station must not be empty");
        }
        if self.source.rows == 0 {
            return invalid("source.rows must be at least 1");
        }
        if self.source.timeout_ms == 0 {
            return invalid("source.timeout_ms must be positive");
        }
        if self.panel.width == 0 || self.panel.height == 0 {
            return invalid("panel dimensions must be non-zero");
        }
        if self.panel.width > MAX_PANEL_DIMENSION || self.panel.height > MAX_PANEL_DIMENSION {
            return invalid("panel dimensions must be at most 1024 pixels");
        }
        if self.panel.brightness > 100 {
            return invalid("panel.brightness is a percentage (0-100)");
        }
        if self.layout.scroll_step == 0 {
            return invalid("layout.scroll_step must be at least 1 pixel");
        }
        let t = &self.timing;
        if [
            t.static_display_ms,
            t.clock_refresh_ms,
            t.scroll_frame_delay_ms,
            t.error_hold_ms,
            t.empty_hold_ms,
            t.refresh_interval_ms,
        ]
        .contains(&0)
        {
            return invalid("timing values must be positive (scroll_end_pause_ms may be 0)");
        }
        Ok(())
    }

    /// Endpoint for the configured station.
    pub fn departures_url(&self) -> String {
        format!(
            "{}/departures/{}/{}",
            self.source.base_url.trim_end_matches('/'),
            self.source.station,
            self.source.rows
        )
    }

    pub fn fetch_timeout(&self) -> Duration { Duration::from_millis(self.source.timeout_ms) }

    pub fn panel_size(&self) -> Size { Size::new(self.panel.width, self.panel.height) }

    pub fn clock_position(&self) -> Point { Point::new(self.layout.clock_x, self.layout.clock_y) }

    /// Settings for the layout engine.
    pub fn layout_settings(&self) -> LayoutSettings {
        LayoutSettings {
            panel_width: self.panel.width,
            text_x: self.layout.text_x,
            static_duration: self.timing.static_display(),
            scroll_start_x: self.panel.width as i32,
            scroll_step: self.layout.scroll_step,
            scroll_frame_delay: self.timing.scroll_frame_delay(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
