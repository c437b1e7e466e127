//! Panel geometry and timing defaults.
//!
//! These are the compile-time defaults the runtime configuration starts from.
//! Positions are pre-computed as `i32` so drawing code needs no casts.

use core::time::Duration;

use embedded_graphics::prelude::Point;

// =============================================================================
// Panel Configuration
// =============================================================================

/// Panel width in pixels (single 64x32 HUB75 panel).
pub const PANEL_WIDTH: u32 = 64;

/// Panel height in pixels.
pub const PANEL_HEIGHT: u32 = 32;

/// Default panel brightness in percent.
pub const PANEL_BRIGHTNESS: u8 = 60;

// =============================================================================
// Text Layout
// =============================================================================

/// Baseline of the top (scrolling) line.
pub const TOP_BASELINE: i32 = 16;

/// Baseline of the bottom (status) line.
pub const BOTTOM_BASELINE: i32 = 28;

/// Left margin for static text.
pub const TEXT_X: i32 = 1;

/// Clock baseline position (HH:MM:SS in the 5x8 font spans 40px).
pub const CLOCK_POSITION: Point = Point::new(12, 8);

/// Scroll entry position, just beyond the right edge.
pub const SCROLL_START_X: i32 = PANEL_WIDTH as i32;

/// Pixels the scroll cursor advances per frame.
pub const SCROLL_STEP: u32 = 1;

/// Destination names longer than this are trimmed.
pub const DEST_MAX_CHARS: usize = 32;

/// Appended to a trimmed destination. The panel fonts are ASCII only.
pub const TRUNCATION_MARKER: char = '~';

// =============================================================================
// Board Behaviour
// =============================================================================

/// Number of services shown per cycle, regardless of how many were fetched.
pub const SERVICES_SHOWN: usize = 2;

/// Number of rows requested from the departure board.
pub const ROWS_REQUESTED: u32 = 10;

// =============================================================================
// Timing Configuration
// =============================================================================

/// How long a message that fits the panel stays on screen.
pub const STATIC_DISPLAY_DURATION: Duration = Duration::from_secs(5);

/// Re-composition interval while a frame holds (keeps the clock ticking).
pub const CLOCK_REFRESH_INTERVAL: Duration = Duration::from_millis(250);

/// Delay between scroll steps (~20 FPS).
pub const SCROLL_FRAME_DELAY: Duration = Duration::from_millis(50);

/// Pause after a scroll completes, before the next message.
pub const SCROLL_END_PAUSE: Duration = Duration::from_millis(500);

/// Hold time for the fetch error screen.
pub const ERROR_HOLD: Duration = Duration::from_secs(5);

/// Hold time for the empty board screen.
pub const EMPTY_HOLD: Duration = Duration::from_secs(10);

/// Upper bound on one departure board request.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay before re-polling after a successful fetch.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(10);
