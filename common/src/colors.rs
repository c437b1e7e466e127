//! Color constants for the departure board.
//!
//! LED matrix panels drive red, green and blue independently at 8 bits each,
//! so the board works in `Rgb888` end to end. Brightness scaling happens at
//! presentation time, never in these constants.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

use crate::status::ServiceStatus;

// =============================================================================
// Standard Colors (from RgbColor trait)
// =============================================================================

/// Pure black. Cleared pixels.
pub const BLACK: Rgb888 = Rgb888::BLACK;

/// Pure white. Clock text and services with no estimate.
pub const WHITE: Rgb888 = Rgb888::WHITE;

/// Pure red. Cancelled services and fetch errors.
pub const RED: Rgb888 = Rgb888::RED;

/// Pure green. Services running on time.
pub const GREEN: Rgb888 = Rgb888::GREEN;

// =============================================================================
// Custom Colors
// =============================================================================

/// Amber (255, 165, 0). Delayed services and the "no data" screen.
pub const AMBER: Rgb888 = Rgb888::new(255, 165, 0);

/// Yellow used by the marquee test pattern.
pub const MARQUEE_YELLOW: Rgb888 = Rgb888::new(255, 255, 0);

// =============================================================================
// Semantic Colors
// =============================================================================

/// Alert color for the fetch error screen.
pub const ALERT: Rgb888 = RED;

/// Warning color for the empty board screen.
pub const WARNING: Rgb888 = AMBER;

/// Neutral color for the loading screen and the clock.
pub const NEUTRAL: Rgb888 = WHITE;

/// Map a service status to its display color.
pub const fn status_color(status: ServiceStatus) -> Rgb888 {
    match status {
        ServiceStatus::OnTime => GREEN,
        ServiceStatus::Delayed => AMBER,
        ServiceStatus::Cancelled => RED,
        ServiceStatus::Unknown => NEUTRAL,
    }
}
