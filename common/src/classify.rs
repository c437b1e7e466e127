//! Service classification.
//!
//! Turns one raw departure record into the two lines of text the panel shows
//! and a [`ServiceStatus`] that picks the color.
//!
//! # Status Priority
//!
//! The first matching rule wins, and the order matters: a cancelled service
//! keeps its last estimate, and a service with no estimate must not be
//! reported as on time.
//!
//! | # | Condition | Status | Bottom line |
//! |---|-----------|--------|-------------|
//! | 1 | cancelled flag set | `Cancelled` | `P{plat} CANCELLED` |
//! | 2 | estimate empty | `Unknown` | `P{plat} Check ETD` |
//! | 3 | estimate is `On time` or equals the scheduled time | `OnTime` | `P{plat} On time` |
//! | 4 | anything else | `Delayed` | `P{plat} Delayed` |
//!
//! The top line is `"{std} {dest}"`, except for delayed services where it
//! becomes `"{std}->{etd} {dest}"` so the new time is visible.
//!
//! # Malformed Records
//!
//! Missing fields are defaulted rather than rejected, so a record with no
//! fields at all still produces a complete (if uninformative) message.

use heapless::String;

use crate::config::TRUNCATION_MARKER;
use crate::status::ServiceStatus;

// =============================================================================
// Field Defaults
// =============================================================================

/// Shown when the scheduled time is missing.
pub const MISSING_SCHEDULED: &str = "??:??";

/// Shown when the destination is missing.
pub const MISSING_DESTINATION: &str = "Unknown";

/// Shown when the platform is missing or blank.
pub const MISSING_PLATFORM: &str = "?";

/// Literal estimate the data source uses for services running to schedule.
pub const ON_TIME_MARKER: &str = "On time";

/// Byte capacity of one display line.
pub const LINE_CAPACITY: usize = 96;

/// One line of display text.
pub type Line = String<LINE_CAPACITY>;

// =============================================================================
// Input and Output Types
// =============================================================================

/// Borrowed view of one departure record, with every field optional.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct ServiceFields<'a> {
    /// Scheduled departure time (`"HH:MM"`).
    pub scheduled: Option<&'a str>,
    /// Estimated departure time, `"On time"`, or another marker.
    pub estimated: Option<&'a str>,
    /// Destination station name.
    pub destination: Option<&'a str>,
    /// Platform number or letter.
    pub platform: Option<&'a str>,
    /// Whether the service is cancelled.
    pub cancelled: bool,
}

/// Two lines of text plus status for one service.
///
/// Immutable once produced: fields are only readable through accessors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayMessage {
    top: Line,
    bottom: Line,
    status: ServiceStatus,
}

impl DisplayMessage {
    /// Top line (time and destination). May be wider than the panel.
    #[inline]
    pub fn top(&self) -> &str { self.top.as_str() }

    /// Bottom line (platform and status). Always left-anchored.
    #[inline]
    pub fn bottom(&self) -> &str { self.bottom.as_str() }

    /// Status category.
    #[inline]
    pub const fn status(&self) -> ServiceStatus { self.status }
}

// =============================================================================
// Classification
// =============================================================================

/// Classify one record into a [`DisplayMessage`].
///
/// `dest_max_chars` bounds the destination before it is placed on the top line.
pub fn classify(
    fields: &ServiceFields<'_>,
    dest_max_chars: usize,
) -> DisplayMessage {
    let scheduled = fields.scheduled.unwrap_or(MISSING_SCHEDULED);
    let estimated = fields.estimated.unwrap_or("");
    let destination = trim_destination(fields.destination.unwrap_or(MISSING_DESTINATION), dest_max_chars);
    let platform = match fields.platform {
        Some(p) if !p.is_empty() => p,
        _ => MISSING_PLATFORM,
    };

    let status = if fields.cancelled {
        ServiceStatus::Cancelled
    } else if estimated.is_empty() {
        ServiceStatus::Unknown
    } else if estimated == ON_TIME_MARKER || estimated == scheduled {
        ServiceStatus::OnTime
    } else {
        ServiceStatus::Delayed
    };

    let mut top = Line::new();
    match status {
        ServiceStatus::Delayed => {
            push_all(&mut top, &[scheduled, "->", estimated, " ", destination.as_str()]);
        }
        ServiceStatus::OnTime | ServiceStatus::Cancelled | ServiceStatus::Unknown => {
            push_all(&mut top, &[scheduled, " ", destination.as_str()]);
        }
    }

    let mut bottom = Line::new();
    push_all(&mut bottom, &["P", platform, " ", status.label()]);

    DisplayMessage { top, bottom, status }
}

/// Trim a destination name to at most `max_chars` characters.
///
/// Names that already fit are returned unchanged. Longer names keep their
/// first `max_chars - 1` characters followed by [`TRUNCATION_MARKER`], so the
/// result is exactly `max_chars` long and trimming it again is a no-op.
pub fn trim_destination(
    name: &str,
    max_chars: usize,
) -> Line {
    let mut out = Line::new();

    if name.chars().count() <= max_chars {
        push_truncating(&mut out, name);
        return out;
    }
    if max_chars == 0 {
        return out;
    }

    for c in name.chars().take(max_chars - 1) {
        if out.push(c).is_err() {
            return out;
        }
    }
    out.push(TRUNCATION_MARKER).ok();
    out
}

/// Append `text` one char at a time, stopping silently at capacity.
///
/// Returns `false` if anything was dropped.
fn push_truncating(
    out: &mut Line,
    text: &str,
) -> bool {
    for c in text.chars() {
        if out.push(c).is_err() {
            return false;
        }
    }
    true
}

fn push_all(
    out: &mut Line,
    parts: &[&str],
) {
    for part in parts {
        if !push_truncating(out, part) {
            return;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
