//! Service status categories.
//!
//! Every consumer matches on [`ServiceStatus`] exhaustively, so adding a
//! category is a compile error everywhere it needs handling.

/// Punctuality category assigned to a service by the classifier.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum ServiceStatus {
    /// Running to schedule (estimate equals "On time" or the scheduled time).
    OnTime,
    /// Estimate differs from the scheduled time.
    Delayed,
    /// Service is cancelled.
    Cancelled,
    /// No estimate published.
    Unknown,
}

impl ServiceStatus {
    /// Text shown after the platform on the bottom line.
    pub const fn label(self) -> &'static str {
        match self {
            Self::OnTime => "On time",
            Self::Delayed => "Delayed",
            Self::Cancelled => "CANCELLED",
            Self::Unknown => "Check ETD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(ServiceStatus::OnTime.label(), "On time");
        assert_eq!(ServiceStatus::Delayed.label(), "Delayed");
        assert_eq!(ServiceStatus::Cancelled.label(), "CANCELLED");
        assert_eq!(ServiceStatus::Unknown.label(), "Check ETD");
    }
}
