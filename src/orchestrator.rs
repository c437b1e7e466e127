//! Board state machine.
//!
//! # States
//!
//! ```text
//!                +--> ErrorDisplay    (API ERROR / Check network, red, 5 s)  --+
//!   Fetching ----+--> EmptyDisplay    (NO DATA / No trains, amber, 10 s)     --+--> Fetching
//!                +--> ShowingServices (first N services, colored by status)  --+
//! ```
//!
//! `Fetching` does not block on the network. It takes the newest outcome from
//! the poller's mailbox; if nothing new arrived since the last cycle, the
//! previous outcome is shown again. Only before the very first outcome does
//! the board wait, showing `LOADING` with the clock running.
//!
//! There is no terminal state. Shutdown interrupts whatever is on screen and
//! the panel is cleared before [`Orchestrator::run`] returns.
//!
//! # Retry Policy
//!
//! The orchestrator also decides how soon the poller fetches again:
//!
//! | Outcome | Next poll after |
//! |---------|-----------------|
//! | `Services` | refresh interval (10 s) |
//! | `Empty` | empty hold (10 s) |
//! | `Error` | error hold (5 s) |

use std::time::Duration;

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use departure_board_common::classify;
use departure_board_common::colors::{ALERT, NEUTRAL, WARNING, status_color};

use crate::config::BoardConfig;
use crate::error::PanelError;
use crate::fetcher::{FetchOutcome, Mailbox, ServiceRecord};
use crate::panel::Panel;
use crate::scheduler::{FrameScheduler, Pacing};

// =============================================================================
// Fixed Messages
// =============================================================================

pub const ERROR_TOP: &str = "API ERROR";
pub const ERROR_BOTTOM: &str = "Check network";
pub const EMPTY_TOP: &str = "NO DATA";
pub const EMPTY_BOTTOM: &str = "No trains";
pub const LOADING_TEXT: &str = "LOADING";

// =============================================================================
// State and Policy
// =============================================================================

/// Where the board is in its display cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoardState {
    Fetching,
    ErrorDisplay,
    EmptyDisplay,
    ShowingServices,
}

/// Hold durations per outcome, shared by the display and the poller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub refresh_interval: Duration,
    pub empty_hold: Duration,
    pub error_hold: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &BoardConfig) -> Self {
        Self {
            refresh_interval: config.timing.refresh_interval(),
            empty_hold: config.timing.empty_hold(),
            error_hold: config.timing.error_hold(),
        }
    }

    /// How long the poller waits after `outcome` before fetching again.
    pub fn next_poll_delay(
        &self,
        outcome: &FetchOutcome,
    ) -> Duration {
        match outcome {
            FetchOutcome::Services(_) => self.refresh_interval,
            FetchOutcome::Empty => self.empty_hold,
            FetchOutcome::Error => self.error_hold,
        }
    }
}

// =============================================================================
// Orchestrator
// =============================================================================

/// Drives the panel from mailbox outcomes.
pub struct Orchestrator<P: Panel> {
    scheduler: FrameScheduler<P>,
    mailbox: Mailbox,
    policy: RetryPolicy,
    services_shown: usize,
    dest_max_chars: usize,
    state: BoardState,
    latest: Option<FetchOutcome>,
}

impl<P: Panel> Orchestrator<P> {
    pub fn new(
        scheduler: FrameScheduler<P>,
        mailbox: Mailbox,
        config: &BoardConfig,
    ) -> Self {
        Self {
            scheduler,
            mailbox,
            policy: RetryPolicy::from_config(config),
            services_shown: config.services_shown,
            dest_max_chars: config.layout.dest_max_chars,
            state: BoardState::Fetching,
            latest: None,
        }
    }

    #[inline]
    pub const fn state(&self) -> BoardState { self.state }

    pub fn scheduler(&self) -> &FrameScheduler<P> { &self.scheduler }

    /// Run display cycles until `cancel` fires, then clear the panel.
    ///
    /// Only a panel failure ends the loop early. The panel is cleared in
    /// either case.
    pub async fn run(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<(), PanelError> {
        info!("board running");
        let result = loop {
            match self.cycle(cancel).await {
                Ok(Pacing::Completed) => {}
                Ok(Pacing::Cancelled) => break Ok(()),
                Err(err) => break Err(err),
            }
        };

        let cleared = self.scheduler.blank();
        info!("display cleared");
        result.and(cleared)
    }

    /// One pass: take an outcome and display it.
    pub async fn cycle(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Pacing, PanelError> {
        let Some(outcome) = self.next_outcome(cancel).await? else {
            return Ok(Pacing::Cancelled);
        };
        self.show_outcome(&outcome, cancel).await
    }

    /// Newest outcome, the previous one again, or (first time only) wait.
    ///
    /// Returns `None` if shutdown was requested while waiting.
    async fn next_outcome(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<FetchOutcome>, PanelError> {
        self.transition(BoardState::Fetching);

        if !matches!(self.mailbox.has_changed(), Ok(true)) {
            if let Some(previous) = &self.latest {
                debug!("no new outcome, reusing {}", previous.summary());
                return Ok(Some(previous.clone()));
            }

            let loading = [self.scheduler.top_line(LOADING_TEXT, NEUTRAL)];
            let pacing = self
                .scheduler
                .hold_until(&loading, self.mailbox.changed(), cancel)
                .await?;
            if pacing.is_cancelled() {
                return Ok(None);
            }
        }

        // A poller that exits before publishing anything counts as a failed fetch.
        let outcome = self.mailbox.borrow_and_update().clone().unwrap_or(FetchOutcome::Error);
        info!("new outcome: {}", outcome.summary());
        self.latest = Some(outcome.clone());
        Ok(Some(outcome))
    }

    /// Display one outcome for its full duration.
    pub async fn show_outcome(
        &mut self,
        outcome: &FetchOutcome,
        cancel: &CancellationToken,
    ) -> Result<Pacing, PanelError> {
        match outcome {
            FetchOutcome::Error => {
                self.transition(BoardState::ErrorDisplay);
                let lines = [
                    self.scheduler.top_line(ERROR_TOP, ALERT),
                    self.scheduler.bottom_line(ERROR_BOTTOM, ALERT),
                ];
                self.scheduler.hold(&lines, self.policy.error_hold, cancel).await
            }
            FetchOutcome::Empty => {
                self.transition(BoardState::EmptyDisplay);
                let lines = [
                    self.scheduler.top_line(EMPTY_TOP, WARNING),
                    self.scheduler.bottom_line(EMPTY_BOTTOM, WARNING),
                ];
                self.scheduler.hold(&lines, self.policy.empty_hold, cancel).await
            }
            FetchOutcome::Services(records) => {
                self.transition(BoardState::ShowingServices);
                self.show_services(records, cancel).await
            }
        }
    }

    async fn show_services(
        &mut self,
        records: &[ServiceRecord],
        cancel: &CancellationToken,
    ) -> Result<Pacing, PanelError> {
        for record in records.iter().take(self.services_shown) {
            let message = classify(&record.fields(), self.dest_max_chars);
            let color = status_color(message.status());
            let pacing = self
                .scheduler
                .show_message(message.top(), message.bottom(), color, cancel)
                .await?;
            if pacing.is_cancelled() {
                return Ok(Pacing::Cancelled);
            }
        }
        Ok(Pacing::Completed)
    }

    fn transition(
        &mut self,
        next: BoardState,
    ) {
        if self.state != next {
            info!("state: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use embedded_graphics::pixelcolor::Rgb888;
    use tokio::time::{self, Instant};

    use super::*;
    use crate::fetcher::mailbox;
    use crate::fetcher::tests::record;
    use crate::frame::Frame;
    use crate::panel::testing::RecordingPanel;
    use crate::scheduler::SchedulerSettings;
    use departure_board_common::colors::{AMBER, GREEN, RED, WHITE};

    fn fixed_time() -> NaiveTime { NaiveTime::from_hms_opt(8, 10, 0).unwrap() }

    fn board(mailbox: Mailbox) -> Orchestrator<RecordingPanel> {
        let config = BoardConfig::default();
        let mut settings = SchedulerSettings::from_config(&config);
        settings.clock = settings.clock.map(|c| c.with_time_source(fixed_time));
        let scheduler = FrameScheduler::new(RecordingPanel::new(config.panel_size()), settings);
        Orchestrator::new(scheduler, mailbox, &config)
    }

    fn frames(board: &Orchestrator<RecordingPanel>) -> &[(Instant, Frame)] { &board.scheduler().panel().frames }

    fn has_color(
        frame: &Frame,
        color: Rgb888,
    ) -> bool {
        frame.pixels().contains(&color)
    }

    #[test]
    fn test_retry_policy_delays() {
        let policy = RetryPolicy::from_config(&BoardConfig::default());
        assert_eq!(policy.next_poll_delay(&FetchOutcome::Error), Duration::from_secs(5));
        assert_eq!(policy.next_poll_delay(&FetchOutcome::Empty), Duration::from_secs(10));
        assert_eq!(
            policy.next_poll_delay(&FetchOutcome::Services(vec![record("08:15", "On time", "Ayr")])),
            Duration::from_secs(10)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_holds_five_seconds_in_red() {
        let (_tx, rx) = mailbox();
        let mut board = board(rx);
        let cancel = CancellationToken::new();
        let start = Instant::now();

        let pacing = board.show_outcome(&FetchOutcome::Error, &cancel).await.unwrap();

        assert_eq!(pacing, Pacing::Completed);
        assert_eq!(board.state(), BoardState::ErrorDisplay);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        for (_, frame) in frames(&board) {
            assert!(has_color(frame, RED), "error text is red");
            assert!(!has_color(frame, AMBER) && !has_color(frame, GREEN));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_holds_ten_seconds_in_amber() {
        let (_tx, rx) = mailbox();
        let mut board = board(rx);
        let cancel = CancellationToken::new();
        let start = Instant::now();

        board.show_outcome(&FetchOutcome::Empty, &cancel).await.unwrap();

        assert_eq!(board.state(), BoardState::EmptyDisplay);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
        assert_eq!(frames(&board).len(), 40);
        assert!(frames(&board).iter().all(|(_, f)| has_color(f, AMBER)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_first_services_are_shown() {
        let (_tx, rx) = mailbox();
        let mut board = board(rx);
        let cancel = CancellationToken::new();

        let mut cancelled = record("08:40", "Cancelled", "Ayr");
        cancelled.is_cancelled = Some(true);
        let records = vec![
            record("08:15", "On time", "Ayr"),
            // 16 chars at 4px: exactly fits, stays static
            record("08:20", "08:32", "Ayr"),
            cancelled,
        ];
        let start = Instant::now();

        board.show_outcome(&FetchOutcome::Services(records), &cancel).await.unwrap();

        assert_eq!(board.state(), BoardState::ShowingServices);
        assert_eq!(start.elapsed(), Duration::from_secs(10), "two static services of 5 s");
        let frames = frames(&board);
        assert_eq!(frames.len(), 40);
        assert!(frames[..20].iter().all(|(_, f)| has_color(f, GREEN)), "on time is green");
        assert!(frames[20..].iter().all(|(_, f)| has_color(f, AMBER)), "delayed is amber");
        assert!(
            !frames.iter().any(|(_, f)| has_color(f, RED)),
            "third service is beyond services_shown"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_until_first_outcome() {
        let (tx, rx) = mailbox();
        let mut board = board(rx);
        let cancel = CancellationToken::new();
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(1)).await;
            tx.send(Some(FetchOutcome::Empty)).ok();
            // keep the sender alive until the test ends
            time::sleep(Duration::from_secs(60)).await;
        });
        let start = Instant::now();

        board.cycle(&cancel).await.unwrap();

        assert_eq!(board.state(), BoardState::EmptyDisplay);
        assert_eq!(start.elapsed(), Duration::from_secs(11), "1 s loading then 10 s empty hold");
        let (first_at, first) = &frames(&board)[0];
        assert_eq!(*first_at, start);
        assert!(has_color(first, WHITE) && !has_color(first, AMBER), "loading screen first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_previous_outcome_reused_when_nothing_new() {
        let (tx, rx) = mailbox();
        let mut board = board(rx);
        let cancel = CancellationToken::new();
        tx.send(Some(FetchOutcome::Error)).unwrap();
        let start = Instant::now();

        board.cycle(&cancel).await.unwrap();
        board.cycle(&cancel).await.unwrap();

        assert_eq!(board.state(), BoardState::ErrorDisplay);
        assert_eq!(start.elapsed(), Duration::from_secs(10));

        tx.send(Some(FetchOutcome::Empty)).unwrap();
        board.cycle(&cancel).await.unwrap();
        assert_eq!(board.state(), BoardState::EmptyDisplay, "newest outcome wins");
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_mailbox_shows_error() {
        let (tx, rx) = mailbox();
        drop(tx);
        let mut board = board(rx);
        let cancel = CancellationToken::new();

        board.cycle(&cancel).await.unwrap();
        assert_eq!(board.state(), BoardState::ErrorDisplay);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_clears_display() {
        let (tx, rx) = mailbox();
        let mut board = board(rx);
        tx.send(Some(FetchOutcome::Services(vec![record("08:15", "On time", "Ayr")])))
            .unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(7300)).await;
            trigger.cancel();
        });
        let start = Instant::now();

        board.run(&cancel).await.unwrap();

        assert!(start.elapsed() < Duration::from_millis(7600), "shutdown is prompt");
        let panel = board.scheduler().panel();
        assert_eq!(panel.clears, 1);
        assert!(panel.last().unwrap().is_blank(), "panel ends blank");
    }
}
