//! Departure data fetcher.
//!
//! # Architecture
//!
//! ```text
//! DepartureSource::fetch()  --(Result)-->  poll()  --(FetchOutcome)-->  mailbox  -->  orchestrator
//!       (HTTP + JSON)                 (errors folded)           (watch, latest wins)
//! ```
//!
//! The poller runs as its own task so network latency never stalls rendering.
//! Its mailbox is a `tokio::sync::watch` channel: a single slot where a new
//! outcome overwrites one the orchestrator has not read yet.
//!
//! # Response Shape (Huxley2)
//!
//! ```json
//! {
//!   "trainServices": [
//!     {
//!       "std": "08:15",
//!       "etd": "On time",
//!       "destination": [{ "locationName": "London Euston" }],
//!       "platform": "4",
//!       "isCancelled": false
//!     }
//!   ]
//! }
//! ```
//!
//! `trainServices` is `null` (or absent) when nothing is scheduled. That is an
//! empty board, not an error.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;

use departure_board_common::ServiceFields;

use crate::config::BoardConfig;
use crate::error::FetchError;

// =============================================================================
// Wire Types
// =============================================================================

/// Top-level departure board document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardResponse {
    #[serde(default)]
    pub train_services: Option<Vec<ServiceRecord>>,
}

/// One departing service. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    /// Scheduled time of departure.
    #[serde(default)]
    pub std: Option<String>,
    /// Estimated time of departure, or a marker like `"On time"`.
    #[serde(default)]
    pub etd: Option<String>,
    #[serde(default)]
    pub destination: Option<Vec<Location>>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub is_cancelled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub location_name: Option<String>,
}

impl ServiceRecord {
    /// First destination's name, if any.
    pub fn destination_name(&self) -> Option<&str> {
        self.destination
            .as_ref()
            .and_then(|d| d.first())
            .and_then(|loc| loc.location_name.as_deref())
    }

    /// Borrowed view for the classifier.
    pub fn fields(&self) -> ServiceFields<'_> {
        ServiceFields {
            scheduled: self.std.as_deref(),
            estimated: self.etd.as_deref(),
            destination: self.destination_name(),
            platform: self.platform.as_deref(),
            cancelled: self.is_cancelled.unwrap_or(false),
        }
    }
}

/// Parse a response body into records, in source order.
pub fn parse_board(body: &[u8]) -> Result<Vec<ServiceRecord>, FetchError> {
    let board: BoardResponse = serde_json::from_slice(body)?;
    Ok(board.train_services.unwrap_or_default())
}

// =============================================================================
// Outcome
// =============================================================================

/// Result of one poll, as seen by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// At least one service, in source order.
    Services(Vec<ServiceRecord>),
    /// The station has no departures.
    Empty,
    /// Transport, timeout, status or decode failure. The cause has been logged.
    Error,
}

impl FetchOutcome {
    /// Short form for log lines.
    pub fn summary(&self) -> String {
        match self {
            Self::Services(records) => format!("{} services", records.len()),
            Self::Empty => "empty board".to_string(),
            Self::Error => "error".to_string(),
        }
    }
}

impl From<Result<Vec<ServiceRecord>, FetchError>> for FetchOutcome {
    fn from(result: Result<Vec<ServiceRecord>, FetchError>) -> Self {
        match result {
            Ok(records) if records.is_empty() => Self::Empty,
            Ok(records) => Self::Services(records),
            Err(_) => Self::Error,
        }
    }
}

// =============================================================================
// Sources
// =============================================================================

/// Something that can produce the current departure list.
#[async_trait]
pub trait DepartureSource: Send + Sync {
    /// Fetch once. No retries.
    async fn fetch(&self) -> Result<Vec<ServiceRecord>, FetchError>;
}

/// Huxley2 HTTP client.
pub struct HuxleyClient {
    client: Client,
    url: String,
}

impl HuxleyClient {
    /// Client for the configured station, with the configured request timeout.
    pub fn new(config: &BoardConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.fetch_timeout()).build()?;
        Ok(Self {
            client,
            url: config.departures_url(),
        })
    }

    pub fn url(&self) -> &str { &self.url }
}

#[async_trait]
impl DepartureSource for HuxleyClient {
    async fn fetch(&self) -> Result<Vec<ServiceRecord>, FetchError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let body = response.bytes().await?;
        parse_board(&body)
    }
}

/// Fetch once, bounded by `timeout`, and fold the result into an outcome.
pub async fn poll<S: DepartureSource + ?Sized>(
    source: &S,
    timeout: Duration,
) -> FetchOutcome {
    let result = match time::timeout(timeout, source.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    };
    match &result {
        Ok(records) => {
            for record in records {
                debug!(
                    "service: {} {} {}",
                    record.std.as_deref().unwrap_or("??:??"),
                    record.destination_name().unwrap_or("?"),
                    record.etd.as_deref().unwrap_or("")
                );
            }
        }
        Err(err) => warn!("fetch failed: {err}"),
    }
    FetchOutcome::from(result)
}

// =============================================================================
// Background Poller
// =============================================================================

/// Publishing side of the mailbox. `None` until the first poll completes.
pub type MailboxSender = watch::Sender<Option<FetchOutcome>>;

/// Receiving side of the mailbox.
pub type Mailbox = watch::Receiver<Option<FetchOutcome>>;

/// Empty single-slot mailbox.
pub fn mailbox() -> (MailboxSender, Mailbox) { watch::channel(None) }

/// Poll `source` until cancelled, publishing each outcome.
///
/// Each fetch is cut off after `timeout`. `next_delay` decides how long to
/// wait after each outcome. The loop also stops when the receiving side has
/// been dropped.
pub async fn run_poller<S, F>(
    source: S,
    tx: MailboxSender,
    timeout: Duration,
    next_delay: F,
    cancel: CancellationToken,
) where
    S: DepartureSource,
    F: Fn(&FetchOutcome) -> Duration,
{
    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = poll(&source, timeout) => outcome,
        };

        let delay = next_delay(&outcome);
        info!("fetched {}, next poll in {:?}", outcome.summary(), delay);
        if tx.send(Some(outcome)).is_err() {
            debug!("mailbox closed, poller exiting");
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = time::sleep(delay) => {}
        }
    }
}

/// Spawn [`run_poller`] on the runtime and return its mailbox.
pub fn spawn_poller<S, F>(
    source: S,
    timeout: Duration,
    next_delay: F,
    cancel: CancellationToken,
) -> (JoinHandle<()>, Mailbox)
where
    S: DepartureSource + 'static,
    F: Fn(&FetchOutcome) -> Duration + Send + 'static,
{
    let (tx, rx) = mailbox();
    let handle = tokio::spawn(run_poller(source, tx, timeout, next_delay, cancel));
    (handle, rx)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use reqwest::StatusCode;
    use tokio::time::Instant;

    use super::*;
    use departure_board_common::config::FETCH_TIMEOUT;
    use departure_board_common::{ServiceStatus, classify};

    pub(crate) const BOARD_JSON: &str = r#"{
        "generatedAt": "2024-05-01T08:10:00",
        "locationName": "Newton",
        "crs": "NTN",
        "trainServices": [
            {
                "std": "08:15",
                "etd": "On time",
                "destination": [{ "locationName": "London Euston", "crs": "EUS" }],
                "platform": "4",
                "isCancelled": false,
                "operator": "Avanti West Coast"
            },
            {
                "std": "08:20",
                "etd": "08:32",
                "destination": [{ "locationName": "Glasgow Central" }],
                "platform": "2",
                "isCancelled": false
            },
            {
                "std": "08:40",
                "etd": "Cancelled",
                "destination": [{ "locationName": "Lanark" }],
                "platform": null,
                "isCancelled": true
            }
        ],
        "busServices": null
    }"#;

    /// Source that replays a fixed script, then repeats its last entry.
    pub(crate) struct ScriptedSource {
        script: Mutex<VecDeque<Result<Vec<ServiceRecord>, StatusCode>>>,
        pub(crate) calls: AtomicUsize,
    }

    impl ScriptedSource {
        pub(crate) fn new(script: Vec<Result<Vec<ServiceRecord>, StatusCode>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DepartureSource for ScriptedSource {
        async fn fetch(&self) -> Result<Vec<ServiceRecord>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let next = if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                script.front().cloned().unwrap_or(Ok(Vec::new()))
            };
            next.map_err(FetchError::Status)
        }
    }

    pub(crate) fn record(
        std: &str,
        etd: &str,
        dest: &str,
    ) -> ServiceRecord {
        ServiceRecord {
            std: Some(std.to_string()),
            etd: Some(etd.to_string()),
            destination: Some(vec![Location {
                location_name: Some(dest.to_string()),
            }]),
            platform: Some("1".to_string()),
            is_cancelled: Some(false),
        }
    }

    #[test]
    fn test_parse_full_board_keeps_source_order() {
        let records = parse_board(BOARD_JSON.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].destination_name(), Some("London Euston"));
        assert_eq!(records[1].etd.as_deref(), Some("08:32"));
        assert_eq!(records[2].is_cancelled, Some(true));
        assert_eq!(records[2].platform, None);
    }

    #[test]
    fn test_parsed_records_classify() {
        let records = parse_board(BOARD_JSON.as_bytes()).unwrap();
        let statuses: Vec<_> = records.iter().map(|r| classify(&r.fields(), 32).status()).collect();
        assert_eq!(
            statuses,
            [ServiceStatus::OnTime, ServiceStatus::Delayed, ServiceStatus::Cancelled]
        );
        let cancelled = classify(&records[2].fields(), 32);
        assert_eq!(cancelled.bottom(), "P? CANCELLED");
    }

    #[test]
    fn test_null_or_missing_services_is_empty() {
        assert!(parse_board(br#"{"trainServices": null}"#).unwrap().is_empty());
        assert!(parse_board(br#"{"locationName": "Newton"}"#).unwrap().is_empty());
        assert!(parse_board(br#"{"trainServices": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_record_with_no_fields() {
        let records = parse_board(br#"{"trainServices": [{}]}"#).unwrap();
        let fields = records[0].fields();
        assert_eq!(fields, ServiceFields::default());

        let message = classify(&fields, 32);
        assert_eq!(message.top(), "??:?? Unknown");
        assert_eq!(message.bottom(), "P? Check ETD");
    }

    #[test]
    fn test_empty_destination_list() {
        let records = parse_board(br#"{"trainServices": [{"std": "09:00", "destination": []}]}"#).unwrap();
        assert_eq!(records[0].destination_name(), None);
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        assert!(matches!(parse_board(b"<html>502</html>"), Err(FetchError::Decode(_))));
        assert!(matches!(
            parse_board(br#"{"trainServices": {"std": "08:15"}}"#),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_outcome_from_result() {
        assert_eq!(FetchOutcome::from(Ok(Vec::new())), FetchOutcome::Empty);
        assert_eq!(
            FetchOutcome::from(Err(FetchError::Status(StatusCode::BAD_GATEWAY))),
            FetchOutcome::Error
        );
        let one = vec![record("08:15", "On time", "Lanark")];
        assert_eq!(FetchOutcome::from(Ok(one.clone())), FetchOutcome::Services(one));
    }

    #[test]
    fn test_client_uses_configured_url() {
        let client = HuxleyClient::new(&BoardConfig::default()).unwrap();
        assert_eq!(client.url(), "https://huxley2.azurewebsites.net/departures/NTN/10");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_publishes_latest_outcome() {
        let source = ScriptedSource::new(vec![
            Err(StatusCode::SERVICE_UNAVAILABLE),
            Ok(Vec::new()),
            Ok(vec![record("08:15", "On time", "Lanark")]),
        ]);
        let cancel = CancellationToken::new();
        let (handle, mut rx) = spawn_poller(source, FETCH_TIMEOUT, |_| Duration::from_secs(5), cancel.clone());

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(FetchOutcome::Error));

        let start = Instant::now();
        rx.changed().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(5), "waits the chosen delay");
        assert_eq!(*rx.borrow_and_update(), Some(FetchOutcome::Empty));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unread_outcomes_are_overwritten() {
        let source = ScriptedSource::new(vec![
            Ok(Vec::new()),
            Err(StatusCode::INTERNAL_SERVER_ERROR),
            Ok(vec![record("10:00", "10:05", "Motherwell")]),
        ]);
        let cancel = CancellationToken::new();
        let (handle, rx) = spawn_poller(source, FETCH_TIMEOUT, |_| Duration::from_secs(1), cancel.clone());

        time::sleep(Duration::from_millis(2500)).await;
        let latest = rx.borrow().clone();
        assert!(
            matches!(latest, Some(FetchOutcome::Services(ref r)) if r.len() == 1),
            "only the newest outcome is kept, got {latest:?}"
        );

        cancel.cancel();
        handle.await.unwrap();
    }

    /// Source whose request never completes.
    struct StalledSource;

    #[async_trait]
    impl DepartureSource for StalledSource {
        async fn fetch(&self) -> Result<Vec<ServiceRecord>, FetchError> { std::future::pending().await }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_fetch_times_out_as_error() {
        let start = Instant::now();
        let outcome = poll(&StalledSource, FETCH_TIMEOUT).await;
        assert_eq!(outcome, FetchOutcome::Error, "a stalled request must become an error");
        assert_eq!(start.elapsed(), FETCH_TIMEOUT, "cut off at the fetch timeout");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_publishes_error_after_timeout() {
        let cancel = CancellationToken::new();
        let start = Instant::now();
        let (handle, mut rx) = spawn_poller(StalledSource, FETCH_TIMEOUT, |_| Duration::from_secs(5), cancel.clone());

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(FetchOutcome::Error));
        assert_eq!(start.elapsed(), Duration::from_secs(5));

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_fetch_is_not_cut_off() {
        let source = ScriptedSource::new(vec![Ok(vec![record("08:15", "On time", "Ayr")])]);
        let outcome = poll(&source, Duration::from_millis(1)).await;
        assert!(matches!(outcome, FetchOutcome::Services(ref r) if r.len() == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_stops_when_mailbox_dropped() {
        let source = ScriptedSource::new(vec![Ok(Vec::new())]);
        let cancel = CancellationToken::new();
        let (handle, rx) = spawn_poller(source, FETCH_TIMEOUT, |_| Duration::from_secs(1), cancel);
        drop(rx);
        handle.await.unwrap();
    }
}
