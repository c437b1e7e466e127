//! Error types for the board.
//!
//! Only [`PanelError`] is fatal. [`FetchError`] never escapes the fetcher: it
//! is logged and folded into `FetchOutcome::Error`, which the orchestrator
//! shows on screen.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to get a usable departure board from the data source.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed departure board: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no response within {0:?}")]
    Timeout(std::time::Duration),
}

/// Failure of the display device.
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("panel I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("panel window was closed")]
    Closed,
    #[error("frame is {frame_width}x{frame_height} but panel is {panel_width}x{panel_height}")]
    SizeMismatch {
        frame_width: u32,
        frame_height: u32,
        panel_width: u32,
        panel_height: u32,
    },
}

/// Invalid or unreadable configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
