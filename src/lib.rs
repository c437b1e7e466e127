//! Departure board library: everything the binary runs, testable on the host.
//!
//! The binary (`main.rs`) parses the command line, builds the runtime pieces
//! from one [`config::BoardConfig`] and wires them together.
//!
//! # Data Flow
//!
//! ```text
//! fetcher (task) --mailbox--> orchestrator --> classify --> layout --> scheduler --> panel
//!                                                                         ^
//!                                                                   clock overlay
//! ```
//!
//! # Testing
//!
//! ```bash
//! cargo test --workspace
//! ```
//!
//! Timing tests run on tokio's paused clock, so holds of several seconds
//! complete instantly.

// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

// === Configuration and errors ===
pub mod config;
pub mod error;

// === Data ===
pub mod fetcher;

// === Rendering ===
pub mod clock;
pub mod frame;
pub mod panel;
pub mod scheduler;

// === Modes ===
pub mod marquee;
pub mod orchestrator;

pub use config::BoardConfig;
pub use error::{ConfigError, FetchError, PanelError};
pub use fetcher::{FetchOutcome, HuxleyClient};
pub use orchestrator::{BoardState, Orchestrator, RetryPolicy};
