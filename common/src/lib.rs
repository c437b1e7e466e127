//! Common types and logic for the departure board.
//!
//! This crate contains the platform-agnostic part of the board, shared by the
//! host binary and its tests:
//!
//! - [`status`]: Closed service status enum
//! - [`colors`]: RGB888 color constants and status color mapping
//! - [`config`]: Panel geometry and timing defaults
//! - [`classify`]: Service record classification and destination trimming
//! - [`layout`]: Text measurement and the static/scroll decision
//!
//! # no_std Compatibility
//!
//! This crate is `no_std` compatible. Text lines are built in fixed-capacity
//! `heapless::String`s and all time values are `core::time::Duration`, so the
//! same logic could drive a microcontroller-hosted panel.
//!
//! Tests run with `std` enabled (via `cfg_attr`) for the standard test harness.

// Use no_std only when NOT testing (tests need std for the test harness)
#![cfg_attr(not(test), no_std)]
// Crate-level lints
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

pub mod classify;
pub mod colors;
pub mod config;
pub mod layout;
pub mod status;

// Re-export commonly used items
pub use classify::{DisplayMessage, ServiceFields, classify, trim_destination};
pub use layout::{LayoutSettings, RenderPlan, ScrollState, measure_text_width, plan_for_width, plan_layout};
pub use status::ServiceStatus;
