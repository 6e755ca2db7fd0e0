//! Bluetooth Module
//!
//! Provides the BLE time-sync session with the reminder device.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                 SessionOrchestrator                      │
//! │  (state machine - public API for the application)        │
//! └─────────────┬──────────────┬──────────────┬─────────────┘
//!               │              │              │
//!               ▼              ▼              ▼
//! ┌───────────┐  ┌────────────┐  ┌────────────┐  ┌──────────┐
//! │  Scanner  │  │ Connection │  │ Dispatcher │  │ Protocol │
//! │           │  │            │  │            │  │          │
//! │ - name    │  │ - connect  │  │ - ordered  │  │ - UUIDs  │
//! │   match   │  │ - GATT     │  │   writes   │  │ - encode │
//! └─────┬─────┘  └─────┬──────┘  └─────┬──────┘  └──────────┘
//!       └──────────────┼───────────────┘
//!                      ▼
//!               RadioAdapter (WinRT / test fake)
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - GATT identifiers and command encoding
//! - [`adapter`] - Radio adapter capability
//! - [`scanner`] - Name-filtered, timeout-bounded discovery
//! - [`connection`] - Device connection and GATT resolution
//! - [`dispatcher`] - Ordered command writes
//! - [`service`] - Session state machine

pub mod adapter;
pub mod connection;
pub mod dispatcher;
pub mod protocol;
pub mod scanner;
pub mod service;

#[cfg(windows)]
pub mod winrt;

#[cfg(test)]
pub(crate) mod fake;

// Re-export main service for convenience
pub use service::{start_session, SessionConfig, SessionOrchestrator};
