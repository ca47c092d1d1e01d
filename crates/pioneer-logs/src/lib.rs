// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Buffered log shipping for CloudPioneer clients.
//!
//! [`LogService`] collects structured [`LogEntry`] values in memory and sends
//! them to the collector in batches. Logging calls return immediately; the
//! network work happens on background tasks.
//!
//! # Quick Start
//!
//! ```ignore
//! use pioneer_logs::{InitOptions, LogCategory, LogService, Metadata};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = pioneer_logs::load_config(None)?;
//!     let logs = LogService::builder().config(config).build()?;
//!
//!     logs.initialize("acme", InitOptions {
//!         flush_interval: Some(Duration::from_secs(2)),
//!         ..Default::default()
//!     })?;
//!
//!     logs.activity("opened cost report", Metadata::new().insert("report", "monthly"));
//!     logs.critical("budget exceeded", LogCategory::Billing, Metadata::new());
//!
//!     // Flushes whatever is still buffered.
//!     logs.close().await;
//!     Ok(())
//! }
//! ```
//!
//! # Delivery
//!
//! A batch is sent when any of these happens:
//!
//! | Trigger | When |
//! |---------|------|
//! | Timer | every `flush_interval` (default 5s) |
//! | Capacity | `buffer_size` entries are pending (default 100) |
//! | Severity | an `error` or `critical` entry is logged |
//!
//! If the collector fails or does not answer within `request_timeout`, the
//! batch goes back into the buffer ahead of newer entries. Only the newest
//! `buffer_size` entries are kept. The next trigger retries; there is no
//! separate backoff.
//!
//! # Queries
//!
//! [`LogService::analyze`], [`LogService::search`], [`LogService::export`]
//! and [`LogService::statistics`] pass through to the collector and return
//! its errors to the caller.

mod buffer;
pub mod collector;
pub mod config;
pub mod entry;
pub mod environment;
pub mod error;
pub mod metadata;
pub mod service;

pub use collector::{Collector, HttpCollector, DEFAULT_COLLECTOR_URL};
pub use config::{load_config, LogServiceConfig, LogsConfigLayer};
pub use entry::{LogCategory, LogEntry, LogLevel};
pub use environment::{EnvironmentSource, ProcessEnvironment, StaticEnvironment};
pub use error::{ConfigError, LogServiceError, Result};
pub use metadata::Metadata;
pub use pioneer_common_secret::SecretString;
pub use service::{FlushOutcome, InitOptions, LogService, LogServiceBuilder};
