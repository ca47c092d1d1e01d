// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The log service: ambient stamping, buffering and background delivery.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use pioneer_common_secret::SecretString;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::buffer::LogBuffer;
use crate::collector::{Collector, HttpCollector};
use crate::config::LogServiceConfig;
use crate::entry::{LogCategory, LogEntry, LogLevel};
use crate::environment::{self, EnvironmentSource, ProcessEnvironment};
use crate::error::{ConfigError, LogServiceError, Result};
use crate::metadata::Metadata;

/// Overrides accepted by [`LogService::initialize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitOptions {
	/// Entries buffered before an eager flush. Must be positive.
	pub buffer_size: Option<usize>,
	/// Background flush period. Must be non-zero; restarts the timer.
	pub flush_interval: Option<Duration>,
}

/// What a call to [`LogService::flush`] did with the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
	/// Nothing was buffered.
	Empty,
	/// The collector accepted this many entries.
	Delivered(usize),
	/// Delivery failed; this many of the batch's entries went back into the
	/// buffer. Entries trimmed to stay within capacity are not counted.
	Requeued(usize),
	/// The delivery task died before reporting; its entries are gone.
	Lost(usize),
}

/// Builder for constructing a [`LogService`].
pub struct LogServiceBuilder {
	config: LogServiceConfig,
	collector: Option<Arc<dyn Collector>>,
	environment: Arc<dyn EnvironmentSource>,
}

impl LogServiceBuilder {
	pub fn new() -> Self {
		Self {
			config: LogServiceConfig::default(),
			collector: None,
			environment: Arc::new(ProcessEnvironment),
		}
	}

	/// Replaces every setting with a resolved configuration.
	pub fn config(mut self, config: LogServiceConfig) -> Self {
		self.config = config;
		self
	}

	/// Uses a custom collector instead of the HTTP one.
	pub fn collector(mut self, collector: Arc<dyn Collector>) -> Self {
		self.collector = Some(collector);
		self
	}

	/// Sets the collector base URL, e.g. `https://api.cloudpioneer.com/v1`.
	pub fn collector_url(mut self, url: impl Into<String>) -> Self {
		self.config.collector_url = url.into();
		self
	}

	/// Sets the bearer token sent to the collector.
	pub fn auth_token(mut self, token: impl Into<SecretString>) -> Self {
		self.config.auth_token = Some(token.into());
		self
	}

	/// Bounds every delivery attempt.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = timeout;
		self
	}

	pub fn buffer_size(mut self, size: usize) -> Self {
		self.config.buffer_size = size;
		self
	}

	pub fn flush_interval(mut self, interval: Duration) -> Self {
		self.config.flush_interval = interval;
		self
	}

	pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
		self.config.tenant = Some(tenant.into());
		self
	}

	pub fn environment_source(mut self, source: Arc<dyn EnvironmentSource>) -> Self {
		self.environment = source;
		self
	}

	/// Builds the service and starts the background flush timer.
	///
	/// Must be called from within a Tokio runtime.
	pub fn build(self) -> Result<LogService> {
		let runtime = Handle::try_current().map_err(|_| LogServiceError::NoRuntime)?;

		validate_buffer_size(self.config.buffer_size)?;
		validate_duration("flush_interval", self.config.flush_interval)?;
		validate_duration("request_timeout", self.config.request_timeout)?;

		let collector = match self.collector {
			Some(collector) => collector,
			None => Arc::new(HttpCollector::new(
				&self.config.collector_url,
				self.config.auth_token.clone(),
				self.config.request_timeout,
			)?),
		};

		let inner = Arc::new(Inner {
			collector,
			environment: self.environment,
			buffer: Mutex::new(LogBuffer::new(self.config.buffer_size)),
			ambient: RwLock::new(Ambient {
				tenant: self.config.tenant.clone(),
				..Default::default()
			}),
			timer: Mutex::new(Timer {
				handle: None,
				period: self.config.flush_interval,
			}),
			request_timeout: self.config.request_timeout,
			runtime,
			in_flight: AtomicUsize::new(0),
			idle: Notify::new(),
			closed: AtomicBool::new(false),
		});
		inner.restart_timer(self.config.flush_interval);

		info!(
			buffer_size = self.config.buffer_size,
			flush_interval_ms = self.config.flush_interval.as_millis() as u64,
			tenant = ?self.config.tenant,
			"Log service initialized"
		);

		Ok(LogService { inner })
	}
}

impl Default for LogServiceBuilder {
	fn default() -> Self {
		Self::new()
	}
}

fn validate_buffer_size(size: usize) -> std::result::Result<(), ConfigError> {
	if size == 0 {
		return Err(ConfigError::invalid_value("buffer_size", "must be positive"));
	}
	Ok(())
}

fn validate_duration(key: &str, value: Duration) -> std::result::Result<(), ConfigError> {
	if value.is_zero() {
		return Err(ConfigError::invalid_value(key, "must be positive"));
	}
	Ok(())
}

#[derive(Debug, Default)]
struct Ambient {
	tenant: Option<String>,
	correlation_id: Option<String>,
	location: Option<String>,
}

struct Timer {
	handle: Option<JoinHandle<()>>,
	period: Duration,
}

struct Inner {
	collector: Arc<dyn Collector>,
	environment: Arc<dyn EnvironmentSource>,
	buffer: Mutex<LogBuffer>,
	ambient: RwLock<Ambient>,
	timer: Mutex<Timer>,
	request_timeout: Duration,
	runtime: Handle,
	in_flight: AtomicUsize,
	idle: Notify,
	closed: AtomicBool,
}

impl Inner {
	fn create_entry(
		&self,
		level: LogLevel,
		message: String,
		category: LogCategory,
		metadata: Metadata,
	) -> LogEntry {
		let ambient = self.ambient.read();
		let mut metadata = metadata.into_map();
		environment::stamp(
			&mut metadata,
			self.environment.as_ref(),
			ambient.location.clone(),
		);

		LogEntry {
			timestamp: Utc::now(),
			level,
			category,
			message,
			tenant: ambient.tenant.clone(),
			correlation_id: ambient.correlation_id.clone(),
			metadata,
			seq: 0,
		}
	}

	fn enqueue(self: &Arc<Self>, entry: LogEntry) {
		let immediate = entry.level.requires_immediate_flush();
		let batch = {
			let mut buffer = self.buffer.lock();
			match buffer.push(entry) {
				Some(batch) => Some(batch),
				None if immediate => Some(buffer.take()),
				None => None,
			}
		};

		if let Some(batch) = batch {
			self.dispatch(batch);
		}
	}

	fn take_batch(&self) -> Option<Vec<LogEntry>> {
		let mut buffer = self.buffer.lock();
		if buffer.is_empty() {
			None
		} else {
			Some(buffer.take())
		}
	}

	/// Spawns delivery of `batch` without waiting for it.
	fn dispatch(self: &Arc<Self>, batch: Vec<LogEntry>) -> JoinHandle<FlushOutcome> {
		self.in_flight.fetch_add(1, Ordering::SeqCst);
		let guard = InFlight(Arc::clone(self));
		self.runtime.spawn(async move {
			let outcome = guard.0.deliver(batch).await;
			drop(guard);
			outcome
		})
	}

	async fn deliver(&self, batch: Vec<LogEntry>) -> FlushOutcome {
		let count = batch.len();
		debug!(count, "Flushing log batch");

		let result =
			match tokio::time::timeout(self.request_timeout, self.collector.send_batch(&batch)).await {
				Ok(result) => result,
				Err(_) => Err(LogServiceError::Timeout(self.request_timeout)),
			};

		match result {
			Ok(()) => {
				debug!(count, "Log batch delivered");
				FlushOutcome::Delivered(count)
			}
			Err(e) => {
				let requeued = self.buffer.lock().requeue(batch);
				warn!(
					error = %e,
					count,
					retryable = e.is_retryable(),
					"Failed to send logs, batch re-queued"
				);
				if requeued.dropped > 0 {
					warn!(
						dropped = requeued.dropped,
						"Dropped oldest log entries after failed flush"
					);
				}
				FlushOutcome::Requeued(requeued.restored)
			}
		}
	}

	fn restart_timer(self: &Arc<Self>, period: Duration) {
		let mut timer = self.timer.lock();
		if let Some(handle) = timer.handle.take() {
			handle.abort();
		}
		timer.period = period;
		timer.handle = Some(self.runtime.spawn(run_timer(Arc::downgrade(self), period)));
	}

	fn stop_timer(&self) {
		if let Some(handle) = self.timer.lock().handle.take() {
			handle.abort();
		}
	}

	async fn settle(&self) {
		loop {
			let notified = self.idle.notified();
			if self.in_flight.load(Ordering::SeqCst) == 0 {
				return;
			}
			notified.await;
		}
	}
}

impl Drop for Inner {
	fn drop(&mut self) {
		if let Some(handle) = self.timer.get_mut().handle.take() {
			handle.abort();
		}
	}
}

/// Decrements the in-flight count when a delivery task ends, even on abort.
struct InFlight(Arc<Inner>);

impl Drop for InFlight {
	fn drop(&mut self) {
		if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
			self.0.idle.notify_waiters();
		}
	}
}

async fn run_timer(inner: Weak<Inner>, period: Duration) {
	let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		ticker.tick().await;

		let Some(inner) = inner.upgrade() else {
			break;
		};
		if inner.closed.load(Ordering::SeqCst) {
			break;
		}
		if let Some(batch) = inner.take_batch() {
			inner.dispatch(batch);
		}
	}

	debug!("Log flush timer stopped");
}

/// Buffered, batched shipper of structured log entries.
///
/// Entries are stamped with the ambient tenant, correlation id and location
/// at creation, buffered in memory and sent to the collector:
///
/// - every `flush_interval`,
/// - as soon as `buffer_size` entries are pending,
/// - immediately after an `error` or `critical` entry.
///
/// A failed delivery puts its entries back in front of anything logged in
/// the meantime, keeping at most `buffer_size` of the newest. Logging calls
/// never block and never fail.
///
/// `LogService` is cheap to clone; clones share one buffer and one timer.
///
/// # Example
///
/// ```ignore
/// use pioneer_logs::{InitOptions, LogCategory, LogService, Metadata};
///
/// let logs = LogService::builder()
///     .collector_url("https://api.cloudpioneer.com/v1")
///     .build()?;
///
/// logs.initialize("acme", InitOptions::default())?;
/// logs.set_correlation_id("req-42");
/// logs.optimization("rightsized instance", Metadata::new().insert("savings_usd", 41.0));
/// logs.error("billing sync failed", LogCategory::Billing, Metadata::new());
///
/// logs.close().await;
/// ```
#[derive(Clone)]
pub struct LogService {
	inner: Arc<Inner>,
}

impl LogService {
	pub fn builder() -> LogServiceBuilder {
		LogServiceBuilder::new()
	}

	/// Sets the ambient tenant and optionally resizes the buffer or restarts
	/// the timer with a new period.
	///
	/// Invalid options are rejected before anything changes. Entries already
	/// buffered keep the tenant they were created with.
	pub fn initialize(&self, tenant: impl Into<String>, options: InitOptions) -> Result<()> {
		if let Some(size) = options.buffer_size {
			validate_buffer_size(size)?;
		}
		if let Some(interval) = options.flush_interval {
			validate_duration("flush_interval", interval)?;
		}

		let tenant = tenant.into();
		self.inner.ambient.write().tenant = Some(tenant.clone());

		if let Some(size) = options.buffer_size {
			let batch = self.inner.buffer.lock().set_capacity(size);
			if let Some(batch) = batch {
				self.inner.dispatch(batch);
			}
		}

		if let Some(interval) = options.flush_interval {
			if self.is_closed() {
				debug!("Log service closed, not restarting flush timer");
			} else {
				self.inner.restart_timer(interval);
			}
		}

		info!(
			tenant = %tenant,
			buffer_size = self.buffer_size(),
			flush_interval_ms = self.flush_interval().as_millis() as u64,
			"Log service configured"
		);
		Ok(())
	}

	/// Sets the correlation id stamped on entries created from now on.
	pub fn set_correlation_id(&self, id: impl Into<String>) {
		self.inner.ambient.write().correlation_id = Some(id.into());
	}

	pub fn clear_correlation_id(&self) {
		self.inner.ambient.write().correlation_id = None;
	}

	/// Sets the current page or route, recorded as `metadata.url`.
	pub fn set_location(&self, location: impl Into<String>) {
		self.inner.ambient.write().location = Some(location.into());
	}

	pub fn clear_location(&self) {
		self.inner.ambient.write().location = None;
	}

	/// Creates and buffers an entry.
	pub fn log(
		&self,
		level: LogLevel,
		message: impl Into<String>,
		category: LogCategory,
		metadata: Metadata,
	) {
		if self.is_closed() {
			debug!(%level, %category, "Log service closed, dropping entry");
			return;
		}

		let entry = self
			.inner
			.create_entry(level, message.into(), category, metadata);
		self.inner.enqueue(entry);
	}

	pub fn debug(&self, message: impl Into<String>, category: LogCategory, metadata: Metadata) {
		self.log(LogLevel::Debug, message, category, metadata);
	}

	pub fn info(&self, message: impl Into<String>, category: LogCategory, metadata: Metadata) {
		self.log(LogLevel::Info, message, category, metadata);
	}

	pub fn warn(&self, message: impl Into<String>, category: LogCategory, metadata: Metadata) {
		self.log(LogLevel::Warn, message, category, metadata);
	}

	/// Logs at `error` and starts delivery right away.
	pub fn error(&self, message: impl Into<String>, category: LogCategory, metadata: Metadata) {
		self.log(LogLevel::Error, message, category, metadata);
	}

	/// Logs at `critical` and starts delivery right away.
	pub fn critical(&self, message: impl Into<String>, category: LogCategory, metadata: Metadata) {
		self.log(LogLevel::Critical, message, category, metadata);
	}

	pub fn security(&self, message: impl Into<String>, metadata: Metadata) {
		self.info(message, LogCategory::Security, metadata);
	}

	pub fn performance(&self, message: impl Into<String>, metadata: Metadata) {
		self.info(message, LogCategory::Performance, metadata);
	}

	pub fn activity(&self, message: impl Into<String>, metadata: Metadata) {
		self.info(message, LogCategory::UserActivity, metadata);
	}

	pub fn optimization(&self, message: impl Into<String>, metadata: Metadata) {
		self.info(message, LogCategory::Optimization, metadata);
	}

	pub fn billing(&self, message: impl Into<String>, metadata: Metadata) {
		self.info(message, LogCategory::Billing, metadata);
	}

	pub fn integration(&self, message: impl Into<String>, metadata: Metadata) {
		self.info(message, LogCategory::Integration, metadata);
	}

	/// Sends everything currently buffered as one batch.
	///
	/// Delivery runs as its own task, so dropping this future does not lose
	/// the batch. Failures are logged and re-queued, never returned.
	pub async fn flush(&self) -> FlushOutcome {
		let Some(batch) = self.inner.take_batch() else {
			return FlushOutcome::Empty;
		};

		let count = batch.len();
		match self.inner.dispatch(batch).await {
			Ok(outcome) => outcome,
			Err(e) => {
				error!(error = %e, count, "Log delivery task failed");
				FlushOutcome::Lost(count)
			}
		}
	}

	/// Asks the collector to analyze logs.
	pub async fn analyze(&self, params: &Value) -> Result<Value> {
		self
			.inner
			.collector
			.analyze(params)
			.await
			.inspect_err(|e| warn!(error = %e, "Log analysis failed"))
	}

	/// Searches logs held by the collector.
	pub async fn search(&self, params: &Value) -> Result<Value> {
		self
			.inner
			.collector
			.search(params)
			.await
			.inspect_err(|e| warn!(error = %e, "Log search failed"))
	}

	/// Exports logs for compliance; the body is returned as raw bytes.
	pub async fn export(&self, params: &Value) -> Result<Bytes> {
		self
			.inner
			.collector
			.export(params)
			.await
			.inspect_err(|e| warn!(error = %e, "Log export failed"))
	}

	pub async fn statistics(&self, params: &Value) -> Result<Value> {
		self
			.inner
			.collector
			.statistics(params)
			.await
			.inspect_err(|e| warn!(error = %e, "Failed to get log statistics"))
	}

	/// Waits until every in-flight delivery has finished.
	pub async fn settle(&self) {
		self.inner.settle().await;
	}

	/// Stops the timer, flushes what is left and waits for in-flight
	/// deliveries.
	///
	/// Entries logged afterwards are dropped. Calling `close` again is a no-op.
	pub async fn close(&self) {
		if self.inner.closed.swap(true, Ordering::SeqCst) {
			return;
		}

		info!("Closing log service");
		self.inner.stop_timer();
		self.flush().await;
		self.inner.settle().await;

		let remaining = self.buffer_len();
		if remaining > 0 {
			warn!(remaining, "Log service closed with undelivered entries");
		}
		info!("Log service closed");
	}

	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::SeqCst)
	}

	/// Number of entries waiting for delivery.
	pub fn buffer_len(&self) -> usize {
		self.inner.buffer.lock().len()
	}

	pub fn buffer_size(&self) -> usize {
		self.inner.buffer.lock().capacity()
	}

	pub fn flush_interval(&self) -> Duration {
		self.inner.timer.lock().period
	}

	pub fn tenant(&self) -> Option<String> {
		self.inner.ambient.read().tenant.clone()
	}

	pub fn correlation_id(&self) -> Option<String> {
		self.inner.ambient.read().correlation_id.clone()
	}

	pub fn location(&self) -> Option<String> {
		self.inner.ambient.read().location.clone()
	}
}
