// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration: defaults, TOML file, then environment variables.
//!
//! The TOML file keeps its settings under a `[logs]` table:
//!
//! ```toml
//! [logs]
//! collector_url = "https://collector.internal/v1"
//! buffer_size = 250
//! flush_interval_ms = 2000
//! tenant = "acme"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use pioneer_common_secret::SecretString;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::collector::{normalize_base_url, DEFAULT_COLLECTOR_URL};
use crate::error::ConfigError;

pub const DEFAULT_BUFFER_SIZE: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

pub const ENV_COLLECTOR_URL: &str = "CLOUDPIONEER_API_URL";
pub const ENV_BUFFER_SIZE: &str = "CLOUDPIONEER_LOGS_BUFFER_SIZE";
pub const ENV_FLUSH_INTERVAL_MS: &str = "CLOUDPIONEER_LOGS_FLUSH_INTERVAL_MS";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "CLOUDPIONEER_LOGS_REQUEST_TIMEOUT_MS";
pub const ENV_TENANT: &str = "CLOUDPIONEER_TENANT";
pub const ENV_AUTH_TOKEN: &str = "CLOUDPIONEER_TOKEN";

/// Configuration layer for the log service (all fields optional for merging).
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LogsConfigLayer {
	/// Collector base URL.
	pub collector_url: Option<String>,
	/// Entries buffered before an eager flush.
	pub buffer_size: Option<usize>,
	/// Background flush period in milliseconds.
	pub flush_interval_ms: Option<u64>,
	/// Per-request timeout in milliseconds.
	pub request_timeout_ms: Option<u64>,
	/// Tenant stamped on every entry.
	pub tenant: Option<String>,
	/// Bearer token for the collector.
	pub auth_token: Option<SecretString>,
}

impl LogsConfigLayer {
	/// Merge another layer into this one. Other layer takes precedence.
	pub fn merge(&mut self, other: Self) {
		if other.collector_url.is_some() {
			self.collector_url = other.collector_url;
		}
		if other.buffer_size.is_some() {
			self.buffer_size = other.buffer_size;
		}
		if other.flush_interval_ms.is_some() {
			self.flush_interval_ms = other.flush_interval_ms;
		}
		if other.request_timeout_ms.is_some() {
			self.request_timeout_ms = other.request_timeout_ms;
		}
		if other.tenant.is_some() {
			self.tenant = other.tenant;
		}
		if other.auth_token.is_some() {
			self.auth_token = other.auth_token;
		}
	}

	/// Convert to resolved configuration with defaults applied.
	pub fn finalize(self) -> Result<LogServiceConfig, ConfigError> {
		let collector_url = normalize_base_url(
			self
				.collector_url
				.as_deref()
				.unwrap_or(DEFAULT_COLLECTOR_URL),
		)?;

		let buffer_size = self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
		if buffer_size == 0 {
			return Err(ConfigError::invalid_value("buffer_size", "must be positive"));
		}

		let flush_interval_ms = self.flush_interval_ms.unwrap_or(DEFAULT_FLUSH_INTERVAL_MS);
		if flush_interval_ms == 0 {
			return Err(ConfigError::invalid_value(
				"flush_interval_ms",
				"must be positive",
			));
		}

		let request_timeout_ms = self
			.request_timeout_ms
			.unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
		if request_timeout_ms == 0 {
			return Err(ConfigError::invalid_value(
				"request_timeout_ms",
				"must be positive",
			));
		}

		Ok(LogServiceConfig {
			collector_url,
			buffer_size,
			flush_interval: Duration::from_millis(flush_interval_ms),
			request_timeout: Duration::from_millis(request_timeout_ms),
			tenant: self.tenant.filter(|t| !t.is_empty()),
			auth_token: self.auth_token.filter(|t| !t.is_empty()),
		})
	}
}

/// Resolved log service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LogServiceConfig {
	pub collector_url: String,
	pub buffer_size: usize,
	pub flush_interval: Duration,
	pub request_timeout: Duration,
	pub tenant: Option<String>,
	pub auth_token: Option<SecretString>,
}

impl Default for LogServiceConfig {
	fn default() -> Self {
		Self {
			collector_url: DEFAULT_COLLECTOR_URL.to_string(),
			buffer_size: DEFAULT_BUFFER_SIZE,
			flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
			request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
			tenant: None,
			auth_token: None,
		}
	}
}

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
	CommandLine = 80,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<LogsConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<LogsConfigLayer, ConfigError> {
		Ok(LogsConfigLayer::default())
	}
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
	#[serde(default)]
	logs: Option<LogsConfigLayer>,
}

/// TOML file configuration source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<LogsConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(LogsConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let file: ConfigFile = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(file.logs.unwrap_or_default())
	}
}

/// Environment variable source.
///
/// Convention: `CLOUDPIONEER_LOGS_<FIELD>`, plus the shared
/// `CLOUDPIONEER_API_URL`, `CLOUDPIONEER_TENANT` and `CLOUDPIONEER_TOKEN`.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<LogsConfigLayer, ConfigError> {
		debug!("loading environment variables");
		layer_from_lookup(|name| std::env::var(name).ok())
	}
}

/// A fixed layer, used for command-line overrides.
pub struct OverrideSource(pub LogsConfigLayer);

impl ConfigSource for OverrideSource {
	fn name(&self) -> &'static str {
		"overrides"
	}

	fn precedence(&self) -> Precedence {
		Precedence::CommandLine
	}

	fn load(&self) -> Result<LogsConfigLayer, ConfigError> {
		Ok(self.0.clone())
	}
}

fn layer_from_lookup<F>(lookup: F) -> Result<LogsConfigLayer, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	let var = |name: &str| lookup(name).filter(|s| !s.is_empty());
	let number = |name: &str| -> Result<Option<u64>, ConfigError> {
		match var(name) {
			Some(v) => v
				.trim()
				.parse()
				.map(Some)
				.map_err(|_| ConfigError::invalid_value(name, format!("invalid integer '{v}'"))),
			None => Ok(None),
		}
	};

	Ok(LogsConfigLayer {
		collector_url: var(ENV_COLLECTOR_URL),
		buffer_size: number(ENV_BUFFER_SIZE)?
			.map(|n| {
				usize::try_from(n).map_err(|_| {
					ConfigError::invalid_value(ENV_BUFFER_SIZE, format!("{n} does not fit in usize"))
				})
			})
			.transpose()?,
		flush_interval_ms: number(ENV_FLUSH_INTERVAL_MS)?,
		request_timeout_ms: number(ENV_REQUEST_TIMEOUT_MS)?,
		tenant: var(ENV_TENANT),
		auth_token: var(ENV_AUTH_TOKEN).map(SecretString::new),
	})
}

/// Merges `sources` in precedence order into a single layer.
pub fn load_layer(sources: &[&dyn ConfigSource]) -> Result<LogsConfigLayer, ConfigError> {
	let mut ordered: Vec<&dyn ConfigSource> = sources.to_vec();
	ordered.sort_by_key(|s| s.precedence());

	let mut layer = LogsConfigLayer::default();
	for source in ordered {
		trace!(source = source.name(), "applying config source");
		layer.merge(source.load()?);
	}
	Ok(layer)
}

/// Loads configuration from defaults, an optional TOML file and the environment.
pub fn load_config(path: Option<&Path>) -> Result<LogServiceConfig, ConfigError> {
	let mut sources: Vec<Box<dyn ConfigSource>> = vec![Box::new(DefaultsSource), Box::new(EnvSource)];
	if let Some(path) = path {
		sources.push(Box::new(TomlSource::new(path)));
	}
	let refs: Vec<&dyn ConfigSource> = sources.iter().map(|s| s.as_ref()).collect();
	load_layer(&refs)?.finalize()
}
