// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the log shipper.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Config file exists but could not be read.
	#[error("failed to read config file {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// Config file is not valid TOML.
	#[error("TOML parse error in {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	/// A value is present but unusable.
	#[error("invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },

	/// Collector base URL is missing or unparseable.
	#[error("invalid collector URL: {0}")]
	InvalidCollectorUrl(String),
}

impl ConfigError {
	pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
		Self::InvalidValue {
			key: key.into(),
			message: message.into(),
		}
	}
}

/// Log service errors.
///
/// Only the query operations and construction surface these to callers.
/// Failures on the write path are logged and re-queued.
#[derive(Debug, Error)]
pub enum LogServiceError {
	/// HTTP request failed before a response was received.
	#[error("HTTP request failed: {0}")]
	RequestFailed(#[from] reqwest::Error),

	/// Collector returned a non-success status.
	#[error("server error ({status}): {message}")]
	ServerError { status: u16, message: String },

	/// Rate limited by the collector.
	#[error("rate limited, retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<u64> },

	/// Collector did not answer within the request timeout.
	#[error("collector did not respond within {0:?}")]
	Timeout(Duration),

	/// Payload could not be encoded or a response could not be decoded.
	#[error("serialization error: {0}")]
	Serialization(String),

	/// The configured collector does not implement this operation.
	#[error("collector does not support {0}")]
	Unsupported(&'static str),

	/// Service was built outside a Tokio runtime.
	#[error("log service requires a running Tokio runtime")]
	NoRuntime,

	/// Configuration was rejected.
	#[error(transparent)]
	Config(#[from] ConfigError),
}

impl LogServiceError {
	/// Returns true for failures that a later attempt may get past.
	pub fn is_retryable(&self) -> bool {
		match self {
			LogServiceError::RequestFailed(e) => e.is_timeout() || e.is_connect(),
			LogServiceError::ServerError { status, .. } => {
				matches!(*status, 408 | 429 | 500 | 502 | 503 | 504)
			}
			LogServiceError::RateLimited { .. } | LogServiceError::Timeout(_) => true,
			_ => false,
		}
	}
}

/// Result type alias for log service operations.
pub type Result<T> = std::result::Result<T, LogServiceError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_server_error_retryable_statuses() {
		for status in [408, 429, 500, 502, 503, 504] {
			let err = LogServiceError::ServerError {
				status,
				message: "test".to_string(),
			};
			assert!(err.is_retryable(), "status {status} should be retryable");
		}
	}

	#[test]
	fn test_server_error_non_retryable_statuses() {
		for status in [400, 401, 403, 404, 422] {
			let err = LogServiceError::ServerError {
				status,
				message: "test".to_string(),
			};
			assert!(
				!err.is_retryable(),
				"status {status} should not be retryable"
			);
		}
	}

	#[test]
	fn test_timeout_and_rate_limit_are_retryable() {
		assert!(LogServiceError::Timeout(Duration::from_secs(5)).is_retryable());
		assert!(LogServiceError::RateLimited {
			retry_after_secs: Some(30)
		}
		.is_retryable());
	}

	#[test]
	fn test_config_error_not_retryable() {
		let err: LogServiceError = ConfigError::invalid_value("buffer_size", "must be positive").into();
		assert!(!err.is_retryable());
		assert_eq!(
			err.to_string(),
			"invalid value for buffer_size: must be positive"
		);
	}
}
